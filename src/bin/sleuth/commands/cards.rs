//! Cards commands - list and create trap cards

use crate::client::{CreateCardRequest, ListFilter, SleuthClient};
use crate::session;
use crate::style::*;
use anyhow::Result;

pub async fn list(server: &str, filter: ListFilter) -> Result<()> {
    print_header("Trap Cards");

    let client = SleuthClient::new(server);
    let listing = client.list_cards(&filter).await?;

    if listing.cards.is_empty() {
        print_info("No cards yet.");
        return Ok(());
    }

    println!(
        "{:>4}  {:<18}  {:<9}  {:>6}  {:<36}  Creator",
        "Rank", "Title", "Ticker", "Votes", "ID"
    );
    println!("{}", "─".repeat(100));

    let offset = (listing.pagination.page.saturating_sub(1) * listing.pagination.limit) as usize;
    for (i, card) in listing.cards.iter().enumerate() {
        let rank = format!("#{}", offset + i + 1);
        let rank_styled = if offset + i == 0 {
            style_yellow(&rank)
        } else {
            rank
        };
        println!(
            "{:>4}  {:<18}  {:<9}  {:>6}  {:<36}  {}",
            rank_styled,
            card.title,
            format!("${}", card.attributes.ticker),
            card.votes,
            style_dim(&card.id),
            truncate_wallet(&card.creator)
        );
    }

    println!();
    println!("Total cards: {}", listing.pagination.total);
    Ok(())
}

pub async fn create(server: &str, request: CreateCardRequest) -> Result<()> {
    let saved = session::require(server)?;
    let client = SleuthClient::new(server).with_token(saved.token);

    let card = client.create_card(&request).await?;

    print_success("Card created successfully");
    println!("  ID:     {}", style_cyan(&card.id));
    println!("  Ticker: ${}", card.attributes.ticker);
    Ok(())
}
