//! Bounties command - browse the board

use crate::client::{ListFilter, SleuthClient};
use crate::style::*;
use anyhow::Result;

pub async fn run(server: &str, filter: ListFilter) -> Result<()> {
    print_header("PumpSleuth Bounties");

    let client = SleuthClient::new(server);
    let listing = client.list_bounties(&filter).await?;

    let stats = &listing.stats;
    println!(
        "{} total · {} open · {} solved · {} SOL paid out",
        stats.total_bounties,
        style_green(&stats.open_bounties.to_string()),
        style_cyan(&stats.solved_bounties.to_string()),
        style_bold(&format!("{:.2}", stats.total_rewards))
    );

    if listing.bounties.is_empty() {
        println!();
        print_info("No bounties match.");
        return Ok(());
    }

    println!();
    println!(
        "{:<36}  {:<32}  {:>8}  {:<8}  {:>6}  Creator",
        "ID", "Title", "SOL", "Status", "Views"
    );
    println!("{}", "─".repeat(110));

    for bounty in &listing.bounties {
        println!(
            "{:<36}  {:<32}  {:>8.2}  {:<17}  {:>6}  {}",
            style_dim(&bounty.id),
            truncate_text(&bounty.title, 32),
            bounty.bounty_amount,
            style_status(bounty.status.as_str()),
            bounty.views,
            truncate_wallet(&bounty.creator)
        );
    }

    let p = &listing.pagination;
    println!();
    println!("Page {} of {} ({} bounties)", p.page, p.pages.max(1), p.total);
    Ok(())
}
