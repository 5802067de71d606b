//! Vote command - upvote a solution or a trap card

use crate::client::SleuthClient;
use crate::session;
use crate::style::*;
use anyhow::Result;

pub async fn solution(server: &str, bounty_id: &str, solution_id: &str) -> Result<()> {
    let saved = session::require(server)?;
    let client = SleuthClient::new(server).with_token(saved.token);

    let solution = client.vote_solution(bounty_id, solution_id).await?;

    print_success("Vote recorded successfully");
    println!("  Solution {} now has {} votes", style_dim(&solution.id), solution.votes);
    Ok(())
}

pub async fn card(server: &str, card_id: &str) -> Result<()> {
    let saved = session::require(server)?;
    let client = SleuthClient::new(server).with_token(saved.token);

    let card = client.vote_card(card_id).await?;

    print_success("Vote recorded successfully");
    println!("  {} now has {} votes", style_cyan(&card.title), card.votes);
    Ok(())
}
