//! Create command - post a new bounty

use crate::client::{CreateBountyRequest, SleuthClient};
use crate::session;
use crate::style::*;
use anyhow::Result;

pub async fn run(server: &str, request: CreateBountyRequest) -> Result<()> {
    let saved = session::require(server)?;
    let client = SleuthClient::new(server).with_token(saved.token);

    let bounty = client.create_bounty(&request).await?;

    print_success("Bounty created successfully");
    println!("  ID:     {}", style_cyan(&bounty.id));
    println!("  Reward: {} SOL", bounty.bounty_amount);
    Ok(())
}
