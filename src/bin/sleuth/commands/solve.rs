//! Solve command - submit a solution to a bounty

use crate::client::SleuthClient;
use crate::session;
use crate::style::*;
use anyhow::Result;

pub async fn run(server: &str, bounty_id: &str, details: &str, images: &[String]) -> Result<()> {
    let saved = session::require(server)?;
    let client = SleuthClient::new(server).with_token(saved.token);

    let solution = client.submit_solution(bounty_id, details, images).await?;

    print_success("Solution submitted successfully");
    println!("  ID: {}", style_cyan(&solution.id));
    Ok(())
}
