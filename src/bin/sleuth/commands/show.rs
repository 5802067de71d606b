//! Show command - one bounty with its solutions

use crate::client::SleuthClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(server: &str, id: &str) -> Result<()> {
    let client = SleuthClient::new(server);
    let detail = client.get_bounty(id).await?;
    let bounty = &detail.bounty;

    print_header(&bounty.title);
    println!("ID:       {}", style_dim(&bounty.id));
    println!("Status:   {}", style_status(bounty.status.as_str()));
    println!("Reward:   {} SOL", style_bold(&format!("{:.2}", bounty.bounty_amount)));
    println!("Creator:  {}", bounty.creator);
    if let Some(solver) = &bounty.solver {
        println!("Solver:   {}", style_cyan(solver));
    }
    println!("Views:    {}", bounty.views);
    println!("Created:  {}", bounty.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!();
    println!("{}", bounty.description);

    println!();
    if detail.solutions.is_empty() {
        print_info("No solutions yet.");
        return Ok(());
    }

    println!("{}", style_bold(&format!("Solutions ({})", detail.solutions.len())));
    for solution in &detail.solutions {
        println!();
        println!(
            "  {}  {}  {} votes  by {}",
            style_dim(&solution.id),
            style_status(solution.status.as_str()),
            solution.votes,
            truncate_wallet(&solution.solver)
        );
        println!("  {}", truncate_text(&solution.solution_details, 100));
        if !solution.image_urls.is_empty() {
            println!("  {}", style_dim(&format!("{} image(s)", solution.image_urls.len())));
        }
    }
    Ok(())
}
