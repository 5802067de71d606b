//! My-solutions command - submissions by the logged-in wallet (or any solver)

use crate::client::SleuthClient;
use crate::session;
use crate::style::*;
use anyhow::Result;
use pump_sleuth::models::SolutionStatus;

pub async fn run(server: &str, solver: Option<String>) -> Result<()> {
    let solver = match solver {
        Some(s) => s,
        None => session::require(server)?.wallet_address,
    };

    if !pump_sleuth::is_valid_wallet_address(&solver) {
        print_warning("Solver is not a valid Solana wallet address");
    }

    print_header("Solutions");
    println!("Solver: {}", truncate_wallet(&solver));
    println!();

    let client = SleuthClient::new(server);
    let solutions = client.solutions_by_solver(&solver).await?;

    if solutions.is_empty() {
        print_info("No solutions submitted yet.");
        return Ok(());
    }

    for entry in &solutions {
        let s = &entry.solution;
        println!(
            "{:<9}  {:>8.2} SOL  {:>4} votes  {}",
            style_status(s.status.as_str()),
            entry.bounty_amount,
            s.votes,
            truncate_text(&entry.bounty_title, 48)
        );
    }

    let won = solutions
        .iter()
        .filter(|e| e.solution.status == SolutionStatus::Accepted)
        .count();
    println!();
    println!("{} submitted, {} accepted", solutions.len(), style_green(&won.to_string()));
    Ok(())
}
