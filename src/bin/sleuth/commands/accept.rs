//! Accept command - pick the winning solution of your bounty

use crate::client::SleuthClient;
use crate::session;
use crate::style::*;
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm};

pub async fn run(server: &str, bounty_id: &str, solution_id: &str, yes: bool) -> Result<()> {
    let saved = session::require(server)?;
    let client = SleuthClient::new(server).with_token(saved.token);

    let detail = client.get_bounty(bounty_id).await?;
    let Some(solution) = detail.solutions.iter().find(|s| s.id == solution_id) else {
        anyhow::bail!("Solution {} is not part of bounty {}", solution_id, bounty_id);
    };

    print_header("Accept Solution");
    println!("Bounty:  {}", detail.bounty.title);
    println!("Reward:  {} SOL", detail.bounty.bounty_amount);
    println!("Solver:  {}", style_cyan(&solution.solver));
    println!();
    println!("{}", truncate_text(&solution.solution_details, 200));
    println!();

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("  Accept this solution? The bounty will be closed as solved")
            .default(false)
            .interact()?;
        if !confirmed {
            print_warning("Cancelled");
            return Ok(());
        }
    }

    let accepted = client.accept_solution(bounty_id, solution_id).await?;

    print_success("Solution accepted successfully");
    println!(
        "  Bounty is now {} (solver {})",
        style_status(accepted.bounty.status.as_str()),
        truncate_wallet(&accepted.solution.solver)
    );
    Ok(())
}
