//! ANSI styling for sleuth output

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const RESET: &str = "\x1b[0m";

fn paint(sgr: &str, s: &str) -> String {
    format!("\x1b[{}m{}{}", sgr, s, RESET)
}

pub fn style_cyan(s: &str) -> String {
    paint("36", s)
}

pub fn style_green(s: &str) -> String {
    paint("32", s)
}

pub fn style_red(s: &str) -> String {
    paint("31", s)
}

pub fn style_yellow(s: &str) -> String {
    paint("33", s)
}

pub fn style_dim(s: &str) -> String {
    paint("2", s)
}

pub fn style_bold(s: &str) -> String {
    paint("1", s)
}

pub fn print_success(msg: &str) {
    println!("{} {}", style_green("✓"), msg);
}

/// Printed to stderr
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style_red("✗"), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", style_yellow("!"), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", style_dim("·"), msg);
}

/// Section title for a command, e.g. `sleuth › Trap Cards`
pub fn print_header(title: &str) {
    let prefix = "sleuth › ";
    println!();
    println!("{}{}", style_dim(prefix), style_bold(title));
    println!(
        "{}",
        style_dim(&"═".repeat(prefix.chars().count() + title.chars().count()))
    );
}

/// Status word colored by lifecycle stage
pub fn style_status(status: &str) -> String {
    match status {
        "open" | "pending" => style_green(status),
        "solved" | "accepted" => style_cyan(status),
        _ => style_dim(status),
    }
}

/// Shorten a wallet address for display, showing first 4 and last 4 characters.
/// Returns the full string if it's shorter than 12 characters.
pub fn truncate_wallet(wallet: &str) -> String {
    let chars: Vec<char> = wallet.chars().collect();
    if chars.len() >= 12 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        wallet.to_string()
    }
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis
pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
