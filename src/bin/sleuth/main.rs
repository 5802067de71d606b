//! PumpSleuth CLI
//!
//! Command-line client for the PumpSleuth bounty board.

mod client;
mod commands;
mod session;
mod style;

use clap::{Parser, Subcommand};
use pump_sleuth::models::CardAttributes;
use std::path::PathBuf;
use style::*;

use client::{CreateBountyRequest, CreateCardRequest, ListFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "sleuth")]
#[command(version)]
#[command(about = "PumpSleuth - bounties for exposing pump and dumps", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// PumpSleuth server URL
    #[arg(
        short,
        long,
        env = "SLEUTH_URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    url: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a Solana keypair file
    Login {
        /// Path to a Solana CLI keypair (JSON array of 64 bytes)
        #[arg(short, long, env = "SLEUTH_KEYPAIR")]
        keypair: PathBuf,

        /// App name in the challenge message (asks the server when omitted)
        #[arg(long, env = "SLEUTH_APP_NAME")]
        app_name: Option<String>,
    },

    /// List bounties
    #[command(visible_alias = "ls")]
    Bounties {
        /// open, solved or closed
        #[arg(short, long)]
        status: Option<String>,

        /// Only bounties posted by this wallet
        #[arg(short, long)]
        creator: Option<String>,

        /// createdAt, bountyAmount, views or title
        #[arg(long)]
        sort: Option<String>,

        /// asc or desc
        #[arg(long)]
        order: Option<String>,

        #[arg(short, long)]
        page: Option<u32>,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show a bounty and its solutions
    Show {
        /// Bounty ID
        id: String,
    },

    /// Post a new bounty
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        /// Reward in SOL (minimum 0.1)
        #[arg(short, long)]
        amount: f64,

        #[arg(long)]
        image_url: Option<String>,
    },

    /// Submit a solution to a bounty
    Solve {
        /// Bounty ID
        bounty_id: String,

        /// Evidence and explanation
        #[arg(short, long)]
        details: String,

        /// Image references (up to 5)
        #[arg(long = "image")]
        images: Vec<String>,
    },

    /// Accept a solution to your bounty
    Accept {
        bounty_id: String,
        solution_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Upvote a solution (BOUNTY_ID SOLUTION_ID) or a card (--card CARD_ID)
    Vote {
        #[arg(required_unless_present = "card")]
        bounty_id: Option<String>,

        #[arg(required_unless_present = "card")]
        solution_id: Option<String>,

        #[arg(long, conflicts_with_all = ["bounty_id", "solution_id"])]
        card: Option<String>,
    },

    /// List trap cards, ranked by votes
    Cards {
        /// votes, createdAt or title
        #[arg(long)]
        sort: Option<String>,

        #[arg(short, long)]
        page: Option<u32>,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Create a trap card
    NewCard {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(long)]
        image_url: String,

        /// 1-8 letters or numbers
        #[arg(long)]
        ticker: String,

        #[arg(long)]
        twitter: Option<String>,

        #[arg(long)]
        website: Option<String>,

        #[arg(long, default_value = "0")]
        dev_fee: u8,

        #[arg(long, default_value = "100")]
        max_tickets: u32,

        #[arg(long)]
        whitelist: bool,
    },

    /// Solutions submitted by you (or another solver)
    #[command(visible_alias = "mine")]
    MySolutions {
        #[arg(short, long)]
        solver: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let url = cli.url.as_str();
    let result = match cli.command {
        Commands::Login { keypair, app_name } => {
            print_banner();
            commands::login::run(url, &keypair, app_name).await
        }
        Commands::Bounties {
            status,
            creator,
            sort,
            order,
            page,
            limit,
        } => {
            let filter = ListFilter {
                status,
                creator,
                sort,
                order,
                page,
                limit,
            };
            commands::bounties::run(url, filter).await
        }
        Commands::Show { id } => commands::show::run(url, &id).await,
        Commands::Create {
            title,
            description,
            amount,
            image_url,
        } => {
            let request = CreateBountyRequest {
                title,
                description,
                bounty_amount: amount,
                image_url,
            };
            commands::create::run(url, request).await
        }
        Commands::Solve {
            bounty_id,
            details,
            images,
        } => commands::solve::run(url, &bounty_id, &details, &images).await,
        Commands::Accept {
            bounty_id,
            solution_id,
            yes,
        } => commands::accept::run(url, &bounty_id, &solution_id, yes).await,
        Commands::Vote {
            bounty_id,
            solution_id,
            card,
        } => match (card, bounty_id, solution_id) {
            (Some(card_id), _, _) => commands::vote::card(url, &card_id).await,
            (None, Some(bounty_id), Some(solution_id)) => {
                commands::vote::solution(url, &bounty_id, &solution_id).await
            }
            _ => Err(anyhow::anyhow!(
                "Pass BOUNTY_ID SOLUTION_ID, or --card CARD_ID"
            )),
        },
        Commands::Cards { sort, page, limit } => {
            let filter = ListFilter {
                sort,
                page,
                limit,
                ..Default::default()
            };
            commands::cards::list(url, filter).await
        }
        Commands::NewCard {
            title,
            description,
            image_url,
            ticker,
            twitter,
            website,
            dev_fee,
            max_tickets,
            whitelist,
        } => {
            let request = CreateCardRequest {
                title,
                description,
                image_url,
                attributes: CardAttributes {
                    ticker,
                    twitter,
                    website,
                    dev_fee_percentage: dev_fee,
                    max_tickets_per_user: max_tickets,
                    enable_whitelist: whitelist,
                },
            };
            commands::cards::create(url, request).await
        }
        Commands::MySolutions { solver } => commands::my_solutions::run(url, solver).await,
    };

    if let Err(e) = result {
        print_error(&format!("{}", e));
        std::process::exit(1);
    }
}

pub fn print_banner() {
    println!();
    println!("  {}", style_cyan("PumpSleuth"));
    println!("  {}", style_dim(&format!("v{}", VERSION)));
    println!();
}
