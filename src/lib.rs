//! PumpSleuth - wallet-authenticated bounty board
//!
//! Users post bounties for information about pump-and-dump schemes,
//! solvers submit evidence, and bounty creators accept the winning
//! solution. A "trap card" variant lets wallets publish and upvote token
//! launch cards.
//!
//! # How it works
//!
//! 1. A wallet requests a nonce and signs
//!    `Sign this message to authenticate with <AppName>: <nonce>`
//! 2. The signature is verified (ed25519, base58 Solana address) and
//!    exchanged for a bearer session token
//! 3. Bounties move `open → solved` when the creator accepts a solution
//! 4. Solutions and cards collect votes, at most one per wallet
//!
//! # Guards
//!
//! - Nonces are single use; a login consumes the nonce it signed
//! - No solving or voting on your own bounty, solution or card
//! - One solution per wallet per bounty
//! - Acceptance writes solution and bounty in one transaction

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod models;
pub mod pg_storage;
pub mod server;
pub mod storage;

pub use auth::{create_sign_message, is_valid_wallet_address, verify_signature, TokenIssuer};
pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use identity::{IdentityGateway, LoginResponse, Session};
pub use lifecycle::BountyEngine;
pub use pg_storage::PgStore;
pub use storage::{SqliteStore, Store};
