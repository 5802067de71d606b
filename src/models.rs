//! Domain records shared by the storage backends, the engine and the API.
//!
//! Wire format is camelCase JSON. Status enums double as PostgreSQL enum
//! types and as lowercase text in SQLite.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

// ============================================================================
// STATUS ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "lowercase")]
#[postgres(name = "bounty_status")]
pub enum BountyStatus {
    #[postgres(name = "open")]
    Open,
    #[postgres(name = "solved")]
    Solved,
    #[postgres(name = "closed")]
    Closed,
}

impl BountyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Solved => "solved",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for BountyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "solved" => Ok(Self::Solved),
            "closed" => Ok(Self::Closed),
            other => Err(format!("Unknown bounty status: {}", other)),
        }
    }
}

impl fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "lowercase")]
#[postgres(name = "solution_status")]
pub enum SolutionStatus {
    #[postgres(name = "pending")]
    Pending,
    #[postgres(name = "accepted")]
    Accepted,
    #[postgres(name = "rejected")]
    Rejected,
}

impl SolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for SolutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Unknown solution status: {}", other)),
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletIdentity {
    pub address: String,
    #[serde(skip_serializing)]
    pub nonce: String,
    pub is_profile_complete: bool,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounty {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub creator: String,
    pub bounty_amount: f64,
    pub status: BountyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub id: String,
    pub bounty_id: String,
    pub solver: String,
    pub solution_details: String,
    pub image_urls: Vec<String>,
    pub status: SolutionStatus,
    pub votes: i64,
    pub voters: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A solution listed for its solver, with the parent bounty's headline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionWithBounty {
    #[serde(flatten)]
    pub solution: Solution,
    pub bounty_title: String,
    pub bounty_amount: f64,
}

/// Launch parameters of a trap card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAttributes {
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub dev_fee_percentage: u8,
    #[serde(default = "default_max_tickets")]
    pub max_tickets_per_user: u32,
    #[serde(default)]
    pub enable_whitelist: bool,
}

fn default_max_tickets() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub creator: String,
    pub attributes: CardAttributes,
    pub votes: i64,
    pub voters: Vec<String>,
    pub is_tokenized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// LISTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BountySort {
    CreatedAt,
    BountyAmount,
    Views,
    Title,
}

impl BountySort {
    /// Column name, shared by both SQL backends
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::BountyAmount => "bounty_amount",
            Self::Views => "views",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSort {
    Votes,
    CreatedAt,
    Title,
}

impl CardSort {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Votes => "votes",
            Self::CreatedAt => "created_at",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone)]
pub struct BountyQuery {
    pub status: Option<BountyStatus>,
    pub creator: Option<String>,
    pub sort: BountySort,
    pub order: SortOrder,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct CardQuery {
    pub sort: CardSort,
    pub order: SortOrder,
    pub page: Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: Page) -> Self {
        Self {
            total,
            page: page.page,
            limit: page.limit,
            pages: total.div_ceil(page.limit as u64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyStats {
    pub total_bounties: u64,
    pub open_bounties: u64,
    pub solved_bounties: u64,
    pub total_rewards: f64,
}
