//! Bounty lifecycle engine
//!
//! State machine for bounties, solutions and trap cards. Callers pass the
//! acting wallet explicitly (a resolved [`Session`] or the wallet named in
//! the request); the engine never looks at credentials.
//!
//! Checks run in a fixed order and the first failing one is reported.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::BountyRules;
use crate::error::{ServiceError, ServiceResult};
use crate::identity::Session;
use crate::models::{
    Bounty, BountyQuery, BountySort, BountyStats, BountyStatus, Card, CardAttributes, CardQuery,
    CardSort, Page, Pagination, Solution, SolutionStatus, SolutionWithBounty, SortOrder,
};
use crate::storage::Store;

const MAX_CARD_TITLE_LEN: usize = 18;
const MAX_TICKER_LEN: usize = 8;

// ============================================================================
// INPUTS
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewBounty {
    pub title: String,
    pub description: String,
    pub creator: String,
    pub bounty_amount: Option<f64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSolution {
    pub solver: String,
    pub solution_details: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Acceptance {
    pub solution_id: String,
    pub creator: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCard {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub attributes: Option<CardAttributes>,
}

/// Raw listing parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub status: Option<String>,
    pub creator: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

// ============================================================================
// OUTPUTS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BountyListing {
    pub bounties: Vec<Bounty>,
    pub pagination: Pagination,
    pub stats: BountyStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct BountyDetail {
    pub bounty: Bounty,
    pub solutions: Vec<Solution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardListing {
    pub cards: Vec<Card>,
    pub pagination: Pagination,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct BountyEngine {
    store: Arc<dyn Store>,
    rules: BountyRules,
}

/// Current time at the precision both backends persist
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn required(value: &str, message: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ServiceError::validation(message))
    } else {
        Ok(trimmed.to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BountyEngine {
    pub fn new(store: Arc<dyn Store>, rules: BountyRules) -> Self {
        Self { store, rules }
    }

    // ------------------------------------------------------------------------
    // BOUNTIES
    // ------------------------------------------------------------------------

    pub async fn create_bounty(&self, input: NewBounty) -> ServiceResult<Bounty> {
        let title = required(&input.title, "Title is required")?;
        let description = required(&input.description, "Description is required")?;
        let creator = required(&input.creator, "Creator wallet address is required")?;

        let min = self.rules.min_bounty_amount;
        let bounty_amount = match input.bounty_amount {
            Some(amount) if amount >= min => amount,
            _ => {
                return Err(ServiceError::validation(format!(
                    "Bounty amount must be at least {} SOL",
                    min
                )))
            }
        };

        if title.chars().count() > self.rules.max_title_len {
            return Err(ServiceError::validation(format!(
                "Title must be at most {} characters",
                self.rules.max_title_len
            )));
        }

        let now = now();
        let bounty = Bounty {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            image_url: non_empty(input.image_url),
            creator,
            bounty_amount,
            status: BountyStatus::Open,
            solver: None,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_bounty(&bounty).await?;

        info!(
            "Bounty {} created by {} ({} SOL)",
            bounty.id, bounty.creator, bounty.bounty_amount
        );
        Ok(bounty)
    }

    /// Bounty with its solutions (newest first). Also counts a view.
    pub async fn get_bounty(&self, bounty_id: &str) -> ServiceResult<BountyDetail> {
        let bounty = self.load_bounty(bounty_id).await?;
        let solutions = self.store.solutions_for_bounty(&bounty.id).await?;
        self.increment_views(&bounty.id);
        Ok(BountyDetail { bounty, solutions })
    }

    /// Best-effort view counter; runs in the background and only logs failures
    pub fn increment_views(&self, bounty_id: &str) {
        let store = self.store.clone();
        let bounty_id = bounty_id.to_string();
        tokio::spawn(async move {
            match store.increment_views(&bounty_id).await {
                Ok(true) => {}
                Ok(false) => warn!("View not counted: bounty {} not found", bounty_id),
                Err(e) => warn!("Failed to increment views for {}: {:#}", bounty_id, e),
            }
        });
    }

    pub async fn list_bounties(&self, params: &ListParams) -> ServiceResult<BountyListing> {
        let query = BountyQuery {
            status: params
                .status
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<BountyStatus>()
                        .map_err(|_| ServiceError::validation(format!("Invalid status: {}", s)))
                })
                .transpose()?,
            creator: non_empty(params.creator.clone()),
            sort: parse_bounty_sort(params.sort.as_deref())?,
            order: parse_order(params.order.as_deref())?,
            page: self.parse_page(params)?,
        };

        let (bounties, total) = self.store.list_bounties(&query).await?;
        let stats = self.store.bounty_stats().await?;

        Ok(BountyListing {
            bounties,
            pagination: Pagination::new(total, query.page),
            stats,
        })
    }

    // ------------------------------------------------------------------------
    // SOLUTIONS
    // ------------------------------------------------------------------------

    pub async fn submit_solution(
        &self,
        bounty_id: &str,
        input: NewSolution,
    ) -> ServiceResult<Solution> {
        let solver = required(&input.solver, "Solver wallet address is required")?;
        let solution_details = required(&input.solution_details, "Solution details are required")?;
        if input.image_urls.len() > self.rules.max_solution_images {
            return Err(ServiceError::validation(format!(
                "At most {} images can be attached to a solution",
                self.rules.max_solution_images
            )));
        }

        let bounty = self.load_bounty(bounty_id).await?;
        if bounty.status != BountyStatus::Open {
            return Err(ServiceError::invalid_state(
                "This bounty is not open for solutions",
            ));
        }
        if bounty.creator == solver {
            return Err(ServiceError::forbidden(
                "You cannot submit a solution to your own bounty",
            ));
        }
        if self.store.find_solution(&bounty.id, &solver).await?.is_some() {
            return Err(already_submitted());
        }

        let now = now();
        let solution = Solution {
            id: Uuid::new_v4().to_string(),
            bounty_id: bounty.id,
            solver,
            solution_details,
            image_urls: input.image_urls,
            status: SolutionStatus::Pending,
            votes: 0,
            voters: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        // The unique (bounty, solver) index settles concurrent submissions
        if !self.store.insert_solution(&solution).await? {
            return Err(already_submitted());
        }

        info!(
            "Solution {} submitted to bounty {} by {}",
            solution.id, solution.bounty_id, solution.solver
        );
        Ok(solution)
    }

    pub async fn accept_solution(
        &self,
        bounty_id: &str,
        input: Acceptance,
    ) -> ServiceResult<(Solution, Bounty)> {
        let solution_id = required(&input.solution_id, "Solution ID is required")?;
        let creator = required(&input.creator, "Creator wallet address is required")?;

        let bounty = self.load_bounty(bounty_id).await?;
        if bounty.creator != creator {
            return Err(ServiceError::forbidden(
                "Only the bounty creator can accept solutions",
            ));
        }

        let solution = self.load_solution(&bounty.id, &solution_id).await?;

        // Repeating an acceptance that already happened is a no-op
        if bounty.status == BountyStatus::Solved
            && solution.status == SolutionStatus::Accepted
            && bounty.solver.as_deref() == Some(solution.solver.as_str())
        {
            return Ok((solution, bounty));
        }
        if bounty.status != BountyStatus::Open {
            return Err(ServiceError::invalid_state("This bounty is no longer open"));
        }

        let accepted = self
            .store
            .accept_solution(&bounty.id, &solution.id, &solution.solver, now())
            .await?;
        if !accepted {
            return Err(ServiceError::invalid_state("This bounty is no longer open"));
        }

        let solution = self.load_solution(&bounty.id, &solution.id).await?;
        let bounty = self.load_bounty(&bounty.id).await?;

        info!(
            "Bounty {} solved: accepted solution {} from {}",
            bounty.id, solution.id, solution.solver
        );
        Ok((solution, bounty))
    }

    pub async fn vote_solution(
        &self,
        bounty_id: &str,
        solution_id: &str,
        session: &Session,
    ) -> ServiceResult<Solution> {
        let voter = session.wallet_address.as_str();
        let solution = self.load_solution(bounty_id, solution_id).await?;

        if solution.voters.iter().any(|v| v == voter) {
            return Err(ServiceError::conflict(
                "You have already voted for this solution",
            ));
        }
        if solution.solver == voter {
            return Err(ServiceError::forbidden(
                "You cannot vote for your own solution",
            ));
        }

        if !self.store.add_solution_vote(&solution.id, voter, now()).await? {
            return Err(ServiceError::conflict(
                "You have already voted for this solution",
            ));
        }

        info!("Vote on solution {} by {}", solution.id, voter);
        self.load_solution(bounty_id, solution_id).await
    }

    /// A solver's submissions, newest first, with the parent bounty headline
    pub async fn solutions_by_solver(&self, solver: &str) -> ServiceResult<Vec<SolutionWithBounty>> {
        let solver = required(solver, "Solver wallet address is required")?;
        let solutions = self.store.solutions_by_solver(&solver).await?;

        let bounties = try_join_all(
            solutions
                .iter()
                .map(|solution| self.store.get_bounty(&solution.bounty_id)),
        )
        .await?;

        Ok(solutions
            .into_iter()
            .zip(bounties)
            .map(|(solution, bounty)| {
                let (bounty_title, bounty_amount) = match bounty {
                    Some(b) => (b.title, b.bounty_amount),
                    None => ("Unknown Bounty".to_string(), 0.0),
                };
                SolutionWithBounty {
                    solution,
                    bounty_title,
                    bounty_amount,
                }
            })
            .collect())
    }

    // ------------------------------------------------------------------------
    // CARDS
    // ------------------------------------------------------------------------

    pub async fn create_card(&self, session: &Session, input: NewCard) -> ServiceResult<Card> {
        let title = required(&input.title, "Title is required")?;
        let description = required(&input.description, "Description is required")?;
        let image_url =
            non_empty(input.image_url).ok_or_else(|| ServiceError::validation("Image is required"))?;

        if title.chars().count() > MAX_CARD_TITLE_LEN {
            return Err(ServiceError::validation(format!(
                "Title must be at most {} characters",
                MAX_CARD_TITLE_LEN
            )));
        }

        let attributes = validate_attributes(input.attributes)?;

        let now = now();
        let card = Card {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            image_url,
            creator: session.wallet_address.clone(),
            attributes,
            votes: 0,
            voters: Vec::new(),
            is_tokenized: false,
            token_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_card(&card).await?;

        info!(
            "Card {} (${}) created by {}",
            card.id, card.attributes.ticker, card.creator
        );
        Ok(card)
    }

    pub async fn vote_card(&self, session: &Session, card_id: &str) -> ServiceResult<Card> {
        let card_id = required(card_id, "Card ID is required")?;
        let voter = session.wallet_address.as_str();

        let card = self
            .store
            .get_card(&card_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Card not found"))?;

        if card.voters.iter().any(|v| v == voter) {
            return Err(ServiceError::conflict("You have already voted for this card"));
        }
        if card.creator == voter {
            return Err(ServiceError::forbidden("You cannot vote for your own card"));
        }

        if !self.store.add_card_vote(&card.id, voter, now()).await? {
            return Err(ServiceError::conflict("You have already voted for this card"));
        }

        info!("Vote on card {} by {}", card.id, voter);
        self.store
            .get_card(&card.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Card not found"))
    }

    pub async fn list_cards(&self, params: &ListParams) -> ServiceResult<CardListing> {
        let query = CardQuery {
            sort: parse_card_sort(params.sort.as_deref())?,
            order: parse_order(params.order.as_deref())?,
            page: self.parse_page(params)?,
        };

        let (cards, total) = self.store.list_cards(&query).await?;
        Ok(CardListing {
            cards,
            pagination: Pagination::new(total, query.page),
        })
    }

    // ------------------------------------------------------------------------
    // HELPERS
    // ------------------------------------------------------------------------

    async fn load_bounty(&self, bounty_id: &str) -> ServiceResult<Bounty> {
        self.store
            .get_bounty(bounty_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Bounty not found"))
    }

    /// Solution that exists and belongs to `bounty_id`
    async fn load_solution(&self, bounty_id: &str, solution_id: &str) -> ServiceResult<Solution> {
        self.store
            .get_solution(solution_id)
            .await?
            .filter(|s| s.bounty_id == bounty_id)
            .ok_or_else(|| ServiceError::not_found("Solution not found"))
    }

    fn parse_page(&self, params: &ListParams) -> ServiceResult<Page> {
        let page = match params.page.as_deref().filter(|p| !p.is_empty()) {
            None => 1,
            Some(p) => p
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| ServiceError::validation("Page must be a positive integer"))?,
        };

        let max = self.rules.max_page_size;
        let limit = match params.limit.as_deref().filter(|l| !l.is_empty()) {
            None => self.rules.default_page_size,
            Some(l) => l
                .parse::<u32>()
                .ok()
                .filter(|l| (1..=max).contains(l))
                .ok_or_else(|| {
                    ServiceError::validation(format!("Limit must be between 1 and {}", max))
                })?,
        };

        Ok(Page { page, limit })
    }
}

fn already_submitted() -> ServiceError {
    ServiceError::conflict("You have already submitted a solution for this bounty")
}

fn parse_order(order: Option<&str>) -> ServiceResult<SortOrder> {
    match order.filter(|o| !o.is_empty()) {
        None | Some("desc") => Ok(SortOrder::Desc),
        Some("asc") => Ok(SortOrder::Asc),
        Some(other) => Err(ServiceError::validation(format!(
            "Invalid sort order: {}",
            other
        ))),
    }
}

fn parse_bounty_sort(sort: Option<&str>) -> ServiceResult<BountySort> {
    match sort.filter(|s| !s.is_empty()) {
        None | Some("createdAt") => Ok(BountySort::CreatedAt),
        Some("bountyAmount") => Ok(BountySort::BountyAmount),
        Some("views") => Ok(BountySort::Views),
        Some("title") => Ok(BountySort::Title),
        Some(other) => Err(ServiceError::validation(format!(
            "Invalid sort field: {}",
            other
        ))),
    }
}

fn parse_card_sort(sort: Option<&str>) -> ServiceResult<CardSort> {
    match sort.filter(|s| !s.is_empty()) {
        None | Some("votes") => Ok(CardSort::Votes),
        Some("createdAt") => Ok(CardSort::CreatedAt),
        Some("title") => Ok(CardSort::Title),
        Some(other) => Err(ServiceError::validation(format!(
            "Invalid sort field: {}",
            other
        ))),
    }
}

fn validate_attributes(attributes: Option<CardAttributes>) -> ServiceResult<CardAttributes> {
    let mut attributes =
        attributes.ok_or_else(|| ServiceError::validation("Card ticker is required"))?;

    attributes.ticker = attributes.ticker.trim().to_string();
    let ticker_ok = !attributes.ticker.is_empty()
        && attributes.ticker.len() <= MAX_TICKER_LEN
        && attributes.ticker.chars().all(|c| c.is_ascii_alphanumeric());
    if !ticker_ok {
        return Err(ServiceError::validation(format!(
            "Ticker must be 1-{} letters or numbers",
            MAX_TICKER_LEN
        )));
    }
    if attributes.dev_fee_percentage > 100 {
        return Err(ServiceError::validation(
            "Dev fee percentage must be between 0 and 100",
        ));
    }
    if attributes.max_tickets_per_user < 1 {
        return Err(ServiceError::validation(
            "Max tickets per user must be at least 1",
        ));
    }

    attributes.twitter = non_empty(attributes.twitter);
    attributes.website = non_empty(attributes.website);
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use tokio_test::assert_ok;

    fn engine() -> BountyEngine {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        BountyEngine::new(store, BountyRules::default())
    }

    fn session(wallet: &str) -> Session {
        Session {
            wallet_address: wallet.to_string(),
        }
    }

    fn new_bounty(creator: &str, amount: f64) -> NewBounty {
        NewBounty {
            title: "Find X".to_string(),
            description: "desc".to_string(),
            creator: creator.to_string(),
            bounty_amount: Some(amount),
            image_url: None,
        }
    }

    fn new_solution(solver: &str) -> NewSolution {
        NewSolution {
            solver: solver.to_string(),
            solution_details: "evidence".to_string(),
            image_urls: vec![],
        }
    }

    fn acceptance(solution_id: &str, creator: &str) -> Acceptance {
        Acceptance {
            solution_id: solution_id.to_string(),
            creator: creator.to_string(),
        }
    }

    fn new_card(ticker: &str) -> NewCard {
        NewCard {
            title: "Rug Detector".to_string(),
            description: "Ticker: RUG".to_string(),
            image_url: Some("data:image/png;base64,AAAA".to_string()),
            attributes: Some(CardAttributes {
                ticker: ticker.to_string(),
                twitter: None,
                website: Some("  ".to_string()),
                dev_fee_percentage: 2,
                max_tickets_per_user: 100,
                enable_whitelist: false,
            }),
        }
    }

    #[tokio::test]
    async fn test_bounty_happy_path() {
        let engine = engine();

        let bounty = engine.create_bounty(new_bounty("Wallet1", 0.5)).await.unwrap();
        assert_eq!(bounty.status, BountyStatus::Open);
        assert_eq!(bounty.views, 0);

        let solution = engine
            .submit_solution(&bounty.id, new_solution("Wallet2"))
            .await
            .unwrap();
        assert_eq!(solution.status, SolutionStatus::Pending);
        assert_eq!(solution.votes, 0);

        let (solution, bounty) = engine
            .accept_solution(&bounty.id, acceptance(&solution.id, "Wallet1"))
            .await
            .unwrap();
        assert_eq!(bounty.status, BountyStatus::Solved);
        assert_eq!(bounty.solver.as_deref(), Some("Wallet2"));
        assert_eq!(solution.status, SolutionStatus::Accepted);
    }

    #[tokio::test]
    async fn test_create_bounty_validation_order() {
        let engine = engine();

        let err = engine.create_bounty(new_bounty("Wallet1", 0.05)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("at least 0.1")));

        let mut input = new_bounty("", 0.05);
        input.title = "  ".to_string();
        let err = engine.create_bounty(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "Title is required"));

        let err = engine.create_bounty(new_bounty("", 0.5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("Creator")));

        let mut input = new_bounty("Wallet1", 1.0);
        input.bounty_amount = None;
        assert!(matches!(
            engine.create_bounty(input).await,
            Err(ServiceError::Validation(_))
        ));

        let mut input = new_bounty("Wallet1", 1.0);
        input.title = "x".repeat(101);
        assert!(matches!(
            engine.create_bounty(input).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_solution_guards() {
        let engine = engine();
        let bounty = engine.create_bounty(new_bounty("Wallet1", 0.5)).await.unwrap();

        assert!(matches!(
            engine.submit_solution("missing", new_solution("Wallet2")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            engine.submit_solution(&bounty.id, new_solution("Wallet1")).await,
            Err(ServiceError::Forbidden(_))
        ));

        let mut too_many = new_solution("Wallet2");
        too_many.image_urls = vec!["img".to_string(); 6];
        assert!(matches!(
            engine.submit_solution(&bounty.id, too_many).await,
            Err(ServiceError::Validation(_))
        ));

        assert_ok!(engine.submit_solution(&bounty.id, new_solution("Wallet2")).await);
        assert!(matches!(
            engine.submit_solution(&bounty.id, new_solution("Wallet2")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_to_solved_bounty_fails() {
        let engine = engine();
        let bounty = engine.create_bounty(new_bounty("Wallet1", 0.5)).await.unwrap();
        let solution = engine
            .submit_solution(&bounty.id, new_solution("Wallet2"))
            .await
            .unwrap();
        engine
            .accept_solution(&bounty.id, acceptance(&solution.id, "Wallet1"))
            .await
            .unwrap();

        let err = engine
            .submit_solution(&bounty.id, new_solution("Wallet3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(ref m) if m.contains("not open for solutions")));
    }

    #[tokio::test]
    async fn test_accept_rules() {
        let engine = engine();
        let bounty = engine.create_bounty(new_bounty("Wallet1", 1.0)).await.unwrap();
        let s2 = engine
            .submit_solution(&bounty.id, new_solution("Wallet2"))
            .await
            .unwrap();
        let s3 = engine
            .submit_solution(&bounty.id, new_solution("Wallet3"))
            .await
            .unwrap();

        assert!(matches!(
            engine
                .accept_solution(&bounty.id, acceptance(&s2.id, "Wallet2"))
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            engine
                .accept_solution(&bounty.id, acceptance("missing", "Wallet1"))
                .await,
            Err(ServiceError::NotFound(_))
        ));

        engine
            .accept_solution(&bounty.id, acceptance(&s2.id, "Wallet1"))
            .await
            .unwrap();

        // Repeating the same acceptance is a no-op
        let (again, bounty_again) = engine
            .accept_solution(&bounty.id, acceptance(&s2.id, "Wallet1"))
            .await
            .unwrap();
        assert_eq!(again.status, SolutionStatus::Accepted);
        assert_eq!(bounty_again.solver.as_deref(), Some("Wallet2"));

        // A different solution cannot take over a solved bounty
        assert!(matches!(
            engine
                .accept_solution(&bounty.id, acceptance(&s3.id, "Wallet1"))
                .await,
            Err(ServiceError::InvalidState(_))
        ));

        let detail = engine.get_bounty(&bounty.id).await.unwrap();
        assert_eq!(detail.bounty.solver.as_deref(), Some("Wallet2"));
        let sibling = detail.solutions.iter().find(|s| s.id == s3.id).unwrap();
        assert_eq!(sibling.status, SolutionStatus::Pending);
    }

    #[tokio::test]
    async fn test_solution_belongs_to_bounty() {
        let engine = engine();
        let b1 = engine.create_bounty(new_bounty("Wallet1", 1.0)).await.unwrap();
        let b2 = engine.create_bounty(new_bounty("Wallet1", 1.0)).await.unwrap();
        let s = engine
            .submit_solution(&b1.id, new_solution("Wallet2"))
            .await
            .unwrap();

        assert!(matches!(
            engine.accept_solution(&b2.id, acceptance(&s.id, "Wallet1")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            engine.vote_solution(&b2.id, &s.id, &session("Wallet3")).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_vote_solution_rules() {
        let engine = engine();
        let bounty = engine.create_bounty(new_bounty("Wallet1", 1.0)).await.unwrap();
        let s = engine
            .submit_solution(&bounty.id, new_solution("Wallet2"))
            .await
            .unwrap();

        assert!(matches!(
            engine.vote_solution(&bounty.id, &s.id, &session("Wallet2")).await,
            Err(ServiceError::Forbidden(_))
        ));

        let voted = engine
            .vote_solution(&bounty.id, &s.id, &session("Wallet3"))
            .await
            .unwrap();
        assert_eq!(voted.votes, 1);
        assert_eq!(voted.voters, vec!["Wallet3".to_string()]);

        assert!(matches!(
            engine.vote_solution(&bounty.id, &s.id, &session("Wallet3")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_double_vote_counts_once() {
        let engine = Arc::new(engine());
        let bounty = engine.create_bounty(new_bounty("Wallet1", 1.0)).await.unwrap();
        let s = engine
            .submit_solution(&bounty.id, new_solution("Wallet2"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let bounty_id = bounty.id.clone();
                let solution_id = s.id.clone();
                tokio::spawn(async move {
                    engine
                        .vote_solution(&bounty_id, &solution_id, &session("Wallet3"))
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, ServiceError::Conflict(_))),
            }
        }
        assert_eq!(ok, 1);

        let detail = engine.get_bounty(&bounty.id).await.unwrap();
        assert_eq!(detail.solutions[0].votes, 1);
        assert_eq!(detail.solutions[0].voters.len(), 1);
    }

    #[tokio::test]
    async fn test_views_increment_in_background() {
        let engine = engine();
        let bounty = engine.create_bounty(new_bounty("Wallet1", 1.0)).await.unwrap();

        engine.increment_views(&bounty.id);
        engine.increment_views(&bounty.id);
        engine.increment_views("missing");

        let mut views = 0;
        for _ in 0..50 {
            views = engine.store.get_bounty(&bounty.id).await.unwrap().unwrap().views;
            if views == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(views, 2);
    }

    #[tokio::test]
    async fn test_list_bounties_params() {
        let engine = engine();
        for amount in [0.5, 2.0, 1.0] {
            engine.create_bounty(new_bounty("Wallet1", amount)).await.unwrap();
        }
        engine.create_bounty(new_bounty("Wallet9", 3.0)).await.unwrap();

        let listing = engine
            .list_bounties(&ListParams {
                creator: Some("Wallet1".to_string()),
                sort: Some("bountyAmount".to_string()),
                order: Some("asc".to_string()),
                limit: Some("2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let amounts: Vec<f64> = listing.bounties.iter().map(|b| b.bounty_amount).collect();
        assert_eq!(amounts, vec![0.5, 1.0]);
        assert_eq!(listing.pagination.total, 3);
        assert_eq!(listing.pagination.pages, 2);
        assert_eq!(listing.stats.total_bounties, 4);
        assert_eq!(listing.stats.open_bounties, 4);

        for bad in [
            ListParams {
                status: Some("archived".to_string()),
                ..Default::default()
            },
            ListParams {
                sort: Some("creator".to_string()),
                ..Default::default()
            },
            ListParams {
                page: Some("0".to_string()),
                ..Default::default()
            },
            ListParams {
                limit: Some("101".to_string()),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                engine.list_bounties(&bad).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_solutions_by_solver_enriched() {
        let engine = engine();
        let bounty = engine.create_bounty(new_bounty("Wallet1", 0.7)).await.unwrap();
        engine
            .submit_solution(&bounty.id, new_solution("Wallet2"))
            .await
            .unwrap();

        let mine = engine.solutions_by_solver("Wallet2").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].bounty_title, "Find X");
        assert!((mine[0].bounty_amount - 0.7).abs() < f64::EPSILON);

        assert!(engine.solutions_by_solver("Nobody").await.unwrap().is_empty());
        assert!(matches!(
            engine.solutions_by_solver(" ").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_card_create_and_vote() {
        let engine = engine();

        let card = engine
            .create_card(&session("Creator"), new_card("RUG"))
            .await
            .unwrap();
        assert_eq!(card.creator, "Creator");
        assert!(card.attributes.website.is_none());
        assert!(!card.is_tokenized);

        assert!(matches!(
            engine.vote_card(&session("Creator"), &card.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let voted = engine.vote_card(&session("Fan"), &card.id).await.unwrap();
        assert_eq!(voted.votes, 1);

        assert!(matches!(
            engine.vote_card(&session("Fan"), &card.id).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            engine.vote_card(&session("Fan"), "missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            engine.vote_card(&session("Fan"), "").await,
            Err(ServiceError::Validation(_))
        ));

        let listing = engine.list_cards(&ListParams::default()).await.unwrap();
        assert_eq!(listing.cards.len(), 1);
        assert_eq!(listing.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_card_validation() {
        let engine = engine();
        let creator = session("Creator");

        for ticker in ["", "TOOLONGTICK", "RUG!"] {
            assert!(matches!(
                engine.create_card(&creator, new_card(ticker)).await,
                Err(ServiceError::Validation(_))
            ));
        }

        let mut no_image = new_card("RUG");
        no_image.image_url = None;
        assert!(matches!(
            engine.create_card(&creator, no_image).await,
            Err(ServiceError::Validation(ref m)) if m == "Image is required"
        ));

        let mut long_title = new_card("RUG");
        long_title.title = "x".repeat(19);
        assert!(matches!(
            engine.create_card(&creator, long_title).await,
            Err(ServiceError::Validation(_))
        ));

        let mut no_attrs = new_card("RUG");
        no_attrs.attributes = None;
        assert!(matches!(
            engine.create_card(&creator, no_attrs).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
