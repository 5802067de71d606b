//! PostgreSQL storage for the bounty board
//!
//! Production backend, selected when DATABASE_URL is set. Implements the
//! same [`Store`] contract as the SQLite backend: votes are one CTE
//! statement, acceptance is one transaction, nonce consumption is one
//! conditional update.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::types::{Json, ToSql};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

use crate::models::{
    Bounty, BountyQuery, BountyStats, BountyStatus, Card, CardAttributes, CardQuery, Solution,
    WalletIdentity,
};
use crate::storage::Store;

/// Database pool configuration
const DB_POOL_MAX_SIZE: usize = 20;
const DB_QUERY_TIMEOUT_SECS: u64 = 30;

const WALLET_COLUMNS: &str =
    "address, nonce, is_profile_complete, last_login, created_at, updated_at";

const BOUNTY_COLUMNS: &str = "id, title, description, image_url, creator, bounty_amount, \
     status, solver, views, created_at, updated_at";

const SOLUTION_SELECT: &str = "SELECT s.id, s.bounty_id, s.solver, s.solution_details, \
     s.image_urls, s.status, s.votes, s.created_at, s.updated_at, \
     ARRAY(SELECT v.voter FROM solution_votes v WHERE v.solution_id = s.id \
           ORDER BY v.voted_at, v.voter) AS voters \
     FROM solutions s";

const CARD_SELECT: &str = "SELECT c.id, c.title, c.description, c.image_url, c.creator, \
     c.attributes, c.votes, c.is_tokenized, c.token_id, c.created_at, c.updated_at, \
     ARRAY(SELECT v.voter FROM card_votes v WHERE v.card_id = c.id \
           ORDER BY v.voted_at, v.voter) AS voters \
     FROM cards c";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Create storage from DATABASE_URL
    pub async fn new(database_url: &str) -> Result<Self> {
        use deadpool_postgres::{ManagerConfig, PoolConfig, RecyclingMethod};
        use std::time::Duration;

        let mut config = Config::new();
        config.url = Some(database_url.to_string());
        // Applies to every pooled connection, not just the first one
        config.options = Some(format!(
            "-c statement_timeout={}s",
            DB_QUERY_TIMEOUT_SECS
        ));

        config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        config.pool = Some(PoolConfig {
            max_size: DB_POOL_MAX_SIZE,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(Duration::from_secs(DB_QUERY_TIMEOUT_SECS)),
                create: Some(Duration::from_secs(10)),
                recycle: Some(Duration::from_secs(30)),
            },
            ..Default::default()
        });

        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;

        // Test connection
        let client = pool.get().await?;
        client.execute("SELECT 1", &[]).await?;

        info!(
            "Connected to PostgreSQL (pool_size: {}, query_timeout: {}s)",
            DB_POOL_MAX_SIZE, DB_QUERY_TIMEOUT_SECS
        );

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run embedded migrations
    async fn run_migrations(&self) -> Result<()> {
        let client = self.pool.get().await?;

        let exists: bool = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = 'schema_migrations')",
                &[],
            )
            .await?
            .get(0);

        if !exists {
            let migration_sql = include_str!("../migrations/postgres/001_schema.sql");
            client.batch_execute(migration_sql).await?;
            info!("Applied migration 001_schema");
        }

        Ok(())
    }
}

fn wallet_from_row(r: &Row) -> WalletIdentity {
    WalletIdentity {
        address: r.get(0),
        nonce: r.get(1),
        is_profile_complete: r.get(2),
        last_login: r.get(3),
        created_at: r.get(4),
        updated_at: r.get(5),
    }
}

fn bounty_from_row(r: &Row) -> Bounty {
    Bounty {
        id: r.get(0),
        title: r.get(1),
        description: r.get(2),
        image_url: r.get(3),
        creator: r.get(4),
        bounty_amount: r.get(5),
        status: r.get(6),
        solver: r.get(7),
        views: r.get(8),
        created_at: r.get(9),
        updated_at: r.get(10),
    }
}

fn solution_from_row(r: &Row) -> Solution {
    Solution {
        id: r.get(0),
        bounty_id: r.get(1),
        solver: r.get(2),
        solution_details: r.get(3),
        image_urls: r.get(4),
        status: r.get(5),
        votes: r.get(6),
        created_at: r.get(7),
        updated_at: r.get(8),
        voters: r.get(9),
    }
}

fn card_from_row(r: &Row) -> Card {
    let Json(attributes): Json<CardAttributes> = r.get(5);
    Card {
        id: r.get(0),
        title: r.get(1),
        description: r.get(2),
        image_url: r.get(3),
        creator: r.get(4),
        attributes,
        votes: r.get(6),
        is_tokenized: r.get(7),
        token_id: r.get(8),
        created_at: r.get(9),
        updated_at: r.get(10),
        voters: r.get(11),
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    // ========================================================================
    // WALLETS
    // ========================================================================

    async fn rotate_nonce(
        &self,
        address: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<WalletIdentity> {
        let client = self.pool.get().await?;

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO wallets (address, nonce, is_profile_complete, last_login, created_at, updated_at)
                     VALUES ($1, $2, FALSE, $3, $3, $3)
                     ON CONFLICT (address) DO UPDATE SET nonce = EXCLUDED.nonce, updated_at = EXCLUDED.updated_at
                     RETURNING {}",
                    WALLET_COLUMNS
                ),
                &[&address, &nonce, &now],
            )
            .await?;

        Ok(wallet_from_row(&row))
    }

    async fn get_wallet(&self, address: &str) -> Result<Option<WalletIdentity>> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(
                &format!("SELECT {} FROM wallets WHERE address = $1", WALLET_COLUMNS),
                &[&address],
            )
            .await?;

        Ok(row.as_ref().map(wallet_from_row))
    }

    async fn consume_nonce(
        &self,
        address: &str,
        expected: &str,
        next: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let client = self.pool.get().await?;

        let updated = client
            .execute(
                "UPDATE wallets SET nonce = $3, last_login = $4, updated_at = $4
                 WHERE address = $1 AND nonce = $2",
                &[&address, &expected, &next, &now],
            )
            .await?;

        Ok(updated == 1)
    }

    // ========================================================================
    // BOUNTIES
    // ========================================================================

    async fn insert_bounty(&self, bounty: &Bounty) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                &format!(
                    "INSERT INTO bounties ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
                    BOUNTY_COLUMNS
                ),
                &[
                    &bounty.id,
                    &bounty.title,
                    &bounty.description,
                    &bounty.image_url,
                    &bounty.creator,
                    &bounty.bounty_amount,
                    &bounty.status,
                    &bounty.solver,
                    &bounty.views,
                    &bounty.created_at,
                    &bounty.updated_at,
                ],
            )
            .await?;

        Ok(())
    }

    async fn get_bounty(&self, id: &str) -> Result<Option<Bounty>> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(
                &format!("SELECT {} FROM bounties WHERE id = $1", BOUNTY_COLUMNS),
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(bounty_from_row))
    }

    async fn list_bounties(&self, query: &BountyQuery) -> Result<(Vec<Bounty>, u64)> {
        let client = self.pool.get().await?;

        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
        if let Some(status) = query.status {
            args.push(Box::new(status));
            clauses.push(format!("status = ${}", args.len()));
        }
        if let Some(creator) = &query.creator {
            args.push(Box::new(creator.clone()));
            clauses.push(format!("creator = ${}", args.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let filter_params: Vec<&(dyn ToSql + Sync)> = args
            .iter()
            .map(|a| a.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM bounties {}", where_sql),
                &filter_params,
            )
            .await?
            .get(0);

        let limit = query.page.limit as i64;
        let offset = query.page.offset() as i64;
        let mut page_params = filter_params.clone();
        page_params.push(&limit);
        page_params.push(&offset);

        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM bounties {} ORDER BY {} {}, id LIMIT ${} OFFSET ${}",
                    BOUNTY_COLUMNS,
                    where_sql,
                    query.sort.column(),
                    query.order.sql(),
                    filter_params.len() + 1,
                    filter_params.len() + 2,
                ),
                &page_params,
            )
            .await?;

        Ok((rows.iter().map(bounty_from_row).collect(), total as u64))
    }

    async fn bounty_stats(&self) -> Result<BountyStats> {
        let client = self.pool.get().await?;

        let row = client
            .query_one(
                "SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'open'),
                    COUNT(*) FILTER (WHERE status = 'solved'),
                    COALESCE(SUM(bounty_amount) FILTER (WHERE status = 'solved'), 0)::DOUBLE PRECISION
                 FROM bounties",
                &[],
            )
            .await?;

        Ok(BountyStats {
            total_bounties: row.get::<_, i64>(0) as u64,
            open_bounties: row.get::<_, i64>(1) as u64,
            solved_bounties: row.get::<_, i64>(2) as u64,
            total_rewards: row.get(3),
        })
    }

    async fn increment_views(&self, id: &str) -> Result<bool> {
        let client = self.pool.get().await?;

        let updated = client
            .execute(
                "UPDATE bounties SET views = views + 1 WHERE id = $1",
                &[&id],
            )
            .await?;

        Ok(updated == 1)
    }

    // ========================================================================
    // SOLUTIONS
    // ========================================================================

    async fn insert_solution(&self, solution: &Solution) -> Result<bool> {
        let client = self.pool.get().await?;

        let inserted = client
            .execute(
                "INSERT INTO solutions (id, bounty_id, solver, solution_details, image_urls, status, votes, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (bounty_id, solver) DO NOTHING",
                &[
                    &solution.id,
                    &solution.bounty_id,
                    &solution.solver,
                    &solution.solution_details,
                    &solution.image_urls,
                    &solution.status,
                    &solution.votes,
                    &solution.created_at,
                    &solution.updated_at,
                ],
            )
            .await?;

        Ok(inserted == 1)
    }

    async fn get_solution(&self, id: &str) -> Result<Option<Solution>> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(&format!("{} WHERE s.id = $1", SOLUTION_SELECT), &[&id])
            .await?;

        Ok(row.as_ref().map(solution_from_row))
    }

    async fn find_solution(&self, bounty_id: &str, solver: &str) -> Result<Option<Solution>> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(
                &format!("{} WHERE s.bounty_id = $1 AND s.solver = $2", SOLUTION_SELECT),
                &[&bounty_id, &solver],
            )
            .await?;

        Ok(row.as_ref().map(solution_from_row))
    }

    async fn solutions_for_bounty(&self, bounty_id: &str) -> Result<Vec<Solution>> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                &format!(
                    "{} WHERE s.bounty_id = $1 ORDER BY s.created_at DESC, s.id",
                    SOLUTION_SELECT
                ),
                &[&bounty_id],
            )
            .await?;

        Ok(rows.iter().map(solution_from_row).collect())
    }

    async fn solutions_by_solver(&self, solver: &str) -> Result<Vec<Solution>> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                &format!(
                    "{} WHERE s.solver = $1 ORDER BY s.created_at DESC, s.id",
                    SOLUTION_SELECT
                ),
                &[&solver],
            )
            .await?;

        Ok(rows.iter().map(solution_from_row).collect())
    }

    async fn accept_solution(
        &self,
        bounty_id: &str,
        solution_id: &str,
        solver: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let bounty_updated = tx
            .execute(
                "UPDATE bounties SET status = $2, solver = $3, updated_at = $4
                 WHERE id = $1 AND status = 'open'",
                &[&bounty_id, &BountyStatus::Solved, &solver, &now],
            )
            .await?;
        if bounty_updated == 0 {
            debug!("Bounty {} no longer open, acceptance skipped", bounty_id);
            return Ok(false);
        }

        let solution_updated = tx
            .execute(
                "UPDATE solutions SET status = 'accepted', updated_at = $3
                 WHERE id = $1 AND bounty_id = $2",
                &[&solution_id, &bounty_id, &now],
            )
            .await?;
        if solution_updated == 0 {
            anyhow::bail!(
                "Solution {} disappeared while accepting it for bounty {}",
                solution_id,
                bounty_id
            );
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn add_solution_vote(
        &self,
        solution_id: &str,
        voter: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let client = self.pool.get().await?;

        let updated = client
            .execute(
                "WITH ins AS (
                    INSERT INTO solution_votes (solution_id, voter, voted_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT DO NOTHING
                    RETURNING solution_id
                 )
                 UPDATE solutions SET votes = votes + 1, updated_at = $3
                 WHERE id IN (SELECT solution_id FROM ins)",
                &[&solution_id, &voter, &now],
            )
            .await?;

        Ok(updated == 1)
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    async fn insert_card(&self, card: &Card) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                "INSERT INTO cards (id, title, description, image_url, creator, attributes, votes, is_tokenized, token_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
                &[
                    &card.id,
                    &card.title,
                    &card.description,
                    &card.image_url,
                    &card.creator,
                    &Json(&card.attributes),
                    &card.votes,
                    &card.is_tokenized,
                    &card.token_id,
                    &card.created_at,
                    &card.updated_at,
                ],
            )
            .await?;

        Ok(())
    }

    async fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(&format!("{} WHERE c.id = $1", CARD_SELECT), &[&id])
            .await?;

        Ok(row.as_ref().map(card_from_row))
    }

    async fn list_cards(&self, query: &CardQuery) -> Result<(Vec<Card>, u64)> {
        let client = self.pool.get().await?;

        let total: i64 = client
            .query_one("SELECT COUNT(*) FROM cards", &[])
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "{} ORDER BY c.{} {}, c.id LIMIT $1 OFFSET $2",
                    CARD_SELECT,
                    query.sort.column(),
                    query.order.sql(),
                ),
                &[&(query.page.limit as i64), &(query.page.offset() as i64)],
            )
            .await?;

        Ok((rows.iter().map(card_from_row).collect(), total as u64))
    }

    async fn add_card_vote(
        &self,
        card_id: &str,
        voter: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let client = self.pool.get().await?;

        let updated = client
            .execute(
                "WITH ins AS (
                    INSERT INTO card_votes (card_id, voter, voted_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT DO NOTHING
                    RETURNING card_id
                 )
                 UPDATE cards SET votes = votes + 1, updated_at = $3
                 WHERE id IN (SELECT card_id FROM ins)",
                &[&card_id, &voter, &now],
            )
            .await?;

        Ok(updated == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BountySort, Page, SortOrder};

    async fn connect() -> Option<PgStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(PgStore::new(&url).await.unwrap())
    }

    #[tokio::test]
    async fn test_pg_nonce_rotation() {
        let Some(store) = connect().await else {
            return;
        };
        let address = format!("pg-test-{}", uuid::Uuid::new_v4());

        store.rotate_nonce(&address, "n1", Utc::now()).await.unwrap();
        assert!(store.consume_nonce(&address, "n1", "n2", Utc::now()).await.unwrap());
        assert!(!store.consume_nonce(&address, "n1", "n3", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_pg_list_bounties_query_shape() {
        let Some(store) = connect().await else {
            return;
        };
        let creator = format!("pg-creator-{}", uuid::Uuid::new_v4());
        let (bounties, total) = store
            .list_bounties(&BountyQuery {
                status: Some(BountyStatus::Open),
                creator: Some(creator),
                sort: BountySort::BountyAmount,
                order: SortOrder::Asc,
                page: Page { page: 1, limit: 10 },
            })
            .await
            .unwrap();
        assert!(bounties.is_empty());
        assert_eq!(total, 0);
    }
}
