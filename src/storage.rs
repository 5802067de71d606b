//! Storage for wallets, bounties, solutions and cards
//!
//! [`Store`] is the seam between the engine and persistence. Every method
//! that enforces an invariant (nonce consumption, votes, acceptance) is a
//! single atomic statement or transaction in the backend, so handlers need
//! no in-process coordination.
//!
//! [`SqliteStore`] is the local/single-node backend and what the tests run
//! against; [`crate::pg_storage::PgStore`] is used when DATABASE_URL is set.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::models::{
    Bounty, BountyQuery, BountyStats, Card, CardQuery, Solution, WalletIdentity,
};

const SQLITE_SCHEMA: &str = include_str!("../migrations/sqlite/001_schema.sql");

#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;

    // ------------------------------------------------------------------------
    // WALLETS
    // ------------------------------------------------------------------------

    /// Create the wallet with `nonce` (last_login = now) or overwrite the
    /// nonce of an existing one, leaving last_login untouched
    async fn rotate_nonce(
        &self,
        address: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<WalletIdentity>;

    async fn get_wallet(&self, address: &str) -> Result<Option<WalletIdentity>>;

    /// Replace `expected` with `next` and stamp last_login, only if
    /// `expected` is still the stored nonce. Returns false otherwise.
    async fn consume_nonce(
        &self,
        address: &str,
        expected: &str,
        next: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    // ------------------------------------------------------------------------
    // BOUNTIES
    // ------------------------------------------------------------------------

    async fn insert_bounty(&self, bounty: &Bounty) -> Result<()>;

    async fn get_bounty(&self, id: &str) -> Result<Option<Bounty>>;

    /// Matching page of bounties plus the unpaginated match count
    async fn list_bounties(&self, query: &BountyQuery) -> Result<(Vec<Bounty>, u64)>;

    async fn bounty_stats(&self) -> Result<BountyStats>;

    /// Returns false when no bounty has this id
    async fn increment_views(&self, id: &str) -> Result<bool>;

    // ------------------------------------------------------------------------
    // SOLUTIONS
    // ------------------------------------------------------------------------

    /// Returns false if the (bounty, solver) pair already has a solution
    async fn insert_solution(&self, solution: &Solution) -> Result<bool>;

    async fn get_solution(&self, id: &str) -> Result<Option<Solution>>;

    async fn find_solution(&self, bounty_id: &str, solver: &str) -> Result<Option<Solution>>;

    /// Newest first
    async fn solutions_for_bounty(&self, bounty_id: &str) -> Result<Vec<Solution>>;

    /// Newest first
    async fn solutions_by_solver(&self, solver: &str) -> Result<Vec<Solution>>;

    /// In one transaction: bounty open → solved with `solver`, solution →
    /// accepted. Returns false (nothing written) if the bounty is no longer
    /// open.
    async fn accept_solution(
        &self,
        bounty_id: &str,
        solution_id: &str,
        solver: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Record the vote and bump the counter together. Returns false if the
    /// voter had already voted.
    async fn add_solution_vote(
        &self,
        solution_id: &str,
        voter: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    // ------------------------------------------------------------------------
    // CARDS
    // ------------------------------------------------------------------------

    async fn insert_card(&self, card: &Card) -> Result<()>;

    async fn get_card(&self, id: &str) -> Result<Option<Card>>;

    async fn list_cards(&self, query: &CardQuery) -> Result<(Vec<Card>, u64)>;

    async fn add_card_vote(&self, card_id: &str, voter: &str, now: DateTime<Utc>)
        -> Result<bool>;
}

// ============================================================================
// SQLITE
// ============================================================================

const WALLET_COLUMNS: &str =
    "address, nonce, is_profile_complete, last_login, created_at, updated_at";

const BOUNTY_COLUMNS: &str = "id, title, description, image_url, creator, bounty_amount, \
     status, solver, views, created_at, updated_at";

const SOLUTION_COLUMNS: &str = "id, bounty_id, solver, solution_details, image_urls, status, \
     votes, created_at, updated_at";

const CARD_COLUMNS: &str = "id, title, description, image_url, creator, attributes, votes, \
     is_tokenized, token_id, created_at, updated_at";

const SOLUTION_VOTERS: &str =
    "SELECT voter FROM solution_votes WHERE solution_id = ?1 ORDER BY voted_at, rowid";

const CARD_VOTERS: &str =
    "SELECT voter FROM card_votes WHERE card_id = ?1 ORDER BY voted_at, rowid";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database {}", path.display()))?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        info!("SQLite storage opened at {}", path.display());
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(SQLITE_SCHEMA)
            .context("Failed to apply SQLite schema")
    }
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_text<T: FromStr<Err = String>>(idx: usize, value: String) -> rusqlite::Result<T> {
    value
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_json<T: DeserializeOwned>(idx: usize, value: String) -> rusqlite::Result<T> {
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn wallet_from_row(row: &Row<'_>) -> rusqlite::Result<WalletIdentity> {
    Ok(WalletIdentity {
        address: row.get(0)?,
        nonce: row.get(1)?,
        is_profile_complete: row.get(2)?,
        last_login: parse_ts(3, row.get(3)?)?,
        created_at: parse_ts(4, row.get(4)?)?,
        updated_at: parse_ts(5, row.get(5)?)?,
    })
}

fn bounty_from_row(row: &Row<'_>) -> rusqlite::Result<Bounty> {
    Ok(Bounty {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        creator: row.get(4)?,
        bounty_amount: row.get(5)?,
        status: parse_text(6, row.get(6)?)?,
        solver: row.get(7)?,
        views: row.get(8)?,
        created_at: parse_ts(9, row.get(9)?)?,
        updated_at: parse_ts(10, row.get(10)?)?,
    })
}

/// Voters are filled in separately
fn solution_from_row(row: &Row<'_>) -> rusqlite::Result<Solution> {
    Ok(Solution {
        id: row.get(0)?,
        bounty_id: row.get(1)?,
        solver: row.get(2)?,
        solution_details: row.get(3)?,
        image_urls: parse_json(4, row.get(4)?)?,
        status: parse_text(5, row.get(5)?)?,
        votes: row.get(6)?,
        voters: Vec::new(),
        created_at: parse_ts(7, row.get(7)?)?,
        updated_at: parse_ts(8, row.get(8)?)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        creator: row.get(4)?,
        attributes: parse_json(5, row.get(5)?)?,
        votes: row.get(6)?,
        voters: Vec::new(),
        is_tokenized: row.get(7)?,
        token_id: row.get(8)?,
        created_at: parse_ts(9, row.get(9)?)?,
        updated_at: parse_ts(10, row.get(10)?)?,
    })
}

fn load_voters(conn: &Connection, sql: &str, id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let voters = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(voters)
}

fn query_solutions(conn: &Connection, sql: &str, arg: &str) -> Result<Vec<Solution>> {
    let mut stmt = conn.prepare(sql)?;
    let mut solutions = stmt
        .query_map(params![arg], solution_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for solution in &mut solutions {
        solution.voters = load_voters(conn, SOLUTION_VOTERS, &solution.id)?;
    }
    Ok(solutions)
}

fn get_solution_locked(conn: &Connection, id: &str) -> Result<Option<Solution>> {
    let solution = conn
        .query_row(
            &format!("SELECT {} FROM solutions WHERE id = ?1", SOLUTION_COLUMNS),
            params![id],
            solution_from_row,
        )
        .optional()?;

    match solution {
        Some(mut s) => {
            s.voters = load_voters(conn, SOLUTION_VOTERS, &s.id)?;
            Ok(Some(s))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn rotate_nonce(
        &self,
        address: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<WalletIdentity> {
        let conn = self.conn.lock();
        let now = ts(now);
        conn.execute(
            "INSERT INTO wallets (address, nonce, is_profile_complete, last_login, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?3, ?3)
             ON CONFLICT (address) DO UPDATE SET nonce = excluded.nonce, updated_at = excluded.updated_at",
            params![address, nonce, now],
        )?;

        let wallet = conn.query_row(
            &format!("SELECT {} FROM wallets WHERE address = ?1", WALLET_COLUMNS),
            params![address],
            wallet_from_row,
        )?;
        Ok(wallet)
    }

    async fn get_wallet(&self, address: &str) -> Result<Option<WalletIdentity>> {
        let conn = self.conn.lock();
        let wallet = conn
            .query_row(
                &format!("SELECT {} FROM wallets WHERE address = ?1", WALLET_COLUMNS),
                params![address],
                wallet_from_row,
            )
            .optional()?;
        Ok(wallet)
    }

    async fn consume_nonce(
        &self,
        address: &str,
        expected: &str,
        next: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE wallets SET nonce = ?3, last_login = ?4, updated_at = ?4
             WHERE address = ?1 AND nonce = ?2",
            params![address, expected, next, ts(now)],
        )?;
        Ok(updated == 1)
    }

    async fn insert_bounty(&self, bounty: &Bounty) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO bounties ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                BOUNTY_COLUMNS
            ),
            params![
                bounty.id,
                bounty.title,
                bounty.description,
                bounty.image_url,
                bounty.creator,
                bounty.bounty_amount,
                bounty.status.as_str(),
                bounty.solver,
                bounty.views,
                ts(bounty.created_at),
                ts(bounty.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn get_bounty(&self, id: &str) -> Result<Option<Bounty>> {
        let conn = self.conn.lock();
        let bounty = conn
            .query_row(
                &format!("SELECT {} FROM bounties WHERE id = ?1", BOUNTY_COLUMNS),
                params![id],
                bounty_from_row,
            )
            .optional()?;
        Ok(bounty)
    }

    async fn list_bounties(&self, query: &BountyQuery) -> Result<(Vec<Bounty>, u64)> {
        let conn = self.conn.lock();

        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(status) = query.status {
            args.push(Value::Text(status.as_str().to_string()));
            clauses.push(format!("status = ?{}", args.len()));
        }
        if let Some(creator) = &query.creator {
            args.push(Value::Text(creator.clone()));
            clauses.push(format!("creator = ?{}", args.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM bounties {}", where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM bounties {} ORDER BY {} {}, id LIMIT ?{} OFFSET ?{}",
            BOUNTY_COLUMNS,
            where_sql,
            query.sort.column(),
            query.order.sql(),
            args.len() + 1,
            args.len() + 2,
        );
        args.push(Value::Integer(query.page.limit as i64));
        args.push(Value::Integer(query.page.offset() as i64));

        let mut stmt = conn.prepare(&sql)?;
        let bounties = stmt
            .query_map(params_from_iter(args.iter()), bounty_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((bounties, total as u64))
    }

    async fn bounty_stats(&self) -> Result<BountyStats> {
        let conn = self.conn.lock();
        let stats = conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'open' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'solved' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'solved' THEN bounty_amount ELSE 0.0 END), 0.0)
             FROM bounties",
            [],
            |row| {
                Ok(BountyStats {
                    total_bounties: row.get::<_, i64>(0)? as u64,
                    open_bounties: row.get::<_, i64>(1)? as u64,
                    solved_bounties: row.get::<_, i64>(2)? as u64,
                    total_rewards: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    async fn increment_views(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE bounties SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(updated == 1)
    }

    async fn insert_solution(&self, solution: &Solution) -> Result<bool> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            &format!(
                "INSERT INTO solutions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (bounty_id, solver) DO NOTHING",
                SOLUTION_COLUMNS
            ),
            params![
                solution.id,
                solution.bounty_id,
                solution.solver,
                solution.solution_details,
                serde_json::to_string(&solution.image_urls)?,
                solution.status.as_str(),
                solution.votes,
                ts(solution.created_at),
                ts(solution.updated_at),
            ],
        )?;
        Ok(inserted == 1)
    }

    async fn get_solution(&self, id: &str) -> Result<Option<Solution>> {
        let conn = self.conn.lock();
        get_solution_locked(&conn, id)
    }

    async fn find_solution(&self, bounty_id: &str, solver: &str) -> Result<Option<Solution>> {
        let conn = self.conn.lock();
        let id: Option<String> = conn
            .query_row(
                "SELECT id FROM solutions WHERE bounty_id = ?1 AND solver = ?2",
                params![bounty_id, solver],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => get_solution_locked(&conn, &id),
            None => Ok(None),
        }
    }

    async fn solutions_for_bounty(&self, bounty_id: &str) -> Result<Vec<Solution>> {
        let conn = self.conn.lock();
        query_solutions(
            &conn,
            &format!(
                "SELECT {} FROM solutions WHERE bounty_id = ?1 ORDER BY created_at DESC, id",
                SOLUTION_COLUMNS
            ),
            bounty_id,
        )
    }

    async fn solutions_by_solver(&self, solver: &str) -> Result<Vec<Solution>> {
        let conn = self.conn.lock();
        query_solutions(
            &conn,
            &format!(
                "SELECT {} FROM solutions WHERE solver = ?1 ORDER BY created_at DESC, id",
                SOLUTION_COLUMNS
            ),
            solver,
        )
    }

    async fn accept_solution(
        &self,
        bounty_id: &str,
        solution_id: &str,
        solver: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.conn.lock();
        let now = ts(now);
        let tx = conn.transaction()?;

        let bounty_updated = tx.execute(
            "UPDATE bounties SET status = 'solved', solver = ?2, updated_at = ?3
             WHERE id = ?1 AND status = 'open'",
            params![bounty_id, solver, now],
        )?;
        if bounty_updated == 0 {
            debug!("Bounty {} no longer open, acceptance skipped", bounty_id);
            return Ok(false);
        }

        let solution_updated = tx.execute(
            "UPDATE solutions SET status = 'accepted', updated_at = ?3
             WHERE id = ?1 AND bounty_id = ?2",
            params![solution_id, bounty_id, now],
        )?;
        if solution_updated == 0 {
            // Dropping the transaction rolls back the bounty update
            anyhow::bail!(
                "Solution {} disappeared while accepting it for bounty {}",
                solution_id,
                bounty_id
            );
        }

        tx.commit()?;
        Ok(true)
    }

    async fn add_solution_vote(
        &self,
        solution_id: &str,
        voter: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.conn.lock();
        let now = ts(now);
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO solution_votes (solution_id, voter, voted_at) VALUES (?1, ?2, ?3)",
            params![solution_id, voter, now],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE solutions SET votes = votes + 1, updated_at = ?2 WHERE id = ?1",
            params![solution_id, now],
        )?;
        tx.commit()?;
        Ok(true)
    }

    async fn insert_card(&self, card: &Card) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO cards ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                CARD_COLUMNS
            ),
            params![
                card.id,
                card.title,
                card.description,
                card.image_url,
                card.creator,
                serde_json::to_string(&card.attributes)?,
                card.votes,
                card.is_tokenized,
                card.token_id,
                ts(card.created_at),
                ts(card.updated_at),
            ],
        )?;
        Ok(())
    }

    async fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let conn = self.conn.lock();
        let card = conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                params![id],
                card_from_row,
            )
            .optional()?;

        match card {
            Some(mut c) => {
                c.voters = load_voters(&conn, CARD_VOTERS, &c.id)?;
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    async fn list_cards(&self, query: &CardQuery) -> Result<(Vec<Card>, u64)> {
        let conn = self.conn.lock();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cards ORDER BY {} {}, id LIMIT ?1 OFFSET ?2",
            CARD_COLUMNS,
            query.sort.column(),
            query.order.sql(),
        ))?;
        let mut cards = stmt
            .query_map(
                params![query.page.limit as i64, query.page.offset() as i64],
                card_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for card in &mut cards {
            card.voters = load_voters(&conn, CARD_VOTERS, &card.id)?;
        }

        Ok((cards, total as u64))
    }

    async fn add_card_vote(
        &self,
        card_id: &str,
        voter: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.conn.lock();
        let now = ts(now);
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO card_votes (card_id, voter, voted_at) VALUES (?1, ?2, ?3)",
            params![card_id, voter, now],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE cards SET votes = votes + 1, updated_at = ?2 WHERE id = ?1",
            params![card_id, now],
        )?;
        tx.commit()?;
        Ok(true)
    }
}
