//! SQLite-backed persistence for findings, filed issues, and repository
//! lifecycle state (§6 "Persisted state format").
//!
//! Grounded on the `SqliteChunkStore` shape: one `Arc<Mutex<Connection>>`
//! behind a small typed API, schema created once at construction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Repository lifecycle state (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Fresh,
    Visited,
    Errored,
}

impl RepoState {
    fn as_str(self) -> &'static str {
        match self {
            RepoState::Fresh => "Fresh",
            RepoState::Visited => "Visited",
            RepoState::Errored => "Errored",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "Visited" => RepoState::Visited,
            "Errored" => RepoState::Errored,
            _ => RepoState::Fresh,
        }
    }
}

/// A finding keyed by `(owner, repo, filepath, root_commit, md5_of_quote,
/// start_line, end_line)` (§6).
#[derive(Debug, Clone)]
pub struct FindingRecord {
    pub owner: String,
    pub repo: String,
    pub filepath: String,
    pub root_commit: String,
    pub md5_of_quote: String,
    pub start_line: u32,
    pub end_line: u32,
    pub category: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy)]
pub struct FindingId(pub i64);

/// `(finding_id, owner, repo, issue_number)` (§6).
#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub finding_id: i64,
    pub owner: String,
    pub repo: String,
    pub issue_number: i64,
}

/// Repository-lifecycle, findings, and issues store, backed by one SQLite
/// connection shared across worker threads.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("store mutex poisoned");

        conn.execute(
            "CREATE TABLE IF NOT EXISTS repositories (
                owner TEXT NOT NULL,
                repo TEXT NOT NULL,
                state TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_attempt_at INTEGER,
                PRIMARY KEY (owner, repo)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS findings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                repo TEXT NOT NULL,
                filepath TEXT NOT NULL,
                root_commit TEXT NOT NULL,
                md5_of_quote TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                category TEXT NOT NULL,
                reason TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (owner, repo, filepath, root_commit, md5_of_quote, start_line, end_line)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS issues (
                finding_id INTEGER NOT NULL,
                owner TEXT NOT NULL,
                repo TEXT NOT NULL,
                issue_number INTEGER NOT NULL,
                PRIMARY KEY (finding_id, owner, repo),
                FOREIGN KEY (finding_id) REFERENCES findings(id)
            )",
            [],
        )?;

        Ok(())
    }

    /// Insert a finding if its dedup key is new; returns `None` when the
    /// key already exists (§6 content-hash de-duplication).
    pub fn insert_finding(&self, finding: &FindingRecord) -> Result<Option<FindingId>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let now = Utc::now().timestamp();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO findings
                (owner, repo, filepath, root_commit, md5_of_quote, start_line, end_line, category, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                finding.owner,
                finding.repo,
                finding.filepath,
                finding.root_commit,
                finding.md5_of_quote,
                finding.start_line,
                finding.end_line,
                finding.category,
                finding.reason,
                now,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(FindingId(conn.last_insert_rowid())))
    }

    pub fn record_issue(&self, issue: &IssueRecord) -> Result<()> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO issues (finding_id, owner, repo, issue_number)
             VALUES (?1, ?2, ?3, ?4)",
            params![issue.finding_id, issue.owner, issue.repo, issue.issue_number],
        )?;
        Ok(())
    }

    /// Every `(owner, repo, issue_number)` triple on file, for the
    /// reaction-tallying sweep.
    pub fn all_open_issues(&self) -> Result<Vec<(String, String, i64)>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare("SELECT owner, repo, issue_number FROM issues")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn repo_state(&self, owner: &str, repo: &str) -> Result<RepoState> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let state: Option<String> = conn
            .query_row(
                "SELECT state FROM repositories WHERE owner = ?1 AND repo = ?2",
                params![owner, repo],
                |row| row.get(0),
            )
            .optional()?;
        Ok(state.map(|s| RepoState::from_str(&s)).unwrap_or(RepoState::Fresh))
    }

    pub fn set_repo_state(&self, owner: &str, repo: &str, state: RepoState) -> Result<()> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let now: DateTime<Utc> = Utc::now();
        conn.execute(
            "INSERT INTO repositories (owner, repo, state, last_attempt_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner, repo) DO UPDATE SET state = excluded.state, last_attempt_at = excluded.last_attempt_at",
            params![owner, repo, state.as_str(), now.timestamp()],
        )?;
        Ok(())
    }

    /// Mark a successful visit: state becomes `Visited`, the attempt
    /// counter resets.
    pub fn mark_visit_succeeded(&self, owner: &str, repo: &str) -> Result<()> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO repositories (owner, repo, state, attempts, last_attempt_at)
             VALUES (?1, ?2, 'Visited', 0, ?3)
             ON CONFLICT(owner, repo) DO UPDATE SET state = 'Visited', attempts = 0, last_attempt_at = excluded.last_attempt_at",
            params![owner, repo, now],
        )?;
        Ok(())
    }

    /// Mark a failed fetch/analysis attempt. The repository is requeued
    /// (left `Fresh`) once; a second consecutive failure marks it `Errored`.
    pub fn mark_visit_failed(&self, owner: &str, repo: &str) -> Result<RepoState> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let now = Utc::now().timestamp();
        let prior_attempts: i64 = conn
            .query_row(
                "SELECT attempts FROM repositories WHERE owner = ?1 AND repo = ?2",
                params![owner, repo],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        let attempts = prior_attempts + 1;
        let next_state = if attempts >= 2 { RepoState::Errored } else { RepoState::Fresh };
        conn.execute(
            "INSERT INTO repositories (owner, repo, state, attempts, last_attempt_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(owner, repo) DO UPDATE SET state = excluded.state, attempts = excluded.attempts, last_attempt_at = excluded.last_attempt_at",
            params![owner, repo, next_state.as_str(), attempts, now],
        )?;
        Ok(next_state)
    }

    /// Repositories currently `Fresh` (never visited, or requeued after one
    /// failed attempt).
    pub fn fresh_repos(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare("SELECT owner, repo FROM repositories WHERE state = 'Fresh'")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
