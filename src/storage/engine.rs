//! DuckDB-backed storage engine

use super::types::{raw_table_name, RawStore, StoredRawRow};
use crate::error::{Error, Result};
use crate::state::{StateKey, StateStore, StoredState};
use crate::types::{CollectionParams, RawRecord, SeedInput, SeedKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::types::Value as SqlValue;
use duckdb::{params, params_from_iter, Connection, OptionalExt};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tracing::debug;

/// Table names are interpolated into SQL, so only plain identifiers pass
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier regex is valid"));

const STATE_TABLE: &str = "_collector_latest_state";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS _collector_latest_state (
    raw_table VARCHAR NOT NULL,
    params VARCHAR NOT NULL,
    latest_success_start VARCHAR NOT NULL,
    time_after VARCHAR,
    PRIMARY KEY (raw_table, params)
);
CREATE TABLE IF NOT EXISTS _tool_bitbucket_server_branches (
    connection_id UBIGINT NOT NULL,
    repo_id VARCHAR NOT NULL,
    branch VARCHAR NOT NULL,
    bitbucket_updated_at TIMESTAMP,
    PRIMARY KEY (connection_id, repo_id, branch)
);
CREATE TABLE IF NOT EXISTS _tool_bitbucket_server_commits (
    connection_id UBIGINT NOT NULL,
    repo_id VARCHAR NOT NULL,
    commit_sha VARCHAR NOT NULL,
    bitbucket_updated_at TIMESTAMP,
    PRIMARY KEY (connection_id, repo_id, commit_sha)
);
CREATE TABLE IF NOT EXISTS _tool_bitbucket_server_pull_requests (
    connection_id UBIGINT NOT NULL,
    repo_id VARCHAR NOT NULL,
    bitbucket_id BIGINT NOT NULL,
    bitbucket_updated_at TIMESTAMP,
    PRIMARY KEY (connection_id, repo_id, bitbucket_id)
);
";

/// Raw, state and seed storage in one DuckDB database
#[derive(Clone)]
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            Error::storage(format!(
                "Failed to open DuckDB database {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::init(conn)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to create DuckDB connection: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::storage(format!("Failed to create tables: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("DuckDB connection mutex poisoned"))
    }

    /// A second connection to the same database, for long-lived cursors
    pub fn try_clone_connection(&self) -> Result<Connection> {
        Ok(self.lock()?.try_clone()?)
    }

    /// Create the raw table of collector `name` if missing.
    ///
    /// Rows are keyed by scope, seed and an md5 digest of the document, so
    /// re-collecting a document replaces it while anything new is appended.
    pub fn ensure_raw_table(&self, name: &str) -> Result<String> {
        let table = raw_table_name(name);
        validate_identifier(&table)?;

        self.lock()?
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    params VARCHAR NOT NULL,
                    input VARCHAR NOT NULL,
                    page INTEGER NOT NULL,
                    position INTEGER NOT NULL,
                    url VARCHAR NOT NULL,
                    data VARCHAR NOT NULL,
                    digest VARCHAR NOT NULL,
                    created_at TIMESTAMP DEFAULT current_timestamp,
                    PRIMARY KEY (params, input, digest)
                );"
            ))
            .map_err(|e| Error::storage(format!("Failed to create {table}: {e}")))?;

        Ok(table)
    }

    /// Write one page of raw records in a single transaction
    pub fn insert_raw(&self, name: &str, records: &[RawRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let table = self.ensure_raw_table(name)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {table} (params, input, page, position, url, data, digest)
                 VALUES (?, ?, ?, ?, ?, ?, md5(?))"
            ))?;
            for (position, record) in records.iter().enumerate() {
                stmt.execute(params![
                    record.params.to_json(),
                    record.input_json(),
                    i64::from(record.page),
                    position as i64,
                    record.url,
                    record.data.get(),
                    record.data.get(),
                ])?;
            }
        }
        tx.commit()?;

        debug!(table = %table, rows = records.len(), "raw rows saved");
        Ok(records.len())
    }

    /// Read back the raw rows of collector `name` for one scope
    pub fn fetch_raw(&self, name: &str, params: &CollectionParams) -> Result<Vec<StoredRawRow>> {
        let table = raw_table_name(name);
        validate_identifier(&table)?;
        if !self.table_exists(&table)? {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT params, input, page, position, url, data FROM {table}
             WHERE params = ? ORDER BY input, page, position, created_at"
        ))?;
        let rows = stmt
            .query_map([params.to_json()], |row| {
                Ok(StoredRawRow {
                    params: row.get(0)?,
                    input: row.get(1)?,
                    page: row.get::<_, i32>(2)? as u32,
                    position: row.get::<_, i32>(3)? as u32,
                    url: row.get(4)?,
                    data: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Count the raw rows of collector `name`
    pub fn count_raw(&self, name: &str) -> Result<usize> {
        let table = raw_table_name(name);
        validate_identifier(&table)?;
        if !self.table_exists(&table)? {
            return Ok(0);
        }

        let count: i64 = self
            .lock()?
            .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.lock()?.query_row(
            "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert or update a seed row for a scope
    pub fn upsert_seed(
        &self,
        params: &CollectionParams,
        seed: &SeedInput,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let kind = seed.kind();
        let value = match seed {
            SeedInput::BitbucketId(id) => SqlValue::BigInt(*id),
            SeedInput::Branch(s) | SeedInput::CommitSha(s) => SqlValue::Text(s.clone()),
        };
        let updated_at = updated_at
            .map(|ts| SqlValue::Text(sql_timestamp(&ts)))
            .unwrap_or(SqlValue::Null);

        self.lock()?.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (connection_id, repo_id, {}, bitbucket_updated_at)
                 VALUES (?, ?, ?, CAST(? AS TIMESTAMP))",
                kind.tool_table(),
                kind.column()
            ),
            params_from_iter([
                SqlValue::UBigInt(params.connection_id),
                SqlValue::Text(params.full_name.clone()),
                value,
                updated_at,
            ]),
        )?;
        Ok(())
    }

    /// Number of seed rows of one kind for a scope
    pub fn count_seeds(&self, params: &CollectionParams, kind: SeedKind) -> Result<usize> {
        let count: i64 = self.lock()?.query_row(
            &format!(
                "SELECT count(*) FROM {} WHERE connection_id = ? AND repo_id = ?",
                kind.tool_table()
            ),
            params_from_iter([
                SqlValue::UBigInt(params.connection_id),
                SqlValue::Text(params.full_name.clone()),
            ]),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn load_state(&self, key: &StateKey) -> Result<Option<StoredState>> {
        let row: Option<(String, Option<String>)> = self
            .lock()?
            .query_row(
                &format!(
                    "SELECT latest_success_start, time_after FROM {STATE_TABLE}
                     WHERE raw_table = ? AND params = ?"
                ),
                [&key.raw_table, &key.params],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((latest_success_start, time_after)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredState {
            latest_success_start: parse_timestamp(&latest_success_start)?,
            time_after: time_after.as_deref().map(parse_timestamp).transpose()?,
        }))
    }

    fn save_state(&self, key: &StateKey, state: &StoredState) -> Result<()> {
        self.lock()?.execute(
            &format!(
                "INSERT OR REPLACE INTO {STATE_TABLE}
                 (raw_table, params, latest_success_start, time_after) VALUES (?, ?, ?, ?)"
            ),
            params![
                key.raw_table,
                key.params,
                state.latest_success_start.to_rfc3339(),
                state.time_after.map(|ts| ts.to_rfc3339()),
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl RawStore for DuckDbStore {
    async fn save(&self, name: &str, records: &[RawRecord]) -> Result<usize> {
        self.insert_raw(name, records)
    }
}

#[async_trait]
impl StateStore for DuckDbStore {
    async fn load(&self, key: &StateKey) -> Result<Option<StoredState>> {
        self.load_state(key)
    }

    async fn save(&self, key: &StateKey, state: &StoredState) -> Result<()> {
        self.save_state(key, state)
    }
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore").finish_non_exhaustive()
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(Error::storage(format!("invalid table name '{name}'")))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::state(format!("invalid stored timestamp '{value}': {e}")))
}

/// Naive UTC text DuckDB casts to TIMESTAMP without timezone handling
pub(crate) fn sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}
