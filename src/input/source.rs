//! Input source traits and the DuckDB cursor implementation

use super::query::SeedQuery;
use crate::error::Result;
use crate::state::CollectorState;
use crate::storage::DuckDbStore;
use crate::types::{CollectionParams, SeedInput, SeedKind};
use async_trait::async_trait;
use duckdb::types::Value as SqlValue;
use duckdb::{params_from_iter, Connection, Row};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// Rows buffered ahead of the consumer
const CHANNEL_CAPACITY: usize = 64;

/// Opens seed iterators for a run
#[async_trait]
pub trait InputSource: Send + Sync {
    /// Open a fresh iterator scoped to `params`, filtered by `state`
    async fn open(
        &self,
        params: &CollectionParams,
        state: &CollectorState,
    ) -> Result<Box<dyn InputIterator>>;
}

/// A finite, non-restartable sequence of seeds
#[async_trait]
pub trait InputIterator: Send {
    /// Next seed, `None` once exhausted
    async fn next_input(&mut self) -> Result<Option<SeedInput>>;

    /// Release the underlying cursor. Idempotent.
    fn close(&mut self);
}

/// Seeds read from a DuckDB tool table
#[derive(Debug, Clone)]
pub struct SeedSource {
    store: DuckDbStore,
    query: SeedQuery,
}

impl SeedSource {
    /// Create a source over `store`
    pub fn new(store: DuckDbStore, query: SeedQuery) -> Self {
        Self { store, query }
    }

    /// The query this source runs
    pub fn query(&self) -> &SeedQuery {
        &self.query
    }
}

#[async_trait]
impl InputSource for SeedSource {
    async fn open(
        &self,
        params: &CollectionParams,
        state: &CollectorState,
    ) -> Result<Box<dyn InputIterator>> {
        let conn = self.store.try_clone_connection()?;
        let (sql, args) = self.query.build(params, state);
        debug!(sql = %sql, "opening seed cursor");
        Ok(Box::new(SeedIterator::spawn(conn, sql, args, self.query.kind)))
    }
}

/// Streams rows from a blocking DuckDB cursor through a bounded channel
pub struct SeedIterator {
    rx: mpsc::Receiver<Result<SeedInput>>,
    closed: bool,
}

impl SeedIterator {
    /// Start the cursor on a blocking task
    pub fn spawn(conn: Connection, sql: String, args: Vec<SqlValue>, kind: SeedKind) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = run_cursor(&conn, &sql, args, kind, &tx) {
                // Nobody may be listening anymore.
                let _ = tx.blocking_send(Err(e));
            }
        });
        Self { rx, closed: false }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl InputIterator for SeedIterator {
    async fn next_input(&mut self) -> Result<Option<SeedInput>> {
        if self.closed {
            return Ok(None);
        }
        self.rx.recv().await.transpose()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.rx.close();
        }
    }
}

impl Stream for SeedIterator {
    type Item = Result<SeedInput>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl Drop for SeedIterator {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SeedIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedIterator")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

fn run_cursor(
    conn: &Connection,
    sql: &str,
    args: Vec<SqlValue>,
    kind: SeedKind,
    tx: &mpsc::Sender<Result<SeedInput>>,
) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(args))?;

    while let Some(row) = rows.next()? {
        let seed = decode_row(row, kind)?;
        if tx.blocking_send(Ok(seed)).is_err() {
            debug!("seed cursor closed by consumer");
            break;
        }
    }
    Ok(())
}

fn decode_row(row: &Row<'_>, kind: SeedKind) -> Result<SeedInput> {
    Ok(match kind {
        SeedKind::BitbucketId => SeedInput::BitbucketId(row.get(0)?),
        SeedKind::Branch => SeedInput::Branch(row.get(0)?),
        SeedKind::CommitSha => SeedInput::CommitSha(row.get(0)?),
    })
}
