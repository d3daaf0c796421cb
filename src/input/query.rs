//! Seed query construction

use crate::state::CollectorState;
use crate::storage::sql_timestamp;
use crate::types::{CollectionParams, SeedKind};
use duckdb::types::Value as SqlValue;

/// Which tool table and column seeds are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedQuery {
    /// Seed variant, selects the projected column
    pub kind: SeedKind,
    /// Source table
    pub table: &'static str,
    /// Column compared with the watermark
    pub updated_at_column: &'static str,
}

impl SeedQuery {
    /// Query over the tool table of `kind`
    pub fn for_kind(kind: SeedKind) -> Self {
        Self {
            kind,
            table: kind.tool_table(),
            updated_at_column: "bitbucket_updated_at",
        }
    }

    /// Branch names
    pub fn branches() -> Self {
        Self::for_kind(SeedKind::Branch)
    }

    /// Commit hashes
    pub fn commits() -> Self {
        Self::for_kind(SeedKind::CommitSha)
    }

    /// Pull request ids
    pub fn pull_requests() -> Self {
        Self::for_kind(SeedKind::BitbucketId)
    }

    /// SQL and bound arguments for one run
    pub fn build(
        &self,
        params: &CollectionParams,
        state: &CollectorState,
    ) -> (String, Vec<SqlValue>) {
        let column = self.kind.column();
        let mut sql = format!(
            "SELECT {column} FROM {} WHERE repo_id = ? AND connection_id = ?",
            self.table
        );
        let mut args = vec![
            SqlValue::Text(params.full_name.clone()),
            SqlValue::UBigInt(params.connection_id),
        ];

        if let (true, Some(since)) = (state.is_incremental, state.since) {
            sql.push_str(&format!(
                " AND {} > CAST(? AS TIMESTAMP)",
                self.updated_at_column
            ));
            args.push(SqlValue::Text(sql_timestamp(&since)));
        }

        sql.push_str(&format!(" ORDER BY {column}"));
        (sql, args)
    }
}
