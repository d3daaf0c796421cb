//! Input source module
//!
//! Produces the seed inputs a collector paginates once per seed: the
//! branches to walk commits on, the pull requests to fetch activities for.
//!
//! Seeds come from a read-only cursor over local tool tables, scoped to the
//! run's connection and repository and optionally filtered by the run's
//! watermark. The cursor is released when the iterator is closed or dropped.

mod query;
mod source;

pub use query::SeedQuery;
pub use source::{InputIterator, InputSource, SeedIterator, SeedSource};
