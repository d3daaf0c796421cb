//! Query builder module
//!
//! Builds the query parameters of each page request from the page descriptor
//! and the run's collector state.
//!
//! Every request carries `state=all`, `page` and `pagelen`. Collectors can add
//! a field projection (`fields`) and opt into incremental filtering
//! (`sort=created_on`, `q=updated_on>=<watermark>`).

mod builder;

pub use builder::QueryBuilder;
