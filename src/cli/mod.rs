//! CLI module
//!
//! Command-line interface for running collectors.
//!
//! # Commands
//!
//! - `collect` - Run built-in resource collectors
//! - `state` - Show the stored watermark of a resource
//! - `resources` - List built-in resources
//! - `seed` - Register seed inputs in the local tool tables

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
