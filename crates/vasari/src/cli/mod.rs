//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the vasari binary.

mod commands;
mod complete;
mod pricing;

pub use commands::{Cli, Commands, CompleteArgs, Provider};
pub use complete::run_complete;
pub use pricing::show_pricing;
