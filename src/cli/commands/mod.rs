//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. Reports go to the writer handed to
//! the command; diagnostics about the run itself go through `tracing`.

pub mod dispatcher;
pub mod fmt;
pub mod lint;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
