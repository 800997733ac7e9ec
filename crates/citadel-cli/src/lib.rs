//! Citadel CLI library
//!
//! Argument parsing, logging setup and the subcommands behind the `citadel`
//! binary.

pub mod cli;
pub mod commands;
pub mod logging;
