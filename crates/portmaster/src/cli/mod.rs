//! Command-line interface for portmaster.
//!
//! This module provides the CLI structure for the `portmaster` binary. The
//! handlers live in the binary itself.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CatchArgs, CatchCommand, ConfigCommand, FisherArgs, FisherCommand, OutputFormat, RenewCommand,
    ReportCommand, UnitArg,
};

/// portmaster - Fishing port office records
///
/// Logs daily catches, looks up fisher insurance cards, renews insurance and
/// produces monthly catch reports.
#[derive(Debug, Parser)]
#[command(name = "portmaster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Operator email
    #[arg(long, global = true, env = "PORTMASTER_USER", value_name = "EMAIL")]
    pub user: Option<String>,

    /// Operator password
    #[arg(long, global = true, env = "PORTMASTER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database and seed accounts
    Init,

    /// Check credentials and show the logged-in operator
    Login,

    /// Manage the fisher registry
    #[command(subcommand)]
    Fisher(FisherCommand),

    /// Log and edit catches
    #[command(subcommand)]
    Catch(CatchCommand),

    /// Read the card on the reader and show its holder
    Scan,

    /// Look up a fisher by id or name
    Search {
        /// Fisher id or part of the name
        query: String,
    },

    /// Show the card scan log
    Logs {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Renew the insurance of an expired fisher
    Renew(RenewCommand),

    /// Show completed renewals
    Renewals {
        /// Only renewals whose transaction id or fisher name contains this text
        #[arg(short, long, value_name = "TEXT")]
        search: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Monthly catch reports
    #[command(subcommand)]
    Report(ReportCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Whether the command runs without logging in.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Init | Self::Config(_))
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
