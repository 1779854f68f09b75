//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::model::{CatchDraft, Fisher, Unit};

/// Fisher registry commands.
#[derive(Debug, Subcommand)]
pub enum FisherCommand {
    /// List registered fishers
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Register a new fisher
    Add(FisherArgs),

    /// Replace the details of a fisher
    Update(FisherArgs),

    /// Remove a fisher from the registry
    Delete {
        /// Fisher id, e.g. F1001
        fisher_id: String,
    },
}

/// Fisher form fields.
#[derive(Debug, Clone, Args)]
pub struct FisherArgs {
    /// Fisher id, e.g. F1001
    pub fisher_id: String,

    /// UID of the fisher's NFC card
    #[arg(long = "card", value_name = "UID")]
    pub card_uid: String,

    /// Full name
    #[arg(long)]
    pub name: String,

    /// Boat name
    #[arg(long, default_value = "-")]
    pub boat: String,

    /// Last day of insurance coverage (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub expiry: String,
}

impl From<FisherArgs> for Fisher {
    fn from(args: FisherArgs) -> Self {
        Self {
            fisher_id: args.fisher_id,
            card_uid: args.card_uid,
            name: args.name,
            boat: args.boat,
            insurance_expiry: args.expiry,
        }
    }
}

/// Catch log commands.
#[derive(Debug, Subcommand)]
pub enum CatchCommand {
    /// List logged catches, newest first
    List {
        /// Only catches landed on this day (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Log a new catch
    Add(CatchArgs),

    /// Replace the details of a logged catch
    Update {
        /// Catch id
        id: i64,

        /// New catch details
        #[command(flatten)]
        catch: CatchArgs,
    },
}

/// Catch form fields.
#[derive(Debug, Clone, Args)]
pub struct CatchArgs {
    /// Species or trade name
    #[arg(short = 't', long)]
    pub fish_type: String,

    /// Quantity landed
    #[arg(long)]
    pub quantity: f64,

    /// Unit of the quantity
    #[arg(long, value_enum, default_value = "kg")]
    pub unit: UnitArg,

    /// Fisher who landed the catch
    #[arg(long, default_value = "")]
    pub fisher: String,

    /// Boat the catch came from
    #[arg(long, default_value = "")]
    pub boat: String,

    /// Day of the landing (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    pub date: Option<String>,
}

impl CatchArgs {
    /// Form draft, using `today` when no date was given.
    #[must_use]
    pub fn into_draft(self, today: &str) -> CatchDraft {
        CatchDraft {
            date: self.date.unwrap_or_else(|| today.to_string()),
            fish_type: self.fish_type,
            fisher_name: self.fisher,
            boat: self.boat,
            quantity: self.quantity,
            unit: self.unit.into(),
        }
    }
}

/// Renewal command arguments.
#[derive(Debug, Args)]
pub struct RenewCommand {
    /// Fisher id or name to renew
    pub query: String,

    /// Social security number of the fisher
    #[arg(long)]
    pub ssn: String,

    /// Amount paid, in dinars
    #[arg(long)]
    pub amount: f64,

    /// Output format of the receipt
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Report commands.
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Show catch totals per fish type for a month
    Summary {
        /// Month (YYYY-MM); defaults to the current month
        month: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Export a month's summary to the reports directory
    Export {
        /// Month (YYYY-MM); defaults to the current month
        month: Option<String>,
    },

    /// List fish types offered on the catch form
    FishTypes,

    /// List previously exported reports
    History {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Catch unit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    /// Kilograms
    Kg,
    /// Metric tons
    Ton,
    /// Individual fish
    Piece,
}

impl From<UnitArg> for Unit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Kg => Self::Kg,
            UnitArg::Ton => Self::Ton,
            UnitArg::Piece => Self::Piece,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}
