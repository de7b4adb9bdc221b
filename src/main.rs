// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Trackyard CLI - Marshalling yard for your tracker report definitions

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use trackyard::commands;

#[derive(Parser)]
#[command(name = "trackyard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Output directory override
    #[arg(long, env = "TRACKYARD_OUTPUT_DIR", global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a tracker table for field references
    Audit {
        /// Tracker table file (JSON row array)
        table: PathBuf,

        /// Canonical field names to audit for
        #[arg(long, required = true, value_delimiter = ',')]
        fields: Vec<String>,

        /// Write a per-path detailed report instead of listing ids
        #[arg(long)]
        detailed: bool,
    },

    /// Preview which rows and columns a batch of edits would touch
    Plan {
        /// Tracker table file (JSON row array)
        table: PathBuf,

        /// Canonical field names to remove
        #[arg(long, value_delimiter = ',')]
        remove: Vec<String>,

        /// Field swaps as old=new pairs
        #[arg(long, value_parser = parse_swap)]
        swap: Vec<(String, String)>,

        /// Canonical field names to add
        #[arg(long, value_delimiter = ',')]
        add: Vec<String>,
    },

    /// Apply remove / swap / add operations to selected trackers
    Modify {
        /// Tracker table file (JSON row array)
        table: PathBuf,

        /// Tracker ids to edit (all matching rows when omitted)
        #[arg(long, value_delimiter = ',')]
        rows: Vec<String>,

        /// Field references to remove from every selected row
        #[arg(long, value_delimiter = ',')]
        remove: Vec<String>,

        /// Field swaps as old=new pairs
        #[arg(long, value_parser = parse_swap)]
        swap: Vec<(String, String)>,

        /// JSON file mapping old references to new ones
        #[arg(long)]
        swap_file: Option<PathBuf>,

        /// JSON file mapping tracker ids to per-tracker removal lists
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Canonical field names to append to the field list
        #[arg(long, value_delimiter = ',')]
        add: Vec<String>,
    },

    /// Report malformed JSON in the Filters and Formatting columns
    CheckJson {
        /// Tracker table file (JSON row array)
        table: PathBuf,
    },

    /// Rebuild a tracker as it stood at a point in its change history
    Restore {
        /// Tracker table file (JSON row array)
        table: PathBuf,

        /// Change-history export file (JSON row array)
        #[arg(long)]
        history: PathBuf,

        /// Tracker display name to restore
        #[arg(long)]
        tracker: String,

        /// Target timestamp (e.g. "25/12/2024 13:45:00")
        #[arg(long, conflicts_with = "list")]
        to: Option<String>,

        /// List the restorable points in time instead of restoring
        #[arg(long)]
        list: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

/// Parse an `old=new` swap pair
fn parse_swap(raw: &str) -> Result<(String, String), String> {
    let Some((old, new)) = raw.split_once('=') else {
        return Err(format!("expected old=new, got '{raw}'"));
    };
    let (old, new) = (old.trim(), new.trim());
    if old.is_empty() || new.is_empty() {
        return Err(format!("expected old=new, got '{raw}'"));
    }
    Ok((old.to_string(), new.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Execute command
    match cli.command {
        Commands::Audit {
            table,
            fields,
            detailed,
        } => commands::audit::run(&table, &fields, detailed, cli.output),
        Commands::Plan {
            table,
            remove,
            swap,
            add,
        } => commands::plan::run(&table, &remove, &swap, &add, cli.output),
        Commands::Modify {
            table,
            rows,
            remove,
            swap,
            swap_file,
            plan,
            add,
        } => commands::modify::run(
            &table,
            &rows,
            remove,
            &swap,
            swap_file.as_deref(),
            plan.as_deref(),
            &add,
            cli.output,
        ),
        Commands::CheckJson { table } => commands::check::run(&table, cli.output),
        Commands::Restore {
            table,
            history,
            tracker,
            to,
            list,
        } => commands::restore::run(&table, &history, &tracker, to.as_deref(), list, cli.output),
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command());
            Ok(())
        }
    }
}
