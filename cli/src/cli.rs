use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "camp-scheduler", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Solve a day's snapshot from scratch and print the outbound result.
    Solve {
        /// Path to the inbound snapshot JSON.
        snapshot: PathBuf,
        /// Optional solver config JSON; defaults to built-in weights.
        #[clap(long)]
        config: Option<PathBuf>,
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Pin a bunk onto a field/activity after a human edit, and re-solve the
    /// blocks that pin left in conflict.
    Repair {
        /// Path to the inbound snapshot JSON the original solve used.
        snapshot: PathBuf,
        /// Path to the outbound result JSON to repair in place.
        result: PathBuf,
        /// Name of the bunk whose cell was pinned.
        #[clap(long)]
        pinned_bunk: String,
        /// Slot indices identifying which of the bunk's blocks was pinned.
        #[clap(long, value_delimiter = ',')]
        pinned_slots: Vec<u32>,
        #[clap(long)]
        pinned_field: String,
        #[clap(long)]
        pinned_activity: String,
        /// Zero-based block indices left in conflict by the edit, to clear and re-solve.
        #[clap(long, value_delimiter = ',')]
        blocks: Vec<usize>,
        /// Force a placement on a conflicted block even if every remaining
        /// candidate hard-gates, instead of leaving it `Free`.
        #[clap(long)]
        bypass: bool,
        #[clap(long)]
        config: Option<PathBuf>,
        #[clap(long)]
        out: Option<PathBuf>,
    },
}
