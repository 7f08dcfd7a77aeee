use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snapkeep")]
#[command(about = "Point-in-time snapshots of a live data file")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Live data file to snapshot and restore
    #[arg(long, global = true)]
    pub live: Option<PathBuf>,

    /// Directory holding snapshot files
    #[arg(long, global = true)]
    pub snapshot_dir: Option<PathBuf>,

    /// Catalog database
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Snapshot the live store now
    Create(OutputArgs),

    /// Replace the live store with a snapshot (a safety snapshot is taken first)
    Restore(RestoreArgs),

    /// Delete snapshots older than the retention window
    Cleanup(CleanupArgs),

    /// List catalog records, newest first
    List(OutputArgs),

    /// Compare the snapshot directory with the catalog
    Verify(OutputArgs),

    /// Register snapshot files missing from the catalog
    Sync(OutputArgs),

    /// Remove one catalog record and its file
    Forget(ForgetArgs),
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct RestoreArgs {
    /// Catalog id of the snapshot to restore
    pub id: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct CleanupArgs {
    /// Retention in days (overrides the configured retention)
    #[arg(long)]
    pub days: Option<u32>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ForgetArgs {
    /// Catalog id of the record to remove
    pub id: String,

    #[command(flatten)]
    pub output: OutputArgs,
}
