use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Movie library reconciliation and trailer management.
#[derive(Parser, Debug)]
#[command(name = "marquee", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "MARQUEE_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    /// Simulate first and ask before applying, whatever the config says
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Answer yes to the confirmation prompt
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Ignore the known-failure cache and existing trailers
    #[arg(long, global = true)]
    pub force: bool,

    /// Regenerate placeholders and backdrops that already exist
    #[arg(long, global = true)]
    pub overwrite: bool,

    /// Plan at most this many items
    #[arg(long, global = true, value_name = "N")]
    pub count: Option<usize>,

    /// Debug logging
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Write a CSV of folder, downloaded and reason per wanted trailer
    #[arg(long, global = true, value_name = "FILE")]
    pub report: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rename library videos into the canonical layout and catalog them
    Catalog,
    /// Download trailers for catalogued movies that have none
    FetchExisting,
    /// Download trailers of upcoming releases into the trailers folder
    FetchUpcoming(UpcomingArgs),
    /// Move trailers of released movies into the library and tidy up
    Sync,
    /// Create placeholders and backdrops for every trailer folder
    GenerateAssets(AssetArgs),
    /// Forget known trailer failures (all of them when no id is given)
    ClearFailures {
        /// TMDB movie ids
        ids: Vec<u32>,
    },
    /// Learn the junk word vocabulary again from the library
    RebuildJunk,
}

#[derive(Args, Debug, Default)]
pub struct UpcomingArgs {
    /// Only this release year
    #[arg(long, conflicts_with_all = ["year_start", "year_end"])]
    pub year: Option<u32>,

    /// First release year (defaults to the configured one)
    #[arg(long)]
    pub year_start: Option<u32>,

    /// Last release year (defaults to the configured one)
    #[arg(long)]
    pub year_end: Option<u32>,

    /// Ignore cached discover results
    #[arg(long)]
    pub no_cache: bool,

    /// Drop the discover cache before running
    #[arg(long)]
    pub clear_cache: bool,

    /// Dump the discovered movie list as JSON
    #[arg(long, value_name = "FILE")]
    pub export_list: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct AssetArgs {
    /// Placeholder videos (both kinds when neither flag is given)
    #[arg(long)]
    pub placeholders: bool,

    /// Backdrop images
    #[arg(long)]
    pub backdrops: bool,
}

impl AssetArgs {
    /// `(placeholders, backdrops)` to create.
    pub fn selection(&self) -> (bool, bool) {
        if self.placeholders || self.backdrops {
            (self.placeholders, self.backdrops)
        } else {
            (true, true)
        }
    }
}

impl Cli {
    /// Default tracing filter for the verbosity flags.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}
