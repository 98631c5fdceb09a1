//! CLI arguments for the `reassigner` binary.

use {clap::Parser, std::path::PathBuf};

/// Reassign header-bidding bids across the placements of a page.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The log filter.
    #[arg(long, env, default_value = "warn,bid_sharing=info,reassigner=info")]
    pub log: String,

    /// Log as JSON instead of plain text.
    #[arg(long, env)]
    pub log_json: bool,

    /// Path to the configuration file. This file should be in TOML format.
    #[arg(long, env)]
    pub config: PathBuf,

    /// Path to a JSON file holding one auction or a list of auctions. Reads
    /// from stdin when omitted.
    #[arg(long, env)]
    pub auctions: Option<PathBuf>,
}
