use std::path::PathBuf;

use clap::Parser;

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use crate::platform::Platform;

/// Track video views over time for multiple platforms.
#[derive(Debug, Parser)]
#[command(name = "view_tracker", version)]
pub struct Cli {
    /// Start tracking views.
    #[arg(long)]
    pub track: bool,

    /// Plot the views data.
    #[arg(long)]
    pub plot: bool,

    /// Platform to track.
    #[arg(long, value_enum)]
    pub platform: Platform,

    /// List of video/post IDs to track.
    #[arg(long, num_args = 1.., required = true)]
    pub ids: Vec<String>,

    /// Seconds to sleep between polling cycles.
    #[arg(long, env = "VIEW_TRACKER_INTERVAL", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u64,

    /// Seconds before a single request is abandoned.
    #[arg(long, env = "VIEW_TRACKER_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Directory holding the per-identifier CSV logs.
    #[arg(long, env = "VIEW_TRACKER_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
}
