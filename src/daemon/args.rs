use std::path::PathBuf;

use clap::{Args, Parser};
use tracing::level_filters::LevelFilter;

use crate::utils::interval::{PollInterval, DEFAULT_POLL_INTERVAL};

/// Settings of the tracker shared by the daemon binary and `gametime serve`.
#[derive(Args, Debug, Clone)]
pub struct TrackerArgs {
    #[arg(
        long,
        help = "Application directory. By default uses the platform data directory, e.g. $XDG_DATA_HOME/GameTimeTracker"
    )]
    pub dir: Option<PathBuf>,
    #[arg(
        long = "poll-interval",
        env = "GTT_POLL_SEC",
        default_value_t = DEFAULT_POLL_INTERVAL,
        help = "Seconds between process scans"
    )]
    pub poll_interval: PollInterval,
}

#[derive(Parser)]
pub struct DaemonArgs {
    #[arg(long)]
    pub force: bool,
    #[command(flatten)]
    pub tracker: TrackerArgs,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
