pub mod daemon_path;
pub mod export;
pub mod process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use export::{process_export_command, ExportCommand};
use process::{kill_previous_servers, restart_server};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{args::TrackerArgs, start_daemon},
    utils::{
        clock::{Clock, DefaultClock},
        dir::user_data_dir,
        logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "gametime", version, long_about = None)]
#[command(about = "Tracks how long each application runs per day", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[command(flatten)]
        tracker: TrackerArgs,
    },
    #[command(about = "Run the tracker directly in current console. Stop it with Ctrl+C")]
    Serve {
        #[command(flatten)]
        tracker: TrackerArgs,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Sum up days recorded since the previous export")]
    Export {
        #[command(flatten)]
        command: ExportCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    match args.commands {
        Commands::Init { tracker } => {
            enable_logging(CLI_PREFIX, &user_data_dir()?.join("logs"), logging_level, args.log)?;
            restart_server(&tracker)
        }
        Commands::Stop {} => {
            enable_logging(CLI_PREFIX, &user_data_dir()?.join("logs"), logging_level, args.log)?;
            let stopped = kill_previous_servers(&to_daemon_path(std::env::current_exe()?))?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
        Commands::Serve { tracker } => {
            let dir = tracker.dir.map_or_else(user_data_dir, Ok)?;
            // Serving in a console always shows what's happening.
            enable_logging(DAEMON_PREFIX, &dir.join("logs"), logging_level, true)?;
            println!("Press Ctrl+C to stop");
            start_daemon(dir, tracker.poll_interval).await
        }
        Commands::Export { command } => {
            enable_logging(CLI_PREFIX, &user_data_dir()?.join("logs"), logging_level, args.log)?;
            process_export_command(command, DefaultClock.today()).await
        }
    }
}
