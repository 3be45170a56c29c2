use std::{path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use crate::daemon::args::TrackerArgs;

use super::daemon_path::to_daemon_path;

/// Stops every running instance of the executable at `name`. On unix this sends SIGTERM so the
/// daemon gets to save its totals.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid: {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Stops a previously started daemon and starts a new one with `args`. The daemon binary
/// detaches itself, so this returns as soon as it did.
pub fn restart_server(args: &TrackerArgs) -> Result<()> {
    let daemon = to_daemon_path(std::env::current_exe()?);
    kill_previous_servers(&daemon)?;

    let mut command = std::process::Command::new(&daemon);
    if let Some(dir) = &args.dir {
        command.arg("--dir").arg(std::path::absolute(dir)?);
    }
    command
        .arg("--poll-interval")
        .arg(args.poll_interval.as_secs_f64().to_string());
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    println!("Spawning {}", daemon.display());
    let status = command.status()?;
    if !status.success() {
        return Err(anyhow!("Daemon failed to start: {status}"));
    }
    println!("Success");
    Ok(())
}
