//! Contains logic for listing the processes of the machine.
//! [SysinfoProcessSource] is the main artifact of this module, [ProcessSource] is the contract
//! the scanner depends on.

use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::trace;

/// Outcome of asking the OS about one property of one process. Callers decide per case what a
/// failure means for them instead of catching everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Found(T),
    /// The current user isn't allowed to look.
    Denied,
    /// The process exited between listing and inspection.
    Vanished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    /// Name reported by the OS. For example 'firefox' or 'Minecraft.exe'. Always part of the
    /// listing itself, so it can't fail separately.
    pub name: String,
    /// Full path to an executable. For example /usr/lib/firefox/firefox
    pub executable: Probe<PathBuf>,
}

/// Intended to serve as a contract platform process listings must implement.
#[cfg_attr(test, automock)]
pub trait ProcessSource {
    /// Every process visible to the current user at this moment.
    fn processes(&mut self) -> Vec<ProcessSnapshot>;
}

/// Serves as a cross-platform [ProcessSource] implementation.
pub struct SysinfoProcessSource {
    system: System,
}

impl SysinfoProcessSource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoProcessSource {
    #[tracing::instrument(skip(self), level = "trace")]
    fn processes(&mut self) -> Vec<ProcessSnapshot> {
        // Executable paths don't change for a live pid, so they're only fetched once.
        let refreshed = self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );
        trace!("Refreshed {refreshed} processes");

        self.system
            .processes()
            .iter()
            .map(|(pid, process)| snapshot(*pid, process))
            .collect()
    }
}

fn snapshot(pid: Pid, process: &Process) -> ProcessSnapshot {
    ProcessSnapshot {
        pid: pid.as_u32(),
        name: process.name().to_string_lossy().into_owned(),
        executable: executable_probe(process.exe(), process.status()),
    }
}

fn executable_probe(executable: Option<&Path>, status: ProcessStatus) -> Probe<PathBuf> {
    match (executable, status) {
        (Some(path), _) => Probe::Found(path.to_path_buf()),
        (None, ProcessStatus::Dead) => Probe::Vanished,
        // Kernel threads, zombies and other users' processes end up here.
        (None, _) => Probe::Denied,
    }
}
