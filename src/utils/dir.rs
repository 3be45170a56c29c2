use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

pub const APP_NAME: &str = "GameTimeTracker";

/// Returns the per-user data directory of the application, creating it when missing.
/// Day files, rule files and logs all live here.
pub fn user_data_dir() -> Result<PathBuf> {
    let mut path = platform_data_base()?;
    path.push(APP_NAME);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(not(windows))]
fn home() -> Result<PathBuf> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("Couldn't find HOME"))
}

fn platform_data_base() -> Result<PathBuf> {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            env::var("APPDATA")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("USERPROFILE").map(|profile| {
                        let mut path = PathBuf::from(profile);
                        path.push("AppData");
                        path.push("Roaming");
                        path
                    })
                })
                .map_err(|_| anyhow!("Couldn't find neither APPDATA nor USERPROFILE"))
        } else if #[cfg(target_os = "macos")] {
            home().map(|mut path| {
                path.push("Library/Application Support");
                path
            })
        } else {
            env::var("XDG_DATA_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    home().map(|mut path| {
                        path.push(".local/share");
                        path
                    })
                })
        }
    }
}
