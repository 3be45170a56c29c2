//! Turns raw process information into application identities.
//!
//! [IdentityNormalizer] is the main artifact of this module. It runs the platform specific
//! [PlatformNameResolver]s and, when none of them knows the executable, falls back to the
//! executable's file stem or the raw process name. Results are memoized for the lifetime of the
//! normalizer.

pub mod bundle;
#[cfg(windows)]
pub mod version_resource;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(test)]
use mockall::automock;
use tracing::trace;

/// Returned when neither the executable path nor the process name carry a usable name.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Looks up a human facing application name in metadata shipped with an executable.
/// Implementations must swallow their own failures and report them as [None].
#[cfg_attr(test, automock)]
pub trait PlatformNameResolver {
    fn resolve(&self, executable: &Path) -> Option<String>;
}

/// Resolvers available on the platform the binary was compiled for, in priority order.
pub fn platform_resolvers() -> Vec<Box<dyn PlatformNameResolver>> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "macos")] {
            vec![Box::new(bundle::BundleNameResolver)]
        } else if #[cfg(windows)] {
            vec![Box::new(version_resource::VersionResourceResolver)]
        } else {
            vec![]
        }
    }
}

type CacheKey = (PathBuf, String);

pub struct IdentityNormalizer {
    resolvers: Vec<Box<dyn PlatformNameResolver>>,
    // Never invalidated. Paths of running executables don't change their names.
    cache: HashMap<CacheKey, Arc<str>>,
}

impl IdentityNormalizer {
    pub fn new(resolvers: Vec<Box<dyn PlatformNameResolver>>) -> Self {
        Self {
            resolvers,
            cache: HashMap::new(),
        }
    }

    pub fn for_current_platform() -> Self {
        Self::new(platform_resolvers())
    }

    /// Resolves a process to a lowercase, non-empty application name. `executable` may be empty
    /// when the path couldn't be read.
    pub fn normalize(&mut self, executable: &Path, process_name: &str) -> Arc<str> {
        let key = (executable.to_path_buf(), process_name.to_owned());
        if let Some(identity) = self.cache.get(&key) {
            return identity.clone();
        }

        let identity: Arc<str> = self.resolve(executable, process_name).to_lowercase().into();
        trace!("Normalized {executable:?} ({process_name}) into {identity}");
        self.cache.insert(key, identity.clone());
        identity
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn resolve(&self, executable: &Path, process_name: &str) -> String {
        if !executable.as_os_str().is_empty() {
            let resolved = self
                .resolvers
                .iter()
                .filter_map(|resolver| resolver.resolve(executable))
                .find(|name| !name.trim().is_empty());
            if let Some(name) = resolved {
                return name;
            }
        }
        fallback_name(executable, process_name)
    }
}

/// "C:\Games\Game.exe" becomes "Game". Without a path the process name is used as is.
pub fn fallback_name(executable: &Path, process_name: &str) -> String {
    let stem = executable
        .file_stem()
        .map(|v| v.to_string_lossy())
        .filter(|v| !v.is_empty());

    match stem {
        Some(stem) => stem.into_owned(),
        None if !process_name.is_empty() => process_name.to_owned(),
        None => UNKNOWN_IDENTITY.to_owned(),
    }
}
