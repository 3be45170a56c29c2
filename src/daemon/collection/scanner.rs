use std::{collections::BTreeSet, path::PathBuf};

use tracing::{debug, trace};

use crate::{
    daemon::storage::rules::{Aliases, Exclusions},
    identity::IdentityNormalizer,
    process_api::{Probe, ProcessSnapshot, ProcessSource},
};

/// Produces the set of applications running right now.
pub struct ProcessScanner {
    source: Box<dyn ProcessSource>,
    normalizer: IdentityNormalizer,
}

impl ProcessScanner {
    pub fn new(source: Box<dyn ProcessSource>, normalizer: IdentityNormalizer) -> Self {
        Self { source, normalizer }
    }

    /// Lists processes and maps them to identities. Several processes of the same application
    /// count once. Processes that can't be inspected are skipped, so the worst outcome is an
    /// empty set.
    pub fn scan(&mut self, exclusions: &Exclusions, aliases: &Aliases) -> BTreeSet<String> {
        let processes = self.source.processes();
        let listed = processes.len();

        let identities = processes
            .into_iter()
            .filter_map(|process| self.identify(process, exclusions, aliases))
            .collect::<BTreeSet<_>>();

        debug!(
            "Scanned {listed} processes, found {} applications",
            identities.len()
        );
        identities
    }

    fn identify(
        &mut self,
        process: ProcessSnapshot,
        exclusions: &Exclusions,
        aliases: &Aliases,
    ) -> Option<String> {
        let pid = process.pid;
        let name = process.name;

        // Raw names are matched as reported, exclusions are lowercase.
        if exclusions.matches(&name) {
            trace!("Skipping excluded process {name}");
            return None;
        }

        let executable = match process.executable {
            Probe::Found(path) => path,
            Probe::Vanished => {
                trace!("Skipping {pid}, exited during scan");
                return None;
            }
            Probe::Denied => PathBuf::new(),
        };

        let normalized = self.normalizer.normalize(&executable, &name);
        if normalized.is_empty() {
            return None;
        }

        let normalized = normalized.to_lowercase();
        let identity = aliases.resolve(&normalized);

        // Aliases might point to an excluded name.
        if exclusions.matches(identity) {
            trace!("Skipping excluded application {identity}");
            return None;
        }

        Some(identity.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, path::PathBuf};

    use crate::{
        daemon::storage::rules::{Aliases, Exclusions},
        identity::{IdentityNormalizer, MockPlatformNameResolver},
        process_api::{MockProcessSource, Probe, ProcessSnapshot},
    };

    use super::ProcessScanner;

    fn process(pid: u32, name: &str, executable: &str) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: name.into(),
            executable: if executable.is_empty() {
                Probe::Denied
            } else {
                Probe::Found(PathBuf::from(executable))
            },
        }
    }

    fn scanner_over(processes: Vec<ProcessSnapshot>) -> ProcessScanner {
        let mut source = MockProcessSource::new();
        source
            .expect_processes()
            .returning(move || processes.clone());
        ProcessScanner::new(Box::new(source), IdentityNormalizer::new(vec![]))
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_excluded_raw_name_is_dropped() {
        let mut scanner = scanner_over(vec![
            process(1, "helperd", "/usr/libexec/helperd"),
            process(2, "chrome", "/opt/google/chrome/chrome"),
        ]);

        let found = scanner.scan(&Exclusions::new(["helper"]), &Aliases::default());

        assert_eq!(found, set(&["chrome"]));
    }

    #[test]
    fn test_raw_exclusion_skips_normalization() {
        let mut resolver = MockPlatformNameResolver::new();
        resolver.expect_resolve().never();
        let mut source = MockProcessSource::new();
        source
            .expect_processes()
            .returning(|| vec![process(1, "helper (gpu)", "/Applications/Chrome.app/Contents/MacOS/x")]);
        let mut scanner =
            ProcessScanner::new(Box::new(source), IdentityNormalizer::new(vec![Box::new(resolver)]));

        assert!(scanner
            .scan(&Exclusions::new(["helper"]), &Aliases::default())
            .is_empty());
    }

    #[test]
    fn test_raw_exclusion_is_case_sensitive() {
        let mut scanner = scanner_over(vec![process(1, "Helper", "/opt/foo/bar")]);

        let found = scanner.scan(&Exclusions::new(["helper"]), &Aliases::default());

        assert_eq!(found, set(&["bar"]));
    }

    #[test]
    fn test_alias_collapses_variants() {
        let mut scanner = scanner_over(vec![
            process(1, "java", "/games/MinecraftLauncher"),
            process(2, "minecraft", ""),
        ]);

        let found = scanner.scan(
            &Exclusions::default(),
            &Aliases::new([("minecraftlauncher", "minecraft")]),
        );

        assert_eq!(found, set(&["minecraft"]));
    }

    #[test]
    fn test_alias_target_is_excluded() {
        let mut scanner = scanner_over(vec![process(1, "updater", "/opt/Updater")]);

        let found = scanner.scan(
            &Exclusions::new(["system"]),
            &Aliases::new([("updater", "systemupdate")]),
        );

        assert!(found.is_empty());
    }

    #[test]
    fn test_processes_count_once_per_application() {
        let mut scanner = scanner_over(vec![
            process(1, "chrome", "/opt/google/chrome/chrome"),
            process(2, "chrome", "/opt/google/chrome/chrome"),
            process(3, "Chrome", ""),
        ]);

        let found = scanner.scan(&Exclusions::default(), &Aliases::default());

        assert_eq!(found, set(&["chrome"]));
    }

    #[test]
    fn test_unreadable_processes_are_skipped() {
        let mut scanner = scanner_over(vec![
            ProcessSnapshot {
                pid: 1,
                name: "ghost".into(),
                executable: Probe::Vanished,
            },
            ProcessSnapshot {
                pid: 2,
                name: "steam".into(),
                executable: Probe::Denied,
            },
        ]);

        let found = scanner.scan(&Exclusions::default(), &Aliases::default());

        assert_eq!(found, set(&["steam"]));
    }

    #[test]
    fn test_empty_listing() {
        let mut scanner = scanner_over(vec![]);

        assert!(scanner
            .scan(&Exclusions::new(["a"]), &Aliases::default())
            .is_empty());
    }
}
