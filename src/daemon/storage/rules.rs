//! User supplied rules shaping identities: `exclusions.json` drops applications, `aliases.json`
//! merges variants of the same application.

use std::{collections::HashMap, io::ErrorKind, path::Path};

use serde_json::Value;
use tracing::{debug, warn};

pub const EXCLUSIONS_FILE: &str = "exclusions.json";
pub const ALIASES_FILE: &str = "aliases.json";

/// Lowercase prefixes. Any name starting with one of them is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions(Vec<String>);

impl Exclusions {
    pub fn new<S: AsRef<str>>(prefixes: impl IntoIterator<Item = S>) -> Self {
        Self(
            prefixes
                .into_iter()
                .map(|v| v.as_ref().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
        )
    }

    pub fn matches(&self, name: &str) -> bool {
        self.0.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Exact, lowercase renames applied after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases(HashMap<String, String>);

impl Aliases {
    pub fn new<K: AsRef<str>, V: AsRef<str>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.as_ref().to_lowercase()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .collect(),
        )
    }

    /// The canonical name of `identity`. Names without a rule are returned unchanged.
    pub fn resolve<'a>(&'a self, identity: &'a str) -> &'a str {
        self.0.get(identity).map_or(identity, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reads a rules file. Missing or malformed files count as having no rules.
async fn read_rules_file(path: &Path) -> Option<Value> {
    let contents = match tokio::fs::read(path).await {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No rules file at {path:?}");
            return None;
        }
        Err(e) => {
            warn!("Couldn't read {path:?}, ignoring it: {e}");
            return None;
        }
    };

    serde_json::from_slice(&contents)
        .inspect_err(|e| warn!("{path:?} isn't valid json, ignoring it: {e}"))
        .ok()
}

pub async fn load_exclusions(dir: &Path) -> Exclusions {
    let path = dir.join(EXCLUSIONS_FILE);
    match read_rules_file(&path).await {
        Some(Value::Array(values)) => {
            Exclusions::new(values.iter().filter_map(Value::as_str))
        }
        Some(_) => {
            warn!("{path:?} should contain an array of strings");
            Exclusions::default()
        }
        None => Exclusions::default(),
    }
}

pub async fn load_aliases(dir: &Path) -> Aliases {
    let path = dir.join(ALIASES_FILE);
    match read_rules_file(&path).await {
        Some(Value::Object(entries)) => Aliases::new(
            entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v))),
        ),
        Some(_) => {
            warn!("{path:?} should contain an object mapping names to names");
            Aliases::default()
        }
        None => Aliases::default(),
    }
}
