use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Seconds each application ran during one local calendar day. Serialized as a plain JSON object
/// `{ "chrome": 120, "minecraft": 3600 }`.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct DayTotals(BTreeMap<String, u64>);

impl DayTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &str) -> u64 {
        self.0.get(identity).copied().unwrap_or(0)
    }

    /// Attributes one tick of `elapsed` seconds to every active identity. Identities not in
    /// `active` keep their totals.
    pub fn record_tick<'a>(&mut self, elapsed: u64, active: impl IntoIterator<Item = &'a str>) {
        for identity in active {
            let total = self.0.entry(identity.to_owned()).or_default();
            *total = total.saturating_add(elapsed);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, u64)> for DayTotals {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
