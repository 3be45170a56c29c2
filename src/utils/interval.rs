use std::{fmt::Display, ops::Deref, str::FromStr, time::Duration};

use anyhow::anyhow;

pub const DEFAULT_POLL_INTERVAL: PollInterval = PollInterval(Duration::from_secs(10));

/// How long the tracker sleeps between two scans. Parsed from a number of seconds, fractions
/// allowed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PollInterval(Duration);

impl Display for PollInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}s", self.0.as_secs_f64())
    }
}

impl PollInterval {
    pub fn from_secs_opt(value: f64) -> Option<PollInterval> {
        if value.is_finite() && value > 0. {
            Duration::try_from_secs_f64(value).ok().map(PollInterval)
        } else {
            None
        }
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        DEFAULT_POLL_INTERVAL
    }
}

impl FromStr for PollInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "10s" also works
        let s = s.trim().trim_end_matches('s');
        let v = s.parse::<f64>()?;
        PollInterval::from_secs_opt(v)
            .ok_or_else(|| anyhow!("Polling interval must be a positive number of seconds, got {s}"))
    }
}

impl Deref for PollInterval {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{PollInterval, DEFAULT_POLL_INTERVAL};

    #[test]
    fn test_poll_interval_parsing() {
        assert_eq!(*"10".parse::<PollInterval>().unwrap(), Duration::from_secs(10));
        assert_eq!(*"2.5s".parse::<PollInterval>().unwrap(), Duration::from_millis(2500));
        assert!("0".parse::<PollInterval>().is_err());
        assert!("-3".parse::<PollInterval>().is_err());
        assert!("often".parse::<PollInterval>().is_err());
        assert_eq!(PollInterval::default(), DEFAULT_POLL_INTERVAL);
    }
}
