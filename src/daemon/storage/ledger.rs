use std::{future::Future, io::ErrorKind, path::PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::{
    fs::operations::{atomic_write, quarantine},
    utils::time::date_to_record_name,
};

use super::entities::DayTotals;

pub const DAY_FILE_EXTENSION: &str = "json";

/// Interface for abstracting storage of day totals.
pub trait LedgerStorage {
    /// Totals stored for `date`, or an empty record if there are none yet.
    fn load(&self, date: NaiveDate) -> impl Future<Output = Result<DayTotals>>;

    /// Replaces the stored totals for `date`. Readers never observe a partially written record.
    fn persist(&self, date: NaiveDate, totals: &DayTotals) -> impl Future<Output = Result<()>>;
}

/// The main realization of [LedgerStorage]. Keeps one `<YYYY-MM-DD>.json` file per day.
pub struct DayLedgerStore {
    dir: PathBuf,
}

impl DayLedgerStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn day_file_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(date_to_record_name(date))
            .with_extension(DAY_FILE_EXTENSION)
    }
}

impl LedgerStorage for DayLedgerStore {
    async fn load(&self, date: NaiveDate) -> Result<DayTotals> {
        let path = self.day_file_path(date);
        let contents = match tokio::fs::read(&path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No totals stored for {date} yet");
                return Ok(DayTotals::new());
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read {path:?}")),
        };

        match serde_json::from_slice::<DayTotals>(&contents) {
            Ok(totals) => {
                debug!("Loaded {} totals for {date}", totals.len());
                Ok(totals)
            }
            Err(e) => {
                // Starting over is better than refusing to track the rest of the day.
                let target = quarantine(&path)
                    .await
                    .with_context(|| format!("Failed to move aside corrupted {path:?}"))?;
                warn!("Totals in {path:?} are corrupted ({e}), moved them to {target:?}");
                Ok(DayTotals::new())
            }
        }
    }

    async fn persist(&self, date: NaiveDate, totals: &DayTotals) -> Result<()> {
        let path = self.day_file_path(date);
        let buffer = serde_json::to_vec_pretty(totals)?;
        atomic_write(&path, &buffer)
            .await
            .with_context(|| format!("Failed to write {path:?}"))?;
        Ok(())
    }
}
