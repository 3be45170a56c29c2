use anyhow::Result;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    daemon::storage::{
        entities::DayTotals,
        ledger::LedgerStorage,
        rules::{Aliases, Exclusions},
    },
    utils::{
        clock::{elapsed_whole_seconds, Clock},
        interval::PollInterval,
    },
};

use super::scanner::ProcessScanner;

/// Owns the totals of the current day. Every tick it asks the scanner what is running, adds the
/// time elapsed since the previous tick to each of those applications and writes the totals out.
pub struct AccumulationModule<S: LedgerStorage> {
    scanner: ProcessScanner,
    storage: S,
    exclusions: Exclusions,
    aliases: Aliases,
    shutdown: CancellationToken,
    poll_interval: PollInterval,
    time_provider: Box<dyn Clock>,
    // Fixed at startup. A run spanning midnight keeps counting into the day it started on.
    date: NaiveDate,
    totals: DayTotals,
}

impl<S: LedgerStorage> AccumulationModule<S> {
    /// Loads whatever was already recorded today.
    pub async fn new(
        scanner: ProcessScanner,
        storage: S,
        exclusions: Exclusions,
        aliases: Aliases,
        shutdown: CancellationToken,
        poll_interval: PollInterval,
        time_provider: Box<dyn Clock>,
    ) -> Result<Self> {
        let date = time_provider.today();
        let totals = storage.load(date).await?;
        info!(
            "Tracking {date}, {} applications already recorded",
            totals.len()
        );

        Ok(Self {
            scanner,
            storage,
            exclusions,
            aliases,
            shutdown,
            poll_interval,
            time_provider,
            date,
            totals,
        })
    }

    pub fn totals(&self) -> &DayTotals {
        &self.totals
    }

    async fn tick(&mut self, elapsed: u64) {
        let active = self.scanner.scan(&self.exclusions, &self.aliases);
        if active.is_empty() {
            debug!("Nothing running, skipping write");
            return;
        }

        self.totals
            .record_tick(elapsed, active.iter().map(String::as_str));
        debug!("Added {elapsed}s to {active:?}");

        // A failed write isn't fatal, the next tick writes the whole record again.
        if let Err(e) = self.storage.persist(self.date, &self.totals).await {
            error!("Failed to persist totals for {}: {e:?}", self.date);
        }
    }

    /// Executes the tracking loop until shutdown is requested, then writes the totals one last
    /// time and returns them.
    pub async fn run(mut self) -> Result<DayTotals> {
        let mut baseline = self.time_provider.instant();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.time_provider.sleep(*self.poll_interval) => ()
            }

            let now = self.time_provider.instant();
            let elapsed = elapsed_whole_seconds(baseline, now);
            self.tick(elapsed)
                .instrument(info_span!("tick", elapsed))
                .await;
            // Advances even on idle ticks so the next active tick isn't credited twice.
            baseline = now;
        }

        self.storage
            .persist(self.date, &self.totals)
            .await
            .inspect_err(|e| error!("Failed to save totals on shutdown {e:?}"))?;
        info!("Stopped. Data saved.");
        Ok(self.totals)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tempfile::tempdir;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            collection::scanner::ProcessScanner,
            storage::{
                entities::DayTotals,
                ledger::{DayLedgerStore, LedgerStorage},
                rules::{Aliases, Exclusions},
            },
        },
        identity::IdentityNormalizer,
        process_api::{MockProcessSource, Probe, ProcessSnapshot},
        utils::{clock::Clock, interval::PollInterval, logging::TEST_LOGGING},
    };

    use super::AccumulationModule;

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();

    struct TestClock;

    #[async_trait]
    impl Clock for TestClock {
        fn today(&self) -> NaiveDate {
            TEST_DATE
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }
    }

    /// Counts writes going through to the real store.
    struct CountingStorage {
        inner: DayLedgerStore,
        writes: Arc<AtomicUsize>,
    }

    impl LedgerStorage for CountingStorage {
        async fn load(&self, date: NaiveDate) -> Result<DayTotals> {
            self.inner.load(date).await
        }

        async fn persist(&self, date: NaiveDate, totals: &DayTotals) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.persist(date, totals).await
        }
    }

    fn scanner_over(names: &'static [&'static str]) -> ProcessScanner {
        let mut source = MockProcessSource::new();
        source.expect_processes().returning(move || {
            names
                .iter()
                .enumerate()
                .map(|(pid, name)| ProcessSnapshot {
                    pid: pid as u32,
                    name: name.to_string(),
                    executable: Probe::Found(PathBuf::from(format!("/usr/bin/{name}"))),
                })
                .collect()
        });
        ProcessScanner::new(Box::new(source), IdentityNormalizer::new(vec![]))
    }

    async fn run_for(
        scanner: ProcessScanner,
        storage: CountingStorage,
        duration: Duration,
    ) -> Result<DayTotals> {
        *TEST_LOGGING;
        let shutdown = CancellationToken::new();
        let module = AccumulationModule::new(
            scanner,
            storage,
            Exclusions::new(["kworker"]),
            Aliases::default(),
            shutdown.clone(),
            "10".parse::<PollInterval>()?,
            Box::new(TestClock),
        )
        .await?;

        let (_, totals) = tokio::join!(
            async {
                tokio::time::sleep(duration).await;
                shutdown.cancel()
            },
            module.run(),
        );
        totals
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_accumulate_and_persist() -> Result<()> {
        let dir = tempdir()?;
        let writes = Arc::new(AtomicUsize::new(0));
        let storage = CountingStorage {
            inner: DayLedgerStore::new(dir.path().to_owned())?,
            writes: writes.clone(),
        };

        let totals = run_for(
            scanner_over(&["chrome", "kworker/0:1", "chrome"]),
            storage,
            Duration::from_secs(25),
        )
        .await?;

        assert_eq!(totals.get("chrome"), 20);
        assert_eq!(totals.len(), 1);
        // Two ticks plus the final flush.
        assert_eq!(writes.load(Ordering::SeqCst), 3);

        let stored = DayLedgerStore::new(dir.path().to_owned())?
            .load(TEST_DATE)
            .await?;
        assert_eq!(stored, totals);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_continues_existing_totals() -> Result<()> {
        let dir = tempdir()?;
        let inner = DayLedgerStore::new(dir.path().to_owned())?;
        inner
            .persist(
                TEST_DATE,
                &[("chrome".to_string(), 5), ("steam".to_string(), 40)]
                    .into_iter()
                    .collect::<DayTotals>(),
            )
            .await?;
        let storage = CountingStorage {
            inner,
            writes: Arc::new(AtomicUsize::new(0)),
        };

        let totals = run_for(scanner_over(&["chrome"]), storage, Duration::from_secs(15)).await?;

        assert_eq!(totals.get("chrome"), 15);
        assert_eq!(totals.get("steam"), 40);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_ticks_do_not_write() -> Result<()> {
        let dir = tempdir()?;
        let writes = Arc::new(AtomicUsize::new(0));
        let storage = CountingStorage {
            inner: DayLedgerStore::new(dir.path().to_owned())?,
            writes: writes.clone(),
        };

        let totals = run_for(scanner_over(&[]), storage, Duration::from_secs(35)).await?;

        assert!(totals.is_empty());
        // Only the flush on shutdown.
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick_still_saves() -> Result<()> {
        let dir = tempdir()?;
        let storage = CountingStorage {
            inner: DayLedgerStore::new(dir.path().to_owned())?,
            writes: Arc::new(AtomicUsize::new(0)),
        };

        let totals = run_for(scanner_over(&["chrome"]), storage, Duration::from_secs(3)).await?;

        assert!(totals.is_empty());
        assert!(dir.path().join("2018-07-04.json").exists());
        Ok(())
    }
}
