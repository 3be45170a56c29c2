use std::path::PathBuf;

use anyhow::Result;
use collection::{accumulator::AccumulationModule, scanner::ProcessScanner};
use storage::{
    ledger::DayLedgerStore,
    rules::{load_aliases, load_exclusions, Aliases, Exclusions},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    identity::IdentityNormalizer,
    process_api::{ProcessSource, SysinfoProcessSource},
    utils::{
        clock::{Clock, DefaultClock},
        interval::PollInterval,
    },
};

pub mod args;
pub mod collection;
pub mod shutdown;
pub mod storage;

/// Represents the starting point for the daemon. Runs until the process receives a shutdown
/// signal.
pub async fn start_daemon(dir: PathBuf, poll_interval: PollInterval) -> Result<()> {
    let exclusions = load_exclusions(&dir).await;
    let aliases = load_aliases(&dir).await;
    info!(
        "Loaded {} exclusions and {} aliases",
        exclusions.len(),
        aliases.len()
    );
    info!("Polling every {poll_interval}; data dir: {dir:?}");

    let shutdown_token = CancellationToken::new();

    let accumulator = create_accumulator(
        dir,
        SysinfoProcessSource::new(),
        IdentityNormalizer::for_current_platform(),
        exclusions,
        aliases,
        &shutdown_token,
        poll_interval,
        DefaultClock,
    )
    .await?;

    let (_, accumulation_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = accumulator.run().await;
            // Lets the signal listener finish if the loop ends on its own.
            shutdown_token.cancel();
            result
        },
    );

    if let Err(accumulation_result) = accumulation_result {
        error!("Accumulation module got an error {:?}", accumulation_result);
        return Err(accumulation_result);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn create_accumulator(
    dir: PathBuf,
    source: impl ProcessSource + 'static,
    normalizer: IdentityNormalizer,
    exclusions: Exclusions,
    aliases: Aliases,
    shutdown_token: &CancellationToken,
    poll_interval: PollInterval,
    clock: impl Clock,
) -> Result<AccumulationModule<DayLedgerStore>> {
    let storage = DayLedgerStore::new(dir)?;
    let scanner = ProcessScanner::new(Box::new(source), normalizer);
    AccumulationModule::new(
        scanner,
        storage,
        exclusions,
        aliases,
        shutdown_token.clone(),
        poll_interval,
        Box::new(clock),
    )
    .await
}
