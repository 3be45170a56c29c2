use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Detects signals sent to the process and turns them into cancellation. Ctrl+C works
/// everywhere, SIGTERM (what `gametime stop` sends) on unix only.
///
/// On Windows detached processes can't detect signals sent to them, `gametime stop` kills them
/// instead and the last tick's write is what survives.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = interrupt() => info!("Received interrupt"),
        _ = terminate() => info!("Received termination request"),
        // Someone else already stopped the daemon.
        _ = cancelation.cancelled() => (),
    };
    cancelation.cancel();
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Can't listen for ctrl-c {e:?}");
        std::future::pending::<()>().await
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            terminate.recv().await;
        }
        Err(e) => {
            error!("Can't listen for SIGTERM {e:?}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
