use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels the monitor on ctrl-c. Returns early if something else cancelled it first.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            cancellation.cancel();
        },
        _ = cancellation.cancelled() => (),
    };
}
