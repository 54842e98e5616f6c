//! Process signals that end a trace session: SIGINT and, on Unix, SIGTERM.

use log::{info, warn};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Resolves on the first interrupt or termination signal.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for interrupt signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for terminate signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Received interrupt signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

/// Runs `on_signal` once a shutdown signal arrives. Abort the returned
/// handle to stop listening.
pub fn on_shutdown_signal(
    runtime: &Handle,
    on_signal: impl FnOnce() + Send + 'static,
) -> AbortHandle {
    runtime
        .spawn(async move {
            shutdown_signal().await;
            on_signal();
        })
        .abort_handle()
}
