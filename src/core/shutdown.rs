use tokio::signal;

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves on SIGINT or SIGTERM; in-flight attempt requests finish before exit.
pub(crate) async fn shutdown_signal() {
    let source = tokio::select! {
        _ = ctrl_c() => "SIGINT",
        _ = terminate() => "SIGTERM",
    };

    tracing::info!(signal = source, "shutdown signal received, draining connections");
}
