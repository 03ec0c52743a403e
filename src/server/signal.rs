// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use crate::logger;

/// Resolve once the process is asked to stop.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => logger::log_info("SIGTERM received"),
        () = ctrl_c() => {}
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => logger::log_info("SIGINT received"),
        Err(e) => {
            // Without a signal source, run until killed
            logger::log_warning(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    }
}
