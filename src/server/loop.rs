// Server loop module
// Accepts connections until the shutdown future resolves, then drains

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Interval between checks of the active connection count while draining
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept connections on `listener` until `shutdown` completes.
///
/// After shutdown the listener is closed, open connections are asked to
/// finish their current request, and the loop waits up to
/// `performance.read_timeout` seconds for them. Returns the number of
/// connections still open when the wait ended.
pub async fn start_server_loop<S>(listener: TcpListener, state: Arc<AppState>, shutdown: S) -> usize
where
    S: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(
                        stream,
                        peer_addr,
                        &state,
                        &active_connections,
                        shutdown_rx.clone(),
                    ),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            () = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));
    let _ = shutdown_tx.send(true);

    let deadline = Instant::now() + Duration::from_secs(state.config.performance.read_timeout);
    while active_connections.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL).await;
    }

    let remaining = active_connections.load(Ordering::SeqCst);
    if remaining > 0 {
        logger::log_warning(&format!(
            "{remaining} connection(s) still open after drain period"
        ));
    }
    remaining
}
