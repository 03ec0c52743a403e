// Connection module
// Accepts a single TCP connection and serves it on its own task

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Admit a connection if under `performance.max_connections`, then serve it.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    shutdown: watch::Receiver<bool>,
) {
    // Increment first, then check, so concurrent accepts cannot both slip in
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        shutdown,
    );
}

/// Serve one connection on a spawned task.
///
/// The whole connection is bounded by `performance.read_timeout`. When
/// `shutdown` flips, hyper finishes the in-flight request and closes.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    mut shutdown: watch::Receiver<bool>,
) {
    tune_stream(&stream, peer_addr);

    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let timeout_duration = Duration::from_secs(state.config.performance.read_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                handler::handle_request(req, Arc::clone(&service_state), peer_addr)
            }),
        );
        let mut conn = std::pin::pin!(conn);

        let served = async {
            let mut draining = false;
            loop {
                tokio::select! {
                    res = conn.as_mut() => break res,
                    _ = shutdown.changed(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }
        };

        match tokio::time::timeout(timeout_duration, served).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Disable Nagle on an accepted stream
fn tune_stream(stream: &TcpStream, peer_addr: SocketAddr) {
    if let Err(e) = stream.set_nodelay(true) {
        logger::log_warning(&format!("Failed to set TCP_NODELAY for {peer_addr}: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::create_reusable_listener;

    #[tokio::test]
    async fn test_accepted_stream_has_nodelay() {
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(TcpStream::connect(addr));
        let (stream, peer_addr) = listener.accept().await.unwrap();
        tune_stream(&stream, peer_addr);

        assert!(stream.nodelay().unwrap());
        drop(client.await.unwrap().unwrap());
    }
}
