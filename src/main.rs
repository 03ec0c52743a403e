use std::sync::Arc;

use hare::config::{AppState, Config};
use hare::handler::AssetClock;
use hare::logger;
use hare::server::{create_reusable_listener, shutdown_signal, start_server_loop};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;

    // Size the runtime from `server.workers`, defaulting to one per core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(AppState::new(&cfg, AssetClock::startup())?);
    let listener = create_reusable_listener(addr)?;

    logger::log_server_start(&listener.local_addr()?, &cfg);

    start_server_loop(listener, state, shutdown_signal()).await;
    Ok(())
}
