// Application state module
// Immutable state shared by every connection

use std::io;

use super::types::Config;
use crate::handler::{self, AssetClock, Router};

/// Application state
///
/// Built once at startup and only read afterwards, so it is shared behind an
/// `Arc` without locks.
pub struct AppState {
    pub config: Config,
    pub router: Router,
}

impl AppState {
    /// Build the route table for `config`, stamping assets with `clock`
    pub fn new(config: &Config, clock: AssetClock) -> io::Result<Self> {
        let router = handler::build_router(config, clock)?;
        Ok(Self {
            config: config.clone(),
            router,
        })
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
