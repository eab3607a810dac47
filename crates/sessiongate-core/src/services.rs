//! Process-wide wiring.
//!
//! `Services` is built once at startup and passed to whoever needs the
//! session or the gateway. Nothing in this crate keeps global state.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{ClientFactory, Gateway, Navigator};
use crate::auth::{open_store, SessionManager, SessionStore};
use crate::config::Config;

pub struct Services {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub gateway: Gateway,
}

impl Services {
    /// Wire everything against the store named by `config.storage`
    pub fn new(config: Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let store = open_store(&config).context("Failed to open session store")?;
        Self::with_store(config, store, navigator)
    }

    pub fn with_store(config: Config, store: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let clients = ClientFactory::new(&config).context("Failed to build HTTP client")?;
        let session = Arc::new(SessionManager::new(&config, store, clients.clone()));
        let gateway = Gateway::new(&config, session.clone(), clients, navigator);
        debug!(base_url = %config.base_url, "Services initialized");

        Ok(Self {
            config,
            session,
            gateway,
        })
    }
}
