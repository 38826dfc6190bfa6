//! Streaming client with a fixed variant list
//!
//! Used for headless demos and tests: it never touches the network and
//! records every command it receives in a shared [`ScriptedLog`].

use super::{ClientFactory, LevelInfo, StreamingClient, AUTO_LEVEL};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

#[derive(Debug, Default)]
struct LogState {
    loads: u32,
    reloads: u32,
    recoveries: u32,
    destroyed: bool,
    current_level: i32,
}

/// Shared record of the commands a [`ScriptedClient`] received
#[derive(Debug, Clone, Default)]
pub struct ScriptedLog {
    state: Arc<Mutex<LogState>>,
}

impl ScriptedLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn loads(&self) -> u32 {
        self.lock().loads
    }

    pub fn reloads(&self) -> u32 {
        self.lock().reloads
    }

    pub fn recoveries(&self) -> u32 {
        self.lock().recoveries
    }

    pub fn destroyed(&self) -> bool {
        self.lock().destroyed
    }

    pub fn current_level(&self) -> i32 {
        self.lock().current_level
    }
}

/// Streaming client returning preset levels
#[derive(Debug, Clone)]
pub struct ScriptedClient {
    levels: Vec<LevelInfo>,
    fail_load: bool,
    log: ScriptedLog,
}

impl ScriptedClient {
    pub fn new(levels: Vec<LevelInfo>) -> Self {
        let log = ScriptedLog::default();
        log.lock().current_level = AUTO_LEVEL;
        Self {
            levels,
            fail_load: false,
            log,
        }
    }

    /// Make `load_source` fail with a manifest fetch error
    pub fn failing(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn log(&self) -> ScriptedLog {
        self.log.clone()
    }

    /// Factory handing out clones that share this client's log
    pub fn into_factory(self) -> ClientFactory {
        Arc::new(move || Box::new(self.clone()) as Box<dyn StreamingClient>)
    }
}

#[async_trait]
impl StreamingClient for ScriptedClient {
    async fn load_source(&mut self, url: &Url) -> Result<Vec<LevelInfo>> {
        let mut log = self.log.lock();
        log.loads += 1;
        log.destroyed = false;
        if self.fail_load {
            return Err(Error::ManifestFetch(format!("scripted failure for {}", url)));
        }
        Ok(self.levels.clone())
    }

    fn levels(&self) -> &[LevelInfo] {
        &self.levels
    }

    fn set_current_level(&mut self, level: i32) {
        self.log.lock().current_level = level;
    }

    fn current_level(&self) -> i32 {
        self.log.lock().current_level
    }

    async fn start_load(&mut self) -> Result<()> {
        let mut log = self.log.lock();
        if log.destroyed {
            return Err(Error::ClientDestroyed);
        }
        log.reloads += 1;
        Ok(())
    }

    fn recover_media_error(&mut self) {
        self.log.lock().recoveries += 1;
    }

    fn destroy(&mut self) {
        self.log.lock().destroyed = true;
    }
}
