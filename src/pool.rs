//! 进程级资源池：初始化一次，多次复用，显式关闭。
//!
//! Process-wide resource pool.
//!
//! Holds the shared HTTP transport, object store client and orchestrator so
//! long-running hosts (servers, batch drivers) reuse warm connections across
//! operations. The lifecycle is explicit: [`initialize`] builds the pool once,
//! [`global`] hands it out, [`shutdown`] drops it.

use crate::config::RunnerConfig;
use crate::orchestrator::Orchestrator;
use crate::storage::ObjectStore;
use crate::transport::HttpTransport;
use crate::Result;
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

static POOL: Lazy<RwLock<Option<Arc<ResourcePool>>>> = Lazy::new(|| RwLock::new(None));

pub struct ResourcePool {
    config: RunnerConfig,
    transport: HttpTransport,
    orchestrator: Orchestrator,
}

impl ResourcePool {
    pub fn build(config: RunnerConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.http)?;
        let orchestrator = Orchestrator::from_config_with_transport(&config, transport.clone())?;
        Ok(Self {
            config,
            transport,
            orchestrator,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub fn store(&self) -> Option<&Arc<dyn ObjectStore>> {
        self.orchestrator.store()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

/// Build the pool, or return the existing one. The config is ignored when
/// a pool already exists; call [`shutdown`] first to rebuild.
pub fn initialize(config: RunnerConfig) -> Result<Arc<ResourcePool>> {
    let mut slot = POOL.write().unwrap_or_else(|e| e.into_inner());
    if let Some(pool) = slot.as_ref() {
        return Ok(pool.clone());
    }
    let pool = Arc::new(ResourcePool::build(config)?);
    tracing::debug!(
        store = pool.store().is_some(),
        endpoint = pool.orchestrator.job_client().endpoint().id.as_str(),
        "resource pool initialized"
    );
    *slot = Some(pool.clone());
    Ok(pool)
}

pub fn global() -> Option<Arc<ResourcePool>> {
    POOL.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Drop the pool. Handles already given out stay valid until released.
/// Returns whether a pool existed.
pub fn shutdown() -> bool {
    let taken = POOL.write().unwrap_or_else(|e| e.into_inner()).take();
    if taken.is_some() {
        tracing::debug!("resource pool shut down");
    }
    taken.is_some()
}
