//! The offline intercept engine.
//!
//! An [`Engine`] owns one store generation (named by the version tag) and
//! walks it through install and activation. Once active, every intercepted
//! request is classified and answered by one of two strategies:
//!
//! | Class        | Strategy      | On failure                         |
//! |--------------|---------------|------------------------------------|
//! | `Navigation` | network-first | own entry, root doc, offline doc   |
//! | `AppBundle`  | network-first | own entry, root doc, offline doc   |
//! | `Other`      | cache-first   | offline doc if HTML, else 503      |
//! | `Bypass`     | none          | network error goes to the caller   |

pub mod classify;
pub mod fallback;
pub mod lifecycle;
pub mod preload;
pub mod strategy;
pub mod versions;

#[cfg(test)]
pub(crate) mod testing;

use offgrid_core::{AppConfig, Error, RequestKey, ResponseStore, StoreHandle};
use reqwest::Url;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use classify::{RequestClass, classify};
pub use fallback::FallbackChain;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use preload::{PreloadFailure, PreloadReport, preload};
pub use strategy::BackgroundWrites;
pub use versions::{CleanupReport, retire_stale_generations};

use crate::exchange::{ProxyRequest, ProxyResponse};
use crate::fetch::{Fetcher, resolve};
use strategy::{StrategyContext, cache_first, network_first};

/// Engine settings with every identifier resolved against the origin.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub version_tag: String,
    pub origin: Url,
    pub manifest: Vec<Url>,
    pub root: RequestKey,
    pub offline: RequestKey,
    pub app_bundle: String,
    pub skip_waiting_on_install: bool,
}

impl EngineConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve_one = |identifier: &str| {
            resolve(&origin, identifier).map_err(|e| Error::InvalidUrl(format!("{identifier}: {e}")))
        };

        let manifest = config
            .manifest
            .iter()
            .map(|identifier| resolve_one(identifier.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let root = RequestKey::get(resolve_one(config.root_document.as_str())?.as_str());
        let offline = RequestKey::get(resolve_one(config.offline_document.as_str())?.as_str());

        Ok(Self {
            version_tag: config.version_tag.clone(),
            origin,
            manifest,
            root,
            offline,
            app_bundle: config.app_bundle.clone(),
            skip_waiting_on_install: config.skip_waiting_on_install,
        })
    }
}

/// What the engine decided for one request.
#[derive(Debug)]
pub enum Interception {
    /// Not handled; the host sends the request to the network itself.
    Bypass,
    Respond(ProxyResponse),
}

pub struct Engine {
    config: EngineConfig,
    store: StoreHandle,
    fetcher: Arc<dyn Fetcher>,
    fallback: FallbackChain,
    lifecycle: Lifecycle,
    /// Serializes install, activation and retirement.
    phase: Mutex<()>,
    writes: BackgroundWrites,
}

impl Engine {
    pub fn new(config: EngineConfig, backend: Arc<dyn ResponseStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        let store = StoreHandle::new(backend, config.version_tag.clone());
        let fallback = FallbackChain::new(config.root.clone(), config.offline.clone());
        Self {
            config,
            store,
            fetcher,
            fallback,
            lifecycle: Lifecycle::default(),
            phase: Mutex::new(()),
            writes: BackgroundWrites::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn version_tag(&self) -> &str {
        self.store.tag()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.lifecycle.skip_waiting_requested()
    }

    /// Tags of every generation in the backing store.
    pub async fn generations(&self) -> Result<BTreeSet<String>, Error> {
        self.store.backend().generations().await
    }

    /// Open this generation and preload the manifest into it.
    ///
    /// Individual preload failures are reported, not returned. Failing to
    /// open the generation retires the engine.
    pub async fn install(&self) -> Result<PreloadReport, Error> {
        let _phase = self.phase.lock().await;
        self.lifecycle.transition(LifecycleState::Installing)?;

        if let Err(e) = self.store.backend().open(self.store.tag()).await {
            tracing::error!(generation = self.store.tag(), error = %e, "could not open generation");
            self.lifecycle.transition(LifecycleState::Retired)?;
            return Err(e);
        }

        let report = preload(&self.config.manifest, &self.store, self.fetcher.as_ref()).await;
        if !report.is_complete() {
            tracing::warn!(generation = self.store.tag(), failed = report.failed.len(), "preload incomplete");
        }
        self.lifecycle.transition(LifecycleState::Waiting)?;

        if self.config.skip_waiting_on_install {
            self.lifecycle.request_skip_waiting();
        }

        Ok(report)
    }

    /// Delete every other generation and start intercepting.
    ///
    /// # Errors
    ///
    /// `INVALID_STATE` unless the engine is `Waiting`.
    pub async fn activate(&self) -> Result<CleanupReport, Error> {
        let _phase = self.phase.lock().await;
        self.activate_locked().await
    }

    async fn activate_locked(&self) -> Result<CleanupReport, Error> {
        let state = self.lifecycle.state();
        if state != LifecycleState::Waiting {
            return Err(Error::InvalidState(format!("cannot activate while {state}")));
        }

        let report = retire_stale_generations(&self.store).await;
        self.lifecycle.transition(LifecycleState::Active)?;
        tracing::info!(generation = self.store.tag(), deleted = report.deleted.len(), "engine active");
        Ok(report)
    }

    /// Activate if nothing holds the engine back.
    ///
    /// A waiting engine activates when no older generation controls a client
    /// or when skip-waiting was requested. Returns whether it activated.
    pub async fn try_activate(&self, older_controlling: bool) -> Result<bool, Error> {
        let _phase = self.phase.lock().await;
        if self.lifecycle.state() != LifecycleState::Waiting {
            return Ok(false);
        }

        if older_controlling && !self.lifecycle.skip_waiting_requested() {
            tracing::debug!(generation = self.store.tag(), "older generation in control; waiting");
            return Ok(false);
        }

        self.activate_locked().await?;
        Ok(true)
    }

    /// The external "activate now" signal.
    ///
    /// Idempotent. Activates immediately when waiting; otherwise the request
    /// is remembered for when install completes. In-flight requests are not
    /// interrupted.
    pub async fn skip_waiting(&self) -> Result<bool, Error> {
        self.lifecycle.request_skip_waiting();
        self.try_activate(true).await
    }

    /// Stop intercepting for good.
    pub async fn retire(&self) -> Result<(), Error> {
        let _phase = self.phase.lock().await;
        self.lifecycle.transition(LifecycleState::Retired)?;
        Ok(())
    }

    /// Classification as currently applied: everything bypasses unless active.
    pub fn classify(&self, request: &ProxyRequest) -> RequestClass {
        if self.lifecycle.state() != LifecycleState::Active {
            return RequestClass::Bypass;
        }
        classify(request, &self.config.app_bundle)
    }

    /// Decide and, unless bypassed, produce the response for `request`.
    pub async fn intercept(&self, request: &ProxyRequest) -> Interception {
        let class = self.classify(request);
        tracing::debug!(method = %request.method, url = %request.url, ?class, "intercepted");

        let ctx = StrategyContext {
            store: &self.store,
            fetcher: self.fetcher.as_ref(),
            fallback: &self.fallback,
            writes: &self.writes,
        };

        if class == RequestClass::Bypass {
            Interception::Bypass
        } else if class.is_network_first() {
            Interception::Respond(network_first(request, class, &ctx).await)
        } else {
            Interception::Respond(cache_first(request, &ctx).await)
        }
    }

    /// Answer `request`, sending bypassed requests straight to the network.
    ///
    /// Only a bypassed request can fail; intercepted ones always produce a
    /// response.
    pub async fn handle(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        match self.intercept(request).await {
            Interception::Respond(response) => Ok(response),
            Interception::Bypass => self.fetcher.fetch(request).await.map(ProxyResponse::from),
        }
    }

    /// Wait for outstanding background write-throughs.
    pub async fn flush_writes(&self) {
        tracing::debug!(pending = self.writes.pending(), "flushing write-throughs");
        self.writes.flush().await;
    }
}
