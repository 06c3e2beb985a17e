// libs/video-conferencing-cell/src/services/script_loader.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use shared_config::AppConfig;

use crate::models::ScriptLoadError;

/// Fetches the SDK bootstrap script and makes its global constructor available.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn fetch(&self) -> Result<(), String>;
}

/// Downloads the bootstrap script over HTTP and checks that it defines the SDK symbol.
pub struct HttpScriptSource {
    client: Client,
    script_url: String,
    global_symbol: String,
}

impl HttpScriptSource {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.video_sdk_fetch_timeout_ms))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build SDK script client ({}), using defaults", e);
                Client::new()
            });

        Self {
            client,
            script_url: config.video_sdk_script_url.clone(),
            global_symbol: config.video_sdk_global_symbol.clone(),
        }
    }
}

#[async_trait]
impl ScriptSource for HttpScriptSource {
    async fn fetch(&self) -> Result<(), String> {
        debug!("Fetching conferencing SDK script from: {}", self.script_url);

        let response = self
            .client
            .get(&self.script_url)
            .send()
            .await
            .map_err(|e| format!("SDK script request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("SDK script request returned HTTP {}", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read SDK script body: {}", e))?;

        if !body.contains(&self.global_symbol) {
            return Err(format!(
                "SDK global symbol {} not found in {}",
                self.global_symbol, self.script_url
            ));
        }

        debug!("SDK script fetched: {} bytes", body.len());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ScriptStatus {
    #[serde(rename = "unloaded")]
    Unloaded,
    #[serde(rename = "loading")]
    Loading,
    #[serde(rename = "loaded")]
    Loaded,
    #[serde(rename = "failed")]
    Failed,
}

#[derive(Debug, Clone)]
enum LoadOutcome {
    Loaded,
    Failed(String),
}

struct GlobalScriptState {
    status: ScriptStatus,
    pending_waiters: Vec<oneshot::Sender<LoadOutcome>>,
    last_failure: Option<String>,
}

/// Single-flight loader for the SDK bootstrap script.
///
/// At most one fetch is in flight. Callers arriving during a fetch wait for
/// its outcome and are resumed in call order. Success is cached for the life
/// of the loader; failure is not, so the next call fetches again.
pub struct ScriptLoader {
    state: Arc<Mutex<GlobalScriptState>>,
    source: Arc<dyn ScriptSource>,
}

static GLOBAL_LOADER: OnceLock<Arc<ScriptLoader>> = OnceLock::new();

const LOADER_STOPPED: &str = "script loader stopped before completing";

impl ScriptLoader {
    pub fn new(source: Arc<dyn ScriptSource>) -> Self {
        Self {
            state: Arc::new(Mutex::new(GlobalScriptState {
                status: ScriptStatus::Unloaded,
                pending_waiters: Vec::new(),
                last_failure: None,
            })),
            source,
        }
    }

    /// The process-wide loader, created on first use from `config`.
    pub fn global(config: &AppConfig) -> Arc<ScriptLoader> {
        GLOBAL_LOADER
            .get_or_init(|| {
                info!("Initializing process-wide SDK script loader");
                Arc::new(ScriptLoader::new(Arc::new(HttpScriptSource::new(config))))
            })
            .clone()
    }

    #[instrument(skip(self))]
    pub async fn ensure_loaded(&self) -> Result<(), ScriptLoadError> {
        let receiver = {
            let mut state = self.state.lock().await;
            match state.status {
                ScriptStatus::Loaded => return Ok(()),
                ScriptStatus::Loading => {
                    debug!("SDK script fetch already in flight, waiting for its outcome");
                    let (tx, rx) = oneshot::channel();
                    state.pending_waiters.push(tx);
                    rx
                }
                ScriptStatus::Unloaded | ScriptStatus::Failed => {
                    let (tx, rx) = oneshot::channel();
                    state.pending_waiters.push(tx);
                    state.status = ScriptStatus::Loading;
                    self.spawn_fetch();
                    rx
                }
            }
        };

        match receiver.await {
            Ok(LoadOutcome::Loaded) => Ok(()),
            Ok(LoadOutcome::Failed(reason)) => Err(ScriptLoadError::new(reason)),
            Err(_) => Err(ScriptLoadError::new(LOADER_STOPPED)),
        }
    }

    pub async fn status(&self) -> ScriptStatus {
        self.state.lock().await.status
    }

    pub async fn last_failure(&self) -> Option<String> {
        self.state.lock().await.last_failure.clone()
    }

    // The fetch runs on its own task so a caller giving up does not strand the other waiters.
    // A panicking source is contained in an inner task and resolves the waiters as a failure.
    fn spawn_fetch(&self) {
        let state = Arc::clone(&self.state);
        let source = Arc::clone(&self.source);

        tokio::spawn(async move {
            info!("Loading conferencing SDK script");
            let fetch = tokio::spawn(async move { source.fetch().await });
            let outcome = match fetch.await {
                Ok(Ok(())) => LoadOutcome::Loaded,
                Ok(Err(reason)) => LoadOutcome::Failed(reason),
                Err(e) => {
                    error!("SDK script fetch task failed: {}", e);
                    LoadOutcome::Failed(LOADER_STOPPED.to_string())
                }
            };

            let mut state = state.lock().await;
            match &outcome {
                LoadOutcome::Loaded => {
                    info!("Conferencing SDK script loaded");
                    state.status = ScriptStatus::Loaded;
                    state.last_failure = None;
                }
                LoadOutcome::Failed(reason) => {
                    error!("Conferencing SDK script failed to load: {}", reason);
                    state.status = ScriptStatus::Failed;
                    state.last_failure = Some(reason.clone());
                }
            }

            for waiter in state.pending_waiters.drain(..) {
                let _ = waiter.send(outcome.clone());
            }
        });
    }
}
