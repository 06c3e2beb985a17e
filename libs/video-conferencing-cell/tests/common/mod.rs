#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, Semaphore};

use video_conferencing_cell::services::EventListeners;
use video_conferencing_cell::{
    ConferenceEvent, ConferenceOptions, ConferenceSdk, ConferenceSession, MountTarget,
    ParticipantRole, ProviderSettings, ScriptLoader, ScriptSource, SdkError, SessionConfig,
    SessionController, SessionState, StateChange,
};

// ==============================================================================
// SCRIPT SOURCES
// ==============================================================================

/// Resolves immediately and counts fetches.
#[derive(Default)]
pub struct CountingScriptSource {
    pub fetches: AtomicUsize,
    pub failures_before_success: AtomicUsize,
}

impl CountingScriptSource {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            failures_before_success: AtomicUsize::new(failures),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptSource for CountingScriptSource {
    async fn fetch(&self) -> Result<(), String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_before_success.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_before_success.store(remaining - 1, Ordering::SeqCst);
            return Err("script host unreachable".to_string());
        }
        Ok(())
    }
}

/// Holds every fetch until `release` is called.
pub struct GatedScriptSource {
    pub fetches: AtomicUsize,
    gate: Semaphore,
    result: Result<(), String>,
}

impl GatedScriptSource {
    pub fn new(result: Result<(), String>) -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            gate: Semaphore::new(0),
            result,
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptSource for GatedScriptSource {
    async fn fetch(&self) -> Result<(), String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.result.clone()
    }
}

/// Holds every fetch until `release` is called, then panics.
pub struct PanickingScriptSource {
    pub fetches: AtomicUsize,
    gate: Semaphore,
}

impl PanickingScriptSource {
    pub fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptSource for PanickingScriptSource {
    async fn fetch(&self) -> Result<(), String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        panic!("bootstrap script evaluation crashed");
    }
}

// ==============================================================================
// FAKE CONFERENCING SDK
// ==============================================================================

/// Test-side view of one session the fake SDK constructed.
pub struct SessionProbe {
    pub options: ConferenceOptions,
    listeners: Mutex<EventListeners>,
    dispose_calls: AtomicUsize,
    fail_dispose: bool,
}

impl SessionProbe {
    /// Delivers an SDK event. Listeners stay registered after dispose so late callbacks can be simulated.
    pub fn emit(&self, event: ConferenceEvent, payload: Value) {
        let listeners = self.listeners.lock().unwrap();
        if let Some(listener) = listeners.get(&event) {
            listener(payload);
        }
    }

    pub fn dispose_calls(&self) -> usize {
        self.dispose_calls.load(Ordering::SeqCst)
    }

    pub fn registered_events(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

struct FakeSession {
    probe: Arc<SessionProbe>,
}

impl ConferenceSession for FakeSession {
    fn add_event_listeners(&self, listeners: EventListeners) {
        self.probe.listeners.lock().unwrap().extend(listeners);
    }

    fn dispose(&self) -> Result<(), SdkError> {
        self.probe.dispose_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_dispose {
            return Err(SdkError::new("iframe already detached"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSdk {
    sessions: Mutex<Vec<Arc<SessionProbe>>>,
    construction_error: Mutex<Option<String>>,
    fail_dispose: bool,
}

impl FakeSdk {
    pub fn with_failing_dispose() -> Self {
        Self {
            fail_dispose: true,
            ..Self::default()
        }
    }

    pub fn fail_construction(&self, message: &str) {
        *self.construction_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn allow_construction(&self) {
        *self.construction_error.lock().unwrap() = None;
    }

    pub fn created(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn session(&self, index: usize) -> Arc<SessionProbe> {
        Arc::clone(&self.sessions.lock().unwrap()[index])
    }
}

impl ConferenceSdk for FakeSdk {
    fn create_session(
        &self,
        options: ConferenceOptions,
    ) -> Result<Box<dyn ConferenceSession>, SdkError> {
        if let Some(message) = self.construction_error.lock().unwrap().clone() {
            return Err(SdkError::new(message));
        }

        let probe = Arc::new(SessionProbe {
            options,
            listeners: Mutex::new(EventListeners::new()),
            dispose_calls: AtomicUsize::new(0),
            fail_dispose: self.fail_dispose,
        });
        self.sessions.lock().unwrap().push(Arc::clone(&probe));
        Ok(Box::new(FakeSession { probe }))
    }
}

// ==============================================================================
// HELPERS
// ==============================================================================

pub struct Harness {
    pub controller: SessionController,
    pub sdk: Arc<FakeSdk>,
    pub source: Arc<CountingScriptSource>,
    pub changes: broadcast::Receiver<StateChange>,
}

pub fn harness() -> Harness {
    harness_with(FakeSdk::default(), CountingScriptSource::default())
}

pub fn harness_with(sdk: FakeSdk, source: CountingScriptSource) -> Harness {
    let sdk = Arc::new(sdk);
    let source = Arc::new(source);
    let loader = Arc::new(ScriptLoader::new(source.clone()));
    let controller = SessionController::new(loader, sdk.clone(), ProviderSettings::default());
    let changes = controller.subscribe();

    Harness {
        controller,
        sdk,
        source,
        changes,
    }
}

pub fn session_config(room_token: &str, name: &str, role: ParticipantRole) -> SessionConfig {
    SessionConfig::new(room_token, name, role, MountTarget::new("jitsi-container"))
        .with_connect_timeout_ms(20_000)
}

pub async fn next_change(changes: &mut broadcast::Receiver<StateChange>) -> StateChange {
    tokio::time::timeout(Duration::from_secs(120), changes.recv())
        .await
        .expect("timed out waiting for a state change")
        .expect("state channel closed")
}

pub async fn wait_for_state(
    changes: &mut broadcast::Receiver<StateChange>,
    state: SessionState,
) -> StateChange {
    loop {
        let change = next_change(changes).await;
        if change.state == state {
            return change;
        }
    }
}

/// Lets the controller's input task drain whatever is queued.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
