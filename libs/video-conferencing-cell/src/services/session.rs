// libs/video-conferencing-cell/src/services/session.rs
use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    ConferenceEvent, EndReason, ProviderSettings, ScriptLoadError, SessionConfig, SessionError,
    SessionState, StateChange, VideoConferencingError,
};
use crate::services::identity::normalize_identity;
use crate::services::script_loader::ScriptLoader;
use crate::services::sdk::{build_conference_options, ConferenceSdk, ConferenceSession, EventListeners};

const STATE_CHANNEL_CAPACITY: usize = 64;

/// Asynchronous inputs, each tagged with the generation of the attempt that produced it.
#[derive(Debug)]
enum ControllerInput {
    ScriptReady {
        generation: u64,
        outcome: Result<(), ScriptLoadError>,
    },
    Sdk {
        generation: u64,
        event: ConferenceEvent,
        payload: Value,
    },
    ConnectTimeout {
        generation: u64,
    },
}

struct SessionHandle {
    state: SessionState,
    generation: u64,
    config: Option<SessionConfig>,
    external_session: Option<Box<dyn ConferenceSession>>,
    timeout_handle: Option<AbortHandle>,
    load_handle: Option<AbortHandle>,
    inputs: Option<mpsc::UnboundedSender<ControllerInput>>,
    last_error: Option<SessionError>,
    end_reason: Option<EndReason>,
}

impl SessionHandle {
    fn is_current(&self, generation: u64, state: SessionState) -> bool {
        self.generation == generation && self.state == state
    }

    fn cancel_timers(&mut self) {
        if let Some(timer) = self.timeout_handle.take() {
            timer.abort();
        }
        if let Some(load) = self.load_handle.take() {
            load.abort();
        }
    }
}

struct ControllerInner {
    session_id: Uuid,
    loader: Arc<ScriptLoader>,
    sdk: Arc<dyn ConferenceSdk>,
    settings: ProviderSettings,
    handle: Mutex<SessionHandle>,
    state_changes: broadcast::Sender<StateChange>,
}

/// Drives one conferencing session from "join room R" to a live call and back.
///
/// Public operations are synchronous. Script loading, SDK events and the
/// connect timer feed a single input queue drained by one task, and every
/// input is checked against the current `(generation, state)` before it may
/// change anything. Dropping the controller disposes it.
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    pub fn new(
        loader: Arc<ScriptLoader>,
        sdk: Arc<dyn ConferenceSdk>,
        settings: ProviderSettings,
    ) -> Self {
        let (state_changes, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(ControllerInner {
                session_id: Uuid::new_v4(),
                loader,
                sdk,
                settings,
                handle: Mutex::new(SessionHandle {
                    state: SessionState::Idle,
                    generation: 0,
                    config: None,
                    external_session: None,
                    timeout_handle: None,
                    load_handle: None,
                    inputs: None,
                    last_error: None,
                    end_reason: None,
                }),
                state_changes,
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.state_changes.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.lock().last_error.clone()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.inner.lock().end_reason
    }

    /// Whether a connect-timeout timer is currently armed.
    pub fn timer_armed(&self) -> bool {
        self.inner.lock().timeout_handle.is_some()
    }

    /// Begins a session attempt. Fails with `RuntimeUnavailable` outside a Tokio runtime.
    #[instrument(skip(self, config), fields(session_id = %self.inner.session_id))]
    pub fn start(&self, config: SessionConfig) -> Result<(), VideoConferencingError> {
        config.validate()?;
        if Handle::try_current().is_err() {
            return Err(VideoConferencingError::RuntimeUnavailable);
        }

        let mut handle = self.inner.lock();
        if handle.state != SessionState::Idle {
            return Err(VideoConferencingError::InvalidSessionState {
                status: handle.state.to_string(),
            });
        }

        info!(
            "Starting video session for room token '{}' ({:?})",
            config.room_token, config.participant_role
        );

        let (tx, rx) = mpsc::unbounded_channel();
        handle.inputs = Some(tx);
        handle.config = Some(config);
        handle.generation += 1;

        tokio::spawn(run_input_loop(Arc::downgrade(&self.inner), rx));
        self.inner.begin_attempt(&mut handle);
        Ok(())
    }

    /// Re-enters `LoadingSdk` with a fresh generation. Only valid from `Error`.
    #[instrument(skip(self), fields(session_id = %self.inner.session_id))]
    pub fn retry(&self) -> Result<(), VideoConferencingError> {
        let stale_session = {
            let mut handle = self.inner.lock();
            if handle.state != SessionState::Error {
                return Err(VideoConferencingError::InvalidSessionState {
                    status: handle.state.to_string(),
                });
            }
            if Handle::try_current().is_err() {
                return Err(VideoConferencingError::RuntimeUnavailable);
            }

            handle.generation += 1;
            handle.last_error = None;
            info!("Retrying video session, generation {}", handle.generation);

            let stale_session = handle.external_session.take();
            self.inner.begin_attempt(&mut handle);
            stale_session
        };

        if let Some(session) = stale_session {
            self.inner.teardown(session);
        }
        Ok(())
    }

    /// Ends a joined session. In any other state this is a plain `dispose()`.
    #[instrument(skip(self), fields(session_id = %self.inner.session_id))]
    pub fn leave(&self) {
        let state = self.state();
        if state == SessionState::Joined {
            self.inner.end_joined_session(None, EndReason::LeaveRequested);
        } else {
            debug!("leave() called in state {}, disposing", state);
            self.dispose();
        }
    }

    /// Idempotent teardown from any state. Never fails the caller.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl ControllerInner {
    fn lock(&self) -> MutexGuard<'_, SessionHandle> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, handle: &mut SessionHandle, next: SessionState) {
        let previous = handle.state;
        handle.state = next;

        info!(
            session_id = %self.session_id,
            generation = handle.generation,
            "Video session transition: {} -> {}",
            previous,
            next
        );

        let change = StateChange {
            session_id: self.session_id,
            generation: handle.generation,
            state: next,
            last_error: handle.last_error.clone(),
            end_reason: handle.end_reason,
            at: Utc::now(),
        };
        // No subscribers is fine.
        let _ = self.state_changes.send(change);
    }

    fn begin_attempt(&self, handle: &mut SessionHandle) {
        self.transition(handle, SessionState::LoadingSdk);

        let Some(inputs) = handle.inputs.clone() else {
            warn!("Video session input queue closed, cannot load SDK");
            return;
        };
        let generation = handle.generation;
        let loader = Arc::clone(&self.loader);

        let task = tokio::spawn(async move {
            let outcome = loader.ensure_loaded().await;
            let _ = inputs.send(ControllerInput::ScriptReady { generation, outcome });
        });
        handle.load_handle = Some(task.abort_handle());
    }

    fn arm_connect_timer(&self, handle: &mut SessionHandle, timeout_ms: u64) {
        let Some(inputs) = handle.inputs.clone() else {
            return;
        };
        let generation = handle.generation;

        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
            let _ = inputs.send(ControllerInput::ConnectTimeout { generation });
        });
        handle.timeout_handle = Some(task.abort_handle());
    }

    /// Moves to `Error`, cancelling timers and detaching the external session for teardown.
    fn enter_error(
        &self,
        handle: &mut SessionHandle,
        error: SessionError,
    ) -> Option<Box<dyn ConferenceSession>> {
        warn!(session_id = %self.session_id, "Video session failed: {}", error);
        handle.cancel_timers();
        handle.last_error = Some(error);
        let session = handle.external_session.take();
        self.transition(handle, SessionState::Error);
        session
    }

    fn teardown(&self, session: Box<dyn ConferenceSession>) {
        if let Err(e) = session.dispose() {
            let failure = SessionError::DisposalFailure { message: e.message };
            error!(session_id = %self.session_id, "{}", failure);
        }
    }

    fn dispose(&self) {
        let session = {
            let mut handle = self.lock();
            if handle.state == SessionState::Disposed {
                debug!(session_id = %self.session_id, "dispose() on disposed session ignored");
                return;
            }

            handle.cancel_timers();
            handle.inputs = None;
            handle.last_error = None;
            let session = handle.external_session.take();
            self.transition(&mut handle, SessionState::Disposed);
            session
        };

        if let Some(session) = session {
            self.teardown(session);
        }
    }

    /// `Joined -> Leaving -> Disposed`. A concurrent `dispose()` may finish the job first.
    fn end_joined_session(&self, generation: Option<u64>, reason: EndReason) {
        let session = {
            let mut handle = self.lock();
            let current = match generation {
                Some(generation) => handle.is_current(generation, SessionState::Joined),
                None => handle.state == SessionState::Joined,
            };
            if !current {
                return;
            }

            info!(session_id = %self.session_id, "Video session ending: {:?}", reason);
            handle.end_reason = Some(reason);
            handle.cancel_timers();
            let session = handle.external_session.take();
            self.transition(&mut handle, SessionState::Leaving);
            session
        };

        if let Some(session) = session {
            self.teardown(session);
        }

        let mut handle = self.lock();
        if handle.state == SessionState::Leaving {
            handle.inputs = None;
            self.transition(&mut handle, SessionState::Disposed);
        }
    }

    fn on_script_ready(&self, generation: u64, outcome: Result<(), ScriptLoadError>) {
        let mut handle = self.lock();
        if !handle.is_current(generation, SessionState::LoadingSdk) {
            debug!(
                session_id = %self.session_id,
                "Discarding stale SDK load result for generation {}", generation
            );
            return;
        }
        handle.load_handle = None;

        if let Err(e) = outcome {
            let stale = self.enter_error(&mut handle, SessionError::ScriptLoadFailure { reason: e.reason });
            drop(handle);
            if let Some(session) = stale {
                self.teardown(session);
            }
            return;
        }

        let Some(config) = handle.config.clone() else {
            warn!(session_id = %self.session_id, "SDK ready without a session config");
            return;
        };
        let Some(inputs) = handle.inputs.clone() else {
            return;
        };

        self.transition(&mut handle, SessionState::Initializing);
        self.arm_connect_timer(&mut handle, config.resolved_connect_timeout_ms(&self.settings));
        drop(handle);

        self.initialize(generation, &config, inputs);
    }

    fn initialize(
        &self,
        generation: u64,
        config: &SessionConfig,
        inputs: mpsc::UnboundedSender<ControllerInput>,
    ) {
        let identity = normalize_identity(config, &self.settings);
        let options = build_conference_options(config, &identity, &self.settings);
        debug!(
            session_id = %self.session_id,
            "Constructing conferencing session for room {}", identity.sdk_room_name
        );

        let session = match self.sdk.create_session(options) {
            Ok(session) => session,
            Err(e) => {
                let mut handle = self.lock();
                if handle.is_current(generation, SessionState::Initializing) {
                    let stale = self.enter_error(
                        &mut handle,
                        SessionError::ConstructionFailure { message: e.message },
                    );
                    drop(handle);
                    if let Some(session) = stale {
                        self.teardown(session);
                    }
                }
                return;
            }
        };

        // Listeners only enqueue; all state changes happen on the input task.
        let mut listeners = EventListeners::new();
        for event in ConferenceEvent::ALL {
            let inputs = inputs.clone();
            listeners.insert(
                event,
                Box::new(move |payload: Value| {
                    let _ = inputs.send(ControllerInput::Sdk { generation, event, payload });
                }),
            );
        }
        session.add_event_listeners(listeners);

        let mut handle = self.lock();
        if !handle.is_current(generation, SessionState::Initializing) {
            drop(handle);
            debug!(
                session_id = %self.session_id,
                "Session attempt {} superseded during construction", generation
            );
            self.teardown(session);
            return;
        }

        handle.external_session = Some(session);
        self.transition(&mut handle, SessionState::Connecting);
    }

    fn on_sdk_event(&self, generation: u64, event: ConferenceEvent, payload: Value) {
        let mut handle = self.lock();
        if handle.generation != generation || handle.state == SessionState::Disposed {
            debug!(
                session_id = %self.session_id,
                "Discarding {} from generation {} (current {}, state {})",
                event.as_str(),
                generation,
                handle.generation,
                handle.state
            );
            return;
        }

        match (event, handle.state) {
            (ConferenceEvent::VideoConferenceJoined, SessionState::Connecting) => {
                if let Some(timer) = handle.timeout_handle.take() {
                    timer.abort();
                }
                self.transition(&mut handle, SessionState::Joined);
            }
            (ConferenceEvent::VideoConferenceLeft, SessionState::Joined) => {
                drop(handle);
                self.end_joined_session(Some(generation), EndReason::ParticipantLeft);
            }
            (ConferenceEvent::ReadyToClose, SessionState::Joined) => {
                drop(handle);
                self.end_joined_session(Some(generation), EndReason::ReadyToClose);
            }
            (ConferenceEvent::ConnectionFailed, SessionState::Connecting) => {
                let message = payload
                    .get("message")
                    .or_else(|| payload.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("conferencing server unreachable")
                    .to_string();
                let stale = self.enter_error(&mut handle, SessionError::ConnectionFailed { message });
                drop(handle);
                if let Some(session) = stale {
                    self.teardown(session);
                }
            }
            (ConferenceEvent::ParticipantJoined, _) => {
                let name = payload
                    .get("displayName")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                info!(session_id = %self.session_id, "Participant joined: {}", name);
            }
            (event, state) => {
                debug!(
                    session_id = %self.session_id,
                    "Ignoring {} in state {}", event.as_str(), state
                );
            }
        }
    }

    fn on_connect_timeout(&self, generation: u64) {
        let mut handle = self.lock();
        if handle.generation != generation || !handle.state.awaits_connection() {
            debug!(session_id = %self.session_id, "Ignoring stale connect timeout");
            return;
        }

        handle.timeout_handle = None;
        let timeout_ms = handle
            .config
            .as_ref()
            .map(|config| config.resolved_connect_timeout_ms(&self.settings))
            .unwrap_or(self.settings.connect_timeout_ms);
        let stale = self.enter_error(&mut handle, SessionError::ConnectionTimeout { timeout_ms });
        drop(handle);
        if let Some(session) = stale {
            self.teardown(session);
        }
    }
}

async fn run_input_loop(inner: Weak<ControllerInner>, mut inputs: mpsc::UnboundedReceiver<ControllerInput>) {
    while let Some(input) = inputs.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        match input {
            ControllerInput::ScriptReady { generation, outcome } => {
                inner.on_script_ready(generation, outcome)
            }
            ControllerInput::Sdk { generation, event, payload } => {
                inner.on_sdk_event(generation, event, payload)
            }
            ControllerInput::ConnectTimeout { generation } => inner.on_connect_timeout(generation),
        }
    }
    debug!("Video session input loop finished");
}
