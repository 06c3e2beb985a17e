// libs/video-conferencing-cell/src/services/mod.rs

pub mod identity;
pub mod script_loader;
pub mod sdk;
pub mod session;

pub use identity::normalize_identity;
pub use script_loader::{HttpScriptSource, ScriptLoader, ScriptSource, ScriptStatus};
pub use sdk::{ConferenceSdk, ConferenceSession, EventListener, EventListeners};
pub use session::SessionController;
