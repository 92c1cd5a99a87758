pub mod error;
pub mod event;
pub mod logger;
pub mod platform;
pub mod session;
pub mod state;
pub mod web;

pub use error::CallError;
pub use event::{EndingFlag, EventSender, Intent, SessionEvent, SessionUpdate};
pub use platform::{CallPlatform, MediaTrack, PeerTransport, SignalChannel, TrackKind};
pub use session::{PeerSession, SessionConfig, SessionHandle};
pub use state::{CallPhase, CallRole};
