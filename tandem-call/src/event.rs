use std::cell::Cell;
use std::rc::Rc;

use futures::channel::mpsc;

use tandem_core::{CandidateInit, Envelope};

use crate::state::CallPhase;

pub type EventSender<T> = mpsc::UnboundedSender<SessionEvent<T>>;

/// Everything a session reacts to arrives through one queue: hub-delivered
/// envelopes, peer-connection callbacks, signaling lifecycle notices, and
/// user intents. The session loop is the only writer of session state.
pub enum SessionEvent<T> {
    Inbound(Envelope),
    LocalCandidate(CandidateInit),
    RemoteTrack(T),
    /// The supervised channel is down; carries the user-facing message.
    SignalingLost(String),
    SignalingRestored,
    Intent(Intent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ToggleMute,
    ToggleVideo,
    End,
}

/// Session state pushed out to the presentation layer. The adapter only
/// ever sees these; errors are a string or nothing.
pub enum SessionUpdate<T> {
    Phase(CallPhase),
    LocalMedia(Vec<T>),
    RemoteMedia(Vec<T>),
    Muted(bool),
    VideoOff(bool),
    Error(Option<String>),
}

/// Latch set the moment teardown is requested. Checked again after every
/// suspension point, so media that resolves mid-teardown is stopped instead
/// of being attached to a session that no longer exists.
#[derive(Clone, Default)]
pub struct EndingFlag(Rc<Cell<bool>>);

impl EndingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.set(true);
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}
