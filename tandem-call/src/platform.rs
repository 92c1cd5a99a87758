use async_trait::async_trait;

use tandem_core::{CandidateInit, Envelope, IceServerConfig, ParticipantId, SessionDescription};

use crate::error::CallError;
use crate::event::{EndingFlag, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A live capture or playback track. `stop` releases the hardware grant;
/// `set_enabled` only gates transmission.
pub trait MediaTrack {
    fn id(&self) -> String;
    fn kind(&self) -> TrackKind;
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    fn stop(&self);
}

/// Peer-connection transport seam. `create_offer`/`create_answer` also
/// install the local description and return what goes on the wire.
#[async_trait(?Send)]
pub trait PeerTransport {
    type Track: MediaTrack;

    fn add_track(&self, track: &Self::Track) -> Result<(), CallError>;
    async fn create_offer(&self) -> Result<SessionDescription, CallError>;
    async fn create_answer(&self) -> Result<SessionDescription, CallError>;
    async fn accept_remote(&self, description: &SessionDescription) -> Result<(), CallError>;
    async fn add_remote_candidate(&self, candidate: &CandidateInit) -> Result<(), CallError>;

    /// Replaces the outbound video track without a renegotiation round
    /// trip, adding a sender if none exists yet.
    async fn swap_video_track(&self, track: &Self::Track) -> Result<(), CallError>;

    /// Stops and removes the outbound video sender, if any.
    fn drop_video_sender(&self);

    /// Best-effort teardown: stop sender tracks, remove senders, close.
    fn shutdown(&self);
}

pub trait SignalChannel {
    fn send(&self, envelope: &Envelope) -> Result<(), CallError>;

    /// Detaches handlers (so no reconnect can fire) and closes the channel.
    fn shutdown(&self);
}

/// Seam between the session state machine and the runtime it lives in. The
/// browser implementation is [`crate::web::WebPlatform`]; the test suite
/// drives the machine through a deterministic fake.
#[async_trait(?Send)]
pub trait CallPlatform {
    type Track: MediaTrack + Clone + 'static;
    type Peer: PeerTransport<Track = Self::Track>;
    type Channel: SignalChannel;

    async fn acquire_media(&self, audio: bool, video: bool)
    -> Result<Vec<Self::Track>, CallError>;

    /// Opens the supervised signaling channel registered under `local`.
    /// Inbound envelopes and lifecycle notices are delivered to `events`;
    /// the supervisor must stop reconnecting once `ending` is set.
    async fn open_signaling(
        &self,
        local: &ParticipantId,
        events: EventSender<Self::Track>,
        ending: EndingFlag,
    ) -> Result<Self::Channel, CallError>;

    fn create_peer(
        &self,
        ice_servers: &[IceServerConfig],
        events: EventSender<Self::Track>,
    ) -> Result<Self::Peer, CallError>;

    fn warn(&self, message: &str);
}
