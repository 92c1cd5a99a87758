//! Deterministic in-memory implementation of the platform seam, recording
//! every hardware and transport interaction so tests can assert on resource
//! state the way a browser would observe it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;

use tandem_call::{
    CallError, CallPhase, CallPlatform, CallRole, EndingFlag, EventSender, MediaTrack,
    PeerSession, PeerTransport, SessionConfig, SessionUpdate, SignalChannel, TrackKind,
};
use tandem_core::utils::default_ice_servers;
use tandem_core::{CandidateInit, Envelope, IceServerConfig, ParticipantId, SdpKind, SessionDescription};

#[derive(Clone)]
pub struct FakeTrack {
    inner: Rc<TrackState>,
}

struct TrackState {
    id: String,
    kind: TrackKind,
    enabled: Cell<bool>,
    stopped: Cell<bool>,
}

impl FakeTrack {
    pub fn stub(id: &str, kind: TrackKind) -> Self {
        Self {
            inner: Rc::new(TrackState {
                id: id.to_string(),
                kind,
                enabled: Cell::new(true),
                stopped: Cell::new(false),
            }),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> String {
        self.inner.id.clone()
    }

    fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    fn enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.set(enabled);
    }

    fn stop(&self) {
        self.inner.stopped.set(true);
    }
}

#[derive(Default)]
pub struct PeerLog {
    pub remote_descriptions: RefCell<Vec<SessionDescription>>,
    pub remote_candidates: RefCell<Vec<CandidateInit>>,
    pub senders: RefCell<Vec<FakeTrack>>,
    pub swapped: RefCell<Vec<FakeTrack>>,
    pub offers_created: Cell<usize>,
    pub answers_created: Cell<usize>,
    pub closed: Cell<bool>,
    pub fail_remote: Cell<bool>,
}

#[derive(Clone, Default)]
pub struct FakePeer {
    pub log: Rc<PeerLog>,
}

#[async_trait(?Send)]
impl PeerTransport for FakePeer {
    type Track = FakeTrack;

    fn add_track(&self, track: &FakeTrack) -> Result<(), CallError> {
        self.log.senders.borrow_mut().push(track.clone());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, CallError> {
        let n = self.log.offers_created.get() + 1;
        self.log.offers_created.set(n);
        Ok(SessionDescription {
            kind: SdpKind::Offer,
            sdp: format!("fake-offer-{n}"),
        })
    }

    async fn create_answer(&self) -> Result<SessionDescription, CallError> {
        let n = self.log.answers_created.get() + 1;
        self.log.answers_created.set(n);
        Ok(SessionDescription {
            kind: SdpKind::Answer,
            sdp: format!("fake-answer-{n}"),
        })
    }

    async fn accept_remote(&self, description: &SessionDescription) -> Result<(), CallError> {
        if self.log.fail_remote.get() {
            return Err(CallError::Negotiation("injected description failure".to_string()));
        }
        self.log.remote_descriptions.borrow_mut().push(description.clone());
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &CandidateInit) -> Result<(), CallError> {
        if self.log.fail_remote.get() {
            return Err(CallError::Negotiation("injected candidate failure".to_string()));
        }
        self.log.remote_candidates.borrow_mut().push(candidate.clone());
        Ok(())
    }

    async fn swap_video_track(&self, track: &FakeTrack) -> Result<(), CallError> {
        self.log.swapped.borrow_mut().push(track.clone());
        let mut senders = self.log.senders.borrow_mut();
        senders.retain(|t| t.kind() != TrackKind::Video);
        senders.push(track.clone());
        Ok(())
    }

    fn drop_video_sender(&self) {
        self.log.senders.borrow_mut().retain(|track| {
            if track.kind() == TrackKind::Video {
                track.stop();
                false
            } else {
                true
            }
        });
    }

    fn shutdown(&self) {
        for track in self.log.senders.borrow().iter() {
            track.stop();
        }
        self.log.senders.borrow_mut().clear();
        self.log.closed.set(true);
    }
}

#[derive(Clone, Default)]
pub struct FakeChannel {
    pub sent: Rc<RefCell<Vec<Envelope>>>,
    pub shut: Rc<Cell<bool>>,
}

impl SignalChannel for FakeChannel {
    fn send(&self, envelope: &Envelope) -> Result<(), CallError> {
        if self.shut.get() {
            return Err(CallError::Signaling("channel closed".to_string()));
        }
        self.sent.borrow_mut().push(envelope.clone());
        Ok(())
    }

    fn shutdown(&self) {
        self.shut.set(true);
    }
}

#[derive(Default)]
pub struct PlatformLog {
    pub acquisitions: Cell<usize>,
    pub video_acquisitions: Cell<usize>,
    pub deny_media: Cell<bool>,
    pub deny_signaling: Cell<bool>,
    pub tracks: RefCell<Vec<FakeTrack>>,
    pub warnings: RefCell<Vec<String>>,
    pub peer: RefCell<Option<FakePeer>>,
    pub channel: RefCell<Option<FakeChannel>>,
    next_track: Cell<usize>,
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    pub log: Rc<PlatformLog>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peer(&self) -> FakePeer {
        self.log.peer.borrow().clone().expect("peer not created")
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.log
            .channel
            .borrow()
            .as_ref()
            .map(|channel| channel.sent.borrow().clone())
            .unwrap_or_default()
    }

    /// Takes everything sent so far, leaving the outbox empty. Used to pump
    /// envelopes between two sessions the way the hub would.
    pub fn drain_sent(&self) -> Vec<Envelope> {
        self.log
            .channel
            .borrow()
            .as_ref()
            .map(|channel| channel.sent.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    pub fn channel_shut(&self) -> bool {
        self.log
            .channel
            .borrow()
            .as_ref()
            .map(|channel| channel.shut.get())
            .unwrap_or(false)
    }

    fn mint_track(&self, kind: TrackKind) -> FakeTrack {
        let n = self.log.next_track.get() + 1;
        self.log.next_track.set(n);
        let track = FakeTrack::stub(&format!("track-{n}"), kind);
        self.log.tracks.borrow_mut().push(track.clone());
        track
    }
}

#[async_trait(?Send)]
impl CallPlatform for FakePlatform {
    type Track = FakeTrack;
    type Peer = FakePeer;
    type Channel = FakeChannel;

    async fn acquire_media(&self, audio: bool, video: bool) -> Result<Vec<FakeTrack>, CallError> {
        self.log.acquisitions.set(self.log.acquisitions.get() + 1);
        if video {
            self.log
                .video_acquisitions
                .set(self.log.video_acquisitions.get() + 1);
        }
        if self.log.deny_media.get() {
            return Err(CallError::CaptureDenied("permission dismissed".to_string()));
        }
        let mut tracks = Vec::new();
        if audio {
            tracks.push(self.mint_track(TrackKind::Audio));
        }
        if video {
            tracks.push(self.mint_track(TrackKind::Video));
        }
        Ok(tracks)
    }

    async fn open_signaling(
        &self,
        _local: &ParticipantId,
        _events: EventSender<FakeTrack>,
        _ending: EndingFlag,
    ) -> Result<FakeChannel, CallError> {
        if self.log.deny_signaling.get() {
            return Err(CallError::Signaling("connection refused".to_string()));
        }
        let channel = FakeChannel::default();
        *self.log.channel.borrow_mut() = Some(channel.clone());
        Ok(channel)
    }

    fn create_peer(
        &self,
        _ice_servers: &[IceServerConfig],
        _events: EventSender<FakeTrack>,
    ) -> Result<FakePeer, CallError> {
        let peer = FakePeer::default();
        *self.log.peer.borrow_mut() = Some(peer.clone());
        Ok(peer)
    }

    fn warn(&self, message: &str) {
        self.log.warnings.borrow_mut().push(message.to_string());
    }
}

/// Records the updates a presentation adapter would see.
#[derive(Clone, Default)]
pub struct Recorder {
    pub phases: Rc<RefCell<Vec<CallPhase>>>,
    pub errors: Rc<RefCell<Vec<Option<String>>>>,
}

impl Recorder {
    pub fn hook(&self, session: &mut PeerSession<FakePlatform>) {
        let phases = self.phases.clone();
        let errors = self.errors.clone();
        session.set_update_handler(move |update| match update {
            SessionUpdate::Phase(phase) => phases.borrow_mut().push(phase),
            SessionUpdate::Error(error) => errors.borrow_mut().push(error),
            _ => {}
        });
    }

    pub fn last_error(&self) -> Option<String> {
        self.errors.borrow().last().cloned().flatten()
    }
}

pub fn session_between(
    platform: &FakePlatform,
    local: &str,
    remote: &str,
    role: CallRole,
    wants_video: bool,
) -> PeerSession<FakePlatform> {
    PeerSession::new(
        platform.clone(),
        SessionConfig {
            local_id: local.into(),
            remote_id: remote.into(),
            role,
            wants_video,
            ice_servers: default_ice_servers(),
        },
    )
}

pub fn candidate(payload: &str) -> CandidateInit {
    CandidateInit {
        candidate: payload.to_string(),
        sdp_mid: Some("0".to_string()),
        sdp_m_line_index: Some(0),
    }
}
