use futures::StreamExt;
use futures::channel::mpsc;

use tandem_core::{Envelope, IceServerConfig, ParticipantId};

use crate::error::CallError;
use crate::event::{EndingFlag, EventSender, Intent, SessionEvent, SessionUpdate};
use crate::platform::{CallPlatform, MediaTrack, PeerTransport, SignalChannel, TrackKind};
use crate::state::{CallPhase, CallRole};

const OFFER_FAILED_MSG: &str = "Failed to create connection offer";
const NEGOTIATION_FAILED_MSG: &str = "Failed to establish connection";
const CAMERA_FAILED_MSG: &str = "Failed to turn on camera. Please check permissions.";
const NO_TARGET_MSG: &str = "Missing call target";

pub struct SessionConfig {
    pub local_id: ParticipantId,
    pub remote_id: ParticipantId,
    pub role: CallRole,
    pub wants_video: bool,
    pub ice_servers: Vec<IceServerConfig>,
}

/// Cheap clonable handle the presentation layer holds. Intents travel
/// through the session's event queue like everything else.
pub struct SessionHandle<T> {
    events: EventSender<T>,
    ending: EndingFlag,
}

impl<T> Clone for SessionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            ending: self.ending.clone(),
        }
    }
}

impl<T> SessionHandle<T> {
    pub fn toggle_mute(&self) {
        self.send_intent(Intent::ToggleMute);
    }

    pub fn toggle_video(&self) {
        self.send_intent(Intent::ToggleVideo);
    }

    /// Requests teardown. Only the first call has an effect. The latch is
    /// set before the intent is queued, so an acquisition already in flight
    /// observes it as soon as it resumes.
    pub fn end(&self) {
        if self.ending.is_set() {
            return;
        }
        self.ending.set();
        let _ = self.events.unbounded_send(SessionEvent::Intent(Intent::End));
    }

    fn send_intent(&self, intent: Intent) {
        if self.ending.is_set() {
            return;
        }
        let _ = self.events.unbounded_send(SessionEvent::Intent(intent));
    }
}

type UpdateHandler<T> = Box<dyn Fn(SessionUpdate<T>)>;

/// State machine owning one call end-to-end: one local media grant, one
/// peer connection, one signaling channel. All state is mutated from the
/// single event loop; nothing here is shared or locked.
pub struct PeerSession<P: CallPlatform> {
    platform: P,
    local_id: ParticipantId,
    remote_id: ParticipantId,
    role: CallRole,
    wants_video: bool,
    ice_servers: Vec<IceServerConfig>,
    phase: CallPhase,
    muted: bool,
    video_off: bool,
    error: Option<String>,
    local_tracks: Vec<P::Track>,
    remote_tracks: Vec<P::Track>,
    peer: Option<P::Peer>,
    channel: Option<P::Channel>,
    events_tx: EventSender<P::Track>,
    events_rx: Option<mpsc::UnboundedReceiver<SessionEvent<P::Track>>>,
    ending: EndingFlag,
    on_update: Option<UpdateHandler<P::Track>>,
    on_ended: Option<Box<dyn FnOnce()>>,
}

impl<P: CallPlatform> PeerSession<P> {
    pub fn new(platform: P, config: SessionConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded();
        Self {
            platform,
            local_id: config.local_id,
            remote_id: config.remote_id,
            role: config.role,
            wants_video: config.wants_video,
            ice_servers: config.ice_servers,
            phase: CallPhase::Idle,
            muted: false,
            video_off: !config.wants_video,
            error: None,
            local_tracks: Vec::new(),
            remote_tracks: Vec::new(),
            peer: None,
            channel: None,
            events_tx,
            events_rx: Some(events_rx),
            ending: EndingFlag::new(),
            on_update: None,
            on_ended: None,
        }
    }

    pub fn handle(&self) -> SessionHandle<P::Track> {
        SessionHandle {
            events: self.events_tx.clone(),
            ending: self.ending.clone(),
        }
    }

    pub fn set_update_handler(&mut self, handler: impl Fn(SessionUpdate<P::Track>) + 'static) {
        self.on_update = Some(Box::new(handler));
    }

    /// Completion callback invoked exactly once, after teardown finishes.
    pub fn set_ended_handler(&mut self, handler: impl FnOnce() + 'static) {
        self.on_ended = Some(Box::new(handler));
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_video_off(&self) -> bool {
        self.video_off
    }

    pub fn local_tracks(&self) -> &[P::Track] {
        &self.local_tracks
    }

    pub fn remote_tracks(&self) -> &[P::Track] {
        &self.remote_tracks
    }

    /// Drives the session to completion: media, channel, and peer setup,
    /// then the event loop until the terminal phase.
    pub async fn run(mut self) {
        let Some(mut events) = self.events_rx.take() else {
            return;
        };
        self.start().await;
        while let Some(event) = events.next().await {
            self.handle_event(event).await;
            if self.phase == CallPhase::Ended {
                break;
            }
        }
    }

    /// Acquires local media, opens the signaling channel, constructs the
    /// peer connection, and (as initiator) sends exactly one offer.
    pub async fn start(&mut self) {
        if self.phase != CallPhase::Idle {
            return;
        }
        if self.remote_id.is_empty() {
            self.set_error(Some(NO_TARGET_MSG.to_string()));
            return;
        }
        self.set_phase(CallPhase::AcquiringMedia);

        let tracks = match self.platform.acquire_media(true, self.wants_video).await {
            Ok(tracks) => tracks,
            Err(err) => {
                self.platform.warn(&format!("media acquisition failed: {err}"));
                self.set_error(Some(err.user_message().to_string()));
                return;
            }
        };
        if self.ending.is_set() {
            // Teardown won the race; release the grant right away instead
            // of attaching it to a dead session.
            for track in &tracks {
                track.stop();
            }
            return;
        }
        self.local_tracks = tracks;
        self.emit(SessionUpdate::LocalMedia(self.local_tracks.clone()));

        let opened = self
            .platform
            .open_signaling(&self.local_id, self.events_tx.clone(), self.ending.clone())
            .await;
        let channel = match opened {
            Ok(channel) => channel,
            Err(err) => {
                self.platform.warn(&format!("signaling open failed: {err}"));
                self.set_error(Some(err.user_message().to_string()));
                return;
            }
        };
        if self.ending.is_set() {
            channel.shutdown();
            return;
        }
        self.channel = Some(channel);

        let peer = match self
            .platform
            .create_peer(&self.ice_servers, self.events_tx.clone())
        {
            Ok(peer) => peer,
            Err(err) => {
                self.platform.warn(&format!("peer construction failed: {err}"));
                self.set_error(Some(err.user_message().to_string()));
                return;
            }
        };
        for track in &self.local_tracks {
            if let Err(err) = peer.add_track(track) {
                self.platform.warn(&format!("failed to attach local track: {err}"));
            }
        }
        self.peer = Some(peer);
        self.set_phase(CallPhase::Negotiating);

        // A responder stays here until the remote offer arrives.
        if self.role == CallRole::Initiator {
            self.send_offer().await;
        }
    }

    pub async fn handle_event(&mut self, event: SessionEvent<P::Track>) {
        if self.phase == CallPhase::Ended {
            return;
        }
        match event {
            SessionEvent::Inbound(envelope) => self.handle_envelope(envelope).await,
            SessionEvent::LocalCandidate(candidate) => {
                let envelope = Envelope::IceCandidate {
                    target: self.remote_id.clone(),
                    from: self.local_id.clone(),
                    data: candidate,
                };
                self.send_envelope(&envelope);
            }
            SessionEvent::RemoteTrack(track) => {
                self.remote_tracks.push(track);
                self.emit(SessionUpdate::RemoteMedia(self.remote_tracks.clone()));
                if self.phase == CallPhase::Negotiating {
                    self.set_phase(CallPhase::Connected);
                }
            }
            SessionEvent::SignalingLost(message) => {
                self.platform.warn(&format!("signaling channel lost: {message}"));
                self.set_error(Some(message));
            }
            SessionEvent::SignalingRestored => self.set_error(None),
            SessionEvent::Intent(Intent::ToggleMute) => self.toggle_mute(),
            SessionEvent::Intent(Intent::ToggleVideo) => self.toggle_video().await,
            SessionEvent::Intent(Intent::End) => self.end(),
        }
    }

    async fn handle_envelope(&mut self, envelope: Envelope) {
        if envelope.sender() != &self.remote_id {
            self.platform.warn(&format!(
                "ignoring {} from unexpected sender {}",
                envelope.kind(),
                envelope.sender()
            ));
            return;
        }
        match self.apply_envelope(&envelope).await {
            Ok(Some(reply)) => self.send_envelope(&reply),
            Ok(None) => {}
            Err(err) => {
                self.platform
                    .warn(&format!("failed to apply {}: {err}", envelope.kind()));
                self.set_error(Some(NEGOTIATION_FAILED_MSG.to_string()));
            }
        }
    }

    async fn apply_envelope(&self, envelope: &Envelope) -> Result<Option<Envelope>, CallError> {
        let Some(peer) = self.peer.as_ref() else {
            return Err(CallError::Negotiation(
                "no peer connection for this session".to_string(),
            ));
        };
        match envelope {
            Envelope::Offer { data, .. } => {
                peer.accept_remote(data).await?;
                let answer = peer.create_answer().await?;
                Ok(Some(Envelope::Answer {
                    target: self.remote_id.clone(),
                    from: self.local_id.clone(),
                    data: answer,
                }))
            }
            Envelope::Answer { data, .. } => {
                peer.accept_remote(data).await?;
                Ok(None)
            }
            Envelope::IceCandidate { data, .. } => {
                peer.add_remote_candidate(data).await?;
                Ok(None)
            }
        }
    }

    async fn send_offer(&mut self) {
        let created = match self.peer.as_ref() {
            Some(peer) => peer.create_offer().await,
            None => return,
        };
        match created {
            Ok(description) => {
                let envelope = Envelope::Offer {
                    target: self.remote_id.clone(),
                    from: self.local_id.clone(),
                    data: description,
                };
                self.send_envelope(&envelope);
            }
            Err(err) => {
                self.platform.warn(&format!("offer creation failed: {err}"));
                self.set_error(Some(OFFER_FAILED_MSG.to_string()));
            }
        }
    }

    /// Gates transmission without releasing the microphone, so unmuting is
    /// instant and needs no new permission prompt.
    fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        for track in &self.local_tracks {
            if track.kind() == TrackKind::Audio {
                track.set_enabled(!track.enabled());
            }
        }
        self.emit(SessionUpdate::Muted(self.muted));
    }

    /// Turning video off stops the track entirely, releasing the camera;
    /// turning it back on acquires a fresh track and swaps the sender.
    async fn toggle_video(&mut self) {
        if self.video_off {
            let tracks = match self.platform.acquire_media(false, true).await {
                Ok(tracks) => tracks,
                Err(err) => {
                    self.platform.warn(&format!("camera re-acquisition failed: {err}"));
                    self.set_error(Some(CAMERA_FAILED_MSG.to_string()));
                    return;
                }
            };
            if self.ending.is_set() {
                for track in &tracks {
                    track.stop();
                }
                return;
            }
            let Some(track) = tracks.into_iter().find(|t| t.kind() == TrackKind::Video) else {
                self.set_error(Some(CAMERA_FAILED_MSG.to_string()));
                return;
            };
            let swapped = match self.peer.as_ref() {
                Some(peer) => peer.swap_video_track(&track).await,
                None => Ok(()),
            };
            if let Err(err) = swapped {
                self.platform.warn(&format!("video track swap failed: {err}"));
                self.set_error(Some(CAMERA_FAILED_MSG.to_string()));
                track.stop();
                return;
            }
            self.local_tracks.retain(|t| t.kind() != TrackKind::Video);
            self.local_tracks.push(track);
            self.video_off = false;
        } else {
            for track in &self.local_tracks {
                if track.kind() == TrackKind::Video {
                    track.stop();
                }
            }
            self.local_tracks.retain(|t| t.kind() != TrackKind::Video);
            if let Some(peer) = self.peer.as_ref() {
                peer.drop_video_sender();
            }
            self.video_off = true;
        }
        self.emit(SessionUpdate::LocalMedia(self.local_tracks.clone()));
        self.emit(SessionUpdate::VideoOff(self.video_off));
    }

    /// Deterministic teardown, safe to invoke repeatedly. Every release
    /// step is best-effort; a failing step never aborts the rest.
    fn end(&mut self) {
        if self.phase == CallPhase::Ended {
            return;
        }
        self.ending.set();

        for track in self.local_tracks.drain(..) {
            track.stop();
        }
        for track in self.remote_tracks.drain(..) {
            track.stop();
        }
        if let Some(peer) = self.peer.take() {
            peer.shutdown();
        }
        if let Some(channel) = self.channel.take() {
            channel.shutdown();
        }

        self.muted = false;
        self.video_off = !self.wants_video;
        self.error = None;

        self.emit(SessionUpdate::LocalMedia(Vec::new()));
        self.emit(SessionUpdate::RemoteMedia(Vec::new()));
        self.emit(SessionUpdate::Error(None));
        self.set_phase(CallPhase::Ended);

        if let Some(done) = self.on_ended.take() {
            done();
        }
    }

    fn send_envelope(&self, envelope: &Envelope) {
        let Some(channel) = &self.channel else {
            return;
        };
        if let Err(err) = channel.send(envelope) {
            // Fire-and-forget signaling: an unsendable envelope is logged,
            // never fatal.
            self.platform
                .warn(&format!("failed to send {}: {err}", envelope.kind()));
        }
    }

    fn set_phase(&mut self, phase: CallPhase) {
        self.phase = phase;
        self.emit(SessionUpdate::Phase(phase));
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.error == error {
            return;
        }
        self.error = error.clone();
        self.emit(SessionUpdate::Error(error));
    }

    fn emit(&self, update: SessionUpdate<P::Track>) {
        if let Some(handler) = &self.on_update {
            handler(update);
        }
    }
}
