use async_trait::async_trait;
use js_sys::Reflect;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    MediaStream, RtcConfiguration, RtcIceCandidateInit, RtcIceServer, RtcPeerConnection,
    RtcPeerConnectionIceEvent, RtcRtpSender, RtcSdpType, RtcSessionDescriptionInit, RtcTrackEvent,
};

use tandem_core::{CandidateInit, IceServerConfig, SdpKind, SessionDescription};

use crate::error::CallError;
use crate::event::{EventSender, SessionEvent};
use crate::platform::PeerTransport;

use super::js_error_string;
use super::media::WebTrack;

fn negotiation_error(err: JsValue) -> CallError {
    CallError::Negotiation(js_error_string(&err))
}

/// RTCPeerConnection wrapper. Connection callbacks only push events into
/// the session queue; no session state lives here.
pub struct WebPeer {
    pc: RtcPeerConnection,
    outbound: MediaStream,
}

impl WebPeer {
    pub(crate) fn new(
        ice_servers: &[IceServerConfig],
        events: EventSender<WebTrack>,
    ) -> Result<Self, CallError> {
        let rtc_config = RtcConfiguration::new();
        let servers = js_sys::Array::new();
        for server in ice_servers {
            let entry = RtcIceServer::new();
            let urls = js_sys::Array::new();
            for url in &server.urls {
                urls.push(&JsValue::from_str(url));
            }
            entry.set_urls(&urls);
            if let Some(username) = &server.username {
                entry.set_username(username);
            }
            if let Some(credential) = &server.credential {
                entry.set_credential(credential);
            }
            servers.push(&entry);
        }
        rtc_config.set_ice_servers(&servers);

        let pc = RtcPeerConnection::new_with_configuration(&rtc_config)
            .map_err(negotiation_error)?;

        let onice = {
            let events = events.clone();
            Closure::wrap(Box::new(move |ev: RtcPeerConnectionIceEvent| {
                if let Some(candidate) = ev.candidate() {
                    let init = CandidateInit {
                        candidate: candidate.candidate(),
                        sdp_mid: candidate.sdp_mid(),
                        sdp_m_line_index: candidate.sdp_m_line_index(),
                    };
                    let _ = events.unbounded_send(SessionEvent::LocalCandidate(init));
                }
            }) as Box<dyn FnMut(RtcPeerConnectionIceEvent)>)
        };
        pc.set_onicecandidate(Some(onice.as_ref().unchecked_ref()));
        onice.forget();

        let ontrack = Closure::wrap(Box::new(move |ev: RtcTrackEvent| {
            let _ = events.unbounded_send(SessionEvent::RemoteTrack(WebTrack::new(ev.track())));
        }) as Box<dyn FnMut(RtcTrackEvent)>);
        pc.set_ontrack(Some(ontrack.as_ref().unchecked_ref()));
        ontrack.forget();

        let outbound = MediaStream::new().map_err(negotiation_error)?;

        Ok(Self { pc, outbound })
    }

    fn video_sender(&self) -> Option<RtcRtpSender> {
        self.pc
            .get_senders()
            .iter()
            .filter_map(|sender| sender.dyn_into::<RtcRtpSender>().ok())
            .find(|sender| sender.track().is_some_and(|track| track.kind() == "video"))
    }

    /// Awaits the create promise, installs the local description, and
    /// returns the wire form.
    async fn local_description(
        &self,
        kind: SdpKind,
        promise: js_sys::Promise,
    ) -> Result<SessionDescription, CallError> {
        let created = JsFuture::from(promise).await.map_err(negotiation_error)?;
        let sdp = Reflect::get(&created, &JsValue::from_str("sdp"))
            .ok()
            .and_then(|value| value.as_string())
            .ok_or_else(|| CallError::Negotiation("description without sdp".to_string()))?;

        let init = RtcSessionDescriptionInit::new(match kind {
            SdpKind::Offer => RtcSdpType::Offer,
            SdpKind::Answer => RtcSdpType::Answer,
        });
        init.set_sdp(&sdp);
        JsFuture::from(self.pc.set_local_description(&init))
            .await
            .map_err(negotiation_error)?;

        Ok(SessionDescription { kind, sdp })
    }
}

#[async_trait(?Send)]
impl PeerTransport for WebPeer {
    type Track = WebTrack;

    fn add_track(&self, track: &WebTrack) -> Result<(), CallError> {
        self.outbound.add_track(track.raw());
        let _ = self
            .pc
            .add_track(track.raw(), &self.outbound, &js_sys::Array::new());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, CallError> {
        self.local_description(SdpKind::Offer, self.pc.create_offer())
            .await
    }

    async fn create_answer(&self) -> Result<SessionDescription, CallError> {
        self.local_description(SdpKind::Answer, self.pc.create_answer())
            .await
    }

    async fn accept_remote(&self, description: &SessionDescription) -> Result<(), CallError> {
        let init = RtcSessionDescriptionInit::new(match description.kind {
            SdpKind::Offer => RtcSdpType::Offer,
            SdpKind::Answer => RtcSdpType::Answer,
        });
        init.set_sdp(&description.sdp);
        JsFuture::from(self.pc.set_remote_description(&init))
            .await
            .map_err(negotiation_error)?;
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &CandidateInit) -> Result<(), CallError> {
        let init = RtcIceCandidateInit::new(&candidate.candidate);
        if let Some(mid) = &candidate.sdp_mid {
            init.set_sdp_mid(Some(mid));
        }
        if let Some(index) = candidate.sdp_m_line_index {
            init.set_sdp_m_line_index(Some(index));
        }
        JsFuture::from(
            self.pc
                .add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init)),
        )
        .await
        .map_err(negotiation_error)?;
        Ok(())
    }

    async fn swap_video_track(&self, track: &WebTrack) -> Result<(), CallError> {
        match self.video_sender() {
            Some(sender) => {
                JsFuture::from(sender.replace_track(Some(track.raw())))
                    .await
                    .map_err(negotiation_error)?;
            }
            None => {
                let _ = self
                    .pc
                    .add_track(track.raw(), &self.outbound, &js_sys::Array::new());
            }
        }
        Ok(())
    }

    fn drop_video_sender(&self) {
        if let Some(sender) = self.video_sender() {
            if let Some(track) = sender.track() {
                track.stop();
            }
            let _ = self.pc.remove_track(&sender);
        }
    }

    fn shutdown(&self) {
        for sender in self.pc.get_senders().iter() {
            let Ok(sender) = sender.dyn_into::<RtcRtpSender>() else {
                continue;
            };
            if let Some(track) = sender.track() {
                track.stop();
            }
            let _ = self.pc.remove_track(&sender);
        }
        self.pc.close();
    }
}
