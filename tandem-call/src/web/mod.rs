mod media;
mod peer;
mod supervisor;
mod view;

pub use media::WebTrack;
pub use peer::WebPeer;
pub use supervisor::WebSignalChannel;
pub use view::{VideoCallView, VoiceCallView};

use async_trait::async_trait;
use wasm_bindgen::JsValue;

use tandem_core::{IceServerConfig, ParticipantId};

use crate::error::CallError;
use crate::event::{EndingFlag, EventSender};
use crate::logger::Logger;
use crate::platform::CallPlatform;

pub(crate) fn js_error_string(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Browser-backed platform: getUserMedia capture, RTCPeerConnection
/// transport, and a supervised WebSocket signaling channel.
pub struct WebPlatform {
    signaling_url: String,
}

impl WebPlatform {
    pub fn new(signaling_url: impl Into<String>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
        }
    }

    fn channel_url(&self, local: &ParticipantId) -> String {
        format!(
            "{}/?userId={}",
            self.signaling_url.trim_end_matches('/'),
            local
        )
    }
}

#[async_trait(?Send)]
impl CallPlatform for WebPlatform {
    type Track = WebTrack;
    type Peer = WebPeer;
    type Channel = WebSignalChannel;

    async fn acquire_media(&self, audio: bool, video: bool) -> Result<Vec<WebTrack>, CallError> {
        media::acquire(audio, video).await
    }

    async fn open_signaling(
        &self,
        local: &ParticipantId,
        events: EventSender<WebTrack>,
        ending: EndingFlag,
    ) -> Result<WebSignalChannel, CallError> {
        Ok(supervisor::connect(self.channel_url(local), events, ending))
    }

    fn create_peer(
        &self,
        ice_servers: &[IceServerConfig],
        events: EventSender<WebTrack>,
    ) -> Result<WebPeer, CallError> {
        WebPeer::new(ice_servers, events)
    }

    fn warn(&self, message: &str) {
        Logger::warn(message);
    }
}
