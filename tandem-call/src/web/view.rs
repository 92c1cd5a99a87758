use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlAudioElement, HtmlMediaElement, HtmlVideoElement, MediaStream};

use tandem_core::utils::default_ice_servers;
use tandem_core::{IceServerConfig, ParticipantId};

use crate::event::SessionUpdate;
use crate::session::{PeerSession, SessionConfig, SessionHandle};
use crate::state::{CallPhase, CallRole};

use super::WebPlatform;
use super::media::WebTrack;

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewState {
    phase: &'static str,
    muted: bool,
    video_off: bool,
    error: Option<String>,
}

fn phase_label(phase: CallPhase) -> &'static str {
    match phase {
        CallPhase::Idle | CallPhase::AcquiringMedia | CallPhase::Negotiating => "connecting",
        CallPhase::Connected => "connected",
        CallPhase::Ended => "ended",
    }
}

/// Reflects session updates into rendering surfaces and a host-page
/// callback. Owns no negotiation logic.
struct ViewBinding {
    state: RefCell<ViewState>,
    on_state: js_sys::Function,
    local_sink: Option<HtmlMediaElement>,
    remote_sink: HtmlMediaElement,
}

impl ViewBinding {
    fn new(
        local_sink: Option<HtmlMediaElement>,
        remote_sink: HtmlMediaElement,
        on_state: js_sys::Function,
        video_off: bool,
    ) -> Self {
        Self {
            state: RefCell::new(ViewState {
                phase: "connecting",
                muted: false,
                video_off,
                error: None,
            }),
            on_state,
            local_sink,
            remote_sink,
        }
    }

    fn apply(&self, update: SessionUpdate<WebTrack>) {
        match update {
            SessionUpdate::Phase(phase) => {
                self.state.borrow_mut().phase = phase_label(phase);
                if phase == CallPhase::Ended {
                    if let Some(sink) = &self.local_sink {
                        sink.set_src_object(None);
                    }
                    self.remote_sink.set_src_object(None);
                }
                self.push();
            }
            SessionUpdate::LocalMedia(tracks) => {
                if let Some(sink) = &self.local_sink {
                    sink.set_src_object(stream_of(&tracks).as_ref());
                }
            }
            SessionUpdate::RemoteMedia(tracks) => {
                let stream = stream_of(&tracks);
                self.remote_sink.set_src_object(stream.as_ref());
                if stream.is_some() {
                    let _ = self.remote_sink.play();
                }
            }
            SessionUpdate::Muted(muted) => {
                self.state.borrow_mut().muted = muted;
                self.push();
            }
            SessionUpdate::VideoOff(video_off) => {
                self.state.borrow_mut().video_off = video_off;
                self.push();
            }
            SessionUpdate::Error(error) => {
                self.state.borrow_mut().error = error;
                self.push();
            }
        }
    }

    fn push(&self) {
        let state = self.state.borrow().clone();
        if let Ok(value) = serde_wasm_bindgen::to_value(&state) {
            let _ = self.on_state.call1(&JsValue::NULL, &value);
        }
    }
}

fn stream_of(tracks: &[WebTrack]) -> Option<MediaStream> {
    if tracks.is_empty() {
        return None;
    }
    let array = js_sys::Array::new();
    for track in tracks {
        array.push(track.raw());
    }
    MediaStream::new_with_tracks(&array).ok()
}

fn parse_ice_servers(value: JsValue) -> Result<Vec<IceServerConfig>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(default_ice_servers());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn spawn_session(
    signaling_url: String,
    config: SessionConfig,
    binding: ViewBinding,
    on_ended: js_sys::Function,
) -> SessionHandle<WebTrack> {
    let mut session = PeerSession::new(WebPlatform::new(signaling_url), config);
    let binding = Rc::new(binding);
    session.set_update_handler(move |update| binding.apply(update));
    session.set_ended_handler(move || {
        let _ = on_ended.call0(&JsValue::NULL);
    });
    let handle = session.handle();
    end_on_pagehide(handle.clone());
    wasm_bindgen_futures::spawn_local(session.run());
    handle
}

/// Releases hardware when the page goes away mid-call.
fn end_on_pagehide(handle: SessionHandle<WebTrack>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::wrap(Box::new(move |_: web_sys::Event| {
        handle.end();
    }) as Box<dyn FnMut(web_sys::Event)>);
    let _ = window.add_event_listener_with_callback("pagehide", callback.as_ref().unchecked_ref());
    callback.forget();
}

/// Audio+video call surface: local preview, remote video sink, and mute /
/// camera / end-call intents.
#[wasm_bindgen]
pub struct VideoCallView {
    handle: SessionHandle<WebTrack>,
}

#[wasm_bindgen]
impl VideoCallView {
    /// `on_state` receives `{ phase, muted, videoOff, error }` after every
    /// change; `on_ended` fires once teardown has finished. `ice_servers`
    /// may be undefined to use the STUN defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        signaling_url: String,
        local_id: String,
        remote_id: String,
        initiator: bool,
        local_video: HtmlVideoElement,
        remote_video: HtmlVideoElement,
        on_state: js_sys::Function,
        on_ended: js_sys::Function,
        ice_servers: JsValue,
    ) -> Result<VideoCallView, JsValue> {
        let config = SessionConfig {
            local_id: ParticipantId::from(local_id),
            remote_id: ParticipantId::from(remote_id),
            role: if initiator {
                CallRole::Initiator
            } else {
                CallRole::Responder
            },
            wants_video: true,
            ice_servers: parse_ice_servers(ice_servers)?,
        };
        let binding = ViewBinding::new(
            Some(local_video.into()),
            remote_video.into(),
            on_state,
            false,
        );
        let handle = spawn_session(signaling_url, config, binding, on_ended);
        Ok(Self { handle })
    }

    pub fn toggle_mute(&self) {
        self.handle.toggle_mute();
    }

    pub fn toggle_video(&self) {
        self.handle.toggle_video();
    }

    pub fn end_call(&self) {
        self.handle.end();
    }
}

impl Drop for VideoCallView {
    fn drop(&mut self) {
        self.handle.end();
    }
}

/// Audio-only call surface: a hidden audio sink for the remote stream, no
/// local preview, no camera control.
#[wasm_bindgen]
pub struct VoiceCallView {
    handle: SessionHandle<WebTrack>,
}

#[wasm_bindgen]
impl VoiceCallView {
    #[wasm_bindgen(constructor)]
    pub fn new(
        signaling_url: String,
        local_id: String,
        remote_id: String,
        initiator: bool,
        remote_audio: HtmlAudioElement,
        on_state: js_sys::Function,
        on_ended: js_sys::Function,
        ice_servers: JsValue,
    ) -> Result<VoiceCallView, JsValue> {
        let config = SessionConfig {
            local_id: ParticipantId::from(local_id),
            remote_id: ParticipantId::from(remote_id),
            role: if initiator {
                CallRole::Initiator
            } else {
                CallRole::Responder
            },
            wants_video: false,
            ice_servers: parse_ice_servers(ice_servers)?,
        };
        let binding = ViewBinding::new(None, remote_audio.into(), on_state, true);
        let handle = spawn_session(signaling_url, config, binding, on_ended);
        Ok(Self { handle })
    }

    pub fn toggle_mute(&self) {
        self.handle.toggle_mute();
    }

    pub fn end_call(&self) {
        self.handle.end();
    }
}

impl Drop for VoiceCallView {
    fn drop(&mut self) {
        self.handle.end();
    }
}
