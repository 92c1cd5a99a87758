use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{MediaStream, MediaStreamConstraints, MediaStreamTrack};

use crate::error::CallError;
use crate::platform::{MediaTrack, TrackKind};

use super::js_error_string;

#[derive(Debug, Clone)]
pub struct WebTrack {
    inner: MediaStreamTrack,
}

impl WebTrack {
    pub(crate) fn new(inner: MediaStreamTrack) -> Self {
        Self { inner }
    }

    pub(crate) fn raw(&self) -> &MediaStreamTrack {
        &self.inner
    }
}

impl MediaTrack for WebTrack {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn kind(&self) -> TrackKind {
        if self.inner.kind() == "video" {
            TrackKind::Video
        } else {
            TrackKind::Audio
        }
    }

    fn enabled(&self) -> bool {
        self.inner.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner.set_enabled(enabled);
    }

    fn stop(&self) {
        self.inner.stop();
    }
}

/// Requests capture hardware from the browser. A rejection (user denial,
/// missing device) surfaces as `CaptureDenied`.
pub(crate) async fn acquire(audio: bool, video: bool) -> Result<Vec<WebTrack>, CallError> {
    let window =
        web_sys::window().ok_or_else(|| CallError::CaptureDenied("no window object".to_string()))?;
    let devices = window
        .navigator()
        .media_devices()
        .map_err(|err| CallError::CaptureDenied(js_error_string(&err)))?;

    let constraints = MediaStreamConstraints::new();
    constraints.set_audio(&JsValue::from_bool(audio));
    constraints.set_video(&JsValue::from_bool(video));

    let promise = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|err| CallError::CaptureDenied(js_error_string(&err)))?;
    let stream = JsFuture::from(promise)
        .await
        .map_err(|err| CallError::CaptureDenied(js_error_string(&err)))?;
    let stream: MediaStream = stream.unchecked_into();

    Ok(stream
        .get_tracks()
        .iter()
        .filter_map(|track| track.dyn_into::<MediaStreamTrack>().ok())
        .map(WebTrack::new)
        .collect())
}
