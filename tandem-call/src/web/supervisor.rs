use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use tandem_core::Envelope;

use crate::error::CallError;
use crate::event::{EndingFlag, EventSender, SessionEvent};
use crate::logger::Logger;
use crate::platform::SignalChannel;

use super::js_error_string;
use super::media::WebTrack;

/// Fixed delay before reopening a dropped signaling socket.
const RECONNECT_DELAY_MS: i32 = 3_000;

const OPEN_FAILED_MSG: &str = "Failed to connect to signaling server";
const SOCKET_ERROR_MSG: &str = "Connection error. Please try again.";

struct SupervisorState {
    url: String,
    events: EventSender<WebTrack>,
    ending: EndingFlag,
    socket: RefCell<Option<WebSocket>>,
    retry_timer: Cell<Option<i32>>,
}

/// Opens the signaling channel under supervision: an unexpected close
/// schedules one reopen attempt after a fixed delay, and the replacement
/// socket feeds the same session event queue. Nothing is scheduled once
/// the ending latch is set.
pub(crate) fn connect(
    url: String,
    events: EventSender<WebTrack>,
    ending: EndingFlag,
) -> WebSignalChannel {
    let state = Rc::new(SupervisorState {
        url,
        events,
        ending,
        socket: RefCell::new(None),
        retry_timer: Cell::new(None),
    });
    attach(&state);
    WebSignalChannel { state }
}

fn attach(state: &Rc<SupervisorState>) {
    if state.ending.is_set() {
        return;
    }

    let socket = match WebSocket::new(&state.url) {
        Ok(socket) => socket,
        Err(err) => {
            Logger::warn(&format!(
                "signaling socket open failed: {}",
                js_error_string(&err)
            ));
            let _ = state
                .events
                .unbounded_send(SessionEvent::SignalingLost(OPEN_FAILED_MSG.to_string()));
            schedule_retry(state);
            return;
        }
    };

    let onopen = {
        let events = state.events.clone();
        Closure::wrap(Box::new(move |_: JsValue| {
            Logger::info("signaling socket open");
            let _ = events.unbounded_send(SessionEvent::SignalingRestored);
        }) as Box<dyn FnMut(JsValue)>)
    };
    socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    onopen.forget();

    let onmessage = {
        let events = state.events.clone();
        Closure::wrap(Box::new(move |ev: MessageEvent| {
            let Some(text) = ev.data().as_string() else {
                return;
            };
            match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) => {
                    let _ = events.unbounded_send(SessionEvent::Inbound(envelope));
                }
                Err(err) => Logger::warn(&format!("discarding malformed envelope: {err}")),
            }
        }) as Box<dyn FnMut(MessageEvent)>)
    };
    socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    let onerror = {
        let events = state.events.clone();
        Closure::wrap(Box::new(move |_: JsValue| {
            Logger::warn("signaling socket error");
            let _ = events
                .unbounded_send(SessionEvent::SignalingLost(SOCKET_ERROR_MSG.to_string()));
        }) as Box<dyn FnMut(JsValue)>)
    };
    socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    let onclose = {
        let state = state.clone();
        Closure::wrap(Box::new(move |_: CloseEvent| {
            if state.ending.is_set() {
                return;
            }
            Logger::info("signaling socket closed, scheduling reconnect");
            schedule_retry(&state);
        }) as Box<dyn FnMut(CloseEvent)>)
    };
    socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();

    *state.socket.borrow_mut() = Some(socket);
}

/// At most one reconnect timer is pending at any time.
fn schedule_retry(state: &Rc<SupervisorState>) {
    if state.ending.is_set() || state.retry_timer.get().is_some() {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };

    let timer_state = state.clone();
    let callback = Closure::once(move || {
        timer_state.retry_timer.set(None);
        if timer_state.ending.is_set() {
            return;
        }
        if let Some(stale) = timer_state.socket.borrow_mut().take() {
            detach(&stale);
        }
        attach(&timer_state);
    });

    match window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        RECONNECT_DELAY_MS,
    ) {
        Ok(handle) => state.retry_timer.set(Some(handle)),
        Err(err) => Logger::warn(&format!(
            "failed to schedule reconnect: {}",
            js_error_string(&err)
        )),
    }
    callback.forget();
}

fn detach(socket: &WebSocket) {
    socket.set_onopen(None);
    socket.set_onmessage(None);
    socket.set_onerror(None);
    socket.set_onclose(None);
}

/// Session-facing handle. Survives supervisor reconnects: sends go through
/// whichever socket is currently attached.
pub struct WebSignalChannel {
    state: Rc<SupervisorState>,
}

impl SignalChannel for WebSignalChannel {
    fn send(&self, envelope: &Envelope) -> Result<(), CallError> {
        let socket_ref = self.state.socket.borrow();
        let Some(socket) = socket_ref.as_ref() else {
            return Err(CallError::Signaling(
                "signaling socket not connected".to_string(),
            ));
        };
        if socket.ready_state() != WebSocket::OPEN {
            return Err(CallError::Signaling("signaling socket not open".to_string()));
        }
        let json =
            serde_json::to_string(envelope).map_err(|err| CallError::Signaling(err.to_string()))?;
        socket
            .send_with_str(&json)
            .map_err(|err| CallError::Signaling(js_error_string(&err)))
    }

    fn shutdown(&self) {
        if let Some(handle) = self.state.retry_timer.take() {
            if let Some(window) = web_sys::window() {
                window.clear_timeout_with_handle(handle);
            }
        }
        if let Some(socket) = self.state.socket.borrow_mut().take() {
            // Handlers first, so closing cannot trigger the reconnect path.
            detach(&socket);
            if let Err(err) = socket.close() {
                Logger::warn(&format!(
                    "error closing signaling socket: {}",
                    js_error_string(&err)
                ));
            }
        }
    }
}
