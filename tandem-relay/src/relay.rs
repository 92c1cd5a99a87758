use axum::extract::ws::{Message, Utf8Bytes};
use dashmap::DashMap;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tandem_core::ParticipantId;

/// Distinguishes the physical connection behind a routing entry, so a close
/// from a superseded connection cannot evict its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct RouteEntry {
    conn: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

/// Routing header of an inbound frame. `data` must be present but is never
/// inspected; the payload belongs to the peers.
#[derive(Deserialize)]
struct RoutedFrame {
    #[serde(rename = "type")]
    kind: FrameKind,
    target: ParticipantId,
    from: ParticipantId,
    #[allow(dead_code)]
    data: IgnoredAny,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum FrameKind {
    Offer,
    Answer,
    IceCandidate,
}

struct RelayInner {
    routes: DashMap<ParticipantId, RouteEntry>,
}

/// The relay hub: one routing table, no interpretation of payloads, no
/// delivery receipts. Envelopes for unknown targets are dropped silently.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                routes: DashMap::new(),
            }),
        }
    }

    /// Registers a participant's outbound channel. A later registration under
    /// the same identifier supersedes the earlier one; the displaced channel
    /// is not notified.
    pub fn register(
        &self,
        id: ParticipantId,
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<Message>,
    ) {
        info!("participant {} connected", id);
        self.inner.routes.insert(id, RouteEntry { conn, tx });
    }

    /// Removes the routing entry, unless the identifier has already been
    /// re-registered by a newer connection.
    pub fn unregister(&self, id: &ParticipantId, conn: ConnectionId) {
        let removed = self
            .inner
            .routes
            .remove_if(id, |_, entry| entry.conn == conn)
            .is_some();
        if removed {
            info!("participant {} disconnected", id);
        } else {
            debug!("stale disconnect for {} ignored", id);
        }
    }

    pub fn is_registered(&self, id: &ParticipantId) -> bool {
        self.inner.routes.contains_key(id)
    }

    /// Routes a raw envelope to the channel registered for its target,
    /// forwarding the original text verbatim. Malformed envelopes and
    /// unknown targets are dropped without a response to the sender.
    pub fn forward(&self, raw: &str) {
        let frame: RoutedFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("dropping malformed envelope: {}", err);
                return;
            }
        };

        let Some(entry) = self.inner.routes.get(&frame.target) else {
            debug!(
                "no route for {:?} envelope from {} to {}, dropping",
                frame.kind, frame.from, frame.target
            );
            return;
        };

        debug!(
            "relaying {:?} from {} to {}",
            frame.kind, frame.from, frame.target
        );
        if entry
            .tx
            .send(Message::Text(Utf8Bytes::from(raw.to_owned())))
            .is_err()
        {
            warn!("channel for {} is gone, envelope dropped", frame.target);
        }
    }
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}
