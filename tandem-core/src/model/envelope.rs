use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// A session description as the browser hands it over:
/// `{ "type": "offer" | "answer", "sdp": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

/// A trickled connectivity candidate, field names matching the browser's
/// `RTCIceCandidateInit` dictionary. Unknown extra fields are ignored on
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInit {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

/// The unit of signaling traffic, tagged by `type` on the wire:
///
/// ```json
/// { "type": "offer", "target": "bob", "from": "alice", "data": { ... } }
/// ```
///
/// Each variant carries its own payload kind, so a description can never be
/// applied as a candidate or vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    Offer {
        target: ParticipantId,
        from: ParticipantId,
        data: SessionDescription,
    },
    Answer {
        target: ParticipantId,
        from: ParticipantId,
        data: SessionDescription,
    },
    IceCandidate {
        target: ParticipantId,
        from: ParticipantId,
        data: CandidateInit,
    },
}

impl Envelope {
    /// Recipient the relay routes on.
    pub fn target(&self) -> &ParticipantId {
        match self {
            Envelope::Offer { target, .. }
            | Envelope::Answer { target, .. }
            | Envelope::IceCandidate { target, .. } => target,
        }
    }

    /// Identifier the sender claims.
    pub fn sender(&self) -> &ParticipantId {
        match self {
            Envelope::Offer { from, .. }
            | Envelope::Answer { from, .. }
            | Envelope::IceCandidate { from, .. } => from,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Offer { .. } => "offer",
            Envelope::Answer { .. } => "answer",
            Envelope::IceCandidate { .. } => "ice-candidate",
        }
    }
}
