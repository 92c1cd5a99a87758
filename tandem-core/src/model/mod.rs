mod envelope;
mod ice;
mod participant;

pub use envelope::{CandidateInit, Envelope, SdpKind, SessionDescription};
pub use ice::IceServerConfig;
pub use participant::ParticipantId;
