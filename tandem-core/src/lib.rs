pub mod model;
pub mod utils;

pub use model::{CandidateInit, Envelope, IceServerConfig, ParticipantId, SdpKind, SessionDescription};
