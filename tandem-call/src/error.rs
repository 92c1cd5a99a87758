use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    /// Local media acquisition rejected by the user or the OS.
    #[error("media capture denied: {0}")]
    CaptureDenied(String),

    /// The signaling channel failed to open, send, or stay up.
    #[error("signaling unreachable: {0}")]
    Signaling(String),

    /// Applying or producing a description/candidate failed.
    #[error("negotiation failed: {0}")]
    Negotiation(String),
}

impl CallError {
    /// Inline alert copy for the call surface.
    pub fn user_message(&self) -> &'static str {
        match self {
            CallError::CaptureDenied(_) => "Failed to access camera and microphone",
            CallError::Signaling(_) => "Failed to connect to signaling server",
            CallError::Negotiation(_) => "Failed to establish connection",
        }
    }
}
