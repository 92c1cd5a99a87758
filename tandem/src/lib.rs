pub use tandem_core::ParticipantId;

pub mod model {
    pub use tandem_core::model::*;
}

pub mod utils {
    pub use tandem_core::utils::*;
}

#[cfg(feature = "server")]
pub mod relay {
    pub use tandem_relay::*;
}

#[cfg(feature = "client")]
pub mod call {
    pub use tandem_call::*;
}
