use std::env;
use std::net::SocketAddr;
use tracing::warn;

use tandem_core::utils::DEFAULT_SIGNALING_PORT;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
}

impl RelayConfig {
    /// Reads `SIGNALING_PORT` from the environment, falling back to the
    /// protocol default when unset or unparsable.
    pub fn from_env() -> Self {
        let port = match env::var("SIGNALING_PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("invalid SIGNALING_PORT {:?}, using {}", raw, DEFAULT_SIGNALING_PORT);
                DEFAULT_SIGNALING_PORT
            }),
            Err(_) => DEFAULT_SIGNALING_PORT,
        };
        Self { port }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SIGNALING_PORT,
        }
    }
}
