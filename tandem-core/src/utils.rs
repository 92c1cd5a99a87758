use crate::model::IceServerConfig;

pub const DEFAULT_SIGNALING_PORT: u16 = 8080;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// STUN-only default configuration; TURN fallback is out of scope.
pub fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![IceServerConfig {
        urls: vec![DEFAULT_STUN_ADDR.to_string(), DEFAULT_STUN_ADDR_2.to_string()],
        username: None,
        credential: None,
    }]
}
