mod config;
mod relay;
mod ws;

pub use config::RelayConfig;
pub use relay::{ConnectionId, RelayService};
pub use ws::{ConnectParams, router, ws_handler};
