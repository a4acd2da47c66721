pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod server;
pub mod translate;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
pub use logging::SharedLogger;
pub use relay::Relay;
pub use server::{build_router, AppState};
