// proxy module - QubeTalk relay service

pub mod config;
pub mod endpoint;
pub mod handle_cache;
pub mod handle_resolver;
pub mod identity;
pub mod persona_store;
pub mod relay;
pub mod server;
pub mod stats;

pub mod handlers; // API endpoint handlers
pub mod mappers; // Request composition
pub mod middleware; // Axum middleware
pub mod upstream; // Upstream client

pub use config::{ProxyConfig, RelayConfig, StoreConfig};
pub use relay::QubeTalkRelay;
pub use server::{AppState, AxumServer};
