pub mod auth;
pub mod chain;
pub mod config;

pub use auth::{AuthResponse, ExternalDatabaseProvider, HashAlgorithm};
pub use chain::AuthenticationChain;
pub use config::Config;
