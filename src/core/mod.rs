pub mod config;
pub mod errors;
pub mod network;

pub use config::SignerConfig;
pub use errors::SignerError;
pub use network::NetworkId;
