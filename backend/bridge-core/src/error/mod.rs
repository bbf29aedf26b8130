pub mod codec;
pub mod config;
pub mod connection;

pub use codec::CodecError;
pub use config::ConfigError;
pub use connection::ConnectionError;
