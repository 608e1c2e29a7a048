//! Framed TCP command server for the studio practice instrument.
//!
//! - `protocol`: frame marker, payload parser, command dispatch
//! - `server`: listener and per-connection request handling
//! - `client`: one-shot request helper
//! - `config`: CLI and TOML configuration

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use config::Config;
pub use error::RequestError;
pub use protocol::Response;
pub use server::Server;
