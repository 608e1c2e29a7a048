//! Studio command protocol.
//!
//! A single request/response exchange per TCP connection:
//!
//! ```text
//! Request:  <marker><:COMMAND:>PRACTICE<:FILEPATH:>/tmp/song.wav
//! Response: <marker>RESPONSE_AOK
//!
//! Request:  <marker><:COMMAND:>PLAY<:FILEPATH:>/tmp/song.wav
//! Response: <marker>RESPONSE_ERR
//! ```
//!
//! `<marker>` is the fixed byte sequence `00 00 00 00 44 00 00 00`.
//! Neither direction carries a length prefix; both response tokens are
//! twelve bytes so a framed response is always twenty bytes long.
//!
//! ## Modules
//!
//! - `frame`: marker search on the way in, marker prefix on the way out
//! - `parser`: UTF-8 decoding and command/path extraction
//! - `handler`: command dispatch
//! - `response`: the two response tokens

pub mod frame;
pub mod handler;
pub mod parser;
pub mod response;

pub use handler::process;
pub use response::Response;
