//! Command dispatch.

use tracing::info;

use crate::error::RequestError;
use crate::protocol::frame;
use crate::protocol::parser::{self, ParsedRequest};
use crate::protocol::response::Response;

/// Commands understood by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a practice session for the given recording.
    Practice,
    /// Play back a recording. Recognized, but has no handler yet.
    Play,
    /// Anything else.
    Unknown(String),
}

impl From<&str> for Command {
    fn from(value: &str) -> Self {
        match value {
            "PRACTICE" => Command::Practice,
            "PLAY" => Command::Play,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Decide the response for a parsed request.
///
/// `PLAY` falls through to the error path just like an unknown command.
pub fn dispatch(request: &ParsedRequest) -> Result<Response, RequestError> {
    match Command::from(request.command.as_str()) {
        Command::Practice => {
            info!(path = %request.path, "practice");
            Ok(Response::Aok)
        }
        Command::Play | Command::Unknown(_) => {
            Err(RequestError::UnknownCommand(request.command.clone()))
        }
    }
}

/// Run a raw inbound buffer through marker stripping, parsing and dispatch.
pub fn process(input: &[u8]) -> Result<Response, RequestError> {
    let payload = frame::strip_marker(input)?;
    let request = parser::parse(payload)?;
    dispatch(&request)
}
