//! Request handling errors.
//!
//! Every variant is reported to the client as the same framed
//! `RESPONSE_ERR` token. The variants only exist so the server can log
//! what went wrong and so tests can tell the failure modes apart.

use std::str::Utf8Error;

/// Reasons a single request can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The 8-byte frame marker was not found in the inbound buffer.
    Frame,
    /// The bytes after the marker are not valid UTF-8.
    Decode(Utf8Error),
    /// The payload text does not match the command/path template.
    Parse(String),
    /// The request was well formed but the command has no handler.
    UnknownCommand(String),
}

impl RequestError {
    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Frame => "frame",
            RequestError::Decode(_) => "decode",
            RequestError::Parse(_) => "parse",
            RequestError::UnknownCommand(_) => "unknown_command",
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Frame => write!(f, "Frame marker not found"),
            RequestError::Decode(e) => write!(f, "Payload is not valid UTF-8: {}", e),
            RequestError::Parse(msg) => write!(f, "Malformed request: {}", msg),
            RequestError::UnknownCommand(cmd) => write!(f, "Unknown command: {}", cmd),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Utf8Error> for RequestError {
    fn from(e: Utf8Error) -> Self {
        RequestError::Decode(e)
    }
}
