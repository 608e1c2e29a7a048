//! Request payload parser.
//!
//! The payload is UTF-8 text of the form
//! `<:COMMAND:>{command}<:FILEPATH:>{path}`.
//!
//! Matching rules:
//! - the payload must begin with the command tag
//! - the command value ends at the first path tag after it
//! - the path value is everything after that path tag
//! - both values must be non-empty
//! - tags are matched case-sensitively, so `<:command:>` is rejected
//!
//! There is no escaping. A path that itself contains `<:FILEPATH:>` is
//! taken verbatim because only the first path tag splits the payload,
//! while a command containing the path tag is cut short at it. Values
//! containing either tag are not supported.

use crate::error::RequestError;

/// Tag that introduces the command value.
pub const COMMAND_TAG: &str = "<:COMMAND:>";

/// Tag that introduces the path value.
pub const PATH_TAG: &str = "<:FILEPATH:>";

/// A request with both required fields present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub command: String,
    pub path: String,
}

/// Decode and parse the bytes that followed the frame marker.
pub fn parse(payload: &[u8]) -> Result<ParsedRequest, RequestError> {
    let text = std::str::from_utf8(payload)?;
    parse_text(text)
}

/// Parse an already decoded payload.
pub fn parse_text(text: &str) -> Result<ParsedRequest, RequestError> {
    let rest = text.strip_prefix(COMMAND_TAG).ok_or_else(|| {
        RequestError::Parse(format!("payload does not start with {}", COMMAND_TAG))
    })?;

    let (command, path) = rest
        .split_once(PATH_TAG)
        .ok_or_else(|| RequestError::Parse(format!("missing {}", PATH_TAG)))?;

    if command.is_empty() {
        return Err(RequestError::Parse("empty command".to_string()));
    }
    if path.is_empty() {
        return Err(RequestError::Parse("empty path".to_string()));
    }

    Ok(ParsedRequest {
        command: command.to_string(),
        path: path.to_string(),
    })
}

/// Build the payload text for a command and path.
pub fn encode_request(command: &str, path: &str) -> String {
    let mut out =
        String::with_capacity(COMMAND_TAG.len() + command.len() + PATH_TAG.len() + path.len());
    out.push_str(COMMAND_TAG);
    out.push_str(command);
    out.push_str(PATH_TAG);
    out.push_str(path);
    out
}
