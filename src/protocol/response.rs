//! Response tokens.

/// The only two payloads the server ever sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Request accepted.
    Aok,
    /// Request rejected for any reason.
    Err,
}

impl Response {
    /// Length in bytes of every response token.
    pub const TOKEN_LEN: usize = 12;

    /// Raw token bytes, without the frame marker.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Response::Aok => b"RESPONSE_AOK",
            Response::Err => b"RESPONSE_ERR",
        }
    }

    /// Parse a token as received by a client (marker already stripped).
    pub fn from_bytes(token: &[u8]) -> Option<Self> {
        match token {
            b"RESPONSE_AOK" => Some(Response::Aok),
            b"RESPONSE_ERR" => Some(Response::Err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lengths_match() {
        assert_eq!(Response::Aok.as_bytes().len(), Response::TOKEN_LEN);
        assert_eq!(Response::Err.as_bytes().len(), Response::TOKEN_LEN);
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(Response::from_bytes(b"RESPONSE_AOK"), Some(Response::Aok));
        assert_eq!(Response::from_bytes(b"RESPONSE_ERR"), Some(Response::Err));
        assert_eq!(Response::from_bytes(b"RESPONSE_OK"), None);
    }
}
