//! Minimal client for the command protocol.
//!
//! Sends one framed request per connection and waits for the server to
//! answer and close, which is how the instrument talks to the server.

use crate::error::RequestError;
use crate::protocol::frame::{self, MARKER};
use crate::protocol::parser::encode_request;
use crate::protocol::Response;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Errors seen by a client.
#[derive(Debug)]
pub enum ClientError {
    Io(std::io::Error),
    /// The reply did not carry the frame marker.
    Frame(RequestError),
    /// The reply was framed but was not one of the two tokens.
    UnexpectedResponse(Vec<u8>),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "I/O error: {}", e),
            ClientError::Frame(e) => write!(f, "Bad reply: {}", e),
            ClientError::UnexpectedResponse(bytes) => {
                write!(f, "Unexpected reply: {:?}", String::from_utf8_lossy(bytes))
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(e)
    }
}

/// Send `command` for `path` and return the server's verdict.
pub async fn send_command(
    addr: SocketAddr,
    command: &str,
    path: &str,
) -> Result<Response, ClientError> {
    let payload = encode_request(command, path);
    send_raw(addr, &frame::wrap(payload.as_bytes())).await
}

/// Send arbitrary bytes as a request and decode the reply.
pub async fn send_raw(addr: SocketAddr, data: &[u8]) -> Result<Response, ClientError> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(data).await?;
    stream.shutdown().await?;

    let mut reply = Vec::with_capacity(MARKER.len() + Response::TOKEN_LEN);
    stream.read_to_end(&mut reply).await?;

    let token = frame::strip_marker(&reply).map_err(ClientError::Frame)?;
    Response::from_bytes(token).ok_or_else(|| ClientError::UnexpectedResponse(token.to_vec()))
}
