//! TCP server for the studio command protocol.
//!
//! Each connection carries exactly one request: the server performs a
//! single read, answers with a framed response token and closes the
//! connection. Accepts are gated on a semaphore sized by
//! `max_connections`, so the default of 1 serves one client at a time.

use crate::config::Config;
use crate::error::RequestError;
use crate::protocol::{self, frame, Response};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace, warn};

/// Server instance
pub struct Server {
    config: Config,
    listener: TcpListener,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Bind the listener described by `config`.
    pub async fn bind(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let addr = config.listen_addr()?;
        let listener = TcpListener::from_std(create_listener(addr, config.backlog)?)?;
        let connection_limit = Arc::new(Semaphore::new(config.max_connections));

        Ok(Server {
            config,
            listener,
            connection_limit,
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process exits.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!(
            address = %self.local_addr()?,
            max_connections = self.config.max_connections,
            "Server listening"
        );

        loop {
            // Wait for a connection slot
            let permit = self.connection_limit.clone().acquire_owned().await?;

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(peer = %addr, "Connected");

                    let read_buffer_size = self.config.read_buffer_size;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, read_buffer_size).await {
                            debug!(peer = %addr, error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Serve the single request carried by a connection.
async fn handle_connection<S>(
    mut stream: S,
    read_buffer_size: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; read_buffer_size];

    // One read only; anything past the first chunk is ignored
    let n = stream.read(&mut buffer).await?;
    if n == 0 {
        trace!("Connection closed before sending data");
    }

    let response = handle_request(&buffer[..n]);
    stream.write_all(&frame::encode(response)).await?;
    stream.shutdown().await?;

    Ok(())
}

/// Map raw request bytes to a response, logging any rejection.
pub fn handle_request(data: &[u8]) -> Response {
    debug!(payload = ?String::from_utf8_lossy(data), len = data.len(), "Received request");

    match protocol::process(data) {
        Ok(response) => response,
        Err(e) => {
            log_rejection(&e, data);
            Response::Err
        }
    }
}

fn log_rejection(e: &RequestError, data: &[u8]) {
    match e {
        RequestError::Frame => {
            warn!(kind = e.kind(), payload = ?data, "Request did not contain frame marker")
        }
        RequestError::Decode(_) | RequestError::Parse(_) => {
            warn!(
                kind = e.kind(),
                error = %e,
                payload = ?String::from_utf8_lossy(data),
                "Request can't be parsed"
            )
        }
        RequestError::UnknownCommand(_) => {
            warn!(kind = e.kind(), error = %e, "Request rejected")
        }
    }
}

/// Create a TCP listener with SO_REUSEADDR and the configured backlog.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client;
    use crate::protocol::frame::MARKER;
    use crate::protocol::parser::encode_request;
    use std::time::Duration;
    use tokio::net::TcpStream;

    fn test_config() -> Config {
        Config {
            bind_port: 0,
            ..Config::default()
        }
    }

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut out = MARKER.to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn expected(token: &[u8]) -> Vec<u8> {
        framed(token)
    }

    async fn start_test_server(config: Config) -> SocketAddr {
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        addr
    }

    async fn send(addr: SocketAddr, data: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(data).await.unwrap();
        stream.shutdown().await.unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_handle_request_practice() {
        let response = handle_request(&framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/tmp/song.wav"));
        assert_eq!(response, Response::Aok);
        assert_eq!(&frame::encode(response)[..], &expected(b"RESPONSE_AOK")[..]);
    }

    #[test]
    fn test_handle_request_play_is_error() {
        let response = handle_request(&framed(b"<:COMMAND:>PLAY<:FILEPATH:>/tmp/song.wav"));
        assert_eq!(response, Response::Err);
    }

    #[test]
    fn test_handle_request_rejections() {
        assert_eq!(handle_request(b"garbage with no marker"), Response::Err);
        assert_eq!(handle_request(b""), Response::Err);
        assert_eq!(handle_request(&framed(b"\xff\xfe\xfd")), Response::Err);
        assert_eq!(handle_request(&framed(b"<:COMMAND:>PRACTICE")), Response::Err);
        assert_eq!(handle_request(&framed(b"<:FILEPATH:>/tmp/a.wav")), Response::Err);
        assert_eq!(
            handle_request(&framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>")),
            Response::Err
        );
    }

    #[test]
    fn test_practice_with_various_paths() {
        let paths = ["/tmp/song.wav", "a", "relative/dir/take 2.wav", "ü/ñ.wav"];
        for path in paths {
            let payload = encode_request("PRACTICE", path);
            assert_eq!(handle_request(&framed(payload.as_bytes())), Response::Aok);
        }
    }

    #[tokio::test]
    async fn test_practice_over_tcp() {
        let addr = start_test_server(test_config()).await;
        let response = send(addr, &framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/tmp/song.wav")).await;
        assert_eq!(response, expected(b"RESPONSE_AOK"));
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let addr = start_test_server(test_config()).await;

        let response = client::send_command(addr, "PRACTICE", "/tmp/song.wav").await;
        assert_eq!(response.unwrap(), Response::Aok);

        let response = client::send_command(addr, "PLAY", "/tmp/song.wav").await;
        assert_eq!(response.unwrap(), Response::Err);

        let response = client::send_raw(addr, b"").await;
        assert_eq!(response.unwrap(), Response::Err);
    }

    #[tokio::test]
    async fn test_errors_over_tcp() {
        let addr = start_test_server(test_config()).await;

        let response = send(addr, &framed(b"<:COMMAND:>PLAY<:FILEPATH:>/tmp/song.wav")).await;
        assert_eq!(response, expected(b"RESPONSE_ERR"));

        let response = send(addr, b"garbage with no marker").await;
        assert_eq!(response, expected(b"RESPONSE_ERR"));

        let response = send(addr, b"").await;
        assert_eq!(response, expected(b"RESPONSE_ERR"));
    }

    #[tokio::test]
    async fn test_connection_closed_after_one_exchange() {
        let addr = start_test_server(test_config()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/a.wav"))
            .await
            .unwrap();

        // Without shutting down our write half the server still answers and closes
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, expected(b"RESPONSE_AOK"));
    }

    #[tokio::test]
    async fn test_only_first_read_window_is_used() {
        let config = Config {
            read_buffer_size: 16,
            ..test_config()
        };
        let addr = start_test_server(config).await;

        // Marker plus eight payload bytes fit; the path tag never arrives
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/a.wav"))
            .await
            .unwrap();

        // The unread tail may make the server's close a reset, so read
        // exactly one framed response instead of waiting for EOF
        let mut response = [0u8; 20];
        stream.read_exact(&mut response).await.unwrap();
        assert_eq!(&response[..], &expected(b"RESPONSE_ERR")[..]);
    }

    #[tokio::test]
    async fn test_sequential_clients() {
        let addr = start_test_server(test_config()).await;

        for _ in 0..5 {
            let response = send(addr, &framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/a.wav")).await;
            assert_eq!(response, expected(b"RESPONSE_AOK"));
        }
    }

    #[tokio::test]
    async fn test_silent_client_blocks_sequential_server() {
        let addr = start_test_server(test_config()).await;

        // Holds the only slot without sending anything
        let idle = TcpStream::connect(addr).await.unwrap();

        let waiting = tokio::spawn(async move {
            send(addr, &framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/a.wav")).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiting.is_finished());

        // Disconnecting frees the slot and the queued client is served
        drop(idle);
        let response = waiting.await.unwrap();
        assert_eq!(response, expected(b"RESPONSE_AOK"));
    }

    #[tokio::test]
    async fn test_concurrent_clients() {
        let config = Config {
            max_connections: 4,
            ..test_config()
        };
        let addr = start_test_server(config).await;

        // An idle connection does not hold up the others
        let _idle = TcpStream::connect(addr).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..3 {
            handles.push(tokio::spawn(async move {
                let payload = encode_request("PRACTICE", &format!("/tmp/take{}.wav", i));
                send(addr, &framed(payload.as_bytes())).await
            }));
        }

        for handle in handles {
            let response = tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(response, expected(b"RESPONSE_AOK"));
        }
    }

    #[tokio::test]
    async fn test_two_servers_in_one_process() {
        let first = start_test_server(test_config()).await;
        let second = start_test_server(test_config()).await;
        assert_ne!(first.port(), second.port());

        let a = send(first, &framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/a.wav")).await;
        let b = send(second, &framed(b"<:COMMAND:>PLAY<:FILEPATH:>/a.wav")).await;
        assert_eq!(a, expected(b"RESPONSE_AOK"));
        assert_eq!(b, expected(b"RESPONSE_ERR"));
    }

    #[test]
    fn test_bind_rejects_invalid_config() {
        let config = Config {
            read_buffer_size: 0,
            ..test_config()
        };
        assert!(tokio_test::block_on(Server::bind(config)).is_err());
    }

    #[tokio::test]
    async fn test_handle_connection_single_exchange() {
        let stream = tokio_test::io::Builder::new()
            .read(&framed(b"<:COMMAND:>PRACTICE<:FILEPATH:>/tmp/song.wav"))
            .write(&expected(b"RESPONSE_AOK"))
            .build();

        handle_connection(stream, 1024).await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_connection_partial_frame() {
        // Only the command made it into the single read
        let stream = tokio_test::io::Builder::new()
            .read(&framed(b"<:COMMAND:>PRACTICE"))
            .write(&expected(b"RESPONSE_ERR"))
            .build();

        handle_connection(stream, 1024).await.unwrap();
    }
}
