//! Relay connection: TCP connect plus the HTTP/1.1 upgrade handshake.
//!
//! Once [`handshake`] returns, the stream carries raw frames in both
//! directions and the rest of the client treats it as an opaque byte channel.
//!
//! # The upgrade request (for beginners)
//!
//! The relay speaks WebSocket.  A WebSocket connection starts life as an
//! ordinary HTTP request that asks the server to "upgrade" the socket:
//!
//! ```text
//! GET /chat?repeater=Example HTTP/1.1
//! Host: vail.woozle.org
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Key: <16 random bytes, base64>
//! Sec-WebSocket-Protocol: binary.vail.woozle.org
//! Sec-WebSocket-Version: 13
//! ```
//!
//! The server answers `HTTP/1.1 101 Switching Protocols` and proves it
//! understood the request by hashing our key into `Sec-WebSocket-Accept`.
//! Any other status means the relay refused us.
//!
//! Transport security is not handled here; a TLS-terminating proxy or link
//! layer in front of the client provides it when needed.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tracing::{debug, info, warn};

use crate::infrastructure::storage::config::RelayConfig;

const USER_AGENT: &str = concat!("vail-client/", env!("CARGO_PKG_VERSION"));

/// Response header section larger than this is refused.
const MAX_RESPONSE_HEADER_BYTES: usize = 16 * 1024;

/// Errors establishing the relay session.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// TCP connection to the relay failed.
    #[error("failed to connect to relay at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("handshake I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The relay closed the socket before finishing its response.
    #[error("relay closed the connection during the handshake")]
    Closed,
    /// The status line was not `101`.
    #[error("relay refused the upgrade: {0}")]
    Rejected(String),
    #[error("Sec-WebSocket-Accept mismatch: expected {expected}, got {got}")]
    BadAccept { expected: String, got: String },
    #[error("handshake response headers exceed {0} bytes")]
    HeadersTooLarge(usize),
}

/// Address and channel of one relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    pub host: String,
    pub port: u16,
    /// Request path including the channel query.
    pub path: String,
    pub subprotocol: String,
}

impl RelayEndpoint {
    pub fn from_config(relay: &RelayConfig) -> Self {
        Self {
            host: relay.host.clone(),
            port: relay.port,
            path: relay.path(),
            subprotocol: relay.subprotocol.clone(),
        }
    }

    /// `host:port` for the TCP connect.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Renders the upgrade request for `endpoint` with handshake key `key`.
pub fn build_upgrade_request(endpoint: &RelayEndpoint, key: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Protocol: {proto}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         User-Agent: {agent}\r\n\
         Origin: https://{host}\r\n\r\n",
        path = endpoint.path,
        host = endpoint.host,
        proto = endpoint.subprotocol,
        agent = USER_AGENT,
    )
}

/// Connects to `endpoint` over TCP and performs the upgrade handshake.
///
/// # Errors
///
/// [`HandshakeError::ConnectFailed`] if the TCP connect fails, otherwise any
/// error from [`handshake`].
pub async fn connect(endpoint: &RelayEndpoint) -> Result<BufReader<TcpStream>, HandshakeError> {
    let addr = endpoint.socket_addr();
    info!(%addr, path = %endpoint.path, "connecting to relay");
    let stream = TcpStream::connect(addr.as_str())
        .await
        .map_err(|source| HandshakeError::ConnectFailed {
            addr: addr.clone(),
            source,
        })?;
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "could not disable Nagle");
    }
    handshake(stream, endpoint).await
}

/// Performs the upgrade handshake on an already connected `stream`.
///
/// Returns the stream wrapped in the `BufReader` used to read the response,
/// so that any frame bytes the relay sent right after its headers are not
/// lost.  `BufReader` passes writes straight through.
///
/// # Errors
///
/// - [`HandshakeError::Rejected`] if the status is not `101`.
/// - [`HandshakeError::BadAccept`] if the relay's accept hash is wrong.
/// - [`HandshakeError::Closed`] / [`HandshakeError::Io`] on stream failure.
pub async fn handshake<S>(stream: S, endpoint: &RelayEndpoint) -> Result<BufReader<S>, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let key = generate_key();
    let mut stream = BufReader::new(stream);
    stream
        .write_all(build_upgrade_request(endpoint, &key).as_bytes())
        .await?;
    stream.flush().await?;

    let status = read_header_line(&mut stream, &mut 0).await?;
    debug!(%status, "handshake status");
    if status.split_whitespace().nth(1) != Some("101") {
        return Err(HandshakeError::Rejected(status));
    }

    let mut header_bytes = status.len();
    let mut accept = None;
    let mut protocol = None;
    loop {
        let line = read_header_line(&mut stream, &mut header_bytes).await?;
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim().to_string();
            if name.eq_ignore_ascii_case("sec-websocket-accept") {
                accept = Some(value);
            } else if name.eq_ignore_ascii_case("sec-websocket-protocol") {
                protocol = Some(value);
            }
        }
    }

    let expected = derive_accept_key(key.as_bytes());
    match accept {
        Some(got) if got != expected => return Err(HandshakeError::BadAccept { expected, got }),
        Some(_) => {}
        None => warn!("relay sent no Sec-WebSocket-Accept"),
    }
    if protocol.as_deref() != Some(endpoint.subprotocol.as_str()) {
        warn!(?protocol, wanted = %endpoint.subprotocol, "relay did not confirm subprotocol");
    }

    info!(path = %endpoint.path, "relay session established");
    Ok(stream)
}

/// Reads one CRLF-terminated header line, without the terminator.
async fn read_header_line<S>(stream: &mut BufReader<S>, total: &mut usize) -> Result<String, HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let mut line = String::new();
    let n = stream.read_line(&mut line).await?;
    if n == 0 {
        return Err(HandshakeError::Closed);
    }
    *total += n;
    if *total > MAX_RESPONSE_HEADER_BYTES {
        return Err(HandshakeError::HeadersTooLarge(MAX_RESPONSE_HEADER_BYTES));
    }
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
