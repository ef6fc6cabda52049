//! Network Surface (`spec.md` §4.9).
//!
//! One accept loop on `ws_bind_addr`. Each accepted socket carries either a
//! WebSocket upgrade, a static `GET /images/<name>`, or anything else, which
//! gets HTTP 400. The HTTP control plane runs on its own listener
//! (`http::serve`, `spec.md` §4.9's "separate port" topology) — this module
//! only ever speaks raw HTTP/1.1 enough to read one request line plus
//! headers and either upgrade or serve a file.

use std::path::Path;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use whiteboard_protocol::envelope::{Inbound, Outbound};
use whiteboard_store::paths::{content_type_for, is_safe_filename, StoreLayout};

use crate::codec::{accept_key, decode_frame, encode_text_frame, DecodeOutcome};
use crate::fanout::Fabric;
use crate::rate_limit::RateLimiter;
use crate::registry::RoomRegistry;
use crate::router;

const READ_CHUNK: usize = 4096;
const MAX_CONNECTION_ATTEMPTS_PER_SECOND: u32 = 50;

/// Runs the accept loop until the listener errors. Intended to be spawned
/// as one of the server's top-level tasks (see `main.rs`).
pub async fn serve(listener: TcpListener, registry: Arc<RoomRegistry>, layout: Arc<StoreLayout>) -> std::io::Result<()> {
    let limiter = Arc::new(RateLimiter::new(MAX_CONNECTION_ATTEMPTS_PER_SECOND));
    loop {
        let (socket, peer) = listener.accept().await?;
        if !limiter.check(peer.ip()).await {
            debug!(%peer, "connection attempt throttled");
            continue;
        }
        let registry = Arc::clone(&registry);
        let layout = Arc::clone(&layout);
        tokio::spawn(async move {
            if let Err(err) = handle_socket(socket, registry, layout).await {
                debug!(%peer, %err, "connection ended");
            }
        });
    }
}

#[instrument(skip(socket, registry, layout))]
async fn handle_socket(mut socket: TcpStream, registry: Arc<RoomRegistry>, layout: Arc<StoreLayout>) -> std::io::Result<()> {
    let request = match read_request_head(&mut socket).await? {
        Some(r) => r,
        None => return Ok(()),
    };

    if request.is_websocket_upgrade() {
        let Some(key) = request.header("sec-websocket-key") else {
            write_http_response(&mut socket, 400, "Bad Request", "text/plain", b"missing Sec-WebSocket-Key").await?;
            return Ok(());
        };
        complete_handshake(&mut socket, &key).await?;
        run_connection(socket, registry).await;
        return Ok(());
    }

    if let Some(filename) = request.images_path() {
        serve_image(&mut socket, &layout, filename).await?;
        return Ok(());
    }

    write_http_response(&mut socket, 400, "Bad Request", "text/plain", b"unsupported request").await?;
    Ok(())
}

struct RequestHead {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn is_websocket_upgrade(&self) -> bool {
        self.method == "GET"
            && self
                .header("upgrade")
                .map(|v| v.eq_ignore_ascii_case("websocket"))
                .unwrap_or(false)
    }

    /// `GET /images/<name>` -> `Some(name)`, respecting the `..`/`/`/`\`
    /// rejection uniformly with the upload write path (`spec.md` §4.8).
    fn images_path(&self) -> Option<String> {
        if self.method != "GET" {
            return None;
        }
        let name = self.path.strip_prefix("/images/")?;
        Some(name.to_string())
    }
}

/// Reads and parses the request line plus headers, terminated by a blank
/// line. Returns `None` if the peer closed before sending a full head.
async fn read_request_head(socket: &mut TcpStream) -> std::io::Result<Option<RequestHead>> {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        if let Some(pos) = find_header_terminator(&buf) {
            let head = &buf[..pos];
            return Ok(parse_request_head(head));
        }
        let mut chunk = [0u8; READ_CHUNK];
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > 16 * 1024 {
            return Ok(None);
        }
    }
}

fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_request_head(head: &[u8]) -> Option<RequestHead> {
    let text = std::str::from_utf8(head).ok()?;
    let mut lines = text.split("\r\n");
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Some(RequestHead { method, path, headers })
}

async fn complete_handshake(socket: &mut TcpStream, client_key: &str) -> std::io::Result<()> {
    let accept = accept_key(client_key);
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    );
    socket.write_all(response.as_bytes()).await
}

async fn write_http_response(socket: &mut TcpStream, status: u16, reason: &str, content_type: &str, body: &[u8]) -> std::io::Result<()> {
    let header = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\r\n",
        body.len()
    );
    socket.write_all(header.as_bytes()).await?;
    socket.write_all(body).await
}

async fn serve_image(socket: &mut TcpStream, layout: &StoreLayout, filename: String) -> std::io::Result<()> {
    if !is_safe_filename(&filename) {
        write_http_response(socket, 403, "Forbidden", "text/plain", b"rejected filename").await?;
        return Ok(());
    }
    let path = layout.image_path(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = content_type_for(Path::new(&filename));
            write_http_response(socket, 200, "OK", content_type, &bytes).await
        }
        Err(_) => write_http_response(socket, 404, "Not Found", "text/plain", b"not found").await,
    }
}

/// Runs the reader/writer pair for one upgraded connection until either
/// side closes (`spec.md` §4.2, §5).
async fn run_connection(socket: TcpStream, registry: Arc<RoomRegistry>) {
    let conn_id = Uuid::new_v4();
    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel::<Outbound>(registry.outbound_queue_capacity());
    registry.register_connection(conn_id, outbound_tx);
    info!(%conn_id, "connection opened");

    let (mut read_half, mut write_half) = socket.into_split();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let frame = encode_text_frame(&message.to_json());
            if write_half.write_all(&frame).await.is_err() {
                break;
            }
        }
    });

    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    'reader: loop {
        let outcome = decode_frame(&buf);
        match outcome {
            DecodeOutcome::Text { consumed, payload } => {
                buf.split_to(consumed);
                dispatch_frame(conn_id, &registry, &payload).await;
                continue;
            }
            DecodeOutcome::Ignored { consumed } => {
                buf.split_to(consumed);
                continue;
            }
            DecodeOutcome::Close { .. } | DecodeOutcome::Malformed => break 'reader,
            DecodeOutcome::Incomplete => {}
        }

        match read_half.read(&mut chunk).await {
            Ok(0) => break 'reader,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(_) => break 'reader,
        }
    }

    writer.abort();
    registry.remove_connection(conn_id).await;
    info!(%conn_id, "connection closed");
}

async fn dispatch_frame(conn_id: Uuid, registry: &RoomRegistry, payload: &str) {
    let fabric = Fabric::new(registry);
    match Inbound::parse(payload) {
        Ok(envelope) => {
            let outcome = router::handle(conn_id, registry, envelope).await;
            for action in outcome.actions {
                fabric.execute(action).await;
            }
            if outcome.refresh_room_lists {
                fabric.refresh_room_lists().await;
            }
        }
        Err(err) => {
            warn!(%conn_id, %err, "dropping unparseable frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_websocket_upgrade_request() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nSec-WebSocket-Key: abc\r\n\r\n";
        let head = parse_request_head(raw).unwrap();
        assert!(head.is_websocket_upgrade());
        assert_eq!(head.header("sec-websocket-key").as_deref(), Some("abc"));
    }

    #[test]
    fn extracts_the_images_path() {
        let raw = b"GET /images/foo.png HTTP/1.1\r\nHost: x\r\n\r\n";
        let head = parse_request_head(raw).unwrap();
        assert_eq!(head.images_path().as_deref(), Some("foo.png"));
    }

    #[test]
    fn rejects_traversal_in_images_path() {
        let raw = b"GET /images/../secret HTTP/1.1\r\nHost: x\r\n\r\n";
        let head = parse_request_head(raw).unwrap();
        let name = head.images_path().unwrap();
        assert!(!is_safe_filename(&name));
    }

    #[test]
    fn finds_header_terminator_across_chunks() {
        let buf = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"[..]);
        assert!(find_header_terminator(&buf).is_some());
    }
}
