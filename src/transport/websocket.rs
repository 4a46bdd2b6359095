//! WebSocket transport
//!
//! Accepts TCP/WebSocket connections and turns each text frame into one
//! dispatcher call. Responsibilities:
//! - Resolve the tenant once, from the handshake path `/v1.0/{tenant_id}`;
//!   any other path is refused during the handshake
//! - Decode requests, run them and write back exactly one reply per request
//!
//! Authentication is expected to happen in front of this server; the tenant in
//! the path is trusted as already resolved.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Dispatcher;
use crate::transport::handler::handle_text;

pub const PATH_PREFIX: &str = "/v1.0/";

/// Extract the tenant id from a handshake path such as `/v1.0/acme`.
///
/// One trailing slash is tolerated. Tenant ids are taken verbatim, never
/// percent-decoded, and may only contain ASCII letters, digits, `-`, `_`
/// and `.`; anything else is refused.
pub fn tenant_from_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix(PATH_PREFIX)?;
    let tenant = rest.strip_suffix('/').unwrap_or(rest);
    let valid = !tenant.is_empty()
        && tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then(|| tenant.to_string())
}

pub async fn start_websocket_server(
    addr: String,
    dispatcher: Arc<Dispatcher>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;

    info!("WebSocket gateway listening on ws://{addr}{PATH_PREFIX}{{tenant_id}}");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(handle_connection(stream, peer, Arc::clone(&dispatcher)));
            }
            Err(e) => warn!("Failed to accept connection: {e}"),
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, dispatcher: Arc<Dispatcher>) {
    let mut tenant = None;
    let resolve_tenant = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        match tenant_from_path(req.uri().path()) {
            Some(t) => {
                tenant = Some(t);
                Ok(resp)
            }
            None => Err(reject(
                StatusCode::BAD_REQUEST,
                "expected path /v1.0/{tenant_id}",
            )),
        }
    };

    let ws_stream = match accept_hdr_async(stream, resolve_tenant).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, "WebSocket handshake error: {e}");
            return;
        }
    };
    let Some(tenant) = tenant else {
        return;
    };

    info!(%peer, tenant = %tenant, "connection opened");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%peer, tenant = %tenant, "read error: {e}");
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }

        let reply = match msg.to_text() {
            Ok(text) => handle_text(&dispatcher, &tenant, text),
            Err(e) => {
                warn!(%peer, tenant = %tenant, "undecodable frame: {e}");
                continue;
            }
        };
        debug!(%peer, tenant = %tenant, status = reply.status, "request handled");

        let encoded = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize reply: {e}");
                continue;
            }
        };
        if let Err(e) = ws_sender.send(WsMessage::text(encoded)).await {
            warn!(%peer, tenant = %tenant, "Failed to send reply: {e}");
            break;
        }
    }

    info!(%peer, tenant = %tenant, "connection closed");
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}
