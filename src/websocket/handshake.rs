/*
 * handshake.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wsframe, a server-side WebSocket engine.
 *
 * Wsframe is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wsframe is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wsframe.  If not, see <http://www.gnu.org/licenses/>.
 */

//! WebSocket opening handshake, server side (RFC 6455 §4.2): validate the
//! upgrade headers, derive Sec-WebSocket-Accept, write the 101 response.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::websocket::request::UpgradeRequest;

/// Magic string for Sec-WebSocket-Accept (RFC 6455 §4.2.2).
const WS_ACCEPT_MAGIC: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Outcome of a successful negotiation: the key pair and the client metadata
/// captured from the upgrade headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    pub key: String,
    pub accept: String,
    pub origin: Option<String>,
    pub cache_control: Option<String>,
    pub user_agent: Option<String>,
    pub extensions: Vec<String>,
}

/// Compute Sec-WebSocket-Accept from the client's base64 key.
pub fn compute_accept(key_base64: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(key_base64.as_bytes());
    hasher.update(WS_ACCEPT_MAGIC);
    let digest = hasher.finalize();
    BASE64.encode(digest.as_slice())
}

/// Validate the upgrade headers and derive the accept token.
///
/// `Connection` must be exactly `Upgrade` and `Upgrade` exactly `websocket`;
/// `Sec-WebSocket-Key` must be present and non-empty. Nothing is written on
/// failure, so the caller may still answer with [`write_bad_request`].
pub fn negotiate(request: &UpgradeRequest) -> Result<Handshake> {
    if request.header("Connection") != Some("Upgrade") {
        return Err(Error::InvalidConnectionHeader);
    }
    if request.header("Upgrade") != Some("websocket") {
        return Err(Error::InvalidUpgradeHeader);
    }

    let extensions = match request.header("Sec-WebSocket-Extensions") {
        Some(v) if !v.is_empty() => v.split(';').map(String::from).collect(),
        _ => Vec::new(),
    };

    let key = match request.header("Sec-WebSocket-Key") {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => return Err(Error::MissingWebSocketKey),
    };

    let captured = |name: &str| request.header(name).map(String::from);
    Ok(Handshake {
        accept: compute_accept(&key),
        key,
        origin: captured("Origin"),
        cache_control: captured("Cache-Control"),
        user_agent: captured("User-Agent"),
        extensions,
    })
}

/// Build the 101 Switching Protocols response head.
pub fn build_handshake_response(handshake: &Handshake) -> Vec<u8> {
    let mut resp = Vec::new();
    resp.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
    resp.extend_from_slice(b"Upgrade: websocket\r\n");
    resp.extend_from_slice(b"Connection: Upgrade\r\n");
    resp.extend_from_slice(b"Access-Control-Allow-Origin: *\r\n");
    resp.extend_from_slice(b"Sec-WebSocket-Accept: ");
    resp.extend_from_slice(handshake.accept.as_bytes());
    resp.extend_from_slice(b"\r\n\r\n");
    resp
}

/// Write the 101 response and flush.
pub async fn write_handshake_response<W>(writer: &mut W, handshake: &Handshake) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&build_handshake_response(handshake)).await?;
    writer.flush().await?;
    Ok(())
}

/// Reject a failed upgrade with `400 Bad Request` and a plain-text reason.
pub async fn write_bad_request<W>(writer: &mut W, reason: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = format!("Bad Request: {}", reason);
    let resp = format!(
        "HTTP/1.1 400 Bad Request\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        body.len(),
        body
    );
    writer.write_all(resp.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
