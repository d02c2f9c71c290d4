/*
 * testutil.rs
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

//! Client-side helpers for tests: build masked frames the way a browser would.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::websocket::frame::apply_mask;

pub const UPGRADE_REQUEST: &str = "GET /chat HTTP/1.1\r\n\
    Host: localhost:8080\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
    Sec-WebSocket-Version: 13\r\n\
    Origin: http://localhost\r\n\
    \r\n";

pub const UPGRADE_RESPONSE: &str = "HTTP/1.1 101 Switching Protocols\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Access-Control-Allow-Origin: *\r\n\
    Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
    \r\n";

/// 4 random mask key bytes.
pub fn random_key() -> [u8; 4] {
    let mut key = [0u8; 4];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key);
    key
}

/// Encode a masked client frame with the given first header byte.
pub fn client_frame(byte0: u8, payload: &[u8], key: [u8; 4]) -> Vec<u8> {
    let mut out = vec![byte0];
    let len = payload.len();
    if len < 126 {
        out.push(0x80 | len as u8);
    } else if len < 65536 {
        out.push(0x80 | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0x80 | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }
    out.extend_from_slice(&key);
    let mut masked = payload.to_vec();
    apply_mask(&mut masked, &key);
    out.extend_from_slice(&masked);
    out
}

/// Read one unmasked server frame: (first header byte, payload).
pub async fn read_server_frame<R: AsyncRead + Unpin>(reader: &mut R) -> (u8, Vec<u8>) {
    let byte0 = reader.read_u8().await.unwrap();
    let byte1 = reader.read_u8().await.unwrap();
    assert_eq!(byte1 & 0x80, 0, "server frames must not be masked");
    let len = match byte1 & 0x7F {
        126 => reader.read_u16().await.unwrap() as usize,
        127 => reader.read_u64().await.unwrap() as usize,
        n => n as usize,
    };
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.unwrap();
    (byte0, payload)
}
