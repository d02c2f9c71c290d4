/*
 * request.rs
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

//! Minimal HTTP/1.1 request head reader for the upgrade request.
//! Reads the request line and headers up to the empty CRLF line and nothing more,
//! so frame bytes that follow stay in the caller's buffer.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{Error, Result};

/// Upper bound on the request line plus all header lines.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024;

/// Request line and headers of an upgrade request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    headers: Vec<(String, String)>,
}

impl UpgradeRequest {
    /// Build a request from headers parsed elsewhere (e.g. by an HTTP server).
    pub fn from_headers(method: &str, path: &str, headers: Vec<(String, String)>) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            version: String::from("HTTP/1.1"),
            headers,
        }
    }

    /// First value of the named header; names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Read the request head from a buffered stream.
pub async fn read_upgrade_request<R>(reader: &mut R) -> Result<UpgradeRequest>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = (&mut *reader).take(MAX_REQUEST_BYTES as u64);

    let request_line = match read_line(&mut limited).await? {
        Some(line) => line,
        None => return Err(malformed("empty request")),
    };
    let parts: Vec<&str> = request_line.splitn(3, ' ').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(malformed(&format!("bad request line {:?}", request_line)));
    }
    let mut request = UpgradeRequest {
        method: parts[0].to_string(),
        path: parts[1].to_string(),
        version: parts[2].to_string(),
        headers: Vec::new(),
    };

    loop {
        let line = match read_line(&mut limited).await? {
            Some(line) => line,
            None => return Err(malformed("missing end of headers")),
        };
        if line.is_empty() {
            break;
        }
        // Lines without a colon are not headers; skip them.
        if let Some((name, value)) = line.split_once(':') {
            request
                .headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    Ok(request)
}

/// Read one line without its CRLF. `None` means the peer closed before any
/// byte of the line; a line cut short by EOF or the size cap is an error.
async fn read_line<R>(reader: &mut tokio::io::Take<R>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        if reader.limit() == 0 {
            return Err(malformed("request headers too large"));
        }
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') {
        if reader.limit() == 0 {
            return Err(malformed("request headers too large"));
        }
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed during handshake",
        )));
    }
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| malformed("invalid UTF-8 in request head"))
}

fn malformed(reason: &str) -> Error {
    Error::MalformedRequest(reason.to_string())
}
