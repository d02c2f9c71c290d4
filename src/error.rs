/*
 * error.rs
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

//! Error type shared by the handshake, the frame codec and the session loop.

use std::io;

use thiserror::Error;

use crate::websocket::Opcode;

/// Error returned by a message handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an [`Error`], which decides how a session reacts to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed upgrade request or a peer that broke the framing rules.
    Protocol,
    /// The transport failed; nothing more can be written.
    Io,
    /// The application handler failed or broke its reply contract.
    Handler,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown connection type (Connection header must be \"Upgrade\")")]
    InvalidConnectionHeader,

    #[error("unknown upgrade type (Upgrade header must be \"websocket\")")]
    InvalidUpgradeHeader,

    #[error("Sec-WebSocket-Key header is missing")]
    MissingWebSocketKey,

    #[error("malformed upgrade request: {0}")]
    MalformedRequest(String),

    #[error("unknown opcode 0x{0:X}")]
    UnknownOpcode(u8),

    #[error("continuation frame without a message in progress")]
    UnexpectedContinuation,

    #[error("new {0:?} frame while a fragmented message is in progress")]
    IncompleteMessage(Opcode),

    #[error("client frame is not masked")]
    UnmaskedFrame,

    #[error("payload length {length} exceeds maximum {max}")]
    PayloadTooLarge { length: u64, max: u64 },

    #[error("64-bit payload length 0x{0:X} has the most significant bit set")]
    InvalidPayloadLength(u64),

    #[error("{0:?} frame must be final and carry at most 125 bytes")]
    InvalidControlFrame(Opcode),

    #[error("close frame payload of 1 byte")]
    InvalidCloseFrame,

    #[error("close code {0} must not be sent on the wire")]
    InvalidCloseCode(u16),

    #[error("session is not in the {0} state")]
    InvalidState(&'static str),

    #[error("handler replied with {0:?}, expected Text or Binary")]
    InvalidResponseOpcode(Opcode),

    #[error("handler failed: {0}")]
    Handler(HandlerError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Handler(_) | Error::InvalidResponseOpcode(_) => ErrorKind::Handler,
            _ => ErrorKind::Protocol,
        }
    }
}
