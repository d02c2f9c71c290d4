/*
 * mod.rs
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

//! WebSocket server (RFC 6455): upgrade handshake over HTTP/1.1, then frame-based
//! message exchange. Implement MessageHandler (or pass a closure) to answer messages.

pub mod frame;
pub mod handshake;
pub mod opcode;
pub mod request;
pub mod session;

#[cfg(test)]
mod testutil;

pub use handshake::Handshake;
pub use opcode::Opcode;
pub use request::UpgradeRequest;
pub use session::{serve, Message, MessageHandler, Session, SessionState};
