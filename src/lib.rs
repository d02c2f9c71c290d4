/*
 * lib.rs
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

//! Server side of the WebSocket protocol on top of any tokio byte stream:
//! the HTTP upgrade handshake, the frame codec and a per-connection session loop.

pub mod config;
pub mod debug;
pub mod error;
pub mod websocket;

pub use config::Config;
pub use error::{Error, ErrorKind, HandlerError, Result};
