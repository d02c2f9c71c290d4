/*
 * debug.rs
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

//! Logging macros with two levels:
//!
//!  - `warn_log!`  - Always printed.  Problems that end a session abnormally
//!    (handshake failures, protocol violations, handler errors, I/O errors).
//!  - `debug_log!` - Only printed when `WSFRAME_DEBUG=1` (or `true`).  Verbose
//!    protocol chatter: handshake metadata, per-frame opcode and length,
//!    reassembly progress, control frame replies.
//!
//! Nothing is printed for routine per-frame operations unless
//! `WSFRAME_DEBUG` is enabled.

use std::sync::OnceLock;

/// Returns true if verbose debug logging is enabled (`WSFRAME_DEBUG=1` or `WSFRAME_DEBUG=true`).
pub fn is_debug() -> bool {
    static DEBUG: OnceLock<bool> = OnceLock::new();
    *DEBUG.get_or_init(|| {
        std::env::var("WSFRAME_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// Always printed.  Use for abnormal session termination only.
/// Usage is identical to `println!`.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

/// Print a message only when `WSFRAME_DEBUG` is enabled.
/// Usage is identical to `println!`.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug() {
            println!($($arg)*);
        }
    };
}
