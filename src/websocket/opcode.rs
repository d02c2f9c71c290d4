/*
 * opcode.rs
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

//! Frame opcodes (RFC 6455 §5.2) and the FIN bit of the first header byte.

pub const OP_CONTINUATION: u8 = 0x0;
pub const OP_TEXT: u8 = 0x1;
pub const OP_BINARY: u8 = 0x2;
pub const OP_CLOSE: u8 = 0x8;
pub const OP_PING: u8 = 0x9;
pub const OP_PONG: u8 = 0xA;

pub(crate) const FIN_BIT: u8 = 0x80;
const OPCODE_MASK: u8 = 0b1111;

/// Semantic type of a frame, taken from the low 4 bits of header byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    /// Reserved opcode; carries the raw 4-bit value.
    Unknown(u8),
}

impl Opcode {
    /// The 4-bit wire value.
    pub fn as_u8(self) -> u8 {
        match self {
            Opcode::Continuation => OP_CONTINUATION,
            Opcode::Text => OP_TEXT,
            Opcode::Binary => OP_BINARY,
            Opcode::Close => OP_CLOSE,
            Opcode::Ping => OP_PING,
            Opcode::Pong => OP_PONG,
            Opcode::Unknown(v) => v & OPCODE_MASK,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }

    /// Text or Binary: the only opcodes a message (and a handler reply) may carry.
    pub fn is_data(self) -> bool {
        matches!(self, Opcode::Text | Opcode::Binary)
    }
}

/// True iff bit 7 (FIN) of the byte is set.
pub fn final_fragment(byte: u8) -> bool {
    byte & FIN_BIT != 0
}

/// Classify the low 4 bits of a header byte. Total: every byte maps to exactly one opcode.
pub fn classify(byte: u8) -> Opcode {
    match byte & OPCODE_MASK {
        OP_CONTINUATION => Opcode::Continuation,
        OP_TEXT => Opcode::Text,
        OP_BINARY => Opcode::Binary,
        OP_CLOSE => Opcode::Close,
        OP_PING => Opcode::Ping,
        OP_PONG => Opcode::Pong,
        other => Opcode::Unknown(other),
    }
}
