/*
 * frame.rs
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

//! WebSocket frame codec (RFC 6455 §5.2-5.3).
//!
//! Decoding reads one frame from the client: header, extended length, optional
//! mask key, payload (unmasked if a key was present). Encoding writes server
//! frames, which are never masked.
//!
//! Byte 0: FIN(1) RSV(3, ignored) Opcode(4)
//! Byte 1: MASK(1) Payload-Length(7), then 0, 2 or 8 bytes of extended length.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{Config, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::error::{Error, Result};
use crate::websocket::opcode::{classify, final_fragment, Opcode, FIN_BIT};

const MASK_BIT: u8 = 0x80;
const LENGTH_MASK: u8 = 0x7F;
const LENGTH_16: u8 = 126;
const LENGTH_64: u8 = 127;

/// Largest possible server frame header: 2 bytes + 8 bytes extended length.
pub const MAX_HEADER_LEN: usize = 10;

/// Control frames (close, ping, pong) carry at most 125 payload bytes.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Upper bound on the payload buffer reserved before any payload byte is read.
const READ_CHUNK: usize = 64 * 1024;

/// Limits applied while decoding client frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_payload_size: u64,
    /// Reject client frames that arrive without a mask key.
    pub require_mask: bool,
}

impl Limits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
            require_mask: config.require_mask,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            require_mask: false,
        }
    }
}

/// Header of one decoded frame. Only lives while that frame is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: Opcode,
    pub payload_len: u64,
    pub mask_key: Option<[u8; 4]>,
}

impl FrameHeader {
    pub fn is_masked(&self) -> bool {
        self.mask_key.is_some()
    }
}

/// A decoded frame with its payload already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub payload: Bytes,
}

/// XOR the payload with the 4-byte key. Applying it twice restores the input.
pub fn apply_mask(payload: &mut [u8], mask_key: &[u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask_key[i % 4];
    }
}

// ============================================================
// Decoding
// ============================================================

/// Read one frame. Returns `Ok(None)` on a clean end of stream before the
/// first header byte; end of stream anywhere later is an I/O error.
pub async fn read_frame<R>(reader: &mut R, limits: &Limits) -> Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut first = [0u8; 1];
    if reader.read(&mut first).await? == 0 {
        return Ok(None);
    }
    read_frame_after(first[0], reader, limits).await.map(Some)
}

/// Decode the rest of a frame whose first header byte has already been consumed.
pub async fn read_frame_after<R>(first_byte: u8, reader: &mut R, limits: &Limits) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let header = read_header_after(first_byte, reader).await?;
    if header.opcode.is_control()
        && (!header.fin || header.payload_len > MAX_CONTROL_PAYLOAD as u64)
    {
        return Err(Error::InvalidControlFrame(header.opcode));
    }
    if limits.require_mask && !header.is_masked() {
        return Err(Error::UnmaskedFrame);
    }
    if header.payload_len > limits.max_payload_size {
        return Err(Error::PayloadTooLarge {
            length: header.payload_len,
            max: limits.max_payload_size,
        });
    }
    let len = usize::try_from(header.payload_len).map_err(|_| Error::PayloadTooLarge {
        length: header.payload_len,
        max: usize::MAX as u64,
    })?;

    // Grow with the bytes that actually arrive, not with the claimed length.
    let mut payload = Vec::with_capacity(len.min(READ_CHUNK));
    if len > 0 {
        (&mut *reader).take(header.payload_len).read_to_end(&mut payload).await?;
        if payload.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("frame payload ended after {} of {} bytes", payload.len(), len),
            )
            .into());
        }
    }
    if let Some(key) = header.mask_key {
        apply_mask(&mut payload, &key);
    }

    Ok(Frame {
        fin: header.fin,
        opcode: header.opcode,
        payload: Bytes::from(payload),
    })
}

/// Read byte 1, the extended length and the mask key.
pub async fn read_header_after<R>(first_byte: u8, reader: &mut R) -> Result<FrameHeader>
where
    R: AsyncRead + Unpin,
{
    let second = reader.read_u8().await?;
    let masked = second & MASK_BIT != 0;

    let payload_len = match second & LENGTH_MASK {
        LENGTH_16 => reader.read_u16().await? as u64,
        LENGTH_64 => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf).await?;
            let len = buf.iter().fold(0u64, |len, &b| (len << 8) | b as u64);
            if len >> 63 != 0 {
                return Err(Error::InvalidPayloadLength(len));
            }
            len
        }
        len => len as u64,
    };

    let mask_key = if masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    Ok(FrameHeader {
        fin: final_fragment(first_byte),
        opcode: classify(first_byte),
        payload_len,
        mask_key,
    })
}

// ============================================================
// Encoding
// ============================================================

/// Encode an unmasked server frame header into `out`.
pub fn encode_header(fin: bool, opcode: Opcode, payload_len: u64, out: &mut BytesMut) {
    let byte0 = if fin { FIN_BIT } else { 0 } | opcode.as_u8();
    out.put_u8(byte0);
    if payload_len < LENGTH_16 as u64 {
        out.put_u8(payload_len as u8);
    } else if payload_len < 65536 {
        out.put_u8(LENGTH_16);
        out.put_u16(payload_len as u16);
    } else {
        out.put_u8(LENGTH_64);
        out.put_u64(payload_len);
    }
}

/// Write one frame (header then payload) and flush before returning.
pub async fn write_frame<W>(writer: &mut W, fin: bool, opcode: Opcode, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut header = BytesMut::with_capacity(MAX_HEADER_LEN);
    encode_header(fin, opcode, payload.len() as u64, &mut header);
    writer.write_all(&header).await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    writer.flush().await?;
    Ok(())
}

// ============================================================
// Close payloads
// ============================================================

/// Build a close frame payload: 2-byte status code then a UTF-8 reason,
/// truncated on a char boundary to fit a control frame.
pub fn close_payload(code: u16, reason: &str) -> Bytes {
    let mut end = reason.len().min(MAX_CONTROL_PAYLOAD - 2);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    let mut payload = BytesMut::with_capacity(2 + end);
    payload.put_u16(code);
    payload.extend_from_slice(&reason.as_bytes()[..end]);
    payload.freeze()
}

/// Split a close payload into its status code (if present) and reason.
///
/// A 1-byte payload, or a code that may not appear on the wire (1005, 1006,
/// 1015, unassigned ranges), is a protocol error.
pub fn parse_close_payload(data: &[u8]) -> Result<(Option<u16>, String)> {
    match data.len() {
        0 => Ok((None, String::new())),
        1 => Err(Error::InvalidCloseFrame),
        _ => {
            let code = u16::from_be_bytes([data[0], data[1]]);
            if !is_valid_close_code(code) {
                return Err(Error::InvalidCloseCode(code));
            }
            let reason = String::from_utf8_lossy(&data[2..]).into_owned();
            Ok((Some(code), reason))
        }
    }
}

/// Status codes an endpoint may send in a Close frame (RFC 6455 §7.4).
pub fn is_valid_close_code(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::testutil::client_frame;

    async fn decode(bytes: &[u8]) -> Result<Option<Frame>> {
        let mut input = bytes;
        read_frame(&mut input, &Limits::default()).await
    }

    fn encode(fin: bool, opcode: Opcode, payload: &[u8]) -> Vec<u8> {
        let mut out = BytesMut::new();
        encode_header(fin, opcode, payload.len() as u64, &mut out);
        out.extend_from_slice(payload);
        out.to_vec()
    }

    #[test]
    fn test_mask_roundtrip() {
        let original = b"Hello".to_vec();
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let mut masked = original.clone();
        apply_mask(&mut masked, &key);
        assert_ne!(masked, original);
        apply_mask(&mut masked, &key);
        assert_eq!(masked, original);
    }

    #[test]
    fn test_encode_small_header() {
        let buf = encode(true, Opcode::Text, b"Hello");
        assert_eq!(buf, vec![0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn test_encode_non_final_binary() {
        let buf = encode(false, Opcode::Binary, b"");
        assert_eq!(buf, vec![0x02, 0x00]);
    }

    #[test]
    fn test_encode_16bit_length() {
        for len in [126usize, 200, 65535] {
            let payload = vec![0x42u8; len];
            let buf = encode(true, Opcode::Binary, &payload);
            assert_eq!(buf[0], 0x82);
            assert_eq!(buf[1], 126, "len {}", len);
            assert_eq!(&buf[2..4], &(len as u16).to_be_bytes());
            assert_eq!(&buf[4..], &payload[..]);
        }
    }

    #[test]
    fn test_encode_64bit_length_uses_eight_bytes() {
        let payload = vec![7u8; 65536];
        let buf = encode(true, Opcode::Binary, &payload);
        assert_eq!(buf[1], 127);
        assert_eq!(&buf[2..10], &65536u64.to_be_bytes());
        assert_eq!(buf.len(), 10 + 65536);

        let mut out = BytesMut::new();
        encode_header(true, Opcode::Binary, 1 << 40, &mut out);
        assert_eq!(&out[2..10], &(1u64 << 40).to_be_bytes());
    }

    #[test]
    fn test_server_frames_never_set_mask_bit() {
        for len in [0usize, 125, 126, 70000] {
            let buf = encode(true, Opcode::Text, &vec![0u8; len]);
            assert_eq!(buf[1] & 0x80, 0, "len {}", len);
        }
    }

    #[tokio::test]
    async fn test_small_payloads_roundtrip_unmasked() {
        for len in [0usize, 1, 5, 125] {
            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let buf = encode(true, Opcode::Text, &payload);
            assert_eq!(buf[1] as usize, len);
            let frame = decode(&buf).await.unwrap().unwrap();
            assert!(frame.fin);
            assert_eq!(frame.opcode, Opcode::Text);
            assert_eq!(&frame.payload[..], &payload[..]);
        }
    }

    #[tokio::test]
    async fn test_decode_masked_7bit() {
        let key = [0x37, 0xfa, 0x21, 0x3d];
        // RFC 6455 §5.7 masked "Hello"
        let bytes = [0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58];
        let frame = decode(&bytes).await.unwrap().unwrap();
        assert!(frame.fin);
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(&frame.payload[..], b"Hello");
        assert_eq!(client_frame(0x81, b"Hello", key), bytes.to_vec());
    }

    #[tokio::test]
    async fn test_decode_unmask_formula() {
        let key = [0xde, 0xad, 0xbe, 0xef];
        let raw: Vec<u8> = (0..300u32).map(|i| (i * 7) as u8).collect();
        let mut bytes = vec![0x82, 0x80 | 126];
        bytes.extend_from_slice(&300u16.to_be_bytes());
        bytes.extend_from_slice(&key);
        bytes.extend_from_slice(&raw);

        let frame = decode(&bytes).await.unwrap().unwrap();
        assert_eq!(frame.payload.len(), 300);
        for (i, b) in frame.payload.iter().enumerate() {
            assert_eq!(*b, key[i % 4] ^ raw[i], "index {}", i);
        }
    }

    #[tokio::test]
    async fn test_decode_64bit_length() {
        let payload = vec![0xCDu8; 300];
        let mut bytes = vec![0x82, 127];
        bytes.extend_from_slice(&300u64.to_be_bytes());
        bytes.extend_from_slice(&payload);
        let frame = decode(&bytes).await.unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Binary);
        assert_eq!(&frame.payload[..], &payload[..]);
    }

    #[tokio::test]
    async fn test_decode_header_fields() {
        let bytes = [0x01, 0xFE, 0x01, 0x00, 1, 2, 3, 4];
        let mut input = &bytes[1..];
        let header = read_header_after(bytes[0], &mut input).await.unwrap();
        assert!(!header.fin);
        assert_eq!(header.opcode, Opcode::Text);
        assert_eq!(header.payload_len, 256);
        assert_eq!(header.mask_key, Some([1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn test_decode_ignores_rsv_bits() {
        let frame = decode(&[0xC1, 0x02, b'h', b'i']).await.unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(&frame.payload[..], b"hi");
    }

    #[tokio::test]
    async fn test_clean_eof_is_none() {
        assert!(decode(&[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_io_error() {
        for bytes in [&[0x81][..], &[0x81, 0x85, 1, 2][..], &[0x81, 0x05, b'a'][..]] {
            match decode(bytes).await {
                Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
                other => panic!("expected UnexpectedEof, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_payload_limit() {
        let limits = Limits { max_payload_size: 4, require_mask: false };
        let bytes = [0x82, 0x05, 1, 2, 3, 4, 5];
        let mut input = &bytes[..];
        match read_frame(&mut input, &limits).await {
            Err(Error::PayloadTooLarge { length: 5, max: 4 }) => {}
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_claimed_length_without_payload_is_eof() {
        let limits = Limits { max_payload_size: u64::MAX >> 1, require_mask: false };
        let mut bytes = vec![0x82, 127];
        bytes.extend_from_slice(&(1u64 << 44).to_be_bytes());
        bytes.extend_from_slice(b"only a few bytes");
        let mut input = &bytes[..];
        match read_frame(&mut input, &limits).await {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_64bit_length_msb_rejected() {
        let limits = Limits { max_payload_size: u64::MAX, require_mask: false };
        let mut bytes = vec![0x82, 127];
        bytes.extend_from_slice(&(1u64 << 63).to_be_bytes());
        let mut input = &bytes[..];
        assert!(matches!(
            read_frame(&mut input, &limits).await,
            Err(Error::InvalidPayloadLength(len)) if len == 1 << 63
        ));
    }

    #[tokio::test]
    async fn test_control_frame_checked_before_payload() {
        // Claims 64 KiB but sends none of it: rejected on the header alone.
        let mut bytes = vec![0x89, 126];
        bytes.extend_from_slice(&65535u16.to_be_bytes());
        assert!(matches!(
            decode(&bytes).await,
            Err(Error::InvalidControlFrame(Opcode::Ping))
        ));

        assert!(matches!(
            decode(&[0x08, 0x00]).await,
            Err(Error::InvalidControlFrame(Opcode::Close))
        ));

        let max = vec![0u8; MAX_CONTROL_PAYLOAD];
        let frame = decode(&encode(true, Opcode::Pong, &max)).await.unwrap().unwrap();
        assert_eq!(frame.payload.len(), MAX_CONTROL_PAYLOAD);
    }

    #[tokio::test]
    async fn test_require_mask() {
        let limits = Limits { max_payload_size: 1024, require_mask: true };
        let bytes = [0x81, 0x02, b'h', b'i'];
        let mut input = &bytes[..];
        assert!(matches!(read_frame(&mut input, &limits).await, Err(Error::UnmaskedFrame)));

        let masked = client_frame(0x81, b"hi", [9, 8, 7, 6]);
        let mut input = &masked[..];
        let frame = read_frame(&mut input, &limits).await.unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"hi");
    }

    #[tokio::test]
    async fn test_write_frame() {
        let mut out = Vec::new();
        write_frame(&mut out, true, Opcode::Pong, b"abc").await.unwrap();
        assert_eq!(out, vec![0x8A, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn test_close_payload() {
        let payload = close_payload(1000, "bye");
        assert_eq!(&payload[..], &[0x03, 0xE8, b'b', b'y', b'e']);
        assert_eq!(
            parse_close_payload(&payload).unwrap(),
            (Some(1000), String::from("bye"))
        );
        assert_eq!(parse_close_payload(&[]).unwrap(), (None, String::new()));

        assert!(matches!(parse_close_payload(&[0x03]), Err(Error::InvalidCloseFrame)));
        for code in [0u16, 999, 1004, 1005, 1006, 1015, 2999, 5000] {
            let payload = close_payload(code, "");
            assert!(
                matches!(parse_close_payload(&payload), Err(Error::InvalidCloseCode(c)) if c == code),
                "code {}",
                code
            );
        }
        for code in [1000u16, 1001, 1003, 1007, 1011, 1014, 3000, 4999] {
            assert!(is_valid_close_code(code), "code {}", code);
        }

        let long = "é".repeat(100);
        let payload = close_payload(1011, &long);
        assert!(payload.len() <= MAX_CONTROL_PAYLOAD);
        assert!(std::str::from_utf8(&payload[2..]).is_ok());
    }
}
