/*
 * session.rs
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

//! Per-connection session: owns the stream, performs the handshake once, then
//! reads frames, answers control frames, reassembles fragmented messages and
//! hands each complete message to the application handler.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::sync::watch;

use crate::config::Config;
use crate::error::{Error, ErrorKind, HandlerError, Result};
use crate::websocket::frame::{
    close_payload, parse_close_payload, read_frame_after, write_frame, Frame, Limits,
};
use crate::websocket::handshake::{negotiate, write_bad_request, write_handshake_response, Handshake};
use crate::websocket::opcode::Opcode;
use crate::websocket::request::{read_upgrade_request, UpgradeRequest};
use crate::{debug_log, warn_log};

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_GOING_AWAY: u16 = 1001;
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
pub const CLOSE_TOO_BIG: u16 = 1009;
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// A complete application message: Text or Binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub opcode: Opcode,
    pub payload: Bytes,
}

impl Message {
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self {
            opcode: Opcode::Text,
            payload: payload.into(),
        }
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self {
            opcode: Opcode::Binary,
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8, if it is valid.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Application callback. Receives each complete message and returns the reply,
/// which must be Text or Binary.
pub trait MessageHandler {
    fn message(&mut self, message: Message) -> std::result::Result<Message, HandlerError>;
}

impl<F> MessageHandler for F
where
    F: FnMut(Message) -> std::result::Result<Message, HandlerError>,
{
    fn message(&mut self, message: Message) -> std::result::Result<Message, HandlerError> {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshaking,
    Open,
    /// A Text/Binary frame without FIN arrived; continuation frames are being buffered.
    Reassembling,
    Closed,
}

/// WebSocket session for one connection.
pub struct Session<S> {
    stream: BufStream<S>,
    state: SessionState,
    handshake: Option<Handshake>,
    limits: Limits,
    cancel: Option<watch::Receiver<bool>>,
    /// Opcode of the first fragment and the payload gathered so far.
    fragments: Option<(Opcode, BytesMut)>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: &Config) -> Self {
        Self::from_buffered(BufStream::new(stream), config)
    }

    /// Use a stream that may already hold buffered bytes (e.g. after the
    /// caller read the request head itself).
    pub fn from_buffered(stream: BufStream<S>, config: &Config) -> Self {
        Self {
            stream,
            state: SessionState::Handshaking,
            handshake: None,
            limits: Limits::from_config(config),
            cancel: None,
            fragments: None,
        }
    }

    /// Stop the session when the receiver observes `true`. Checked before every
    /// frame and while waiting for the next frame to start.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Negotiated key and client metadata, once the handshake succeeded.
    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// Read the upgrade request from the stream and complete the handshake.
    /// A malformed or non-upgrade request is answered with 400 Bad Request.
    pub async fn accept(&mut self) -> Result<()> {
        if self.state != SessionState::Handshaking {
            return Err(Error::InvalidState("handshaking"));
        }
        let result = match read_upgrade_request(&mut self.stream).await {
            Ok(request) => self.upgrade(&request).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.state = SessionState::Closed;
            if e.kind() == ErrorKind::Protocol {
                warn_log!("[ws] rejecting upgrade: {}", e);
                if let Err(w) = write_bad_request(&mut self.stream, &e.to_string()).await {
                    debug_log!("[ws] could not send 400 response: {}", w);
                }
            }
            self.release().await;
            return Err(e);
        }
        Ok(())
    }

    /// Negotiate with an upgrade request parsed elsewhere and write the 101
    /// response. Nothing is written when negotiation fails.
    pub async fn upgrade(&mut self, request: &UpgradeRequest) -> Result<()> {
        if self.state != SessionState::Handshaking {
            return Err(Error::InvalidState("handshaking"));
        }
        let handshake = match negotiate(request) {
            Ok(h) => h,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e);
            }
        };
        debug_log!(
            "[ws] upgrade: origin={:?} user_agent={:?} cache_control={:?} extensions={:?}",
            handshake.origin,
            handshake.user_agent,
            handshake.cache_control,
            handshake.extensions
        );
        if let Err(e) = write_handshake_response(&mut self.stream, &handshake).await {
            self.state = SessionState::Closed;
            return Err(e);
        }
        self.handshake = Some(handshake);
        self.state = SessionState::Open;
        Ok(())
    }

    /// Drive the read loop until the peer closes, the stream ends, the session
    /// is cancelled or an error occurs. Always shuts the stream down on return.
    pub async fn run<H>(&mut self, handler: &mut H) -> Result<()>
    where
        H: MessageHandler + ?Sized,
    {
        if self.state != SessionState::Open {
            return Err(Error::InvalidState("open"));
        }
        let result = self.read_loop(handler).await;
        self.state = SessionState::Closed;
        self.fragments = None;
        self.release().await;
        result
    }

    async fn read_loop<H>(&mut self, handler: &mut H) -> Result<()>
    where
        H: MessageHandler + ?Sized,
    {
        loop {
            if self.is_cancelled() {
                debug_log!("[ws] cancelled");
                self.send_close(CLOSE_GOING_AWAY, "going away").await;
                return Ok(());
            }
            let first = match self.read_first_byte().await {
                Ok(Some(b)) => b,
                Ok(None) => return Ok(()),
                Err(e) => return Err(self.fail(e).await),
            };
            let frame = match read_frame_after(first, &mut self.stream, &self.limits).await {
                Ok(frame) => frame,
                Err(e) => return Err(self.fail(e).await),
            };
            debug_log!(
                "[ws] frame: opcode={:?} fin={} len={}",
                frame.opcode,
                frame.fin,
                frame.payload.len()
            );
            match self.dispatch(frame, handler).await {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => return Err(self.fail(e).await),
            }
        }
    }

    /// Wait for the first byte of the next frame. `None` on clean end of stream
    /// or cancellation.
    async fn read_first_byte(&mut self) -> Result<Option<u8>> {
        let mut first = [0u8; 1];
        let read = match self.cancel.as_mut() {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancelled(cancel) => None,
                n = self.stream.read(&mut first) => Some(n),
            },
            None => Some(self.stream.read(&mut first).await),
        };
        let n = match read {
            Some(n) => n?,
            None => {
                debug_log!("[ws] cancelled while waiting for a frame");
                self.send_close(CLOSE_GOING_AWAY, "going away").await;
                return Ok(None);
            }
        };
        if n == 0 {
            debug_log!("[ws] stream EOF");
            return Ok(None);
        }
        Ok(Some(first[0]))
    }

    /// Handle one frame. Returns false when the session should end normally.
    async fn dispatch<H>(&mut self, frame: Frame, handler: &mut H) -> Result<bool>
    where
        H: MessageHandler + ?Sized,
    {
        match frame.opcode {
            Opcode::Close => {
                let (code, reason) = parse_close_payload(&frame.payload)?;
                debug_log!("[ws] close: code={:?} reason={:?}", code, reason);
                let echo = match code {
                    Some(c) => close_payload(c, ""),
                    None => Bytes::new(),
                };
                if let Err(e) = write_frame(&mut self.stream, true, Opcode::Close, &echo).await {
                    debug_log!("[ws] could not echo close: {}", e);
                }
                Ok(false)
            }
            Opcode::Ping => {
                write_frame(&mut self.stream, true, Opcode::Pong, &frame.payload).await?;
                Ok(true)
            }
            Opcode::Pong => Ok(true),
            Opcode::Text | Opcode::Binary => {
                if self.fragments.is_some() {
                    return Err(Error::IncompleteMessage(frame.opcode));
                }
                if frame.fin {
                    self.deliver(Message { opcode: frame.opcode, payload: frame.payload }, handler)
                        .await?;
                } else {
                    self.fragments = Some((frame.opcode, BytesMut::from(&frame.payload[..])));
                    self.state = SessionState::Reassembling;
                }
                Ok(true)
            }
            Opcode::Continuation => {
                let (opcode, mut buf) = self.fragments.take().ok_or(Error::UnexpectedContinuation)?;
                let length = buf.len() as u64 + frame.payload.len() as u64;
                if length > self.limits.max_payload_size {
                    return Err(Error::PayloadTooLarge {
                        length,
                        max: self.limits.max_payload_size,
                    });
                }
                buf.extend_from_slice(&frame.payload);
                if frame.fin {
                    self.state = SessionState::Open;
                    self.deliver(Message { opcode, payload: buf.freeze() }, handler).await?;
                } else {
                    self.fragments = Some((opcode, buf));
                }
                Ok(true)
            }
            Opcode::Unknown(v) => Err(Error::UnknownOpcode(v)),
        }
    }

    async fn deliver<H>(&mut self, message: Message, handler: &mut H) -> Result<()>
    where
        H: MessageHandler + ?Sized,
    {
        debug_log!("[ws] message: opcode={:?} len={}", message.opcode, message.payload.len());
        let reply = handler.message(message).map_err(Error::Handler)?;
        if !reply.opcode.is_data() {
            return Err(Error::InvalidResponseOpcode(reply.opcode));
        }
        write_frame(&mut self.stream, true, reply.opcode, &reply.payload).await
    }

    /// Log the error and, if the stream is still usable, tell the peer why
    /// the session is ending.
    async fn fail(&mut self, err: Error) -> Error {
        warn_log!("[ws] session failed: {}", err);
        self.state = SessionState::Closed;
        if let Some((code, reason)) = close_code(&err) {
            self.send_close(code, reason).await;
        }
        err
    }

    async fn send_close(&mut self, code: u16, reason: &str) {
        let payload = close_payload(code, reason);
        if let Err(e) = write_frame(&mut self.stream, true, Opcode::Close, &payload).await {
            debug_log!("[ws] could not send close frame: {}", e);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |rx| *rx.borrow())
    }

    async fn release(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug_log!("[ws] shutdown: {}", e);
        }
    }
}

/// Close status for errors that leave the stream writable.
fn close_code(err: &Error) -> Option<(u16, &'static str)> {
    match err {
        Error::Io(_) => None,
        Error::PayloadTooLarge { .. } => Some((CLOSE_TOO_BIG, "message too big")),
        e if e.kind() == ErrorKind::Handler => Some((CLOSE_INTERNAL_ERROR, "internal error")),
        _ => Some((CLOSE_PROTOCOL_ERROR, "protocol error")),
    }
}

/// Resolves once the signal reads `true`. A dropped sender never cancels.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let sender_dropped = rx.wait_for(|cancelled| *cancelled).await.is_err();
    if sender_dropped {
        std::future::pending::<()>().await;
    }
}

/// Read the upgrade request, handshake and run the session until it ends.
pub async fn serve<S, H>(
    stream: S,
    handler: &mut H,
    config: &Config,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: MessageHandler + ?Sized,
{
    let mut session = Session::new(stream, config);
    if let Some(rx) = cancel {
        session = session.with_cancellation(rx);
    }
    session.accept().await?;
    session.run(handler).await
}
