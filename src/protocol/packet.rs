//! RCON packet framing
//!
//! Wire layout, all integers little-endian:
//!
//! ```text
//! [length: i32][request_id: i32][type: i32][body bytes][0x00][0x00]
//! ```
//!
//! `length` counts everything after itself, so the smallest legal value is
//! [`PACKET_OVERHEAD`] (empty body).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::protocol::{MAX_COMMAND_LEN, MAX_INCOMING_LEN, PACKET_OVERHEAD};

/// Size of the length prefix
const LENGTH_PREFIX: usize = 4;

/// RCON packet type field
///
/// `AUTH_RESPONSE` and `EXEC_COMMAND` share the value 2; direction
/// disambiguates them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(i32);

impl PacketType {
    pub const RESPONSE_VALUE: Self = Self(0);
    pub const EXEC_COMMAND: Self = Self(2);
    pub const AUTH_RESPONSE: Self = Self(2);
    pub const AUTH: Self = Self(3);

    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("RESPONSE_VALUE"),
            2 => f.write_str("EXEC_COMMAND|AUTH_RESPONSE"),
            3 => f.write_str("AUTH"),
            other => write!(f, "PacketType({})", other),
        }
    }
}

/// Framing failures
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("packet length {0} is below the minimum of {PACKET_OVERHEAD}")]
    TooShort(i32),

    #[error("packet length {0} exceeds the maximum of {MAX_INCOMING_LEN}")]
    TooLarge(i32),

    #[error("packet is missing its null terminators")]
    MissingTerminator,
}

/// Why a command was refused before reaching the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command is empty")]
    Empty,

    #[error("command contains a NUL byte")]
    ContainsNul,

    #[error("command is {0} bytes, limit is {MAX_COMMAND_LEN}")]
    TooLong(usize),
}

/// Check that a command can be framed as an EXEC_COMMAND body
pub fn validate_command(command: &str) -> Result<(), CommandError> {
    if command.is_empty() {
        return Err(CommandError::Empty);
    }
    if command.as_bytes().contains(&0) {
        return Err(CommandError::ContainsNul);
    }
    if command.len() > MAX_COMMAND_LEN {
        return Err(CommandError::TooLong(command.len()));
    }
    Ok(())
}

/// A single RCON packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub request_id: i32,
    pub packet_type: PacketType,
    pub body: Bytes,
}

impl Packet {
    pub fn new(request_id: i32, packet_type: PacketType, body: impl Into<Bytes>) -> Self {
        Self {
            request_id,
            packet_type,
            body: body.into(),
        }
    }

    pub fn auth(request_id: i32, password: &str) -> Self {
        Self::new(
            request_id,
            PacketType::AUTH,
            Bytes::copy_from_slice(password.as_bytes()),
        )
    }

    pub fn exec(request_id: i32, command: &str) -> Self {
        Self::new(
            request_id,
            PacketType::EXEC_COMMAND,
            Bytes::copy_from_slice(command.as_bytes()),
        )
    }

    /// Value of the length prefix for this packet
    #[must_use]
    #[inline]
    pub fn wire_length(&self) -> usize {
        self.body.len() + PACKET_OVERHEAD
    }

    /// Body decoded as text, replacing invalid UTF-8
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Append the framed packet to `dst`
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(LENGTH_PREFIX + self.wire_length());
        dst.put_i32_le(self.wire_length() as i32);
        dst.put_i32_le(self.request_id);
        dst.put_i32_le(self.packet_type.as_i32());
        dst.put_slice(&self.body);
        dst.put_u8(0);
        dst.put_u8(0);
    }

    /// Decode one packet from the front of `src`
    ///
    /// Returns `Ok(None)` when `src` does not yet hold a full frame; nothing
    /// is consumed in that case.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Self>, FrameError> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }
        let length = i32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        let frame_len = checked_length(length)?;
        if src.len() < LENGTH_PREFIX + frame_len {
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        let frame = src.split_to(frame_len).freeze();
        Self::from_frame(frame).map(Some)
    }

    /// Parse the bytes that follow the length prefix
    fn from_frame(mut frame: Bytes) -> Result<Self, FrameError> {
        let body_len = frame.len() - PACKET_OVERHEAD;
        let request_id = frame.get_i32_le();
        let packet_type = PacketType(frame.get_i32_le());
        let body = frame.split_to(body_len);
        if frame[..] != [0u8, 0] {
            return Err(FrameError::MissingTerminator);
        }
        Ok(Self {
            request_id,
            packet_type,
            body,
        })
    }
}

fn checked_length(length: i32) -> Result<usize, FrameError> {
    if length < PACKET_OVERHEAD as i32 {
        return Err(FrameError::TooShort(length));
    }
    if length as usize > MAX_INCOMING_LEN {
        return Err(FrameError::TooLarge(length));
    }
    Ok(length as usize)
}

/// Read exactly one packet from `reader`
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, FrameError>
where
    R: AsyncRead + Unpin,
{
    let length = reader.read_i32_le().await?;
    let frame_len = checked_length(length)?;
    let mut frame = BytesMut::zeroed(frame_len);
    reader.read_exact(&mut frame).await?;
    Packet::from_frame(frame.freeze())
}

/// Frame and write one packet to `writer`
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX + packet.wire_length());
    packet.encode(&mut buf);
    writer.write_all(&buf).await?;
    writer.flush().await
}
