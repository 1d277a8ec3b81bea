//! Frame encoding and decoding for the wire protocol.
//!
//! A frame is a fixed 5-byte header followed by a variable-size payload:
//! one tag byte naming the message type, then the payload length as a
//! big-endian `u32`. The header carries the raw tag rather than a
//! [`MessageType`] so that an unrecognized tag can still be read past and
//! answered with an error instead of desynchronizing the stream.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Size of the fixed message header in bytes.
pub const HEADER_SIZE: usize = 5;

/// Default cap on payload size (16 MiB). A header declaring more than the
/// configured cap is treated as stream corruption, not a request.
pub const DEFAULT_MAX_PAYLOAD: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("buffer too small for header: need {HEADER_SIZE} bytes, got {0}")]
    ShortBuffer(usize),
    #[error("declared payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: u32, max: u32 },
    #[error("connection closed mid-frame")]
    UnexpectedEof,
    #[error("unknown message type tag {0}")]
    UnknownMessageType(u8),
    #[error("frame IO error: {0}")]
    Io(#[from] io::Error),
}

/// Message type tags, two families: requests (1-4) and responses (11-14,
/// plus the error response 99). Every request has exactly one paired
/// success response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    QueryRaw = 1,
    QueryJson = 2,
    QueryBinary = 3,
    QueryStream = 4,
    ResponseRaw = 11,
    ResponseJson = 12,
    ResponseBinary = 13,
    ResponseStream = 14,
    ResponseError = 99,
}

impl MessageType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The success response paired with a request type; `None` for
    /// response types themselves.
    pub fn success_response(self) -> Option<MessageType> {
        match self {
            MessageType::QueryRaw => Some(MessageType::ResponseRaw),
            MessageType::QueryJson => Some(MessageType::ResponseJson),
            MessageType::QueryBinary => Some(MessageType::ResponseBinary),
            MessageType::QueryStream => Some(MessageType::ResponseStream),
            _ => None,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self, FrameError> {
        match tag {
            1 => Ok(MessageType::QueryRaw),
            2 => Ok(MessageType::QueryJson),
            3 => Ok(MessageType::QueryBinary),
            4 => Ok(MessageType::QueryStream),
            11 => Ok(MessageType::ResponseRaw),
            12 => Ok(MessageType::ResponseJson),
            13 => Ok(MessageType::ResponseBinary),
            14 => Ok(MessageType::ResponseStream),
            99 => Ok(MessageType::ResponseError),
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }
}

/// Decoded message header: raw tag byte plus declared payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: u8,
    pub payload_len: u32,
}

impl Header {
    pub fn new(message_type: MessageType, payload_len: u32) -> Self {
        Self {
            tag: message_type.tag(),
            payload_len,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.tag;
        buf[1..].copy_from_slice(&self.payload_len.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_SIZE {
            return Err(FrameError::ShortBuffer(buf.len()));
        }
        let payload_len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        Ok(Self {
            tag: buf[0],
            payload_len,
        })
    }
}

/// Reads one frame from the stream.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly at a
/// frame boundary. Closure mid-header or mid-payload yields
/// [`FrameError::UnexpectedEof`]: the stream can no longer be
/// resynchronized and the caller must drop the connection.
pub fn read_frame<R: Read>(
    reader: &mut R,
    max_payload: u32,
) -> Result<Option<(Header, Vec<u8>)>, FrameError> {
    let Some(header) = read_header(reader)? else {
        return Ok(None);
    };

    if header.payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: header.payload_len,
            max: max_payload,
        });
    }

    let mut payload = vec![0u8; header.payload_len as usize];
    if !payload.is_empty() {
        reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                FrameError::UnexpectedEof
            } else {
                FrameError::Io(e)
            }
        })?;
    }

    Ok(Some((header, payload)))
}

/// Writes one frame, header then payload, and flushes.
pub fn write_frame<W: Write>(
    writer: &mut W,
    message_type: MessageType,
    payload: &[u8],
) -> Result<(), FrameError> {
    let header = Header::new(message_type, payload.len() as u32);
    writer.write_all(&header.encode())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut R) -> Result<Option<Header>, FrameError> {
    let mut buf = [0u8; HEADER_SIZE];
    let mut filled = 0;

    while filled < HEADER_SIZE {
        match reader.read(&mut buf[filled..]) {
            // EOF before any header byte is a clean close; after the
            // first byte it is a torn frame.
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(FrameError::UnexpectedEof),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }

    Header::decode(&buf).map(Some)
}
