//! Client-server query-relay protocol.
//!
//! This module defines the wire protocol spoken between relay clients and
//! servers: message framing, the four result encodings, the per-connection
//! session loop, and the synchronous client driver.
//!
//! # Overview
//!
//! A connection carries an alternating sequence of framed requests and
//! responses. The client sends one request naming a result encoding, the
//! server relays the SQL to its [`QueryExecutor`](crate::executor), encodes
//! the result in the requested representation, and writes exactly one
//! response before reading again. Sessions on different connections are
//! fully independent.
//!
//! # Binary Format
//!
//! Every message is one frame:
//!
//! - A fixed 5-byte header: one tag byte for the message type, then the
//!   payload length as a big-endian `u32`.
//! - The payload, encoded according to the message type (UTF-8 SQL text
//!   for requests; one of the four result encodings, or the JSON error
//!   body, for responses).
//!
//! Request tags are 1-4, the paired success responses 11-14, and the
//! error response 99. Any request may be answered with the error response
//! instead of its paired type.
//!
//! # Key Components
//!
//! - [`MessageType`] and the framing helpers in [`frame`].
//! - [`codec`]: the Row-Table, Document, Columnar-Binary, and
//!   Chunked-Stream encoder/decoder pairs.
//! - [`RelayServer`]: listener plus per-connection session loop.
//! - [`RelayClient`]: one-request-one-response client driver.
//!
//! # See Also
//!
//! - [`executor`](crate::executor): the seam to whatever actually runs
//!   the SQL.
pub mod client;
pub mod codec;
pub mod frame;
pub mod server;

pub use client::{ClientError, RelayClient};
pub use frame::MessageType;
pub use server::RelayServer;
