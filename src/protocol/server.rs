use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::executor::QueryExecutor;
use crate::protocol::codec;
use crate::protocol::frame::{self, DEFAULT_MAX_PAYLOAD, FrameError, MessageType};

/// TCP listener that serves the query-relay protocol.
///
/// Each accepted connection gets its own session thread running the
/// request/response loop; sessions share nothing but the executor, so a
/// failure in one never reaches another. The executor is the single
/// collaborator shared across sessions and must tolerate concurrent
/// calls.
pub struct RelayServer {
    listener: TcpListener,
    executor: Arc<dyn QueryExecutor>,
    max_payload: u32,
}

impl RelayServer {
    /// Binds the listening socket. The accept loop does not start until
    /// [`listen`](Self::listen) is called.
    pub fn bind(address: SocketAddr, executor: Arc<dyn QueryExecutor>) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        Ok(Self {
            listener,
            executor,
            max_payload: DEFAULT_MAX_PAYLOAD,
        })
    }

    /// Overrides the payload size cap enforced on incoming frames.
    pub fn with_max_payload(mut self, max_payload: u32) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Address the server is actually bound to. Useful when binding to
    /// port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop. Accept failures are logged and skipped;
    /// they never take the listener down.
    pub fn listen(self) -> io::Result<()> {
        info!("listening at {}", self.listener.local_addr()?);

        let mut next_session: u64 = 0;
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let session = next_session;
                    next_session += 1;

                    let peer = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "<unknown>".to_string());
                    info!("session {session}: client connected from {peer}");

                    let executor = Arc::clone(&self.executor);
                    let max_payload = self.max_payload;
                    let spawned = thread::Builder::new()
                        .name(format!("session-{session}"))
                        .spawn(move || match run_session(stream, executor, max_payload) {
                            Ok(()) => debug!("session {session}: closed by peer"),
                            Err(e) => warn!("session {session}: terminated: {e}"),
                        });
                    if let Err(e) = spawned {
                        warn!("failed to spawn session thread: {e}");
                    }
                }
                Err(e) => warn!("broken connection: {e:?}"),
            }
        }
        Ok(())
    }
}

/// Per-connection request/response loop.
///
/// Reads one frame, dispatches it, writes exactly one response, repeats.
/// Request-level failures (unknown tag, bad UTF-8, executor errors) are
/// answered with an error response and the loop continues; only
/// transport-level failures end the session. A clean close while waiting
/// for the next header returns `Ok`.
pub(crate) fn run_session<S: Read + Write>(
    mut stream: S,
    executor: Arc<dyn QueryExecutor>,
    max_payload: u32,
) -> Result<(), FrameError> {
    loop {
        let Some((header, payload)) = frame::read_frame(&mut stream, max_payload)? else {
            return Ok(());
        };

        let (response_type, body) = match handle_request(header.tag, &payload, executor.as_ref()) {
            Ok(response) => response,
            Err(message) => {
                debug!("request failed: {message}");
                let body = codec::encode_error(&message)
                    .map_err(|e| FrameError::Io(io::Error::other(e)))?;
                (MessageType::ResponseError, body)
            }
        };

        frame::write_frame(&mut stream, response_type, &body)?;
    }
}

/// Dispatches one request to the executor and encodes the result with
/// the encoder paired to the request type. Any failure collapses to the
/// message string that goes out in the error response.
fn handle_request(
    tag: u8,
    payload: &[u8],
    executor: &dyn QueryExecutor,
) -> Result<(MessageType, Vec<u8>), String> {
    let Some(response_type) = MessageType::try_from(tag)
        .ok()
        .and_then(MessageType::success_response)
    else {
        return Err("unknown message type".to_string());
    };

    let sql = std::str::from_utf8(payload)
        .map_err(|_| "request body is not valid UTF-8".to_string())?;
    debug!("executing query: {sql}");

    let result = executor.execute(sql).map_err(|e| e.to_string())?;
    debug!("query returned {} rows", result.row_count());

    let body = match response_type {
        MessageType::ResponseRaw => codec::encode_row_table(&result),
        MessageType::ResponseJson => codec::encode_document(&result),
        MessageType::ResponseBinary => Ok(codec::encode_columnar(&result)),
        MessageType::ResponseStream => codec::encode_stream(&result),
        _ => return Err("unknown message type".to_string()),
    }
    .map_err(|e| e.to_string())?;

    Ok((response_type, body))
}
