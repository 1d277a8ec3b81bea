use std::io;
use std::net::TcpStream;

use log::debug;
use thiserror::Error;

use crate::protocol::codec::{
    self, BinaryTable, CodecError, RowTable, StreamEvent,
};
use crate::protocol::frame::{self, DEFAULT_MAX_PAYLOAD, FrameError, MessageType};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("unexpected response type: expected tag {expected}, got tag {actual}")]
    UnexpectedResponse { expected: u8, actual: u8 },
    #[error("server closed the connection")]
    Disconnected,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Synchronous client for the query-relay protocol.
///
/// Owns one TCP connection and runs one framed exchange at a time: each
/// `query_*` call writes a single request and blocks until the single
/// matching response has been read in full. Taking `&mut self` makes the
/// half-duplex discipline structural; there is no way to pipeline a
/// second request while one is outstanding.
#[derive(Debug)]
pub struct RelayClient {
    stream: TcpStream,
    max_payload: u32,
}

impl RelayClient {
    /// Resolves `host:port` and opens the connection.
    pub fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((host, port))?;
        debug!("connected to {host}:{port}");
        Ok(Self {
            stream,
            max_payload: DEFAULT_MAX_PAYLOAD,
        })
    }

    /// Overrides the payload size cap enforced on responses.
    pub fn with_max_payload(mut self, max_payload: u32) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Executes a query and decodes the Row-Table response. NULL cells
    /// arrive as empty strings on this path.
    pub fn query_raw(&mut self, sql: &str) -> Result<RowTable, ClientError> {
        let payload = self.exchange(MessageType::QueryRaw, MessageType::ResponseRaw, sql)?;
        Ok(codec::decode_row_table(&payload)?)
    }

    /// Executes a query and returns the Document response as parsed
    /// JSON: an array of per-row objects, NULL preserved.
    pub fn query_json(&mut self, sql: &str) -> Result<serde_json::Value, ClientError> {
        let payload = self.exchange(MessageType::QueryJson, MessageType::ResponseJson, sql)?;
        Ok(codec::decode_document(&payload)?)
    }

    /// Executes a query and decodes the Columnar-Binary response.
    pub fn query_binary(&mut self, sql: &str) -> Result<BinaryTable, ClientError> {
        let payload = self.exchange(MessageType::QueryBinary, MessageType::ResponseBinary, sql)?;
        Ok(codec::decode_columnar(&payload)?)
    }

    /// Executes a query and decodes the Chunked-Stream response into its
    /// ordered event sequence.
    pub fn query_stream(&mut self, sql: &str) -> Result<Vec<StreamEvent>, ClientError> {
        let payload = self.exchange(MessageType::QueryStream, MessageType::ResponseStream, sql)?;
        Ok(codec::decode_stream(&payload)?)
    }

    /// One request/response exchange. Error responses and mismatched
    /// response types surface as errors; the matching payload comes back
    /// for the caller to decode.
    fn exchange(
        &mut self,
        request: MessageType,
        expected: MessageType,
        sql: &str,
    ) -> Result<Vec<u8>, ClientError> {
        frame::write_frame(&mut self.stream, request, sql.as_bytes())?;

        let Some((header, payload)) = frame::read_frame(&mut self.stream, self.max_payload)?
        else {
            return Err(ClientError::Disconnected);
        };

        if header.tag == MessageType::ResponseError.tag() {
            return Err(ClientError::Server(codec::decode_error(&payload)?));
        }
        if header.tag != expected.tag() {
            return Err(ClientError::UnexpectedResponse {
                expected: expected.tag(),
                actual: header.tag,
            });
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use crate::protocol::frame::{read_frame, write_frame};

    use super::*;

    /// Accepts one connection, reads one frame, answers with the given
    /// response, then closes.
    fn one_shot_server(response_type: MessageType, body: Vec<u8>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let frame = read_frame(&mut stream, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
            assert_eq!(frame.0.tag, MessageType::QueryRaw.tag());
            write_frame(&mut stream, response_type, &body).unwrap();
        });

        port
    }

    #[test]
    fn server_error_surfaces_as_client_error() {
        let body = codec::encode_error("syntax error at or near \"FORM\"").unwrap();
        let port = one_shot_server(MessageType::ResponseError, body);

        let mut client = RelayClient::connect("127.0.0.1", port).unwrap();
        let err = client.query_raw("SELECT * FORM t").unwrap_err();
        match err {
            ClientError::Server(message) => {
                assert_eq!(message, "syntax error at or near \"FORM\"");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_response_type_is_rejected() {
        let port = one_shot_server(MessageType::ResponseJson, b"[]".to_vec());

        let mut client = RelayClient::connect("127.0.0.1", port).unwrap();
        let err = client.query_raw("SELECT 1").unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedResponse {
                expected: 11,
                actual: 12,
            }
        ));
    }

    #[test]
    fn client_is_debug_formattable() {
        // `unwrap_err` on a `Result<RelayClient, _>` needs this bound.
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_debug::<RelayClient>();
    }

    #[test]
    fn connect_failure_is_a_connection_error() {
        // Port 1 on localhost is essentially never listening.
        let err = RelayClient::connect("127.0.0.1", 1).unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
    }
}
