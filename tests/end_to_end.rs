//! Client/server round trips over a real TCP socket.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use sqlrelay::executor::{ExecutorError, FixtureExecutor, QueryExecutor};
use sqlrelay::protocol::codec::{self, StreamEvent};
use sqlrelay::protocol::frame::{DEFAULT_MAX_PAYLOAD, MessageType, read_frame, write_frame};
use sqlrelay::protocol::{ClientError, RelayClient, RelayServer};
use sqlrelay::table::TabularResult;

fn start_server(executor: Arc<dyn QueryExecutor>) -> u16 {
    let address = "127.0.0.1:0".parse().unwrap();
    let server = RelayServer::bind(address, executor).unwrap();
    let port = server.local_addr().unwrap().port();
    thread::spawn(move || {
        let _ = server.listen();
    });
    port
}

/// Fails queries containing "boom", answers the fixture rows otherwise.
struct TouchyExecutor {
    fixture: FixtureExecutor,
}

impl QueryExecutor for TouchyExecutor {
    fn execute(&self, sql: &str) -> Result<TabularResult, ExecutorError> {
        if sql.contains("boom") {
            return Err(ExecutorError::new("query rejected"));
        }
        self.fixture.execute(sql)
    }
}

#[test]
fn raw_query_returns_fixture_rows() {
    let port = start_server(Arc::new(FixtureExecutor::new()));
    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();

    let table = client.query_raw("SELECT * FROM trades").unwrap();
    assert_eq!(table.columns, vec!["id", "name", "value"]);
    assert_eq!(
        table.rows,
        vec![
            vec!["1", "test1", "100"],
            vec!["2", "test2", "200"],
            vec!["3", "test3", "300"],
        ]
    );
}

#[test]
fn json_query_returns_documents_keyed_by_column() {
    let port = start_server(Arc::new(FixtureExecutor::new()));
    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();

    let value = client.query_json("SELECT * FROM trades").unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["id"], "1");
    assert_eq!(rows[1]["name"], "test2");
    assert_eq!(rows[2]["value"], "300");
}

#[test]
fn binary_query_returns_counts_and_cells() {
    let port = start_server(Arc::new(FixtureExecutor::new()));
    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();

    let table = client.query_binary("SELECT * FROM trades").unwrap();
    assert_eq!(table.row_count, 3);
    assert_eq!(table.col_count, 3);
    assert_eq!(table.rows[2], vec!["3", "test3", "300"]);
}

#[test]
fn stream_query_returns_ordered_events() {
    let port = start_server(Arc::new(FixtureExecutor::new()));
    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();

    let events = client.query_stream("SELECT * FROM trades").unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(
        events[0],
        StreamEvent::Metadata {
            columns: vec!["id".to_string(), "name".to_string(), "value".to_string()],
        }
    );
    for (i, event) in events[1..4].iter().enumerate() {
        match event {
            StreamEvent::Row { index, .. } => assert_eq!(*index, i as u64),
            other => panic!("expected row event, got {other:?}"),
        }
    }
    assert_eq!(events[4], StreamEvent::End { total_rows: 3 });
}

#[test]
fn session_survives_query_error() {
    let port = start_server(Arc::new(TouchyExecutor {
        fixture: FixtureExecutor::new(),
    }));
    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();

    let err = client.query_raw("SELECT boom").unwrap_err();
    match err {
        ClientError::Server(message) => assert_eq!(message, "query rejected"),
        other => panic!("expected server error, got {other:?}"),
    }

    // Same connection still serves the next request.
    let table = client.query_raw("SELECT * FROM trades").unwrap();
    assert_eq!(table.rows.len(), 3);
}

#[test]
fn null_cells_survive_or_collapse_per_encoding() {
    let result = TabularResult::new(
        vec!["a".to_string(), "b".to_string()],
        vec![vec![Some("x".to_string()), None]],
    );
    let port = start_server(Arc::new(FixtureExecutor::with_result(result)));
    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();

    // Lossy paths: NULL flattens to an empty cell.
    assert_eq!(client.query_raw("q").unwrap().rows[0], vec!["x", ""]);
    assert_eq!(client.query_binary("q").unwrap().rows[0], vec!["x", ""]);

    // Lossless paths: NULL stays null.
    let value = client.query_json("q").unwrap();
    assert!(value[0]["b"].is_null());
    let events = client.query_stream("q").unwrap();
    assert_eq!(
        events[1],
        StreamEvent::Row {
            index: 0,
            data: vec![Some("x".to_string()), None],
        }
    );
}

#[test]
fn unknown_tag_gets_error_response_then_session_continues() {
    let port = start_server(Arc::new(FixtureExecutor::new()));
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();

    // Raw frame with an unassigned tag.
    stream
        .set_nodelay(true)
        .and_then(|()| {
            use std::io::Write;
            let mut bytes = vec![42u8];
            bytes.extend_from_slice(&4u32.to_be_bytes());
            bytes.extend_from_slice(b"junk");
            stream.write_all(&bytes)
        })
        .unwrap();

    let (header, payload) = read_frame(&mut stream, DEFAULT_MAX_PAYLOAD)
        .unwrap()
        .unwrap();
    assert_eq!(header.tag, MessageType::ResponseError.tag());
    assert_eq!(codec::decode_error(&payload).unwrap(), "unknown message type");

    // The stream stayed in sync; a well-formed request still works.
    write_frame(&mut stream, MessageType::QueryRaw, b"SELECT 1").unwrap();
    let (header, _) = read_frame(&mut stream, DEFAULT_MAX_PAYLOAD)
        .unwrap()
        .unwrap();
    assert_eq!(header.tag, MessageType::ResponseRaw.tag());
}

#[test]
fn sessions_are_independent() {
    let port = start_server(Arc::new(FixtureExecutor::new()));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(move || {
                let mut client = RelayClient::connect("127.0.0.1", port).unwrap();
                for _ in 0..10 {
                    let table = client.query_raw("SELECT * FROM trades").unwrap();
                    assert_eq!(table.rows.len(), 3);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn oversized_request_closes_only_that_session() {
    let address = "127.0.0.1:0".parse().unwrap();
    let server = RelayServer::bind(address, Arc::new(FixtureExecutor::new()))
        .unwrap()
        .with_max_payload(64);
    let port = server.local_addr().unwrap().port();
    thread::spawn(move || {
        let _ = server.listen();
    });

    // A request over the cap is stream corruption; the session drops
    // with no response.
    let mut oversized = RelayClient::connect("127.0.0.1", port).unwrap();
    let sql = "x".repeat(128);
    assert!(oversized.query_raw(&sql).is_err());

    // The listener is unaffected.
    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();
    assert_eq!(client.query_raw("SELECT 1").unwrap().rows.len(), 3);
}

#[test]
fn peer_disconnect_while_idle_is_quiet() {
    let port = start_server(Arc::new(FixtureExecutor::new()));

    // Connect and immediately drop without sending anything; the server
    // must keep accepting afterwards.
    drop(TcpStream::connect(("127.0.0.1", port)).unwrap());

    let mut client = RelayClient::connect("127.0.0.1", port).unwrap();
    assert_eq!(client.query_raw("SELECT 1").unwrap().rows.len(), 3);
}
