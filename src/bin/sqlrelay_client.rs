use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use sqlrelay::cli::{Command, QueryKind, parse_line};
use sqlrelay::protocol::RelayClient;
use sqlrelay::protocol::codec::{BinaryTable, RowTable, StreamEvent};

const DEFAULT_PORT: &str = "9090";

#[derive(Debug, Parser)]
#[command(version, about = "Interactive SQL query-relay client")]
struct Cli {
    /// Server hostname or IP
    #[arg(default_value = "localhost")]
    host: String,
    /// Server port number
    #[arg(default_value = DEFAULT_PORT)]
    port: String,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let port: u16 = match cli.port.parse() {
        Ok(port) if port > 0 => port,
        _ => {
            eprintln!("error: port must be between 1 and 65535");
            return ExitCode::FAILURE;
        }
    };

    println!("connecting to {}:{}...", cli.host, port);
    let mut client = match RelayClient::connect(&cli.host, port) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("connected");
    print_help();

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    loop {
        let mut line = String::default();

        if write!(&mut stdout, "sql> ").and_then(|()| stdout.flush()).is_err() {
            break;
        }
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("error: {e}");
                break;
            }
        }

        // Only Command::Query touches the connection; everything else is
        // resolved locally.
        match parse_line(&line) {
            Command::Ignore => continue,
            Command::Quit => {
                println!("goodbye!");
                break;
            }
            Command::Usage(kind) => println!("usage: {} <sql>", kind.keyword()),
            Command::Unknown(word) => {
                println!("unknown command: {word}");
                println!("use one of raw, json, binary, stream; quit to exit");
            }
            Command::Query { kind, sql } => run_query(&mut client, kind, &sql),
        }
    }

    ExitCode::SUCCESS
}

fn run_query(client: &mut RelayClient, kind: QueryKind, sql: &str) {
    match kind {
        QueryKind::Raw => match client.query_raw(sql) {
            Ok(table) => print_row_table(&table),
            Err(e) => eprintln!("error: {e}"),
        },
        QueryKind::Json => match client.query_json(sql) {
            Ok(value) => print_json(&value),
            Err(e) => eprintln!("error: {e}"),
        },
        QueryKind::Binary => match client.query_binary(sql) {
            Ok(table) => print_binary(&table),
            Err(e) => eprintln!("error: {e}"),
        },
        QueryKind::Stream => match client.query_stream(sql) {
            Ok(events) => print_stream(&events),
            Err(e) => eprintln!("error: {e}"),
        },
    }
}

fn print_help() {
    println!("commands:");
    println!("  raw <sql>    - execute query, print row table");
    println!("  json <sql>   - execute query, print JSON documents");
    println!("  binary <sql> - execute query, print decoded binary table");
    println!("  stream <sql> - execute query, print result events");
    println!("  quit         - exit the client");
}

fn print_row_table(table: &RowTable) {
    println!("{}", table.columns.join(" | "));
    let separator = table
        .columns
        .iter()
        .map(|column| "-".repeat(column.len()))
        .collect::<Vec<_>>()
        .join("-+-");
    println!("{separator}");

    for row in &table.rows {
        println!("{}", row.join(" | "));
    }
    println!("total rows: {}", table.rows.len());
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{value}"),
    }
}

fn print_binary(table: &BinaryTable) {
    println!("rows: {}, columns: {}", table.row_count, table.col_count);
    for (index, row) in table.rows.iter().enumerate() {
        println!("row {index}: {}", row.join(" | "));
    }
}

fn print_stream(events: &[StreamEvent]) {
    for event in events {
        match event {
            StreamEvent::Metadata { columns } => {
                println!("metadata: columns {}", columns.join(", "));
            }
            StreamEvent::Row { index, data } => {
                let cells = data
                    .iter()
                    .map(|cell| cell.as_deref().unwrap_or("NULL"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                println!("row {index}: {cells}");
            }
            StreamEvent::End { total_rows } => {
                println!("stream ended, total rows: {total_rows}");
            }
        }
    }
}
