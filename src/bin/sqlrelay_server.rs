use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::error;
use sqlrelay::FixtureExecutor;
use sqlrelay::protocol::RelayServer;

const DEFAULT_PORT: &str = "9090";

#[derive(Debug, Parser)]
#[command(version, about = "SQL query-relay server")]
struct Cli {
    /// Port number to listen on
    #[arg(default_value = DEFAULT_PORT)]
    port: String,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    // Validated by hand so a bad port exits with status 1.
    let port: u16 = match cli.port.parse() {
        Ok(port) if port > 0 => port,
        _ => {
            eprintln!("error: port must be between 1 and 65535");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!("shutting down");
        std::process::exit(0);
    }) {
        eprintln!("error: failed to install signal handler: {e}");
        return ExitCode::FAILURE;
    }

    let executor = Arc::new(FixtureExecutor::new());
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let server = match RelayServer::bind(address, executor) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("error: failed to bind port {port}: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("SQL query-relay server listening on port {port}");
    println!("supported query types:");
    println!("  raw    - row table with column names");
    println!("  json   - one JSON object per row");
    println!("  binary - length-prefixed binary cells");
    println!("  stream - ordered metadata/row/end events");
    println!("press Ctrl+C to stop");

    if let Err(e) = server.listen() {
        error!("server terminated: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
