pub mod cli;
pub mod executor;
pub mod protocol;
pub mod table;

pub use executor::{ExecutorError, FailingExecutor, FixtureExecutor, QueryExecutor};
pub use protocol::{ClientError, MessageType, RelayClient, RelayServer};
pub use table::TabularResult;
