// portly-api: SSH session handling, command batching and CLI output parsers
// for HP ProCurve / Aruba switches.

pub mod batch;
pub mod commands;
pub mod error;
pub mod parse;
pub mod session;
pub mod ssh;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use batch::{BatchExecutor, CommandOutput, OutputStatus};
pub use commands::{ReadCommand, WriteOp};
pub use error::Error;
pub use session::{SessionGuard, SessionManager};
pub use ssh::SshConnector;
pub use transport::{Connector, Shell, TransportConfig};
