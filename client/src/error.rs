//! Session-level failure conditions.

use std::time::Duration;

/// Why a session operation could not complete.
///
/// `Desynchronized` and `WorkerExited` are fatal to the whole run: the
/// wire protocol is stateful, so once framing breaks or the server dies
/// there is nothing sensible left to do with the connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The byte stream no longer parses as framed JSON-RPC.
    #[error("protocol stream desynchronized: {0}")]
    Desynchronized(String),

    /// The server process closed its output before `shutdown` was requested.
    #[error("language server exited unexpectedly")]
    WorkerExited,

    /// No response arrived within the configured deadline.
    #[error("no response from language server within {0:?}")]
    NoResponse(Duration),

    /// The server answered a request with a JSON-RPC error object.
    #[error("language server error: {0}")]
    Rpc(String),

    /// A message could not be built or understood.
    #[error("protocol error: {0}")]
    Protocol(String),
}
