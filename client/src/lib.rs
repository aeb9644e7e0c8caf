//! Client engine for driving an LSP language server from the command line.
//!
//! The [`Session`] type owns a spawned server subprocess and exposes the
//! handful of operations this client needs: open a document, wait for the
//! server's published diagnostics, request code actions, shut down.
//! Server-initiated traffic (configuration queries, message requests,
//! diagnostics) is answered by [`handler::ClientHandler`] on the
//! connection's reader task.

pub mod codec;
pub mod document;
pub mod types;

pub(crate) mod connection;
pub(crate) mod handler;
pub(crate) mod protocol;

mod diagnostics;
mod error;
mod session;

pub use diagnostics::DiagnosticsStore;
pub use document::Document;
pub use error::SessionError;
pub use protocol::path_to_file_uri;
pub use session::Session;
pub use types::{CodeAction, Diagnostic, DiagnosticCode, Position, Range, Severity};
