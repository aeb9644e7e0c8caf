//! Typed façade over the connection: the few server operations the
//! driver needs, plus session lifecycle.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::connection::Connection;
use crate::diagnostics::DiagnosticsStore;
use crate::document::Document;
use crate::error::SessionError;
use crate::handler::ClientHandler;
use crate::protocol;
use crate::types::{CodeAction, Diagnostic, Range};

/// A live, initialized connection to one language server.
///
/// `connect` spawns the process and completes the `initialize` handshake
/// before returning, so a `Session` in hand is always ready for document
/// traffic. Holding one is the proof of initialization; there is no
/// separate init step to forget.
pub struct Session {
    connection: Connection,
    diagnostics: Arc<DiagnosticsStore>,
    response_timeout: Option<Duration>,
}

impl Session {
    /// Spawn the server, perform the handshake, return a ready session.
    ///
    /// `configuration` is the static blob echoed for every
    /// `workspace/configuration` item the server ever asks about.
    /// `response_timeout` bounds every wait on the server (requests and
    /// diagnostics); `None` preserves the wait-forever contract.
    pub async fn connect(
        command_line: &[String],
        working_dir: Option<&Path>,
        configuration: serde_json::Value,
        response_timeout: Option<Duration>,
    ) -> Result<Self> {
        let diagnostics = Arc::new(DiagnosticsStore::new());
        let handler = Arc::new(ClientHandler::new(configuration, diagnostics.clone()));

        let connection = Connection::start(
            command_line,
            working_dir,
            handler,
            diagnostics.clone(),
            response_timeout,
        )
        .await?;

        let root_uri = working_dir
            .and_then(|dir| protocol::path_to_file_uri(dir).ok())
            .map(String::from);

        tracing::info!("initializing language server");
        connection
            .request("initialize", Some(protocol::initialize_params(root_uri.as_deref())))
            .await
            .context("initialize handshake failed")?;
        connection
            .notify("initialized", Some(serde_json::json!({})))
            .await
            .context("sending initialized notification")?;

        Ok(Self {
            connection,
            diagnostics,
            response_timeout,
        })
    }

    /// Announce a document to the server (`textDocument/didOpen`).
    pub async fn open_document(&self, document: &Document) -> Result<(), SessionError> {
        self.connection
            .notify(
                "textDocument/didOpen",
                Some(protocol::did_open_params(
                    document.uri(),
                    document.language_id(),
                    document.version(),
                    document.text(),
                )),
            )
            .await
    }

    /// Tell the server we are done with a document.
    pub async fn close_document(&self, uri: &str) -> Result<(), SessionError> {
        self.connection
            .notify("textDocument/didClose", Some(protocol::did_close_params(uri)))
            .await
    }

    /// Block until the server has published diagnostics for `uri`.
    ///
    /// Honors the session's response timeout when one is configured;
    /// otherwise waits until publish or server death.
    pub async fn await_diagnostics(&self, uri: &str) -> Result<Vec<Diagnostic>, SessionError> {
        match self.response_timeout {
            Some(limit) => tokio::time::timeout(limit, self.diagnostics.wait_for(uri))
                .await
                .map_err(|_| SessionError::NoResponse(limit))?,
            None => self.diagnostics.wait_for(uri).await,
        }
    }

    /// Request code actions for one diagnostic's range.
    pub async fn code_actions(
        &self,
        uri: &str,
        range: Range,
        diagnostic: &Diagnostic,
    ) -> Result<Vec<CodeAction>, SessionError> {
        let result = self
            .connection
            .request(
                "textDocument/codeAction",
                Some(protocol::code_action_params(uri, range, diagnostic)),
            )
            .await?;
        Ok(protocol::parse_code_actions(&result))
    }

    /// The shared store, for callers that want raw access to snapshots.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<DiagnosticsStore> {
        &self.diagnostics
    }

    /// Graceful teardown; must be the last call.
    pub async fn shutdown(self) {
        tracing::info!("shutting down language server");
        self.connection.shutdown().await;
    }
}
