//! Transport: owns the server subprocess and the framed message streams.
//!
//! One writer task drains outgoing frames; one reader task consumes the
//! server's stdout for the life of the process, resolving responses,
//! answering server requests through the [`ClientHandler`], and feeding
//! notifications to it. When the reader stops — clean EOF, framing error,
//! or server death — every outstanding request fails and the diagnostics
//! store is closed, so no caller is left blocked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::codec::{MessageReader, MessageWriter, RawMessage};
use crate::diagnostics::DiagnosticsStore;
use crate::error::SessionError;
use crate::handler::{ClientHandler, Reply};
use crate::protocol::{self, Notification, Request};

const WRITER_CHANNEL_CAPACITY: usize = 64;

/// How long shutdown waits, first for the server's reply and then for
/// process exit, before killing it.
const SHUTDOWN_GRACE_SECS: u64 = 2;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// Outstanding requests, plus whether the reader has stopped. Both live
/// under one lock so a request can never slip into the map after the
/// reader's final drain.
#[derive(Default)]
struct Pending {
    requests: HashMap<u64, oneshot::Sender<serde_json::Value>>,
    closed: bool,
}

type PendingMap = Arc<Mutex<Pending>>;

/// Resolve the server executable: relative to the working directory when
/// one is given, otherwise through PATH.
fn resolve_executable(program: &str, working_dir: Option<&Path>) -> Result<PathBuf> {
    match working_dir {
        Some(dir) => Ok(dir.join(program)),
        None => which::which(program).with_context(|| format!("{program} not found in PATH")),
    }
}

pub(crate) struct Connection {
    child: Child,
    writer_tx: mpsc::Sender<WriterCommand>,
    next_id: AtomicU64,
    pending: PendingMap,
    store: Arc<DiagnosticsStore>,
    response_timeout: Option<Duration>,
    #[allow(dead_code)]
    reader_handle: tokio::task::JoinHandle<()>,
    #[allow(dead_code)]
    writer_handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    /// Spawn the server and wire up both pump tasks.
    ///
    /// The child is registered with `kill_on_drop`, so it is reaped even
    /// when the host process exits without reaching `shutdown`.
    pub async fn start(
        command_line: &[String],
        working_dir: Option<&Path>,
        handler: Arc<ClientHandler>,
        store: Arc<DiagnosticsStore>,
        response_timeout: Option<Duration>,
    ) -> Result<Self> {
        let Some((program, args)) = command_line.split_first() else {
            bail!("server command line is empty");
        };

        let executable = resolve_executable(program, working_dir)?;
        tracing::info!(
            command = %executable.display(),
            "starting language server"
        );

        let mut cmd = Command::new(&executable);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // stderr is the server's own log channel, not protocol traffic.
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", executable.display()))?;

        let stdin = child.stdin.take().context("no stdin pipe from server")?;
        let stdout = child.stdout.take().context("no stdout pipe from server")?;

        let pending: PendingMap = Arc::new(Mutex::new(Pending::default()));

        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(async move {
            let mut writer = MessageWriter::new(stdin);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_message(&frame).await {
                            tracing::warn!("write to language server failed: {e}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_store = store.clone();
        let reader_writer_tx = writer_tx.clone();
        let reader_handle = tokio::spawn(async move {
            let mut reader = MessageReader::new(stdout);
            let reason = loop {
                match reader.read_message().await {
                    Ok(Some(message)) => {
                        Self::dispatch(message, &reader_pending, &handler, &reader_writer_tx)
                            .await;
                    }
                    Ok(None) => {
                        tracing::info!("language server closed its output");
                        break SessionError::WorkerExited;
                    }
                    Err(e) => {
                        tracing::warn!("protocol stream error: {e:#}");
                        break SessionError::Desynchronized(format!("{e:#}"));
                    }
                }
            };

            // Wake everything that could otherwise wait forever: the
            // store's waiters and every pending request (dropping a
            // sender fails its receiver). Marking the map closed makes
            // later requests fail instead of parking a fresh oneshot.
            reader_store.close(reason);
            let mut pending = reader_pending.lock().await;
            pending.closed = true;
            pending.requests.clear();
        });

        Ok(Self {
            child,
            writer_tx,
            next_id: AtomicU64::new(1),
            pending,
            store,
            response_timeout,
            reader_handle,
            writer_handle,
        })
    }

    async fn dispatch(
        message: RawMessage,
        pending: &Mutex<Pending>,
        handler: &ClientHandler,
        writer_tx: &mpsc::Sender<WriterCommand>,
    ) {
        match message {
            RawMessage::Response { id, body } => {
                // An id with no outstanding entry is a stale or duplicate
                // reply; drop it.
                if let Some(tx) = pending.lock().await.requests.remove(&id) {
                    let _ = tx.send(body);
                }
            }
            RawMessage::Request { id, method, params } => {
                let frame = match handler.handle_request(&method, params.as_ref()) {
                    Reply::Result(result) => protocol::response_frame(&id, result),
                    Reply::MethodNotFound => protocol::method_not_found_frame(&id, &method),
                };
                let _ = writer_tx.send(WriterCommand::Send(frame)).await;
            }
            RawMessage::Notification { method, params } => {
                handler.handle_notification(&method, params.as_ref());
            }
        }
    }

    /// Why calls are failing, once the reader has stopped.
    fn failure_reason(&self) -> SessionError {
        self.store
            .closed_reason()
            .unwrap_or(SessionError::WorkerExited)
    }

    /// Send a request and wait for its response.
    ///
    /// Safe to call from concurrent tasks; ids come from one atomic
    /// counter. With no configured timeout this waits as long as the
    /// server lives — but never past its death.
    pub async fn request(
        &self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err(self.failure_reason());
            }
            pending.requests.insert(id, tx);
        }

        let frame = serde_json::to_value(Request::new(id, method, params))
            .map_err(|e| SessionError::Protocol(e.to_string()))?;
        if self.writer_tx.send(WriterCommand::Send(frame)).await.is_err() {
            self.pending.lock().await.requests.remove(&id);
            return Err(self.failure_reason());
        }

        let body = match self.response_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(Ok(body)) => body,
                Ok(Err(_)) => return Err(self.failure_reason()),
                Err(_) => {
                    // Expired: drop the pending entry so the map cannot
                    // accumulate dead senders.
                    self.pending.lock().await.requests.remove(&id);
                    return Err(SessionError::NoResponse(limit));
                }
            },
            None => match rx.await {
                Ok(body) => body,
                Err(_) => return Err(self.failure_reason()),
            },
        };

        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(SessionError::Rpc(message.to_string()));
        }
        Ok(body.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Send a notification (no reply expected).
    pub async fn notify(
        &self,
        method: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<(), SessionError> {
        let frame = serde_json::to_value(Notification::new(method, params))
            .map_err(|e| SessionError::Protocol(e.to_string()))?;
        self.writer_tx
            .send(WriterCommand::Send(frame))
            .await
            .map_err(|_| self.failure_reason())
    }

    /// Graceful teardown: `shutdown` request, `exit` notification, bounded
    /// wait, then kill. Consumes the connection.
    pub async fn shutdown(mut self) {
        let grace = Duration::from_secs(SHUTDOWN_GRACE_SECS);

        // The shutdown reply gets a bounded wait even when the session
        // itself runs without timeouts; teardown must terminate.
        match tokio::time::timeout(grace, self.request("shutdown", None)).await {
            Ok(Ok(_)) => {
                let _ = self.notify("exit", None).await;
            }
            Ok(Err(e)) => tracing::debug!("shutdown request failed: {e}"),
            Err(_) => tracing::debug!("shutdown request timed out"),
        }

        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;

        if tokio::time::timeout(grace, self.child.wait()).await.is_err() {
            tracing::debug!("language server did not exit in time, killing");
            let _ = self.child.kill().await;
        }
    }
}
