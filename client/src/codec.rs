//! Length-prefixed JSON-RPC framing over the server's standard streams.
//!
//! Each message is `Content-Length: N\r\n\r\n` followed by N body bytes of
//! UTF-8 JSON. [`MessageReader`] additionally classifies every inbound
//! frame into a [`RawMessage`], so the connection's reader loop only ever
//! sees well-formed traffic.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Upper bound on a single frame; anything larger is a protocol error.
const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// An inbound frame, classified by shape.
#[derive(Debug)]
pub enum RawMessage {
    /// Has an `id` and a `result` or `error` member: answers one of our
    /// outstanding requests.
    Response { id: u64, body: serde_json::Value },
    /// Has an `id` and a `method`: the server wants an answer from us.
    Request {
        id: serde_json::Value,
        method: String,
        params: Option<serde_json::Value>,
    },
    /// Has a `method` but no `id`: fire-and-forget.
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

fn classify(frame: serde_json::Value) -> Option<RawMessage> {
    let has_id = frame.get("id").is_some();
    let method = frame
        .get("method")
        .and_then(|m| m.as_str())
        .map(String::from);
    let is_reply = frame.get("result").is_some() || frame.get("error").is_some();

    match (has_id, method, is_reply) {
        (true, None, true) => Some(RawMessage::Response {
            id: frame.get("id")?.as_u64()?,
            body: frame,
        }),
        (true, Some(method), _) => Some(RawMessage::Request {
            id: frame.get("id")?.clone(),
            method,
            params: frame.get("params").cloned(),
        }),
        (false, Some(method), _) => Some(RawMessage::Notification {
            method,
            params: frame.get("params").cloned(),
        }),
        _ => None,
    }
}

/// Reads and classifies framed messages from the server's stdout.
pub struct MessageReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Next classified message.
    ///
    /// `Ok(None)` means the stream closed cleanly between frames. Frames
    /// that parse as JSON but fit no JSON-RPC shape are skipped, not fatal;
    /// malformed headers, truncated bodies, or invalid JSON are fatal.
    pub async fn read_message(&mut self) -> Result<Option<RawMessage>> {
        loop {
            let Some(length) = self.read_headers().await? else {
                return Ok(None);
            };

            if length > MAX_MESSAGE_BYTES {
                bail!("Content-Length {length} exceeds maximum {MAX_MESSAGE_BYTES}");
            }

            let mut body = vec![0u8; length];
            self.reader
                .read_exact(&mut body)
                .await
                .context("reading message body")?;

            let frame: serde_json::Value =
                serde_json::from_slice(&body).context("parsing JSON-RPC body")?;

            match classify(frame) {
                Some(message) => return Ok(Some(message)),
                None => {
                    tracing::trace!("skipping frame with no JSON-RPC shape");
                }
            }
        }
    }

    /// Parse the header block, returning the declared body length.
    ///
    /// `Ok(None)` only when EOF arrives before any header byte; EOF inside
    /// a header block is an error, since the peer was mid-message.
    async fn read_headers(&mut self) -> Result<Option<usize>> {
        let mut content_length = None;
        let mut line = String::new();
        let mut started = false;

        loop {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .context("reading header line")?;

            if n == 0 {
                if started {
                    bail!("unexpected EOF inside message headers");
                }
                return Ok(None);
            }
            started = true;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }

            if let Some((name, value)) = trimmed.split_once(':')
                && name.eq_ignore_ascii_case("Content-Length")
            {
                content_length = Some(
                    value
                        .trim()
                        .parse::<usize>()
                        .context("invalid Content-Length value")?,
                );
            }
            // Other headers (Content-Type) carry no information we need.
        }

        content_length
            .map(Some)
            .context("message headers carried no Content-Length")
    }
}

/// Writes framed messages to the server's stdin.
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize, prepend the byte-length header, write, flush.
    pub async fn write_message(&mut self, message: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_string(message).context("serializing message")?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.writer
            .write_all(header.as_bytes())
            .await
            .context("writing message header")?;
        self.writer
            .write_all(body.as_bytes())
            .await
            .context("writing message body")?;
        self.writer.flush().await.context("flushing message")?;
        Ok(())
    }
}
