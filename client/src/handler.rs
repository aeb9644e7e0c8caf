//! Answers for server-initiated requests and notifications.
//!
//! Runs on the connection's reader task, so nothing here may block on
//! user interaction or panic on unknown traffic.

use std::sync::Arc;

use crate::diagnostics::DiagnosticsStore;
use crate::protocol::{ConfigurationParams, PublishDiagnosticsParams};

/// Outcome of a server-initiated request.
#[derive(Debug)]
pub(crate) enum Reply {
    Result(serde_json::Value),
    MethodNotFound,
}

/// The inbound half of the client: a static configuration blob plus the
/// diagnostics store both shared with the driver.
pub(crate) struct ClientHandler {
    configuration: serde_json::Value,
    diagnostics: Arc<DiagnosticsStore>,
}

impl ClientHandler {
    pub fn new(configuration: serde_json::Value, diagnostics: Arc<DiagnosticsStore>) -> Self {
        Self {
            configuration,
            diagnostics,
        }
    }

    /// Answer a server request. Unknown methods become a JSON-RPC
    /// method-not-found error, never a dropped reply (the server may be
    /// blocked on it).
    pub fn handle_request(&self, method: &str, params: Option<&serde_json::Value>) -> Reply {
        match method {
            // One copy of the configuration blob per requested item,
            // same order, count matching exactly. Item scopes are
            // ignored: the blob is static.
            "workspace/configuration" => {
                let count = params
                    .and_then(|p| serde_json::from_value::<ConfigurationParams>(p.clone()).ok())
                    .map_or(0, |p| p.items.len());
                let entries = vec![self.configuration.clone(); count];
                Reply::Result(serde_json::Value::Array(entries))
            }
            // This client never prompts; acknowledge with "no action".
            "window/showMessageRequest" => Reply::Result(serde_json::Value::Null),
            "window/workDoneProgress/create" => Reply::Result(serde_json::Value::Null),
            _ => {
                tracing::debug!("server request '{method}' has no handler");
                Reply::MethodNotFound
            }
        }
    }

    /// Consume a server notification. Unknown methods are ignored.
    pub fn handle_notification(&self, method: &str, params: Option<&serde_json::Value>) {
        match method {
            "textDocument/publishDiagnostics" => {
                let Some(params) = params else {
                    tracing::debug!("publishDiagnostics without params");
                    return;
                };
                match serde_json::from_value::<PublishDiagnosticsParams>(params.clone()) {
                    Ok(publish) => {
                        tracing::debug!(
                            uri = %publish.uri,
                            count = publish.diagnostics.len(),
                            "diagnostics published"
                        );
                        self.diagnostics.publish(publish.uri, publish.diagnostics);
                    }
                    Err(e) => tracing::debug!("unparsable publishDiagnostics: {e}"),
                }
            }
            "window/showMessage" | "window/logMessage" => {
                let message = params
                    .and_then(|p| p.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("");
                tracing::debug!("server message: {message}");
            }
            "telemetry/event" => {
                tracing::trace!("telemetry event discarded");
            }
            _ => {
                tracing::trace!("ignoring notification '{method}'");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_with(config: serde_json::Value) -> (ClientHandler, Arc<DiagnosticsStore>) {
        let store = Arc::new(DiagnosticsStore::new());
        (ClientHandler::new(config, store.clone()), store)
    }

    #[test]
    fn configuration_returns_one_blob_per_item() {
        let blob = serde_json::json!({ "checker": { "language": "en-US" } });
        let (handler, _) = handler_with(blob.clone());

        let params = serde_json::json!({
            "items": [
                { "section": "checker" },
                { "section": "other", "scopeUri": "file:///doc.md" },
                {}
            ]
        });

        match handler.handle_request("workspace/configuration", Some(&params)) {
            Reply::Result(value) => {
                let entries = value.as_array().unwrap();
                assert_eq!(entries.len(), 3);
                assert!(entries.iter().all(|e| *e == blob));
            }
            Reply::MethodNotFound => panic!("configuration must be handled"),
        }
    }

    #[test]
    fn configuration_with_no_items_is_empty() {
        let (handler, _) = handler_with(serde_json::json!({}));
        let params = serde_json::json!({ "items": [] });
        match handler.handle_request("workspace/configuration", Some(&params)) {
            Reply::Result(value) => assert_eq!(value, serde_json::json!([])),
            Reply::MethodNotFound => panic!("configuration must be handled"),
        }
    }

    #[test]
    fn show_message_request_acknowledged_without_blocking() {
        let (handler, _) = handler_with(serde_json::json!({}));
        let params = serde_json::json!({
            "type": 1,
            "message": "pick one",
            "actions": [{ "title": "a" }, { "title": "b" }]
        });
        match handler.handle_request("window/showMessageRequest", Some(&params)) {
            Reply::Result(value) => assert!(value.is_null()),
            Reply::MethodNotFound => panic!("showMessageRequest must be handled"),
        }
    }

    #[test]
    fn unknown_request_is_method_not_found() {
        let (handler, _) = handler_with(serde_json::json!({}));
        assert!(matches!(
            handler.handle_request("client/registerCapability", None),
            Reply::MethodNotFound
        ));
    }

    #[test]
    fn publish_diagnostics_lands_in_the_store() {
        let (handler, store) = handler_with(serde_json::json!({}));
        let params = serde_json::json!({
            "uri": "file:///doc.md",
            "diagnostics": [{
                "range": { "start": { "line": 0, "character": 0 },
                           "end": { "line": 0, "character": 3 } },
                "severity": 2,
                "message": "bad token"
            }]
        });

        handler.handle_notification("textDocument/publishDiagnostics", Some(&params));

        let items = store.get("file:///doc.md").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message, "bad token");
    }

    #[test]
    fn republish_replaces_wholesale() {
        let (handler, store) = handler_with(serde_json::json!({}));
        let publish = |msgs: &[&str]| {
            let diagnostics: Vec<_> = msgs
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "range": { "start": { "line": 0, "character": 0 },
                                   "end": { "line": 0, "character": 1 } },
                        "message": m
                    })
                })
                .collect();
            serde_json::json!({ "uri": "file:///doc.md", "diagnostics": diagnostics })
        };

        handler.handle_notification("textDocument/publishDiagnostics", Some(&publish(&["a", "b"])));
        handler.handle_notification("textDocument/publishDiagnostics", Some(&publish(&["c"])));

        let items = store.get("file:///doc.md").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message, "c");
    }

    #[test]
    fn log_telemetry_and_unknown_notifications_are_harmless() {
        let (handler, store) = handler_with(serde_json::json!({}));
        handler.handle_notification(
            "window/logMessage",
            Some(&serde_json::json!({ "type": 3, "message": "hello" })),
        );
        handler.handle_notification("window/showMessage", None);
        handler.handle_notification("telemetry/event", Some(&serde_json::json!({"k": 1})));
        handler.handle_notification("$/progress", None);
        assert!(store.get("file:///doc.md").is_none());
    }

    #[test]
    fn malformed_publish_params_do_not_poison_the_store() {
        let (handler, store) = handler_with(serde_json::json!({}));
        handler.handle_notification(
            "textDocument/publishDiagnostics",
            Some(&serde_json::json!({ "unexpected": true })),
        );
        assert!(store.get("file:///doc.md").is_none());
    }
}
