//! JSON-RPC envelopes and LSP parameter/result models.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{CodeAction, Diagnostic, Range};

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub(crate) struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    pub fn new(id: u64, method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// Reply to a server-initiated request.
pub(crate) fn response_frame(id: &serde_json::Value, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// `-32601` reply for request methods we do not implement.
pub(crate) fn method_not_found_frame(id: &serde_json::Value, method: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": -32601,
            "message": format!("Method not found: {method}"),
        }
    })
}

pub(crate) fn initialize_params(root_uri: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "capabilities": {
            "textDocument": {
                "synchronization": {
                    "dynamicRegistration": false
                },
                "publishDiagnostics": {
                    "relatedInformation": false
                },
                "codeAction": {
                    "codeActionLiteralSupport": {
                        "codeActionKind": { "valueSet": ["quickfix"] }
                    }
                }
            },
            "workspace": {
                "configuration": true
            }
        }
    })
}

pub(crate) fn did_open_params(
    uri: &str,
    language_id: &str,
    version: i32,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": language_id,
            "version": version,
            "text": text
        }
    })
}

pub(crate) fn did_close_params(uri: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": { "uri": uri }
    })
}

/// Code-action request scoped to a single diagnostic's range, with a
/// context naming just that diagnostic.
pub(crate) fn code_action_params(
    uri: &str,
    range: Range,
    diagnostic: &Diagnostic,
) -> serde_json::Value {
    serde_json::json!({
        "textDocument": { "uri": uri },
        "range": range,
        "context": { "diagnostics": [diagnostic] }
    })
}

/// Parse a `textDocument/codeAction` result.
///
/// The wire carries a nullable array of `Command | CodeAction`. A bare
/// command has a string `command` member at the top level; a code action
/// carries a title and optionally a nested command object.
pub(crate) fn parse_code_actions(result: &serde_json::Value) -> Vec<CodeAction> {
    let Some(entries) = result.as_array() else {
        return Vec::new();
    };

    let mut actions = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(title) = entry.get("title").and_then(|t| t.as_str()) else {
            tracing::trace!("skipping code-action entry without a title");
            continue;
        };

        if entry.get("command").is_some_and(serde_json::Value::is_string) {
            actions.push(CodeAction::Command {
                title: title.to_string(),
            });
        } else {
            actions.push(CodeAction::QuickFix {
                title: title.to_string(),
                has_command: entry.get("command").is_some_and(serde_json::Value::is_object),
            });
        }
    }
    actions
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublishDiagnosticsParams {
    pub uri: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfigurationParams {
    pub items: Vec<serde_json::Value>,
}

pub fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}
