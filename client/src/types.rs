//! Public data model: positions, diagnostics, code actions.
//!
//! These types mirror the wire protocol closely enough to serialize back
//! verbatim (diagnostics are echoed into code-action requests), while
//! giving the driver typed accessors for rendering.

use serde::{Deserialize, Serialize};

/// A (line, character) pair, 0-indexed.
///
/// `character` counts UTF-16 code units, matching the wire protocol's
/// coordinate system. See [`crate::Document`] for conversion to byte
/// offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open span between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Severity of a diagnostic, as defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    /// Convert from the protocol's numeric severity.
    ///
    /// Returns `None` for values outside the defined 1..=4 range; callers
    /// pick the fallback.
    #[must_use]
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_lsp(self) -> u64 {
        match self {
            Self::Error => 1,
            Self::Warning => 2,
            Self::Information => 3,
            Self::Hint => 4,
        }
    }

    /// The word printed in diagnostic headers.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.to_lsp())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        // Out-of-range severities render as plain info rather than failing
        // the whole publish.
        Ok(Self::from_lsp(value).unwrap_or(Self::Information))
    }
}

/// A machine-readable diagnostic code; servers send either form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticCode {
    Number(i64),
    String(String),
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A single finding published by the server.
///
/// Received verbatim and never mutated; the same value is echoed back in
/// the context of the code-action request it triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<DiagnosticCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(range: Range, severity: Option<Severity>, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            code: None,
            source: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Severity with the unspecified case resolved to `Information`.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity.unwrap_or(Severity::Information)
    }
}

/// A remediation suggested for one diagnostic.
///
/// Exactly two shapes exist on the wire and neither carries behavior
/// beyond its title, so this is a sum type rather than anything fancier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeAction {
    /// A direct fix. `has_command` records whether the fix also references
    /// a named server command, which matters when commands are hidden.
    QuickFix { title: String, has_command: bool },
    /// A named command without an attached edit.
    Command { title: String },
}

impl CodeAction {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::QuickFix { title, .. } | Self::Command { title } => title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_from_lsp_range() {
        assert_eq!(Severity::from_lsp(1), Some(Severity::Error));
        assert_eq!(Severity::from_lsp(2), Some(Severity::Warning));
        assert_eq!(Severity::from_lsp(3), Some(Severity::Information));
        assert_eq!(Severity::from_lsp(4), Some(Severity::Hint));
        assert_eq!(Severity::from_lsp(0), None);
        assert_eq!(Severity::from_lsp(5), None);
    }

    #[test]
    fn severity_deserialize_out_of_range_falls_back_to_info() {
        let severity: Severity = serde_json::from_str("9").unwrap();
        assert_eq!(severity, Severity::Information);
    }

    #[test]
    fn severity_labels() {
        assert_eq!(Severity::Error.label(), "error");
        assert_eq!(Severity::Warning.label(), "warning");
        assert_eq!(Severity::Information.label(), "info");
        assert_eq!(Severity::Hint.label(), "hint");
    }

    #[test]
    fn diagnostic_missing_severity_resolves_to_info() {
        let diag: Diagnostic = serde_json::from_value(serde_json::json!({
            "range": { "start": { "line": 0, "character": 0 },
                       "end": { "line": 0, "character": 3 } },
            "message": "bad token"
        }))
        .unwrap();
        assert_eq!(diag.severity(), Severity::Information);
    }

    #[test]
    fn diagnostic_code_both_wire_forms() {
        let with_string: Diagnostic = serde_json::from_value(serde_json::json!({
            "range": { "start": { "line": 0, "character": 0 },
                       "end": { "line": 0, "character": 1 } },
            "message": "m",
            "code": "E0001"
        }))
        .unwrap();
        assert_eq!(
            with_string.code,
            Some(DiagnosticCode::String("E0001".into()))
        );

        let with_number: Diagnostic = serde_json::from_value(serde_json::json!({
            "range": { "start": { "line": 0, "character": 0 },
                       "end": { "line": 0, "character": 1 } },
            "message": "m",
            "code": 42
        }))
        .unwrap();
        assert_eq!(with_number.code, Some(DiagnosticCode::Number(42)));
        assert_eq!(with_number.code.unwrap().to_string(), "42");
    }

    #[test]
    fn diagnostic_serializes_without_null_members() {
        let diag = Diagnostic::new(
            Range::new(Position::new(0, 0), Position::new(0, 1)),
            Some(Severity::Warning),
            "m",
        );
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(value["severity"], 2);
        assert!(value.get("code").is_none(), "code must be omitted, not null");
        assert!(value.get("source").is_none());
    }
}
