//! Optional JSON settings file supplying option defaults.
//!
//! `LSPCHECK_JSON_SETTINGS_PATH` may point at a settings file directly or
//! at a directory containing `.lspcheck.json`. Its `defaultValues` object
//! fills in options the user did not pass on the command line, which lets
//! a wrapper script ship a preconfigured checker for one fixed server.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const SETTINGS_PATH_ENV: &str = "LSPCHECK_JSON_SETTINGS_PATH";
const SETTINGS_FILE_NAME: &str = ".lspcheck.json";

#[derive(Debug, Default)]
pub struct Settings {
    file_path: Option<PathBuf>,
    values: serde_json::Value,
}

impl Settings {
    /// Locate and parse the settings file named by the environment.
    ///
    /// No environment variable, or a path that is neither a settings file
    /// nor a directory containing one, yields empty settings. A settings
    /// file that exists but does not parse is a precondition failure.
    pub fn load() -> Result<Self> {
        let Some(raw) = std::env::var_os(SETTINGS_PATH_ENV) else {
            return Ok(Self::default());
        };

        let path = PathBuf::from(raw);
        if path.is_file() {
            return Self::from_file(&path);
        }
        if path.is_dir() {
            let candidate = path.join(SETTINGS_FILE_NAME);
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let values = serde_json::from_str(&content)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        Ok(Self {
            file_path: Some(path.to_path_buf()),
            values,
        })
    }

    /// Walk nested objects by key; `None` as soon as a key is missing.
    #[must_use]
    pub fn value(&self, keys: &[&str]) -> Option<&serde_json::Value> {
        let mut current = &self.values;
        for key in keys {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// The `defaultValues` entry for one command-line option.
    #[must_use]
    pub fn default_value(&self, option: &str) -> Option<&serde_json::Value> {
        self.value(&["defaultValues", option])
    }

    /// Directory of the settings file; the fallback working directory for
    /// the server when nothing else specifies one.
    #[must_use]
    pub fn settings_dir(&self) -> Option<&Path> {
        self.file_path.as_deref().and_then(Path::parent)
    }

    /// Display name override for help output.
    #[must_use]
    pub fn program_name(&self) -> Option<&str> {
        self.value(&["programName"]).and_then(|v| v.as_str())
    }
}

/// Split a server command line on spaces, honoring `\ ` escapes so
/// executable paths may contain spaces.
#[must_use]
pub fn split_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                chars.next();
                current.push(' ');
            }
            ' ' => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// A settings-file command line: either an array of argument strings or a
/// single string with space-separated (escapable) arguments.
#[must_use]
pub fn command_line_from_value(value: &serde_json::Value) -> Option<Vec<String>> {
    match value {
        serde_json::Value::Array(entries) => entries
            .iter()
            .map(|e| e.as_str().map(String::from))
            .collect(),
        serde_json::Value::String(s) => Some(split_command_line(s)),
        _ => None,
    }
}
