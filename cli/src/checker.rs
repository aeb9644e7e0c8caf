//! Drives a session over the files named on the command line: open each
//! document, wait for its diagnostics, fetch the suggested actions, and
//! print the results.

use std::path::Path;

use anyhow::{Context, Result};
use lspcheck_client::{CodeAction, Document, Session};
use tokio::io::AsyncReadExt;
use walkdir::WalkDir;

use crate::lang::language_id_for_path;
use crate::render;

pub struct Checker {
    session: Session,
    hide_commands: bool,
    terminal_width: usize,
}

impl Checker {
    #[must_use]
    pub fn new(session: Session, hide_commands: bool) -> Self {
        Self {
            session,
            hide_commands,
            terminal_width: render::terminal_width(),
        }
    }

    /// Check every path in order and return the total diagnostic count.
    pub async fn check_paths(&self, paths: &[impl AsRef<Path>]) -> Result<usize> {
        let mut total = 0;
        for path in paths {
            total += self.check_path(path.as_ref()).await?;
        }
        Ok(total)
    }

    /// One command-line argument: `-` for stdin, a directory to walk, or
    /// a single file. An unreadable file is reported and skipped rather
    /// than aborting the run.
    pub async fn check_path(&self, path: &Path) -> Result<usize> {
        if path == Path::new("-") {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("reading document from stdin")?;
            return self.check_file(Path::new("-"), "plaintext", &text).await;
        }

        if path.is_dir() {
            return self.check_directory(path).await;
        }

        let language_id = language_id_for_path(path).unwrap_or("plaintext");
        let Some(text) = read_file_text(path).await else {
            return Ok(0);
        };
        self.check_file(path, language_id, &text).await
    }

    async fn check_directory(&self, dir: &Path) -> Result<usize> {
        let mut total = 0;
        for path in collect_directory_files(dir) {
            total += Box::pin(self.check_path(&path)).await?;
        }
        Ok(total)
    }

    /// Check one in-memory document and render its findings.
    async fn check_file(&self, path: &Path, language_id: &str, text: &str) -> Result<usize> {
        let uri = uri_for(path)?;
        let document = Document::new(&uri, language_id, text);

        self.session
            .open_document(&document)
            .await
            .with_context(|| format!("opening {}", path.display()))?;

        let diagnostics = self
            .session
            .await_diagnostics(&uri)
            .await
            .with_context(|| format!("waiting for diagnostics on {}", path.display()))?;

        for diagnostic in &diagnostics {
            let actions = self
                .session
                .code_actions(&uri, diagnostic.range, diagnostic)
                .await
                .with_context(|| format!("fetching code actions for {}", path.display()))?;
            let titles = filter_action_titles(&actions, self.hide_commands);
            render::print_diagnostic(path, &document, diagnostic, &titles, self.terminal_width);
        }

        // Best effort only; a server that ignores didClose costs nothing.
        if let Err(err) = self.session.close_document(&uri).await {
            tracing::debug!(%err, "didClose failed");
        }

        Ok(diagnostics.len())
    }

    pub async fn shutdown(self) {
        self.session.shutdown().await;
    }
}

/// Titles to print for one diagnostic's actions. `--hide-commands`
/// suppresses actions that would need command execution to apply: all
/// bare commands, and quick fixes that carry one.
fn filter_action_titles(actions: &[CodeAction], hide_commands: bool) -> Vec<String> {
    actions
        .iter()
        .filter(|action| match action {
            CodeAction::Command { .. } => !hide_commands,
            CodeAction::QuickFix { has_command, .. } => !has_command || !hide_commands,
        })
        .map(|action| action.title().to_string())
        .collect()
}

/// File contents, or `None` (reported, run continues) when the file
/// cannot be read or is not UTF-8.
async fn read_file_text(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "cannot read file, skipping");
            None
        }
    }
}

/// Files under `dir`, sorted, with a recognized language extension.
fn collect_directory_files(dir: &Path) -> Vec<std::path::PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::error!(%err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| language_id_for_path(path).is_some())
        .collect()
}

/// URI for a document: stdin keeps a synthetic identity, real paths are
/// absolutized so the server sees a proper `file://` URI.
fn uri_for(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return Ok("untitled:stdin".to_string());
    }
    let absolute = std::path::absolute(path)
        .with_context(|| format!("resolving path {}", path.display()))?;
    let uri = lspcheck_client::path_to_file_uri(&absolute)
        .with_context(|| format!("building file URI for {}", absolute.display()))?;
    Ok(uri.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_fix(title: &str, has_command: bool) -> CodeAction {
        CodeAction::QuickFix {
            title: title.to_string(),
            has_command,
        }
    }

    fn command(title: &str) -> CodeAction {
        CodeAction::Command {
            title: title.to_string(),
        }
    }

    #[test]
    fn all_titles_kept_by_default() {
        let actions = vec![
            quick_fix("Fix spelling", false),
            quick_fix("Apply rule", true),
            command("Add to dictionary"),
        ];
        assert_eq!(
            filter_action_titles(&actions, false),
            vec!["Fix spelling", "Apply rule", "Add to dictionary"]
        );
    }

    #[test]
    fn hide_commands_keeps_pure_quick_fixes_only() {
        let actions = vec![
            quick_fix("Fix spelling", false),
            quick_fix("Apply rule", true),
            command("Add to dictionary"),
        ];
        assert_eq!(filter_action_titles(&actions, true), vec!["Fix spelling"]);
    }

    #[test]
    fn directory_walk_keeps_recognized_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.md"), "# a").unwrap();
        std::fs::write(dir.path().join("nested/b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("binary.xyz"), "").unwrap();
        std::fs::write(dir.path().join("Makefile"), "").unwrap();

        let files = collect_directory_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                std::path::PathBuf::from("a.md"),
                std::path::PathBuf::from("nested/b.txt"),
            ]
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_file_text(&dir.path().join("missing.md")).await.is_none());
    }

    #[tokio::test]
    async fn readable_file_text_comes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# hello").unwrap();
        assert_eq!(read_file_text(&path).await.as_deref(), Some("# hello"));
    }

    #[test]
    fn stdin_gets_synthetic_uri() {
        assert_eq!(uri_for(Path::new("-")).unwrap(), "untitled:stdin");
    }

    #[test]
    fn file_uri_is_absolute() {
        let uri = uri_for(Path::new("relative.txt")).unwrap();
        assert!(uri.starts_with("file:///"), "{uri}");
        assert!(uri.ends_with("relative.txt"), "{uri}");
    }
}
