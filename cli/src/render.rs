//! Terminal rendering of diagnostics and their suggested actions.
//!
//! Output format, one block per diagnostic:
//!
//! ```text
//! path:12:5: warning: possible typo [style-01]
//!     teh quick fox
//!     ^^^ (span shown bold and colored, not caret-underlined)
//!     Replace with "the"
//! ```
//!
//! Action titles are indented to the diagnosed column, best-effort: tabs
//! expand at a fixed stop of 8, and if any title would overflow the
//! terminal the indentation collapses to zero for all of them.

use std::path::Path;

use colored::{Color, Colorize};
use lspcheck_client::{Diagnostic, Document, Severity};

const TAB_SIZE: usize = 8;

/// Columns available for output; anything narrower than 2 is treated as
/// unlimited (a degenerate width reported by some non-terminals).
#[must_use]
pub fn terminal_width() -> usize {
    match terminal_size::terminal_size() {
        Some((terminal_size::Width(w), _)) if w >= 2 => w as usize,
        _ => usize::MAX,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Information | Severity::Hint => Color::Blue,
    }
}

/// Render one diagnostic block to stdout.
pub fn print_diagnostic(
    path: &Path,
    document: &Document,
    diagnostic: &Diagnostic,
    action_titles: &[String],
    terminal_width: usize,
) {
    for line in render_diagnostic(path, document, diagnostic, action_titles, terminal_width) {
        println!("{line}");
    }
}

pub(crate) fn render_diagnostic(
    path: &Path,
    document: &Document,
    diagnostic: &Diagnostic,
    action_titles: &[String],
    terminal_width: usize,
) -> Vec<String> {
    let severity = diagnostic.severity();
    let color = severity_color(severity);
    let start = diagnostic.range.start;

    let mut lines = Vec::with_capacity(2 + action_titles.len());

    let mut header = format!(
        "{}",
        format!("{}:{}:{}: ", path.display(), start.line + 1, start.character + 1).bold()
    );
    header.push_str(&format!("{}", format!("{}:", severity.label()).color(color).bold()));
    header.push_str(&format!("{}", format!(" {}", diagnostic.message).bold()));
    if let Some(code) = &diagnostic.code {
        header.push_str(&format!("{}", format!(" [{code}]").bold()));
    }
    lines.push(header);

    // Slice the diagnosed line into prefix / span / suffix. Offsets are
    // clamped into the line so a server reporting a multi-line or bogus
    // range still renders something sensible.
    let (line_start, line_end) = document.line_span(start.line);
    let from = document.offset_at(start).clamp(line_start, line_end);
    let to = document
        .offset_at(diagnostic.range.end)
        .clamp(from, line_end);

    let text = document.text();
    let prefix = &text[line_start..from];
    let span = &text[from..to];
    let suffix = text[to..line_end].trim_end_matches([' ', '\t', '\r', '\n']);
    lines.push(format!("{prefix}{}{suffix}", span.bold().color(color)));

    let mut indent = guess_indentation(prefix, terminal_width);
    if action_titles
        .iter()
        .any(|title| indent + title.chars().count() > terminal_width)
    {
        indent = 0;
    }

    for title in action_titles {
        lines.push(format!("{}{}", " ".repeat(indent), title.green()));
    }

    lines
}

/// Visual column of the span start, simulating tab expansion.
///
/// This guesses what the terminal did with the prefix; there is no
/// guarantee the guess matches, so the result is cosmetic only.
fn guess_indentation(prefix: &str, terminal_width: usize) -> usize {
    let mut column = 0usize;
    for c in prefix.chars() {
        if c == '\t' {
            column = (column / TAB_SIZE + 1) * TAB_SIZE;
        } else {
            column += 1;
        }
        if column >= terminal_width {
            column = 0;
        }
    }
    column
}
