//! Document snapshot with a line/offset conversion index.
//!
//! The wire protocol addresses text by (line, UTF-16 code unit) pairs;
//! rendering needs byte offsets into the UTF-8 text. The index is a table
//! of line-start byte offsets, rebuilt in O(n) whenever the text is set,
//! with O(log n) line lookup.

use crate::types::Position;

/// An opened document: immutable snapshot of text plus its line index.
#[derive(Debug, Clone)]
pub struct Document {
    uri: String,
    language_id: String,
    version: i32,
    text: String,
    /// Byte offset of each line's first character. Entry 0 is always 0;
    /// strictly increasing. `\n`, `\r\n`, and lone `\r` each end exactly
    /// one line.
    line_starts: Vec<usize>,
}

fn build_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                // A \r\n pair is a single boundary.
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                starts.push(i + 1);
            }
            b'\n' => starts.push(i + 1),
            _ => {}
        }
        i += 1;
    }

    starts
}

fn utf16_len(text: &str) -> u32 {
    text.chars().map(|c| c.len_utf16() as u32).sum()
}

impl Document {
    #[must_use]
    pub fn new(uri: impl Into<String>, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = build_line_starts(&text);
        Self {
            uri: uri.into(),
            language_id: language_id.into(),
            version: 1,
            text,
            line_starts,
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of lines (a document always has at least one).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Replace the text and rebuild the index.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.line_starts = build_line_starts(&self.text);
    }

    /// Byte span of a line including its terminator; `line` past the end
    /// yields the empty span at the document end.
    #[must_use]
    pub fn line_span(&self, line: u32) -> (usize, usize) {
        let line = line as usize;
        if line >= self.line_starts.len() {
            return (self.text.len(), self.text.len());
        }
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len());
        (start, end)
    }

    /// Byte offset for a protocol position.
    ///
    /// Out-of-range lines clamp to the document end. A character count at
    /// or past the end of the line clamps to just before the trailing
    /// terminator sequence, so "end of line" addresses the last content
    /// character rather than the next line's terminator bytes.
    #[must_use]
    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return self.text.len();
        }

        let (start, end) = self.line_span(position.line);
        let content = &self.text[start..end];

        if position.character >= utf16_len(content) {
            return start + trim_terminator(content);
        }

        let mut units = 0u32;
        for (byte, c) in content.char_indices() {
            let next = units + c.len_utf16() as u32;
            // A character landing inside a surrogate pair resolves to the
            // pair's start, keeping the result on a char boundary.
            if position.character < next {
                return start + byte;
            }
            units = next;
        }
        start + trim_terminator(content)
    }

    /// Protocol position for a byte offset (greatest line start ≤ offset).
    #[must_use]
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        // partition_point gives the first start > offset; the line is the
        // one before it. Index 0 always holds start 0, so line ≥ 0.
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let character = utf16_len(&self.text[self.line_starts[line]..offset]);
        Position::new(line as u32, character)
    }
}

/// Length of `line` with any trailing `\n`, `\r`, or `\r\n` removed.
fn trim_terminator(line: &str) -> usize {
    let stripped = line
        .strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line);
    stripped.len()
}
