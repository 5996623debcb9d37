//! Quote-aware split of CSV text into logical lines.
//!
//! The `csv` reader silently drops blank lines and reads an unclosed quote to
//! end of input. This pass finds both before the text reaches the reader, using
//! the same record rules: a quote only opens a field at field start, `""`
//! inside quotes is a literal quote, and `\r`, `\n` or `\r\n` end a record.

use crate::error::ParseIssue;

/// One logical line: a record (possibly spanning physical lines) or a blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    /// 1-based physical line the segment starts on.
    pub line: u64,
    pub text: &'a str,
}

impl Segment<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Split `text` into logical lines. A terminator at end of input closes the
/// last record and does not produce a trailing blank.
pub(crate) fn split_lines(text: &str) -> Result<Vec<Segment<'_>>, ParseIssue> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut state = State::FieldStart;
    let mut start = 0;
    let mut line = 1u64;
    let mut seg_line = 1u64;
    let mut quote_line = 0u64;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::Quoted => match b {
                b'"' => state = State::QuoteInQuoted,
                b'\n' => line += 1,
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => line += 1,
                _ => {}
            },
            State::QuoteInQuoted => {
                if b == b'"' {
                    state = State::Quoted;
                } else {
                    // closing quote; reread this byte as plain field content
                    state = State::Unquoted;
                    continue;
                }
            }
            State::FieldStart | State::Unquoted => match b {
                b'"' if state == State::FieldStart => {
                    state = State::Quoted;
                    quote_line = line;
                }
                b',' => state = State::FieldStart,
                b'\r' | b'\n' => {
                    segments.push(Segment {
                        line: seg_line,
                        text: &text[start..i],
                    });
                    if b == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    line += 1;
                    seg_line = line;
                    start = i + 1;
                    state = State::FieldStart;
                }
                _ => state = State::Unquoted,
            },
        }
        i += 1;
    }

    if state == State::Quoted {
        return Err(ParseIssue::UnterminatedQuote { line: quote_line });
    }
    if start < bytes.len() {
        segments.push(Segment {
            line: seg_line,
            text: &text[start..],
        });
    }
    Ok(segments)
}
