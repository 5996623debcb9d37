// src/error.rs

use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// A single problem found while scanning or reading CSV text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    /// A quoted field opened on `line` never closes.
    UnterminatedQuote { line: u64 },
    /// A data record whose field count differs from the header's.
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    /// A logical line that read back as more than one record.
    RecordBoundary { line: u64 },
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseIssue::UnterminatedQuote { line } => {
                write!(f, "line {}: unterminated quoted field", line)
            }
            ParseIssue::FieldCount {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {}: expected {} fields, found {}",
                line, expected, found
            ),
            ParseIssue::RecordBoundary { line } => {
                write!(f, "line {}: record boundary inside the line", line)
            }
        }
    }
}

/// Failure to turn text into records. Always atomic: no rows survive.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input is not valid UTF-8 (first bad byte at offset {0})")]
    Encoding(usize),
    #[error("malformed CSV: {}", join_issues(.0))]
    Malformed(Vec<ParseIssue>),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

fn join_issues(issues: &[ParseIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Transport-level failure while retrieving the reference table.
#[derive(Debug, Error)]
pub enum MappingFetchError {
    #[error("invalid mapping URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("GET {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("reading mapping file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure anywhere in the parse/enrich pass over an uploaded invoice.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("reading invoice {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing invoice {file_name}: {source}")]
    Parse {
        file_name: String,
        #[source]
        source: ParseError,
    },
}

/// Failure handing the finished CSV to the host.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("nothing to download; process an invoice first")]
    NoResult,
    #[error("serializing result: {0}")]
    Serialize(#[from] csv::Error),
    #[error("writing {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
