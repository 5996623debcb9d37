// src/codec/mod.rs
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use std::io;
use tracing::{debug, trace};

use crate::error::{ParseError, ParseIssue};

pub mod row;
mod scan;

pub use row::InvoiceRow;

/// UTF-8 byte-order mark.
pub const BOM: &str = "\u{feff}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// First non-empty line names the columns.
    WithHeader,
    /// Every line is a bare sequence of fields.
    Headerless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub header_mode: HeaderMode,
    pub skip_empty_lines: bool,
}

impl ParseOptions {
    /// Uploaded invoices: header row, blank lines dropped.
    pub const INVOICE: ParseOptions = ParseOptions {
        header_mode: HeaderMode::WithHeader,
        skip_empty_lines: true,
    };

    /// The two-column reference table: no header, blank lines dropped.
    pub const REFERENCE_TABLE: ParseOptions = ParseOptions {
        header_mode: HeaderMode::Headerless,
        skip_empty_lines: true,
    };
}

/// Header columns plus the rows keyed by them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<InvoiceRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Table(CsvTable),
    Records(Vec<Vec<String>>),
}

impl Parsed {
    /// Header-mode view; `None` for headerless output.
    pub fn into_table(self) -> Option<CsvTable> {
        match self {
            Parsed::Table(table) => Some(table),
            Parsed::Records(_) => None,
        }
    }

    /// Bare field sequences. For a table, the header row is not included.
    pub fn into_records(self) -> Vec<Vec<String>> {
        match self {
            Parsed::Records(records) => records,
            Parsed::Table(table) => table
                .rows
                .into_iter()
                .map(|row| row.fields().iter().map(|(_, v)| v.clone()).collect())
                .collect(),
        }
    }
}

/// Parse raw CSV bytes.
///
/// A leading byte-order mark is dropped. Every malformed record is collected
/// and the whole parse fails with a single [`ParseError::Malformed`]; callers
/// never see a partial file.
pub fn parse(input: impl AsRef<[u8]>, options: ParseOptions) -> Result<Parsed, ParseError> {
    let (lines, header_line) = read_lines(input.as_ref(), options.skip_empty_lines)?;
    match options.header_mode {
        HeaderMode::Headerless => Ok(Parsed::Records(
            lines.into_iter().map(|(_, record)| record).collect(),
        )),
        HeaderMode::WithHeader => build_table(lines, header_line).map(Parsed::Table),
    }
}

/// [`parse`] in header mode, returning the table directly.
pub fn parse_table(
    input: impl AsRef<[u8]>,
    skip_empty_lines: bool,
) -> Result<CsvTable, ParseError> {
    let (lines, header_line) = read_lines(input.as_ref(), skip_empty_lines)?;
    build_table(lines, header_line)
}

/// Records tagged with the line they start on, plus the first non-blank line.
fn read_lines(
    bytes: &[u8],
    skip_empty_lines: bool,
) -> Result<(Vec<(u64, Vec<String>)>, Option<u64>), ParseError> {
    let (bytes, offset) = match bytes.strip_prefix(BOM.as_bytes()) {
        Some(rest) => (rest, BOM.len()),
        None => (bytes, 0),
    };
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::Encoding(offset + e.valid_up_to()))?;

    let segments =
        scan::split_lines(text).map_err(|issue| ParseError::Malformed(vec![issue]))?;
    let header_line = segments.iter().find(|s| !s.is_blank()).map(|s| s.line);

    // Each logical line is read on its own, so a record can never drift onto
    // another line's number.
    let mut lines: Vec<(u64, Vec<String>)> = Vec::with_capacity(segments.len());
    for seg in &segments {
        if seg.is_blank() {
            if !skip_empty_lines {
                lines.push((seg.line, vec![String::new()]));
            }
        } else {
            lines.push((seg.line, read_record(seg)?));
        }
    }
    trace!(lines = lines.len(), "scanned CSV lines");
    Ok((lines, header_line))
}

fn read_record(seg: &scan::Segment<'_>) -> Result<Vec<String>, ParseError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(seg.text.as_bytes());

    let mut records = rdr.records();
    let mut fields: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => vec![String::new()],
    };
    if records.next().is_some() {
        return Err(ParseError::Malformed(vec![ParseIssue::RecordBoundary {
            line: seg.line,
        }]));
    }

    // The reader drops a BOM opening its input; here it is field content.
    if seg.text.starts_with(BOM) && !fields[0].starts_with(BOM) {
        fields[0].insert_str(0, BOM);
    }
    Ok(fields)
}

fn build_table(
    lines: Vec<(u64, Vec<String>)>,
    header_line: Option<u64>,
) -> Result<CsvTable, ParseError> {
    // Blanks ahead of the header never count, whatever skip_empty_lines says.
    let mut lines = lines
        .into_iter()
        .skip_while(|(line, _)| Some(*line) != header_line);

    let headers = match lines.next() {
        Some((_, headers)) => headers,
        None => return Ok(CsvTable::default()),
    };

    let mut issues = Vec::new();
    let mut rows = Vec::new();
    for (line, record) in lines {
        if record.len() != headers.len() {
            issues.push(ParseIssue::FieldCount {
                line,
                expected: headers.len(),
                found: record.len(),
            });
            continue;
        }
        rows.push(InvoiceRow::from_record(&headers, record));
    }

    if !issues.is_empty() {
        return Err(ParseError::Malformed(issues));
    }
    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV table");
    Ok(CsvTable { headers, rows })
}

/// Render rows as CSV, fields taken in `headers` order.
///
/// A missing field renders empty. When a header name repeats, its n-th
/// occurrence is filled from the row's n-th column of that name. Only fields
/// holding a delimiter, quote or line terminator are quoted.
pub fn serialize(rows: &[InvoiceRow], headers: &[String]) -> Result<String, csv::Error> {
    if headers.is_empty() {
        return Ok(String::new());
    }

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    wtr.write_record(headers)?;

    let occurrence: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| headers[..i].iter().filter(|prev| *prev == h).count())
        .collect();

    for row in rows {
        wtr.write_record(
            headers
                .iter()
                .zip(&occurrence)
                .map(|(h, &n)| row.get_nth(h, n).unwrap_or("")),
        )?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(io::Error::new(e.error().kind(), e.error().to_string())))?;
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
}
