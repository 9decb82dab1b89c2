//! CSV framing for log rows.
//!
//! Rows are written with minimal quoting and a `\n` terminator. Stored content is checked
//! against the strict RFC 4180 grammar before it is handed to the `csv` reader, which on its
//! own accepts unterminated and bare quotes. A `\r` outside quotes must start a CRLF pair.

use crate::errors::{GistLogError, GistLogResult};

pub type Row = Vec<String>;

/// Encodes one row as a single CSV line, terminator included.
pub fn encode_row<S: AsRef<str>>(row: &[S]) -> GistLogResult<String> {
    if row.is_empty() {
        return Err(GistLogError::Encode("row must have at least one field".into()));
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(row.iter().map(|field| field.as_ref()))
        .map_err(|e| GistLogError::Encode(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| GistLogError::Encode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| GistLogError::Encode(e.to_string()))
}

/// New file content after appending `line`. The separator newline is always inserted.
pub fn splice(previous: &str, line: &str) -> String {
    let mut content = String::with_capacity(previous.len() + 1 + line.len());
    content.push_str(previous);
    content.push('\n');
    content.push_str(line);
    content
}

/// Parses full file content into rows, in file order. Blank lines yield no rows.
pub fn parse_rows(content: &str) -> GistLogResult<Vec<Row>> {
    validate_strict(content)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| GistLogError::Parse(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

#[derive(Clone, Copy)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    /// Saw `"` inside a quoted field: either an escape or the closing quote.
    QuoteInQuoted,
    /// `\r` outside quotes; only `\n` may come next.
    Cr,
}

fn validate_strict(content: &str) -> GistLogResult<()> {
    let mut state = Scan::FieldStart;
    let mut line = 1usize;

    for ch in content.chars() {
        state = match (state, ch) {
            (Scan::FieldStart, '"') => Scan::Quoted,
            (Scan::FieldStart | Scan::Unquoted, ',' | '\n') => Scan::FieldStart,
            (Scan::FieldStart | Scan::Unquoted | Scan::QuoteInQuoted, '\r') => Scan::Cr,
            (Scan::Cr, '\n') => Scan::FieldStart,
            (Scan::Cr, _) => {
                return Err(GistLogError::Parse(format!(
                    "line {line}: \\r outside a quoted field must be followed by \\n"
                )))
            }
            (Scan::Unquoted, '"') => {
                return Err(GistLogError::Parse(format!(
                    "line {line}: bare \" in non-quoted field"
                )))
            }
            (Scan::FieldStart | Scan::Unquoted, _) => Scan::Unquoted,
            (Scan::Quoted, '"') => Scan::QuoteInQuoted,
            (Scan::Quoted, _) => Scan::Quoted,
            (Scan::QuoteInQuoted, '"') => Scan::Quoted,
            (Scan::QuoteInQuoted, ',' | '\n') => Scan::FieldStart,
            (Scan::QuoteInQuoted, other) => {
                return Err(GistLogError::Parse(format!(
                    "line {line}: unexpected {other:?} after closing quote"
                )))
            }
        };
        if ch == '\n' {
            line += 1;
        }
    }

    if let Scan::Quoted = state {
        return Err(GistLogError::Parse(format!(
            "line {line}: unterminated quoted field"
        )));
    }
    Ok(())
}
