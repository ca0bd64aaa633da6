//! Tabular importer for delimited track lists.
//!
//! Accepts UTF-8 text (leading BOM tolerated) with any newline convention,
//! comma/semicolon/tab delimiters, optional double-quoting with `""` escapes
//! and a header row. `title` and `artist` columns are required; `album`,
//! `duration` and `isrc` are optional. Header cells are matched through an
//! alias table, so "Track Name" or "artist_name" work as well.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::models::SourceRow;

// ============================================================================
// Header Aliases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Title,
    Artist,
    Album,
    Duration,
    Isrc,
}

impl Column {
    fn name(self) -> &'static str {
        match self {
            Column::Title => "title",
            Column::Artist => "artist",
            Column::Album => "album",
            Column::Duration => "duration",
            Column::Isrc => "isrc",
        }
    }
}

/// Normalized header text → canonical column
static HEADER_ALIASES: Lazy<FxHashMap<&'static str, Column>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    for alias in ["title", "song", "track", "track name", "song title", "name"] {
        m.insert(alias, Column::Title);
    }
    for alias in ["artist", "artist name", "album artist"] {
        m.insert(alias, Column::Artist);
    }
    for alias in ["album", "album title", "release"] {
        m.insert(alias, Column::Album);
    }
    for alias in ["duration", "length", "time"] {
        m.insert(alias, Column::Duration);
    }
    for alias in ["isrc", "isrc code"] {
        m.insert(alias, Column::Isrc);
    }
    m
});

/// Candidate delimiters in tie-break order (comma wins ties)
const DELIMITERS: [char; 3] = [',', ';', '\t'];

const BOM: char = '\u{feff}';

/// Line separators: LF, VT, FF, CR, NEL, LINE SEPARATOR, PARAGRAPH SEPARATOR.
/// CRLF splits twice and leaves a blank line, which is filtered.
const NEWLINES: [char; 7] = [
    '\n', '\u{0b}', '\u{0c}', '\r', '\u{85}', '\u{2028}', '\u{2029}',
];

// ============================================================================
// Line Parsing
// ============================================================================

/// Split one line on `delimiter`, honoring double-quoted segments.
/// A quote toggles quoted mode; `""` inside quotes is a literal quote.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    fields.push(current);
    fields
}

/// Pick the delimiter producing the most fields on the header line.
pub fn detect_delimiter(header: &str) -> char {
    let mut best = DELIMITERS[0];
    let mut best_count = split_fields(header, best).len();
    for &candidate in &DELIMITERS[1..] {
        let count = split_fields(header, candidate).len();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Trim, lowercase, underscores to spaces, collapse whitespace.
fn normalize_header(raw: &str) -> String {
    raw.to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Seconds as a plain integer ("245") or "minutes:seconds" ("4:05").
pub fn parse_duration(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(seconds) = raw.parse::<u32>() {
        return Some(seconds);
    }

    let (minutes, seconds) = raw.split_once(':')?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    let seconds: u32 = seconds.trim().parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

// ============================================================================
// Import
// ============================================================================

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
struct Layout {
    title: usize,
    artist: usize,
    album: Option<usize>,
    duration: Option<usize>,
    isrc: Option<usize>,
}

impl Layout {
    fn resolve(headers: &[String]) -> Result<Self, ImportError> {
        let mut found: FxHashMap<Column, usize> = FxHashMap::default();
        for (index, header) in headers.iter().enumerate() {
            if let Some(&column) = HEADER_ALIASES.get(normalize_header(header).as_str()) {
                found.entry(column).or_insert(index);
            }
        }

        let missing: Vec<String> = [Column::Title, Column::Artist]
            .into_iter()
            .filter(|c| !found.contains_key(c))
            .map(|c| c.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingRequiredColumns(missing));
        }

        Ok(Layout {
            title: found[&Column::Title],
            artist: found[&Column::Artist],
            album: found.get(&Column::Album).copied(),
            duration: found.get(&Column::Duration).copied(),
            isrc: found.get(&Column::Isrc).copied(),
        })
    }
}

fn field(values: &[String], index: usize) -> &str {
    values.get(index).map(|v| v.trim()).unwrap_or("")
}

fn optional_field(values: &[String], index: Option<usize>) -> Option<String> {
    let value = field(values, index?);
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse raw delimited text into source rows.
///
/// Row lines are numbered by their 1-based position among non-blank lines
/// (header = 1). Rows with an empty title or artist are skipped.
pub fn parse(raw: &str) -> Result<Vec<SourceRow>, ImportError> {
    let text = raw.strip_prefix(BOM).unwrap_or(raw);
    let mut lines = text
        .split(NEWLINES)
        .filter(|line| !line.trim().is_empty());

    let header = lines.next().ok_or(ImportError::EmptyInput)?;
    let delimiter = detect_delimiter(header);
    let layout = Layout::resolve(&split_fields(header, delimiter))?;
    debug!(?delimiter, ?layout, "resolved header");

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for (offset, line) in lines.enumerate() {
        let values = split_fields(line, delimiter);
        let title = field(&values, layout.title);
        let artist = field(&values, layout.artist);
        if title.is_empty() || artist.is_empty() {
            dropped += 1;
            continue;
        }

        let mut row = SourceRow::new(offset + 2, title, artist);
        row.album = optional_field(&values, layout.album);
        row.duration_seconds = optional_field(&values, layout.duration)
            .as_deref()
            .and_then(parse_duration);
        row.isrc = optional_field(&values, layout.isrc);
        rows.push(row);
    }

    if dropped > 0 {
        warn!(dropped, "skipped rows with empty title or artist");
    }
    debug!(rows = rows.len(), "parsed input");
    Ok(rows)
}
