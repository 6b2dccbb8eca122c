//! # Library export ingestion
//!
//! Parses a Goodreads library export (CSV with a header row) into
//! [`RawBookRecord`]s, keeping only books that were finished and dated.
//!
//! ```rust,ignore
//! let records = parse_library_export_path("goodreads_library_export.csv")?;
//! ```

use crate::error::{LibraryError, Result};
use crate::models::{ExclusiveShelf, RawBookRecord};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Columns without which an export cannot be interpreted.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Book Id", "Title", "Author", "Exclusive Shelf", "Date Read"];

/// Parse an export from any reader.
///
/// # Errors
///
/// `LibraryError::Parse` if the input is not delimited text or a required
/// column is missing. Other absent columns default to empty or zero.
/// Finished rows without a book id or title are dropped with a warning.
pub fn parse_library_export<R: Read>(reader: R) -> Result<Vec<RawBookRecord>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = ColumnIndex::new(&headers)?;

    let mut total = 0usize;
    let mut kept = Vec::new();

    for row in csv_reader.records() {
        let row = row?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }

        total += 1;
        let record = columns.record(&row);
        if !record.is_completed_read() {
            debug!(title = %record.title, shelf = %record.exclusive_shelf, "Skipping unfinished book");
        } else if record.book_id.trim().is_empty() || record.title.trim().is_empty() {
            warn!(row = total, book_id = %record.book_id, "Skipping row without book id or title");
        } else {
            kept.push(record);
        }
    }

    info!(rows = total, kept = kept.len(), "Parsed library export");
    Ok(kept)
}

/// Parse an export file from disk.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn parse_library_export_path(path: impl AsRef<Path>) -> Result<Vec<RawBookRecord>> {
    let file = std::fs::File::open(path.as_ref())?;
    parse_library_export(file)
}

/// Strip spreadsheet artifacts such as `="0441172717"` from an ISBN.
pub fn clean_isbn(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '=' | '"' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split the comma-separated shelves column.
pub fn split_shelves(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Leading integer of `value`, or 0.
///
/// `"12 pages"` yields 12, `"4.5"` yields 4, `"n/a"` yields 0.
pub fn parse_int_lenient(value: &str) -> i32 {
    let trimmed = value.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end]
        .parse::<i32>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

/// Leading decimal number of `value`, or 0.
pub fn parse_float_lenient(value: &str) -> f64 {
    let trimmed = value.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in trimmed.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return 0.0;
    }

    trimmed[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Result<Self> {
        let positions: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().trim_start_matches('\u{feff}').to_string(), i))
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !positions.contains_key(*column))
            .collect();

        if !missing.is_empty() {
            return Err(LibraryError::Parse(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    fn get<'r>(&self, row: &'r StringRecord, column: &str) -> &'r str {
        self.positions
            .get(column)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
    }

    fn text(&self, row: &StringRecord, column: &str) -> String {
        self.get(row, column).to_string()
    }

    fn record(&self, row: &StringRecord) -> RawBookRecord {
        RawBookRecord {
            book_id: self.text(row, "Book Id"),
            title: self.text(row, "Title"),
            author: self.text(row, "Author"),
            author_last_first: self.text(row, "Author l-f"),
            additional_authors: self.text(row, "Additional Authors"),
            isbn: clean_isbn(self.get(row, "ISBN")),
            isbn13: clean_isbn(self.get(row, "ISBN13")),
            my_rating: parse_int_lenient(self.get(row, "My Rating")).clamp(0, 5),
            average_rating: parse_float_lenient(self.get(row, "Average Rating")),
            publisher: self.text(row, "Publisher"),
            binding: self.text(row, "Binding"),
            number_of_pages: parse_int_lenient(self.get(row, "Number of Pages")),
            year_published: parse_int_lenient(self.get(row, "Year Published")),
            original_publication_year: parse_int_lenient(
                self.get(row, "Original Publication Year"),
            ),
            date_read: self.text(row, "Date Read"),
            date_added: self.text(row, "Date Added"),
            bookshelves: split_shelves(self.get(row, "Bookshelves")),
            bookshelves_with_positions: self.text(row, "Bookshelves with positions"),
            exclusive_shelf: ExclusiveShelf::parse(self.get(row, "Exclusive Shelf")),
            my_review: self.text(row, "My Review"),
            spoiler: self.text(row, "Spoiler"),
            private_notes: self.text(row, "Private Notes"),
            read_count: parse_int_lenient(self.get(row, "Read Count")),
            owned_copies: parse_int_lenient(self.get(row, "Owned Copies")),
        }
    }
}
