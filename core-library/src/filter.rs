//! In-memory views over a loaded library: search, year/shelf filters and
//! the option lists a sidebar renders.

use crate::models::{Book, EnrichedBookRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Selection made in the sidebar. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFilter {
    pub year: Option<i32>,
    pub shelf: Option<String>,
}

impl LibraryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_shelf(mut self, shelf: impl Into<String>) -> Self {
        self.shelf = Some(shelf.into());
        self
    }

    pub fn matches(&self, book: &EnrichedBookRecord) -> bool {
        if let Some(year) = self.year {
            if book.year_read != Some(year) {
                return false;
            }
        }

        if let Some(shelf) = &self.shelf {
            if !book.record.bookshelves.iter().any(|s| s == shelf) {
                return false;
            }
        }

        true
    }
}

/// Books passing `filter`, in their original order.
pub fn filter_books<'a>(
    books: &'a [EnrichedBookRecord],
    filter: &LibraryFilter,
) -> Vec<&'a EnrichedBookRecord> {
    books.iter().filter(|book| filter.matches(book)).collect()
}

/// Case-insensitive substring match on title or author. A blank query
/// returns every book.
pub fn search<'a>(books: &'a [EnrichedBookRecord], query: &str) -> Vec<&'a EnrichedBookRecord> {
    let needle = query.trim().to_lowercase();
    books
        .iter()
        .filter(|book| title_or_author_contains(&book.record.title, &book.record.author, &needle))
        .collect()
}

/// [`search`] over stored rows.
pub fn search_books<'a>(books: &'a [Book], query: &str) -> Vec<&'a Book> {
    let needle = query.trim().to_lowercase();
    books
        .iter()
        .filter(|book| title_or_author_contains(&book.title, &book.author, &needle))
        .collect()
}

fn title_or_author_contains(title: &str, author: &str, needle: &str) -> bool {
    needle.is_empty()
        || title.to_lowercase().contains(needle)
        || author.to_lowercase().contains(needle)
}

/// Distinct read years, newest first.
pub fn unique_years(books: &[EnrichedBookRecord]) -> Vec<i32> {
    let years: BTreeSet<i32> = books.iter().filter_map(|book| book.year_read).collect();
    years.into_iter().rev().collect()
}

/// Distinct custom shelves, alphabetical.
pub fn unique_shelves(books: &[EnrichedBookRecord]) -> Vec<String> {
    let shelves: BTreeSet<&str> = books
        .iter()
        .flat_map(|book| book.record.bookshelves.iter().map(String::as_str))
        .collect();
    shelves.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExclusiveShelf, RawBookRecord};

    fn book(title: &str, author: &str, date_read: &str, shelves: &[&str]) -> EnrichedBookRecord {
        EnrichedBookRecord::from_raw(RawBookRecord {
            title: title.to_string(),
            author: author.to_string(),
            date_read: date_read.to_string(),
            bookshelves: shelves.iter().map(|s| s.to_string()).collect(),
            exclusive_shelf: ExclusiveShelf::Read,
            ..Default::default()
        })
    }

    fn library() -> Vec<EnrichedBookRecord> {
        vec![
            book("Dune", "Frank Herbert", "2023/05/14", &["sci-fi", "favorites"]),
            book("Emma", "Jane Austen", "2021/02/01", &["classics"]),
            book("Hyperion", "Dan Simmons", "2023/09/30", &["sci-fi"]),
            book("Persuasion", "Jane Austen", "", &[]),
        ]
    }

    #[test]
    fn test_filter_by_year_and_shelf() {
        let books = library();

        let by_year = filter_books(&books, &LibraryFilter::all().with_year(2023));
        assert_eq!(by_year.len(), 2);

        let by_shelf = filter_books(&books, &LibraryFilter::all().with_shelf("classics"));
        assert_eq!(by_shelf.len(), 1);
        assert_eq!(by_shelf[0].record.title, "Emma");

        let both = filter_books(
            &books,
            &LibraryFilter::all().with_year(2023).with_shelf("favorites"),
        );
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].record.title, "Dune");

        assert_eq!(filter_books(&books, &LibraryFilter::all()).len(), 4);
    }

    #[test]
    fn test_search() {
        let books = library();
        let hits = search(&books, "austen");
        assert_eq!(hits.len(), 2);

        let hits = search(&books, "HYPER");
        assert_eq!(hits.len(), 1);

        assert_eq!(search(&books, "  ").len(), 4);
        assert!(search(&books, "tolkien").is_empty());
    }

    #[test]
    fn test_search_stored_books() {
        let rows: Vec<Book> = library()
            .iter()
            .map(|record| Book::from_record("user-1", record))
            .collect();

        let hits: Vec<_> = search_books(&rows, "AUSTEN").iter().map(|b| b.title.as_str()).collect();
        assert_eq!(hits, vec!["Emma", "Persuasion"]);
        assert_eq!(search_books(&rows, "").len(), 4);
        assert!(search_books(&rows, "tolkien").is_empty());
    }

    #[test]
    fn test_unique_years_descending() {
        assert_eq!(unique_years(&library()), vec![2023, 2021]);
    }

    #[test]
    fn test_unique_shelves_ascending() {
        assert_eq!(
            unique_shelves(&library()),
            vec!["classics", "favorites", "sci-fi"]
        );
    }
}
