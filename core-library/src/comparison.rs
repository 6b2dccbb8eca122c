//! Shelf derivation for imports and the two-user comparison view.

use crate::models::{Book, RawBookRecord};
use serde::{Deserialize, Serialize};

/// A book both users have, seen from the requesting user's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedBook {
    /// The requesting user's copy.
    pub book: Book,
    pub my_rating: i32,
    pub their_rating: i32,
    pub my_review: String,
    pub their_review: String,
    /// Mine when I have a non-empty one, otherwise theirs.
    pub cover_url: Option<String>,
}

/// Books in `mine` that also appear in `theirs`.
///
/// Titles and authors are compared trimmed and lowercased. Order follows
/// `mine`; each of my books pairs with the first match in `theirs`.
pub fn shared_books(mine: &[Book], theirs: &[Book]) -> Vec<SharedBook> {
    let their_keys: Vec<(String, String)> = theirs.iter().map(match_key).collect();

    mine.iter()
        .filter_map(|my_book| {
            let key = match_key(my_book);
            let position = their_keys.iter().position(|k| *k == key)?;
            let their_book = &theirs[position];

            Some(SharedBook {
                book: my_book.clone(),
                my_rating: my_book.my_rating,
                their_rating: their_book.my_rating,
                my_review: my_book.my_review.clone(),
                their_review: their_book.my_review.clone(),
                cover_url: non_empty(my_book.cover_image_url.as_deref())
                    .or_else(|| non_empty(their_book.cover_image_url.as_deref())),
            })
        })
        .collect()
}

/// Name of the shelf holding the books two users share.
pub fn comparison_shelf_name(my_username: &str, their_username: &str) -> String {
    format!("{} × {}", my_username, their_username)
}

fn non_empty(url: Option<&str>) -> Option<String> {
    url.filter(|u| !u.is_empty()).map(str::to_string)
}

fn match_key(book: &Book) -> (String, String) {
    (
        book.title.trim().to_lowercase(),
        book.author.trim().to_lowercase(),
    )
}

/// Shelves and memberships implied by a batch of imported records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShelfPlan {
    /// Every shelf name, in first-seen order.
    pub shelves: Vec<String>,
    /// `(external book id, shelf name)` pairs.
    pub memberships: Vec<(String, String)>,
}

/// Each record belongs to its exclusive shelf and to every custom shelf
/// that differs from it.
pub fn derive_shelf_plan<'a, I>(records: I) -> ShelfPlan
where
    I: IntoIterator<Item = &'a RawBookRecord>,
{
    let mut plan = ShelfPlan::default();

    for record in records {
        let exclusive = record.exclusive_shelf.as_str();
        if !exclusive.is_empty() {
            plan.add_shelf(exclusive);
            plan.memberships
                .push((record.book_id.clone(), exclusive.to_string()));
        }

        for shelf in &record.bookshelves {
            plan.add_shelf(shelf);
            if shelf != exclusive {
                plan.memberships
                    .push((record.book_id.clone(), shelf.clone()));
            }
        }
    }

    plan
}

impl ShelfPlan {
    fn add_shelf(&mut self, name: &str) {
        if !self.shelves.iter().any(|s| s == name) {
            self.shelves.push(name.to_string());
        }
    }
}
