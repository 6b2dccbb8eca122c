//! Importing a real-shaped export file and persisting it.

use core_library::comparison::derive_shelf_plan;
use core_library::db::{create_pool, create_test_pool, DatabaseConfig};
use core_library::ingest::parse_library_export_path;
use core_library::models::{Book, EnrichedBookRecord, ExclusiveShelf, Profile};
use core_library::repositories::{
    BookRepository, ProfileRepository, ShelfRepository, SqliteBookRepository,
    SqliteProfileRepository, SqliteShelfRepository,
};
use core_library::LibraryError;
use std::collections::HashMap;
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/goodreads_library_export.csv")
}

#[test]
fn test_fixture_parses_to_finished_books() {
    let records = parse_library_export_path(fixture()).unwrap();

    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Dune (Dune, #1)", "Wuthering Heights", "The Shining"]
    );

    let dune = &records[0];
    assert_eq!(dune.isbn, "0441172717");
    assert_eq!(dune.isbn13, "9780441172719");
    assert_eq!(dune.average_rating, 4.27);
    assert_eq!(dune.bookshelves, vec!["sci-fi", "favorites"]);
    assert_eq!(dune.my_review, "Spice, sand and \"politics\".");
    assert_eq!(dune.exclusive_shelf, ExclusiveShelf::Read);

    let bronte = &records[1];
    assert_eq!(bronte.number_of_pages, 0);
    assert_eq!(bronte.author, "Emily Brontë");

    let shining = &records[2];
    assert_eq!(shining.number_of_pages, 659);
    assert!(shining.my_review.contains('\n'));
    assert_eq!(shining.read_count, 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = parse_library_export_path("/definitely/not/here.csv");
    assert!(matches!(result, Err(LibraryError::Io(_))));
}

#[tokio::test]
async fn test_persist_fixture_with_shelves() {
    let pool = create_test_pool().await.unwrap();
    let profiles = SqliteProfileRepository::new(pool.clone());
    let books = SqliteBookRepository::new(pool.clone());
    let shelves = SqliteShelfRepository::new(pool.clone());

    let profile = Profile::new("reader");
    profiles.insert(&profile).await.unwrap();
    shelves.ensure_defaults(&profile.id).await.unwrap();

    let records = parse_library_export_path(fixture()).unwrap();
    let plan = derive_shelf_plan(&records);

    let rows: Vec<Book> = records
        .iter()
        .cloned()
        .map(|r| Book::from_record(&profile.id, &EnrichedBookRecord::from_raw(r)))
        .collect();
    let saved = books.upsert_many(&rows).await.unwrap();

    let stored_shelves = shelves.upsert_many(&profile.id, &plan.shelves).await.unwrap();
    let shelf_ids: HashMap<&str, &str> = stored_shelves
        .iter()
        .map(|s| (s.name.as_str(), s.id.as_str()))
        .collect();
    let book_ids: HashMap<&str, &str> = saved
        .iter()
        .map(|b| (b.external_book_id.as_str(), b.id.as_str()))
        .collect();

    let links: Vec<(String, String)> = plan
        .memberships
        .iter()
        .map(|(ext, shelf)| (book_ids[ext.as_str()].to_string(), shelf_ids[shelf.as_str()].to_string()))
        .collect();
    shelves.add_memberships(&links).await.unwrap();

    let favorites = books.list_by_shelf(&profile.id, "favorites").await.unwrap();
    assert_eq!(favorites.len(), 2);

    let read = books.list_by_shelf(&profile.id, "read").await.unwrap();
    assert_eq!(read.len(), 3);
    assert_eq!(read[0].title, "Dune (Dune, #1)");

    let names: Vec<String> = shelves
        .list(&profile.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        names,
        vec!["currently-reading", "read", "to-read", "classics", "favorites", "horror", "sci-fi"]
    );

    // Re-import leaves the row count alone
    books.upsert_many(&rows).await.unwrap();
    assert_eq!(books.list_by_user(&profile.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readlist.db");

    let profile = Profile::new("reader");
    {
        let pool = create_pool(DatabaseConfig::new(&path)).await.unwrap();
        SqliteProfileRepository::new(pool.clone())
            .insert(&profile)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = create_pool(DatabaseConfig::new(&path)).await.unwrap();
    let found = SqliteProfileRepository::new(pool)
        .find_by_username("reader")
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(profile.id));
}
