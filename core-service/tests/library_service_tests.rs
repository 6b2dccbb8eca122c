//! End-to-end service behaviour over an in-memory database, with cover
//! lookups mocked and preview providers scripted.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::time::FixedClock;
use chrono::{TimeZone, Utc};
use core_library::db::create_test_pool;
use core_library::filter::{
    filter_books, search, search_books, unique_shelves, unique_years, LibraryFilter,
};
use core_library::LibraryError;
use core_metadata::{CoverLookup, CoverLookupResult, CoverQuery, CoverSource, IsbnCoverPreview};
use core_runtime::config::{CoverApiConfig, EnrichmentSettings};
use core_runtime::events::{CoreEvent, ImportEvent, LibraryEvent};
use core_service::{LibraryService, NewBook, ServiceError, Session};
use mockall::mock;
use serde_json::json;
use std::sync::Arc;

mock! {
    Lookup {}

    #[async_trait]
    impl CoverLookup for Lookup {
        async fn lookup(&self, query: &CoverQuery) -> Option<CoverLookupResult>;
    }
}

/// Open Library data API knows exactly one ISBN; everything else is a 404.
struct OneCoverHttp;

#[async_trait]
impl HttpClient for OneCoverHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if request.url.contains("bibkeys=ISBN:9780261103344") {
            let body = json!({"ISBN:9780261103344": {"cover": {"large": "https://ol/hobbit-L.jpg"}}});
            return Ok(HttpResponse::new(200, body.to_string()));
        }
        Ok(HttpResponse::new(404, Vec::<u8>::new()))
    }
}

const EXPORT: &str = "\
Book Id,Title,Author,ISBN,ISBN13,My Rating,Number of Pages,Date Read,Date Added,Bookshelves,Exclusive Shelf,My Review
1,Dune,Frank Herbert,\"=\"\"0441172717\"\"\",\"=\"\"9780441172719\"\"\",5,604,2023/05/14,2023/01/02,\"sci-fi, favorites\",read,Loved it
2,The Shining,Stephen King,,,4,659,2022/10/31,2022/10/01,horror,read,
3,Emma,Jane Austen,,,5,474,2021/03/02,2021/01/01,,read,
4,The Alchemist,Paulo Coelho,,,0,197,,2024/02/10,,to-read,
";

fn covers_for_isbn13() -> MockLookup {
    let mut lookup = MockLookup::new();
    lookup.expect_lookup().returning(|query| {
        query
            .isbn13
            .as_ref()
            .map(|isbn| CoverLookupResult::new(format!("https://g/{}.jpg", isbn), CoverSource::GoogleIsbn13))
    });
    lookup
}

async fn service_with(lookup: MockLookup) -> LibraryService {
    let pool = create_test_pool().await.unwrap();
    let preview = IsbnCoverPreview::new(Arc::new(OneCoverHttp), &CoverApiConfig::default());
    LibraryService::new(
        pool,
        Arc::new(lookup),
        Arc::new(preview),
        EnrichmentSettings::default().with_batch_delay_ms(0),
    )
    .with_clock(Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    )))
}

async fn service() -> LibraryService {
    service_with(covers_for_isbn13()).await
}

async fn imported(service: &LibraryService, username: &str) -> Session {
    let session = service.create_user(username).await.unwrap();
    service
        .import_export(&session, EXPORT.as_bytes())
        .await
        .unwrap();
    session
}

#[tokio::test]
async fn test_import_keeps_finished_books_and_builds_shelves() {
    let service = service().await;
    let session = service.create_user("alice").await.unwrap();
    let mut events = service.events().subscribe();

    let summary = service
        .import_export(&session, EXPORT.as_bytes())
        .await
        .unwrap();

    assert_eq!(summary.parsed, 3);
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.covers_found, 1);
    assert_eq!(summary.shelves, vec!["read", "sci-fi", "favorites", "horror"]);

    let library = service.library(&session).await.unwrap();
    let titles: Vec<_> = library.iter().map(|b| b.record.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "The Shining", "Emma"]);
    assert_eq!(
        library[0].cover_url.as_deref(),
        Some("https://g/9780441172719.jpg")
    );

    let mut dune_shelves = library[0].record.bookshelves.clone();
    dune_shelves.sort();
    assert_eq!(dune_shelves, vec!["favorites", "sci-fi"]);

    let shelf_names: Vec<_> = service
        .shelves(&session)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        shelf_names,
        vec!["currently-reading", "read", "to-read", "favorites", "horror", "sci-fi"]
    );

    let mut seen = Vec::new();
    while let Ok(CoreEvent::Import(event)) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.first(), Some(&ImportEvent::Started { total: 3 }));
    assert_eq!(
        seen.last(),
        Some(&ImportEvent::Completed {
            imported: 3,
            covers_found: 1
        })
    );
}

#[tokio::test]
async fn test_reimport_does_not_duplicate() {
    let service = service().await;
    let session = imported(&service, "alice").await;

    service
        .import_export(&session, EXPORT.as_bytes())
        .await
        .unwrap();

    assert_eq!(service.library(&session).await.unwrap().len(), 3);
    assert_eq!(
        service
            .books_on_shelf(&session, "favorites")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_views_and_filters() {
    let service = service().await;
    let session = imported(&service, "alice").await;

    let five_star: Vec<_> = service
        .five_star_books(&session)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(five_star, vec!["Dune", "Emma"]);

    let in_2022 = service.books_read_in(&session, 2022).await.unwrap();
    assert_eq!(in_2022.len(), 1);
    assert_eq!(in_2022[0].title, "The Shining");

    let library = service.library(&session).await.unwrap();
    assert_eq!(unique_years(&library), vec![2023, 2022, 2021]);
    assert_eq!(unique_shelves(&library), vec!["favorites", "horror", "sci-fi"]);

    let horror = filter_books(&library, &LibraryFilter::all().with_shelf("horror"));
    assert_eq!(horror.len(), 1);
    assert_eq!(search(&library, "austen")[0].record.title, "Emma");
}

#[tokio::test]
async fn test_add_book_uses_preview_cover_and_to_read_shelf() {
    let service = service().await;
    let session = service.create_user("alice").await.unwrap();
    let mut events = service.events().subscribe();

    let book = service
        .add_book(
            &session,
            NewBook {
                title: "The Hobbit".into(),
                author: "J.R.R. Tolkien".into(),
                isbn: Some("978-0261103344".into()),
                pages: Some(310),
            },
        )
        .await
        .unwrap();

    assert_eq!(book.external_book_id, "manual-1717243200000");
    assert_eq!(book.date_added, "2024-06-01");
    assert_eq!(book.exclusive_shelf, "to-read");
    assert_eq!(book.cover_image_url.as_deref(), Some("https://ol/hobbit-L.jpg"));
    assert_eq!(book.number_of_pages, 310);

    let to_read = service.books_on_shelf(&session, "to-read").await.unwrap();
    assert_eq!(to_read.len(), 1);

    assert!(matches!(
        events.try_recv(),
        Ok(CoreEvent::Library(LibraryEvent::BookAdded { .. }))
    ));
}

#[tokio::test]
async fn test_add_book_requires_title_and_author() {
    let service = service().await;
    let session = service.create_user("alice").await.unwrap();

    let err = service
        .add_book(
            &session,
            NewBook {
                title: "  ".into(),
                author: "Someone".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "title"));
}

#[tokio::test]
async fn test_change_cover() {
    let service = service().await;
    let session = imported(&service, "alice").await;
    let emma = service.books_read_in(&session, 2021).await.unwrap().remove(0);
    assert!(emma.cover_image_url.is_none());
    let emma_id = emma.id;

    let url = service
        .change_cover(&session, &emma_id, "9780261103344")
        .await
        .unwrap();
    assert_eq!(url, "https://ol/hobbit-L.jpg");

    let updated = service.books_read_in(&session, 2021).await.unwrap();
    assert_eq!(updated[0].cover_image_url.as_deref(), Some("https://ol/hobbit-L.jpg"));
    assert_eq!(updated[0].isbn, "9780261103344");

    let err = service
        .change_cover(&session, &emma_id, "0000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CoverNotFound(_)));
}

#[tokio::test]
async fn test_delete_book() {
    let service = service().await;
    let session = imported(&service, "alice").await;
    let shining = service.books_read_in(&session, 2022).await.unwrap().remove(0);

    service.delete_book(&session, &shining.id).await.unwrap();
    assert_eq!(service.library(&session).await.unwrap().len(), 2);
    assert!(service
        .books_on_shelf(&session, "horror")
        .await
        .unwrap()
        .is_empty());

    let err = service.delete_book(&session, &shining.id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Library(LibraryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_books_are_scoped_to_their_owner() {
    let service = service().await;
    let alice = imported(&service, "alice").await;
    let bob = service.create_user("bob").await.unwrap();

    let dune = service.five_star_books(&alice).await.unwrap().remove(0);
    assert!(service.delete_book(&bob, &dune.id).await.is_err());
    assert_eq!(service.library(&alice).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_comparison_shelf_is_replaced_on_rerun() {
    let service = service().await;
    let alice = imported(&service, "alice").await;
    let bob = service.create_user("bob").await.unwrap();

    let bob_export = "\
Book Id,Title,Author,My Rating,Date Read,Exclusive Shelf,My Review
10,  dune ,FRANK HERBERT,3,2020/01/01,read,Too long
11,Emma,Jane Austen,4,2020/02/01,read,
";
    service
        .import_export(&bob, bob_export.as_bytes())
        .await
        .unwrap();

    let comparison = service.compare_with(&alice, "bob").await.unwrap();
    assert_eq!(comparison.shelf_name, "alice × bob");
    assert_eq!(comparison.books.len(), 2);
    assert_eq!(comparison.books[0].book.title, "Dune");
    assert_eq!(comparison.books[0].my_rating, 5);
    assert_eq!(comparison.books[0].their_rating, 3);
    assert_eq!(comparison.books[0].their_review, "Too long");

    let emma = service.books_read_in(&alice, 2021).await.unwrap().remove(0);
    service.delete_book(&alice, &emma.id).await.unwrap();

    let rerun = service.compare_with(&alice, "bob").await.unwrap();
    assert_eq!(rerun.books.len(), 1);
    let on_shelf = service
        .books_on_shelf(&alice, "alice × bob")
        .await
        .unwrap();
    assert_eq!(on_shelf.len(), 1);
    assert_eq!(on_shelf[0].title, "Dune");
}

#[tokio::test]
async fn test_unknown_users() {
    let service = service().await;
    let alice = service.create_user("alice").await.unwrap();

    assert!(matches!(
        service.session_for("carol").await,
        Err(ServiceError::UserNotFound(_))
    ));
    assert!(matches!(
        service.compare_with(&alice, "carol").await,
        Err(ServiceError::UserNotFound(_))
    ));
    assert!(service.create_user("alice").await.is_err());
}

#[tokio::test]
async fn test_every_imported_record_is_looked_up_once() {
    let mut lookup = MockLookup::new();
    lookup.expect_lookup().times(3).returning(|_| None);
    let service = service_with(lookup).await;

    let session = imported(&service, "alice").await;
    let library = service.library(&session).await.unwrap();
    assert!(library.iter().all(|b| b.cover_url.is_none()));
}

#[tokio::test]
async fn test_import_accepts_books_without_author() {
    let service = service().await;
    let session = service.create_user("alice").await.unwrap();
    let export = EXPORT.replace("3,Emma,Jane Austen,", "3,Emma,,");

    let summary = service
        .import_export(&session, export.as_bytes())
        .await
        .unwrap();

    assert_eq!(summary.parsed, 3);
    assert_eq!(summary.imported, 3);
    let emma = service.books_read_in(&session, 2021).await.unwrap();
    assert_eq!(emma[0].title, "Emma");
    assert!(emma[0].author.is_empty());
}

#[tokio::test]
async fn test_import_without_book_id_column_is_rejected() {
    let service = service().await;
    let session = service.create_user("alice").await.unwrap();
    let export = "\
Title,Author,My Rating,Date Read,Exclusive Shelf
Dune,Frank Herbert,5,2023/05/14,read
";

    let result = service.import_export(&session, export.as_bytes()).await;
    assert!(matches!(
        result,
        Err(ServiceError::Library(LibraryError::Parse(_)))
    ));
    assert!(service.books(&session).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exclusive_shelf_listing_matches_shelf_counts() {
    let service = service().await;
    let session = imported(&service, "alice").await;

    let on_read = service.books_on_shelf(&session, "read").await.unwrap();
    let titles: Vec<_> = on_read.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "The Shining", "Emma"]);

    let herbert: Vec<_> = search_books(&on_read, "herbert")
        .into_iter()
        .map(|b| b.title.as_str())
        .collect();
    assert_eq!(herbert, vec!["Dune"]);

    let favorites = service.books_on_shelf(&session, "favorites").await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].title, "Dune");
}
