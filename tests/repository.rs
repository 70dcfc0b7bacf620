//! Repository integration tests
//!
//! Each test copies the sample store into a fresh temp directory and runs
//! repository operations against it.

use std::path::PathBuf;
use std::sync::Arc;

use bookstore::{Book, BookRepository, StoreError, XmlBookStore};
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SAMPLE: &str = include_str!("fixtures/bookstore.sample.xml");

const KICK_START: &str = "9031234567897";
const LEARNING_XML: &str = "9043127323207";

/// Copies the sample store into a temp directory
fn prepare_sample() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bookstore.xml");
    std::fs::write(&path, SAMPLE).unwrap();
    (dir, path)
}

async fn open_sample() -> (TempDir, XmlBookStore) {
    let (dir, path) = prepare_sample();
    let store = XmlBookStore::open(path).await.unwrap();
    (dir, store)
}

async fn open_empty() -> (TempDir, XmlBookStore) {
    let dir = TempDir::new().unwrap();
    let store = XmlBookStore::open(dir.path().join("bookstore.xml"))
        .await
        .unwrap();
    (dir, store)
}

fn book(isbn: &str, title: &str) -> Book {
    Book::new(isbn, title, vec!["A".to_string()], 2020, Decimal::TEN).with_title_lang("en")
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn read_all_parses_multiple_authors_and_metadata() {
    let (_dir, store) = open_sample().await;

    let all = store.get_all(&CancellationToken::new()).await.unwrap();
    assert_eq!(all.len(), 4);

    let kick = all.iter().find(|b| b.isbn == KICK_START).unwrap();
    assert_eq!(kick.authors.len(), 5);
    assert!(kick.authors.contains(&"Per Bothner".to_string()));
    assert_eq!(kick.category, "web");
    assert_eq!(kick.title_lang.as_deref(), Some("en"));
    assert_eq!(kick.price, Decimal::new(4999, 2));
}

#[tokio::test]
async fn read_all_preserves_document_order() {
    let (_dir, store) = open_sample().await;

    let isbns: Vec<_> = store
        .get_all(&CancellationToken::new())
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.isbn)
        .collect();

    assert_eq!(isbns, vec!["9781234567897", "9780747532699", KICK_START, LEARNING_XML]);
}

#[tokio::test]
async fn get_by_isbn_finds_expected_book() {
    let (_dir, store) = open_sample().await;

    let found = store
        .get_by_isbn(KICK_START, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.title, "XQuery Kick Start");
    assert_eq!(found.year, 2003);
    assert_eq!(found.cover, None);
}

#[tokio::test]
async fn get_by_isbn_is_exact_match() {
    let (_dir, store) = open_sample().await;
    let cancel = CancellationToken::new();

    assert!(store.get_by_isbn("0000000000000", &cancel).await.unwrap().is_none());
    assert!(store.get_by_isbn(" 9031234567897", &cancel).await.unwrap().is_none());
    assert!(store.get_by_isbn("903123456789", &cancel).await.unwrap().is_none());
}

// =============================================================================
// Add
// =============================================================================

#[tokio::test]
async fn add_to_empty_store_then_read_back() {
    let (_dir, store) = open_empty().await;
    let cancel = CancellationToken::new();
    let input = Book::new("A1", "T", vec!["X".to_string()], 2020, Decimal::new(100, 1));

    assert!(store.add(&input, &cancel).await.unwrap());

    let all = store.get_all(&cancel).await.unwrap();
    assert_eq!(all, vec![input.clone()]);
    assert_eq!(store.get_by_isbn("A1", &cancel).await.unwrap(), Some(input));
}

#[tokio::test]
async fn add_persists_all_fields() {
    let (dir, store) = open_sample().await;
    let cancel = CancellationToken::new();
    let input = Book::new(
        "1112223334445",
        "CLR via C#",
        vec!["Jeffrey Richter".to_string()],
        2012,
        Decimal::new(5999, 2),
    )
    .with_category("programming")
    .with_cover("hardcover")
    .with_title_lang("en");

    assert!(store.add(&input, &cancel).await.unwrap());

    // A fresh store instance sees the same data
    let reopened = XmlBookStore::open(dir.path().join("bookstore.xml"))
        .await
        .unwrap();
    let fetched = reopened.get_by_isbn(&input.isbn, &cancel).await.unwrap();
    assert_eq!(fetched, Some(input));
}

#[tokio::test]
async fn add_returns_false_when_isbn_exists() {
    let (_dir, store) = open_sample().await;
    let cancel = CancellationToken::new();

    let added = store.add(&book(KICK_START, "Duplicate"), &cancel).await.unwrap();
    assert!(!added);

    let existing = store.get_by_isbn(KICK_START, &cancel).await.unwrap().unwrap();
    assert_eq!(existing.title, "XQuery Kick Start");
}

#[tokio::test]
async fn add_rejects_invalid_book() {
    let (_dir, store) = open_empty().await;
    let cancel = CancellationToken::new();

    let mut invalid = book("A1", "T");
    invalid.authors.clear();

    let err = store.add(&invalid, &cancel).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(store.get_all(&cancel).await.unwrap().is_empty());
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn update_existing_book_replaces_content() {
    let (_dir, store) = open_sample().await;
    let cancel = CancellationToken::new();

    let original = store.get_by_isbn(LEARNING_XML, &cancel).await.unwrap().unwrap();
    let updated = Book {
        price: Decimal::new(4150, 2),
        category: "web-tech".to_string(),
        cover: Some("paperback".to_string()),
        title: format!("{} (2nd Ed.)", original.title),
        authors: vec!["Erik T. Ray".to_string(), "Co Author".to_string()],
        ..original
    };

    assert!(store.update(LEARNING_XML, &updated, &cancel).await.unwrap());

    let reloaded = store.get_by_isbn(LEARNING_XML, &cancel).await.unwrap();
    assert_eq!(reloaded, Some(updated));

    // Position in the document is kept
    let all = store.get_all(&cancel).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[3].isbn, LEARNING_XML);
}

#[tokio::test]
async fn update_returns_false_when_book_missing() {
    let (_dir, store) = open_sample().await;

    let updated = book("1111111111111", "Does Not Exist");
    let ok = store
        .update(&updated.isbn, &updated, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!ok);
}

#[tokio::test]
async fn update_rejects_key_mismatch_before_touching_storage() {
    let (dir, store) = open_sample().await;
    let path = dir.path().join("bookstore.xml");
    let before = std::fs::read(&path).unwrap();
    let cancel = CancellationToken::new();

    // Mismatch against an existing key and a missing key
    for path_key in [KICK_START, "DIFFERENT_ISBN"] {
        let err = store
            .update(path_key, &book("1234567890123", "Mismatch"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::KeyMismatch { .. }));
    }

    // Mismatch wins over validation
    let mut invalid = book("1234567890123", "");
    invalid.year = -5;
    let err = store.update(KICK_START, &invalid, &cancel).await.unwrap_err();
    assert!(matches!(err, StoreError::KeyMismatch { .. }));

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_removes_book_and_persists() {
    let (_dir, store) = open_sample().await;
    let cancel = CancellationToken::new();

    assert!(store.delete(KICK_START, &cancel).await.unwrap());
    assert!(store.get_by_isbn(KICK_START, &cancel).await.unwrap().is_none());
    assert_eq!(store.get_all(&cancel).await.unwrap().len(), 3);
}

#[tokio::test]
async fn delete_missing_is_a_no_op() {
    let (dir, store) = open_sample().await;
    let path = dir.path().join("bookstore.xml");
    let before = std::fs::read(&path).unwrap();

    let ok = store
        .delete("0000000000000", &CancellationToken::new())
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

// =============================================================================
// Bulk add
// =============================================================================

#[tokio::test]
async fn add_many_adds_only_new_valid_and_reports_the_rest() {
    let (_dir, store) = open_sample().await;
    let cancel = CancellationToken::new();
    let new_isbn = "1111111111111";

    let no_isbn = book("", "Invalid no isbn");
    let mut no_authors = book("2222222222222", "Invalid no authors");
    no_authors.authors.clear();

    let payload = vec![
        book(new_isbn, "Ok A"),
        book(KICK_START, "Dup existing"),
        book(new_isbn, "Dup in payload"),
        no_isbn,
        no_authors,
    ];

    let result = store.add_many(&payload, &cancel).await.unwrap();

    assert_eq!(result.added_count, 1);
    assert_eq!(result.duplicate_isbns, vec![KICK_START, new_isbn]);
    assert_eq!(result.invalid_isbns, vec!["", "2222222222222"]);

    let added = store.get_by_isbn(new_isbn, &cancel).await.unwrap().unwrap();
    assert_eq!(added.title, "Ok A");

    let existing = store.get_by_isbn(KICK_START, &cancel).await.unwrap().unwrap();
    assert_eq!(existing.title, "XQuery Kick Start");
}

#[tokio::test]
async fn add_many_scenario_with_existing_key() {
    let (_dir, store) = open_empty().await;
    let cancel = CancellationToken::new();
    assert!(store.add(&book("A1", "T"), &cancel).await.unwrap());

    let mut invalid = book("", "T");
    invalid.price = Decimal::new(-1, 0);
    let payload = vec![book("A2", "T"), book("A1", "T"), book("A2", "T"), invalid];

    let result = store.add_many(&payload, &cancel).await.unwrap();

    assert_eq!(result.added_count, 1);
    assert!(result.duplicate_isbns.contains(&"A1".to_string()));
    assert!(result.duplicate_isbns.contains(&"A2".to_string()));
    assert_eq!(result.invalid_isbns, vec![""]);
}

#[tokio::test]
async fn add_many_twice_reports_everything_as_duplicate() {
    let (_dir, store) = open_empty().await;
    let cancel = CancellationToken::new();
    let batch = vec![book("B1", "One"), book("B2", "Two"), book("B3", "Three")];

    let first = store.add_many(&batch, &cancel).await.unwrap();
    assert_eq!(first.added_count, 3);
    assert!(first.duplicate_isbns.is_empty());

    let second = store.add_many(&batch, &cancel).await.unwrap();
    assert_eq!(second.added_count, 0);
    assert_eq!(second.duplicate_isbns, vec!["B1", "B2", "B3"]);
    assert!(second.invalid_isbns.is_empty());

    assert_eq!(store.get_all(&cancel).await.unwrap(), batch);
}

#[tokio::test]
async fn add_many_without_additions_does_not_rewrite() {
    let (dir, store) = open_sample().await;
    let path = dir.path().join("bookstore.xml");
    let before = std::fs::read(&path).unwrap();

    let mut invalid = book("X1", "T");
    invalid.year = 5000;
    let result = store
        .add_many(&[book(KICK_START, "Dup"), invalid], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.added_count, 0);
    // The sample is hand-formatted; an untouched file stays byte-identical
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn add_many_invalid_item_does_not_shadow_valid_twin() {
    let (_dir, store) = open_empty().await;
    let cancel = CancellationToken::new();

    let mut invalid = book("C1", "T");
    invalid.title = "  ".to_string();
    let result = store
        .add_many(&[invalid, book("C1", "Valid")], &cancel)
        .await
        .unwrap();

    assert_eq!(result.added_count, 1);
    assert_eq!(result.invalid_isbns, vec!["C1"]);
    let stored = store.get_by_isbn("C1", &cancel).await.unwrap().unwrap();
    assert_eq!(stored.title, "Valid");
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_key_adds_have_one_winner() {
    let (_dir, store) = open_empty().await;
    let store = Arc::new(store);

    let tasks: Vec<_> = (0..2)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .add(&book("SAME", &format!("Writer {}", i)), &CancellationToken::new())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut wins = 0;
    for task in tasks {
        if task.await.unwrap() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(store.get_all(&CancellationToken::new()).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_are_all_applied() {
    let (_dir, store) = open_sample().await;
    let store = Arc::new(store);
    let cancel = CancellationToken::new();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            store
                .add(&book(&format!("N{:02}", i), "Parallel"), &cancel)
                .await
        }));
    }
    {
        let store = Arc::clone(&store);
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move { store.delete(KICK_START, &cancel).await }));
    }

    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }

    let all = store.get_all(&cancel).await.unwrap();
    assert_eq!(all.len(), 4 + 16 - 1);
    assert!(all.iter().all(|b| b.isbn != KICK_START));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_partial_documents() {
    let (_dir, store) = open_empty().await;
    let store = Arc::new(store);

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            for i in 0..25 {
                store
                    .add(&book(&format!("W{:02}", i), "Writer"), &cancel)
                    .await
                    .unwrap();
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let mut last = 0;
            for _ in 0..50 {
                // Every read parses a complete document
                let count = store.get_all(&cancel).await.unwrap().len();
                assert!(count >= last);
                last = count;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(
        store.get_all(&CancellationToken::new()).await.unwrap().len(),
        25
    );
}
