//! Repository contract exposed to command dispatchers

use std::future::Future;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::StoreError;
use crate::domain::Book;

/// Summary of a bulk insert.
///
/// `duplicate_isbns` lists keys that already existed in the store first,
/// followed by keys repeated within the submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddResult {
    pub added_count: usize,
    pub duplicate_isbns: Vec<String>,
    pub invalid_isbns: Vec<String>,
}

/// Book repository operations.
///
/// Every operation re-reads the store, so results always reflect the latest
/// persisted state. Mutations are serialized per repository instance.
pub trait BookRepository {
    /// Returns all books in document order
    fn get_all(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Book>, StoreError>> + Send;

    /// Looks up a book by exact ISBN
    fn get_by_isbn(
        &self,
        isbn: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Option<Book>, StoreError>> + Send;

    /// Inserts a book; `false` if the ISBN already exists
    fn add(
        &self,
        book: &Book,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Replaces the book stored under `isbn`; `false` if there is none.
    ///
    /// `book.isbn` must equal `isbn`.
    fn update(
        &self,
        isbn: &str,
        book: &Book,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes a book; `false` if the ISBN was not present
    fn delete(
        &self,
        isbn: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Inserts every valid, new book with a single rewrite.
    ///
    /// Per-item problems are reported in the summary; only I/O failures
    /// and cancellation are errors.
    fn add_many(
        &self,
        books: &[Book],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<BulkAddResult, StoreError>> + Send;
}
