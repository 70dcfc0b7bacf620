//! XML-backed book store
//!
//! The whole collection lives in one XML document. Every operation loads
//! the document from disk and builds a transient ISBN index; nothing is
//! cached between calls. Mutations run under the store's [`WriteGuard`]
//! and finish with a full rewrite: the new document goes to `<path>.tmp`
//! and is renamed over the primary file, so readers never see a partial
//! write.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::StoreConfig;
use super::guard::WriteGuard;
use super::xml::{self, Document, Node};
use super::{BookRepository, BulkAddResult, StoreError};
use crate::domain::Book;

/// Book repository persisted as a single XML document
#[derive(Debug)]
pub struct XmlBookStore {
    path: PathBuf,
    guard: WriteGuard,
}

impl XmlBookStore {
    /// Opens the store at `path`.
    ///
    /// Creates the parent directory and an empty `<bookstore/>` document if
    /// they do not exist yet. Writers are only serialized within one
    /// instance, so share a single store per path.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        ensure_store_exists(&path).await?;

        Ok(Self {
            path,
            guard: WriteGuard::new(),
        })
    }

    /// Opens the store at the path resolved from configuration
    pub async fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open(config.resolve_path()).await
    }

    /// Returns the path to the store document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, cancel: &CancellationToken) -> Result<Document, StoreError> {
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StoreError::Cancelled),
            text = fs::read_to_string(&self.path) => {
                text.map_err(|e| StoreError::io("read", &self.path, e))?
            }
        };

        Document::parse(&text).map_err(|source| StoreError::Document {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the store document. Not cancellable once started.
    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        let bytes = document.to_xml().map_err(|source| StoreError::Document {
            path: self.path.clone(),
            source,
        })?;
        replace_file(&self.path, &bytes).await
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Writes `bytes` next to `path` and swaps the result into place.
///
/// Falls back to copy-then-delete when the rename fails; that window is
/// not crash-atomic.
async fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    replace_file_with(path, bytes, |from, to| fs::rename(from, to)).await
}

async fn replace_file_with<R, F>(path: &Path, bytes: &[u8], rename: R) -> Result<(), StoreError>
where
    R: FnOnce(PathBuf, PathBuf) -> F,
    F: Future<Output = io::Result<()>>,
{
    let temp = temp_path(path);
    write_synced(&temp, bytes)
        .await
        .map_err(|e| StoreError::io("write", &temp, e))?;

    if let Err(e) = rename(temp.clone(), path.to_path_buf()).await {
        warn!(path = %path.display(), error = %e, "Atomic replace failed, falling back to copy");
        fs::copy(&temp, path)
            .await
            .map_err(|e| StoreError::io("copy to", path, e))?;
        fs::remove_file(&temp)
            .await
            .map_err(|e| StoreError::io("remove", &temp, e))?;
    }

    Ok(())
}

async fn ensure_store_exists(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io("create directory", parent, e))?;
    }

    let exists = fs::try_exists(path)
        .await
        .map_err(|e| StoreError::io("check", path, e))?;
    if exists {
        return Ok(());
    }

    let bytes = Document::empty()
        .to_xml()
        .map_err(|source| StoreError::Document {
            path: path.to_path_buf(),
            source,
        })?;

    // Another opener of the same path may win the temp file race
    if let Err(e) = replace_file(path, &bytes).await {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Err(e);
        }
        debug!(path = %path.display(), "Store created by another opener");
        return Ok(());
    }

    debug!(path = %path.display(), "Created empty store");
    Ok(())
}

/// Maps each ISBN to the position of its `<book>` node among the root's
/// children. The first occurrence of a key wins.
fn build_index(document: &Document) -> HashMap<String, usize> {
    let mut index = HashMap::new();

    for (pos, element) in document.book_nodes() {
        match index.entry(xml::book_key(element)) {
            Entry::Occupied(entry) => {
                warn!(isbn = %entry.key(), position = pos, "Duplicate ISBN in store document, keeping first");
            }
            Entry::Vacant(entry) => {
                entry.insert(pos);
            }
        }
    }

    index
}

impl BookRepository for XmlBookStore {
    async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<Book>, StoreError> {
        let document = self.load(cancel).await?;
        Ok(xml::decode(&document))
    }

    async fn get_by_isbn(
        &self,
        isbn: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Book>, StoreError> {
        let document = self.load(cancel).await?;

        let Some((pos, element)) = document
            .book_nodes()
            .find(|(_, element)| xml::book_key(element) == isbn)
        else {
            return Ok(None);
        };

        match xml::decode_book(element) {
            Ok(book) => Ok(Some(book)),
            Err(e) => {
                warn!(isbn, position = pos, error = %e, "Skipping malformed book node");
                Ok(None)
            }
        }
    }

    async fn add(&self, book: &Book, cancel: &CancellationToken) -> Result<bool, StoreError> {
        book.validate()?;

        let _permit = self.guard.acquire(cancel).await?;
        let mut document = self.load(cancel).await?;
        let index = build_index(&document);

        if index.contains_key(&book.isbn) {
            debug!(isbn = %book.isbn, "Add declined, ISBN exists");
            return Ok(false);
        }

        document.root.push_element(xml::encode_book(book));
        self.save(&document).await?;

        debug!(isbn = %book.isbn, "Added book");
        Ok(true)
    }

    async fn update(
        &self,
        isbn: &str,
        book: &Book,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        if isbn != book.isbn {
            return Err(StoreError::KeyMismatch {
                path: isbn.to_string(),
                payload: book.isbn.clone(),
            });
        }
        book.validate()?;

        let _permit = self.guard.acquire(cancel).await?;
        let mut document = self.load(cancel).await?;
        let index = build_index(&document);

        let Some(&pos) = index.get(isbn) else {
            debug!(isbn, "Update declined, ISBN not found");
            return Ok(false);
        };

        document.root.children[pos] = Node::Element(xml::encode_book(book));
        self.save(&document).await?;

        debug!(isbn, "Updated book");
        Ok(true)
    }

    async fn delete(&self, isbn: &str, cancel: &CancellationToken) -> Result<bool, StoreError> {
        let _permit = self.guard.acquire(cancel).await?;
        let mut document = self.load(cancel).await?;
        let index = build_index(&document);

        let Some(&pos) = index.get(isbn) else {
            debug!(isbn, "Delete declined, ISBN not found");
            return Ok(false);
        };

        document.root.children.remove(pos);
        self.save(&document).await?;

        debug!(isbn, "Deleted book");
        Ok(true)
    }

    async fn add_many(
        &self,
        books: &[Book],
        cancel: &CancellationToken,
    ) -> Result<BulkAddResult, StoreError> {
        // 1. Validate each item on its own
        let mut invalid_isbns = Vec::new();
        let mut valid = Vec::with_capacity(books.len());
        for book in books {
            match book.validate() {
                Ok(()) => valid.push(book),
                Err(e) => {
                    debug!(isbn = %book.isbn, reason = %e, "Bulk add rejected invalid book");
                    invalid_isbns.push(book.isbn.clone());
                }
            }
        }

        // 2. First occurrence wins within the batch
        let mut seen = HashSet::new();
        let mut batch_duplicates = Vec::new();
        let mut candidates = Vec::with_capacity(valid.len());
        for book in valid {
            if seen.insert(book.isbn.as_str()) {
                candidates.push(book);
            } else {
                batch_duplicates.push(book.isbn.clone());
            }
        }

        // 3-5. One critical section and at most one rewrite for the batch
        let _permit = self.guard.acquire(cancel).await?;
        let mut document = self.load(cancel).await?;
        let mut index = build_index(&document);

        let mut duplicate_isbns = Vec::new();
        let mut added_count = 0;
        for book in candidates {
            if index.contains_key(&book.isbn) {
                duplicate_isbns.push(book.isbn.clone());
                continue;
            }

            index.insert(book.isbn.clone(), document.root.children.len());
            document.root.push_element(xml::encode_book(book));
            added_count += 1;
        }

        if added_count > 0 {
            self.save(&document).await?;
        }

        // 6. Store duplicates first, then batch duplicates
        duplicate_isbns.extend(batch_duplicates);

        debug!(
            added = added_count,
            duplicates = duplicate_isbns.len(),
            invalid = invalid_isbns.len(),
            "Bulk add finished"
        );

        Ok(BulkAddResult {
            added_count,
            duplicate_isbns,
            invalid_isbns,
        })
    }
}
