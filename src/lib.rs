//! Bookstore - a book repository backed by a single XML document
//!
//! Books are loaded, indexed by ISBN, mutated and written back as one XML
//! document. Writes are serialized per store and replace the file
//! atomically, so concurrent readers always see a complete document.

pub mod cli;
pub mod domain;
pub mod report;
pub mod storage;

pub use domain::{Book, BookInput, ValidationError};
pub use storage::{BookRepository, BulkAddResult, StoreError, XmlBookStore};
