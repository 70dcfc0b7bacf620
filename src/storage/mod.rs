//! # Storage Layer
//!
//! Persistence for the bookstore: one XML document holds every book.
//!
//! ## Storage Format
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Books | XML (`<bookstore>` of `<book>`) | `$XML_STORE_PATH` or `store.path` (default `./data/bookstore.xml`) |
//! | Config | TOML | `./bookstore.toml` or `~/.config/bookstore/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - Mutations on one [`XmlBookStore`] are serialized by a single-permit
//!   [`WriteGuard`]
//! - Reads take no lock; they re-read the file every time
//! - All writes are atomic (temp file + rename), so a reader never sees a
//!   partial document
//! - No cross-process lock is taken
//!
//! ## Key Types
//!
//! - [`BookRepository`] - The six repository operations
//! - [`XmlBookStore`] - XML-backed implementation
//! - [`Config`] - Store and report configuration

mod config;
mod error;
mod guard;
mod repository;
mod store;
pub mod xml;

pub use config::{
    Config, ConfigError, ReportConfig, StoreConfig, DEFAULT_STORE_PATH, LOCAL_CONFIG_FILE,
    STORE_PATH_ENV,
};
pub use error::StoreError;
pub use guard::{WriteGuard, WritePermit};
pub use repository::{BookRepository, BulkAddResult};
pub use store::XmlBookStore;
pub use xml::CodecError;
