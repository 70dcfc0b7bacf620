//! Book domain model
//!
//! A book is the single record type held by the store. Its ISBN is the
//! unique key, compared byte-for-byte with no normalization.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Earliest accepted publication year
pub const MIN_YEAR: i32 = 0;

/// Latest accepted publication year
pub const MAX_YEAR: i32 = 3000;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("ISBN is required")]
    MissingIsbn,

    #[error("Title is required")]
    MissingTitle,

    #[error("At least one author is required")]
    MissingAuthors,

    #[error("Year {0} is out of range (0..=3000)")]
    YearOutOfRange(i32),

    #[error("Price {0} must not be negative")]
    NegativePrice(Decimal),
}

impl ValidationError {
    /// Returns the name of the field that failed validation
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingIsbn => "isbn",
            ValidationError::MissingTitle => "title",
            ValidationError::MissingAuthors => "authors",
            ValidationError::YearOutOfRange(_) => "year",
            ValidationError::NegativePrice(_) => "price",
        }
    }
}

/// A stored book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub authors: Vec<String>,
    pub category: String,
    pub year: i32,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_lang: Option<String>,
}

impl Book {
    /// Creates a book with the required fields; everything else is empty
    pub fn new(
        isbn: impl Into<String>,
        title: impl Into<String>,
        authors: Vec<String>,
        year: i32,
        price: Decimal,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            authors,
            category: String::new(),
            year,
            price,
            cover: None,
            title_lang: None,
        }
    }

    /// Sets the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the cover (binding type)
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    /// Sets the language of the title
    pub fn with_title_lang(mut self, lang: impl Into<String>) -> Self {
        self.title_lang = Some(lang.into());
        self
    }

    /// Checks the book against the storage rules.
    ///
    /// Rules are checked in a fixed order (isbn, title, authors, year,
    /// price) and the first failure is reported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.isbn.trim().is_empty() {
            return Err(ValidationError::MissingIsbn);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.authors.is_empty() {
            return Err(ValidationError::MissingAuthors);
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(ValidationError::YearOutOfRange(self.year));
        }
        if self.price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice(self.price));
        }
        Ok(())
    }

    /// Returns true if the book passes validation
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
