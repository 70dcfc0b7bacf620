//! Wire shape for submitted books
//!
//! Books arrive as camelCase JSON (single objects for add/update, arrays
//! for import). String fields are trimmed on the way into the domain.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::book::Book;

/// A book as submitted by a caller
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub isbn: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub title_lang: Option<String>,
}

impl BookInput {
    /// Converts into a domain book, trimming the string fields
    pub fn into_book(self) -> Book {
        Book {
            isbn: self.isbn.trim().to_string(),
            title: self.title.trim().to_string(),
            authors: self.authors,
            category: self.category.trim().to_string(),
            year: self.year,
            price: self.price,
            cover: self.cover.map(|c| c.trim().to_string()),
            title_lang: self.title_lang.map(|l| l.trim().to_string()),
        }
    }
}
