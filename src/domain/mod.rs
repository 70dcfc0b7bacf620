//! Domain models for the bookstore
//!
//! Contains the record shape and its validation rules without any I/O
//! concerns.

mod book;
mod input;

pub use book::{Book, ValidationError, MAX_YEAR, MIN_YEAR};
pub use input::BookInput;
