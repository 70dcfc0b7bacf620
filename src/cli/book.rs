//! Book CLI commands

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use rust_decimal::Decimal;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::output::Output;
use crate::domain::{Book, BookInput};
use crate::report::{self, ReportModel};
use crate::storage::{BookRepository, ReportConfig, StoreError};

/// Book fields, given as flags or as a JSON document
#[derive(Args, Debug, Default)]
pub struct BookArgs {
    /// Read the book from a JSON file ("-" for stdin)
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["isbn", "title", "authors", "category", "year", "price", "cover", "lang"]
    )]
    pub json: Option<PathBuf>,

    /// ISBN (unique key)
    #[arg(long)]
    pub isbn: Option<String>,

    /// Title
    #[arg(long)]
    pub title: Option<String>,

    /// Author (repeat for several, order is kept)
    #[arg(long = "author", value_name = "AUTHOR")]
    pub authors: Vec<String>,

    /// Category
    #[arg(long)]
    pub category: Option<String>,

    /// Publication year (0-3000)
    #[arg(long)]
    pub year: Option<i32>,

    /// Price (non-negative decimal)
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Cover / binding type
    #[arg(long)]
    pub cover: Option<String>,

    /// Language of the title
    #[arg(long)]
    pub lang: Option<String>,
}

impl BookArgs {
    /// Builds the submitted book; `default_isbn` fills a missing `--isbn`
    async fn into_input(
        self,
        default_isbn: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<BookInput> {
        if let Some(path) = &self.json {
            let content = read_source(path, cancel).await?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse book JSON from {}", path.display()));
        }

        let isbn = self
            .isbn
            .or_else(|| default_isbn.map(str::to_string))
            .context("--isbn is required (or use --json)")?;

        Ok(BookInput {
            isbn,
            title: self.title.unwrap_or_default(),
            authors: self.authors,
            category: self.category.unwrap_or_default(),
            year: self.year.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            cover: self.cover,
            title_lang: self.lang,
        })
    }
}

async fn read_source(path: &Path, cancel: &CancellationToken) -> Result<String> {
    if path == Path::new("-") {
        return read_stdin(cancel).await;
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Reads stdin to the end on a detached thread.
///
/// The thread is outside the runtime's blocking pool, so an unfinished read
/// does not hold up shutdown after cancellation.
async fn read_stdin(cancel: &CancellationToken) -> Result<String> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut content = String::new();
        let result = std::io::stdin().read_to_string(&mut content).map(|_| content);
        let _ = tx.send(result);
    });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled.into()),
        result = rx => result
            .context("Stdin reader stopped")?
            .context("Failed to read stdin"),
    }
}

pub async fn list(
    store: &impl BookRepository,
    output: &Output,
    cancel: &CancellationToken,
) -> Result<()> {
    let books = store.get_all(cancel).await?;

    if output.is_json() {
        output.data(&books);
    } else if books.is_empty() {
        println!("No books");
    } else {
        println!("{:<15} {:<6} {:>10}  TITLE", "ISBN", "YEAR", "PRICE");
        println!("{}", "-".repeat(70));
        for book in &books {
            println!(
                "{:<15} {:<6} {:>10}  {}",
                book.isbn, book.year, book.price, book.title
            );
        }
        println!();
        println!("{} book(s)", books.len());
    }

    Ok(())
}

pub async fn show(
    store: &impl BookRepository,
    output: &Output,
    isbn: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(book) = store.get_by_isbn(isbn, cancel).await? else {
        bail!("Book not found: {}", isbn);
    };

    if output.is_json() {
        output.data(&book);
        return Ok(());
    }

    println!("ISBN:     {}", book.isbn);
    match &book.title_lang {
        Some(lang) => println!("Title:    {} [{}]", book.title, lang),
        None => println!("Title:    {}", book.title),
    }
    println!("Authors:  {}", book.authors.join(", "));
    if !book.category.is_empty() {
        println!("Category: {}", book.category);
    }
    println!("Year:     {}", book.year);
    println!("Price:    {}", book.price);
    if let Some(cover) = &book.cover {
        println!("Cover:    {}", cover);
    }

    Ok(())
}

pub async fn add(
    store: &impl BookRepository,
    output: &Output,
    args: BookArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let book = args.into_input(None, cancel).await?.into_book();

    if !store.add(&book, cancel).await? {
        bail!("Book with this ISBN already exists: {}", book.isbn);
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "added": true,
            "book": book,
        }));
    } else {
        output.success(&format!("Added book: {} - {}", book.isbn, book.title));
    }

    Ok(())
}

pub async fn import(
    store: &impl BookRepository,
    output: &Output,
    file: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let content = read_source(file, cancel).await?;
    let inputs: Vec<BookInput> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse book array from {}", file.display()))?;

    if inputs.is_empty() {
        bail!("Provide a non-empty array of books.");
    }

    let books: Vec<Book> = inputs.into_iter().map(BookInput::into_book).collect();
    let result = store.add_many(&books, cancel).await?;

    if output.is_json() {
        output.data(&result);
    } else {
        println!("Added {} of {} book(s)", result.added_count, books.len());
        if !result.duplicate_isbns.is_empty() {
            println!("Duplicate ISBNs: {:?}", result.duplicate_isbns);
        }
        if !result.invalid_isbns.is_empty() {
            println!("Invalid ISBNs:   {:?}", result.invalid_isbns);
        }
    }

    Ok(())
}

pub async fn update(
    store: &impl BookRepository,
    output: &Output,
    isbn: &str,
    args: BookArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let book = args.into_input(Some(isbn), cancel).await?.into_book();

    if !store.update(isbn, &book, cancel).await? {
        bail!("Book not found: {}", isbn);
    }

    output.success(&format!("Updated book: {} - {}", book.isbn, book.title));
    Ok(())
}

pub async fn delete(
    store: &impl BookRepository,
    output: &Output,
    isbn: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    if !store.delete(isbn, cancel).await? {
        bail!("Book not found: {}", isbn);
    }

    output.success(&format!("Deleted book: {}", isbn));
    Ok(())
}

pub async fn report(
    store: &impl BookRepository,
    output: &Output,
    config: &ReportConfig,
    out: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let books = store.get_all(cancel).await?;

    let logo_data_uri = match &config.logo {
        Some(logo) => report::logo_data_uri(logo)
            .await
            .with_context(|| format!("Failed to read report logo: {}", logo.display()))?,
        None => None,
    };

    let html = report::render_books_html(&ReportModel {
        title: &config.title,
        books: &books,
        logo_data_uri,
        generated_at: Local::now(),
    });

    tokio::fs::write(out, html)
        .await
        .with_context(|| format!("Failed to write report: {}", out.display()))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "report": out.display().to_string(),
            "books": books.len(),
        }));
    } else {
        output.success(&format!(
            "Wrote report with {} book(s) to {}",
            books.len(),
            out.display()
        ));
    }

    Ok(())
}
