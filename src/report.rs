//! HTML report of the book collection
//!
//! Produces a single self-contained page (inline CSS, logo embedded as a
//! data URI) so the file can be opened offline.

use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Local};

use crate::domain::Book;

const STYLE: &str = "body{font-family:system-ui,Segoe UI,Arial}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ddd;padding:8px}\
th{background:#f3f4f6;text-align:left}\
tr:nth-child(even){background:#fafafa}\
.logo{max-height:64px}";

/// Everything the report page shows
#[derive(Debug, Clone)]
pub struct ReportModel<'a> {
    pub title: &'a str,
    pub books: &'a [Book],
    pub logo_data_uri: Option<String>,
    pub generated_at: DateTime<Local>,
}

/// Renders the books table as a complete HTML document
pub fn render_books_html(model: &ReportModel<'_>) -> String {
    let mut html = String::with_capacity(1024 + model.books.len() * 256);

    html.push_str("<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{}</title>", escape(model.title)));
    html.push_str(&format!("<style>{}</style></head><body>", STYLE));

    if let Some(uri) = &model.logo_data_uri {
        html.push_str(&format!("<img class=\"logo\" alt=\"logo\" src=\"{}\">", escape(uri)));
    }
    html.push_str(&format!("<h1>{}</h1>", escape(model.title)));
    html.push_str(&format!(
        "<p>Generated {} &middot; {} book(s)</p>",
        model.generated_at.format("%Y-%m-%d %H:%M"),
        model.books.len()
    ));

    html.push_str("<table><thead><tr>");
    for column in ["Title", "Author(s)", "Category", "Year", "Price", "ISBN"] {
        html.push_str(&format!("<th>{}</th>", column));
    }
    html.push_str("</tr></thead><tbody>");

    for book in model.books {
        html.push_str("<tr>");
        html.push_str(&format!("<td>{}</td>", escape(&book.title)));
        html.push_str(&format!("<td>{}</td>", escape(&book.authors.join(", "))));
        html.push_str(&format!("<td>{}</td>", escape(&book.category)));
        html.push_str(&format!("<td>{}</td>", book.year));
        html.push_str(&format!("<td>{}</td>", book.price.round_dp(2).normalize()));
        html.push_str(&format!("<td>{}</td>", escape(&book.isbn)));
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table></body></html>");
    html
}

/// Reads a PNG and returns it as a `data:` URI; `None` if the file is missing
pub async fn logo_data_uri(path: &Path) -> io::Result<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
