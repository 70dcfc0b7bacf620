//! # Command-Line Interface
//!
//! User-facing commands over the book repository.
//!
//! ## Commands
//!
//! | Command | Repository operation |
//! |---------|----------------------|
//! | `list` | get all |
//! | `show <isbn>` | get by ISBN |
//! | `add` | add |
//! | `import <file>` | bulk add |
//! | `update <isbn>` | update |
//! | `delete <isbn>` | delete |
//! | `report` | get all, rendered as HTML |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) to log repository activity to stderr:
//! ```bash
//! bookstore --verbose list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod book;
mod output;

pub use app::{run, Cli, Commands};
pub use book::BookArgs;
pub use output::{Output, OutputFormat};
