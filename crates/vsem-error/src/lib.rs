//! # vsem-error
//!
//! Unified error handling for the vsem analysis core.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: know what went wrong (e.g. `SymbolNotFound`, `DataConflict`)
//! - **Error Context**: assist in locating the cause with key/value context
//!
//! ## Usage
//!
//! ```rust
//! use vsem_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::SymbolNotFound, "symbol 'Foo' not found")
//!         .with_operation("store::find_symbol")
//!         .with_context("module", "/pkg"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible analysis operations return `Result<T, vsem_error::Error>`
//! - Query misses are values (`None` / void symbols), not errors; errors are
//!   reserved for refused mutations and resolution failures the caller asked
//!   to be told about
//! - Same error handled once, subsequent ops only append context

mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using the vsem Error.
pub type Result<T> = std::result::Result<T, Error>;
