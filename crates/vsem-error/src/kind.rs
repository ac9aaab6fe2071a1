//! Error kinds for vsem operations.

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
///
/// This enum categorizes errors so callers can match on the category rather
/// than parse messages. The variants mirror the behavioral taxonomy of the
/// analysis core: lookup misses, refused updates, resolver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    // =========================================================================
    // Lookup errors
    // =========================================================================
    /// Symbol not found in any consulted module
    SymbolNotFound,

    /// A symbol id is stale or out of range for the arena
    InvalidSymbolId,

    /// A scope id is stale or out of range for the arena
    InvalidScopeId,

    /// A file path has never been opened in the store
    FileNotOpened,

    // =========================================================================
    // Update-policy errors
    // =========================================================================
    /// An update was refused because it conflicts with the canonical
    /// registration for this file version (stale or late re-registration,
    /// second declaration of a name later in the same file)
    DataConflict,

    /// A waiter with the same symbol id is already registered for the ident
    DuplicateWaiter,

    // =========================================================================
    // Resolution errors
    // =========================================================================
    /// The resolver detected an incompatible return type for a waiter
    TypeMismatch,

    /// A waiter still has a void return type at report time
    UnresolvedSymbol,

    /// A multi-return projection index is out of range
    ProjectionOutOfRange,

    // =========================================================================
    // AST errors
    // =========================================================================
    /// A required child node is missing or the node shape is unexpected
    MalformedAst,
}

impl ErrorKind {
    /// Returns the error kind as a static string.
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Whether this kind is produced by the update policy refusing to touch
    /// state (as opposed to a lookup miss or resolver failure).
    pub fn is_refusal(&self) -> bool {
        matches!(self, ErrorKind::DataConflict | ErrorKind::DuplicateWaiter)
    }
}
