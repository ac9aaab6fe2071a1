//! # vsem-core
//!
//! Incremental semantic analysis core for the V language: a persistent
//! symbol/scope graph over an open workspace, updated file-by-file as the
//! editor sends new versions, with deferred resolution of forward and
//! cross-module references and an on-demand type-inference walker over
//! lowered tree-sitter syntax trees.
//!
//! The embedding language server owns parsing, file I/O and the wire
//! protocol; this crate owns the graph. The usual flow per editor event:
//!
//! ```ignore
//! let mut store = Store::new();
//! vsem_core::builtin::bootstrap(&mut store);
//!
//! let mut analyzer = store.with(StoreParams { file_path, file_version });
//! let scope = analyzer.get_scope_from_node(&node);
//! let ty = analyzer.infer_value_type_from_node(&node, &src);
//! ```
//!
//! All mutation is serial: the store embeds no locking and assumes the
//! caller serializes events, the way an LSP event loop already does.

pub mod ast;
pub mod builtin;
pub mod deps;
pub mod import;
pub mod infer;
pub mod interner;
pub mod report;
pub mod resolver;
pub mod scope;
pub mod store;
pub mod symbol;

pub use ast::{AstNode, NodeKind, Point, Range, SourceText, lower};
pub use deps::{DependencyNode, DependencyTree};
pub use import::Import;
pub use infer::Analyzer;
pub use interner::{InternPool, InternedStr};
pub use report::{CollectingReporter, Report, ReportKind, Reporter};
pub use resolver::{ResolutionInfo, Resolver};
pub use scope::{ScopeId, ScopeManager, ScopeTree};
pub use store::{
    BaseSymbolLocation, BindedSymbolLocation, Store, StoreParams, dir_of, file_name_of,
};
pub use symbol::{
    AccessModifier, FileId, Symbol, SymbolId, SymbolKind, SymbolLanguage, SymbolManager,
    UpdateRejection,
};
