//! Lexical scope trees and the scope arena.
//!
//! Each opened file owns one scope tree. The root scope spans the whole file;
//! child scopes are byte ranges strictly inside their parent. A scope
//! contains byte `p` iff `start_byte <= p <= end_byte`. Scope-local symbols
//! are ids into the symbol arena; the scope tree itself stores no symbol
//! data.

use std::collections::HashMap;

use tracing::trace;

use crate::ast::{AstNode, NodeKind};
use crate::symbol::{FileId, Symbol, SymbolId, SymbolManager};

/// Stable index of a scope in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Sentinel carried by top-level symbols, which belong to a module
    /// rather than a lexical scope.
    pub const EMPTY: ScopeId = ScopeId(u32::MAX);

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "empty")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// One byte-range lexical region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTree {
    pub id: ScopeId,
    pub parent: ScopeId,
    pub children: Vec<ScopeId>,
    pub symbols: Vec<SymbolId>,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl ScopeTree {
    /// Inclusive byte containment.
    pub fn contains(&self, byte: usize) -> bool {
        self.start_byte <= byte && byte <= self.end_byte
    }

    pub fn contains_range(&self, start: usize, end: usize) -> bool {
        self.contains(start) && self.contains(end)
    }

    /// Strict containment: the given range fits inside without touching
    /// either boundary on both sides.
    pub fn strictly_contains(&self, start: usize, end: usize) -> bool {
        self.start_byte < start && end < self.end_byte
    }

    /// No local symbols and no child scopes left.
    pub fn is_unused(&self) -> bool {
        self.symbols.is_empty() && self.children.is_empty()
    }

    /// Compact debug rendering: `{id} [{start}..{end}] locals={n}`.
    pub fn debug_str(&self) -> String {
        format!(
            "{} [{}..{}] locals={}",
            self.id,
            self.start_byte,
            self.end_byte,
            self.symbols.len()
        )
    }
}

/// Arena of scopes plus the file-to-root index.
#[derive(Debug, Clone, Default)]
pub struct ScopeManager {
    scopes: Vec<ScopeTree>,
    file_scopes: HashMap<FileId, ScopeId>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn is_valid_id(&self, id: ScopeId) -> bool {
        !id.is_empty() && id.index() < self.scopes.len()
    }

    pub fn get(&self, id: ScopeId) -> Option<&ScopeTree> {
        if self.is_valid_id(id) {
            self.scopes.get(id.index())
        } else {
            None
        }
    }

    fn get_mut(&mut self, id: ScopeId) -> Option<&mut ScopeTree> {
        if self.is_valid_id(id) {
            self.scopes.get_mut(id.index())
        } else {
            None
        }
    }

    /// The root scope of a file, present iff the file has been opened.
    pub fn root_scope(&self, file_id: FileId) -> Option<ScopeId> {
        self.file_scopes.get(&file_id).copied()
    }

    /// Drop a file's root-scope entry. Arena slots stay but become
    /// unreachable from the file index.
    pub fn evict_file(&mut self, file_id: FileId) {
        self.file_scopes.remove(&file_id);
    }

    fn create(&mut self, parent: ScopeId, start_byte: usize, end_byte: usize) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeTree {
            id,
            parent,
            children: Vec::new(),
            symbols: Vec::new(),
            start_byte,
            end_byte,
        });
        id
    }

    /// Resolve the scope a node belongs to, creating scopes as needed.
    ///
    /// For the file root node the file's root scope is created or regrown to
    /// cover the node. For any other node the innermost existing scope is
    /// located; a new child is created only when that scope strictly contains
    /// the node's range, so revisiting an already-known block reuses its
    /// scope.
    pub fn get_scope_from_node(&mut self, file_id: FileId, node: &AstNode) -> ScopeId {
        let range = node.range();
        if node.kind() == NodeKind::SourceFile {
            return match self.root_scope(file_id) {
                Some(root) => {
                    if let Some(scope) = self.get_mut(root) {
                        scope.start_byte = range.start_byte;
                        scope.end_byte = range.end_byte;
                    }
                    root
                }
                None => {
                    let root = self.create(ScopeId::EMPTY, range.start_byte, range.end_byte);
                    self.file_scopes.insert(file_id, root);
                    root
                }
            };
        }

        let root = match self.root_scope(file_id) {
            Some(root) => root,
            None => {
                // The file was never opened through its root node; start a
                // best-effort root covering the node.
                let root = self.create(ScopeId::EMPTY, 0, range.end_byte);
                self.file_scopes.insert(file_id, root);
                root
            }
        };

        let found = self.innermost(root, range.start_byte, range.end_byte);
        let strictly = self
            .get(found)
            .is_some_and(|s| s.strictly_contains(range.start_byte, range.end_byte));
        if strictly {
            let child = self.create(found, range.start_byte, range.end_byte);
            if let Some(parent) = self.get_mut(found) {
                parent.children.push(child);
            }
            trace!(scope = %child, parent = %found, "created child scope");
            child
        } else {
            found
        }
    }

    /// The smallest scope under `from` whose range contains both endpoints;
    /// `from` itself when no child does.
    pub fn innermost(&self, from: ScopeId, start: usize, end: usize) -> ScopeId {
        let Some(scope) = self.get(from) else {
            return from;
        };
        for &child in &scope.children {
            if self
                .get(child)
                .is_some_and(|c| c.contains_range(start, end))
            {
                return self.innermost(child, start, end);
            }
        }
        from
    }

    /// Register a symbol as a local of `scope_id`.
    ///
    /// A local with the same name routes through
    /// [`SymbolManager::update_local_symbol`], so a scope never holds two
    /// locals with one name; stale versions are dropped silently. A local
    /// declared before the scope's recorded start grows the scope leftward.
    pub fn register_symbol(
        &mut self,
        symbols: &mut SymbolManager,
        scope_id: ScopeId,
        mut info: Symbol,
    ) -> SymbolId {
        let start_byte = info.range.start_byte;
        let existing = {
            let Some(scope) = self.get(scope_id) else {
                return SymbolId::VOID;
            };
            scope
                .symbols
                .iter()
                .find(|&&id| symbols.get(id).is_some_and(|s| s.name == info.name))
                .copied()
        };

        let id = match existing {
            Some(existing_id) => {
                if let Err(rejection) = symbols.update_local_symbol(existing_id, info) {
                    trace!(%existing_id, %rejection, "kept existing local");
                }
                existing_id
            }
            None => {
                info.scope = scope_id;
                let id = symbols.create_new_symbol_with(info);
                if let Some(scope) = self.get_mut(scope_id) {
                    scope.symbols.push(id);
                }
                id
            }
        };

        if let Some(scope) = self.get_mut(scope_id)
            && start_byte < scope.start_byte
        {
            scope.start_byte = start_byte;
        }
        id
    }

    /// Remove local symbols whose declaration row falls inside the line
    /// window, recursing into child scopes. Children are visited in reverse
    /// order so in-place deletion stays index-safe; a child that ends up with
    /// no symbols and no children is detached from its parent.
    ///
    /// Returns true iff this scope is left with no symbols and no children.
    pub fn remove_symbols_by_line(
        &mut self,
        symbols: &SymbolManager,
        scope_id: ScopeId,
        start_line: usize,
        end_line: usize,
    ) -> bool {
        if let Some(scope) = self.get_mut(scope_id) {
            let kept: Vec<SymbolId> = scope
                .symbols
                .iter()
                .copied()
                .filter(|&id| {
                    symbols.get(id).is_none_or(|sym| {
                        let row = sym.range.start_point.row;
                        row < start_line || row > end_line
                    })
                })
                .collect();
            scope.symbols = kept;
        } else {
            return true;
        }

        let child_count = self.get(scope_id).map_or(0, |s| s.children.len());
        for i in (0..child_count).rev() {
            let Some(child) = self.get(scope_id).and_then(|s| s.children.get(i).copied()) else {
                continue;
            };
            if self.remove_symbols_by_line(symbols, child, start_line, end_line)
                && let Some(scope) = self.get_mut(scope_id)
            {
                scope.children.remove(i);
            }
        }

        self.get(scope_id).is_none_or(|s| s.is_unused())
    }

    /// All local symbol ids visible before `target_byte`: starting at the
    /// innermost scope containing the byte, walk every enclosing scope up to
    /// the file root and collect locals whose range ends at or before the
    /// target.
    pub fn get_symbols_before(
        &self,
        symbols: &SymbolManager,
        scope_id: ScopeId,
        target_byte: usize,
    ) -> Vec<SymbolId> {
        let mut out = Vec::new();
        let mut current = self.innermost(scope_id, target_byte, target_byte);
        while let Some(scope) = self.get(current) {
            for &id in &scope.symbols {
                if symbols
                    .get(id)
                    .is_some_and(|sym| sym.range.end_byte <= target_byte)
                {
                    out.push(id);
                }
            }
            current = scope.parent;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Point, Range};
    use crate::interner::InternPool;
    use crate::symbol::SymbolKind;

    fn file_node(end: usize) -> AstNode {
        AstNode::new(NodeKind::SourceFile, Range::bytes(0, end))
    }

    fn block_node(start: usize, end: usize) -> AstNode {
        AstNode::new(NodeKind::Block, Range::bytes(start, end))
    }

    fn local(symbols: &mut SymbolManager, name: &str, range: Range, version: i64) -> Symbol {
        Symbol::new(symbols.interner().intern(name))
            .with_kind(SymbolKind::Variable)
            .with_range(range)
            .with_file(FileId(0), version)
    }

    #[test]
    fn root_scope_created_once_and_regrown() {
        let mut scopes = ScopeManager::new();
        let first = scopes.get_scope_from_node(FileId(0), &file_node(100));
        let second = scopes.get_scope_from_node(FileId(0), &file_node(150));

        assert_eq!(first, second);
        assert_eq!(scopes.get(first).unwrap().end_byte, 150);
        assert_eq!(scopes.root_scope(FileId(0)), Some(first));
    }

    #[test]
    fn strictly_nested_node_creates_child() {
        let mut scopes = ScopeManager::new();
        let root = scopes.get_scope_from_node(FileId(0), &file_node(100));
        let body = scopes.get_scope_from_node(FileId(0), &block_node(10, 50));

        assert_ne!(root, body);
        assert_eq!(scopes.get(body).unwrap().parent, root);
        assert_eq!(scopes.get(root).unwrap().children, vec![body]);

        // Revisiting the same block reuses the scope.
        let again = scopes.get_scope_from_node(FileId(0), &block_node(10, 50));
        assert_eq!(body, again);
    }

    #[test]
    fn innermost_descends_to_smallest() {
        let mut scopes = ScopeManager::new();
        let root = scopes.get_scope_from_node(FileId(0), &file_node(100));
        let outer = scopes.get_scope_from_node(FileId(0), &block_node(10, 80));
        let inner = scopes.get_scope_from_node(FileId(0), &block_node(20, 40));

        assert_eq!(scopes.innermost(root, 25, 30), inner);
        assert_eq!(scopes.innermost(root, 60, 70), outer);
        assert_eq!(scopes.innermost(root, 5, 5), root);
    }

    #[test]
    fn register_symbol_dedups_by_name() {
        let mut scopes = ScopeManager::new();
        let mut symbols = SymbolManager::new(InternPool::new());
        let root = scopes.get_scope_from_node(FileId(0), &file_node(100));

        let first = local(&mut symbols, "x", Range::bytes(10, 15), 1);
        let a = scopes.register_symbol(&mut symbols, root, first);

        let second = local(&mut symbols, "x", Range::bytes(12, 18), 2);
        let b = scopes.register_symbol(&mut symbols, root, second);

        assert_eq!(a, b);
        assert_eq!(scopes.get(root).unwrap().symbols.len(), 1);
        assert_eq!(symbols.get_info(a).range, Range::bytes(12, 18));
        assert_eq!(symbols.get_info(a).scope, root);
    }

    #[test]
    fn register_symbol_stale_version_keeps_existing() {
        let mut scopes = ScopeManager::new();
        let mut symbols = SymbolManager::new(InternPool::new());
        let root = scopes.get_scope_from_node(FileId(0), &file_node(100));

        let fresh = local(&mut symbols, "x", Range::bytes(10, 15), 2);
        let a = scopes.register_symbol(&mut symbols, root, fresh);
        let stale = local(&mut symbols, "x", Range::bytes(30, 35), 1);
        let b = scopes.register_symbol(&mut symbols, root, stale);

        assert_eq!(a, b);
        assert_eq!(symbols.get_info(a).range, Range::bytes(10, 15));
    }

    #[test]
    fn register_symbol_grows_scope_leftward() {
        let mut scopes = ScopeManager::new();
        let mut symbols = SymbolManager::new(InternPool::new());
        let root = scopes.get_scope_from_node(FileId(0), &file_node(100));
        let body = scopes.get_scope_from_node(FileId(0), &block_node(40, 80));

        let param = local(&mut symbols, "param", Range::bytes(30, 35), 1);
        scopes.register_symbol(&mut symbols, body, param);
        assert_eq!(scopes.get(body).unwrap().start_byte, 30);
        // Root untouched
        assert_eq!(scopes.get(root).unwrap().start_byte, 0);
    }

    #[test]
    fn remove_symbols_by_line_prunes_empty_children() {
        let mut scopes = ScopeManager::new();
        let mut symbols = SymbolManager::new(InternPool::new());
        let root = scopes.get_scope_from_node(FileId(0), &file_node(400));

        // First function body: lines 1-5
        let body_a = scopes.get_scope_from_node(FileId(0), &block_node(10, 100));
        let local_a = local(
            &mut symbols,
            "a",
            Range::new(20, 25, Point::new(2, 0), Point::new(2, 5)),
            1,
        );
        scopes.register_symbol(&mut symbols, body_a, local_a);

        // Second function body: lines 10-20
        let body_b = scopes.get_scope_from_node(FileId(0), &block_node(200, 390));
        let local_b = local(
            &mut symbols,
            "b",
            Range::new(210, 215, Point::new(11, 0), Point::new(11, 5)),
            1,
        );
        scopes.register_symbol(&mut symbols, body_b, local_b);

        let empty = scopes.remove_symbols_by_line(&symbols, root, 1, 5);
        assert!(!empty, "root still holds the second body scope");
        assert_eq!(scopes.get(root).unwrap().children, vec![body_b]);
        assert_eq!(scopes.get(body_b).unwrap().symbols.len(), 1);
    }

    #[test]
    fn remove_symbols_by_line_reports_fully_empty() {
        let mut scopes = ScopeManager::new();
        let mut symbols = SymbolManager::new(InternPool::new());
        let root = scopes.get_scope_from_node(FileId(0), &file_node(100));
        let only = local(
            &mut symbols,
            "only",
            Range::new(5, 9, Point::new(0, 5), Point::new(0, 9)),
            1,
        );
        scopes.register_symbol(&mut symbols, root, only);

        assert!(scopes.remove_symbols_by_line(&symbols, root, 0, 10));
        assert!(scopes.get(root).unwrap().is_unused());
    }

    #[test]
    fn symbols_before_walks_parent_chain() {
        let mut scopes = ScopeManager::new();
        let mut symbols = SymbolManager::new(InternPool::new());
        let root = scopes.get_scope_from_node(FileId(0), &file_node(200));
        let body = scopes.get_scope_from_node(FileId(0), &block_node(50, 150));

        let g = local(&mut symbols, "g", Range::bytes(5, 10), 1);
        let outer = scopes.register_symbol(&mut symbols, root, g);
        let a = local(&mut symbols, "a", Range::bytes(60, 65), 1);
        let early = scopes.register_symbol(&mut symbols, body, a);
        let z = local(&mut symbols, "z", Range::bytes(120, 130), 1);
        let late = scopes.register_symbol(&mut symbols, body, z);

        let visible = scopes.get_symbols_before(&symbols, root, 100);
        assert!(visible.contains(&early));
        assert!(visible.contains(&outer));
        assert!(!visible.contains(&late));
    }

    #[test]
    fn evict_file_drops_root_index() {
        let mut scopes = ScopeManager::new();
        let root = scopes.get_scope_from_node(FileId(3), &file_node(10));
        scopes.evict_file(FileId(3));
        assert_eq!(scopes.root_scope(FileId(3)), None);
        // Slot itself remains valid, just unreferenced.
        assert!(scopes.get(root).is_some());
    }
}
