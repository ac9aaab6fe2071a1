//! Symbol records and the symbol arena.
//!
//! Every semantic entity (type, function, field, variable) is one [`Symbol`]
//! slot in the [`SymbolManager`] arena. Slots are addressed by [`SymbolId`]
//! (the insertion index); all cross-references between symbols (parent,
//! return type, children) are ids, never references, so the heavily
//! cross-linked graph stays cycle-safe by construction.
//!
//! Mutation goes through the `update_*` entry points, which encode the
//! editor-liveness policy: the first registration of a name at a given row is
//! canonical for its file version, placeholders are freely promoted, and
//! stale re-registrations are refused without touching state.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use strum_macros::Display;

use crate::ast::Range;
use crate::interner::{InternPool, InternedStr};
use crate::scope::ScopeId;

/// Stable index of a symbol in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Sentinel for "no symbol" / the void symbol.
    pub const VOID: SymbolId = SymbolId(u32::MAX);

    pub fn is_void(self) -> bool {
        self == Self::VOID
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for SymbolId {
    fn default() -> Self {
        Self::VOID
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_void() {
            write!(f, "void")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Index of a file path in the store's file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Classification of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SymbolKind {
    #[default]
    Void,
    Placeholder,
    Ref,
    Array,
    Map,
    MultiReturn,
    Optional,
    Result,
    Chan,
    Variadic,
    Function,
    Struct,
    Enum,
    Typedef,
    Interface,
    Field,
    EmbeddedField,
    Variable,
    Sumtype,
    FunctionType,
    Never,
}

impl SymbolKind {
    /// Symbols whose `return_sym` denotes their type.
    pub fn is_returnable(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Variable | SymbolKind::Field
        )
    }

    /// Derived container kinds built on the fly from type expressions.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            SymbolKind::Ref
                | SymbolKind::Array
                | SymbolKind::Map
                | SymbolKind::MultiReturn
                | SymbolKind::Optional
                | SymbolKind::Result
                | SymbolKind::Chan
                | SymbolKind::Variadic
        )
    }

    /// Kinds introduced by a type declaration in source.
    pub fn is_type_definition(self) -> bool {
        matches!(
            self,
            SymbolKind::Struct
                | SymbolKind::Enum
                | SymbolKind::Typedef
                | SymbolKind::Interface
                | SymbolKind::Sumtype
                | SymbolKind::FunctionType
        )
    }

    pub fn is_reference(self) -> bool {
        self == SymbolKind::Ref
    }
}

/// Visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AccessModifier {
    #[default]
    Private,
    PrivateMutable,
    Public,
    PublicMutable,
    Global,
}

/// Source language of a symbol; anything but `V` is a binded interop symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SymbolLanguage {
    #[default]
    V,
    C,
    Js,
}

/// One semantic entity.
///
/// `parent`, `return_sym` and `children` are overloaded by kind:
/// - `parent`: original type of a typedef, receiver of a method, inner type
///   of `ref` / `optional` / `result` / `chan`
/// - `return_sym`: return type of a function, declared type of a variable or
///   field
/// - `children`: type parameters of containers, parameters of functions,
///   fields and methods of structs/interfaces, variants of enums, members of
///   multi-returns
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: InternedStr,
    pub kind: SymbolKind,
    pub access: AccessModifier,
    pub range: Range,
    pub language: SymbolLanguage,
    pub is_top_level: bool,
    pub is_const: bool,
    pub generic_placeholder_len: usize,
    pub interface_children_len: usize,
    pub file_id: FileId,
    pub file_version: i64,
    pub scope: ScopeId,
    pub docstrings: Vec<String>,
    pub parent: SymbolId,
    pub return_sym: SymbolId,
    pub children: SmallVec<[SymbolId; 4]>,
}

impl Symbol {
    pub fn new(name: InternedStr) -> Self {
        Self {
            id: SymbolId::VOID,
            name,
            kind: SymbolKind::Void,
            access: AccessModifier::Private,
            range: Range::default(),
            language: SymbolLanguage::V,
            is_top_level: false,
            is_const: false,
            generic_placeholder_len: 0,
            interface_children_len: 0,
            file_id: FileId(0),
            file_version: 0,
            scope: ScopeId::EMPTY,
            docstrings: Vec::new(),
            parent: SymbolId::VOID,
            return_sym: SymbolId::VOID,
            children: SmallVec::new(),
        }
    }

    pub fn with_kind(mut self, kind: SymbolKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_access(mut self, access: AccessModifier) -> Self {
        self.access = access;
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn with_language(mut self, language: SymbolLanguage) -> Self {
        self.language = language;
        self
    }

    pub fn with_file(mut self, file_id: FileId, file_version: i64) -> Self {
        self.file_id = file_id;
        self.file_version = file_version;
        self
    }

    pub fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_parent(mut self, parent: SymbolId) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_return(mut self, return_sym: SymbolId) -> Self {
        self.return_sym = return_sym;
        self
    }

    pub fn top_level(mut self) -> Self {
        self.is_top_level = true;
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn is_void(&self) -> bool {
        self.kind == SymbolKind::Void
    }
}

/// Why an update was refused by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRejection {
    /// A second declaration of the same name appears later in the same file.
    DefinedLater { existing_row: usize, new_row: usize },
    /// Same kind and file, but the stored version is at least as new.
    StaleVersion { existing: i64, incoming: i64 },
}

impl UpdateRejection {
    /// Stale re-registrations are silently dropped by the registration path;
    /// everything else surfaces as a data-conflict diagnostic.
    pub fn is_stale(&self) -> bool {
        matches!(self, UpdateRejection::StaleVersion { .. })
    }
}

impl std::fmt::Display for UpdateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateRejection::DefinedLater {
                existing_row,
                new_row,
            } => write!(
                f,
                "name already declared at line {} (redeclaration at line {})",
                existing_row + 1,
                new_row + 1
            ),
            UpdateRejection::StaleVersion { existing, incoming } => write!(
                f,
                "stale registration: stored version {} >= incoming {}",
                existing, incoming
            ),
        }
    }
}

impl From<UpdateRejection> for vsem_error::Error {
    fn from(rej: UpdateRejection) -> Self {
        vsem_error::Error::data_conflict(rej.to_string())
            .with_operation("symbols::update_module_symbol")
    }
}

/// Arena of symbols plus the per-module id index.
#[derive(Debug, Clone)]
pub struct SymbolManager {
    interner: InternPool,
    symbols: Vec<Symbol>,
    module_symbols: HashMap<String, Vec<SymbolId>>,
    void_sym: Symbol,
}

impl SymbolManager {
    pub fn new(interner: InternPool) -> Self {
        let void_name = interner.intern("void");
        Self {
            interner,
            symbols: Vec::new(),
            module_symbols: HashMap::new(),
            void_sym: Symbol::new(void_name),
        }
    }

    pub fn interner(&self) -> &InternPool {
        &self.interner
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// A valid id indexes an existing arena slot.
    pub fn is_valid_id(&self, id: SymbolId) -> bool {
        !id.is_void() && id.index() < self.symbols.len()
    }

    /// The void sentinel symbol.
    pub fn void_sym(&self) -> Symbol {
        self.void_sym.clone()
    }

    /// Borrow a symbol slot; `None` on an invalid id.
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        if self.is_valid_id(id) {
            self.symbols.get(id.index())
        } else {
            None
        }
    }

    pub(crate) fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        if self.is_valid_id(id) {
            self.symbols.get_mut(id.index())
        } else {
            None
        }
    }

    /// Copy out a symbol; the void symbol on an invalid id.
    pub fn get_info(&self, id: SymbolId) -> Symbol {
        self.get(id).cloned().unwrap_or_else(|| self.void_sym())
    }

    /// Resolve a symbol's interned name.
    pub fn name_of(&self, sym: &Symbol) -> String {
        self.interner
            .resolve_owned(sym.name)
            .unwrap_or_else(|| "?".to_string())
    }

    /// Compact debug rendering: `{id} {kind} <{name}>`.
    pub fn debug_str(&self, sym: &Symbol) -> String {
        format!("{} {} <{}>", sym.id, sym.kind, self.name_of(sym))
    }

    /// Linear scan of one module's index; the void symbol when absent.
    pub fn get_info_by_name(&self, module_path: &str, name: &str) -> Symbol {
        let Some(name_key) = self.interner.lookup(name) else {
            return self.void_sym();
        };
        let Some(ids) = self.module_symbols.get(module_path) else {
            return self.void_sym();
        };
        for &id in ids {
            if let Some(sym) = self.get(id)
                && sym.name == name_key
            {
                return sym.clone();
            }
        }
        self.void_sym()
    }

    /// Linear scan restricted to the given id list; skips invalid ids.
    pub fn find_symbol_by_name(&self, ids: &[SymbolId], name: &str) -> Option<(Symbol, usize)> {
        let name_key = self.interner.lookup(name)?;
        for (index, &id) in ids.iter().enumerate() {
            let Some(sym) = self.get(id) else { continue };
            if sym.name == name_key {
                return Some((sym.clone(), index));
            }
        }
        Option::None
    }

    /// Find a module symbol by source position: same file, same start row.
    ///
    /// This is the rename-at-same-row lookup: when the user renames an
    /// identifier in place, the incoming registration carries a new name but
    /// the same row, and must update the existing slot instead of inserting.
    pub fn find_symbol_by_row(
        &self,
        module_path: &str,
        file_id: FileId,
        row: usize,
    ) -> Option<Symbol> {
        let ids = self.module_symbols.get(module_path)?;
        for &id in ids {
            let Some(sym) = self.get(id) else { continue };
            if sym.file_id == file_id && sym.range.start_point.row == row {
                return Some(sym.clone());
            }
        }
        Option::None
    }

    /// Ids of all module symbols reachable from `module_path` that live in
    /// `file_id`, recursing into children so that, say, methods added to a
    /// type from another file are attributed to their own file.
    pub fn get_symbols_by_file_id(&self, module_path: &str, file_id: FileId) -> Vec<SymbolId> {
        let Some(ids) = self.module_symbols.get(module_path) else {
            return Vec::new();
        };
        self.filter_by_file_id(ids, file_id)
    }

    fn filter_by_file_id(&self, ids: &[SymbolId], file_id: FileId) -> Vec<SymbolId> {
        let mut seen: HashSet<InternedStr> = HashSet::new();
        let mut out = Vec::new();
        for &id in ids {
            let Some(sym) = self.get(id) else { continue };
            if !seen.insert(sym.name) {
                continue;
            }
            if sym.file_id == file_id {
                out.push(id);
            } else {
                out.extend(self.filter_by_file_id(&sym.children, file_id));
            }
        }
        out
    }

    /// Append a symbol to the arena; its id is the previous length.
    pub fn create_new_symbol_with(&mut self, mut info: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        info.id = id;
        self.symbols.push(info);
        id
    }

    /// Add an id to a module's index. The id is appended only if absent so
    /// the index never holds duplicates.
    pub fn add_symbol_to_module(&mut self, module_path: &str, id: SymbolId) {
        let ids = self.module_symbols.entry(module_path.to_string()).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Ids registered under a module path.
    pub fn module_symbols(&self, module_path: &str) -> &[SymbolId] {
        self.module_symbols
            .get(module_path)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Drop a module's entire index entry. Arena slots stay valid but
    /// unreferenced.
    pub fn remove_module(&mut self, module_path: &str) {
        self.module_symbols.remove(module_path);
    }

    /// Remove one id from a module's index.
    pub fn remove_from_module(&mut self, module_path: &str, id: SymbolId) {
        if let Some(ids) = self.module_symbols.get_mut(module_path) {
            ids.retain(|&existing| existing != id);
        }
    }

    /// Copy the semantic fields of `info` into slot `id`, preserving the
    /// slot's identity: `id`, `is_top_level` and `is_const` are kept.
    pub fn update_symbol(&mut self, id: SymbolId, info: Symbol) {
        let Some(existing) = self.get_mut(id) else {
            return;
        };
        existing.name = info.name;
        existing.kind = info.kind;
        existing.access = info.access;
        existing.range = info.range;
        existing.language = info.language;
        existing.generic_placeholder_len = info.generic_placeholder_len;
        existing.interface_children_len = info.interface_children_len;
        existing.file_id = info.file_id;
        existing.file_version = info.file_version;
        existing.scope = info.scope;
        existing.docstrings = info.docstrings;
        existing.parent = info.parent;
        existing.return_sym = info.return_sym;
        existing.children = info.children;
    }

    /// Update a module symbol under the editor-liveness policy.
    ///
    /// Placeholders are promoted unconditionally. Otherwise the update is
    /// refused when it is a second declaration of the name later in the same
    /// file, or a stale re-registration of the same kind and file.
    pub fn update_module_symbol(
        &mut self,
        id: SymbolId,
        info: Symbol,
    ) -> std::result::Result<(), UpdateRejection> {
        let Some(existing) = self.get(id) else {
            return Ok(());
        };
        if existing.kind != SymbolKind::Placeholder {
            if existing.file_id == info.file_id
                && info.range.start_point.row > existing.range.start_point.row
            {
                return Err(UpdateRejection::DefinedLater {
                    existing_row: existing.range.start_point.row,
                    new_row: info.range.start_point.row,
                });
            }
            if existing.kind == info.kind
                && existing.file_id == info.file_id
                && existing.file_version >= info.file_version
            {
                return Err(UpdateRejection::StaleVersion {
                    existing: existing.file_version,
                    incoming: info.file_version,
                });
            }
        }
        self.update_symbol(id, info);
        Ok(())
    }

    /// Update a scope-local symbol: only the local field subset moves.
    ///
    /// Locals never change kind, parent, children or owning scope across
    /// edits, so those dimensions are left untouched.
    pub fn update_local_symbol(
        &mut self,
        id: SymbolId,
        info: Symbol,
    ) -> std::result::Result<(), UpdateRejection> {
        let Some(existing) = self.get(id) else {
            return Ok(());
        };
        if existing.file_version >= info.file_version {
            return Err(UpdateRejection::StaleVersion {
                existing: existing.file_version,
                incoming: info.file_version,
            });
        }
        let Some(existing) = self.get_mut(id) else {
            return Ok(());
        };
        existing.name = info.name;
        existing.access = info.access;
        existing.range = info.range;
        existing.file_id = info.file_id;
        existing.file_version = info.file_version;
        existing.return_sym = info.return_sym;
        Ok(())
    }

    /// Assign a return type to a symbol (resolver wake path).
    pub fn set_return_sym(&mut self, id: SymbolId, return_sym: SymbolId) {
        if let Some(sym) = self.get_mut(id) {
            sym.return_sym = return_sym;
        }
    }

    /// Append a child id, refusing duplicates by name.
    pub fn add_child(&mut self, parent: SymbolId, child: SymbolId) -> bool {
        let Some(child_sym) = self.get(child) else {
            return false;
        };
        let child_name = child_sym.name;
        let duplicate = self
            .get(parent)
            .map(|p| {
                p.children
                    .iter()
                    .any(|&c| self.get(c).is_some_and(|s| s.name == child_name))
            })
            .unwrap_or(true);
        if duplicate {
            return false;
        }
        if let Some(parent_sym) = self.get_mut(parent) {
            parent_sym.children.push(child);
            true
        } else {
            false
        }
    }

    /// Append a child id without the name-dedup check. Used only for
    /// container type parameters, where `map[string]string` legitimately
    /// repeats a name.
    pub fn add_child_allow_duplicated(&mut self, parent: SymbolId, child: SymbolId) {
        if !self.is_valid_id(child) {
            return;
        }
        if let Some(parent_sym) = self.get_mut(parent) {
            parent_sym.children.push(child);
        }
    }

    /// Detach every child of `parent` with the given name. The child slots
    /// themselves stay in the arena, unreferenced.
    pub fn remove_child_by_name(&mut self, parent: SymbolId, name: &str) {
        let Some(name_key) = self.interner.lookup(name) else {
            return;
        };
        let Some(parent_sym) = self.get(parent) else {
            return;
        };
        let kept: SmallVec<[SymbolId; 4]> = parent_sym
            .children
            .iter()
            .copied()
            .filter(|&c| self.get(c).is_none_or(|s| s.name != name_key))
            .collect();
        if let Some(parent_sym) = self.get_mut(parent) {
            parent_sym.children = kept;
        }
    }

    /// Follow a `ref` symbol to its inner type.
    pub fn deref(&self, sym: &Symbol) -> Symbol {
        if sym.kind.is_reference() {
            self.get_info(sym.parent)
        } else {
            sym.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Point;

    fn manager() -> SymbolManager {
        SymbolManager::new(InternPool::new())
    }

    fn row_range(row: usize) -> Range {
        Range::new(row * 10, row * 10 + 5, Point::new(row, 0), Point::new(row, 5))
    }

    #[test]
    fn invalid_id_yields_void() {
        let mgr = manager();
        assert!(!mgr.is_valid_id(SymbolId(0)));
        assert!(!mgr.is_valid_id(SymbolId::VOID));
        assert!(mgr.get_info(SymbolId(7)).is_void());
    }

    #[test]
    fn create_assigns_insertion_index() {
        let mut mgr = manager();
        let a = mgr.create_new_symbol_with(Symbol::new(mgr.interner().intern("a")));
        let b = mgr.create_new_symbol_with(Symbol::new(mgr.interner().intern("b")));
        assert_eq!(a, SymbolId(0));
        assert_eq!(b, SymbolId(1));
        assert!(mgr.is_valid_id(a));
        assert_eq!(mgr.get_info(b).id, b);
    }

    #[test]
    fn module_index_deduplicates() {
        let mut mgr = manager();
        let id = mgr.create_new_symbol_with(Symbol::new(mgr.interner().intern("x")));
        mgr.add_symbol_to_module("/pkg", id);
        mgr.add_symbol_to_module("/pkg", id);
        assert_eq!(mgr.module_symbols("/pkg"), &[id]);
    }

    #[test]
    fn get_info_by_name_scans_module() {
        let mut mgr = manager();
        let name = mgr.interner().intern("Foo");
        let id = mgr
            .create_new_symbol_with(Symbol::new(name).with_kind(SymbolKind::Struct));
        mgr.add_symbol_to_module("/pkg", id);

        assert_eq!(mgr.get_info_by_name("/pkg", "Foo").id, id);
        assert!(mgr.get_info_by_name("/pkg", "Bar").is_void());
        assert!(mgr.get_info_by_name("/other", "Foo").is_void());
    }

    #[test]
    fn find_symbol_by_name_skips_invalid_ids() {
        let mut mgr = manager();
        let id = mgr.create_new_symbol_with(Symbol::new(mgr.interner().intern("y")));
        let ids = [SymbolId(99), id];
        let (sym, index) = mgr.find_symbol_by_name(&ids, "y").expect("found");
        assert_eq!(sym.id, id);
        assert_eq!(index, 1);
    }

    #[test]
    fn update_symbol_preserves_identity_flags() {
        let mut mgr = manager();
        let name = mgr.interner().intern("c");
        let id = mgr.create_new_symbol_with(
            Symbol::new(name)
                .with_kind(SymbolKind::Variable)
                .top_level()
                .constant(),
        );

        let incoming = Symbol::new(name)
            .with_kind(SymbolKind::Struct)
            .with_file(FileId(3), 9);
        mgr.update_symbol(id, incoming);

        let updated = mgr.get_info(id);
        assert_eq!(updated.id, id);
        assert_eq!(updated.kind, SymbolKind::Struct);
        assert_eq!(updated.file_version, 9);
        assert!(updated.is_top_level);
        assert!(updated.is_const);
    }

    #[test]
    fn placeholder_promotes_unconditionally() {
        let mut mgr = manager();
        let name = mgr.interner().intern("T");
        let id = mgr.create_new_symbol_with(
            Symbol::new(name)
                .with_kind(SymbolKind::Placeholder)
                .with_file(FileId(0), -1),
        );

        let real = Symbol::new(name)
            .with_kind(SymbolKind::Struct)
            .with_file(FileId(0), 0);
        assert!(mgr.update_module_symbol(id, real).is_ok());
        assert_eq!(mgr.get_info(id).kind, SymbolKind::Struct);
    }

    #[test]
    fn update_rejects_later_redeclaration() {
        let mut mgr = manager();
        let name = mgr.interner().intern("dup");
        let id = mgr.create_new_symbol_with(
            Symbol::new(name)
                .with_kind(SymbolKind::Function)
                .with_range(row_range(2))
                .with_file(FileId(0), 1),
        );

        let later = Symbol::new(name)
            .with_kind(SymbolKind::Function)
            .with_range(row_range(8))
            .with_file(FileId(0), 1);
        let err = mgr.update_module_symbol(id, later).unwrap_err();
        assert!(matches!(err, UpdateRejection::DefinedLater { .. }));
        assert!(!err.is_stale());
        // State untouched
        assert_eq!(mgr.get_info(id).range.start_point.row, 2);
    }

    #[test]
    fn update_rejects_stale_version() {
        let mut mgr = manager();
        let name = mgr.interner().intern("f");
        let id = mgr.create_new_symbol_with(
            Symbol::new(name)
                .with_kind(SymbolKind::Function)
                .with_range(row_range(1))
                .with_file(FileId(0), 5),
        );

        let stale = Symbol::new(name)
            .with_kind(SymbolKind::Function)
            .with_range(row_range(1))
            .with_file(FileId(0), 5);
        let err = mgr.update_module_symbol(id, stale).unwrap_err();
        assert!(err.is_stale());
    }

    #[test]
    fn same_row_rename_updates_in_place() {
        let mut mgr = manager();
        let old = mgr.interner().intern("old_name");
        let id = mgr.create_new_symbol_with(
            Symbol::new(old)
                .with_kind(SymbolKind::Function)
                .with_range(row_range(4))
                .with_file(FileId(0), 1),
        );
        mgr.add_symbol_to_module("/pkg", id);

        let found = mgr.find_symbol_by_row("/pkg", FileId(0), 4).expect("row hit");
        assert_eq!(found.id, id);

        let renamed = Symbol::new(mgr.interner().intern("new_name"))
            .with_kind(SymbolKind::Function)
            .with_range(row_range(4))
            .with_file(FileId(0), 2);
        assert!(mgr.update_module_symbol(id, renamed).is_ok());
        assert_eq!(mgr.name_of(&mgr.get_info(id)), "new_name");
    }

    #[test]
    fn update_local_symbol_keeps_structural_fields() {
        let mut mgr = manager();
        let name = mgr.interner().intern("x");
        let ret = mgr.create_new_symbol_with(Symbol::new(mgr.interner().intern("int")));
        let id = mgr.create_new_symbol_with(
            Symbol::new(name)
                .with_kind(SymbolKind::Variable)
                .with_scope(ScopeId(3))
                .with_file(FileId(0), 1),
        );

        let incoming = Symbol::new(name)
            .with_kind(SymbolKind::Struct) // must not take effect
            .with_return(ret)
            .with_file(FileId(0), 2);
        assert!(mgr.update_local_symbol(id, incoming).is_ok());

        let updated = mgr.get_info(id);
        assert_eq!(updated.kind, SymbolKind::Variable);
        assert_eq!(updated.scope, ScopeId(3));
        assert_eq!(updated.return_sym, ret);
        assert_eq!(updated.file_version, 2);
    }

    #[test]
    fn update_local_symbol_rejects_stale() {
        let mut mgr = manager();
        let name = mgr.interner().intern("x");
        let id = mgr.create_new_symbol_with(
            Symbol::new(name)
                .with_kind(SymbolKind::Variable)
                .with_file(FileId(0), 3),
        );
        let stale = Symbol::new(name).with_file(FileId(0), 3);
        assert!(mgr.update_local_symbol(id, stale).unwrap_err().is_stale());
    }

    #[test]
    fn add_child_refuses_duplicate_names() {
        let mut mgr = manager();
        let parent = mgr.create_new_symbol_with(
            Symbol::new(mgr.interner().intern("S")).with_kind(SymbolKind::Struct),
        );
        let field_name = mgr.interner().intern("len");
        let a = mgr.create_new_symbol_with(Symbol::new(field_name).with_kind(SymbolKind::Field));
        let b = mgr.create_new_symbol_with(Symbol::new(field_name).with_kind(SymbolKind::Field));

        assert!(mgr.add_child(parent, a));
        assert!(!mgr.add_child(parent, b));
        assert_eq!(mgr.get_info(parent).children.len(), 1);

        mgr.add_child_allow_duplicated(parent, b);
        assert_eq!(mgr.get_info(parent).children.len(), 2);
    }

    #[test]
    fn deref_follows_ref_parent() {
        let mut mgr = manager();
        let inner = mgr.create_new_symbol_with(
            Symbol::new(mgr.interner().intern("Foo")).with_kind(SymbolKind::Struct),
        );
        let ref_id = mgr.create_new_symbol_with(
            Symbol::new(mgr.interner().intern("&Foo"))
                .with_kind(SymbolKind::Ref)
                .with_parent(inner),
        );

        let deref = mgr.deref(&mgr.get_info(ref_id));
        assert_eq!(deref.id, inner);

        let plain = mgr.deref(&mgr.get_info(inner));
        assert_eq!(plain.id, inner);
    }

    #[test]
    fn symbols_by_file_id_recurses_into_children() {
        let mut mgr = manager();
        let s = mgr.interner().intern("S");
        let m = mgr.interner().intern("method");
        let struct_id = mgr.create_new_symbol_with(
            Symbol::new(s)
                .with_kind(SymbolKind::Struct)
                .with_file(FileId(0), 1),
        );
        let method_id = mgr.create_new_symbol_with(
            Symbol::new(m)
                .with_kind(SymbolKind::Function)
                .with_file(FileId(1), 1),
        );
        mgr.add_child(struct_id, method_id);
        mgr.add_symbol_to_module("/pkg", struct_id);

        let in_first = mgr.get_symbols_by_file_id("/pkg", FileId(0));
        assert_eq!(in_first, vec![struct_id]);

        let in_second = mgr.get_symbols_by_file_id("/pkg", FileId(1));
        assert_eq!(in_second, vec![method_id]);
    }
}
