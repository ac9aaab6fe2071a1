//! The store: top-level coordinator of the semantic graph.
//!
//! One [`Store`] holds the whole workspace: the file-path arena, the symbol
//! and scope managers, the resolver, import records, the module dependency
//! tree and the binded/base symbol tables. Every public mutation assumes
//! exclusive access; the embedding language server serializes calls from the
//! editor event loop, so the store carries no locking of its own.
//!
//! Modules are directories: a symbol's module is the directory of the file
//! that declares it, and the global identifier of a symbol is
//! `"{module_dir}/{name}"`.

use std::collections::HashMap;

use tracing::{debug, trace};

use vsem_error::{Error, Result};

use crate::ast::{AstNode, NodeKind, SourceText};
use crate::deps::DependencyTree;
use crate::import::Import;
use crate::infer::Analyzer;
use crate::interner::InternPool;
use crate::resolver::Resolver;
use crate::scope::ScopeManager;
use crate::symbol::{FileId, Symbol, SymbolId, SymbolKind, SymbolLanguage, SymbolManager};

/// Directory part of a path: everything before the last `/`.
pub fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// File-name part of a path: everything after the last `/`.
pub fn file_name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Redirect target for member lookups on derived types: fields and methods
/// of `[]T`, `map[K]V`, `chan T`, `?T` live on the builtin base types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSymbolLocation {
    pub module_name: String,
    pub symbol_name: String,
    pub for_kind: SymbolKind,
}

/// Module location of a foreign-language (`C.` / `JS.`) symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindedSymbolLocation {
    pub language: SymbolLanguage,
    pub name: String,
    pub module_path: String,
}

/// Per-request parameters for [`Store::with`].
#[derive(Debug, Clone, Copy)]
pub struct StoreParams<'a> {
    pub file_path: &'a str,
    pub file_version: i64,
}

/// The semantic graph of an open workspace.
#[derive(Debug, Clone)]
pub struct Store {
    interner: InternPool,
    pub symbols: SymbolManager,
    pub scopes: ScopeManager,
    pub resolver: Resolver,
    pub dependency_tree: DependencyTree,
    file_paths: Vec<String>,
    imports: HashMap<String, Vec<Import>>,
    auto_imports: HashMap<String, String>,
    base_symbol_locations: Vec<BaseSymbolLocation>,
    binded_symbol_locations: Vec<BindedSymbolLocation>,
    anon_fn_counter: u32,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let interner = InternPool::new();
        Self {
            symbols: SymbolManager::new(interner.clone()),
            scopes: ScopeManager::new(),
            resolver: Resolver::new(),
            dependency_tree: DependencyTree::new(),
            interner,
            file_paths: Vec::new(),
            imports: HashMap::new(),
            auto_imports: HashMap::new(),
            base_symbol_locations: Vec::new(),
            binded_symbol_locations: Vec::new(),
            anon_fn_counter: 1,
        }
    }

    pub fn interner(&self) -> &InternPool {
        &self.interner
    }

    /// Per-request analysis context for one file.
    pub fn with(&mut self, params: StoreParams<'_>) -> Analyzer<'_> {
        let file_id = self.file_id_for(params.file_path);
        Analyzer::new(self, file_id, params.file_version)
    }

    // ------------------------------------------------------------------
    // File table
    // ------------------------------------------------------------------

    /// Id for a path, appending it on first sight. The table is append-only;
    /// reuse is by value.
    pub fn file_id_for(&mut self, path: &str) -> FileId {
        if let Some(idx) = self.file_paths.iter().position(|p| p == path) {
            return FileId(idx as u32);
        }
        let id = FileId(self.file_paths.len() as u32);
        self.file_paths.push(path.to_string());
        id
    }

    /// Id for a path, without inserting.
    pub fn lookup_file_id(&self, path: &str) -> Option<FileId> {
        self.file_paths
            .iter()
            .position(|p| p == path)
            .map(|idx| FileId(idx as u32))
    }

    pub fn file_path(&self, file_id: FileId) -> Option<&str> {
        self.file_paths.get(file_id.index()).map(|s| s.as_str())
    }

    pub fn has_file_path(&self, path: &str) -> bool {
        self.lookup_file_id(path).is_some()
    }

    /// Module directory a file id belongs to.
    pub fn module_dir(&self, file_id: FileId) -> &str {
        self.file_path(file_id).map(dir_of).unwrap_or("")
    }

    // ------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------

    /// Global identifier of a symbol: `"{module_dir}/{name}"`. The `/`
    /// separator is guaranteed absent from module and type names.
    pub fn get_ident_of_symbol(&self, sym: &Symbol) -> String {
        format!("{}/{}", self.module_dir(sym.file_id), self.symbols.name_of(sym))
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    /// Record a bootstrap module resolvable from every file (at minimum
    /// `builtin`, reachable under the empty module name).
    pub fn register_auto_import(&mut self, alias: &str, dir: &str) {
        self.auto_imports.insert(alias.to_string(), dir.to_string());
    }

    pub fn is_auto_import_dir(&self, dir: &str) -> bool {
        self.auto_imports.values().any(|d| d == dir)
    }

    pub fn auto_import_dir(&self, alias: &str) -> Option<&str> {
        self.auto_imports.get(alias).map(|s| s.as_str())
    }

    /// Record an import of `import.path` by the module at `dir`, merging
    /// per-file bookkeeping into an existing record for the same module.
    /// Also records the dependency edge for deletion safety.
    pub fn add_import(&mut self, dir: &str, import: Import) {
        self.dependency_tree.add_node(dir);
        self.dependency_tree.add_dependency(dir, &import.path);
        let imports = self.imports.entry(dir.to_string()).or_default();
        match imports
            .iter_mut()
            .find(|i| i.module_name == import.module_name && i.path == import.path)
        {
            Some(existing) => {
                for (file, aliases) in import.aliases {
                    existing.aliases.entry(file).or_default().extend(aliases);
                }
                for (file, symbols) in import.symbols {
                    existing.symbols.entry(file).or_default().extend(symbols);
                }
                for (file, ranges) in import.ranges {
                    existing.ranges.entry(file).or_default().extend(ranges);
                }
            }
            None => imports.push(import),
        }
    }

    pub fn imports_of(&self, dir: &str) -> &[Import] {
        self.imports.get(dir).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether `name` refers to a module from the standpoint of `file_path`:
    /// an import (by name or file alias) or an auto-imported module.
    pub fn is_module(&self, file_path: &str, name: &str) -> bool {
        let file_name = file_name_of(file_path);
        self.imports_of(dir_of(file_path))
            .iter()
            .any(|imp| imp.matches(file_name, name))
            || self.auto_imports.contains_key(name)
    }

    /// Whether the module at `dir_of(file_path)` imports `module_name`.
    pub fn is_imported(&self, file_path: &str, module_name: &str) -> bool {
        let file_name = file_name_of(file_path);
        self.imports_of(dir_of(file_path))
            .iter()
            .any(|imp| imp.matches(file_name, module_name))
    }

    // ------------------------------------------------------------------
    // Base / binded symbol tables
    // ------------------------------------------------------------------

    pub fn add_base_symbol_location(
        &mut self,
        module_name: &str,
        symbol_name: &str,
        for_kind: SymbolKind,
    ) {
        self.base_symbol_locations.push(BaseSymbolLocation {
            module_name: module_name.to_string(),
            symbol_name: symbol_name.to_string(),
            for_kind,
        });
    }

    /// The builtin base type member lookups on a derived kind redirect to
    /// (`array` for `[]T`, `map` for `map[K]V`, ...).
    pub fn base_symbol_for(&self, kind: SymbolKind) -> Option<Symbol> {
        let loc = self
            .base_symbol_locations
            .iter()
            .find(|l| l.for_kind == kind)?;
        let module_dir = self
            .auto_imports
            .get(&loc.module_name)
            .map(|s| s.as_str())
            .unwrap_or(loc.module_name.as_str());
        let found = self.symbols.get_info_by_name(module_dir, &loc.symbol_name);
        if found.is_void() { None } else { Some(found) }
    }

    pub fn binded_symbol_locations(&self) -> &[BindedSymbolLocation] {
        &self.binded_symbol_locations
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register (or update) a module-level symbol and wake any resolver
    /// waiters parked under its global identifier.
    ///
    /// The registration either updates an existing slot (same name in the
    /// module, or same file and start row for in-place renames) or inserts a
    /// new one. Typedefs always insert, so alias chains over one name can
    /// coexist; a candidate that is an anonymous function type is never
    /// updated by a named registration. Stale re-registrations are silently
    /// dropped; a later second declaration of a name is a data conflict.
    pub fn register_symbol(&mut self, info: Symbol) -> Result<SymbolId> {
        let module_path = self.module_dir(info.file_id).to_string();
        let name = self.symbols.name_of(&info);

        let mut candidate = self.symbols.get_info_by_name(&module_path, &name);
        if candidate.is_void()
            && info.kind != SymbolKind::Placeholder
            && !info.kind.is_container()
            && let Some(by_row) = self.symbols.find_symbol_by_row(
                &module_path,
                info.file_id,
                info.range.start_point.row,
            )
        {
            candidate = by_row;
        }

        let id = if !candidate.is_void()
            && info.kind != SymbolKind::Typedef
            && candidate.kind != SymbolKind::FunctionType
        {
            match self.symbols.update_module_symbol(candidate.id, info) {
                Ok(()) => {
                    trace!(module = %module_path, %name, id = %candidate.id, "updated symbol");
                    candidate.id
                }
                Err(rejection) if rejection.is_stale() => {
                    trace!(module = %module_path, %name, "dropped stale registration");
                    candidate.id
                }
                Err(rejection) => {
                    return Err(Error::from(rejection)
                        .with_operation("store::register_symbol")
                        .with_context("symbol", name));
                }
            }
        } else {
            let language = info.language;
            let id = self.symbols.create_new_symbol_with(info);
            self.symbols.add_symbol_to_module(&module_path, id);
            if language != SymbolLanguage::V {
                self.binded_symbol_locations.push(BindedSymbolLocation {
                    language,
                    name: name.clone(),
                    module_path: module_path.clone(),
                });
            }
            trace!(module = %module_path, %name, %id, "inserted symbol");
            id
        };

        let ident = format!("{}/{}", module_path, name);
        self.resolver.resolve_with(&mut self.symbols, &ident, id);
        Ok(id)
    }

    /// Fresh name for an anonymous function type.
    pub(crate) fn next_anon_name(&mut self) -> String {
        let name = format!("#anon_{}", self.anon_fn_counter);
        self.anon_fn_counter += 1;
        name
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve `(module_name, name)` as seen from `file_path`.
    ///
    /// Resolution order: the file's imports (falling back to its own
    /// directory), auto-imported modules, binded symbol locations for
    /// `C.` / `JS.` names, then selectively-imported symbols. The first
    /// non-void hit wins.
    pub fn find_symbol(&self, file_path: &str, module_name: &str, name: &str) -> Result<Symbol> {
        let dir = dir_of(file_path);
        let file_name = file_name_of(file_path);

        let module_path = self
            .imports
            .get(dir)
            .and_then(|imports| {
                imports
                    .iter()
                    .find(|imp| imp.matches(file_name, module_name))
                    .map(|imp| imp.path.clone())
            })
            .unwrap_or_else(|| dir.to_string());
        let found = self.symbols.get_info_by_name(&module_path, name);
        if !found.is_void() {
            return Ok(found);
        }

        if let Some(auto_dir) = self.auto_imports.get(module_name) {
            let found = self.symbols.get_info_by_name(auto_dir, name);
            if !found.is_void() {
                return Ok(found);
            }
        }

        if (name.starts_with("C.") || name.starts_with("JS."))
            && let Some(loc) = self.binded_symbol_locations.iter().find(|l| l.name == name)
        {
            let found = self.symbols.get_info_by_name(&loc.module_path, name);
            if !found.is_void() {
                return Ok(found);
            }
        }

        if let Some(imports) = self.imports.get(dir) {
            for imp in imports {
                if imp.imports_symbol(file_name, name) {
                    let found = self.symbols.get_info_by_name(&imp.path, name);
                    if !found.is_void() {
                        return Ok(found);
                    }
                }
            }
        }

        Err(Error::symbol_not_found(name)
            .with_operation("store::find_symbol")
            .with_context("module", module_name)
            .with_context("file", file_path))
    }

    /// Directory a module name denotes from the standpoint of `file_path`:
    /// the matching import's path, an auto-imported module's directory, or
    /// the file's own directory.
    pub fn resolve_module_dir(&self, file_path: &str, module_name: &str) -> String {
        let dir = dir_of(file_path);
        let file_name = file_name_of(file_path);
        if let Some(imp) = self.imports.get(dir).and_then(|imports| {
            imports.iter().find(|imp| imp.matches(file_name, module_name))
        }) {
            return imp.path.clone();
        }
        if !module_name.is_empty()
            && let Some(auto) = self.auto_imports.get(module_name)
        {
            return auto.clone();
        }
        dir.to_string()
    }

    /// Find a function-type symbol in `module_path` with exactly the given
    /// parameter types and return type. Typedefs over function types are
    /// unwrapped to the underlying function type first. Parameter names are
    /// compared only when `check_names` is set.
    pub fn find_fn_symbol(
        &self,
        module_path: &str,
        params: &[(Option<String>, SymbolId)],
        return_sym: SymbolId,
        check_names: bool,
    ) -> Option<Symbol> {
        for &id in self.symbols.module_symbols(module_path) {
            let Some(candidate) = self.symbols.get(id) else {
                continue;
            };
            let target = match candidate.kind {
                SymbolKind::FunctionType => candidate.clone(),
                SymbolKind::Typedef => {
                    let parent = self.symbols.get_info(candidate.parent);
                    if parent.kind != SymbolKind::FunctionType {
                        continue;
                    }
                    parent
                }
                _ => continue,
            };
            if self.compare_params_and_ret_type(&target, params, return_sym, check_names) {
                return Some(target);
            }
        }
        None
    }

    fn compare_params_and_ret_type(
        &self,
        candidate: &Symbol,
        params: &[(Option<String>, SymbolId)],
        return_sym: SymbolId,
        check_names: bool,
    ) -> bool {
        if candidate.return_sym != return_sym || candidate.children.len() != params.len() {
            return false;
        }
        candidate
            .children
            .iter()
            .zip(params)
            .all(|(&child_id, (name, type_id))| {
                let Some(child) = self.symbols.get(child_id) else {
                    return false;
                };
                if child.return_sym != *type_id {
                    return false;
                }
                if check_names && let Some(name) = name {
                    return self.symbols.name_of(child) == *name;
                }
                true
            })
    }

    /// All symbols of a file: the module's symbols (and reachable children)
    /// whose file id matches.
    pub fn get_symbols_by_file_path(&self, file_path: &str) -> Vec<Symbol> {
        let Some(file_id) = self.lookup_file_id(file_path) else {
            return Vec::new();
        };
        self.symbols
            .get_symbols_by_file_id(dir_of(file_path), file_id)
            .into_iter()
            .map(|id| self.symbols.get_info(id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Tear down a module directory: its symbol index, its imports, and
    /// transitively every dependency nothing else needs.
    ///
    /// Auto-imported modules and modules with live dependents are left
    /// untouched.
    pub fn delete(&mut self, dir: &str) {
        self.delete_with_excluded(dir, &[]);
    }

    /// [`Store::delete`] with dependents under `excluded` ignored. The
    /// recursion passes the module being deleted as excluded so dependency
    /// cycles terminate.
    pub fn delete_with_excluded(&mut self, dir: &str, excluded: &[&str]) {
        if self.is_auto_import_dir(dir) {
            return;
        }
        if self.dependency_tree.has_dependents(dir, excluded) {
            debug!(%dir, "delete skipped: live dependents");
            return;
        }

        let dependencies = self
            .dependency_tree
            .get_node(dir)
            .map(|n| n.get_all_dependencies())
            .unwrap_or_default();
        self.dependency_tree.delete(dir);

        let mut nested: Vec<&str> = excluded.to_vec();
        nested.push(dir);
        for dep in &dependencies {
            self.delete_with_excluded(dep, &nested);
        }

        self.symbols.remove_module(dir);
        self.imports.remove(dir);
        debug!(%dir, "deleted module");
    }

    /// Evict a file's scope tree from the root index.
    pub fn evict_file_scopes(&mut self, file_path: &str) {
        if let Some(file_id) = self.lookup_file_id(file_path) {
            self.scopes.evict_file(file_id);
        }
    }

    /// Editor-event handler for an edited line window: drops module symbols
    /// of the file declared in the window, then prunes scope locals the same
    /// way. Returns true when the file's root scope ends up fully empty.
    pub fn remove_symbols_by_line(
        &mut self,
        file_path: &str,
        start_line: usize,
        end_line: usize,
    ) -> bool {
        let Some(file_id) = self.lookup_file_id(file_path) else {
            return false;
        };
        let dir = dir_of(file_path).to_string();

        let doomed: Vec<SymbolId> = self
            .symbols
            .module_symbols(&dir)
            .iter()
            .copied()
            .filter(|&id| {
                self.symbols.get(id).is_some_and(|sym| {
                    let row = sym.range.start_point.row;
                    sym.file_id == file_id && row >= start_line && row <= end_line
                })
            })
            .collect();
        for id in doomed {
            self.symbols.remove_from_module(&dir, id);
        }

        match self.scopes.root_scope(file_id) {
            Some(root) => self
                .scopes
                .remove_symbols_by_line(&self.symbols, root, start_line, end_line),
            None => false,
        }
    }

    /// Remove declarations of the given top-level node kinds whose start row
    /// falls inside the line window. Methods are detached from their receiver
    /// type's children instead of the module index; binded locations are
    /// pruned alongside.
    pub fn delete_symbol_at_node(
        &mut self,
        file_path: &str,
        root: &AstNode,
        src: &SourceText,
        start_line: usize,
        end_line: usize,
    ) {
        let dir = dir_of(file_path).to_string();
        let file_name = file_name_of(file_path).to_string();

        // Collect names first; mutation happens after the walk.
        let mut module_removals: Vec<String> = Vec::new();
        let mut method_removals: Vec<(String, String)> = Vec::new();
        let mut import_removals: Vec<String> = Vec::new();

        for node in root.named_children() {
            let row = node.range().start_point.row;
            if row < start_line || row > end_line {
                continue;
            }
            match node.kind() {
                NodeKind::ConstDeclaration | NodeKind::GlobalVarDeclaration => {
                    for spec in node.named_children() {
                        if matches!(
                            spec.kind(),
                            NodeKind::ConstSpec | NodeKind::GlobalVarSpec
                        ) && let Some(name_node) = spec.child_by_field_name("name")
                        {
                            module_removals.push(name_node.text(src).to_string());
                        }
                    }
                }
                NodeKind::FunctionDeclaration => {
                    let Some(name_node) = node.child_by_field_name("name") else {
                        continue;
                    };
                    let fn_name = name_node.text(src).to_string();
                    match receiver_type_name(node, src) {
                        Some(receiver) => method_removals.push((receiver, fn_name)),
                        None => module_removals.push(fn_name),
                    }
                }
                NodeKind::StructDeclaration
                | NodeKind::EnumDeclaration
                | NodeKind::InterfaceDeclaration
                | NodeKind::TypeDeclaration => {
                    if let Some(name_node) = node.child_by_field_name("name") {
                        module_removals.push(name_node.text(src).to_string());
                    }
                }
                NodeKind::ImportDeclaration => {
                    let module = node
                        .child_by_field_name("path")
                        .or_else(|| node.child_of_kind(NodeKind::ImportPath))
                        .map(|n| n.text(src).to_string());
                    if let Some(module) = module {
                        import_removals.push(module);
                    }
                }
                _ => {}
            }
        }

        for name in module_removals {
            self.remove_module_symbol(&dir, &name);
        }
        for (receiver, method) in method_removals {
            let owner = self.symbols.get_info_by_name(&dir, &receiver);
            if !owner.is_void() {
                self.symbols.remove_child_by_name(owner.id, &method);
            }
        }
        for module in import_removals {
            self.remove_import_for_file(&dir, &file_name, &module);
        }
    }

    /// Drop one name from a module's index and from the binded table.
    fn remove_module_symbol(&mut self, dir: &str, name: &str) {
        let found = self.symbols.get_info_by_name(dir, name);
        if !found.is_void() {
            self.symbols.remove_from_module(dir, found.id);
        }
        self.binded_symbol_locations
            .retain(|loc| !(loc.module_path == dir && loc.name == name));
    }

    fn remove_import_for_file(&mut self, dir: &str, file_name: &str, module_name: &str) {
        let Some(imports) = self.imports.get_mut(dir) else {
            return;
        };
        for imp in imports.iter_mut() {
            if imp.module_name == module_name {
                imp.remove_file(file_name);
            }
        }
        // An import no file references anymore is dropped entirely. The
        // dependency edge stays until the module itself is deleted.
        imports.retain(|imp| !(imp.module_name == module_name && imp.ranges.is_empty()));
    }
}

fn receiver_type_name(node: &AstNode, src: &SourceText) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let param = receiver
        .child_of_kind(NodeKind::ParameterDeclaration)
        .or(Some(receiver))?;
    let type_node = param
        .child_by_field_name("type")
        .or_else(|| param.named_children().last())?;
    let text = type_node.text(src).trim_start_matches('&').to_string();
    if text.is_empty() { None } else { Some(text) }
}
