//! The type-inference walker.
//!
//! An [`Analyzer`] is the per-request view of the store for one file. It
//! answers the two inference questions a language server asks from a syntax
//! cursor: which symbol does this node declare or denote
//! ([`Analyzer::infer_symbol_from_node`]), and what is the type of this
//! node's value ([`Analyzer::infer_value_type_from_node`]). It also grows
//! the type universe lazily: a derived type (`[]T`, `map[K]V`, `&T`, `?T`,
//! `!T`, `chan T`, `...T`, multi-return) that has never been seen is
//! synthesized on first lookup and registered like any other symbol.
//!
//! Inference never panics on malformed trees: a missing child degrades to
//! the void symbol and the caller decides whether the absence is reportable.

use smallvec::{SmallVec, smallvec};
use tracing::{trace, warn};

use vsem_error::Result;

use crate::ast::{AstNode, NodeKind, SourceText};
use crate::scope::ScopeId;
use crate::store::{Store, dir_of};
use crate::symbol::{AccessModifier, FileId, Symbol, SymbolId, SymbolKind};

/// Pointer depth beyond which unary `&` refuses to stack another reference.
const MAX_PTR_DEPTH: usize = 2;

/// Number of leading `&` in a printable type name.
fn count_ptr(name: &str) -> usize {
    name.chars().take_while(|&c| c == '&').count()
}

/// Per-request analysis context: the store plus the file being analyzed.
pub struct Analyzer<'s> {
    store: &'s mut Store,
    file_id: FileId,
    file_version: i64,
}

impl<'s> Analyzer<'s> {
    pub(crate) fn new(store: &'s mut Store, file_id: FileId, file_version: i64) -> Self {
        Self {
            store,
            file_id,
            file_version,
        }
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn file_version(&self) -> i64 {
        self.file_version
    }

    pub fn file_path(&self) -> String {
        self.store
            .file_path(self.file_id)
            .unwrap_or_default()
            .to_string()
    }

    /// The underlying store, for registrations driven by the walk.
    pub fn store(&mut self) -> &mut Store {
        self.store
    }

    /// Scope of a node, creating scopes on the way (see
    /// [`crate::scope::ScopeManager::get_scope_from_node`]).
    pub fn get_scope_from_node(&mut self, node: &AstNode) -> ScopeId {
        self.store.scopes.get_scope_from_node(self.file_id, node)
    }

    // ------------------------------------------------------------------
    // Type-expression naming
    // ------------------------------------------------------------------

    /// Pure mapping from a type node to `(kind, module, printable name)`.
    ///
    /// The printable form is both the display name and the lookup key of the
    /// derived type inside its module: `&T`, `[]T`, `[4]T`, `map[K]V`,
    /// `chan T`, `?T`, `!T`, `...T`. A `void` inner type of `?` / `!`
    /// collapses to the bare sigil.
    pub fn symbol_name_from_node(node: &AstNode, src: &SourceText) -> (SymbolKind, String, String) {
        match node.kind() {
            NodeKind::PointerType => {
                let (_, _, inner) = Self::inner_tuple(node, src);
                (SymbolKind::Ref, String::new(), format!("&{inner}"))
            }
            NodeKind::ArrayType => {
                let (_, module, inner) = Self::inner_tuple(node, src);
                (SymbolKind::Array, module, format!("[]{inner}"))
            }
            NodeKind::FixedArrayType => {
                let limit = node
                    .child_by_field_name("size")
                    .map(|n| n.text(src).to_string())
                    .unwrap_or_default();
                let element = node
                    .child_by_field_name("element")
                    .or_else(|| node.named_children().last());
                let (module, inner) = match element {
                    Some(element) => {
                        let (_, module, inner) = Self::symbol_name_from_node(element, src);
                        (module, inner)
                    }
                    None => (String::new(), String::new()),
                };
                (SymbolKind::Array, module, format!("[{limit}]{inner}"))
            }
            NodeKind::MapType => {
                let key = node.child_by_field_name("key").or_else(|| node.named_child(0));
                let value = node
                    .child_by_field_name("value")
                    .or_else(|| node.named_child(1));
                let (key_module, key_name) = match key {
                    Some(k) => {
                        let (_, m, n) = Self::symbol_name_from_node(k, src);
                        (m, n)
                    }
                    None => (String::new(), String::new()),
                };
                let (value_module, value_name) = match value {
                    Some(v) => {
                        let (_, m, n) = Self::symbol_name_from_node(v, src);
                        (m, n)
                    }
                    None => (String::new(), String::new()),
                };
                let module = if key_module.is_empty() {
                    value_module
                } else {
                    key_module
                };
                (
                    SymbolKind::Map,
                    module,
                    format!("map[{key_name}]{value_name}"),
                )
            }
            NodeKind::ChannelType => {
                let (_, module, inner) = Self::inner_tuple(node, src);
                (SymbolKind::Chan, module, format!("chan {inner}"))
            }
            NodeKind::OptionType | NodeKind::ResultType => {
                let kind = if node.kind() == NodeKind::OptionType {
                    SymbolKind::Optional
                } else {
                    SymbolKind::Result
                };
                let sigil = if kind == SymbolKind::Optional { "?" } else { "!" };
                let (_, module, mut inner) = Self::inner_tuple(node, src);
                if inner == "void" {
                    inner.clear();
                }
                (kind, module, format!("{sigil}{inner}"))
            }
            NodeKind::VariadicType => {
                let (_, module, inner) = Self::inner_tuple(node, src);
                (SymbolKind::Variadic, module, format!("...{inner}"))
            }
            NodeKind::MultiReturnType => (
                SymbolKind::MultiReturn,
                String::new(),
                node.text(src).to_string(),
            ),
            NodeKind::GenericType => match Self::inner_type_child(node) {
                Some(inner) => Self::symbol_name_from_node(inner, src),
                None => (SymbolKind::Placeholder, String::new(), String::new()),
            },
            NodeKind::FunctionType | NodeKind::FnLiteral => {
                (SymbolKind::FunctionType, String::new(), String::new())
            }
            NodeKind::CallExpression => match node.child_by_field_name("function") {
                Some(function) => Self::symbol_name_from_node(function, src),
                None => (
                    SymbolKind::Placeholder,
                    String::new(),
                    node.text(src).to_string(),
                ),
            },
            NodeKind::QualifiedType => {
                let module = node
                    .child_by_field_name("module")
                    .or_else(|| node.named_child(0))
                    .map(|n| n.text(src).to_string())
                    .unwrap_or_default();
                let name = node
                    .child_by_field_name("name")
                    .or_else(|| node.named_child(1))
                    .map(|n| n.text(src).to_string())
                    .unwrap_or_default();
                (SymbolKind::Placeholder, module, name)
            }
            _ => (
                SymbolKind::Placeholder,
                String::new(),
                node.text(src).to_string(),
            ),
        }
    }

    fn inner_type_child(node: &AstNode) -> Option<&AstNode> {
        node.child_by_field_name("type")
            .or_else(|| node.child_by_field_name("element"))
            .or_else(|| node.named_child(0))
    }

    fn inner_tuple(node: &AstNode, src: &SourceText) -> (SymbolKind, String, String) {
        match Self::inner_type_child(node) {
            Some(inner) => Self::symbol_name_from_node(inner, src),
            None => (SymbolKind::Void, String::new(), String::new()),
        }
    }

    // ------------------------------------------------------------------
    // Type lookup and lazy construction
    // ------------------------------------------------------------------

    /// Resolve a type node to a symbol id, synthesizing derived types on
    /// first sight.
    pub fn find_symbol_by_type_node(
        &mut self,
        node: &AstNode,
        src: &SourceText,
    ) -> Result<SymbolId> {
        let (kind, module, name) = Self::symbol_name_from_node(node, src);
        if kind == SymbolKind::FunctionType {
            return self.find_fn_symbol_by_type_node(node, src);
        }

        let file_path = self.file_path();
        if let Ok(found) = self.store.find_symbol(&file_path, &module, &name) {
            return Ok(found.id);
        }

        match kind {
            SymbolKind::Array => {
                let element = node
                    .child_by_field_name("element")
                    .or_else(|| Self::inner_type_child(node));
                let elem_id = self.resolve_optional_type(element, src);
                self.synthesize_derived(kind, &module, &name, SymbolId::VOID, smallvec![elem_id], elem_id)
            }
            SymbolKind::Map => {
                let key = node.child_by_field_name("key").or_else(|| node.named_child(0));
                let value = node
                    .child_by_field_name("value")
                    .or_else(|| node.named_child(1));
                let key_id = self.resolve_optional_type(key, src);
                let value_id = self.resolve_optional_type(value, src);
                let primary = if self.store.symbols.is_valid_id(key_id) {
                    key_id
                } else {
                    value_id
                };
                self.synthesize_derived(
                    kind,
                    &module,
                    &name,
                    SymbolId::VOID,
                    smallvec![key_id, value_id],
                    primary,
                )
            }
            SymbolKind::Ref | SymbolKind::Chan | SymbolKind::Optional | SymbolKind::Result => {
                let inner = Self::inner_type_child(node);
                let inner_id = self.resolve_optional_type(inner, src);
                self.synthesize_derived(kind, &module, &name, inner_id, SmallVec::new(), inner_id)
            }
            SymbolKind::MultiReturn => {
                let mut components: SmallVec<[SymbolId; 4]> = SmallVec::new();
                let children: Vec<&AstNode> = node.named_children().collect();
                for child in children {
                    components.push(self.find_symbol_by_type_node(child, src).unwrap_or(SymbolId::VOID));
                }
                self.synthesize_derived(kind, &module, &name, SymbolId::VOID, components, SymbolId::VOID)
            }
            SymbolKind::Variadic => {
                let inner = Self::inner_type_child(node);
                let inner_id = self.resolve_optional_type(inner, src);
                self.synthesize_derived(kind, &module, &name, SymbolId::VOID, smallvec![inner_id], inner_id)
            }
            _ => self.synthesize_derived(
                SymbolKind::Placeholder,
                &module,
                &name,
                SymbolId::VOID,
                SmallVec::new(),
                SymbolId::VOID,
            ),
        }
    }

    fn resolve_optional_type(&mut self, node: Option<&AstNode>, src: &SourceText) -> SymbolId {
        match node {
            Some(node) => self.find_symbol_by_type_node(node, src).unwrap_or(SymbolId::VOID),
            None => SymbolId::VOID,
        }
    }

    /// Register a synthesized type in a virtual `placeholder.vv` of its
    /// module. Derived types live in the module of their primary inner type
    /// (`[]string` lands next to `string`); plain placeholders in the module
    /// the name was qualified with, else the current file's module.
    fn synthesize_derived(
        &mut self,
        kind: SymbolKind,
        module_name: &str,
        name: &str,
        parent: SymbolId,
        children: SmallVec<[SymbolId; 4]>,
        primary_inner: SymbolId,
    ) -> Result<SymbolId> {
        if name.is_empty() {
            return Ok(SymbolId::VOID);
        }
        let module_dir = match self
            .store
            .symbols
            .get(primary_inner)
            .map(|inner| inner.file_id)
        {
            Some(inner_file) => self.store.module_dir(inner_file).to_string(),
            None if !module_name.is_empty() => self
                .store
                .resolve_module_dir(&self.file_path(), module_name),
            None => dir_of(&self.file_path()).to_string(),
        };

        let placeholder_file = format!("{}/placeholder.vv", module_dir);
        let file_id = self.store.file_id_for(&placeholder_file);
        let version = if matches!(name, "IError" | "string" | "array" | "map") {
            -1
        } else {
            0
        };

        let mut info = Symbol::new(self.store.interner().intern(name))
            .with_kind(kind)
            .with_access(AccessModifier::Public)
            .with_file(file_id, version)
            .with_parent(parent)
            .top_level();
        info.children = children;

        trace!(%name, %kind, module = %module_dir, "synthesized type");
        self.store.register_symbol(info)
    }

    /// Resolve a function type or fn literal to a function-type symbol,
    /// reusing any existing anonymous symbol with the identical signature
    /// and minting `#anon_{n}` otherwise.
    pub fn find_fn_symbol_by_type_node(
        &mut self,
        node: &AstNode,
        src: &SourceText,
    ) -> Result<SymbolId> {
        let mut params: Vec<(Option<String>, SymbolId)> = Vec::new();
        let param_list = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_of_kind(NodeKind::ParameterList));
        if let Some(list) = param_list {
            let declarations: Vec<&AstNode> = list
                .named_children()
                .filter(|c| c.kind() == NodeKind::ParameterDeclaration)
                .collect();
            for decl in declarations {
                let name = decl
                    .child_by_field_name("name")
                    .map(|n| n.text(src).to_string());
                let type_node = decl
                    .child_by_field_name("type")
                    .or_else(|| decl.named_children().last());
                let type_id = self.resolve_optional_type(type_node, src);
                params.push((name, type_id));
            }
        }

        let return_node = node
            .child_by_field_name("result")
            .or_else(|| node.child_by_field_name("return_type"));
        let return_sym = self.resolve_optional_type(return_node, src);

        let module_dir = dir_of(&self.file_path()).to_string();
        if let Some(existing) = self
            .store
            .find_fn_symbol(&module_dir, &params, return_sym, false)
        {
            return Ok(existing.id);
        }

        let placeholder_file = format!("{}/placeholder.vv", module_dir);
        let file_id = self.store.file_id_for(&placeholder_file);

        let mut children: SmallVec<[SymbolId; 4]> = SmallVec::new();
        for (name, type_id) in &params {
            let interned = self
                .store
                .interner()
                .intern(name.clone().unwrap_or_default());
            let param_sym = self.store.symbols.create_new_symbol_with(
                Symbol::new(interned)
                    .with_kind(SymbolKind::Variable)
                    .with_return(*type_id)
                    .with_file(file_id, 0),
            );
            children.push(param_sym);
        }

        let anon_name = self.store.next_anon_name();
        let mut info = Symbol::new(self.store.interner().intern(&anon_name))
            .with_kind(SymbolKind::FunctionType)
            .with_access(AccessModifier::Public)
            .with_file(file_id, 0)
            .with_return(return_sym)
            .top_level();
        info.children = children;

        trace!(name = %anon_name, params = params.len(), "synthesized function type");
        self.store.register_symbol(info)
    }

    // ------------------------------------------------------------------
    // Declared-symbol inference
    // ------------------------------------------------------------------

    /// The symbol a node declares or denotes: the variable behind an
    /// identifier, the field behind a selector, the function behind a call.
    pub fn infer_symbol_from_node(&mut self, node: &AstNode, src: &SourceText) -> Symbol {
        match node.kind() {
            NodeKind::Identifier
            | NodeKind::FieldIdentifier
            | NodeKind::TypeIdentifier
            | NodeKind::BuiltinType => self.resolve_ident(node, src),
            NodeKind::SelectorExpression => self.resolve_selector(node, src),
            NodeKind::CallExpression => match node.child_by_field_name("function") {
                Some(function) => self.infer_symbol_from_node(function, src),
                None => self.missing_child(node, "function"),
            },
            NodeKind::ParenthesizedExpression => match node.named_child(0) {
                Some(inner) => self.infer_symbol_from_node(inner, src),
                None => self.missing_child(node, "inner expression"),
            },
            NodeKind::FnLiteral => {
                let id = self
                    .find_fn_symbol_by_type_node(node, src)
                    .unwrap_or(SymbolId::VOID);
                self.store.symbols.get_info(id)
            }
            NodeKind::IndexExpression | NodeKind::SliceExpression => {
                self.infer_value_type_from_node(node, src)
            }
            kind if kind.is_type_node() => {
                let id = self
                    .find_symbol_by_type_node(node, src)
                    .unwrap_or(SymbolId::VOID);
                self.store.symbols.get_info(id)
            }
            kind if is_literal(kind) => self.infer_value_type_from_node(node, src),
            other => {
                trace!(kind = %other, "no declared symbol for node");
                self.store.symbols.void_sym()
            }
        }
    }

    /// The type of a node's value.
    pub fn infer_value_type_from_node(&mut self, node: &AstNode, src: &SourceText) -> Symbol {
        match node.kind() {
            NodeKind::IntLiteral => self.builtin_type("int"),
            NodeKind::FloatLiteral => self.builtin_type("f64"),
            NodeKind::InterpretedStringLiteral
            | NodeKind::RawStringLiteral
            | NodeKind::CStringLiteral => self.builtin_type("string"),
            NodeKind::RuneLiteral => self.builtin_type("rune"),
            NodeKind::True | NodeKind::False => self.builtin_type("bool"),
            NodeKind::None => self.builtin_type("none"),

            NodeKind::Identifier
            | NodeKind::FieldIdentifier
            | NodeKind::TypeIdentifier
            | NodeKind::BuiltinType => {
                let sym = self.resolve_ident(node, src);
                self.returnable_type_of(sym)
            }
            NodeKind::SelectorExpression => {
                let member = self.resolve_selector(node, src);
                self.returnable_type_of(member)
            }
            NodeKind::CallExpression => self.infer_call_value(node, src),
            NodeKind::IndexExpression => self.infer_index_value(node, src),
            NodeKind::SliceExpression => {
                // Slicing preserves the container type.
                match node.child_by_field_name("operand").or_else(|| node.named_child(0)) {
                    Some(operand) => self.infer_value_type_from_node(operand, src),
                    None => self.missing_child(node, "operand"),
                }
            }
            NodeKind::UnaryExpression => self.infer_unary_value(node, src),
            NodeKind::BinaryExpression => {
                match node.child_by_field_name("left").or_else(|| node.named_child(0)) {
                    Some(left) => self.infer_value_type_from_node(left, src),
                    None => self.missing_child(node, "left"),
                }
            }
            NodeKind::ParenthesizedExpression => match node.named_child(0) {
                Some(inner) => self.infer_value_type_from_node(inner, src),
                None => self.missing_child(node, "inner expression"),
            },
            NodeKind::TypeInitializer => {
                let type_node = node
                    .child_by_field_name("type")
                    .or_else(|| node.named_child(0));
                match type_node {
                    Some(type_node) => {
                        let id = self
                            .find_symbol_by_type_node(type_node, src)
                            .unwrap_or(SymbolId::VOID);
                        self.store.symbols.get_info(id)
                    }
                    None => self.missing_child(node, "type"),
                }
            }
            NodeKind::FnLiteral => {
                let id = self
                    .find_fn_symbol_by_type_node(node, src)
                    .unwrap_or(SymbolId::VOID);
                self.store.symbols.get_info(id)
            }
            kind if kind.is_type_node() => {
                let id = self
                    .find_symbol_by_type_node(node, src)
                    .unwrap_or(SymbolId::VOID);
                self.store.symbols.get_info(id)
            }
            other => {
                trace!(kind = %other, "unhandled node in value inference");
                self.store.symbols.void_sym()
            }
        }
    }

    // ------------------------------------------------------------------
    // Dispatch helpers
    // ------------------------------------------------------------------

    fn missing_child(&self, node: &AstNode, what: &str) -> Symbol {
        warn!(kind = %node.kind(), %what, "malformed node: missing child");
        self.store.symbols.void_sym()
    }

    /// Identifier resolution: innermost scope locals first, then the
    /// module-level resolution order of the store.
    fn resolve_ident(&mut self, node: &AstNode, src: &SourceText) -> Symbol {
        let name = node.text(src);
        if let Some(root) = self.store.scopes.root_scope(self.file_id) {
            let visible =
                self.store
                    .scopes
                    .get_symbols_before(&self.store.symbols, root, node.start_byte());
            if let Some((sym, _)) = self.store.symbols.find_symbol_by_name(&visible, name) {
                return sym;
            }
        }
        let file_path = self.file_path();
        self.store
            .find_symbol(&file_path, "", name)
            .unwrap_or_else(|_| self.store.symbols.void_sym())
    }

    /// Member resolution for `operand.field`: module access, then fields and
    /// methods of the operand's type, with derived kinds redirected to their
    /// builtin base type.
    fn resolve_selector(&mut self, node: &AstNode, src: &SourceText) -> Symbol {
        let Some(operand) = node.child_by_field_name("operand").or_else(|| node.named_child(0))
        else {
            return self.missing_child(node, "operand");
        };
        let Some(field) = node.child_by_field_name("field").or_else(|| node.named_child(1))
        else {
            return self.missing_child(node, "field");
        };
        let field_name = field.text(src).to_string();

        // `math.pi`: the operand names an imported module.
        if operand.kind() == NodeKind::Identifier {
            let op_text = operand.text(src);
            let file_path = self.file_path();
            if self.store.is_module(&file_path, op_text)
                && let Ok(found) = self.store.find_symbol(&file_path, op_text, &field_name)
            {
                return found;
            }
        }

        let mut owner = self.infer_value_type_from_node(operand, src);
        if owner.kind.is_reference() {
            owner = self.store.symbols.deref(&owner);
        }
        if owner.is_void() {
            return self.store.symbols.void_sym();
        }

        if let Some((member, _)) = self
            .store
            .symbols
            .find_symbol_by_name(&owner.children, &field_name)
        {
            return member;
        }

        // Fields of `[]T` / `map[K]V` / `chan T` / `?T` live on the base type.
        if owner.kind.is_container()
            && let Some(base) = self.store.base_symbol_for(owner.kind)
            && let Some((member, _)) = self
                .store
                .symbols
                .find_symbol_by_name(&base.children, &field_name)
        {
            return member;
        }

        trace!(field = %field_name, owner = %owner.kind, "member not found");
        self.store.symbols.void_sym()
    }

    /// For returnable symbols the type is the `return_sym`; everything else
    /// (a type used as a value, an enum variant) stands for itself.
    fn returnable_type_of(&self, sym: Symbol) -> Symbol {
        if sym.kind.is_returnable() {
            self.store.symbols.get_info(sym.return_sym)
        } else {
            sym
        }
    }

    fn infer_call_value(&mut self, node: &AstNode, src: &SourceText) -> Symbol {
        let callee = match node.child_by_field_name("function") {
            Some(function) => self.infer_symbol_from_node(function, src),
            None => return self.missing_child(node, "function"),
        };
        let mut ret = self.store.symbols.get_info(callee.return_sym);
        // A call with an `or {}` block consumes the option/result wrapper.
        let has_or_block = node.child_of_kind(NodeKind::OrBlock).is_some();
        if has_or_block && matches!(ret.kind, SymbolKind::Optional | SymbolKind::Result) {
            ret = self.store.symbols.get_info(ret.parent);
        }
        ret
    }

    fn infer_index_value(&mut self, node: &AstNode, src: &SourceText) -> Symbol {
        let Some(operand) = node.child_by_field_name("operand").or_else(|| node.named_child(0))
        else {
            return self.missing_child(node, "operand");
        };
        let mut owner = self.infer_value_type_from_node(operand, src);
        if owner.kind.is_reference() {
            owner = self.store.symbols.deref(&owner);
        }
        match owner.kind {
            SymbolKind::Array => match owner.children.first() {
                Some(&elem) => self.store.symbols.get_info(elem),
                None => self.store.symbols.void_sym(),
            },
            SymbolKind::Map => match owner.children.get(1) {
                Some(&value) => self.store.symbols.get_info(value),
                None => self.store.symbols.void_sym(),
            },
            _ if self.store.symbols.name_of(&owner) == "string" => self.builtin_type("u8"),
            _ => {
                trace!(owner = %owner.kind, "index on non-indexable type");
                self.store.symbols.void_sym()
            }
        }
    }

    fn infer_unary_value(&mut self, node: &AstNode, src: &SourceText) -> Symbol {
        let operand = node
            .child_by_field_name("operand")
            .or_else(|| node.named_children().last());
        let Some(operand) = operand else {
            return self.missing_child(node, "operand");
        };
        let operand_type = self.infer_value_type_from_node(operand, src);

        let operator = node
            .children()
            .iter()
            .find(|c| !c.is_named())
            .map(|c| c.text(src))
            .unwrap_or("");
        match operator {
            "&" => self.ref_type_of(&operand_type),
            "*" => self.store.symbols.deref(&operand_type),
            "<-" => {
                if operand_type.kind == SymbolKind::Chan {
                    self.store.symbols.get_info(operand_type.parent)
                } else {
                    self.store.symbols.void_sym()
                }
            }
            _ => operand_type,
        }
    }

    /// `&T` for a given type symbol, reusing an existing one in the type's
    /// module. Operands already more than [`MAX_PTR_DEPTH`] levels deep
    /// refuse another `&`.
    fn ref_type_of(&mut self, inner: &Symbol) -> Symbol {
        if inner.is_void() {
            return self.store.symbols.void_sym();
        }
        let inner_name = self.store.symbols.name_of(inner);
        if count_ptr(&inner_name) > MAX_PTR_DEPTH {
            trace!(name = %inner_name, "pointer depth cap reached");
            return self.store.symbols.void_sym();
        }
        let name = format!("&{inner_name}");
        let module_dir = self.store.module_dir(inner.file_id).to_string();
        let existing = self.store.symbols.get_info_by_name(&module_dir, &name);
        if !existing.is_void() {
            return existing;
        }

        let placeholder_file = format!("{}/placeholder.vv", module_dir);
        let file_id = self.store.file_id_for(&placeholder_file);
        let info = Symbol::new(self.store.interner().intern(&name))
            .with_kind(SymbolKind::Ref)
            .with_access(AccessModifier::Public)
            .with_file(file_id, 0)
            .with_parent(inner.id)
            .top_level();
        match self.store.register_symbol(info) {
            Ok(id) => self.store.symbols.get_info(id),
            Err(_) => self.store.symbols.void_sym(),
        }
    }

    fn builtin_type(&mut self, name: &str) -> Symbol {
        let file_path = self.file_path();
        self.store
            .find_symbol(&file_path, "", name)
            .unwrap_or_else(|_| self.store.symbols.void_sym())
    }
}

fn is_literal(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::IntLiteral
            | NodeKind::FloatLiteral
            | NodeKind::InterpretedStringLiteral
            | NodeKind::RawStringLiteral
            | NodeKind::CStringLiteral
            | NodeKind::RuneLiteral
            | NodeKind::True
            | NodeKind::False
            | NodeKind::None
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Range;
    use crate::builtin;
    use crate::store::StoreParams;
    use pretty_assertions::assert_eq;

    fn store() -> Store {
        let mut store = Store::new();
        builtin::bootstrap(&mut store);
        store
    }

    fn type_ident(src: &SourceText, name: &str) -> AstNode {
        let start = src.as_str().find(name).expect("name present in source");
        AstNode::new(NodeKind::TypeIdentifier, Range::bytes(start, start + name.len()))
    }

    #[test]
    fn names_of_derived_types() {
        let src = SourceText::new("&Foo []Foo [4]Foo map[string]Foo chan Foo ?Foo !Foo ...Foo");

        let pointer = AstNode::new(NodeKind::PointerType, Range::bytes(0, 4))
            .with_field("type", type_ident(&src, "Foo"));
        assert_eq!(
            Analyzer::symbol_name_from_node(&pointer, &src),
            (SymbolKind::Ref, String::new(), "&Foo".to_string())
        );

        let array = AstNode::new(NodeKind::ArrayType, Range::bytes(5, 10))
            .with_field("element", type_ident(&src, "Foo"));
        assert_eq!(
            Analyzer::symbol_name_from_node(&array, &src),
            (SymbolKind::Array, String::new(), "[]Foo".to_string())
        );

        let fixed = AstNode::new(NodeKind::FixedArrayType, Range::bytes(11, 17))
            .with_field("size", AstNode::new(NodeKind::IntLiteral, Range::bytes(12, 13)))
            .with_field("element", type_ident(&src, "Foo"));
        assert_eq!(
            Analyzer::symbol_name_from_node(&fixed, &src),
            (SymbolKind::Array, String::new(), "[4]Foo".to_string())
        );

        let string_start = src.as_str().find("string").unwrap();
        let map = AstNode::new(NodeKind::MapType, Range::bytes(18, 32))
            .with_field(
                "key",
                AstNode::new(
                    NodeKind::TypeIdentifier,
                    Range::bytes(string_start, string_start + 6),
                ),
            )
            .with_field("value", type_ident(&src, "Foo"));
        assert_eq!(
            Analyzer::symbol_name_from_node(&map, &src),
            (SymbolKind::Map, String::new(), "map[string]Foo".to_string())
        );

        let chan = AstNode::new(NodeKind::ChannelType, Range::bytes(33, 41))
            .with_field("type", type_ident(&src, "Foo"));
        assert_eq!(
            Analyzer::symbol_name_from_node(&chan, &src),
            (SymbolKind::Chan, String::new(), "chan Foo".to_string())
        );

        let option = AstNode::new(NodeKind::OptionType, Range::bytes(42, 46))
            .with_field("type", type_ident(&src, "Foo"));
        assert_eq!(
            Analyzer::symbol_name_from_node(&option, &src),
            (SymbolKind::Optional, String::new(), "?Foo".to_string())
        );

        let variadic = AstNode::new(NodeKind::VariadicType, Range::bytes(52, 58))
            .with_field("type", type_ident(&src, "Foo"));
        assert_eq!(
            Analyzer::symbol_name_from_node(&variadic, &src),
            (SymbolKind::Variadic, String::new(), "...Foo".to_string())
        );
    }

    #[test]
    fn bare_option_collapses_to_sigil() {
        let src = SourceText::new("?");
        let option = AstNode::new(NodeKind::OptionType, Range::bytes(0, 1));
        assert_eq!(
            Analyzer::symbol_name_from_node(&option, &src),
            (SymbolKind::Optional, String::new(), "?".to_string())
        );
    }

    #[test]
    fn qualified_type_splits_module_and_name() {
        let src = SourceText::new("math.Complex");
        let qualified = AstNode::new(NodeKind::QualifiedType, Range::bytes(0, 12))
            .with_field("module", AstNode::new(NodeKind::ModuleIdentifier, Range::bytes(0, 4)))
            .with_field("name", AstNode::new(NodeKind::TypeIdentifier, Range::bytes(5, 12)));
        assert_eq!(
            Analyzer::symbol_name_from_node(&qualified, &src),
            (
                SymbolKind::Placeholder,
                "math".to_string(),
                "Complex".to_string()
            )
        );
    }

    #[test]
    fn derived_array_type_dedups() {
        let mut store = store();
        let src = SourceText::new("[]int");
        let array = AstNode::new(NodeKind::ArrayType, Range::bytes(0, 5)).with_field(
            "element",
            AstNode::new(NodeKind::TypeIdentifier, Range::bytes(2, 5)),
        );

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let first = analyzer.find_symbol_by_type_node(&array, &src).unwrap();
        let second = analyzer.find_symbol_by_type_node(&array, &src).unwrap();
        assert_eq!(first, second);

        let sym = store.symbols.get_info(first);
        assert_eq!(sym.kind, SymbolKind::Array);
        assert_eq!(sym.children.len(), 1);

        // The derived type lives next to its element type, in builtin, and
        // exactly once.
        let count = store
            .symbols
            .module_symbols(builtin::BUILTIN_DIR)
            .iter()
            .filter(|&&id| store.symbols.name_of(&store.symbols.get_info(id)) == "[]int")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn unknown_type_synthesizes_placeholder() {
        let mut store = store();
        let src = SourceText::new("Mystery");
        let node = AstNode::new(NodeKind::TypeIdentifier, Range::bytes(0, 7));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let id = analyzer.find_symbol_by_type_node(&node, &src).unwrap();

        let sym = store.symbols.get_info(id);
        assert_eq!(sym.kind, SymbolKind::Placeholder);
        assert_eq!(store.symbols.name_of(&sym), "Mystery");
        assert_eq!(
            store.file_path(sym.file_id),
            Some("/pkg/placeholder.vv")
        );
        // Placeholder registrations are reachable by lookup afterwards.
        assert_eq!(store.find_symbol("/pkg/a.v", "", "Mystery").unwrap().id, id);
    }

    #[test]
    fn option_type_wires_parent() {
        let mut store = store();
        let src = SourceText::new("?int");
        let node = AstNode::new(NodeKind::OptionType, Range::bytes(0, 4))
            .with_field("type", AstNode::new(NodeKind::TypeIdentifier, Range::bytes(1, 4)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let id = analyzer.find_symbol_by_type_node(&node, &src).unwrap();
        let sym = store.symbols.get_info(id);
        assert_eq!(sym.kind, SymbolKind::Optional);
        let inner = store.symbols.get_info(sym.parent);
        assert_eq!(store.symbols.name_of(&inner), "int");
    }

    #[test]
    fn map_type_wires_key_and_value() {
        let mut store = store();
        let src = SourceText::new("map[string]int");
        let node = AstNode::new(NodeKind::MapType, Range::bytes(0, 14))
            .with_field("key", AstNode::new(NodeKind::TypeIdentifier, Range::bytes(4, 10)))
            .with_field("value", AstNode::new(NodeKind::TypeIdentifier, Range::bytes(11, 14)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let id = analyzer.find_symbol_by_type_node(&node, &src).unwrap();
        let sym = store.symbols.get_info(id);
        assert_eq!(sym.kind, SymbolKind::Map);
        assert_eq!(sym.children.len(), 2);
        let key = store.symbols.get_info(sym.children[0]);
        let value = store.symbols.get_info(sym.children[1]);
        assert_eq!(store.symbols.name_of(&key), "string");
        assert_eq!(store.symbols.name_of(&value), "int");
    }

    #[test]
    fn fn_type_synthesis_and_dedup() {
        let mut store = store();
        let src = SourceText::new("fn (x int) string");
        let make_fn_node = || {
            AstNode::new(NodeKind::FunctionType, Range::bytes(0, 17))
                .with_field(
                    "parameters",
                    AstNode::new(NodeKind::ParameterList, Range::bytes(3, 10)).with_child(
                        AstNode::new(NodeKind::ParameterDeclaration, Range::bytes(4, 9))
                            .with_field("name", AstNode::new(NodeKind::Identifier, Range::bytes(4, 5)))
                            .with_field("type", AstNode::new(NodeKind::TypeIdentifier, Range::bytes(6, 9))),
                    ),
                )
                .with_field("result", AstNode::new(NodeKind::TypeIdentifier, Range::bytes(11, 17)))
        };

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let first = analyzer.find_symbol_by_type_node(&make_fn_node(), &src).unwrap();
        let second = analyzer.find_symbol_by_type_node(&make_fn_node(), &src).unwrap();
        assert_eq!(first, second);

        let sym = store.symbols.get_info(first);
        assert_eq!(sym.kind, SymbolKind::FunctionType);
        assert_eq!(store.symbols.name_of(&sym), "#anon_1");
        assert_eq!(sym.children.len(), 1);
        let ret = store.symbols.get_info(sym.return_sym);
        assert_eq!(store.symbols.name_of(&ret), "string");
    }

    #[test]
    fn literal_value_types() {
        let mut store = store();
        let src = SourceText::new("42 2.5 'x' \"hi\" true none");
        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });

        let int_node = AstNode::new(NodeKind::IntLiteral, Range::bytes(0, 2));
        let int_ty = analyzer.infer_value_type_from_node(&int_node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&int_ty), "int");

        let float_node = AstNode::new(NodeKind::FloatLiteral, Range::bytes(3, 6));
        let float_ty = analyzer.infer_value_type_from_node(&float_node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&float_ty), "f64");

        let rune_node = AstNode::new(NodeKind::RuneLiteral, Range::bytes(7, 10));
        let rune_ty = analyzer.infer_value_type_from_node(&rune_node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&rune_ty), "rune");

        let string_node =
            AstNode::new(NodeKind::InterpretedStringLiteral, Range::bytes(11, 15));
        let string_ty = analyzer.infer_value_type_from_node(&string_node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&string_ty), "string");

        let bool_node = AstNode::new(NodeKind::True, Range::bytes(16, 20));
        let bool_ty = analyzer.infer_value_type_from_node(&bool_node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&bool_ty), "bool");
    }

    #[test]
    fn identifier_value_resolves_local_first() {
        let mut store = store();
        let src = SourceText::new("x := 1\nx");

        let file_id = store.file_id_for("/pkg/a.v");
        let root = store.scopes.get_scope_from_node(
            file_id,
            &AstNode::new(NodeKind::SourceFile, Range::bytes(0, 100)),
        );
        let int_sym = store.find_symbol("/pkg/a.v", "", "int").unwrap().id;
        let local = Symbol::new(store.interner().intern("x"))
            .with_kind(SymbolKind::Variable)
            .with_range(Range::bytes(0, 6))
            .with_return(int_sym)
            .with_file(file_id, 1);
        store.scopes.register_symbol(&mut store.symbols, root, local);

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        // The reference site at byte 7 sees the declaration ending at byte 6.
        let node = AstNode::new(NodeKind::Identifier, Range::bytes(7, 8));
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "int");
    }

    #[test]
    fn selector_on_array_uses_base_symbol() {
        let mut store = store();
        let src = SourceText::new("items.len");

        // `items` is a module-level []string variable.
        let file_id = store.file_id_for("/pkg/a.v");
        let arr = store.find_symbol("/pkg/a.v", "", "[]string").unwrap().id;
        let items = Symbol::new(store.interner().intern("items"))
            .with_kind(SymbolKind::Variable)
            .with_return(arr)
            .with_file(file_id, 1)
            .top_level();
        store.register_symbol(items).unwrap();

        let node = AstNode::new(NodeKind::SelectorExpression, Range::bytes(0, 9))
            .with_field("operand", AstNode::new(NodeKind::Identifier, Range::bytes(0, 5)))
            .with_field("field", AstNode::new(NodeKind::FieldIdentifier, Range::bytes(6, 9)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let member = analyzer.infer_symbol_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&member), "len");
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "int");
    }

    #[test]
    fn selector_through_module_access() {
        let mut store = store();
        let src = SourceText::new("math.pi");

        let dep_file = store.file_id_for("/vlib/math/math.v");
        let f64_sym = store.find_symbol("/pkg/a.v", "", "f64").unwrap().id;
        let pi = Symbol::new(store.interner().intern("pi"))
            .with_kind(SymbolKind::Variable)
            .with_return(f64_sym)
            .with_file(dep_file, 1)
            .top_level();
        store.register_symbol(pi).unwrap();

        let mut import = crate::import::Import::new("math", "/vlib/math");
        import.add_range("a.v", Range::bytes(0, 11));
        store.add_import("/pkg", import);

        let node = AstNode::new(NodeKind::SelectorExpression, Range::bytes(0, 7))
            .with_field("operand", AstNode::new(NodeKind::Identifier, Range::bytes(0, 4)))
            .with_field("field", AstNode::new(NodeKind::FieldIdentifier, Range::bytes(5, 7)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "f64");
    }

    #[test]
    fn call_value_is_return_type() {
        let mut store = store();
        let src = SourceText::new("answer()");

        let file_id = store.file_id_for("/pkg/a.v");
        let int_sym = store.find_symbol("/pkg/a.v", "", "int").unwrap().id;
        let answer = Symbol::new(store.interner().intern("answer"))
            .with_kind(SymbolKind::Function)
            .with_return(int_sym)
            .with_file(file_id, 1)
            .top_level();
        store.register_symbol(answer).unwrap();

        let node = AstNode::new(NodeKind::CallExpression, Range::bytes(0, 8))
            .with_field("function", AstNode::new(NodeKind::Identifier, Range::bytes(0, 6)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "int");
    }

    #[test]
    fn call_with_or_block_unwraps_result() {
        let mut store = store();
        let src = SourceText::new("read() or { return }");

        let file_id = store.file_id_for("/pkg/a.v");
        let string_sym = store.find_symbol("/pkg/a.v", "", "string").unwrap().id;
        let result_ty = store.symbols.create_new_symbol_with(
            Symbol::new(store.interner().intern("!string"))
                .with_kind(SymbolKind::Result)
                .with_parent(string_sym)
                .with_file(file_id, 1),
        );
        let read = Symbol::new(store.interner().intern("read"))
            .with_kind(SymbolKind::Function)
            .with_return(result_ty)
            .with_file(file_id, 1)
            .top_level();
        store.register_symbol(read).unwrap();

        let node = AstNode::new(NodeKind::CallExpression, Range::bytes(0, 20))
            .with_field("function", AstNode::new(NodeKind::Identifier, Range::bytes(0, 4)))
            .with_child(AstNode::new(NodeKind::OrBlock, Range::bytes(7, 20)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "string");
    }

    #[test]
    fn index_value_types() {
        let mut store = store();
        let src = SourceText::new("items[0]");

        let file_id = store.file_id_for("/pkg/a.v");
        let arr = store.find_symbol("/pkg/a.v", "", "[]string").unwrap().id;
        let items = Symbol::new(store.interner().intern("items"))
            .with_kind(SymbolKind::Variable)
            .with_return(arr)
            .with_file(file_id, 1)
            .top_level();
        store.register_symbol(items).unwrap();

        let node = AstNode::new(NodeKind::IndexExpression, Range::bytes(0, 8))
            .with_field("operand", AstNode::new(NodeKind::Identifier, Range::bytes(0, 5)))
            .with_field("index", AstNode::new(NodeKind::IntLiteral, Range::bytes(6, 7)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "string");
    }

    #[test]
    fn unary_ref_builds_pointer_type_with_depth_cap() {
        let mut store = store();
        let src = SourceText::new("x := 1\n&x");

        let file_id = store.file_id_for("/pkg/a.v");
        let root = store.scopes.get_scope_from_node(
            file_id,
            &AstNode::new(NodeKind::SourceFile, Range::bytes(0, 100)),
        );
        let int_sym = store.find_symbol("/pkg/a.v", "", "int").unwrap().id;
        let local = Symbol::new(store.interner().intern("x"))
            .with_kind(SymbolKind::Variable)
            .with_range(Range::bytes(0, 6))
            .with_return(int_sym)
            .with_file(file_id, 1);
        store.scopes.register_symbol(&mut store.symbols, root, local);

        let node = AstNode::new(NodeKind::UnaryExpression, Range::bytes(7, 9))
            .with_token(NodeKind::Unknown, Range::bytes(7, 8))
            .with_field("operand", AstNode::new(NodeKind::Identifier, Range::bytes(8, 9)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "&int");
        assert_eq!(ty.kind, SymbolKind::Ref);

        // Dereference round-trips back to the inner type.
        let inner = analyzer.store.symbols.deref(&ty);
        assert_eq!(inner.id, int_sym);

        // Depth cap: refuse to stack past &&&.
        let deep = Symbol::new(store.interner().intern("&&&int"))
            .with_kind(SymbolKind::Ref)
            .with_file(FileId(0), 0);
        let deep_id = store.symbols.create_new_symbol_with(deep);
        let deep_info = store.symbols.get_info(deep_id);
        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let capped = analyzer.ref_type_of(&deep_info);
        assert!(capped.is_void());
    }

    #[test]
    fn binary_value_takes_left_operand() {
        let mut store = store();
        let src = SourceText::new("1 + 2.5");
        let node = AstNode::new(NodeKind::BinaryExpression, Range::bytes(0, 7))
            .with_field("left", AstNode::new(NodeKind::IntLiteral, Range::bytes(0, 1)))
            .with_field("right", AstNode::new(NodeKind::FloatLiteral, Range::bytes(4, 7)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        let ty = analyzer.infer_value_type_from_node(&node, &src);
        assert_eq!(analyzer.store.symbols.name_of(&ty), "int");
    }

    #[test]
    fn malformed_nodes_fall_back_to_void() {
        let mut store = store();
        let src = SourceText::new("x.");
        let node = AstNode::new(NodeKind::SelectorExpression, Range::bytes(0, 2))
            .with_field("operand", AstNode::new(NodeKind::Identifier, Range::bytes(0, 1)));

        let mut analyzer = store.with(StoreParams {
            file_path: "/pkg/a.v",
            file_version: 1,
        });
        assert!(analyzer.infer_value_type_from_node(&node, &src).is_void());

        let empty_call = AstNode::new(NodeKind::CallExpression, Range::bytes(0, 2));
        assert!(analyzer.infer_value_type_from_node(&empty_call, &src).is_void());
    }
}
