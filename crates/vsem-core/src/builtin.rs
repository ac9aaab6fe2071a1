//! Builtin type universe.
//!
//! Registers the primitive types into the auto-imported `builtin` module so
//! unqualified lookups resolve before any real source is opened. Member
//! lookups on derived types (`[]T`, `map[K]V`, `chan T`, `?T`, `!T`)
//! redirect to the `array`, `map`, `chan` and `IError` base types registered
//! here.
//!
//! A small allowlist (`IError`, `string`, `array`, `map`) is registered at
//! file version -1 so that a real declaration from the actual builtin
//! sources always wins the version check later.

use smallvec::smallvec;

use crate::store::Store;
use crate::symbol::{AccessModifier, FileId, Symbol, SymbolId, SymbolKind};

/// Directory the builtin module lives in.
pub const BUILTIN_DIR: &str = "/builtin";

/// Virtual file carrying the synthesized builtin declarations.
pub const BUILTIN_FILE: &str = "/builtin/placeholder.vv";

const PRIMITIVES: &[&str] = &[
    "i8", "i16", "int", "i64", "u8", "u16", "u32", "u64", "f32", "f64", "bool", "rune", "char",
    "isize", "usize", "voidptr", "byteptr", "charptr",
];

/// Names whose bootstrap registration must lose against any later real
/// declaration.
const PRE_VERSION_NAMES: &[&str] = &["IError", "string", "array", "map"];

fn version_for(name: &str) -> i64 {
    if PRE_VERSION_NAMES.contains(&name) { -1 } else { 0 }
}

fn builtin_symbol(store: &Store, name: &str, kind: SymbolKind, file_id: FileId) -> Symbol {
    Symbol::new(store.interner().intern(name))
        .with_kind(kind)
        .with_access(AccessModifier::Public)
        .with_file(file_id, version_for(name))
        .top_level()
}

fn register_member(
    store: &mut Store,
    owner: SymbolId,
    name: &str,
    kind: SymbolKind,
    type_of: SymbolId,
    file_id: FileId,
) {
    let interned = store.interner().intern(name);
    let member = store.symbols.create_new_symbol_with(
        Symbol::new(interned)
            .with_kind(kind)
            .with_access(AccessModifier::Public)
            .with_return(type_of)
            .with_parent(owner)
            .with_file(file_id, version_for(name)),
    );
    store.symbols.add_child(owner, member);
}

/// Populate a fresh store with the builtin universe.
///
/// Idempotent enough for tests: re-running registers nothing new because
/// every name already resolves and the re-registrations are version-stale.
pub fn bootstrap(store: &mut Store) {
    store.register_auto_import("", BUILTIN_DIR);
    store.register_auto_import("builtin", BUILTIN_DIR);

    let file_id = store.file_id_for(BUILTIN_FILE);

    for name in PRIMITIVES {
        let info = builtin_symbol(store, name, SymbolKind::Struct, file_id);
        let _ = store.register_symbol(info);
    }

    let int_sym = store
        .find_symbol(BUILTIN_FILE, "", "int")
        .map(|s| s.id)
        .unwrap_or(SymbolId::VOID);

    // string with its `len` field and `str` method surface.
    let string_info = builtin_symbol(store, "string", SymbolKind::Struct, file_id);
    if let Ok(string_id) = store.register_symbol(string_info) {
        register_member(store, string_id, "len", SymbolKind::Field, int_sym, file_id);
    }

    // Base types member lookups on derived kinds redirect to.
    let array_info = builtin_symbol(store, "array", SymbolKind::Struct, file_id);
    if let Ok(array_id) = store.register_symbol(array_info) {
        register_member(store, array_id, "len", SymbolKind::Field, int_sym, file_id);
        register_member(store, array_id, "cap", SymbolKind::Field, int_sym, file_id);
    }

    let map_info = builtin_symbol(store, "map", SymbolKind::Struct, file_id);
    if let Ok(map_id) = store.register_symbol(map_info) {
        register_member(store, map_id, "len", SymbolKind::Field, int_sym, file_id);
    }

    let chan_info = builtin_symbol(store, "chan", SymbolKind::Struct, file_id);
    if let Ok(chan_id) = store.register_symbol(chan_info) {
        register_member(store, chan_id, "cap", SymbolKind::Field, int_sym, file_id);
    }

    let ierror_info = builtin_symbol(store, "IError", SymbolKind::Interface, file_id);
    if let Ok(ierror_id) = store.register_symbol(ierror_info) {
        let string_sym = store
            .find_symbol(BUILTIN_FILE, "", "string")
            .map(|s| s.id)
            .unwrap_or(SymbolId::VOID);
        register_member(store, ierror_id, "msg", SymbolKind::Function, string_sym, file_id);
        register_member(store, ierror_id, "code", SymbolKind::Function, int_sym, file_id);
    }

    // `none` and the ready-made `[]string` used by CLI-facing APIs.
    let none_info = builtin_symbol(store, "none", SymbolKind::Struct, file_id);
    let _ = store.register_symbol(none_info);

    let string_id = store
        .find_symbol(BUILTIN_FILE, "", "string")
        .map(|s| s.id)
        .unwrap_or(SymbolId::VOID);
    let mut string_array = builtin_symbol(store, "[]string", SymbolKind::Array, file_id);
    string_array.children = smallvec![string_id];
    let _ = store.register_symbol(string_array);

    store.add_base_symbol_location("builtin", "array", SymbolKind::Array);
    store.add_base_symbol_location("builtin", "map", SymbolKind::Map);
    store.add_base_symbol_location("builtin", "chan", SymbolKind::Chan);
    store.add_base_symbol_location("builtin", "IError", SymbolKind::Optional);
    store.add_base_symbol_location("builtin", "IError", SymbolKind::Result);
}
