use parking_lot::RwLock;
use std::sync::Arc;

use string_interner::StringInterner;
use string_interner::backend::DefaultBackend;
use string_interner::symbol::DefaultSymbol;

/// Interned string symbol backed by a `StringInterner`.
pub type InternedStr = DefaultSymbol;

#[derive(Debug)]
struct InternPoolInner {
    interner: RwLock<StringInterner<DefaultBackend>>,
}

/// Shared string interner used across the analysis core.
///
/// Symbol names, module paths and resolver identifiers are interned once and
/// compared as symbols afterwards. The pool is cheaply cloneable; all clones
/// share one underlying table.
#[derive(Clone, Debug)]
pub struct InternPool {
    inner: Arc<InternPoolInner>,
}

impl Default for InternPool {
    fn default() -> Self {
        Self::new()
    }
}

impl InternPool {
    /// Create a new shared interner pool.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InternPoolInner {
                interner: RwLock::new(StringInterner::new()),
            }),
        }
    }

    /// Intern the provided string slice and return its symbol.
    #[inline]
    pub fn intern<S>(&self, value: S) -> InternedStr
    where
        S: AsRef<str>,
    {
        self.inner.interner.write().get_or_intern(value.as_ref())
    }

    /// Look up the symbol for a string without inserting it.
    ///
    /// Returns `None` when the string has never been interned. Used on lookup
    /// paths so that misses do not grow the pool.
    #[inline]
    pub fn lookup<S>(&self, value: S) -> Option<InternedStr>
    where
        S: AsRef<str>,
    {
        self.inner.interner.read().get(value.as_ref())
    }

    /// Resolve an interned symbol back into an owned string.
    pub fn resolve_owned(&self, symbol: InternedStr) -> Option<String> {
        self.inner
            .interner
            .read()
            .resolve(symbol)
            .map(|s| s.to_owned())
    }

    /// Resolve an interned symbol and apply a closure while the borrow is active.
    pub fn with_resolved<R, F>(&self, symbol: InternedStr, f: F) -> Option<R>
    where
        F: FnOnce(&str) -> R,
    {
        self.inner.interner.read().resolve(symbol).map(f)
    }

    /// Number of interned strings (for diagnostics).
    pub fn len(&self) -> usize {
        self.inner.interner.read().len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
