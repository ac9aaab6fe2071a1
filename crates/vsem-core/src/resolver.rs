//! Deferred symbol resolution.
//!
//! When the walker needs a type that has not been registered yet (forward or
//! cross-module reference), it parks a waiter under the referent's global
//! identifier `"{module_dir}/{name}"`. Registration is the single wake
//! point: every `Store::register_symbol` call resolves the waiters parked
//! under the new symbol's identifier. No callbacks, no threads, just a map
//! drained on registration.

use std::collections::HashMap;

use tracing::trace;

use crate::report::{Report, ReportKind, Reporter};
use crate::symbol::{FileId, SymbolId, SymbolKind, SymbolManager};

/// One parked consumer of a not-yet-registered symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionInfo {
    /// The symbol whose `return_sym` is waiting to be filled in.
    pub sym_id: SymbolId,
    /// Position in a multi-return expected by this waiter.
    pub index: usize,
    /// Source text of the surrounding branch, for diagnostics.
    pub branch: String,
    /// Node kind of the surrounding branch (`if`, `match`, `or_block`).
    pub branch_type: String,
    pub has_err: bool,
    pub err_msg: String,
}

impl ResolutionInfo {
    pub fn new(sym_id: SymbolId) -> Self {
        Self {
            sym_id,
            index: 0,
            branch: String::new(),
            branch_type: String::new(),
            has_err: false,
            err_msg: String::new(),
        }
    }

    /// Expect the `index`-th component of a multi-return.
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Attach the surrounding branch for diagnostics.
    pub fn in_branch(mut self, branch_type: impl Into<String>, branch: impl Into<String>) -> Self {
        self.branch_type = branch_type.into();
        self.branch = branch.into();
        self
    }

    fn branch_suffix(&self) -> String {
        if self.branch.is_empty() {
            String::new()
        } else {
            format!(" in {} `{}`", self.branch_type, self.branch)
        }
    }
}

/// Pending-dependency registry keyed by global identifier.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    waiting: HashMap<String, Vec<ResolutionInfo>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a waiter under an identifier.
    ///
    /// A second registration for the same symbol id under one identifier is
    /// an error: the caller should have updated the existing waiter instead.
    pub fn register(&mut self, ident: &str, info: ResolutionInfo) -> vsem_error::Result<()> {
        let waiters = self.waiting.entry(ident.to_string()).or_default();
        if waiters.iter().any(|w| w.sym_id == info.sym_id) {
            return Err(vsem_error::Error::new(
                vsem_error::ErrorKind::DuplicateWaiter,
                format!("waiter for symbol {} already parked", info.sym_id),
            )
            .with_operation("resolver::register")
            .with_context("ident", ident));
        }
        trace!(ident, sym = %info.sym_id, "parked waiter");
        waiters.push(info);
        Ok(())
    }

    /// Wake the waiters parked under `ident` with the freshly registered
    /// symbol `depended`.
    ///
    /// Returnable dependencies (variables, fields, functions) are followed
    /// through their `return_sym` first. Void or `never` dependencies wake
    /// nobody. Successfully resolved waiters are dropped; errored ones are
    /// kept so a later compatible registration can recover them.
    pub fn resolve_with(
        &mut self,
        symbols: &mut SymbolManager,
        ident: &str,
        depended: SymbolId,
    ) {
        let mut dep = symbols.get_info(depended);
        if dep.kind.is_returnable() {
            dep = symbols.get_info(dep.return_sym);
        }
        if matches!(dep.kind, SymbolKind::Void | SymbolKind::Never) {
            return;
        }

        let Some(waiters) = self.waiting.remove(ident) else {
            return;
        };
        let dep_name = symbols.name_of(&dep);
        let mut kept = Vec::new();

        for mut waiter in waiters {
            if waiter.has_err {
                kept.push(waiter);
                continue;
            }
            let waiter_sym = symbols.get_info(waiter.sym_id);
            if symbols.is_valid_id(waiter_sym.return_sym) && waiter_sym.return_sym != dep.id {
                let expected = symbols.get_info(waiter_sym.return_sym);
                waiter.has_err = true;
                waiter.err_msg = format!(
                    "type mismatch: expected `{}`, got `{}` at return value #{}{}",
                    symbols.name_of(&expected),
                    dep_name,
                    waiter.index + 1,
                    waiter.branch_suffix(),
                );
                kept.push(waiter);
                continue;
            }
            if dep.kind == SymbolKind::MultiReturn {
                match dep.children.get(waiter.index).copied() {
                    Some(component) => {
                        symbols.set_return_sym(waiter.sym_id, component);
                        trace!(ident, sym = %waiter.sym_id, "resolved multi-return waiter");
                    }
                    None => {
                        waiter.has_err = true;
                        waiter.err_msg = format!(
                            "return value #{} out of range for `{}`{}",
                            waiter.index + 1,
                            dep_name,
                            waiter.branch_suffix(),
                        );
                        kept.push(waiter);
                    }
                }
            } else {
                symbols.set_return_sym(waiter.sym_id, dep.id);
                trace!(ident, sym = %waiter.sym_id, "resolved waiter");
            }
        }

        if !kept.is_empty() {
            self.waiting.insert(ident.to_string(), kept);
        }
    }

    /// Clear error flags on all waiters under an identifier so the next
    /// registration gets another chance to resolve them.
    pub fn recover(&mut self, ident: &str) {
        if let Some(waiters) = self.waiting.get_mut(ident) {
            for waiter in waiters {
                waiter.has_err = false;
                waiter.err_msg.clear();
            }
        }
    }

    /// Emit diagnostics for every waiter whose symbol lives in `file_id`:
    /// its stored error if any, otherwise `unresolved symbol {name}` when
    /// the return type is still void.
    pub fn report(
        &self,
        symbols: &SymbolManager,
        reporter: &mut dyn Reporter,
        file_id: FileId,
        file_path: &str,
    ) {
        for waiters in self.waiting.values() {
            for waiter in waiters {
                let Some(sym) = symbols.get(waiter.sym_id) else {
                    continue;
                };
                if sym.file_id != file_id {
                    continue;
                }
                if waiter.has_err {
                    reporter.report(Report {
                        kind: ReportKind::Error,
                        message: waiter.err_msg.clone(),
                        range: sym.range,
                        file_path: file_path.to_string(),
                    });
                } else if !symbols.is_valid_id(sym.return_sym) {
                    reporter.report(Report {
                        kind: ReportKind::Error,
                        message: format!("unresolved symbol {}", symbols.name_of(sym)),
                        range: sym.range,
                        file_path: file_path.to_string(),
                    });
                }
            }
        }
    }

    /// Number of waiters parked under an identifier.
    pub fn waiter_count(&self, ident: &str) -> usize {
        self.waiting.get(ident).map_or(0, |w| w.len())
    }

    /// Waiters parked under an identifier.
    pub fn waiters(&self, ident: &str) -> &[ResolutionInfo] {
        self.waiting.get(ident).map(|w| w.as_slice()).unwrap_or(&[])
    }
}
