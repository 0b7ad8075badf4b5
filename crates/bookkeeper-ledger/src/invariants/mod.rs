//! Inventory Log invariants.
//!
//! The store calls [`InvariantState::check_append`] before every append, so a
//! malformed entry never lands in the log. Audits call [`validate_ledger`],
//! which walks a whole slice and keeps going after a failure.
//!
//! Checks live in [`structural`] (sequence order, snapshot arithmetic),
//! [`continuity`] (per-key chaining) and [`linkage`] (sign rules and request
//! links). Each exposes `check(&InvariantState, &LedgerEntry)` and never
//! mutates the state; only [`InvariantState::apply_entry`] does.

mod continuity;
mod linkage;
mod structural;

use crate::error::LedgerViolation;
use bookkeeper_types::{LedgerEntry, StockKey};
use std::collections::HashMap;

/// What the log so far implies, kept for checking the next entry.
#[derive(Clone, Debug, Default)]
pub struct InvariantState {
    /// Number of entries ingested so far.
    pub(crate) len: usize,

    /// Sequence of the last ingested entry. `None` before the first entry.
    pub(crate) last_sequence: Option<u64>,

    /// Last `new_quantity` seen per key. Absent keys start at zero.
    pub(crate) quantities: HashMap<StockKey, u32>,
}

impl InvariantState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `entry` against the log so far and ingest it if it passes.
    pub fn check_append(&mut self, entry: &LedgerEntry) -> Result<(), LedgerViolation> {
        structural::check(self, entry)?;
        continuity::check(self, entry)?;
        linkage::check(self, entry)?;
        self.apply_entry(entry);
        Ok(())
    }

    /// Quantity the log implies for `key` so far.
    pub fn quantity(&self, key: &StockKey) -> u32 {
        self.quantities.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run all groups without short-circuiting across them.
    fn collect_entry_violations(&self, entry: &LedgerEntry, violations: &mut Vec<LedgerViolation>) {
        if let Err(v) = structural::check(self, entry) {
            violations.push(v);
        }
        if let Err(v) = continuity::check(self, entry) {
            violations.push(v);
        }
        if let Err(v) = linkage::check(self, entry) {
            violations.push(v);
        }
    }

    fn apply_entry(&mut self, entry: &LedgerEntry) {
        self.last_sequence = Some(entry.sequence);
        self.quantities.insert(entry.key, entry.new_quantity);
        self.len += 1;
    }
}

/// Every violation in `entries`, in log order.
///
/// State is applied after every entry regardless of errors so that later
/// entries are checked against what the log actually says. An empty slice is
/// a valid (empty) history.
pub fn validate_ledger(entries: &[LedgerEntry]) -> Vec<LedgerViolation> {
    let mut state = InvariantState::new();
    let mut violations = Vec::new();

    for entry in entries {
        state.collect_entry_violations(entry, &mut violations);
        state.apply_entry(entry);
    }

    violations
}
