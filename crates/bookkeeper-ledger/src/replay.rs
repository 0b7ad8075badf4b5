use std::collections::BTreeMap;

use bookkeeper_types::{LedgerEntry, StockKey, StockRecord};

use crate::error::{LedgerError, ReplayMismatch};

/// Replay every key's quantity by summing signed changes in log order.
///
/// Sums are kept as `i64` so a corrupt history shows up as a negative or
/// oversized value instead of wrapping.
///
/// Complexity: O(n log k).
pub fn replay_quantities(entries: &[LedgerEntry]) -> BTreeMap<StockKey, i64> {
    entries.iter().fold(BTreeMap::new(), |mut acc, entry| {
        *acc.entry(entry.key).or_insert(0) += entry.quantity_change;
        acc
    })
}

/// Replay a single key. Zero when the log never mentions it.
pub fn replay_quantity(entries: &[LedgerEntry], key: &StockKey) -> i64 {
    entries
        .iter()
        .filter(|e| &e.key == key)
        .map(|e| e.quantity_change)
        .sum()
}

/// The last recorded snapshot for `key`, if the log mentions it.
pub fn last_snapshot(entries: &[LedgerEntry], key: &StockKey) -> Option<u32> {
    entries
        .iter()
        .rev()
        .find(|e| &e.key == key)
        .map(|e| e.new_quantity)
}

/// Compare replayed quantities against stored records.
///
/// Returns one mismatch per disagreeing key, ordered by key. Keys present on
/// only one side are included: a record with no history must be zero, and a
/// key with history must have a record.
pub fn reconcile(entries: &[LedgerEntry], records: &[StockRecord]) -> Vec<ReplayMismatch> {
    let mut replayed = replay_quantities(entries);
    let mut mismatches = Vec::new();

    for record in records {
        let value = replayed.remove(&record.key).unwrap_or(0);
        if value != i64::from(record.quantity) {
            mismatches.push(ReplayMismatch {
                key: record.key,
                stored: Some(record.quantity),
                replayed: value,
            });
        }
    }
    for (key, value) in replayed {
        mismatches.push(ReplayMismatch {
            key,
            stored: None,
            replayed: value,
        });
    }

    mismatches.sort_by(|a, b| a.key.cmp(&b.key));
    mismatches
}

/// Fail on the first mismatch reported by [`reconcile`].
pub fn verify_replay(entries: &[LedgerEntry], records: &[StockRecord]) -> Result<(), LedgerError> {
    match reconcile(entries, records).into_iter().next() {
        Some(mismatch) => Err(LedgerError::ReplayMismatch(mismatch)),
        None => Ok(()),
    }
}
