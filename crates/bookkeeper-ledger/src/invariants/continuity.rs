//! Continuity invariant: snapshots chain per key.
//!
//! For every stock key, the first entry starts from zero and each later
//! entry's `previous_quantity` equals the prior entry's `new_quantity`. This
//! is what makes the log replayable: chained snapshots plus correct
//! arithmetic mean the running sum of changes equals the last snapshot.

use bookkeeper_types::LedgerEntry;

use crate::error::LedgerViolation;

use super::InvariantState;

pub(crate) fn check(state: &InvariantState, entry: &LedgerEntry) -> Result<(), LedgerViolation> {
    let expected_previous = state.quantity(&entry.key);
    if entry.previous_quantity != expected_previous {
        return Err(LedgerViolation::BrokenContinuity {
            sequence: entry.sequence,
            key: entry.key,
            expected_previous,
            actual_previous: entry.previous_quantity,
        });
    }
    Ok(())
}
