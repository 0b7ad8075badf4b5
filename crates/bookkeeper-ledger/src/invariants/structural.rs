//! Structural invariants: log ordering and per-entry arithmetic.
//!
//! Sequences are assigned by the store and must strictly increase in log
//! order. A cluster-scoped slice of the global log may skip numbers, so only
//! ordering is checked, not density.

use bookkeeper_types::LedgerEntry;

use crate::error::LedgerViolation;

use super::InvariantState;

pub(crate) fn check(state: &InvariantState, entry: &LedgerEntry) -> Result<(), LedgerViolation> {
    if let Some(previous) = state.last_sequence {
        if entry.sequence <= previous {
            return Err(LedgerViolation::NonMonotonicSequence {
                entry_index: state.len,
                previous,
                actual: entry.sequence,
            });
        }
    }

    let expected = i64::from(entry.previous_quantity) + entry.quantity_change;
    if expected != i64::from(entry.new_quantity) {
        return Err(LedgerViolation::ArithmeticMismatch {
            sequence: entry.sequence,
            previous_quantity: entry.previous_quantity,
            quantity_change: entry.quantity_change,
            new_quantity: entry.new_quantity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::test_support::{entry, key};
    use bookkeeper_types::ChangeType;

    #[test]
    fn repeated_sequence_is_rejected() {
        let state = InvariantState {
            len: 3,
            last_sequence: Some(4),
            ..Default::default()
        };
        let err = check(&state, &entry(4, key(1), ChangeType::Added, 0, 1)).unwrap_err();
        assert_eq!(
            err,
            LedgerViolation::NonMonotonicSequence {
                entry_index: 3,
                previous: 4,
                actual: 4,
            }
        );
    }

    #[test]
    fn gaps_in_sequence_are_allowed() {
        let state = InvariantState {
            len: 1,
            last_sequence: Some(2),
            ..Default::default()
        };
        assert!(check(&state, &entry(9, key(1), ChangeType::Added, 0, 1)).is_ok());
    }

    #[test]
    fn tampered_change_is_an_arithmetic_mismatch() {
        let mut e = entry(0, key(1), ChangeType::Adjustment, 10, 4);
        e.quantity_change = -5;
        let err = check(&InvariantState::new(), &e).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"entry 0: 10 -5 does not give 4");
    }
}
