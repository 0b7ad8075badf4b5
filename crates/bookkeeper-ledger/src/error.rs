use bookkeeper_types::{ChangeType, StockKey};
use serde::Serialize;

/// Describes a specific Inventory Log invariant violation.
///
/// Grouped: structural (ordering, arithmetic), continuity (per-key chaining
/// of snapshots), and linkage (change-type sign and request links).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerViolation {
    /// Sequence numbers must strictly increase in log order.
    NonMonotonicSequence {
        entry_index: usize,
        previous: u64,
        actual: u64,
    },
    /// `new_quantity` must equal `previous_quantity + quantity_change`.
    ArithmeticMismatch {
        sequence: u64,
        previous_quantity: u32,
        quantity_change: i64,
        new_quantity: u32,
    },
    /// An entry's `previous_quantity` must equal the last `new_quantity`
    /// recorded for its key, or zero for the key's first entry.
    BrokenContinuity {
        sequence: u64,
        key: StockKey,
        expected_previous: u32,
        actual_previous: u32,
    },
    /// The sign of the change disagrees with its change type.
    SignMismatch {
        sequence: u64,
        change_type: ChangeType,
        quantity_change: i64,
    },
    /// A `fulfilled` entry must reference both its request and fulfillment.
    MissingFulfillmentLink { sequence: u64 },
    /// Only `fulfilled` entries may reference a request or fulfillment.
    UnexpectedLink {
        sequence: u64,
        change_type: ChangeType,
    },
}

/// A stock key whose stored quantity differs from the replayed log.
///
/// `stored` is `None` when the log mentions a key that has no StockRecord.
/// `replayed` is zero for a record with no log history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplayMismatch {
    pub key: StockKey,
    pub stored: Option<u32>,
    pub replayed: i64,
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("replay mismatch at {}: stored {:?}, replayed {}", .0.key, .0.stored, .0.replayed)]
    ReplayMismatch(ReplayMismatch),
}

impl std::fmt::Display for LedgerViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonMonotonicSequence {
                entry_index,
                previous,
                actual,
            } => write!(
                f,
                "sequence at index {entry_index} is {actual}, not greater than previous {previous}"
            ),
            Self::ArithmeticMismatch {
                sequence,
                previous_quantity,
                quantity_change,
                new_quantity,
            } => write!(
                f,
                "entry {sequence}: {previous_quantity} {quantity_change:+} does not give {new_quantity}"
            ),
            Self::BrokenContinuity {
                sequence,
                key,
                expected_previous,
                actual_previous,
            } => write!(
                f,
                "entry {sequence} for {key} starts from {actual_previous}, last known quantity is {expected_previous}"
            ),
            Self::SignMismatch {
                sequence,
                change_type,
                quantity_change,
            } => write!(
                f,
                "entry {sequence}: change {quantity_change:+} is not valid for {change_type}"
            ),
            Self::MissingFulfillmentLink { sequence } => write!(
                f,
                "entry {sequence}: fulfilled entry without request and fulfillment links"
            ),
            Self::UnexpectedLink {
                sequence,
                change_type,
            } => write!(
                f,
                "entry {sequence}: {change_type} entry must not link to a request"
            ),
        }
    }
}
