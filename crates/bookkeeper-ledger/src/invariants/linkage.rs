//! Linkage invariants: change-type sign rules and request links.
//!
//! - `added` strictly increases stock.
//! - `removed` and `fulfilled` strictly decrease it.
//! - `transferred` moves it in either direction but never by zero.
//! - `adjustment` may carry any change, including zero.
//! - `fulfilled` entries link both the request and the fulfillment they
//!   belong to; no other type links to a request.
//!
//! The sign rule is checked first: a wrong-direction change is a more
//! fundamental problem than a missing link.

use bookkeeper_types::{ChangeType, LedgerEntry};

use crate::error::LedgerViolation;

use super::InvariantState;

pub(crate) fn check(_state: &InvariantState, entry: &LedgerEntry) -> Result<(), LedgerViolation> {
    let change = entry.quantity_change;
    let sign_ok = match entry.change_type {
        ChangeType::Added => change > 0,
        ChangeType::Removed | ChangeType::Fulfilled => change < 0,
        ChangeType::Transferred => change != 0,
        ChangeType::Adjustment => true,
    };
    if !sign_ok {
        return Err(LedgerViolation::SignMismatch {
            sequence: entry.sequence,
            change_type: entry.change_type,
            quantity_change: change,
        });
    }

    let linked_request = entry.related_request_id.is_some();
    let linked_fulfillment = entry.related_fulfillment_id.is_some();
    match entry.change_type {
        ChangeType::Fulfilled if !(linked_request && linked_fulfillment) => {
            Err(LedgerViolation::MissingFulfillmentLink {
                sequence: entry.sequence,
            })
        }
        ChangeType::Fulfilled => Ok(()),
        change_type if linked_request || linked_fulfillment => {
            Err(LedgerViolation::UnexpectedLink {
                sequence: entry.sequence,
                change_type,
            })
        }
        _ => Ok(()),
    }
}
