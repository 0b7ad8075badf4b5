use crate::ids::{ActorId, FulfillmentId, RequestId};
use crate::stock::StockKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a stock quantity changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// New copies arrived (Add, BulkAdd item).
    Added,
    /// Copies left without a request. Not produced by the core's own
    /// operations; accepted from imported history.
    Removed,
    /// One leg of a transfer between two locations.
    Transferred,
    /// Stock count corrected to an absolute value.
    Adjustment,
    /// Copies handed out against a book request.
    Fulfilled,
}

impl ChangeType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Transferred => "transferred",
            Self::Adjustment => "adjustment",
            Self::Fulfilled => "fulfilled",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single row of the append-only Inventory Log.
///
/// `sequence` is assigned by the store at append time and is strictly
/// increasing across the whole log. `new_quantity == previous_quantity +
/// quantity_change` for every well-formed entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub key: StockKey,
    pub change_type: ChangeType,
    pub quantity_change: i64,
    pub previous_quantity: u32,
    pub new_quantity: u32,
    pub related_request_id: Option<RequestId>,
    pub related_fulfillment_id: Option<FulfillmentId>,
    pub notes: Option<String>,
    pub performed_by: ActorId,
    pub timestamp: DateTime<Utc>,
}

/// A ledger row before the store has sequenced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub key: StockKey,
    pub change_type: ChangeType,
    pub previous_quantity: u32,
    pub new_quantity: u32,
    pub related_request_id: Option<RequestId>,
    pub related_fulfillment_id: Option<FulfillmentId>,
    pub notes: Option<String>,
    pub performed_by: ActorId,
    pub timestamp: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// Entry for a quantity change at `key`. The signed delta is derived from
    /// the two snapshots so it can never disagree with them.
    pub fn new(
        key: StockKey,
        change_type: ChangeType,
        previous_quantity: u32,
        new_quantity: u32,
        performed_by: ActorId,
    ) -> Self {
        Self {
            key,
            change_type,
            previous_quantity,
            new_quantity,
            related_request_id: None,
            related_fulfillment_id: None,
            notes: None,
            performed_by,
            timestamp: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn linked_to(mut self, request_id: RequestId, fulfillment_id: FulfillmentId) -> Self {
        self.related_request_id = Some(request_id);
        self.related_fulfillment_id = Some(fulfillment_id);
        self
    }

    pub fn quantity_change(&self) -> i64 {
        i64::from(self.new_quantity) - i64::from(self.previous_quantity)
    }

    pub fn sequenced(self, sequence: u64) -> LedgerEntry {
        LedgerEntry {
            sequence,
            quantity_change: self.quantity_change(),
            key: self.key,
            change_type: self.change_type,
            previous_quantity: self.previous_quantity,
            new_quantity: self.new_quantity,
            related_request_id: self.related_request_id,
            related_fulfillment_id: self.related_fulfillment_id,
            notes: self.notes,
            performed_by: self.performed_by,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BookId, ClusterId, LocationId};

    fn key() -> StockKey {
        StockKey::new(
            ClusterId::from_u128(1),
            LocationId::from_u128(2),
            BookId::from_u128(3),
        )
    }

    #[test]
    fn sequenced_derives_signed_change() {
        let actor = ActorId::from_u128(9);
        let down = NewLedgerEntry::new(key(), ChangeType::Adjustment, 10, 4, actor).sequenced(7);
        assert_eq!(down.sequence, 7);
        assert_eq!(down.quantity_change, -6);

        let up = NewLedgerEntry::new(key(), ChangeType::Added, 10, 15, actor).sequenced(8);
        assert_eq!(up.quantity_change, 5);
    }

    #[test]
    fn change_type_serializes_snake_case() {
        insta::assert_json_snapshot!(ChangeType::Adjustment, @r#""adjustment""#);
        let parsed: ChangeType = serde_json::from_str("\"fulfilled\"").unwrap();
        assert_eq!(parsed, ChangeType::Fulfilled);
    }

    #[test]
    fn linked_entry_keeps_links_through_json() {
        let entry = NewLedgerEntry::new(key(), ChangeType::Fulfilled, 8, 5, ActorId::from_u128(9))
            .linked_to(RequestId::from_u128(4), FulfillmentId::from_u128(5))
            .sequenced(0);
        let raw = serde_json::to_string(&entry).unwrap();
        let back: LedgerEntry = serde_json::from_str(&raw).unwrap();
        similar_asserts::assert_eq!(back, entry);
    }
}
