use bookkeeper_types::{ChangeType, FulfillmentId, LedgerEntry, LocationId, RequestId, StockKey};
use chrono::{DateTime, Utc};

/// Entries for one stock key in log order.
///
/// Scan complexity: O(n).
pub fn entries_for_key<'a>(entries: &'a [LedgerEntry], key: &StockKey) -> Vec<&'a LedgerEntry> {
    entries.iter().filter(|e| &e.key == key).collect()
}

/// Entries written while fulfilling `request_id`, in log order.
///
/// Scan complexity: O(n).
pub fn entries_for_request<'a>(
    entries: &'a [LedgerEntry],
    request_id: &RequestId,
) -> Vec<&'a LedgerEntry> {
    entries
        .iter()
        .filter(|e| e.related_request_id.as_ref() == Some(request_id))
        .collect()
}

/// The entry written for one fulfillment, if any.
pub fn entry_for_fulfillment<'a>(
    entries: &'a [LedgerEntry],
    fulfillment_id: &FulfillmentId,
) -> Option<&'a LedgerEntry> {
    entries
        .iter()
        .find(|e| e.related_fulfillment_id.as_ref() == Some(fulfillment_id))
}

/// Entries touching any book at `location_id`, in log order.
pub fn entries_at_location<'a>(
    entries: &'a [LedgerEntry],
    location_id: &LocationId,
) -> Vec<&'a LedgerEntry> {
    entries
        .iter()
        .filter(|e| &e.key.location_id == location_id)
        .collect()
}

/// Entries with `timestamp >= since`, in log order.
pub fn entries_since(entries: &[LedgerEntry], since: DateTime<Utc>) -> Vec<&LedgerEntry> {
    entries.iter().filter(|e| e.timestamp >= since).collect()
}

/// Newest-first view of the log, at most `limit` entries.
pub fn most_recent(entries: &[LedgerEntry], limit: usize) -> Vec<&LedgerEntry> {
    entries.iter().rev().take(limit).collect()
}

/// Net signed change per change type over a slice.
pub fn net_change(entries: &[LedgerEntry], change_type: ChangeType) -> i64 {
    entries
        .iter()
        .filter(|e| e.change_type == change_type)
        .map(|e| e.quantity_change)
        .sum()
}

/// Copies handed out against `request_id` according to the log.
///
/// Fulfilled entries carry negative changes; the result is their magnitude.
pub fn fulfilled_from_log(entries: &[LedgerEntry], request_id: &RequestId) -> u64 {
    entries_for_request(entries, request_id)
        .into_iter()
        .filter(|e| e.change_type == ChangeType::Fulfilled)
        .map(|e| e.quantity_change.unsigned_abs())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::test_support::{entry, fulfilled, key};

    #[test]
    fn transfers_net_to_zero_across_both_legs() {
        let entries = vec![
            entry(0, key(1), ChangeType::Added, 0, 15),
            entry(1, key(1), ChangeType::Transferred, 15, 9),
            entry(2, key(2), ChangeType::Transferred, 0, 6),
        ];
        assert_eq!(net_change(&entries, ChangeType::Transferred), 0);
        assert_eq!(net_change(&entries, ChangeType::Added), 15);
        assert_eq!(entries_for_key(&entries, &key(1)).len(), 2);
        assert_eq!(entries_at_location(&entries, &key(2).location_id).len(), 1);
    }

    #[test]
    fn request_links_are_followed() {
        let entries = vec![
            entry(0, key(1), ChangeType::Added, 0, 15),
            fulfilled(1, key(1), 15, 6),
            fulfilled(2, key(1), 6, 1),
        ];
        let request = RequestId::from_u128(50);
        assert_eq!(fulfilled_from_log(&entries, &request), 14);
        assert_eq!(entries_for_request(&entries, &RequestId::from_u128(51)).len(), 0);
        let found = entry_for_fulfillment(&entries, &FulfillmentId::from_u128(60));
        assert_eq!(found.map(|e| e.sequence), Some(1));
    }

    #[test]
    fn most_recent_is_newest_first() {
        let entries: Vec<_> = (0..5)
            .map(|i| entry(i, key(1), ChangeType::Added, i as u32, i as u32 + 1))
            .collect();
        let recent: Vec<u64> = most_recent(&entries, 2).iter().map(|e| e.sequence).collect();
        assert_eq!(recent, vec![4, 3]);
        assert_eq!(entries_since(&entries, DateTime::<Utc>::MIN_UTC).len(), 5);
    }
}
