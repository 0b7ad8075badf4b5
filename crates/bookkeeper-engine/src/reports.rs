//! Read-only views over a cluster: availability, low stock, dashboard
//! summary, activity feed and the Inventory Log audit.

use std::collections::{BTreeMap, BTreeSet};

use bookkeeper_ledger::{LedgerViolation, ReplayMismatch, reconcile, validate_ledger};
use bookkeeper_types::{Actor, BookId, ClusterId, LedgerEntry, RequestStatus, StockRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::{InventoryEngine, ensure_permitted};
use crate::error::InventoryError;
use crate::store::InventoryStore;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub total_copies: u64,
    /// Books with at least one stock record, empty or not.
    pub unique_titles: usize,
    pub low_stock_records: usize,
    pub total_requests: usize,
    pub pending_requests: usize,
    pub approved_requests: usize,
    pub fulfilled_requests: usize,
    pub denied_requests: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub entries_checked: usize,
    pub violations: Vec<LedgerViolation>,
    pub mismatches: Vec<ReplayMismatch>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.mismatches.is_empty()
    }
}

impl<S: InventoryStore> InventoryEngine<S> {
    /// Copies per book, summed over the cluster's locations.
    pub fn availability(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
    ) -> Result<BTreeMap<BookId, u32>, InventoryError> {
        let records = self.cluster_stock(actor, cluster_id)?;
        let mut totals: BTreeMap<BookId, u32> = BTreeMap::new();
        for record in records {
            let total = totals.entry(record.key.book_id).or_default();
            *total = total.saturating_add(record.quantity);
        }
        Ok(totals)
    }

    /// Records at or under the low-stock threshold, empty ones excluded.
    pub fn low_stock(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        let threshold = self.config().get_low_stock_threshold();
        let mut low: Vec<StockRecord> = self
            .cluster_stock(actor, cluster_id)?
            .into_iter()
            .filter(|r| r.is_low(threshold))
            .collect();
        low.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.key.cmp(&b.key)));
        Ok(low)
    }

    pub fn cluster_summary(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
    ) -> Result<ClusterSummary, InventoryError> {
        ensure_permitted(actor)?;
        let threshold = self.config().get_low_stock_threshold();
        let (records, requests) = self.store().transaction(|tx| {
            let records = tx.cluster_stock(&cluster_id)?;
            let requests = tx.cluster_requests(&cluster_id)?;
            Ok::<_, InventoryError>((records, requests))
        })?;

        let titles: BTreeSet<BookId> = records.iter().map(|r| r.key.book_id).collect();
        let count = |status: RequestStatus| requests.iter().filter(|r| r.status == status).count();
        Ok(ClusterSummary {
            total_copies: records.iter().map(|r| u64::from(r.quantity)).sum(),
            unique_titles: titles.len(),
            low_stock_records: records.iter().filter(|r| r.is_low(threshold)).count(),
            total_requests: requests.len(),
            pending_requests: count(RequestStatus::Pending),
            approved_requests: count(RequestStatus::Approved),
            fulfilled_requests: count(RequestStatus::Fulfilled),
            denied_requests: count(RequestStatus::Denied),
        })
    }

    /// The cluster's Inventory Log, newest first. `limit` falls back to the
    /// configured activity page size.
    pub fn activity(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerEntry>, InventoryError> {
        let entries = self.cluster_entries(actor, cluster_id)?;
        let limit = limit.unwrap_or(self.config().get_activity_limit());
        Ok(bookkeeper_ledger::query::most_recent(&entries, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Check the cluster's log invariants and reconcile it against stored
    /// quantities.
    pub fn audit(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
    ) -> Result<AuditReport, InventoryError> {
        ensure_permitted(actor)?;
        let (entries, records) = self.store().transaction(|tx| {
            let entries = tx.cluster_entries(&cluster_id)?;
            let records = tx.cluster_stock(&cluster_id)?;
            Ok::<_, InventoryError>((entries, records))
        })?;

        let report = AuditReport {
            entries_checked: entries.len(),
            violations: validate_ledger(&entries),
            mismatches: reconcile(&entries, &records),
        };
        if report.is_clean() {
            info!(cluster = %cluster_id, entries = report.entries_checked, "audit clean");
        } else {
            for violation in &report.violations {
                warn!(cluster = %cluster_id, %violation, "ledger violation");
            }
            for mismatch in &report.mismatches {
                warn!(
                    cluster = %cluster_id,
                    key = %mismatch.key,
                    stored = ?mismatch.stored,
                    replayed = mismatch.replayed,
                    "stored quantity does not match the log"
                );
            }
        }
        Ok(report)
    }

    fn cluster_stock(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        ensure_permitted(actor)?;
        self.store()
            .transaction(|tx| tx.cluster_stock(&cluster_id).map_err(InventoryError::from))
    }

    fn cluster_entries(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
    ) -> Result<Vec<LedgerEntry>, InventoryError> {
        ensure_permitted(actor)?;
        self.store()
            .transaction(|tx| tx.cluster_entries(&cluster_id).map_err(InventoryError::from))
    }
}

#[cfg(test)]
mod tests {
    use bookkeeper_types::{ActorId, ChangeType, LocationId, NewLedgerEntry, StockKey};

    use super::*;
    use crate::allocator::{AllocationLine, FulfillRequest};
    use crate::config::EngineConfig;
    use crate::store::MemoryStore;
    use crate::test_support::Fixture;

    #[test_log::test]
    fn availability_sums_locations_per_book() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 4);
        fx.add(fx.loc_b, fx.book1, 6);
        fx.add(fx.loc_c, fx.book2, 1);

        let availability = fx.engine.availability(&fx.actor, fx.cluster).unwrap();
        similar_asserts::assert_eq!(
            availability,
            BTreeMap::from([(fx.book1, 10), (fx.book2, 1)])
        );
    }

    #[test_log::test]
    fn low_stock_excludes_empty_records_and_sorts_by_quantity() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 5);
        fx.add(fx.loc_b, fx.book1, 2);
        fx.add(fx.loc_c, fx.book1, 6);
        let emptied = fx.add(fx.loc_a, fx.book2, 3);
        fx.engine
            .update_quantity(&fx.actor, emptied.id, 0, None)
            .unwrap();

        let low: Vec<_> = fx
            .engine
            .low_stock(&fx.actor, fx.cluster)
            .unwrap()
            .into_iter()
            .map(|r| (r.key.location_id, r.quantity))
            .collect();
        assert_eq!(low, vec![(fx.loc_b, 2), (fx.loc_a, 5)]);
    }

    #[test_log::test]
    fn low_stock_threshold_is_configurable() {
        let fx = Fixture::with_engine(InventoryEngine::with_config(
            MemoryStore::new(),
            EngineConfig::default().low_stock_threshold(1),
        ));
        fx.add(fx.loc_a, fx.book1, 1);
        fx.add(fx.loc_b, fx.book1, 2);
        assert_eq!(fx.engine.low_stock(&fx.actor, fx.cluster).unwrap().len(), 1);
    }

    #[test_log::test]
    fn summary_counts_stock_and_requests() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 10);
        fx.add(fx.loc_b, fx.book1, 3);
        fx.add(fx.loc_a, fx.book2, 1);

        let fulfilled = fx.request(fx.book1, 2);
        fx.engine
            .fulfill_request(
                &fx.actor,
                FulfillRequest {
                    request_id: fulfilled.id,
                    allocations: vec![AllocationLine {
                        location_id: fx.loc_a,
                        quantity: 2,
                        notes: None,
                    }],
                },
            )
            .unwrap();
        let denied = fx.request(fx.book2, 1);
        fx.engine.deny_request(&fx.actor, denied.id, None).unwrap();
        let approved = fx.request(fx.book2, 1);
        fx.engine.approve_request(&fx.actor, approved.id).unwrap();
        fx.request(fx.book1, 1);

        let summary = fx.engine.cluster_summary(&fx.actor, fx.cluster).unwrap();
        insta::assert_json_snapshot!(summary, @r#"
        {
          "total_copies": 12,
          "unique_titles": 2,
          "low_stock_records": 2,
          "total_requests": 4,
          "pending_requests": 1,
          "approved_requests": 1,
          "fulfilled_requests": 1,
          "denied_requests": 1
        }
        "#);
    }

    #[test_log::test]
    fn activity_is_newest_first_and_cluster_scoped() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 1);
        fx.add(fx.loc_a, fx.book1, 2);
        fx.add(fx.loc_a, fx.book1, 3);
        fx.engine
            .add_stock(
                &fx.actor,
                crate::transactions::AddStock {
                    cluster_id: ClusterId::from_u128(99),
                    location_id: fx.loc_a,
                    book_id: fx.book1,
                    quantity: 7,
                    notes: None,
                },
            )
            .unwrap();

        let feed = fx.engine.activity(&fx.actor, fx.cluster, Some(2)).unwrap();
        let changes: Vec<i64> = feed.iter().map(|e| e.quantity_change).collect();
        assert_eq!(changes, vec![3, 2]);

        let all = fx.engine.activity(&fx.actor, fx.cluster, None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test_log::test]
    fn audit_of_engine_written_log_is_clean() {
        let fx = Fixture::new();
        let record = fx.add(fx.loc_a, fx.book1, 8);
        fx.add(fx.loc_b, fx.book2, 2);
        fx.engine.update_quantity(&fx.actor, record.id, 5, None).unwrap();

        let report = fx.engine.audit(&fx.actor, fx.cluster).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.entries_checked, 3);
    }

    #[test_log::test]
    fn audit_reports_stock_changed_without_a_log_entry() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 8);
        let key = fx.key(fx.loc_a, fx.book1);

        // Write the record directly, bypassing the transaction operations.
        fx.store()
            .transaction(|tx| {
                let mut record = tx.stock_by_key(&key)?.expect("record exists");
                record.quantity = 11;
                tx.put_stock(record)
            })
            .unwrap();

        let report = fx.engine.audit(&fx.actor, fx.cluster).unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(
            report.mismatches,
            vec![ReplayMismatch {
                key,
                stored: Some(11),
                replayed: 8,
            }]
        );
    }

    #[test_log::test]
    fn audit_reports_log_entries_without_a_record() {
        let fx = Fixture::new();
        let key = StockKey::new(fx.cluster, LocationId::from_u128(77), fx.book2);
        fx.store()
            .transaction(|tx| {
                tx.append_entry(NewLedgerEntry::new(
                    key,
                    ChangeType::Added,
                    0,
                    4,
                    ActorId::from_u128(1),
                ))
            })
            .unwrap();

        let report = fx.engine.audit(&fx.actor, fx.cluster).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.mismatches[0].stored, None);
        assert_eq!(report.mismatches[0].replayed, 4);
    }

    #[test_log::test]
    fn reports_require_permission() {
        let fx = Fixture::new();
        let denied = Actor::forbidden(fx.actor.id);
        assert_eq!(
            fx.engine.audit(&denied, fx.cluster).unwrap_err(),
            InventoryError::NotPermitted
        );
        assert_eq!(
            fx.engine.availability(&denied, fx.cluster).unwrap_err(),
            InventoryError::NotPermitted
        );
        assert_eq!(
            fx.engine.cluster_summary(&denied, fx.cluster).unwrap_err(),
            InventoryError::NotPermitted
        );
    }
}
