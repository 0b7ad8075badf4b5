//! Request fulfillment across storage locations.
//!
//! A fulfillment call is one transaction with two passes. The validation pass
//! checks every line against the stock it would draw from, summing lines that
//! name the same location, and reports the first short location in line
//! order. Only when all of them pass does the commit pass decrement stock,
//! record each fulfillment and log it. The request status is then derived
//! from the total of all fulfillments for the request.

use bookkeeper_types::{
    Actor, BookRequest, ChangeType, FulfillmentId, FulfillmentRecord, LocationId, NewLedgerEntry,
    RequestId, RequestStatus, StockKey,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{InventoryEngine, ensure_permitted, positive_quantity};
use crate::error::InventoryError;
use crate::requests::load_request;
use crate::stock_ledger::StockLedger;
use crate::store::{InventoryStore, StoreTx};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub location_id: LocationId,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillRequest {
    pub request_id: RequestId,
    pub allocations: Vec<AllocationLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FulfillmentOutcome {
    /// The request after its status was updated.
    pub request: BookRequest,
    /// Records created by this call, in line order.
    pub fulfillments: Vec<FulfillmentRecord>,
    /// Sum over every fulfillment of the request, earlier calls included.
    pub total_fulfilled: u32,
}

impl<S: InventoryStore> InventoryEngine<S> {
    pub fn fulfill_request(
        &self,
        actor: &Actor,
        input: FulfillRequest,
    ) -> Result<FulfillmentOutcome, InventoryError> {
        ensure_permitted(actor)?;
        if input.allocations.is_empty() {
            return Err(InventoryError::EmptyAllocation);
        }

        let outcome = self.store().transaction(|tx| {
            let request = load_request(tx, &input.request_id)?;
            if !request.status.accepts_fulfillment() {
                return Err(InventoryError::InvalidRequestState(request.status));
            }
            let lines = validate_lines(tx, &request, &input.allocations)?;
            commit(tx, actor, request, lines)
        });

        match &outcome {
            Ok(outcome) => info!(
                request = %outcome.request.id,
                lines = outcome.fulfillments.len(),
                total = outcome.total_fulfilled,
                requested = outcome.request.quantity_requested,
                status = %outcome.request.status,
                "request fulfilled"
            ),
            Err(error) => warn!(request = %input.request_id, %error, "fulfillment rejected"),
        }
        outcome
    }
}

/// A line that passed validation.
struct CheckedLine<'a> {
    line: &'a AllocationLine,
    quantity: u32,
}

fn validate_lines<'a>(
    tx: &dyn StoreTx,
    request: &BookRequest,
    allocations: &'a [AllocationLine],
) -> Result<Vec<CheckedLine<'a>>, InventoryError> {
    let lines = allocations
        .iter()
        .map(|line| {
            let quantity =
                positive_quantity(line.quantity, "All fulfillment quantities must be positive")?;
            Ok(CheckedLine { line, quantity })
        })
        .collect::<Result<Vec<_>, InventoryError>>()?;

    let already: u64 = tx
        .fulfillments_for(&request.id)?
        .iter()
        .map(|f| u64::from(f.quantity))
        .sum();
    let remaining = u64::from(request.quantity_requested).saturating_sub(already);
    let asked: u64 = lines.iter().map(|l| u64::from(l.quantity)).sum();
    if asked > remaining {
        return Err(InventoryError::invalid_quantity(format!(
            "Fulfillment exceeds the remaining quantity. Remaining: {remaining}, Requested: {asked}"
        )));
    }

    // Locations in the order the lines first name them. Bounded by
    // `remaining`, so each per-location sum fits in u32.
    let mut demand: Vec<(LocationId, u32)> = Vec::new();
    for line in &lines {
        let location = line.line.location_id;
        match demand.iter_mut().find(|(seen, _)| *seen == location) {
            Some((_, wanted)) => *wanted += line.quantity,
            None => demand.push((location, line.quantity)),
        }
    }

    for (location, wanted) in demand {
        let key = StockKey::new(request.cluster_id, location, request.book_id);
        let record = tx
            .stock_by_key(&key)?
            .ok_or_else(|| InventoryError::not_found(format!("No inventory found at {location}")))?;
        if record.quantity < wanted {
            return Err(InventoryError::InsufficientStock {
                location_id: Some(location),
                available: record.quantity,
                requested: wanted,
            });
        }
    }
    Ok(lines)
}

fn commit(
    tx: &mut dyn StoreTx,
    actor: &Actor,
    mut request: BookRequest,
    lines: Vec<CheckedLine<'_>>,
) -> Result<FulfillmentOutcome, InventoryError> {
    let now = Utc::now();
    let mut fulfillments = Vec::with_capacity(lines.len());

    for CheckedLine { line, quantity } in lines {
        let key = StockKey::new(request.cluster_id, line.location_id, request.book_id);
        let available = StockLedger::new(tx).get_quantity(&key)?;
        let remaining =
            available
                .checked_sub(quantity)
                .ok_or(InventoryError::InsufficientStock {
                    location_id: Some(line.location_id),
                    available,
                    requested: quantity,
                })?;
        let (previous, record) =
            StockLedger::new(tx).set_quantity(&key, remaining, actor.id, None)?;

        let fulfillment = FulfillmentRecord {
            id: FulfillmentId::new(),
            request_id: request.id,
            location_id: line.location_id,
            quantity,
            fulfilled_by: actor.id,
            fulfilled_at: now,
            notes: line.notes.clone(),
        };
        tx.insert_fulfillment(fulfillment.clone())?;
        let entry = tx.append_entry(
            NewLedgerEntry::new(key, ChangeType::Fulfilled, previous, record.quantity, actor.id)
                .with_notes(line.notes.clone())
                .linked_to(request.id, fulfillment.id),
        )?;
        debug!(
            request = %request.id,
            fulfillment = %fulfillment.id,
            key = %key,
            quantity,
            sequence = entry.sequence,
            "fulfillment line committed"
        );
        fulfillments.push(fulfillment);
    }

    let total_fulfilled: u32 = tx
        .fulfillments_for(&request.id)?
        .iter()
        .map(|f| f.quantity)
        .sum();
    let next = request
        .status
        .after_fulfillment(total_fulfilled, request.quantity_requested);
    if next != request.status {
        request.status = request.status.transition_to(next)?;
    }
    if request.status == RequestStatus::Fulfilled {
        request.fulfilled_by = Some(actor.id);
        request.fulfilled_at = Some(now);
    }
    request.updated_at = now;
    tx.put_request(request.clone())?;

    Ok(FulfillmentOutcome {
        request,
        fulfillments,
        total_fulfilled,
    })
}

#[cfg(test)]
mod tests {
    use bookkeeper_ledger::query::{entries_for_request, fulfilled_from_log};
    use bookkeeper_ledger::{reconcile, validate_ledger};

    use super::*;
    use crate::store::FailPoint;
    use crate::test_support::Fixture;

    fn line(location_id: LocationId, quantity: i64) -> AllocationLine {
        AllocationLine {
            location_id,
            quantity,
            notes: None,
        }
    }

    fn fulfill(
        fx: &Fixture,
        request_id: RequestId,
        allocations: Vec<AllocationLine>,
    ) -> Result<FulfillmentOutcome, InventoryError> {
        fx.engine.fulfill_request(
            &fx.actor,
            FulfillRequest {
                request_id,
                allocations,
            },
        )
    }

    #[test_log::test]
    fn partial_then_complete_fulfillment() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 10);
        fx.add(fx.loc_b, fx.book1, 15);
        let request = fx.request(fx.book1, 20);

        let first = fulfill(&fx, request.id, vec![line(fx.loc_a, 4), line(fx.loc_b, 5)]).unwrap();
        assert_eq!(first.total_fulfilled, 9);
        assert_eq!(first.request.status, RequestStatus::Approved);
        assert_eq!(first.request.fulfilled_at, None);
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 6);
        assert_eq!(fx.quantity(fx.loc_b, fx.book1), 10);

        let second = fulfill(&fx, request.id, vec![line(fx.loc_a, 6), line(fx.loc_b, 5)]).unwrap();
        assert_eq!(second.total_fulfilled, 20);
        assert_eq!(second.request.status, RequestStatus::Fulfilled);
        assert_eq!(second.request.fulfilled_by, Some(fx.actor.id));
        assert!(second.request.fulfilled_at.is_some());
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 0);
        assert_eq!(fx.quantity(fx.loc_b, fx.book1), 5);

        let history = fx.engine.request_history(&fx.actor, request.id).unwrap();
        assert_eq!(history.fulfillments.len(), 4);
        assert_eq!(history.total_fulfilled(), 20);
        assert_eq!(history.entries.len(), 4);
        for (entry, fulfillment) in history.entries.iter().zip(&history.fulfillments) {
            assert_eq!(entry.change_type, ChangeType::Fulfilled);
            assert_eq!(entry.related_fulfillment_id, Some(fulfillment.id));
            assert_eq!(entry.quantity_change, -i64::from(fulfillment.quantity));
        }
    }

    #[test_log::test]
    fn full_fulfillment_from_pending_goes_straight_to_fulfilled() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 8);
        let request = fx.request(fx.book1, 8);

        let outcome = fulfill(&fx, request.id, vec![line(fx.loc_a, 8)]).unwrap();
        assert_eq!(outcome.request.status, RequestStatus::Fulfilled);

        let again = fulfill(&fx, request.id, vec![line(fx.loc_a, 1)]).unwrap_err();
        insta::assert_snapshot!(
            again.to_string(),
            @r#"Cannot fulfill a request with status "fulfilled""#
        );
    }

    #[test_log::test]
    fn one_short_line_rejects_the_whole_call() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 10);
        fx.add(fx.loc_b, fx.book1, 2);
        let request = fx.request(fx.book1, 12);
        let log_before = fx.entries();

        let err = fulfill(&fx, request.id, vec![line(fx.loc_a, 9), line(fx.loc_b, 3)]).unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                location_id: Some(fx.loc_b),
                available: 2,
                requested: 3,
            }
        );
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 10);
        assert_eq!(fx.quantity(fx.loc_b, fx.book1), 2);
        similar_asserts::assert_eq!(fx.entries(), log_before);
        assert!(fx.store().fulfillments().unwrap().is_empty());
        assert_eq!(fx.status(request.id), RequestStatus::Pending);
    }

    #[test_log::test]
    fn repeated_location_is_checked_against_its_sum() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 5);
        let request = fx.request(fx.book1, 10);

        let err =
            fulfill(&fx, request.id, vec![line(fx.loc_a, 3), line(fx.loc_a, 3)]).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 5);

        let ok = fulfill(&fx, request.id, vec![line(fx.loc_a, 2), line(fx.loc_a, 3)]).unwrap();
        assert_eq!(ok.fulfillments.len(), 2);
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 0);
        assert!(validate_ledger(&fx.entries()).is_empty());
    }

    #[test_log::test]
    fn first_short_location_in_line_order_is_reported() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 1);
        fx.add(fx.loc_b, fx.book1, 1);
        let request = fx.request(fx.book1, 10);

        let err =
            fulfill(&fx, request.id, vec![line(fx.loc_b, 5), line(fx.loc_a, 5)]).unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                location_id: Some(fx.loc_b),
                available: 1,
                requested: 5,
            }
        );
        assert!(fx.store().fulfillments().unwrap().is_empty());
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 1);
    }

    #[test_log::test]
    fn missing_record_and_missing_request() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 5);
        let request = fx.request(fx.book1, 4);

        let no_record = fulfill(&fx, request.id, vec![line(fx.loc_c, 1)]).unwrap_err();
        insta::assert_snapshot!(
            no_record.to_string(),
            @"No inventory found at location:00000000-0000-0000-0000-00000000000d"
        );

        let no_request = fulfill(&fx, RequestId::new(), vec![line(fx.loc_a, 1)]).unwrap_err();
        insta::assert_snapshot!(no_request.to_string(), @"Request not found");
    }

    #[test_log::test]
    fn line_and_call_shape_errors() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 5);
        let request = fx.request(fx.book1, 4);

        assert_eq!(
            fulfill(&fx, request.id, vec![]).unwrap_err(),
            InventoryError::EmptyAllocation
        );
        let zero =
            fulfill(&fx, request.id, vec![line(fx.loc_a, 2), line(fx.loc_a, 0)]).unwrap_err();
        insta::assert_snapshot!(zero.to_string(), @"All fulfillment quantities must be positive");

        let over = fulfill(&fx, request.id, vec![line(fx.loc_a, 5)]).unwrap_err();
        insta::assert_snapshot!(
            over.to_string(),
            @"Fulfillment exceeds the remaining quantity. Remaining: 4, Requested: 5"
        );
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 5);
        assert_eq!(fx.entries().len(), 1);
    }

    #[test_log::test]
    fn denied_request_cannot_be_fulfilled() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 5);
        let request = fx.request(fx.book1, 2);
        fx.engine.deny_request(&fx.actor, request.id, None).unwrap();

        let err = fulfill(&fx, request.id, vec![line(fx.loc_a, 2)]).unwrap_err();
        assert_eq!(err, InventoryError::InvalidRequestState(RequestStatus::Denied));
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 5);
    }

    #[test_log::test]
    fn store_failure_mid_commit_rolls_everything_back() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 5);
        fx.add(fx.loc_b, fx.book1, 5);
        let request = fx.request(fx.book1, 6);
        fx.store()
            .fail_next(FailPoint::InsertFulfillment { after: 1 })
            .unwrap();

        let err = fulfill(&fx, request.id, vec![line(fx.loc_a, 3), line(fx.loc_b, 3)]).unwrap_err();
        assert!(matches!(err, InventoryError::Store(_)));
        assert_eq!(fx.quantity(fx.loc_a, fx.book1), 5);
        assert_eq!(fx.quantity(fx.loc_b, fx.book1), 5);
        assert!(fx.store().fulfillments().unwrap().is_empty());
        assert_eq!(fx.entries().len(), 2);
        assert_eq!(fx.status(request.id), RequestStatus::Pending);
    }

    #[test_log::test]
    fn log_accounts_for_every_fulfilled_copy() {
        let fx = Fixture::new();
        fx.add(fx.loc_a, fx.book1, 10);
        fx.add(fx.loc_b, fx.book1, 10);
        let request = fx.request(fx.book1, 12);
        fulfill(&fx, request.id, vec![line(fx.loc_a, 7)]).unwrap();
        fulfill(&fx, request.id, vec![line(fx.loc_b, 5)]).unwrap();

        let entries = fx.entries();
        assert_eq!(fulfilled_from_log(&entries, &request.id), 12);
        assert_eq!(entries_for_request(&entries, &request.id).len(), 2);
        assert!(validate_ledger(&entries).is_empty());
        assert!(reconcile(&entries, &fx.store().stock().unwrap()).is_empty());
    }
}
