use bookkeeper_types::{
    Actor, BookId, BookRequest, ClusterId, FulfillmentRecord, LedgerEntry, RequestId,
    RequestStatus,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{InventoryEngine, ensure_permitted, positive_quantity};
use crate::error::InventoryError;
use crate::store::{InventoryStore, StoreTx};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub cluster_id: ClusterId,
    pub book_id: BookId,
    pub quantity_requested: i64,
    pub purpose: Option<String>,
}

/// A request together with everything fulfillment wrote for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHistory {
    pub request: BookRequest,
    pub fulfillments: Vec<FulfillmentRecord>,
    pub entries: Vec<LedgerEntry>,
}

impl RequestHistory {
    pub fn total_fulfilled(&self) -> u32 {
        self.fulfillments.iter().map(|f| f.quantity).sum()
    }
}

impl<S: InventoryStore> InventoryEngine<S> {
    pub fn create_request(
        &self,
        actor: &Actor,
        input: CreateRequest,
    ) -> Result<BookRequest, InventoryError> {
        ensure_permitted(actor)?;
        let quantity_requested =
            positive_quantity(input.quantity_requested, "Quantity must be positive")?;

        let now = Utc::now();
        let request = BookRequest {
            id: RequestId::new(),
            cluster_id: input.cluster_id,
            book_id: input.book_id,
            quantity_requested,
            requested_by: actor.id,
            purpose: input.purpose,
            status: RequestStatus::Pending,
            notes: None,
            fulfilled_by: None,
            fulfilled_at: None,
            created_at: now,
            updated_at: now,
        };
        let stored = request.clone();
        self.store()
            .transaction(|tx| tx.put_request(stored).map_err(InventoryError::from))?;

        info!(
            request = %request.id,
            cluster = %request.cluster_id,
            book = %request.book_id,
            quantity = quantity_requested,
            "request created"
        );
        Ok(request)
    }

    pub fn approve_request(
        &self,
        actor: &Actor,
        request_id: RequestId,
    ) -> Result<BookRequest, InventoryError> {
        ensure_permitted(actor)?;
        let request = self.store().transaction(|tx| {
            transition(tx, &request_id, RequestStatus::Approved, |_| {})
        })?;
        info!(request = %request.id, actor = %actor.id, "request approved");
        Ok(request)
    }

    pub fn deny_request(
        &self,
        actor: &Actor,
        request_id: RequestId,
        notes: Option<String>,
    ) -> Result<BookRequest, InventoryError> {
        ensure_permitted(actor)?;
        let request = self.store().transaction(|tx| {
            transition(tx, &request_id, RequestStatus::Denied, |request| {
                request.notes = notes;
            })
        })?;
        info!(request = %request.id, actor = %actor.id, "request denied");
        Ok(request)
    }

    /// A cluster's requests newest first, optionally only those in `status`.
    pub fn cluster_requests(
        &self,
        actor: &Actor,
        cluster_id: ClusterId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<BookRequest>, InventoryError> {
        ensure_permitted(actor)?;
        let requests = self
            .store()
            .transaction(|tx| tx.cluster_requests(&cluster_id).map_err(InventoryError::from))?;
        Ok(requests
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect())
    }

    pub fn request_history(
        &self,
        actor: &Actor,
        request_id: RequestId,
    ) -> Result<RequestHistory, InventoryError> {
        ensure_permitted(actor)?;
        self.store().transaction(|tx| {
            let request = load_request(tx, &request_id)?;
            let fulfillments = tx.fulfillments_for(&request_id)?;
            let log = tx.cluster_entries(&request.cluster_id)?;
            let entries = fulfillments
                .iter()
                .filter_map(|f| bookkeeper_ledger::query::entry_for_fulfillment(&log, &f.id))
                .cloned()
                .collect();
            Ok(RequestHistory {
                request,
                fulfillments,
                entries,
            })
        })
    }
}

pub(crate) fn load_request(
    tx: &mut dyn StoreTx,
    request_id: &RequestId,
) -> Result<BookRequest, InventoryError> {
    tx.request(request_id)?
        .ok_or_else(|| InventoryError::not_found("Request not found"))
}

/// Checked status change through the transition table.
fn transition(
    tx: &mut dyn StoreTx,
    request_id: &RequestId,
    next: RequestStatus,
    update: impl FnOnce(&mut BookRequest),
) -> Result<BookRequest, InventoryError> {
    let mut request = load_request(tx, request_id)?;
    request.status = request.status.transition_to(next)?;
    request.updated_at = Utc::now();
    update(&mut request);
    tx.put_request(request.clone())?;
    Ok(request)
}
