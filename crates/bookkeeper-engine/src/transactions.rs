//! Stock mutation primitives: add, adjust, transfer and bulk add.
//!
//! Each operation writes the StockRecord and its Inventory Log entry inside
//! one store transaction, so either both land or neither does.

use bookkeeper_types::{
    Actor, ActorId, BookId, ChangeType, ClusterId, LedgerEntry, LocationId, NewLedgerEntry,
    StockKey, StockRecord, StockRecordId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{InventoryEngine, ensure_permitted, non_negative_quantity, positive_quantity};
use crate::error::InventoryError;
use crate::stock_ledger::StockLedger;
use crate::store::{InventoryStore, StoreTx};

const DEFAULT_TRANSFER_NOTE: &str = "Stock transfer";
const DEFAULT_BULK_NOTE: &str = "Bulk add";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStock {
    pub cluster_id: ClusterId,
    pub location_id: LocationId,
    pub book_id: BookId,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStock {
    pub cluster_id: ClusterId,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub book_id: BookId,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAddItem {
    pub location_id: LocationId,
    pub book_id: BookId,
    pub quantity: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAddStock {
    pub cluster_id: ClusterId,
    pub items: Vec<BulkAddItem>,
    pub notes: Option<String>,
}

/// Both legs of a completed transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReceipt {
    pub source: StockRecord,
    pub destination: StockRecord,
    /// Outgoing leg first.
    pub entries: [LedgerEntry; 2],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// 1-based position of the failing item.
    pub index: usize,
    pub error: InventoryError,
}

/// Result of a bulk add.
///
/// Items are applied one at a time, each in its own transaction. Processing
/// stops at the first failing item; items before it stay applied. Callers must
/// read a `failure` as "`processed` applied, one failed, the rest untried".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkAddOutcome {
    pub processed: usize,
    pub records: Vec<StockRecord>,
    pub failure: Option<BulkItemFailure>,
}

impl BulkAddOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

impl<S: InventoryStore> InventoryEngine<S> {
    /// Add copies at a location, creating the record on first addition.
    pub fn add_stock(&self, actor: &Actor, input: AddStock) -> Result<StockRecord, InventoryError> {
        ensure_permitted(actor)?;
        let quantity = positive_quantity(input.quantity, "Quantity must be positive")?;
        let key = StockKey::new(input.cluster_id, input.location_id, input.book_id);
        let notes = input.notes;

        let (record, entry) = self.store().transaction(|tx| {
            apply_add(tx, &key, quantity, notes.as_deref(), notes.clone(), actor.id)
        })?;

        info!(
            key = %key,
            added = quantity,
            previous = entry.previous_quantity,
            quantity = record.quantity,
            sequence = entry.sequence,
            "stock added"
        );
        Ok(record)
    }

    /// Set a record to an absolute quantity and log the signed difference.
    pub fn update_quantity(
        &self,
        actor: &Actor,
        record_id: StockRecordId,
        new_quantity: i64,
        notes: Option<String>,
    ) -> Result<StockRecord, InventoryError> {
        ensure_permitted(actor)?;
        let new_quantity = non_negative_quantity(new_quantity)?;

        let (record, entry) = self.store().transaction(|tx| {
            let current = tx
                .stock_by_id(&record_id)?
                .ok_or_else(|| InventoryError::not_found("Inventory record not found"))?;
            let (previous, record) = StockLedger::new(tx).set_quantity(
                &current.key,
                new_quantity,
                actor.id,
                notes.as_deref(),
            )?;
            let entry = tx.append_entry(
                NewLedgerEntry::new(
                    record.key,
                    ChangeType::Adjustment,
                    previous,
                    new_quantity,
                    actor.id,
                )
                .with_notes(notes.clone()),
            )?;
            Ok::<_, InventoryError>((record, entry))
        })?;

        info!(
            record = %record.id,
            previous = entry.previous_quantity,
            quantity = record.quantity,
            change = entry.quantity_change,
            "stock adjusted"
        );
        Ok(record)
    }

    /// Move copies between two locations of the same cluster.
    ///
    /// A source without a record counts as zero available.
    pub fn transfer_stock(
        &self,
        actor: &Actor,
        input: TransferStock,
    ) -> Result<TransferReceipt, InventoryError> {
        ensure_permitted(actor)?;
        if input.from_location_id == input.to_location_id {
            return Err(InventoryError::SameLocation);
        }
        let quantity = positive_quantity(input.quantity, "Transfer quantity must be positive")?;
        let from = StockKey::new(input.cluster_id, input.from_location_id, input.book_id);
        let to = from.at(input.to_location_id);
        let note = input.notes.as_deref().unwrap_or(DEFAULT_TRANSFER_NOTE);

        let receipt = self.store().transaction(|tx| {
            let available = StockLedger::new(tx).get_quantity(&from)?;
            if available < quantity {
                warn!(
                    key = %from,
                    available,
                    requested = quantity,
                    "transfer rejected: insufficient stock"
                );
                return Err(InventoryError::InsufficientStock {
                    location_id: None,
                    available,
                    requested: quantity,
                });
            }

            let destination_current = StockLedger::new(tx).get_quantity(&to)?;
            let destination_new = checked_total(destination_current, quantity)?;

            let (source_previous, source) =
                StockLedger::new(tx).set_quantity(&from, available - quantity, actor.id, None)?;
            let (destination_previous, destination) =
                StockLedger::new(tx).set_quantity(&to, destination_new, actor.id, None)?;

            let outgoing = tx.append_entry(
                NewLedgerEntry::new(
                    from,
                    ChangeType::Transferred,
                    source_previous,
                    source.quantity,
                    actor.id,
                )
                .with_notes(Some(format!("Transferred out: {note}"))),
            )?;
            let incoming = tx.append_entry(
                NewLedgerEntry::new(
                    to,
                    ChangeType::Transferred,
                    destination_previous,
                    destination.quantity,
                    actor.id,
                )
                .with_notes(Some(format!("Transferred in: {note}"))),
            )?;

            Ok(TransferReceipt {
                source,
                destination,
                entries: [outgoing, incoming],
            })
        })?;

        info!(
            from = %from,
            to = %to,
            quantity,
            source_quantity = receipt.source.quantity,
            destination_quantity = receipt.destination.quantity,
            "stock transferred"
        );
        Ok(receipt)
    }

    /// Add several items in order with add semantics, stopping at the first
    /// failure. See [`BulkAddOutcome`] for the partial-progress contract.
    pub fn bulk_add_stock(
        &self,
        actor: &Actor,
        input: BulkAddStock,
    ) -> Result<BulkAddOutcome, InventoryError> {
        ensure_permitted(actor)?;
        if input.items.is_empty() {
            return Err(InventoryError::EmptyBatch);
        }

        let log_notes = Some(
            input
                .notes
                .clone()
                .unwrap_or_else(|| DEFAULT_BULK_NOTE.to_string()),
        );
        let mut outcome = BulkAddOutcome {
            processed: 0,
            records: Vec::with_capacity(input.items.len()),
            failure: None,
        };

        for (position, item) in input.items.iter().enumerate() {
            let key = StockKey::new(input.cluster_id, item.location_id, item.book_id);
            let applied = positive_quantity(item.quantity, "All quantities must be positive")
                .and_then(|quantity| {
                    self.store().transaction(|tx| {
                        apply_add(
                            tx,
                            &key,
                            quantity,
                            input.notes.as_deref(),
                            log_notes.clone(),
                            actor.id,
                        )
                    })
                });

            match applied {
                Ok((record, _)) => {
                    debug!(
                        key = %key,
                        item = position + 1,
                        quantity = record.quantity,
                        "bulk item applied"
                    );
                    outcome.records.push(record);
                    outcome.processed += 1;
                }
                Err(error) => {
                    warn!(
                        cluster = %input.cluster_id,
                        item = position + 1,
                        processed = outcome.processed,
                        %error,
                        "bulk add stopped"
                    );
                    outcome.failure = Some(BulkItemFailure {
                        index: position + 1,
                        error,
                    });
                    break;
                }
            }
        }

        info!(
            cluster = %input.cluster_id,
            processed = outcome.processed,
            total = input.items.len(),
            complete = outcome.is_complete(),
            "bulk add finished"
        );
        Ok(outcome)
    }
}

/// Add semantics shared by single and bulk add: increment (or create) the
/// record and append one `added` entry.
fn apply_add(
    tx: &mut dyn StoreTx,
    key: &StockKey,
    quantity: u32,
    record_notes: Option<&str>,
    log_notes: Option<String>,
    actor: ActorId,
) -> Result<(StockRecord, LedgerEntry), InventoryError> {
    let current = StockLedger::new(tx).get_quantity(key)?;
    let new_quantity = checked_total(current, quantity)?;
    let (previous, record) =
        StockLedger::new(tx).set_quantity(key, new_quantity, actor, record_notes)?;
    let entry = tx.append_entry(
        NewLedgerEntry::new(*key, ChangeType::Added, previous, new_quantity, actor)
            .with_notes(log_notes),
    )?;
    Ok((record, entry))
}

fn checked_total(current: u32, added: u32) -> Result<u32, InventoryError> {
    current
        .checked_add(added)
        .ok_or_else(|| InventoryError::invalid_quantity("Quantity exceeds the maximum stock level"))
}
