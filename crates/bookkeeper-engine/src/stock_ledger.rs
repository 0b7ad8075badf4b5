use bookkeeper_types::{ActorId, StockKey, StockRecord, StockRecordId};
use chrono::Utc;

use crate::error::StoreError;
use crate::store::StoreTx;

/// Per-key quantity counters on top of a transaction.
///
/// No business rules live here: callers validate bounds before calling
/// [`StockLedger::set_quantity`], and append the matching log entry in the
/// same transaction.
pub(crate) struct StockLedger<'t> {
    tx: &'t mut dyn StoreTx,
}

impl<'t> StockLedger<'t> {
    pub(crate) fn new(tx: &'t mut dyn StoreTx) -> Self {
        Self { tx }
    }

    /// Current quantity; an absent record means zero.
    pub(crate) fn get_quantity(&self, key: &StockKey) -> Result<u32, StoreError> {
        Ok(self.tx.stock_by_key(key)?.map_or(0, |r| r.quantity))
    }

    /// Write `new_quantity` for `key`, creating the record on first use.
    ///
    /// `notes` replaces the record's note when given and leaves it alone
    /// otherwise. Returns the previous quantity together with the stored record.
    pub(crate) fn set_quantity(
        &mut self,
        key: &StockKey,
        new_quantity: u32,
        actor: ActorId,
        notes: Option<&str>,
    ) -> Result<(u32, StockRecord), StoreError> {
        let now = Utc::now();
        let (previous, record) = match self.tx.stock_by_key(key)? {
            Some(mut record) => {
                let previous = record.quantity;
                record.quantity = new_quantity;
                record.updated_at = now;
                record.updated_by = actor;
                if let Some(notes) = notes {
                    record.notes = Some(notes.to_string());
                }
                (previous, record)
            }
            None => (
                0,
                StockRecord {
                    id: StockRecordId::new(),
                    key: *key,
                    quantity: new_quantity,
                    notes: notes.map(str::to_string),
                    created_at: now,
                    updated_at: now,
                    updated_by: actor,
                },
            ),
        };
        self.tx.put_stock(record.clone())?;
        Ok((previous, record))
    }
}
