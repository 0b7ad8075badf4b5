use std::collections::HashMap;
use std::sync::Mutex;

use bookkeeper_ledger::InvariantState;
use bookkeeper_types::{
    BookRequest, ClusterId, FulfillmentRecord, LedgerEntry, NewLedgerEntry, RequestId, StockKey,
    StockRecord, StockRecordId,
};

use super::{InventoryStore, StoreTx};
use crate::error::StoreError;

/// One-shot fault for the next transaction, so tests can observe rollback.
///
/// `after` counts the calls of that kind that still succeed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    PutStock { after: usize },
    AppendEntry { after: usize },
    InsertFulfillment { after: usize },
}

#[derive(Clone, Debug, Default)]
struct MemoryState {
    stock: HashMap<StockRecordId, StockRecord>,
    stock_index: HashMap<StockKey, StockRecordId>,
    entries: Vec<LedgerEntry>,
    next_sequence: u64,
    /// Checks every append against the log so far.
    log_invariants: InvariantState,
    requests: HashMap<RequestId, BookRequest>,
    /// Request ids in insertion order.
    request_order: Vec<RequestId>,
    fulfillments: Vec<FulfillmentRecord>,
}

/// In-process reference store.
///
/// The state mutex is held for the whole transaction, which serializes
/// transactions. Writes go to a staged copy that replaces the committed state
/// only when the closure succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_point: Mutex<Option<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fault for the next transaction only.
    pub fn fail_next(&self, point: FailPoint) -> Result<(), StoreError> {
        *self.fail_point.lock().map_err(|_| poisoned())? = Some(point);
        Ok(())
    }

    /// Committed Inventory Log, in log order.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self.state.lock().map_err(|_| poisoned())?.entries.clone())
    }

    /// Committed stock records, in key order.
    pub fn stock(&self) -> Result<Vec<StockRecord>, StoreError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        let mut records: Vec<_> = state.stock.values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    pub fn fulfillments(&self) -> Result<Vec<FulfillmentRecord>, StoreError> {
        Ok(self.state.lock().map_err(|_| poisoned())?.fulfillments.clone())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl InventoryStore for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let fail_point = self.fail_point.lock().map_err(|_| poisoned())?.take();
        let mut committed = self.state.lock().map_err(|_| poisoned())?;

        let mut tx = MemoryTx {
            staged: committed.clone(),
            fail_point,
            calls: Calls::default(),
        };
        let value = f(&mut tx)?;
        *committed = tx.staged;
        Ok(value)
    }
}

#[derive(Debug, Default)]
struct Calls {
    put_stock: usize,
    append_entry: usize,
    insert_fulfillment: usize,
}

struct MemoryTx {
    staged: MemoryState,
    fail_point: Option<FailPoint>,
    calls: Calls,
}

impl MemoryTx {
    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.fail_point == Some(point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

impl StoreTx for MemoryTx {
    fn stock_by_key(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError> {
        Ok(self
            .staged
            .stock_index
            .get(key)
            .and_then(|id| self.staged.stock.get(id))
            .cloned())
    }

    fn stock_by_id(&self, id: &StockRecordId) -> Result<Option<StockRecord>, StoreError> {
        Ok(self.staged.stock.get(id).cloned())
    }

    fn put_stock(&mut self, record: StockRecord) -> Result<(), StoreError> {
        self.trip(FailPoint::PutStock {
            after: self.calls.put_stock,
        })?;
        self.calls.put_stock += 1;

        match self.staged.stock_index.get(&record.key) {
            Some(existing) if *existing != record.id => {
                return Err(StoreError::Conflict(format!(
                    "stock record for {} already exists",
                    record.key
                )));
            }
            Some(_) => {}
            None => {
                if self.staged.stock.contains_key(&record.id) {
                    return Err(StoreError::Conflict(format!(
                        "stock record {} cannot change its key",
                        record.id
                    )));
                }
                self.staged.stock_index.insert(record.key, record.id);
            }
        }
        self.staged.stock.insert(record.id, record);
        Ok(())
    }

    fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        self.trip(FailPoint::AppendEntry {
            after: self.calls.append_entry,
        })?;
        self.calls.append_entry += 1;

        let entry = entry.sequenced(self.staged.next_sequence);
        self.staged
            .log_invariants
            .check_append(&entry)
            .map_err(|violation| StoreError::Conflict(violation.to_string()))?;
        self.staged.next_sequence += 1;
        self.staged.entries.push(entry.clone());
        Ok(entry)
    }

    fn request(&self, id: &RequestId) -> Result<Option<BookRequest>, StoreError> {
        Ok(self.staged.requests.get(id).cloned())
    }

    fn put_request(&mut self, request: BookRequest) -> Result<(), StoreError> {
        if !self.staged.requests.contains_key(&request.id) {
            self.staged.request_order.push(request.id);
        }
        self.staged.requests.insert(request.id, request);
        Ok(())
    }

    fn insert_fulfillment(&mut self, record: FulfillmentRecord) -> Result<(), StoreError> {
        self.trip(FailPoint::InsertFulfillment {
            after: self.calls.insert_fulfillment,
        })?;
        self.calls.insert_fulfillment += 1;

        if self.staged.fulfillments.iter().any(|f| f.id == record.id) {
            return Err(StoreError::Conflict(format!(
                "fulfillment {} already exists",
                record.id
            )));
        }
        self.staged.fulfillments.push(record);
        Ok(())
    }

    fn fulfillments_for(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<FulfillmentRecord>, StoreError> {
        Ok(self
            .staged
            .fulfillments
            .iter()
            .filter(|f| &f.request_id == request_id)
            .cloned()
            .collect())
    }

    fn cluster_stock(&self, cluster_id: &ClusterId) -> Result<Vec<StockRecord>, StoreError> {
        let mut records: Vec<_> = self
            .staged
            .stock
            .values()
            .filter(|r| &r.key.cluster_id == cluster_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    fn cluster_requests(&self, cluster_id: &ClusterId) -> Result<Vec<BookRequest>, StoreError> {
        Ok(self
            .staged
            .request_order
            .iter()
            .rev()
            .filter_map(|id| self.staged.requests.get(id))
            .filter(|r| &r.cluster_id == cluster_id)
            .cloned()
            .collect())
    }

    fn cluster_entries(&self, cluster_id: &ClusterId) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .staged
            .entries
            .iter()
            .filter(|e| &e.key.cluster_id == cluster_id)
            .cloned()
            .collect())
    }
}
