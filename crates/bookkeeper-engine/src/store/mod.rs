//! Persistence seam for the core.
//!
//! Every operation runs inside [`InventoryStore::transaction`]. The closure
//! receives a [`StoreTx`] and the store commits its writes only when the
//! closure returns `Ok`; on `Err` nothing it wrote becomes visible.
//! Implementations must make the whole closure serializable with respect to
//! other transactions. That is what keeps read-validate-write spans (transfer,
//! allocation) from over-drawing stock under concurrent callers.

mod memory;

pub use memory::{FailPoint, MemoryStore};

use bookkeeper_types::{
    BookRequest, ClusterId, FulfillmentRecord, LedgerEntry, NewLedgerEntry, RequestId, StockKey,
    StockRecord, StockRecordId,
};

use crate::error::StoreError;

/// Capabilities available inside one transaction.
pub trait StoreTx {
    fn stock_by_key(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError>;

    fn stock_by_id(&self, id: &StockRecordId) -> Result<Option<StockRecord>, StoreError>;

    /// Insert or overwrite a record. A new id for a key that already has a
    /// record is a [`StoreError::Conflict`].
    fn put_stock(&mut self, record: StockRecord) -> Result<(), StoreError>;

    /// Append to the Inventory Log. The store assigns the sequence.
    fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    fn request(&self, id: &RequestId) -> Result<Option<BookRequest>, StoreError>;

    /// Insert or overwrite a request.
    fn put_request(&mut self, request: BookRequest) -> Result<(), StoreError>;

    fn insert_fulfillment(&mut self, record: FulfillmentRecord) -> Result<(), StoreError>;

    /// Fulfillments of one request in creation order.
    fn fulfillments_for(&self, request_id: &RequestId)
    -> Result<Vec<FulfillmentRecord>, StoreError>;

    fn cluster_stock(&self, cluster_id: &ClusterId) -> Result<Vec<StockRecord>, StoreError>;

    /// A cluster's requests, newest first.
    fn cluster_requests(&self, cluster_id: &ClusterId) -> Result<Vec<BookRequest>, StoreError>;

    /// A cluster's slice of the Inventory Log, in log order.
    fn cluster_entries(&self, cluster_id: &ClusterId) -> Result<Vec<LedgerEntry>, StoreError>;
}

pub trait InventoryStore {
    /// Run `f` as one serializable unit, committing iff it returns `Ok`.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
        E: From<StoreError>;
}
