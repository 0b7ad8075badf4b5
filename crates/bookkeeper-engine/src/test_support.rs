use bookkeeper_types::{
    Actor, ActorId, BookId, BookRequest, ClusterId, LedgerEntry, LocationId, RequestId,
    RequestStatus, StockKey, StockRecord,
};

use crate::engine::InventoryEngine;
use crate::error::InventoryError;
use crate::requests::CreateRequest;
use crate::stock_ledger::StockLedger;
use crate::store::{InventoryStore, MemoryStore};
use crate::transactions::AddStock;

/// One cluster with three locations and two books over a fresh store.
pub struct Fixture {
    pub engine: InventoryEngine<MemoryStore>,
    pub actor: Actor,
    pub cluster: ClusterId,
    pub loc_a: LocationId,
    pub loc_b: LocationId,
    pub loc_c: LocationId,
    pub book1: BookId,
    pub book2: BookId,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_engine(InventoryEngine::new(MemoryStore::new()))
    }

    pub fn with_engine(engine: InventoryEngine<MemoryStore>) -> Self {
        Self {
            engine,
            actor: Actor::allowed(ActorId::from_u128(100)),
            cluster: ClusterId::from_u128(1),
            loc_a: LocationId::from_u128(11),
            loc_b: LocationId::from_u128(12),
            loc_c: LocationId::from_u128(13),
            book1: BookId::from_u128(21),
            book2: BookId::from_u128(22),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        self.engine.store()
    }

    pub fn key(&self, location: LocationId, book: BookId) -> StockKey {
        StockKey::new(self.cluster, location, book)
    }

    pub fn add(&self, location: LocationId, book: BookId, quantity: i64) -> StockRecord {
        self.engine
            .add_stock(
                &self.actor,
                AddStock {
                    cluster_id: self.cluster,
                    location_id: location,
                    book_id: book,
                    quantity,
                    notes: None,
                },
            )
            .expect("add stock")
    }

    pub fn quantity(&self, location: LocationId, book: BookId) -> u32 {
        let key = self.key(location, book);
        self.store()
            .transaction(|tx| StockLedger::new(tx).get_quantity(&key))
            .expect("read quantity")
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.store().entries().expect("read log")
    }

    pub fn request(&self, book: BookId, quantity: i64) -> BookRequest {
        self.engine
            .create_request(
                &self.actor,
                CreateRequest {
                    cluster_id: self.cluster,
                    book_id: book,
                    quantity_requested: quantity,
                    purpose: None,
                },
            )
            .expect("create request")
    }

    pub fn status(&self, request_id: RequestId) -> RequestStatus {
        self.engine
            .store()
            .transaction(|tx| {
                Ok::<_, InventoryError>(tx.request(&request_id)?.expect("request exists").status)
            })
            .expect("read request")
    }
}
