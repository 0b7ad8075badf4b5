mod allocator;
mod config;
mod engine;
mod error;
mod recommend;
mod reports;
mod requests;
mod stock_ledger;
mod store;
mod transactions;

#[cfg(test)]
mod test_support;

pub use allocator::{AllocationLine, FulfillRequest, FulfillmentOutcome};
pub use config::{ConfigError, EngineConfig};
pub use engine::InventoryEngine;
pub use error::{InventoryError, StoreError};
pub use recommend::{Recommendation, RecommendationCategory, recommend};
pub use reports::{AuditReport, ClusterSummary};
pub use requests::{CreateRequest, RequestHistory};
pub use store::{FailPoint, InventoryStore, MemoryStore, StoreTx};
pub use transactions::{
    AddStock, BulkAddItem, BulkAddOutcome, BulkAddStock, BulkItemFailure, TransferReceipt,
    TransferStock,
};
