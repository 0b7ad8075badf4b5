pub mod actor;
pub mod book;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod request;
pub mod stock;

pub use actor::Actor;
pub use book::{Book, BookCategory, PublicationStatus};
pub use error::DomainError;
pub use ids::{ActorId, BookId, ClusterId, FulfillmentId, LocationId, RequestId, StockRecordId};
pub use ledger::{ChangeType, LedgerEntry, NewLedgerEntry};
pub use request::{ALLOWED_TRANSITIONS, BookRequest, FulfillmentRecord, RequestStatus};
pub use stock::{StockKey, StockRecord};
