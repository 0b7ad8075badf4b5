use crate::ids::{ActorId, BookId, ClusterId, LocationId, StockRecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite identity of a stock counter: one book at one location in one cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub cluster_id: ClusterId,
    pub location_id: LocationId,
    pub book_id: BookId,
}

impl StockKey {
    pub fn new(cluster_id: ClusterId, location_id: LocationId, book_id: BookId) -> Self {
        Self {
            cluster_id,
            location_id,
            book_id,
        }
    }

    /// Same cluster and book, different location.
    pub fn at(&self, location_id: LocationId) -> Self {
        Self {
            location_id,
            ..*self
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.cluster_id, self.location_id, self.book_id
        )
    }
}

/// Current quantity of one book at one location.
///
/// Created lazily on the first addition for its key and never deleted; a
/// record may rest at zero indefinitely. `quantity` is unsigned so the
/// non-negative bound holds by construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: StockRecordId,
    pub key: StockKey,
    pub quantity: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: ActorId,
}

impl StockRecord {
    pub fn is_low(&self, threshold: u32) -> bool {
        self.quantity > 0 && self.quantity <= threshold
    }
}
