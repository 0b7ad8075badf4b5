use bookkeeper_types::Actor;

use crate::config::EngineConfig;
use crate::error::InventoryError;
use crate::store::InventoryStore;

/// Entry point for every core operation.
///
/// Operations are spread over `transactions`, `requests`, `allocator`,
/// `recommend` and `reports`; each one checks the caller's permission, then
/// does all of its reads and writes inside a single store transaction.
#[derive(Debug)]
pub struct InventoryEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: InventoryStore> InventoryEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

pub(crate) fn ensure_permitted(actor: &Actor) -> Result<(), InventoryError> {
    if actor.permitted {
        Ok(())
    } else {
        tracing::warn!(actor = %actor.id, "operation rejected: not permitted");
        Err(InventoryError::NotPermitted)
    }
}

/// `quantity > 0`, narrowed to the stock counter width.
pub(crate) fn positive_quantity(quantity: i64, message: &str) -> Result<u32, InventoryError> {
    if quantity <= 0 {
        return Err(InventoryError::invalid_quantity(message));
    }
    u32::try_from(quantity).map_err(|_| InventoryError::invalid_quantity("Quantity is too large"))
}

/// `quantity >= 0`, narrowed to the stock counter width.
pub(crate) fn non_negative_quantity(quantity: i64) -> Result<u32, InventoryError> {
    if quantity < 0 {
        return Err(InventoryError::invalid_quantity("Quantity cannot be negative"));
    }
    u32::try_from(quantity).map_err(|_| InventoryError::invalid_quantity("Quantity is too large"))
}
