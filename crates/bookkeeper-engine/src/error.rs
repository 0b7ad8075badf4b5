use bookkeeper_types::{DomainError, LocationId, RequestStatus};
use thiserror::Error;

/// Infrastructure failure reported by a store. Never a domain outcome.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage conflict: {0}")]
    Conflict(String),
}

/// Outcome of a rejected core operation.
///
/// Everything except [`InventoryError::Store`] is an expected condition whose
/// message is meant to be shown to the acting user as is.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("{0}")]
    InvalidQuantity(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Source and destination locations must be different")]
    SameLocation,
    #[error("{}", insufficient_message(.location_id, .available, .requested))]
    InsufficientStock {
        /// Set by the allocator; transfers leave it out of the message.
        location_id: Option<LocationId>,
        available: u32,
        requested: u32,
    },
    #[error("Cannot {action} a request with status \"{from}\"")]
    InvalidTransition {
        action: &'static str,
        from: RequestStatus,
    },
    #[error("Cannot fulfill a request with status \"{0}\"")]
    InvalidRequestState(RequestStatus),
    #[error("At least one fulfillment line is required")]
    EmptyAllocation,
    #[error("No items provided")]
    EmptyBatch,
    #[error("Not permitted")]
    NotPermitted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn insufficient_message(
    location_id: &Option<LocationId>,
    available: &u32,
    requested: &u32,
) -> String {
    match location_id {
        Some(location) => format!(
            "Insufficient stock at {location}. Available: {available}, Requested: {requested}"
        ),
        None => format!("Insufficient stock. Available: {available}"),
    }
}

impl InventoryError {
    pub(crate) fn invalid_quantity(message: impl Into<String>) -> Self {
        Self::InvalidQuantity(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Whether this is an expected domain outcome rather than an
    /// infrastructure failure.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

impl From<DomainError> for InventoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidTransition { from, to } => Self::InvalidTransition {
                action: match to {
                    RequestStatus::Approved => "approve",
                    RequestStatus::Denied => "deny",
                    RequestStatus::Fulfilled => "fulfill",
                    RequestStatus::Pending => "reopen",
                },
                from,
            },
        }
    }
}
