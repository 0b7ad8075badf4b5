use crate::error::DomainError;
use crate::ids::{ActorId, BookId, ClusterId, FulfillmentId, LocationId, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`BookRequest`].
///
/// Transitions only move forward:
///
/// ```text
/// Pending ──► Approved ──► Fulfilled
///    │  └──────────────────────▲
///    └──► Denied
/// ```
///
/// `Denied` and `Fulfilled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    /// Terminal.
    Denied,
    /// Terminal.
    Fulfilled,
}

/// Every legal `(from, to)` pair. Anything absent is rejected.
pub const ALLOWED_TRANSITIONS: &[(RequestStatus, RequestStatus)] = &[
    (RequestStatus::Pending, RequestStatus::Approved),
    (RequestStatus::Pending, RequestStatus::Denied),
    (RequestStatus::Pending, RequestStatus::Fulfilled),
    (RequestStatus::Approved, RequestStatus::Fulfilled),
];

impl RequestStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Fulfilled => "fulfilled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Denied | Self::Fulfilled)
    }

    /// Whether the allocator may hand out stock against a request in this state.
    pub fn accepts_fulfillment(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        ALLOWED_TRANSITIONS.contains(&(*self, next))
    }

    /// Checked transition against [`ALLOWED_TRANSITIONS`].
    pub fn transition_to(self, next: RequestStatus) -> Result<RequestStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Status after a fulfillment call brought the running total to
    /// `total_fulfilled`.
    ///
    /// Full coverage ends in `Fulfilled` from either eligible state. Partial
    /// coverage promotes `Pending` to `Approved` and leaves `Approved` as is.
    pub fn after_fulfillment(self, total_fulfilled: u32, quantity_requested: u32) -> RequestStatus {
        if total_fulfilled >= quantity_requested {
            RequestStatus::Fulfilled
        } else if self == RequestStatus::Pending {
            RequestStatus::Approved
        } else {
            self
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A member's ask for a number of copies of one book within their cluster.
///
/// `quantity_requested` is fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRequest {
    pub id: RequestId,
    pub cluster_id: ClusterId,
    pub book_id: BookId,
    pub quantity_requested: u32,
    pub requested_by: ActorId,
    pub purpose: Option<String>,
    pub status: RequestStatus,
    /// Denial reason, set by `deny`.
    pub notes: Option<String>,
    pub fulfilled_by: Option<ActorId>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One location-specific allocation against a [`BookRequest`]. Immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRecord {
    pub id: FulfillmentId,
    pub request_id: RequestId,
    pub location_id: LocationId,
    pub quantity: u32,
    pub fulfilled_by: ActorId,
    pub fulfilled_at: DateTime<Utc>,
    pub notes: Option<String>,
}
