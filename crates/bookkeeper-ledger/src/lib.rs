pub mod error;
pub mod invariants;
pub mod query;
pub mod replay;

pub use error::{LedgerError, LedgerViolation, ReplayMismatch};
pub use invariants::{InvariantState, validate_ledger};
pub use replay::{last_snapshot, reconcile, replay_quantities, replay_quantity, verify_replay};
