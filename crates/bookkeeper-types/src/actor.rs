use crate::ids::ActorId;
use serde::{Deserialize, Serialize};

/// The caller of a core operation.
///
/// Identity and the permission decision both come from outside: the caller
/// resolves roles for the specific operation and passes the yes/no result
/// here. The core never looks roles up itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub permitted: bool,
}

impl Actor {
    pub fn allowed(id: ActorId) -> Self {
        Self { id, permitted: true }
    }

    pub fn forbidden(id: ActorId) -> Self {
        Self {
            id,
            permitted: false,
        }
    }
}
