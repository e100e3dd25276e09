use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticated staff member performing a mutation, as vouched for by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffActor {
    pub staff_id: i64,
}

impl StaffActor {
    pub const fn new(staff_id: i64) -> Self {
        Self { staff_id }
    }
}

impl fmt::Display for StaffActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "staff:{}", self.staff_id)
    }
}
