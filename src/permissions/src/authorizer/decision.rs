//! Authorization decision types

use crate::types::RoleId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authorization decision with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision ID
    pub id: String,

    /// Whether the request is allowed
    pub allowed: bool,

    /// Reason for the decision
    pub reason: DecisionReason,

    /// Roles evaluated, in order, before the decision was reached
    pub evaluated_roles: Vec<RoleId>,

    /// Decision timestamp (milliseconds since epoch)
    pub timestamp: u64,
}

impl Decision {
    pub(crate) fn new(reason: DecisionReason, evaluated_roles: Vec<RoleId>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            allowed: reason.is_allowed(),
            reason,
            evaluated_roles,
            timestamp,
        }
    }

    /// Role that decided the outcome, if any
    pub fn deciding_role(&self) -> Option<&str> {
        match &self.reason {
            DecisionReason::Granted { role } | DecisionReason::Vetoed { role } => {
                Some(role.as_str())
            }
            DecisionReason::NoMatchingRule | DecisionReason::NoRoles => None,
        }
    }
}

/// Reason for authorization decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionReason {
    /// A grant rule of this role matched
    Granted { role: RoleId },

    /// A denial rule of this role applies, ending evaluation
    Vetoed { role: RoleId },

    /// No role granted the request
    NoMatchingRule,

    /// The user holds no roles
    NoRoles,
}

impl DecisionReason {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}
