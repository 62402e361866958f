use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of any account: customer, chef, manager or admin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Chef,
    CateringManager,
    SystemAdmin,
}

impl Role {
    /// Roles allowed to move orders through the kitchen workflow.
    pub fn is_kitchen_staff(self) -> bool {
        matches!(self, Role::Chef | Role::CateringManager)
    }

    pub fn can_assign_schedules(self) -> bool {
        self == Role::CateringManager
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Customer => "customer",
            Role::Chef => "chef",
            Role::CateringManager => "catering_manager",
            Role::SystemAdmin => "system_admin",
        };
        f.write_str(name)
    }
}

/// The authenticated caller, as resolved by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
