use serde::{Deserialize, Serialize};

pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_CUSTOMER: &str = "customer";

/// Fixed job-function labels, most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    Staff,
    Customer,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::SuperAdmin,
        Role::Admin,
        Role::Manager,
        Role::Staff,
        Role::Customer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => ROLE_SUPER_ADMIN,
            Role::Admin => ROLE_ADMIN,
            Role::Manager => ROLE_MANAGER,
            Role::Staff => ROLE_STAFF,
            Role::Customer => ROLE_CUSTOMER,
        }
    }

    /// Total parse. Unknown labels resolve to the least-privileged role so
    /// the permission map never has an error path.
    pub fn parse_or_default(value: &str) -> Role {
        match value.trim().to_ascii_lowercase().as_str() {
            ROLE_SUPER_ADMIN => Role::SuperAdmin,
            ROLE_ADMIN => Role::Admin,
            ROLE_MANAGER => Role::Manager,
            ROLE_STAFF => Role::Staff,
            ROLE_CUSTOMER => Role::Customer,
            _ => Role::Customer,
        }
    }
}
