use serde::{Deserialize, Serialize};

/// Atomic capability tokens. The catalog is closed: the same table backs the
/// server's authorization checks and the client's UI gating, so variants are
/// added here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "dashboard:view")]
    DashboardView,
    #[serde(rename = "customers:view")]
    CustomersView,
    #[serde(rename = "customers:create")]
    CustomersCreate,
    #[serde(rename = "customers:edit")]
    CustomersEdit,
    #[serde(rename = "customers:delete")]
    CustomersDelete,
    #[serde(rename = "bookings:view")]
    BookingsView,
    #[serde(rename = "bookings:manage")]
    BookingsManage,
    #[serde(rename = "staff:view")]
    StaffView,
    #[serde(rename = "staff:manage")]
    StaffManage,
    #[serde(rename = "reports:view")]
    ReportsView,
    #[serde(rename = "billing:manage")]
    BillingManage,
    #[serde(rename = "settings:manage")]
    SettingsManage,
    #[serde(rename = "modules:manage")]
    ModulesManage,
    #[serde(rename = "profile:view")]
    ProfileView,
    #[serde(rename = "profile:edit")]
    ProfileEdit,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::DashboardView,
        Permission::CustomersView,
        Permission::CustomersCreate,
        Permission::CustomersEdit,
        Permission::CustomersDelete,
        Permission::BookingsView,
        Permission::BookingsManage,
        Permission::StaffView,
        Permission::StaffManage,
        Permission::ReportsView,
        Permission::BillingManage,
        Permission::SettingsManage,
        Permission::ModulesManage,
        Permission::ProfileView,
        Permission::ProfileEdit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::DashboardView => "dashboard:view",
            Permission::CustomersView => "customers:view",
            Permission::CustomersCreate => "customers:create",
            Permission::CustomersEdit => "customers:edit",
            Permission::CustomersDelete => "customers:delete",
            Permission::BookingsView => "bookings:view",
            Permission::BookingsManage => "bookings:manage",
            Permission::StaffView => "staff:view",
            Permission::StaffManage => "staff:manage",
            Permission::ReportsView => "reports:view",
            Permission::BillingManage => "billing:manage",
            Permission::SettingsManage => "settings:manage",
            Permission::ModulesManage => "modules:manage",
            Permission::ProfileView => "profile:view",
            Permission::ProfileEdit => "profile:edit",
        }
    }

    pub fn parse(value: &str) -> Option<Permission> {
        Permission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
    }
}
