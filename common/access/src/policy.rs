use crate::permissions::Permission;
use crate::roles::Role;

// Static role -> permission table. Must stay identical to the server's copy;
// the client-side result is a UX optimization, the server re-checks every call.
pub fn permissions_for(role: Role) -> &'static [Permission] {
    use Permission::*;
    match role {
        Role::SuperAdmin => Permission::ALL,
        Role::Admin => &[
            DashboardView,
            CustomersView,
            CustomersCreate,
            CustomersEdit,
            CustomersDelete,
            BookingsView,
            BookingsManage,
            StaffView,
            StaffManage,
            ReportsView,
            BillingManage,
            SettingsManage,
            ProfileView,
            ProfileEdit,
        ],
        Role::Manager => &[
            DashboardView,
            CustomersView,
            CustomersCreate,
            CustomersEdit,
            BookingsView,
            BookingsManage,
            StaffView,
            ReportsView,
            ProfileView,
            ProfileEdit,
        ],
        Role::Staff => &[
            DashboardView,
            CustomersView,
            BookingsView,
            BookingsManage,
            ReportsView,
            ProfileView,
            ProfileEdit,
        ],
        Role::Customer => &[DashboardView, BookingsView, ProfileView, ProfileEdit],
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

pub fn has_any(role: Role, permissions: &[Permission]) -> bool {
    permissions
        .iter()
        .any(|permission| has_permission(role, *permission))
}

pub fn has_all(role: Role, permissions: &[Permission]) -> bool {
    permissions
        .iter()
        .all(|permission| has_permission(role, *permission))
}
