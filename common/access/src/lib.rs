pub mod decision;
pub mod permissions;
pub mod policy;
pub mod roles;

pub use decision::ModuleAccessDecision;
pub use permissions::Permission;
pub use policy::{has_all, has_any, has_permission, permissions_for};
pub use roles::{Role, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_MANAGER, ROLE_STAFF, ROLE_SUPER_ADMIN};
