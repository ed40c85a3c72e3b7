use common_access::{has_permission, Permission};

use crate::session::AuthState;
use crate::tenant::TenantState;

/// Navigable locations the guard can reason about. Concrete pages carry
/// their own path; the named variants are the routing fixpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Splash,
    Login,
    TenantPicker,
    Dashboard,
    Page(String),
}

/// Declarative requirements attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRule {
    pub required_permission: Option<Permission>,
    pub required_module: Option<String>,
}

impl RouteRule {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn permission(permission: Permission) -> Self {
        Self {
            required_permission: Some(permission),
            required_module: None,
        }
    }

    pub fn module(permission: Permission, module: impl Into<String>) -> Self {
        Self {
            required_permission: Some(permission),
            required_module: Some(module.into()),
        }
    }
}

/// Guard verdict. `Forbidden` and `UpgradeRequired` render a placeholder in
/// place of the page content; they are not redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(Location),
    Forbidden { missing: Permission },
    UpgradeRequired { module: String },
}

/// Pure routing decision. No I/O, no hidden state: identical inputs always
/// produce the identical verdict. The subscription input is a pre-computed
/// snapshot of the tenant's enabled modules, never fetched from here.
pub fn evaluate(
    location: &Location,
    auth: &AuthState,
    tenant: &TenantState,
    rule: &RouteRule,
    enabled_modules: &[String],
) -> RouteDecision {
    if !auth.bootstrapped() {
        return redirect_unless(location, Location::Splash);
    }

    let user = match auth.user() {
        Some(user) => user,
        None => return redirect_unless(location, Location::Login),
    };

    if !tenant.is_settled() {
        return redirect_unless(location, Location::Splash);
    }

    if tenant.current().is_none() {
        return redirect_unless(location, Location::TenantPicker);
    }

    if matches!(location, Location::Splash | Location::Login) {
        return RouteDecision::Redirect(Location::Dashboard);
    }

    if let Some(required) = rule.required_permission {
        if !has_permission(user.role, required) {
            return RouteDecision::Forbidden { missing: required };
        }
    }

    if let Some(required) = &rule.required_module {
        if !enabled_modules.iter().any(|module| module == required) {
            return RouteDecision::UpgradeRequired {
                module: required.clone(),
            };
        }
    }

    RouteDecision::Allow
}

fn redirect_unless(location: &Location, target: Location) -> RouteDecision {
    if *location == target {
        RouteDecision::Allow
    } else {
        RouteDecision::Redirect(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SessionUser, TenantSummary};
    use common_access::Role;
    use uuid::Uuid;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            name: Some("Test User".to_string()),
            email: Some("user@example.com".to_string()),
            role,
            tenant_id: None,
        }
    }

    fn tenant_summary() -> TenantSummary {
        TenantSummary {
            id: Uuid::new_v4(),
            name: "Bright Clinic".to_string(),
            slug: "bright-clinic".to_string(),
            logo: None,
            business_type: "clinic".to_string(),
        }
    }

    fn authenticated(role: Role) -> AuthState {
        AuthState::Authenticated {
            user: user(role),
            bootstrapped: true,
        }
    }

    fn tenant_loaded(current: Option<TenantSummary>) -> TenantState {
        TenantState::Loaded {
            tenants: vec![tenant_summary()],
            current,
        }
    }

    fn all_locations() -> Vec<Location> {
        vec![
            Location::Splash,
            Location::Login,
            Location::TenantPicker,
            Location::Dashboard,
            Location::Page("/reports".to_string()),
        ]
    }

    #[test]
    fn unbootstrapped_always_parks_on_splash() {
        let auth_states = [
            AuthState::Initial,
            AuthState::Loading,
            AuthState::Unauthenticated {
                bootstrapped: false,
            },
            AuthState::Error {
                message: "boot failed".to_string(),
                bootstrapped: false,
            },
        ];
        let tenant_states = [
            TenantState::Initial,
            TenantState::Loading,
            tenant_loaded(Some(tenant_summary())),
        ];

        for auth in &auth_states {
            for tenant in &tenant_states {
                for location in all_locations() {
                    let decision = evaluate(&location, auth, tenant, &RouteRule::open(), &[]);
                    if location == Location::Splash {
                        assert_eq!(decision, RouteDecision::Allow);
                    } else {
                        assert_eq!(decision, RouteDecision::Redirect(Location::Splash));
                    }
                }
            }
        }
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let auth = AuthState::Unauthenticated { bootstrapped: true };
        for location in all_locations() {
            let decision = evaluate(
                &location,
                &auth,
                &TenantState::Initial,
                &RouteRule::open(),
                &[],
            );
            if location == Location::Login {
                assert_eq!(decision, RouteDecision::Allow);
            } else {
                assert_eq!(decision, RouteDecision::Redirect(Location::Login));
            }
        }
    }

    #[test]
    fn authenticated_without_tenant_goes_to_picker() {
        let auth = authenticated(Role::Admin);
        let tenant = tenant_loaded(None);
        for location in all_locations() {
            let decision = evaluate(&location, &auth, &tenant, &RouteRule::open(), &[]);
            if location == Location::TenantPicker {
                assert_eq!(decision, RouteDecision::Allow);
            } else {
                assert_eq!(decision, RouteDecision::Redirect(Location::TenantPicker));
            }
        }
    }

    #[test]
    fn tenant_loading_waits_on_splash() {
        let auth = authenticated(Role::Staff);
        let decision = evaluate(
            &Location::Dashboard,
            &auth,
            &TenantState::Loading,
            &RouteRule::open(),
            &[],
        );
        assert_eq!(decision, RouteDecision::Redirect(Location::Splash));
    }

    #[test]
    fn settled_session_leaves_entry_pages() {
        let auth = authenticated(Role::Manager);
        let tenant = tenant_loaded(Some(tenant_summary()));
        for location in [Location::Splash, Location::Login] {
            assert_eq!(
                evaluate(&location, &auth, &tenant, &RouteRule::open(), &[]),
                RouteDecision::Redirect(Location::Dashboard)
            );
        }
        // Staying on the picker to switch tenants is allowed.
        assert_eq!(
            evaluate(
                &Location::TenantPicker,
                &auth,
                &tenant,
                &RouteRule::open(),
                &[]
            ),
            RouteDecision::Allow
        );
    }

    #[test]
    fn missing_permission_renders_forbidden_not_redirect() {
        let auth = authenticated(Role::Customer);
        let tenant = tenant_loaded(Some(tenant_summary()));
        let decision = evaluate(
            &Location::Page("/settings".to_string()),
            &auth,
            &tenant,
            &RouteRule::permission(Permission::SettingsManage),
            &[],
        );
        assert_eq!(
            decision,
            RouteDecision::Forbidden {
                missing: Permission::SettingsManage
            }
        );
    }

    #[test]
    fn staff_with_permission_but_no_module_sees_upgrade_prompt() {
        // Staff hold reports:view, yet the analytics module is not part of
        // the tenant's subscription: the upgrade prompt wins.
        let auth = authenticated(Role::Staff);
        let tenant = tenant_loaded(Some(tenant_summary()));
        let enabled = vec!["desks".to_string()];
        let decision = evaluate(
            &Location::Page("/analytics".to_string()),
            &auth,
            &tenant,
            &RouteRule::module(Permission::ReportsView, "advanced-analytics"),
            &enabled,
        );
        assert_eq!(
            decision,
            RouteDecision::UpgradeRequired {
                module: "advanced-analytics".to_string()
            }
        );
    }

    #[test]
    fn subscribed_module_and_permission_allow_the_page() {
        let auth = authenticated(Role::Staff);
        let tenant = tenant_loaded(Some(tenant_summary()));
        let enabled = vec!["advanced-analytics".to_string()];
        let decision = evaluate(
            &Location::Page("/analytics".to_string()),
            &auth,
            &tenant,
            &RouteRule::module(Permission::ReportsView, "advanced-analytics"),
            &enabled,
        );
        assert_eq!(decision, RouteDecision::Allow);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let auth = authenticated(Role::Admin);
        let tenant = tenant_loaded(Some(tenant_summary()));
        let rule = RouteRule::module(Permission::ReportsView, "desks");
        let enabled = vec!["desks".to_string()];
        let location = Location::Page("/desks".to_string());

        let first = evaluate(&location, &auth, &tenant, &rule, &enabled);
        let second = evaluate(&location, &auth, &tenant, &rule, &enabled);
        assert_eq!(first, second);
        assert_eq!(first, RouteDecision::Allow);
    }

    #[test]
    fn tenant_error_with_prior_selection_keeps_the_user_in_place() {
        let auth = authenticated(Role::Manager);
        let tenant = TenantState::Error {
            message: "list refresh failed".to_string(),
            tenants: vec![tenant_summary()],
            current: Some(tenant_summary()),
        };
        let decision = evaluate(
            &Location::Page("/customers".to_string()),
            &auth,
            &tenant,
            &RouteRule::permission(Permission::CustomersView),
            &[],
        );
        assert_eq!(decision, RouteDecision::Allow);
    }
}
