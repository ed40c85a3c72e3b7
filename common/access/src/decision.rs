use serde::{Deserialize, Serialize};

/// Outcome of a single module access check. Ephemeral; recomputed per check,
/// never stored beyond the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ModuleAccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_carries_reason() {
        let decision = ModuleAccessDecision::deny("upgrade required");
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("upgrade required"));
        assert!(ModuleAccessDecision::allow().allowed);
    }
}
