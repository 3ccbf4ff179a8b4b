use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::storage::entities::FocusPolicy;

use super::whitelist::{is_allowed, is_default_exempt};

/// How the host should react to a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusAction {
    Dim,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusViolation {
    pub identity: String,
    pub message: String,
    pub action: FocusAction,
}

pub fn violation_message(identity: &str) -> String {
    format!("You're outside your focus zone. {identity} is not in your whitelist.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusVerdict {
    /// Focus mode is off or there is no window.
    Inactive,
    Compliant,
    Violation(FocusViolation),
}

/// Owns the focus policy and judges window switches against it.
pub struct FocusModeGuard {
    policy: FocusPolicy,
    default_exempt: Vec<String>,
}

impl FocusModeGuard {
    pub fn new(mut policy: FocusPolicy, default_exempt: Vec<String>) -> Self {
        let whitelist = std::mem::take(&mut policy.whitelist);
        let mut guard = Self {
            policy,
            default_exempt,
        };
        guard.policy.whitelist = guard.with_defaults(whitelist);
        guard
    }

    fn with_defaults(&self, whitelist: impl IntoIterator<Item = String>) -> BTreeSet<String> {
        whitelist
            .into_iter()
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .chain(self.default_exempt.iter().cloned())
            .collect()
    }

    pub fn evaluate(&self, identity: &str) -> FocusVerdict {
        if !self.policy.enabled || identity.is_empty() {
            return FocusVerdict::Inactive;
        }
        let exempt = self.default_exempt.iter().map(String::as_str);
        if is_default_exempt(identity, exempt.clone())
            || is_allowed(identity, self.policy.whitelist.iter().map(String::as_str), exempt)
        {
            return FocusVerdict::Compliant;
        }
        FocusVerdict::Violation(FocusViolation {
            identity: identity.to_string(),
            message: violation_message(identity),
            action: self.action(),
        })
    }

    pub fn action(&self) -> FocusAction {
        if self.policy.dim_not_block {
            FocusAction::Dim
        } else {
            FocusAction::Block
        }
    }

    /// Returns whether the flag actually changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.policy.enabled != enabled;
        self.policy.enabled = enabled;
        if changed {
            info!("Focus mode {}", if enabled { "enabled" } else { "disabled" });
        }
        changed
    }

    pub fn set_whitelist(&mut self, whitelist: impl IntoIterator<Item = String>) {
        self.policy.whitelist = self.with_defaults(whitelist);
        info!("Whitelist updated, {} entries", self.policy.whitelist.len());
    }

    pub fn set_dim(&mut self, dim_not_block: bool) {
        self.policy.dim_not_block = dim_not_block;
    }

    pub fn is_enabled(&self) -> bool {
        self.policy.enabled
    }

    pub fn whitelist(&self) -> Vec<String> {
        self.policy.whitelist.iter().cloned().collect()
    }

    pub fn policy(&self) -> &FocusPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        monitor::whitelist::DEFAULT_EXEMPT,
        storage::entities::FocusPolicy,
    };

    use super::{FocusAction, FocusModeGuard, FocusVerdict};

    fn guard(whitelist: &[&str]) -> FocusModeGuard {
        let mut guard = FocusModeGuard::new(
            FocusPolicy::default(),
            DEFAULT_EXEMPT.iter().map(|v| v.to_string()).collect(),
        );
        guard.set_whitelist(whitelist.iter().map(|v| v.to_string()));
        guard
    }

    #[test]
    fn test_disabled_guard_is_inactive() {
        let guard = guard(&[]);
        assert_eq!(guard.evaluate("YouTube"), FocusVerdict::Inactive);
    }

    #[test]
    fn test_violation_message_and_action() {
        let mut guard = guard(&["Visual Studio Code"]);
        guard.set_enabled(true);

        let FocusVerdict::Violation(violation) = guard.evaluate("YouTube") else {
            panic!("expected violation");
        };
        assert_eq!(
            violation.message,
            "You're outside your focus zone. YouTube is not in your whitelist."
        );
        assert_eq!(violation.action, FocusAction::Dim);

        guard.set_dim(false);
        assert!(matches!(
            guard.evaluate("YouTube"),
            FocusVerdict::Violation(v) if v.action == FocusAction::Block
        ));
    }

    #[test]
    fn test_whitelisted_and_exempt_are_compliant() {
        let mut guard = guard(&["Figma"]);
        guard.set_enabled(true);

        assert_eq!(guard.evaluate("Figma Desktop"), FocusVerdict::Compliant);
        assert_eq!(guard.evaluate("focuswatch"), FocusVerdict::Compliant);
    }

    #[test]
    fn test_default_exempt_with_empty_whitelist() {
        let mut guard = guard(&[]);
        guard.set_enabled(true);

        for identity in DEFAULT_EXEMPT {
            assert_eq!(guard.evaluate(identity), FocusVerdict::Compliant);
        }
    }

    #[test]
    fn test_whitelist_is_superset_of_defaults() {
        let guard = guard(&["Figma", "  "]);
        let whitelist = guard.whitelist();

        assert!(whitelist.contains(&"Figma".to_string()));
        assert!(DEFAULT_EXEMPT
            .iter()
            .all(|exempt| whitelist.contains(&exempt.to_string())));
        assert!(!whitelist.contains(&"".to_string()));
    }

    #[test]
    fn test_set_enabled_reports_change() {
        let mut guard = guard(&[]);
        assert!(guard.set_enabled(true));
        assert!(!guard.set_enabled(true));
        assert!(guard.set_enabled(false));
    }
}
