//! Permission checks for a single user
//!
//! ```text
//! can(action, subject) → role identifiers → per role: RuleIndex::resolve
//!                                                ↓
//!                          vetoed? ──yes──→ deny (stop)
//!                                                ↓ no
//!                          any grant rule matches? ──yes──→ allow (stop)
//!                                                ↓ no
//!                                            next role → … → deny
//! ```
//!
//! Roles are evaluated in the order the role supplier returns them. The first
//! role that grants ends evaluation with an allow; the first role whose
//! gathered rules include a denial ends it with a deny, so a veto in one role
//! only overrides grants from roles evaluated after it.

pub mod decision;

pub use decision::{Decision, DecisionReason};

use crate::definition::Permissions;
use crate::types::{ActionKey, EvalOptions, RoleId, Subject};
use tracing::{debug, trace};

/// Answers permission checks for one bound user
pub struct Authorizer<U, S> {
    permissions: Permissions<U, S>,
    user: U,
}

impl<U, S> Authorizer<U, S> {
    pub fn new(permissions: Permissions<U, S>, user: U) -> Self {
        Self { permissions, user }
    }

    pub fn user(&self) -> &U {
        &self.user
    }

    pub fn permissions(&self) -> &Permissions<U, S> {
        &self.permissions
    }
}

impl<U, S: Subject> Authorizer<U, S> {
    /// Whether the user may perform `action` on `subject`
    pub fn can(&self, action: impl Into<ActionKey>, subject: &S) -> bool {
        self.can_with(action, subject, &EvalOptions::default())
    }

    /// Like [`Authorizer::can`], passing `options` through to conditions
    pub fn can_with(
        &self,
        action: impl Into<ActionKey>,
        subject: &S,
        options: &EvalOptions,
    ) -> bool {
        let (reason, _) = self.evaluate(&action.into(), subject, options);
        reason.is_allowed()
    }

    /// Full decision for `action` on `subject`
    pub fn check(&self, action: impl Into<ActionKey>, subject: &S) -> Decision {
        self.check_with(action, subject, &EvalOptions::default())
    }

    /// Full decision, passing `options` through to conditions
    pub fn check_with(
        &self,
        action: impl Into<ActionKey>,
        subject: &S,
        options: &EvalOptions,
    ) -> Decision {
        let (reason, evaluated_roles) = self.evaluate(&action.into(), subject, options);
        Decision::new(reason, evaluated_roles)
    }

    fn evaluate(
        &self,
        action: &ActionKey,
        subject: &S,
        options: &EvalOptions,
    ) -> (DecisionReason, Vec<RoleId>) {
        let roles = self.permissions.role_identifiers(&self.user);
        let metrics = self.permissions.metrics_collector();
        let mut evaluated = Vec::with_capacity(roles.len());

        let reason = if roles.is_empty() {
            DecisionReason::NoRoles
        } else {
            self.evaluate_roles(roles, action, subject, options, &mut evaluated)
        };

        debug!(
            permissions = %self.permissions.name(),
            action = %action,
            subject = %subject.subject_key(),
            ?reason,
            "permission check"
        );

        if let Some(metrics) = metrics {
            if matches!(reason, DecisionReason::Vetoed { .. }) {
                metrics.record_veto();
            }
            metrics.record_decision(reason.is_allowed());
        }

        (reason, evaluated)
    }

    fn evaluate_roles(
        &self,
        roles: Vec<RoleId>,
        action: &ActionKey,
        subject: &S,
        options: &EvalOptions,
        evaluated: &mut Vec<RoleId>,
    ) -> DecisionReason {
        let index = self.permissions.index();

        for role in roles {
            evaluated.push(role.clone());
            let resolution = index.resolve(&role, action, subject);

            if resolution.is_vetoed() {
                return DecisionReason::Vetoed { role };
            }

            trace!(role = %role, candidates = resolution.rules().len(), "evaluating role");

            for rule in resolution.rules().iter().filter(|rule| rule.grants()) {
                match rule.try_match(action, subject, &self.user, options) {
                    Ok(true) => return DecisionReason::Granted { role },
                    Ok(false) => {}
                    Err(err) => {
                        err.report();
                        if let Some(metrics) = self.permissions.metrics_collector() {
                            metrics.record_condition_failure();
                        }
                    }
                }
            }
        }

        DecisionReason::NoMatchingRule
    }
}
