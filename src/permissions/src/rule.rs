//! Permission rules and their conditions

use crate::types::{ActionKey, EvalOptions, Subject, SubjectKey};
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::dispatcher;
use tracing::error;
use tracing::subscriber::NoSubscriber;

type Predicate<U, S> = dyn Fn(&U, &S, &EvalOptions) -> anyhow::Result<bool> + Send + Sync;

/// Failure raised while evaluating a condition
///
/// Never reaches the caller of a permission check: the condition is treated
/// as non-matching and the failure is logged.
#[derive(Debug, Error)]
pub enum ConditionError {
    /// The predicate returned an error
    #[error("condition '{label}' failed: {message}")]
    Failed {
        label: String,
        message: String,
        /// Full error chain, including a backtrace when captured
        detail: String,
    },

    /// The predicate panicked
    #[error("condition '{label}' panicked: {message}")]
    Panicked { label: String, message: String },
}

impl ConditionError {
    /// Report the failure to the log
    ///
    /// Goes to the active `tracing` subscriber. When none is installed the
    /// failure is written to stderr instead, so it is never silently lost.
    pub fn report(&self) {
        let subscribed = dispatcher::get_default(|dispatch| !dispatch.is::<NoSubscriber>());
        if !subscribed {
            let _ = self.write_report(&mut io::stderr().lock());
            return;
        }

        match self {
            Self::Failed { detail, .. } => {
                error!(error = %self, detail = %detail, "condition evaluation failed");
            }
            Self::Panicked { .. } => {
                error!(error = %self, "condition panicked during evaluation");
            }
        }
    }

    fn write_report(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self)?;
        if let Self::Failed { detail, .. } = self {
            writeln!(out, "{}", detail)?;
        }
        Ok(())
    }
}

/// Predicate narrowing when a rule applies
///
/// Always receives `(user, subject, options)`; predicates that don't need the
/// options simply ignore them.
pub struct Condition<U, S> {
    predicate: Arc<Predicate<U, S>>,
    label: Option<String>,
}

impl<U: 'static, S: 'static> Condition<U, S> {
    /// Create an infallible condition
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&U, &S, &EvalOptions) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(move |user: &U, subject: &S, options: &EvalOptions| {
                Ok(predicate(user, subject, options))
            }),
            label: None,
        }
    }

    /// Create a condition whose evaluation can fail
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&U, &S, &EvalOptions) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            label: None,
        }
    }
}

impl<U, S> Condition<U, S> {
    /// Attach a label used in diagnostics
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("anonymous")
    }

    /// Evaluate the predicate, converting errors and panics into `ConditionError`
    pub fn evaluate(
        &self,
        user: &U,
        subject: &S,
        options: &EvalOptions,
    ) -> Result<bool, ConditionError> {
        let predicate = &*self.predicate;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| predicate(user, subject, options)));

        match outcome {
            Ok(Ok(matched)) => Ok(matched),
            Ok(Err(err)) => Err(ConditionError::Failed {
                label: self.label().to_string(),
                message: err.to_string(),
                detail: format!("{:?}", err),
            }),
            Err(payload) => Err(ConditionError::Panicked {
                label: self.label().to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn raw(&self) -> Arc<Predicate<U, S>> {
        Arc::clone(&self.predicate)
    }
}

impl<U: 'static, S: Subject + 'static> Condition<U, S> {
    /// Restrict a condition to instances; passes when queried with a category
    pub fn for_instances(self) -> Self {
        let inner = self.raw();
        Self {
            predicate: Arc::new(move |user: &U, subject: &S, options: &EvalOptions| {
                if subject.is_category() {
                    Ok(true)
                } else {
                    (*inner)(user, subject, options)
                }
            }),
            label: self.label,
        }
    }

    /// Restrict a condition to categories; passes when queried with an instance
    pub fn for_categories(self) -> Self {
        let inner = self.raw();
        Self {
            predicate: Arc::new(move |user: &U, subject: &S, options: &EvalOptions| {
                if subject.is_category() {
                    (*inner)(user, subject, options)
                } else {
                    Ok(true)
                }
            }),
            label: self.label,
        }
    }
}

impl<U, S> Clone for Condition<U, S> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            label: self.label.clone(),
        }
    }
}

impl<U, S> fmt::Debug for Condition<U, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").field("label", &self.label()).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// One grant or denial for an action/subject pair
///
/// Immutable once constructed; indexes share rules by `Arc`.
pub struct Rule<U, S> {
    grants: bool,
    action: ActionKey,
    subject: SubjectKey,
    conditions: Vec<Condition<U, S>>,
}

impl<U, S> Rule<U, S> {
    pub fn new(
        grants: bool,
        action: ActionKey,
        subject: SubjectKey,
        conditions: Vec<Condition<U, S>>,
    ) -> Self {
        Self {
            grants,
            action,
            subject,
            conditions,
        }
    }

    /// True for a permission, false for an explicit denial
    pub fn grants(&self) -> bool {
        self.grants
    }

    pub fn action(&self) -> &ActionKey {
        &self.action
    }

    pub fn subject(&self) -> &SubjectKey {
        &self.subject
    }

    pub fn conditions(&self) -> &[Condition<U, S>] {
        &self.conditions
    }

    fn action_matches(&self, action: &ActionKey) -> bool {
        action.is_any() || self.action.is_any() || *action == self.action
    }
}

impl<U, S: Subject> Rule<U, S> {
    /// Whether the rule applies to this request
    ///
    /// Condition failures are logged and count as a mismatch.
    pub fn matches(
        &self,
        action: &ActionKey,
        subject: &S,
        user: &U,
        options: &EvalOptions,
    ) -> bool {
        self.try_match(action, subject, user, options).unwrap_or_else(|err| {
            err.report();
            false
        })
    }

    /// Like [`Rule::matches`], but hands condition failures back to the caller
    pub fn try_match(
        &self,
        action: &ActionKey,
        subject: &S,
        user: &U,
        options: &EvalOptions,
    ) -> Result<bool, ConditionError> {
        if !self.action_matches(action) || !self.subject_matches(subject) {
            return Ok(false);
        }

        for condition in &self.conditions {
            if !condition.evaluate(user, subject, options)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn subject_matches(&self, subject: &S) -> bool {
        if self.subject.is_any() {
            return true;
        }

        let key = subject.subject_key();
        key.is_any() || key == self.subject || subject.category().as_ref() == Some(&self.subject)
    }
}

impl<U, S> fmt::Debug for Rule<U, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("grants", &self.grants)
            .field("action", &self.action)
            .field("subject", &self.subject)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct User {
        id: u64,
    }

    fn rule(grants: bool, action: &str, subject: SubjectKey) -> Rule<User, SubjectKey> {
        Rule::new(grants, ActionKey::from(action), subject, Vec::new())
    }

    #[test]
    fn test_exact_match() {
        let rule = rule(true, "create", SubjectKey::named("stuff"));
        let user = User { id: 1 };
        let options = EvalOptions::new();

        assert!(rule.matches(&"create".into(), &SubjectKey::named("stuff"), &user, &options));
        assert!(!rule.matches(&"show".into(), &SubjectKey::named("stuff"), &user, &options));
        assert!(!rule.matches(&"create".into(), &SubjectKey::named("other"), &user, &options));
    }

    #[test]
    fn test_accessors_need_no_subject_impl() {
        let rule: Rule<(), ()> =
            Rule::new(false, "read".into(), SubjectKey::category("post"), Vec::new());
        assert!(!rule.grants());
        assert_eq!(rule.action(), &ActionKey::from("read"));
        assert_eq!(rule.subject(), &SubjectKey::category("post"));
        assert!(rule.conditions().is_empty());
    }

    #[test]
    fn test_wildcards_on_either_side() {
        let user = User { id: 1 };
        let options = EvalOptions::new();
        let anything = rule(true, "*", SubjectKey::Any);
        assert!(anything.matches(&"foo".into(), &SubjectKey::named("bar"), &user, &options));

        let specific = rule(true, "create", SubjectKey::named("stuff"));
        assert!(specific.matches(&ActionKey::Any, &SubjectKey::Any, &user, &options));
    }

    #[test]
    fn test_conditions_are_anded() {
        let user = User { id: 5 };
        let options = EvalOptions::new();
        let rule: Rule<User, SubjectKey> = Rule::new(
            true,
            "update".into(),
            SubjectKey::Any,
            vec![
                Condition::new(|user: &User, _: &SubjectKey, _: &EvalOptions| user.id == 5),
                Condition::new(|_: &User, _: &SubjectKey, options: &EvalOptions| {
                    options.get("force").is_some()
                }),
            ],
        );

        assert!(!rule.matches(&"update".into(), &SubjectKey::Any, &user, &options));
        let forced = EvalOptions::new().with("force", true);
        assert!(rule.matches(&"update".into(), &SubjectKey::Any, &user, &forced));
    }

    #[test]
    fn test_failing_condition_does_not_match() {
        let user = User { id: 5 };
        let rule: Rule<User, SubjectKey> = Rule::new(
            true,
            "update".into(),
            SubjectKey::Any,
            vec![Condition::fallible(|_: &User, _: &SubjectKey, _: &EvalOptions| {
                anyhow::bail!("record not loaded")
            })
            .labeled("owner check")],
        );

        let options = EvalOptions::new();
        assert!(!rule.matches(&"update".into(), &SubjectKey::Any, &user, &options));

        let err = rule
            .try_match(&"update".into(), &SubjectKey::Any, &user, &options)
            .unwrap_err();
        assert!(matches!(err, ConditionError::Failed { ref label, .. } if label == "owner check"));
    }

    #[test]
    fn test_panicking_condition_does_not_match() {
        let user = User { id: 5 };
        let condition: Condition<User, SubjectKey> =
            Condition::new(|_: &User, _: &SubjectKey, _: &EvalOptions| panic!("boom"));

        let err = condition
            .evaluate(&user, &SubjectKey::Any, &EvalOptions::new())
            .unwrap_err();
        match err {
            ConditionError::Panicked { message, .. } => assert_eq!(message, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn failing_rule() -> Rule<User, SubjectKey> {
        Rule::new(
            true,
            "update".into(),
            SubjectKey::Any,
            vec![Condition::fallible(|_: &User, _: &SubjectKey, _: &EvalOptions| {
                anyhow::bail!("record not loaded")
            })
            .labeled("owner check")],
        )
    }

    #[test]
    fn test_failure_is_logged_to_subscriber() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let err = tracing::subscriber::with_default(subscriber, || {
            let err = failing_rule()
                .try_match(&"update".into(), &SubjectKey::Any, &User { id: 5 }, &EvalOptions::new())
                .unwrap_err();
            err.report();
            err
        });

        let logged = buf.contents();
        assert!(logged.contains("ERROR"), "{logged}");
        assert!(logged.contains("owner check"), "{logged}");
        assert!(logged.contains("record not loaded"), "{logged}");
        assert!(matches!(err, ConditionError::Failed { .. }));
    }

    #[test]
    fn test_panic_is_logged_to_subscriber() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let condition: Condition<User, SubjectKey> =
            Condition::new(|_: &User, _: &SubjectKey, _: &EvalOptions| panic!("boom"))
                .labeled("exploding");
        tracing::subscriber::with_default(subscriber, || {
            condition
                .evaluate(&User { id: 1 }, &SubjectKey::Any, &EvalOptions::new())
                .unwrap_err()
                .report();
        });

        let logged = buf.contents();
        assert!(logged.contains("exploding"), "{logged}");
        assert!(logged.contains("boom"), "{logged}");
    }

    #[test]
    fn test_unsubscribed_report_falls_back_to_writer() {
        let err = failing_rule()
            .try_match(&"update".into(), &SubjectKey::Any, &User { id: 5 }, &EvalOptions::new())
            .unwrap_err();

        let mut out = Vec::new();
        err.write_report(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.starts_with("condition 'owner check' failed: record not loaded"));
        assert!(written.lines().count() >= 2);

        // No subscriber on this thread, so this goes to stderr.
        err.report();
    }

    #[test]
    fn test_instance_and_category_restrictions() {
        let user = User { id: 5 };
        let options = EvalOptions::new();
        let never: Condition<User, SubjectKey> =
            Condition::new(|_: &User, _: &SubjectKey, _: &EvalOptions| false);

        let instance_only = never.clone().for_instances();
        assert!(instance_only.evaluate(&user, &SubjectKey::category("post"), &options).unwrap());
        assert!(!instance_only.evaluate(&user, &SubjectKey::named("post#1"), &options).unwrap());

        let category_only = never.for_categories();
        assert!(!category_only.evaluate(&user, &SubjectKey::category("post"), &options).unwrap());
        assert!(category_only.evaluate(&user, &SubjectKey::named("post#1"), &options).unwrap());
    }
}
