//! Rule-authoring surface
//!
//! [`RoleRules`] is what a role definition block receives. Every
//! `can`/`cannot` call expands its actions and subjects into one rule per
//! action x subject pair.
//!
//! # Example
//!
//! ```rust
//! use cretoai_permissions::{ConditionSpec, PermissionsBuilder, SubjectKey};
//!
//! struct User {
//!     id: u64,
//! }
//!
//! let permissions = PermissionsBuilder::<User, SubjectKey>::new()
//!     .role("member", |rules| {
//!         rules.can("create", "member_stuff");
//!         rules.can(["create", "destroy"], SubjectKey::category("blog_post"));
//!         rules.can_if(
//!             "update",
//!             SubjectKey::category("blog_post"),
//!             ConditionSpec::new().when(|user: &User, _, _| user.id == 5),
//!         );
//!         rules.cannot("delete", "*");
//!     })
//!     .build();
//!
//! assert_eq!(permissions.index().rules("member").len(), 5);
//! ```

use crate::index::RuleIndex;
use crate::rule::Condition;
use crate::types::{ActionKey, EvalOptions, RoleId, Subject, SubjectKey};

/// One or more actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actions(Vec<ActionKey>);

impl Actions {
    pub fn into_vec(self) -> Vec<ActionKey> {
        self.0
    }
}

impl From<ActionKey> for Actions {
    fn from(action: ActionKey) -> Self {
        Self(vec![action])
    }
}

impl From<&str> for Actions {
    fn from(action: &str) -> Self {
        Self(vec![ActionKey::from(action)])
    }
}

impl From<String> for Actions {
    fn from(action: String) -> Self {
        Self(vec![ActionKey::from(action)])
    }
}

impl From<Vec<ActionKey>> for Actions {
    fn from(actions: Vec<ActionKey>) -> Self {
        Self(actions)
    }
}

impl From<Vec<&str>> for Actions {
    fn from(actions: Vec<&str>) -> Self {
        Self(actions.into_iter().map(ActionKey::from).collect())
    }
}

impl From<&[&str]> for Actions {
    fn from(actions: &[&str]) -> Self {
        Self(actions.iter().copied().map(ActionKey::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Actions {
    fn from(actions: [&str; N]) -> Self {
        Self(actions.into_iter().map(ActionKey::from).collect())
    }
}

/// One or more subjects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subjects(Vec<SubjectKey>);

impl Subjects {
    pub fn into_vec(self) -> Vec<SubjectKey> {
        self.0
    }
}

impl From<SubjectKey> for Subjects {
    fn from(subject: SubjectKey) -> Self {
        Self(vec![subject])
    }
}

impl From<&str> for Subjects {
    fn from(subject: &str) -> Self {
        Self(vec![SubjectKey::from(subject)])
    }
}

impl From<String> for Subjects {
    fn from(subject: String) -> Self {
        Self(vec![SubjectKey::from(subject)])
    }
}

impl From<Vec<SubjectKey>> for Subjects {
    fn from(subjects: Vec<SubjectKey>) -> Self {
        Self(subjects)
    }
}

impl From<Vec<&str>> for Subjects {
    fn from(subjects: Vec<&str>) -> Self {
        Self(subjects.into_iter().map(SubjectKey::from).collect())
    }
}

impl<const N: usize> From<[SubjectKey; N]> for Subjects {
    fn from(subjects: [SubjectKey; N]) -> Self {
        Self(subjects.into())
    }
}

impl<const N: usize> From<[&str; N]> for Subjects {
    fn from(subjects: [&str; N]) -> Self {
        Self(subjects.into_iter().map(SubjectKey::from).collect())
    }
}

/// Conditions attached to a `can`/`cannot` call, combined with AND
///
/// - `when` applies to every query
/// - `when_instance` applies only when the queried subject is an instance and
///   passes for categories
/// - `when_category` applies only when the queried subject is a category and
///   passes for instances
pub struct ConditionSpec<U, S> {
    conditions: Vec<Condition<U, S>>,
}

impl<U: 'static, S: Subject + 'static> ConditionSpec<U, S> {
    /// No conditions
    pub fn new() -> Self {
        Self { conditions: Vec::new() }
    }

    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&U, &S, &EvalOptions) -> bool + Send + Sync + 'static,
    {
        self.with(Condition::new(predicate))
    }

    pub fn when_instance<F>(self, predicate: F) -> Self
    where
        F: Fn(&U, &S, &EvalOptions) -> bool + Send + Sync + 'static,
    {
        self.with(Condition::new(predicate).for_instances())
    }

    pub fn when_category<F>(self, predicate: F) -> Self
    where
        F: Fn(&U, &S, &EvalOptions) -> bool + Send + Sync + 'static,
    {
        self.with(Condition::new(predicate).for_categories())
    }

    /// Add a prebuilt condition, e.g. a fallible or labeled one
    pub fn with(mut self, condition: Condition<U, S>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn into_conditions(self) -> Vec<Condition<U, S>> {
        self.conditions
    }
}

impl<U: 'static, S: Subject + 'static> Default for ConditionSpec<U, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: 'static, S: Subject + 'static> From<Condition<U, S>> for ConditionSpec<U, S> {
    fn from(condition: Condition<U, S>) -> Self {
        Self::new().with(condition)
    }
}

/// A missing condition is the same as no condition
impl<U: 'static, S: Subject + 'static> From<Option<Condition<U, S>>> for ConditionSpec<U, S> {
    fn from(condition: Option<Condition<U, S>>) -> Self {
        condition.map(Self::from).unwrap_or_default()
    }
}

/// Rule builder scoped to a single role
///
/// Writes into a fresh index which the caller later merges into a
/// permissions definition.
pub struct RoleRules<U, S> {
    role: RoleId,
    index: RuleIndex<U, S>,
}

impl<U: 'static, S: Subject + 'static> RoleRules<U, S> {
    pub fn new(role: impl Into<RoleId>) -> Self {
        Self {
            role: role.into(),
            index: RuleIndex::new(),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Grant every action on every subject
    pub fn can_do_anything(&mut self) -> &mut Self {
        self.index
            .add_rule(&self.role, true, ActionKey::Any, SubjectKey::Any, Vec::new());
        self
    }

    /// Grant unconditionally
    pub fn can(&mut self, actions: impl Into<Actions>, subjects: impl Into<Subjects>) -> &mut Self {
        self.add(true, actions.into(), subjects.into(), ConditionSpec::new())
    }

    /// Grant when the conditions hold
    pub fn can_if(
        &mut self,
        actions: impl Into<Actions>,
        subjects: impl Into<Subjects>,
        conditions: impl Into<ConditionSpec<U, S>>,
    ) -> &mut Self {
        self.add(true, actions.into(), subjects.into(), conditions.into())
    }

    /// Deny unconditionally
    pub fn cannot(
        &mut self,
        actions: impl Into<Actions>,
        subjects: impl Into<Subjects>,
    ) -> &mut Self {
        self.add(false, actions.into(), subjects.into(), ConditionSpec::new())
    }

    /// Deny with conditions
    ///
    /// The presence of a denial vetoes its role for matching queries
    /// regardless of whether these conditions hold.
    pub fn cannot_if(
        &mut self,
        actions: impl Into<Actions>,
        subjects: impl Into<Subjects>,
        conditions: impl Into<ConditionSpec<U, S>>,
    ) -> &mut Self {
        self.add(false, actions.into(), subjects.into(), conditions.into())
    }

    pub fn into_index(self) -> RuleIndex<U, S> {
        self.index
    }

    fn add(
        &mut self,
        grants: bool,
        actions: Actions,
        subjects: Subjects,
        spec: ConditionSpec<U, S>,
    ) -> &mut Self {
        let conditions = spec.into_conditions();
        let subjects = subjects.into_vec();

        for action in actions.into_vec() {
            for subject in &subjects {
                self.index.add_rule(
                    &self.role,
                    grants,
                    action.clone(),
                    subject.clone(),
                    conditions.clone(),
                );
            }
        }
        self
    }
}
