//! Rule index
//!
//! Stores rules grouped by role and keeps a secondary lookup
//! `role -> subject -> action -> rules` for retrieval at decision time.
//!
//! # Lookup precedence
//!
//! For a query `(role, action, subject)` the index gathers, in order:
//!
//! 1. rules under the exact subject and exact action
//! 2. rules under the wildcard subject and wildcard action
//! 3. rules under the wildcard subject and exact action
//! 4. rules under the exact subject and wildcard action
//!
//! Every "exact subject" lookup also checks the subject's category, so a rule
//! written for a category is found for each of its instances.
//!
//! # Negation veto
//!
//! Within one role, the presence of any denial among the gathered rules
//! empties the whole result, whether or not the denial's own conditions
//! would hold.
//!
//! # Example
//!
//! ```rust
//! use cretoai_permissions::{RuleIndex, SubjectKey};
//!
//! struct User;
//!
//! let mut index: RuleIndex<User, SubjectKey> = RuleIndex::new();
//! index.add_rule("member", true, "create".into(), SubjectKey::named("stuff"), Vec::new());
//!
//! let rules = index.rules_for("member", &"create".into(), &SubjectKey::named("stuff"));
//! assert_eq!(rules.len(), 1);
//! assert!(index.rules_for("member", &"show".into(), &SubjectKey::named("stuff")).is_empty());
//! ```

use crate::rule::{Condition, Rule};
use crate::types::{ActionKey, RoleId, Subject, SubjectKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;


type ActionIndex<U, S> = HashMap<ActionKey, Vec<Arc<Rule<U, S>>>>;
type SubjectIndex<U, S> = HashMap<SubjectKey, ActionIndex<U, S>>;

/// Rules gathered for one role and one query
pub struct Resolution<U, S> {
    rules: Vec<Arc<Rule<U, S>>>,
    vetoed: bool,
}

impl<U, S> Resolution<U, S> {
    /// Whether a denial rule was among the gathered rules
    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }

    /// Gathered rules; empty when vetoed
    pub fn rules(&self) -> &[Arc<Rule<U, S>>] {
        if self.vetoed {
            &[]
        } else {
            &self.rules
        }
    }

    pub fn into_rules(self) -> Vec<Arc<Rule<U, S>>> {
        if self.vetoed {
            Vec::new()
        } else {
            self.rules
        }
    }
}

/// Serializable description of one indexed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub role: RoleId,
    pub grants: bool,
    pub action: ActionKey,
    pub subject: SubjectKey,
    pub conditions: usize,
}

/// Index of permission rules by role, subject and action
///
/// Mutated only while permissions are being defined (`add_rule`, `merge`,
/// `copy_into`); read-only afterwards.
pub struct RuleIndex<U, S> {
    /// Authoritative rule list per role, in insertion order
    rules_by_role: BTreeMap<RoleId, Vec<Arc<Rule<U, S>>>>,

    /// Derived lookup `role -> subject -> action -> rules`
    lookup: HashMap<RoleId, SubjectIndex<U, S>>,
}

impl<U, S> RuleIndex<U, S> {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            rules_by_role: BTreeMap::new(),
            lookup: HashMap::new(),
        }
    }

    /// Roles that have at least one rule
    pub fn roles(&self) -> impl Iterator<Item = &RoleId> {
        self.rules_by_role.keys()
    }

    /// Rules of a role in insertion order
    pub fn rules(&self, role: &str) -> &[Arc<Rule<U, S>>] {
        self.rules_by_role.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of rules across all roles
    pub fn len(&self) -> usize {
        self.rules_by_role.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules_by_role.is_empty()
    }

    pub fn role_count(&self) -> usize {
        self.rules_by_role.len()
    }

    /// Describe every rule, grouped by role
    pub fn summary(&self) -> Vec<RuleSummary> {
        self.rules_by_role
            .iter()
            .flat_map(|(role, rules)| {
                rules.iter().map(move |rule| RuleSummary {
                    role: role.clone(),
                    grants: rule.grants(),
                    action: rule.action().clone(),
                    subject: rule.subject().clone(),
                    conditions: rule.conditions().len(),
                })
            })
            .collect()
    }

    /// Append every rule of `other` under the same roles
    ///
    /// Merging the same index twice duplicates its rules.
    pub fn merge(&mut self, other: &RuleIndex<U, S>) -> &mut Self {
        for (role, rules) in &other.rules_by_role {
            for rule in rules {
                self.insert(role, Arc::clone(rule));
            }
        }
        self
    }

    /// Append every rule of `other`, from all of its roles, under `role`
    pub fn copy_into(&mut self, role: &str, other: &RuleIndex<U, S>) -> &mut Self {
        for rule in other.rules_by_role.values().flatten() {
            self.insert(role, Arc::clone(rule));
        }
        self
    }

    fn insert(&mut self, role: &str, rule: Arc<Rule<U, S>>) {
        self.lookup
            .entry(role.to_string())
            .or_default()
            .entry(rule.subject().clone())
            .or_default()
            .entry(rule.action().clone())
            .or_default()
            .push(Arc::clone(&rule));

        self.rules_by_role.entry(role.to_string()).or_default().push(rule);
    }

    fn collect_into(
        &self,
        out: &mut Vec<Arc<Rule<U, S>>>,
        role: &str,
        action: &ActionKey,
        subject: &SubjectKey,
        category: Option<&SubjectKey>,
    ) {
        let Some(subjects) = self.lookup.get(role) else {
            return;
        };

        let mut collect = |key: &SubjectKey| {
            if let Some(rules) = subjects.get(key).and_then(|actions| actions.get(action)) {
                out.extend(rules.iter().cloned());
            }
        };

        collect(subject);
        if !subject.is_any() {
            if let Some(category) = category {
                collect(category);
            }
        }
    }
}

impl<U, S: Subject> RuleIndex<U, S> {
    /// Add a rule to a role
    pub fn add_rule(
        &mut self,
        role: &str,
        grants: bool,
        action: ActionKey,
        subject: SubjectKey,
        conditions: Vec<Condition<U, S>>,
    ) -> &mut Self {
        self.insert(role, Arc::new(Rule::new(grants, action, subject, conditions)));
        self
    }

    /// Gather the rules of `role` relevant to `(action, subject)`
    ///
    /// Conditions are not evaluated here.
    pub fn resolve(&self, role: &str, action: &ActionKey, subject: &S) -> Resolution<U, S> {
        let key = subject.subject_key();
        let category = subject.category();
        let mut rules = Vec::new();

        self.collect_into(&mut rules, role, action, &key, category.as_ref());
        self.collect_into(&mut rules, role, &ActionKey::Any, &SubjectKey::Any, None);
        self.collect_into(&mut rules, role, action, &SubjectKey::Any, None);
        self.collect_into(&mut rules, role, &ActionKey::Any, &key, category.as_ref());

        let vetoed = rules.iter().any(|rule| !rule.grants());
        if vetoed {
            debug!(role, action = %action, subject = %key, "denial rule vetoes role");
        }

        Resolution { rules, vetoed }
    }

    /// Rules of `role` relevant to `(action, subject)`, empty if any is a denial
    pub fn rules_for(&self, role: &str, action: &ActionKey, subject: &S) -> Vec<Arc<Rule<U, S>>> {
        self.resolve(role, action, subject).into_rules()
    }
}

impl<U, S> Default for RuleIndex<U, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U, S> Clone for RuleIndex<U, S> {
    fn clone(&self) -> Self {
        Self {
            rules_by_role: self.rules_by_role.clone(),
            lookup: self.lookup.clone(),
        }
    }
}

impl<U, S> fmt::Debug for RuleIndex<U, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.rules_by_role.iter()).finish()
    }
}
