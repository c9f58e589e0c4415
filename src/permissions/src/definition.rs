//! Permission definitions and their composition
//!
//! A definition is assembled once with [`PermissionsBuilder`] and frozen
//! into an immutable [`Permissions`] value that is shared (read-only) by
//! every [`Authorizer`] created from it.
//!
//! # Composition
//!
//! - `inherit(&other)` copies every rule of `other`, from all of its roles,
//!   into the unscoped placeholder role
//! - `role_from(role, &other)` does the same into `role`
//! - `role(role, |rules| ...)` evaluates a rule block scoped to `role`
//!
//! # Example
//!
//! ```rust
//! use cretoai_permissions::{PermissionsBuilder, SubjectKey};
//!
//! struct User {
//!     roles: Vec<String>,
//! }
//!
//! let member = PermissionsBuilder::<User, SubjectKey>::new()
//!     .rules(|rules| {
//!         rules.can("create", "stuff");
//!     })
//!     .build();
//!
//! let special_member = PermissionsBuilder::new()
//!     .inherit(&member)
//!     .rules(|rules| {
//!         rules.cannot("create", "stuff");
//!     })
//!     .build();
//!
//! let app = PermissionsBuilder::new()
//!     .role_from("member", &member)
//!     .role_from("special_member", &special_member)
//!     .role_identifiers(|user: &User| user.roles.clone())
//!     .build();
//!
//! let user = User { roles: vec!["special_member".to_string()] };
//! assert!(!app.authorizer(user).can("create", &SubjectKey::named("stuff")));
//! ```

use crate::authorizer::Authorizer;
use crate::config::{EvaluationSection, DEFAULT_UNSCOPED_ROLE};
use crate::dsl::RoleRules;
use crate::error::{PermissionsError, Result};
use crate::index::RuleIndex;
use crate::metrics::{EvaluationMetrics, MetricsSnapshot};
use crate::types::{RoleId, Subject};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

type RoleSupplier<U> = dyn Fn(&U) -> Vec<RoleId> + Send + Sync;

/// Role membership of a user
///
/// The default implementation holds no roles.
pub trait RoleMembership {
    fn role_identifiers(&self) -> Vec<RoleId> {
        Vec::new()
    }
}

/// Accumulates rules for one permissions definition
pub struct PermissionsBuilder<U, S> {
    name: Option<String>,
    index: RuleIndex<U, S>,
    unscoped_role: RoleId,
    role_supplier: Option<Arc<RoleSupplier<U>>>,
    enable_metrics: bool,
}

impl<U: 'static, S: Subject + 'static> PermissionsBuilder<U, S> {
    /// Create an empty builder with default settings
    pub fn new() -> Self {
        Self {
            name: None,
            index: RuleIndex::new(),
            unscoped_role: DEFAULT_UNSCOPED_ROLE.to_string(),
            role_supplier: None,
            enable_metrics: true,
        }
    }

    /// Create an empty builder from the evaluation configuration
    pub fn with_config(config: &EvaluationSection) -> Self {
        Self {
            unscoped_role: config.unscoped_role.clone(),
            enable_metrics: config.enable_metrics,
            ..Self::new()
        }
    }

    /// Name used in logs
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Take over every rule of `source`, flattened into the unscoped role
    pub fn inherit(mut self, source: &Permissions<U, S>) -> Self {
        let role = self.unscoped_role.clone();
        self.copy_template(&role, source);
        self
    }

    /// Define the permissions of a role
    ///
    /// With a template, every rule of the template (from all of its roles) is
    /// copied into the role. With a block, the block's rules are built in a
    /// fresh index scoped to the role and merged in. Both may be given. A
    /// missing role means the unscoped placeholder role.
    pub fn define_role_permissions<F>(
        mut self,
        role: Option<&str>,
        template: Option<&Permissions<U, S>>,
        block: Option<F>,
    ) -> Self
    where
        F: FnOnce(&mut RoleRules<U, S>),
    {
        let role = role.map(str::to_string).unwrap_or_else(|| self.unscoped_role.clone());

        if let Some(template) = template {
            self.copy_template(&role, template);
        }

        if let Some(block) = block {
            let mut rules = RoleRules::new(role.clone());
            block(&mut rules);
            let built = rules.into_index();
            debug!(role = %role, rules = built.len(), "merging role block");
            self.index.merge(&built);
        }

        self
    }

    /// Define a role from a rule block
    pub fn role<F>(self, role: &str, block: F) -> Self
    where
        F: FnOnce(&mut RoleRules<U, S>),
    {
        self.define_role_permissions(Some(role), None, Some(block))
    }

    /// Define a role as a copy of another definition
    pub fn role_from(self, role: &str, template: &Permissions<U, S>) -> Self {
        self.define_role_permissions(Some(role), Some(template), None::<fn(&mut RoleRules<U, S>)>)
    }

    /// Add rules to the unscoped placeholder role
    pub fn rules<F>(self, block: F) -> Self
    where
        F: FnOnce(&mut RoleRules<U, S>),
    {
        self.define_role_permissions(None, None, Some(block))
    }

    /// Supply the roles a user holds; without this a user holds none
    pub fn role_identifiers<F>(mut self, supplier: F) -> Self
    where
        F: Fn(&U) -> Vec<RoleId> + Send + Sync + 'static,
    {
        self.role_supplier = Some(Arc::new(supplier));
        self
    }

    /// Freeze the accumulated rules
    pub fn build(self) -> Permissions<U, S> {
        let name = self.name.unwrap_or_else(|| "anonymous".to_string());
        info!(
            permissions = %name,
            roles = self.index.role_count(),
            rules = self.index.len(),
            "permissions defined"
        );

        Permissions {
            inner: Arc::new(PermissionsInner {
                name,
                index: self.index,
                unscoped_role: self.unscoped_role,
                role_supplier: self.role_supplier,
                metrics: self.enable_metrics.then(EvaluationMetrics::new),
            }),
        }
    }

    fn copy_template(&mut self, role: &str, template: &Permissions<U, S>) {
        let mut copied = RuleIndex::new();
        copied.copy_into(role, template.index());
        debug!(
            role,
            source = %template.name(),
            rules = copied.len(),
            "copying permissions into role"
        );
        self.index.merge(&copied);
    }
}

impl<U: RoleMembership + 'static, S: Subject + 'static> PermissionsBuilder<U, S> {
    /// Take role identifiers from the user's `RoleMembership`
    pub fn with_role_membership(self) -> Self {
        self.role_identifiers(|user: &U| user.role_identifiers())
    }
}

impl<U: 'static, S: Subject + 'static> Default for PermissionsBuilder<U, S> {
    fn default() -> Self {
        Self::new()
    }
}

struct PermissionsInner<U, S> {
    name: String,
    index: RuleIndex<U, S>,
    unscoped_role: RoleId,
    role_supplier: Option<Arc<RoleSupplier<U>>>,
    metrics: Option<EvaluationMetrics>,
}

/// Immutable permissions definition
///
/// Cheap to clone; clones share the same index.
pub struct Permissions<U, S> {
    inner: Arc<PermissionsInner<U, S>>,
}

impl<U, S> Permissions<U, S> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn index(&self) -> &RuleIndex<U, S> {
        &self.inner.index
    }

    /// Placeholder role used for inherited and unscoped rules
    pub fn unscoped_role(&self) -> &str {
        &self.inner.unscoped_role
    }

    /// Roles held by `user`, in evaluation order
    pub fn role_identifiers(&self, user: &U) -> Vec<RoleId> {
        self.inner
            .role_supplier
            .as_ref()
            .map(|supplier| (**supplier)(user))
            .unwrap_or_default()
    }

    pub(crate) fn metrics_collector(&self) -> Option<&EvaluationMetrics> {
        self.inner.metrics.as_ref()
    }

    /// Decision counters, when enabled
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.inner.metrics.as_ref().map(EvaluationMetrics::snapshot)
    }

    /// Bind a user for permission checks
    pub fn authorizer(&self, user: U) -> Authorizer<U, S> {
        Authorizer::new(self.clone(), user)
    }
}

impl<U, S> Clone for Permissions<U, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U, S> fmt::Debug for Permissions<U, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permissions")
            .field("name", &self.inner.name)
            .field("index", &self.inner.index)
            .field("metrics", &self.inner.metrics)
            .finish()
    }
}

/// Lazily built, process-wide permissions definition
///
/// The first `get_or_init` runs the builder; concurrent callers block until
/// it finishes and then all observe the same fully built definition.
///
/// ```rust
/// use cretoai_permissions::{PermissionsBuilder, PermissionsCell, SubjectKey};
///
/// struct User;
///
/// static ADMIN: PermissionsCell<User, SubjectKey> = PermissionsCell::new();
///
/// let admin = ADMIN.get_or_init(|| {
///     PermissionsBuilder::new().rules(|rules| { rules.can_do_anything(); }).build()
/// });
/// assert_eq!(admin.index().len(), 1);
/// ```
pub struct PermissionsCell<U, S> {
    cell: OnceCell<Permissions<U, S>>,
}

impl<U, S> PermissionsCell<U, S> {
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Definition, building it on first access
    pub fn get_or_init<F>(&self, build: F) -> &Permissions<U, S>
    where
        F: FnOnce() -> Permissions<U, S>,
    {
        self.cell.get_or_init(build)
    }

    /// Definition, if already built
    pub fn get(&self) -> Option<&Permissions<U, S>> {
        self.cell.get()
    }

    /// Store a definition built elsewhere
    pub fn set(&self, permissions: Permissions<U, S>) -> Result<()> {
        self.cell
            .set(permissions)
            .map_err(|_| PermissionsError::AlreadyInitialized)
    }
}

impl<U, S> Default for PermissionsCell<U, S> {
    fn default() -> Self {
        Self::new()
    }
}
