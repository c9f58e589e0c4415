//! CretoAI Permissions
//!
//! Role-based permission rules for an application's users.
//!
//! ## Features
//!
//! - **Rule Index**: per-role lookup by subject and action with wildcard precedence
//! - **Negation Veto**: a denial among a role's gathered rules empties that role's grants
//! - **Composition**: build a definition from other definitions, flattened or per role
//! - **Conditions**: runtime predicates over `(user, subject, options)`; failures never surface
//! - **Decisions**: boolean checks or serialisable decisions with reasons
//!
//! ## Example
//!
//! ```rust
//! use cretoai_permissions::{PermissionsBuilder, SubjectKey};
//!
//! struct User {
//!     roles: Vec<String>,
//! }
//!
//! let permissions = PermissionsBuilder::<User, SubjectKey>::new()
//!     .named("app")
//!     .role("member", |rules| {
//!         rules.can("create", "stuff");
//!     })
//!     .role("admin", |rules| {
//!         rules.can_do_anything();
//!     })
//!     .role_identifiers(|user: &User| user.roles.clone())
//!     .build();
//!
//! let member = permissions.authorizer(User { roles: vec!["member".to_string()] });
//! assert!(member.can("create", &SubjectKey::named("stuff")));
//! assert!(!member.can("show", &SubjectKey::named("stuff")));
//!
//! let decision = member.check("create", &SubjectKey::named("stuff"));
//! assert_eq!(decision.deciding_role(), Some("member"));
//! ```

pub mod authorizer;
pub mod config;
pub mod definition;
pub mod dsl;
pub mod error;
pub mod index;
pub mod metrics;
pub mod rule;
pub mod telemetry;
pub mod types;

pub use authorizer::{Authorizer, Decision, DecisionReason};
pub use config::{EvaluationSection, LoggingSection, PermissionsConfig, DEFAULT_UNSCOPED_ROLE};
pub use definition::{Permissions, PermissionsBuilder, PermissionsCell, RoleMembership};
pub use dsl::{Actions, ConditionSpec, RoleRules, Subjects};
pub use error::{PermissionsError, Result};
pub use index::{Resolution, RuleIndex, RuleSummary};
pub use metrics::{EvaluationMetrics, MetricsSnapshot};
pub use rule::{Condition, ConditionError, Rule};
pub use telemetry::init_logging;
pub use types::{ActionKey, EvalOptions, RoleId, Subject, SubjectKey, WILDCARD};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
