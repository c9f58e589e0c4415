//! Core permission types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unique role identifier
pub type RoleId = String;

/// Literal used for "any action" / "any subject"
pub const WILDCARD: &str = "*";

/// Action a rule applies to, or the universal wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKey {
    /// Matches every action (`"*"`)
    Any,
    /// A concrete action (read, update, destroy, ...)
    Named(String),
}

impl ActionKey {
    /// Create an action key; `"*"` becomes [`ActionKey::Any`]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == WILDCARD {
            Self::Any
        } else {
            Self::Named(name)
        }
    }

    /// Whether this is the wildcard
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Action name, `"*"` for the wildcard
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => WILDCARD,
            Self::Named(name) => name,
        }
    }
}

impl From<&str> for ActionKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ActionKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&ActionKey> for ActionKey {
    fn from(key: &ActionKey) -> Self {
        key.clone()
    }
}

impl From<ActionKey> for String {
    fn from(key: ActionKey) -> Self {
        match key {
            ActionKey::Any => WILDCARD.to_string(),
            ActionKey::Named(name) => name,
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject a rule applies to
///
/// A subject is either a concrete value (a symbolic target such as
/// `"member_stuff"`, or an identifier of one specific record), a category of
/// subjects (a kind tag such as `"blog_post"` that every blog post instance
/// belongs to), or the universal wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TaggedSubjectKey", into = "TaggedSubjectKey")]
pub enum SubjectKey {
    /// Matches every subject (`"*"`)
    Any,
    /// A concrete subject value
    Named(String),
    /// A category of subjects
    Category(String),
}

/// Wire shape of [`SubjectKey`]; decoding goes through [`SubjectKey::named`]
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
enum TaggedSubjectKey {
    Any,
    Named(String),
    Category(String),
}

impl From<TaggedSubjectKey> for SubjectKey {
    fn from(tagged: TaggedSubjectKey) -> Self {
        match tagged {
            TaggedSubjectKey::Any => Self::Any,
            TaggedSubjectKey::Named(name) => Self::named(name),
            TaggedSubjectKey::Category(kind) => Self::Category(kind),
        }
    }
}

impl From<SubjectKey> for TaggedSubjectKey {
    fn from(key: SubjectKey) -> Self {
        match key {
            SubjectKey::Any => Self::Any,
            SubjectKey::Named(name) => Self::Named(name),
            SubjectKey::Category(kind) => Self::Category(kind),
        }
    }
}

impl SubjectKey {
    /// Concrete subject value; `"*"` becomes [`SubjectKey::Any`]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == WILDCARD {
            Self::Any
        } else {
            Self::Named(name)
        }
    }

    /// Category of subjects
    pub fn category(kind: impl Into<String>) -> Self {
        Self::Category(kind.into())
    }

    /// Whether this is the wildcard
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl From<&str> for SubjectKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for SubjectKey {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl From<&SubjectKey> for SubjectKey {
    fn from(key: &SubjectKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Named(name) => f.write_str(name),
            Self::Category(kind) => write!(f, "<{}>", kind),
        }
    }
}

/// Something an action can be performed on
///
/// Implemented by the host's subject type so the index can locate rules for
/// it and conditions can inspect it.
///
/// # Example
///
/// ```rust
/// use cretoai_permissions::{Subject, SubjectKey};
///
/// struct BlogPost {
///     id: u64,
///     user_id: u64,
/// }
///
/// enum Target {
///     Thing(&'static str),
///     BlogPosts,
///     BlogPost(BlogPost),
/// }
///
/// impl Subject for Target {
///     fn subject_key(&self) -> SubjectKey {
///         match self {
///             Target::Thing(name) => SubjectKey::named(*name),
///             Target::BlogPosts => SubjectKey::category("blog_post"),
///             Target::BlogPost(post) => SubjectKey::named(format!("blog_post#{}", post.id)),
///         }
///     }
///
///     fn category(&self) -> Option<SubjectKey> {
///         match self {
///             Target::BlogPost(_) => Some(SubjectKey::category("blog_post")),
///             _ => None,
///         }
///     }
/// }
///
/// assert!(Target::BlogPosts.is_category());
/// assert!(!Target::BlogPost(BlogPost { id: 1, user_id: 5 }).is_category());
/// ```
pub trait Subject {
    /// Key this subject is looked up by
    fn subject_key(&self) -> SubjectKey;

    /// Category this subject is an instance of, if any
    fn category(&self) -> Option<SubjectKey> {
        None
    }

    /// Whether the subject is a category rather than an instance
    fn is_category(&self) -> bool {
        matches!(self.subject_key(), SubjectKey::Category(_))
    }
}

impl Subject for SubjectKey {
    fn subject_key(&self) -> SubjectKey {
        self.clone()
    }
}

/// Options passed through to every condition at evaluation time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalOptions {
    values: HashMap<String, serde_json::Value>,
}

impl EvalOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Look up an option
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, serde_json::Value>> for EvalOptions {
    fn from(values: HashMap<String, serde_json::Value>) -> Self {
        Self { values }
    }
}
