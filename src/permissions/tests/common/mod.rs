//! Shared fixtures for integration tests
//!
//! A small blog domain: users holding roles, blog posts owned by users, and a
//! handful of symbolic targets. The definitions mirror a typical application
//! where each role's permissions live in their own definition and the
//! application assembles them per role.

#![allow(dead_code)]

use cretoai_permissions::{
    Condition, ConditionSpec, EvalOptions, Permissions, PermissionsBuilder, RoleId, RoleMembership,
    Subject, SubjectKey,
};

pub const BLOG_POST: &str = "blog_post";

#[derive(Debug, Clone, Default)]
pub struct TestUser {
    pub id: u64,
    pub role_identifiers: Vec<RoleId>,
}

impl TestUser {
    pub fn new(id: u64, roles: &[&str]) -> Self {
        Self {
            id,
            role_identifiers: roles.iter().map(|role| role.to_string()).collect(),
        }
    }
}

impl RoleMembership for TestUser {
    fn role_identifiers(&self) -> Vec<RoleId> {
        self.role_identifiers.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlogPost {
    pub id: u64,
    pub user_id: u64,
}

/// Query-time subject
#[derive(Debug, Clone)]
pub enum Target {
    /// A symbolic target such as `member_stuff`
    Thing(String),
    /// The blog post category itself
    BlogPosts,
    /// One blog post
    BlogPost(BlogPost),
}

impl Target {
    pub fn thing(name: &str) -> Self {
        Target::Thing(name.to_string())
    }

    pub fn post(id: u64, user_id: u64) -> Self {
        Target::BlogPost(BlogPost { id, user_id })
    }

    pub fn as_post(&self) -> Option<&BlogPost> {
        match self {
            Target::BlogPost(post) => Some(post),
            _ => None,
        }
    }

    /// The category or one of its instances
    pub fn is_blog_post(&self) -> bool {
        matches!(self, Target::BlogPosts | Target::BlogPost(_))
    }
}

impl Subject for Target {
    fn subject_key(&self) -> SubjectKey {
        match self {
            Target::Thing(name) => SubjectKey::named(name.as_str()),
            Target::BlogPosts => SubjectKey::category(BLOG_POST),
            Target::BlogPost(post) => SubjectKey::named(format!("{}#{}", BLOG_POST, post.id)),
        }
    }

    fn category(&self) -> Option<SubjectKey> {
        match self {
            Target::BlogPost(_) => Some(SubjectKey::category(BLOG_POST)),
            _ => None,
        }
    }
}

pub type AppPermissions = Permissions<TestUser, Target>;

fn builder(name: &str) -> PermissionsBuilder<TestUser, Target> {
    PermissionsBuilder::new().named(name)
}

fn blog_posts() -> SubjectKey {
    SubjectKey::category(BLOG_POST)
}

fn post_five(_: &TestUser, target: &Target, _: &EvalOptions) -> bool {
    target.as_post().map_or(false, |post| post.id == 5)
}

pub fn member_permissions() -> AppPermissions {
    builder("member")
        .rules(|rules| {
            rules.can("create", "member_stuff");

            rules.can("create", blog_posts());
            rules.can("destroy", blog_posts());

            rules.can_if(
                "update",
                blog_posts(),
                ConditionSpec::new().when(|user: &TestUser, target: &Target, _: &EvalOptions| {
                    target.as_post().map_or(false, |post| post.user_id == user.id)
                }),
            );
        })
        .build()
}

pub fn dude_permissions() -> AppPermissions {
    builder("dude")
        .rules(|rules| {
            rules.can("create", "dude_stuff");
        })
        .build()
}

pub fn special_member_permissions() -> AppPermissions {
    builder("special_member")
        .inherit(&member_permissions())
        .rules(|rules| {
            rules.can("locate", blog_posts());
            rules.cannot("create", "member_stuff");
        })
        .build()
}

pub fn admin_permissions() -> AppPermissions {
    builder("admin")
        .rules(|rules| {
            rules.can("*", "*");
        })
        .build()
}

pub fn special_admin_permissions() -> AppPermissions {
    builder("special_admin")
        .inherit(&admin_permissions())
        .rules(|rules| {
            rules.cannot("create", "wodget");
        })
        .build()
}

pub fn cooker_permissions() -> AppPermissions {
    builder("cooker")
        .rules(|rules| {
            rules.can("cook", "*");

            rules.can_if(
                "badly_cook",
                "*",
                ConditionSpec::new().when(|_: &TestUser, target: &Target, _: &EvalOptions| {
                    target.is_blog_post()
                }),
            );
        })
        .build()
}

pub fn cleaner_permissions() -> AppPermissions {
    builder("cleaner")
        .rules(|rules| {
            rules.can("*", "wodget");

            rules.can_if("*", blog_posts(), ConditionSpec::new().when(post_five));

            rules.can_if("*", "with_if_style", ConditionSpec::new().when(post_five));
            rules.can_if("*", "with_block", Condition::new(post_five).labeled("post five"));
        })
        .build()
}

/// Application definition assembling every role
pub fn test_user_permissions() -> AppPermissions {
    builder("test_user")
        .role_from("member", &member_permissions())
        .role_from("dude", &dude_permissions())
        .role_from("special_member", &special_member_permissions())
        .role_from("admin", &admin_permissions())
        .role_from("special_admin", &special_admin_permissions())
        .role_from("cooker", &cooker_permissions())
        .role_from("cleaner", &cleaner_permissions())
        .with_role_membership()
        .build()
}
