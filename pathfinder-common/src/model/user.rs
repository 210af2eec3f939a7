use crate::model::{Id, credential::PasswordHash, lenient_seq, post::PostMarker, without_fields};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

/// Keys of a user document that never come from the opaque profile.
pub const RESERVED_USER_FIELDS: [&str; 4] = ["_id", "email", "password", "likedPosts"];

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// Email address identifying a user.
///
/// No format check is applied; the store's unique index is the only constraint.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id<UserMarker>,
    pub email: Email,
    #[serde(skip)]
    pub password_hash: Option<PasswordHash>,
    #[serde(rename = "likedPosts")]
    pub liked_posts: Vec<Id<PostMarker>>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    #[must_use]
    pub fn has_liked(&self, post_id: Id<PostMarker>) -> bool {
        self.liked_posts.contains(&post_id)
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CreateUser {
    pub email: Email,
    pub password_hash: Option<PasswordHash>,
    pub liked_posts: Vec<Id<PostMarker>>,
    pub profile: Map<String, Value>,
}

impl CreateUser {
    /// New account from the signup form, with nothing liked yet.
    #[must_use]
    pub fn signup(email: Email, password_hash: PasswordHash, profile: Map<String, Value>) -> Self {
        Self {
            email,
            password_hash: Some(password_hash),
            liked_posts: Vec::new(),
            profile: without_fields(profile, &RESERVED_USER_FIELDS),
        }
    }

    #[must_use]
    pub fn into_user(self, id: Id<UserMarker>) -> User {
        User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            liked_posts: self.liked_posts,
            profile: self.profile,
        }
    }
}

/// Body of `/user-signup` and `/user-signin`. Anything besides the credentials ends up in the
/// profile.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// Body of `/new-user`, stored as sent.
///
/// Entries of `likedPosts` that are not post ids can never match a post and are dropped.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct NewUser {
    pub email: Email,
    #[serde(rename = "likedPosts", default, deserialize_with = "lenient_seq")]
    pub liked_posts: Vec<Id<PostMarker>>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl From<NewUser> for CreateUser {
    fn from(value: NewUser) -> Self {
        Self {
            email: value.email,
            password_hash: None,
            liked_posts: value.liked_posts,
            profile: without_fields(value.profile, &RESERVED_USER_FIELDS),
        }
    }
}
