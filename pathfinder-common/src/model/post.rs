use crate::model::{Id, lenient, lenient_seq, user::Email, without_fields};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Id<PostMarker>,
    pub comments: Vec<Comment>,
    pub reacts: u64,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// Body of `/create-post`. Author and content fields are kept as they come in.
///
/// `comments` that is not an array starts out empty, and a `reacts` that is not a
/// non-negative integer starts out at zero.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
pub struct CreatePost {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub comments: Vec<Comment>,
    #[serde(default, deserialize_with = "lenient")]
    pub reacts: u64,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl CreatePost {
    #[must_use]
    pub fn into_post(self, id: Id<PostMarker>) -> Post {
        Post {
            id,
            comments: self.comments,
            reacts: self.reacts,
            body: without_fields(self.body, &["_id"]),
        }
    }
}

/// Body of `/calculate-reactions`.
///
/// `reacts` is the count the caller last saw. The stored count is what gets adjusted, so this
/// value is only compared against it.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct ToggleReaction {
    pub email: Email,
    #[serde(rename = "postId")]
    pub post_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub reacts: i64,
}

/// Comment as sent by the client, stored without looking inside.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Comment(pub Value);

/// Direction of a reaction toggle.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Reaction {
    Like,
    Unlike,
}

impl Reaction {
    /// Count the post should end up with, given the count before the toggle.
    #[must_use]
    pub fn apply(self, reacts: u64) -> Option<u64> {
        match self {
            Reaction::Like => reacts.checked_add(1),
            Reaction::Unlike => reacts.checked_sub(1),
        }
    }
}
