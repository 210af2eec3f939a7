use mongodb::bson::{Bson, Document, oid::ObjectId};
use pathfinder_common::model::{
    Id, ModelValidationError,
    credential::PasswordHash,
    post::{Comment, CreatePost, Post, PostMarker},
    user::{CreateUser, Email, User},
};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Database had invalid entry: field `{0}` was missing or had the wrong type")]
pub struct DbDataError(pub &'static str);

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Data(#[from] DbDataError),
    #[error("An object in the database was invalid: {0}")]
    Model(#[from] ModelValidationError),
    #[error("Value could not be stored as bson: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) struct UserRecord {
    pub id: ObjectId,
    pub email: String,
    pub password: Option<String>,
    pub liked_posts: Vec<Bson>,
    pub extra: Document,
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) struct PostRecord {
    pub id: ObjectId,
    pub comments: Vec<Bson>,
    pub reacts: i64,
    pub extra: Document,
}

impl TryFrom<Document> for UserRecord {
    type Error = DbDataError;

    fn try_from(mut value: Document) -> Result<Self, Self::Error> {
        let id = match value.remove("_id") {
            Some(Bson::ObjectId(id)) => id,
            _ => return Err(DbDataError("_id")),
        };
        let email = match value.remove("email") {
            Some(Bson::String(email)) => email,
            _ => return Err(DbDataError("email")),
        };
        let password = match value.remove("password") {
            Some(Bson::String(password)) => Some(password),
            None | Some(Bson::Null) => None,
            Some(_) => return Err(DbDataError("password")),
        };
        let liked_posts = match value.remove("likedPosts") {
            Some(Bson::Array(liked_posts)) => liked_posts,
            None | Some(Bson::Null) => Vec::new(),
            Some(_) => return Err(DbDataError("likedPosts")),
        };

        Ok(Self {
            id,
            email,
            password,
            liked_posts,
            extra: value,
        })
    }
}

impl TryFrom<Document> for PostRecord {
    type Error = DbDataError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(mut value: Document) -> Result<Self, Self::Error> {
        let id = match value.remove("_id") {
            Some(Bson::ObjectId(id)) => id,
            _ => return Err(DbDataError("_id")),
        };
        let comments = match value.remove("comments") {
            Some(Bson::Array(comments)) => comments,
            None | Some(Bson::Null) => Vec::new(),
            Some(_) => return Err(DbDataError("comments")),
        };
        let reacts = match value.remove("reacts") {
            Some(Bson::Int32(reacts)) => i64::from(reacts),
            Some(Bson::Int64(reacts)) => reacts,
            Some(Bson::Double(reacts)) if reacts.fract() == 0.0 => reacts as i64,
            None | Some(Bson::Null) => 0,
            Some(_) => return Err(DbDataError("reacts")),
        };

        Ok(Self {
            id,
            comments,
            reacts,
            extra: value,
        })
    }
}

impl UserRecord {
    pub fn from_create(id: ObjectId, user: &CreateUser) -> Result<Self, RecordError> {
        Ok(Self {
            id,
            email: user.email.get().to_owned(),
            password: user
                .password_hash
                .as_ref()
                .map(|hash| hash.as_str().to_owned()),
            liked_posts: user
                .liked_posts
                .iter()
                .map(|post_id| Bson::String(post_id.to_hex()))
                .collect(),
            extra: map_to_document(&user.profile)?,
        })
    }
}

impl PostRecord {
    pub fn from_create(id: ObjectId, post: &CreatePost) -> Result<Self, RecordError> {
        let comments = post
            .comments
            .iter()
            .map(|comment| value_to_bson(&comment.0))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            id,
            comments,
            reacts: i64::try_from(post.reacts).map_err(|_| DbDataError("reacts"))?,
            extra: map_to_document(&post.body)?,
        })
    }
}

impl From<UserRecord> for Document {
    fn from(value: UserRecord) -> Self {
        let mut document = Document::new();
        document.insert("_id", value.id);
        document.insert("email", value.email);
        if let Some(password) = value.password {
            document.insert("password", password);
        }
        document.insert("likedPosts", value.liked_posts);
        for (key, field) in value.extra {
            document.insert(key, field);
        }
        document
    }
}

impl From<PostRecord> for Document {
    fn from(value: PostRecord) -> Self {
        let mut document = Document::new();
        document.insert("_id", value.id);
        document.insert("comments", value.comments);
        document.insert("reacts", value.reacts);
        for (key, field) in value.extra {
            document.insert(key, field);
        }
        document
    }
}

impl From<UserRecord> for User {
    fn from(value: UserRecord) -> Self {
        let id = value.id;
        let liked_posts = value
            .liked_posts
            .into_iter()
            .filter_map(|liked| match post_id_from_bson(liked) {
                Ok(post_id) => Some(post_id),
                Err(err) => {
                    warn!(user_id = %id, error = %err, "Ignoring unreadable liked post");
                    None
                }
            })
            .collect();

        Self {
            id: id.into(),
            email: Email::new(value.email),
            password_hash: value.password.map(PasswordHash::from_phc),
            liked_posts,
            profile: document_to_map(value.extra),
        }
    }
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        let reacts = u64::try_from(value.reacts).unwrap_or_else(|_| {
            warn!(post_id = %value.id, reacts = value.reacts, "Reading negative reactions as 0");
            0
        });

        Self {
            id: value.id.into(),
            comments: value
                .comments
                .into_iter()
                .map(|comment| Comment(comment.into_relaxed_extjson()))
                .collect(),
            reacts,
            body: document_to_map(value.extra),
        }
    }
}

/// Decodes a listing, leaving out documents that are not posts at all.
pub(crate) fn posts_from_documents(documents: Vec<Document>) -> Vec<Post> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("_id").cloned();
            match PostRecord::try_from(document) {
                Ok(record) => Some(Post::from(record)),
                Err(err) => {
                    warn!(?id, error = %err, "Skipping unreadable post");
                    None
                }
            }
        })
        .collect()
}

fn post_id_from_bson(value: Bson) -> Result<Id<PostMarker>, RecordError> {
    match value {
        Bson::String(hex) => Ok(hex
            .parse::<Id<PostMarker>>()
            .map_err(ModelValidationError::from)?),
        Bson::ObjectId(id) => Ok(id.into()),
        _ => Err(DbDataError("likedPosts").into()),
    }
}

/// Opaque fields never carry their own `_id`; the record's id always wins.
pub(crate) fn map_to_document(map: &Map<String, Value>) -> Result<Document, RecordError> {
    let mut document = mongodb::bson::to_document(map)?;
    document.remove("_id");
    Ok(document)
}

/// Stores a client value as is, except for an `_id` on a nested document.
pub(crate) fn value_to_bson(value: &Value) -> Result<Bson, RecordError> {
    match mongodb::bson::to_bson(value)? {
        Bson::Document(mut document) => {
            document.remove("_id");
            Ok(Bson::Document(document))
        }
        bson => Ok(bson),
    }
}

pub(crate) fn document_to_map(document: Document) -> Map<String, Value> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
