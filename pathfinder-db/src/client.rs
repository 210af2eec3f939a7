use crate::record::{
    DbDataError, PostRecord, RecordError, UserRecord, posts_from_documents, value_to_bson,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, IndexModel,
    bson::{Document, doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
};
use pathfinder_common::model::{
    Id,
    post::{Comment, CreatePost, Post, PostMarker, Reaction},
    user::{CreateUser, Email, User, UserMarker},
};
use thiserror::Error;
use tracing::{debug, info};

pub const USERS_COLLECTION: &str = "users";
pub const POSTS_COLLECTION: &str = "posts";

const DUPLICATE_KEY_CODE: i32 = 11000;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("A user with email {0} already exists")]
    DuplicateEmail(Email),
    #[error("Insert was not acknowledged with the generated id")]
    MissingInsertedId,
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

impl From<DbDataError> for DbError {
    fn from(value: DbDataError) -> Self {
        Self::Record(value.into())
    }
}

/// The document store behind every handler.
///
/// Update methods return whether a document was actually modified. A `false` is the store
/// telling the caller that nothing matched, which handlers report the same way as a failed
/// write.
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_user_by_email(&self, email: &Email) -> Result<Option<User>>;

    /// Fails with [`DbError::DuplicateEmail`] if the email is already taken.
    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>>;

    /// Adds or removes `post_id` from the user's liked posts. Only modifies the user if the
    /// membership is not already in the requested state.
    async fn set_liked(
        &self,
        email: &Email,
        post_id: Id<PostMarker>,
        reaction: Reaction,
    ) -> Result<bool>;

    async fn fetch_posts(&self) -> Result<Vec<Post>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>>;

    async fn push_comment(&self, post_id: Id<PostMarker>, comment: &Comment) -> Result<bool>;

    /// Moves the post's reaction count by one. Never takes the count below zero.
    async fn adjust_reacts(&self, post_id: Id<PostMarker>, reaction: Reaction) -> Result<bool>;

    async fn close(&self) {}
}

pub struct MongoStore {
    client: Client,
    users: Collection<Document>,
    posts: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let mut client_options = ClientOptions::parse(uri).await?;
        let server_api = ServerApi::builder()
            .version(ServerApiVersion::V1)
            .strict(true)
            .deprecation_errors(true)
            .build();
        client_options.server_api = Some(server_api);

        let client = Client::with_options(client_options)?;
        Self::with_client(client, database).await
    }

    pub async fn with_client(client: Client, database: &str) -> Result<Self> {
        let database = client.database(database);
        let store = Self {
            users: database.collection(USERS_COLLECTION),
            posts: database.collection(POSTS_COLLECTION),
            client,
        };

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        store.users.create_index(email_index).await?;
        info!(database = %database.name(), "Connected to MongoDB");

        Ok(store)
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

fn confirm_inserted(inserted_id: &mongodb::bson::Bson, expected: ObjectId) -> Result<()> {
    match inserted_id.as_object_id() {
        Some(inserted_id) if inserted_id == expected => Ok(()),
        _ => Err(DbError::MissingInsertedId),
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn fetch_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        let document = self.users.find_one(doc! { "email": email.get() }).await?;

        let user = document.map(UserRecord::try_from).transpose()?.map(User::from);
        Ok(user)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let id = ObjectId::new();
        let record = UserRecord::from_create(id, user)?;

        let result = match self.users.insert_one(Document::from(record)).await {
            Ok(result) => result,
            Err(err) if is_duplicate_key(&err) => {
                return Err(DbError::DuplicateEmail(user.email.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        confirm_inserted(&result.inserted_id, id)?;

        Ok(id.into())
    }

    async fn set_liked(
        &self,
        email: &Email,
        post_id: Id<PostMarker>,
        reaction: Reaction,
    ) -> Result<bool> {
        let post_id = post_id.to_hex();
        let (filter, update) = match reaction {
            Reaction::Like => (
                doc! { "email": email.get(), "likedPosts": { "$ne": post_id.as_str() } },
                doc! { "$addToSet": { "likedPosts": post_id.as_str() } },
            ),
            Reaction::Unlike => (
                doc! { "email": email.get(), "likedPosts": post_id.as_str() },
                doc! { "$pull": { "likedPosts": post_id.as_str() } },
            ),
        };

        let result = self.users.update_one(filter, update).await?;
        debug!(
            matched = result.matched_count,
            modified = result.modified_count,
            "Updated liked posts"
        );

        Ok(result.modified_count > 0)
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let documents: Vec<Document> = self.posts.find(doc! {}).await?.try_collect().await?;

        Ok(posts_from_documents(documents))
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let document = self
            .posts
            .find_one(doc! { "_id": post_id.object_id() })
            .await?;

        let post = document.map(PostRecord::try_from).transpose()?.map(Post::from);
        Ok(post)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let id = ObjectId::new();
        let record = PostRecord::from_create(id, post)?;

        let result = self.posts.insert_one(Document::from(record)).await?;
        confirm_inserted(&result.inserted_id, id)?;

        Ok(id.into())
    }

    async fn push_comment(&self, post_id: Id<PostMarker>, comment: &Comment) -> Result<bool> {
        let comment = value_to_bson(&comment.0)?;

        let result = self
            .posts
            .update_one(
                doc! { "_id": post_id.object_id() },
                doc! { "$push": { "comments": comment } },
            )
            .await?;

        Ok(result.modified_count > 0)
    }

    async fn adjust_reacts(&self, post_id: Id<PostMarker>, reaction: Reaction) -> Result<bool> {
        let (filter, update) = match reaction {
            Reaction::Like => (
                doc! { "_id": post_id.object_id() },
                doc! { "$inc": { "reacts": 1 } },
            ),
            Reaction::Unlike => (
                doc! { "_id": post_id.object_id(), "reacts": { "$gt": 0 } },
                doc! { "$inc": { "reacts": -1 } },
            ),
        };

        let result = self.posts.update_one(filter, update).await?;

        Ok(result.modified_count > 0)
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB client shut down");
    }
}
