//! In-process [`Store`] for tests and local development.
//!
//! Holds fully converted models instead of documents, but keeps the same constraints as the
//! MongoDB store: unique emails, conditional like/unlike and a reaction count that never drops
//! below zero.

use crate::client::{DbError, Result, Store};
use async_trait::async_trait;
use pathfinder_common::model::{
    Id,
    post::{Comment, CreatePost, Post, PostMarker, Reaction},
    user::{CreateUser, Email, User, UserMarker},
};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    posts: Vec<Post>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a post as is, keeping its id and counters.
    pub async fn insert_post(&self, post: Post) {
        self.state.lock().await.posts.push(post);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_user_by_email(&self, email: &Email) -> Result<Option<User>> {
        let state = self.state.lock().await;

        Ok(state.users.iter().find(|user| &user.email == email).cloned())
    }

    async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let mut state = self.state.lock().await;

        if state.users.iter().any(|existing| existing.email == user.email) {
            return Err(DbError::DuplicateEmail(user.email.clone()));
        }

        let id = Id::generate();
        state.users.push(user.clone().into_user(id));

        Ok(id)
    }

    async fn set_liked(
        &self,
        email: &Email,
        post_id: Id<PostMarker>,
        reaction: Reaction,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.iter_mut().find(|user| &user.email == email) else {
            return Ok(false);
        };

        let modified = match reaction {
            Reaction::Like if !user.has_liked(post_id) => {
                user.liked_posts.push(post_id);
                true
            }
            Reaction::Unlike if user.has_liked(post_id) => {
                user.liked_posts.retain(|liked| *liked != post_id);
                true
            }
            Reaction::Like | Reaction::Unlike => false,
        };
        debug!(%email, %post_id, ?reaction, modified, "Updated liked posts");

        Ok(modified)
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        Ok(self.state.lock().await.posts.clone())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.state.lock().await;

        Ok(state.posts.iter().find(|post| post.id == post_id).cloned())
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let id = Id::generate();
        self.state
            .lock()
            .await
            .posts
            .push(post.clone().into_post(id));

        Ok(id)
    }

    async fn push_comment(&self, post_id: Id<PostMarker>, comment: &Comment) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(post) = state.posts.iter_mut().find(|post| post.id == post_id) else {
            return Ok(false);
        };

        post.comments.push(comment.clone());

        Ok(true)
    }

    async fn adjust_reacts(&self, post_id: Id<PostMarker>, reaction: Reaction) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(post) = state.posts.iter_mut().find(|post| post.id == post_id) else {
            return Ok(false);
        };

        match reaction.apply(post.reacts) {
            Some(reacts) => {
                post.reacts = reacts;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::{DbError, Store},
        memory::MemoryStore,
    };
    use pathfinder_common::model::{
        Id,
        post::{Comment, CreatePost, Reaction},
        user::{CreateUser, Email},
    };
    use serde_json::{Map, json};

    fn create_user(email: &str) -> CreateUser {
        CreateUser {
            email: Email::new(email),
            password_hash: None,
            liked_posts: Vec::new(),
            profile: Map::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryStore::new();

        let id = store.create_user(&create_user("a@x.com")).await.unwrap();
        let error = store.create_user(&create_user("a@x.com")).await.unwrap_err();

        assert!(matches!(error, DbError::DuplicateEmail(email) if email.get() == "a@x.com"));

        let user = store
            .fetch_user_by_email(&Email::new("a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn like_is_conditional() {
        let store = MemoryStore::new();
        let email = Email::new("a@x.com");
        let post_id = Id::generate();
        store.create_user(&create_user("a@x.com")).await.unwrap();

        assert!(!store.set_liked(&email, post_id, Reaction::Unlike).await.unwrap());
        assert!(store.set_liked(&email, post_id, Reaction::Like).await.unwrap());
        assert!(!store.set_liked(&email, post_id, Reaction::Like).await.unwrap());

        let user = store.fetch_user_by_email(&email).await.unwrap().unwrap();
        assert_eq!(user.liked_posts, vec![post_id]);

        assert!(store.set_liked(&email, post_id, Reaction::Unlike).await.unwrap());
        let user = store.fetch_user_by_email(&email).await.unwrap().unwrap();
        assert!(user.liked_posts.is_empty());
    }

    #[tokio::test]
    async fn reacts_never_negative() {
        let store = MemoryStore::new();
        let post_id = store.create_post(&CreatePost::default()).await.unwrap();

        assert!(!store.adjust_reacts(post_id, Reaction::Unlike).await.unwrap());
        assert!(store.adjust_reacts(post_id, Reaction::Like).await.unwrap());

        let post = store.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.reacts, 1);
    }

    #[tokio::test]
    async fn comment_on_missing_post() {
        let store = MemoryStore::new();
        let comment = Comment(json!({ "text": "hi" }));

        assert!(!store.push_comment(Id::generate(), &comment).await.unwrap());
    }
}
