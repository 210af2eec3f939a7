use crate::service::{HandlerError, Result};
use pathfinder_common::model::{
    credential::{hash_password, verify_password},
    user::{CreateUser, Credentials, Email, NewUser, User},
};
use pathfinder_db::client::{DbError, Store};
use tokio::task::spawn_blocking;
use tracing::{debug, info};

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Upserted {
    Created(User),
    Existing(User),
}

pub async fn signup(store: &dyn Store, credentials: Credentials) -> Result<User> {
    let Credentials {
        email,
        password,
        profile,
    } = credentials;

    if store.fetch_user_by_email(&email).await?.is_some() {
        return Err(HandlerError::AlreadyExists(email));
    }

    let password_hash = spawn_blocking(move || hash_password(&password)).await??;
    let user = CreateUser::signup(email, password_hash, profile);

    let id = store.create_user(&user).await.map_err(already_exists)?;
    info!(email = %user.email, %id, "Registered user");

    Ok(user.into_user(id))
}

pub async fn signin(store: &dyn Store, email: Email, password: String) -> Result<User> {
    let user = store
        .fetch_user_by_email(&email)
        .await?
        .ok_or_else(|| HandlerError::NotFound(email.clone()))?;

    let Some(password_hash) = user.password_hash.clone() else {
        debug!(%email, "User has no password set");
        return Err(HandlerError::InvalidCredentials(email));
    };

    let matches = spawn_blocking(move || verify_password(&password, &password_hash)).await?;
    if !matches {
        return Err(HandlerError::InvalidCredentials(email));
    }

    Ok(user)
}

/// Creates the user as sent, without touching credentials, unless the email is taken.
pub async fn upsert(store: &dyn Store, new_user: NewUser) -> Result<Upserted> {
    if let Some(existing) = store.fetch_user_by_email(&new_user.email).await? {
        return Ok(Upserted::Existing(existing));
    }

    let user = CreateUser::from(new_user);
    match store.create_user(&user).await {
        Ok(id) => {
            info!(email = %user.email, %id, "Created user");
            Ok(Upserted::Created(user.into_user(id)))
        }
        // Lost a race against another insert for the same email.
        Err(DbError::DuplicateEmail(email)) => fetch_by_email(store, &email)
            .await
            .map(Upserted::Existing),
        Err(err) => Err(err.into()),
    }
}

pub async fn fetch_by_email(store: &dyn Store, email: &Email) -> Result<User> {
    store
        .fetch_user_by_email(email)
        .await?
        .ok_or_else(|| HandlerError::NotFound(email.clone()))
}

fn already_exists(error: DbError) -> HandlerError {
    match error {
        DbError::DuplicateEmail(email) => HandlerError::AlreadyExists(email),
        err => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use crate::service::{
        HandlerError,
        accounts::{Upserted, fetch_by_email, signin, signup, upsert},
    };
    use async_trait::async_trait;
    use pathfinder_common::model::{
        Id,
        post::{Comment, CreatePost, Post, PostMarker, Reaction},
        user::{CreateUser, Credentials, Email, NewUser, User, UserMarker},
    };
    use pathfinder_db::{
        client::{Result as DbResult, Store},
        memory::MemoryStore,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Misses the user on the first lookup, as if another request inserted it right after.
    struct RacingStore {
        inner: MemoryStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn fetch_user_by_email(&self, email: &Email) -> DbResult<Option<User>> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(None);
            }
            self.inner.fetch_user_by_email(email).await
        }

        async fn create_user(&self, user: &CreateUser) -> DbResult<Id<UserMarker>> {
            self.inner.create_user(user).await
        }

        async fn set_liked(
            &self,
            email: &Email,
            post_id: Id<PostMarker>,
            reaction: Reaction,
        ) -> DbResult<bool> {
            self.inner.set_liked(email, post_id, reaction).await
        }

        async fn fetch_posts(&self) -> DbResult<Vec<Post>> {
            self.inner.fetch_posts().await
        }

        async fn fetch_post(&self, post_id: Id<PostMarker>) -> DbResult<Option<Post>> {
            self.inner.fetch_post(post_id).await
        }

        async fn create_post(&self, post: &CreatePost) -> DbResult<Id<PostMarker>> {
            self.inner.create_post(post).await
        }

        async fn push_comment(
            &self,
            post_id: Id<PostMarker>,
            comment: &Comment,
        ) -> DbResult<bool> {
            self.inner.push_comment(post_id, comment).await
        }

        async fn adjust_reacts(
            &self,
            post_id: Id<PostMarker>,
            reaction: Reaction,
        ) -> DbResult<bool> {
            self.inner.adjust_reacts(post_id, reaction).await
        }
    }

    async fn racing_store(email: &str) -> (RacingStore, User) {
        let inner = MemoryStore::new();
        let winner: NewUser =
            serde_json::from_value(json!({ "email": email, "name": "Winner" })).unwrap();
        let Upserted::Created(winner) = upsert(&inner, winner).await.unwrap() else {
            panic!("winner should be created");
        };

        let store = RacingStore {
            inner,
            lookups: AtomicUsize::new(0),
        };
        (store, winner)
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        serde_json::from_value(json!({ "email": email, "password": password, "name": "Ada" }))
            .unwrap()
    }

    #[tokio::test]
    async fn signup_then_signin() {
        let store = MemoryStore::new();

        let created = signup(&store, credentials("a@x.com", "hunter2"))
            .await
            .unwrap();
        assert!(created.liked_posts.is_empty());
        assert_eq!(created.profile.get("name"), Some(&json!("Ada")));

        let user = signin(&store, Email::new("a@x.com"), "hunter2".to_owned())
            .await
            .unwrap();
        assert_eq!(user.id, created.id);
    }

    #[tokio::test]
    async fn signup_existing_keeps_hash() {
        let store = MemoryStore::new();
        let email = Email::new("a@x.com");

        signup(&store, credentials("a@x.com", "first")).await.unwrap();
        let hash_before = store
            .fetch_user_by_email(&email)
            .await
            .unwrap()
            .unwrap()
            .password_hash;

        let error = signup(&store, credentials("a@x.com", "second"))
            .await
            .unwrap_err();
        assert!(matches!(error, HandlerError::AlreadyExists(_)));

        let hash_after = store
            .fetch_user_by_email(&email)
            .await
            .unwrap()
            .unwrap()
            .password_hash;
        assert_eq!(hash_before, hash_after);

        assert!(signin(&store, email.clone(), "first".to_owned()).await.is_ok());
        assert!(matches!(
            signin(&store, email, "second".to_owned()).await,
            Err(HandlerError::InvalidCredentials(_))
        ));
    }

    #[tokio::test]
    async fn signin_failures() {
        let store = MemoryStore::new();
        signup(&store, credentials("a@x.com", "hunter2")).await.unwrap();

        assert!(matches!(
            signin(&store, Email::new("a@x.com"), "hunter3".to_owned()).await,
            Err(HandlerError::InvalidCredentials(_))
        ));
        assert!(matches!(
            signin(&store, Email::new("nobody@x.com"), "hunter2".to_owned()).await,
            Err(HandlerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn upserted_user_cannot_sign_in() {
        let store = MemoryStore::new();
        let new_user: NewUser =
            serde_json::from_value(json!({ "email": "g@x.com", "name": "Gus" })).unwrap();

        upsert(&store, new_user).await.unwrap();

        assert!(matches!(
            signin(&store, Email::new("g@x.com"), String::new()).await,
            Err(HandlerError::InvalidCredentials(_))
        ));
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let new_user: NewUser =
            serde_json::from_value(json!({ "email": "g@x.com", "name": "Gus" })).unwrap();

        let Upserted::Created(created) = upsert(&store, new_user.clone()).await.unwrap() else {
            panic!("first upsert should create");
        };

        let mut renamed = new_user;
        renamed.profile.insert("name".to_owned(), json!("Someone else"));
        let Upserted::Existing(existing) = upsert(&store, renamed).await.unwrap() else {
            panic!("second upsert should find the existing user");
        };

        assert_eq!(existing, created);
        assert_eq!(existing.profile.get("name"), Some(&json!("Gus")));
    }

    #[tokio::test]
    async fn signup_losing_race_already_exists() {
        let (store, winner) = racing_store("a@x.com").await;

        assert!(matches!(
            signup(&store, credentials("a@x.com", "hunter2")).await,
            Err(HandlerError::AlreadyExists(email)) if email == winner.email
        ));

        let stored = fetch_by_email(&store, &winner.email).await.unwrap();
        assert_eq!(stored, winner);
        assert!(stored.password_hash.is_none());
    }

    #[tokio::test]
    async fn upsert_losing_race_returns_winner() {
        let (store, winner) = racing_store("g@x.com").await;
        let new_user: NewUser =
            serde_json::from_value(json!({ "email": "g@x.com", "name": "Loser" })).unwrap();

        let Upserted::Existing(existing) = upsert(&store, new_user).await.unwrap() else {
            panic!("losing upsert should return the existing user");
        };

        assert_eq!(existing, winner);
        assert_eq!(existing.profile.get("name"), Some(&json!("Winner")));
    }

    #[tokio::test]
    async fn fetch_missing_user() {
        let store = MemoryStore::new();

        assert!(matches!(
            fetch_by_email(&store, &Email::new("a@x.com")).await,
            Err(HandlerError::NotFound(_))
        ));
    }
}
