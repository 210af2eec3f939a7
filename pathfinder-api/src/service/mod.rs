//! Request handlers for accounts, posts and reactions.
//!
//! Handlers decide outcomes; mapping an outcome to a response envelope is left to the routes.

pub mod accounts;
pub mod posts;
pub mod reactions;

use pathfinder_common::model::{InvalidIdError, credential::CredentialError, user::Email};
use pathfinder_db::client::DbError;
use thiserror::Error;

pub type Result<T, E = HandlerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("No user with email {0} exists")]
    NotFound(Email),
    #[error("A user with email {0} already exists")]
    AlreadyExists(Email),
    #[error("Invalid credentials for {0}")]
    InvalidCredentials(Email),
    #[error("Invalid post id: {0}")]
    InvalidPostId(#[from] InvalidIdError),
    #[error("Store did not modify the {0}")]
    NotModified(&'static str),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
