use crate::{
    server::{ServerError, ServerRouter, envelope::UserEnvelope, json::Json},
    service::{
        HandlerError,
        accounts::{self, Upserted},
    },
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use pathfinder_common::model::user::{Credentials, Email, NewUser};
use pathfinder_db::client::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(user_signup)
        .typed_post(user_signin)
        .typed_post(new_user)
        .typed_get(current_user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user-signup", rejection(ServerError))]
struct UserSignupPath();

async fn user_signup(
    UserSignupPath(): UserSignupPath,
    State(store): State<Arc<dyn Store>>,
    Json(credentials): Json<Credentials>,
) -> UserEnvelope {
    match accounts::signup(&*store, credentials).await {
        Ok(user) => UserEnvelope::new(StatusCode::OK, "Registration Successful!", Some(user)),
        Err(HandlerError::AlreadyExists(_)) => {
            UserEnvelope::new(StatusCode::NOT_FOUND, "User Already Exists!", None)
        }
        Err(err) => {
            error!(error = %err, "Signup failed");
            UserEnvelope::failure()
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/user-signin", rejection(ServerError))]
struct UserSigninPath();

async fn user_signin(
    UserSigninPath(): UserSigninPath,
    State(store): State<Arc<dyn Store>>,
    Json(credentials): Json<Credentials>,
) -> UserEnvelope {
    let Credentials { email, password, .. } = credentials;

    match accounts::signin(&*store, email, password).await {
        Ok(user) => UserEnvelope::new(StatusCode::OK, "Login Successful!", Some(user)),
        Err(HandlerError::NotFound(_)) => {
            UserEnvelope::new(StatusCode::NOT_FOUND, "No Such User Exists!", None)
        }
        Err(HandlerError::InvalidCredentials(email)) => {
            warn!(%email, "Rejected sign in");
            UserEnvelope::new(StatusCode::UNAUTHORIZED, "Invalid Credentials!", None)
        }
        Err(err) => {
            error!(error = %err, "Signin failed");
            UserEnvelope::failure()
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/new-user", rejection(ServerError))]
struct NewUserPath();

async fn new_user(
    NewUserPath(): NewUserPath,
    State(store): State<Arc<dyn Store>>,
    Json(user): Json<NewUser>,
) -> UserEnvelope {
    match accounts::upsert(&*store, user).await {
        Ok(Upserted::Created(user)) => {
            UserEnvelope::new(StatusCode::OK, "New User Created!", Some(user))
        }
        Ok(Upserted::Existing(user)) => {
            UserEnvelope::new(StatusCode::CREATED, "User Already Exists!", Some(user))
        }
        Err(err) => {
            error!(error = %err, "Creating user failed");
            UserEnvelope::failure()
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/current-user/{email}", rejection(ServerError))]
struct CurrentUserPath {
    email: Email,
}

async fn current_user(
    CurrentUserPath { email }: CurrentUserPath,
    State(store): State<Arc<dyn Store>>,
) -> UserEnvelope {
    match accounts::fetch_by_email(&*store, &email).await {
        Ok(user) => UserEnvelope::new(StatusCode::OK, "user found!", Some(user)),
        Err(HandlerError::NotFound(_)) => {
            UserEnvelope::new(StatusCode::NOT_FOUND, "No user found!", None)
        }
        Err(err) => {
            error!(error = %err, "Fetching user failed");
            UserEnvelope::new(StatusCode::NOT_FOUND, "No user found!", None)
        }
    }
}
