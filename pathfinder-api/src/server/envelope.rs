//! Response bodies of the API routes.
//!
//! Every route answers with transport status 200 and puts the outcome in the body's `status`
//! field instead.

use crate::server::json::json_response;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pathfinder_common::model::{post::Post, user::User};
use serde::Serialize;

pub const SOMETHING_WENT_WRONG: &str = "Something Went Wrong!";

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct StatusEnvelope {
    pub status: u16,
    pub message: &'static str,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct UserEnvelope {
    pub status: u16,
    pub message: &'static str,
    pub user: Option<User>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct PostEnvelope {
    pub status: u16,
    pub message: &'static str,
    pub post: Option<Post>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct PostsEnvelope {
    pub status: u16,
    pub message: &'static str,
    pub posts: Option<Vec<Post>>,
}

impl StatusEnvelope {
    #[must_use]
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status: status.as_u16(),
            message,
        }
    }

    #[must_use]
    pub fn failure() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SOMETHING_WENT_WRONG)
    }
}

impl UserEnvelope {
    #[must_use]
    pub fn new(status: StatusCode, message: &'static str, user: Option<User>) -> Self {
        Self {
            status: status.as_u16(),
            message,
            user,
        }
    }

    #[must_use]
    pub fn failure() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SOMETHING_WENT_WRONG, None)
    }
}

impl PostEnvelope {
    #[must_use]
    pub fn new(status: StatusCode, message: &'static str, post: Option<Post>) -> Self {
        Self {
            status: status.as_u16(),
            message,
            post,
        }
    }

    #[must_use]
    pub fn failure() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SOMETHING_WENT_WRONG, None)
    }
}

impl PostsEnvelope {
    #[must_use]
    pub fn new(status: StatusCode, message: &'static str, posts: Option<Vec<Post>>) -> Self {
        Self {
            status: status.as_u16(),
            message,
            posts,
        }
    }

    #[must_use]
    pub fn failure() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SOMETHING_WENT_WRONG, None)
    }
}

macro_rules! envelope_response {
    ($($envelope:ty),+) => {
        $(
            impl IntoResponse for $envelope {
                fn into_response(self) -> Response {
                    json_response(&self)
                }
            }
        )+
    };
}

envelope_response!(StatusEnvelope, UserEnvelope, PostEnvelope, PostsEnvelope);
