use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::FromRequest,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;

/// JSON request body. Malformed bodies are rejected with a [`ServerError`].
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

/// Serializes `body` as the response, or replies with a [`ServerError`] if that fails.
pub fn json_response<T: Serialize>(body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
        Err(err) => ServerError::JsonResponse(err).into_response(),
    }
}
