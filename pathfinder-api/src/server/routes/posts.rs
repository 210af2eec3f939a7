use crate::{
    server::{
        ServerError, ServerRouter,
        envelope::{PostEnvelope, PostsEnvelope, StatusEnvelope},
        json::Json,
    },
    service::{
        posts::{self, PostListing},
        reactions,
    },
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use pathfinder_common::model::post::{Comment, CreatePost, ToggleReaction};
use pathfinder_db::client::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_get(get_posts)
        .typed_patch(post_comment)
        .typed_patch(calculate_reactions)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create-post", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(store): State<Arc<dyn Store>>,
    Json(post): Json<CreatePost>,
) -> PostEnvelope {
    match posts::create(&*store, post).await {
        Ok(post) => PostEnvelope::new(StatusCode::OK, "New Post Created!", Some(post)),
        Err(err) => {
            error!(error = %err, "Creating post failed");
            PostEnvelope::failure()
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/get-posts", rejection(ServerError))]
struct GetPostsPath();

async fn get_posts(
    GetPostsPath(): GetPostsPath,
    State(store): State<Arc<dyn Store>>,
) -> PostsEnvelope {
    // An empty collection is reported like a failure.
    match posts::list_all(&*store).await {
        Ok(PostListing::Found(posts)) => {
            PostsEnvelope::new(StatusCode::OK, "Posts fetch successful!", Some(posts))
        }
        Ok(PostListing::Empty) => {
            warn!("No posts to list");
            PostsEnvelope::failure()
        }
        Err(err) => {
            error!(error = %err, "Listing posts failed");
            PostsEnvelope::failure()
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/post-comment/{id}", rejection(ServerError))]
struct PostCommentPath {
    id: String,
}

async fn post_comment(
    PostCommentPath { id }: PostCommentPath,
    State(store): State<Arc<dyn Store>>,
    Json(comment): Json<Comment>,
) -> StatusEnvelope {
    match posts::append_comment(&*store, &id, comment).await {
        Ok(()) => StatusEnvelope::new(StatusCode::OK, "Comment add successful!"),
        Err(err) => {
            error!(error = %err, post_id = %id, "Adding comment failed");
            StatusEnvelope::failure()
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/calculate-reactions", rejection(ServerError))]
struct CalculateReactionsPath();

async fn calculate_reactions(
    CalculateReactionsPath(): CalculateReactionsPath,
    State(store): State<Arc<dyn Store>>,
    Json(request): Json<ToggleReaction>,
) -> StatusEnvelope {
    match reactions::toggle(&*store, request).await {
        Ok(_) => StatusEnvelope::new(StatusCode::OK, "Reaction added successfully!"),
        Err(err) => {
            error!(error = %err, "Toggling reaction failed");
            StatusEnvelope::failure()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::tests::{app, send};
    use axum::http::{Method, StatusCode};
    use pathfinder_db::memory::MemoryStore;
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn create_post(store: &Arc<MemoryStore>, reacts: u64) -> String {
        let (_, body) = send(
            app(store.clone()),
            Method::POST,
            "/create-post",
            Some(json!({ "author": "a@x.com", "text": "hello", "reacts": reacts })),
        )
        .await;

        assert_eq!(body["status"], 200);
        assert_eq!(body["message"], "New Post Created!");
        body["post"]["_id"].as_str().unwrap().to_owned()
    }

    async fn get_posts(store: &Arc<MemoryStore>) -> Value {
        send(app(store.clone()), Method::GET, "/get-posts", None)
            .await
            .1
    }

    #[tokio::test]
    async fn empty_listing_is_failure() {
        let store = Arc::new(MemoryStore::new());

        let (status, body) = send(app(store), Method::GET, "/get-posts", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": 500, "message": "Something Went Wrong!", "posts": null })
        );
    }

    #[tokio::test]
    async fn create_and_list() {
        let store = Arc::new(MemoryStore::new());
        let id = create_post(&store, 0).await;

        let body = get_posts(&store).await;

        assert_eq!(body["status"], 200);
        assert_eq!(body["message"], "Posts fetch successful!");
        assert_eq!(body["posts"][0]["_id"], id.as_str());
        assert_eq!(body["posts"][0]["text"], "hello");
        assert_eq!(body["posts"][0]["comments"], json!([]));
        assert_eq!(body["posts"][0]["reacts"], 0);
    }

    #[tokio::test]
    async fn create_post_stores_odd_payloads() {
        let store = Arc::new(MemoryStore::new());
        let bodies = [
            json!({ "text": "x", "comments": ["plain string comment"] }),
            json!({ "text": "x", "reacts": "0" }),
            json!({ "text": "x", "reacts": -1 }),
        ];

        for body in bodies {
            let (status, response) =
                send(app(store.clone()), Method::POST, "/create-post", Some(body)).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(response["status"], 200);
            assert_eq!(response["post"]["text"], "x");
        }

        let posts = get_posts(&store).await["posts"].clone();
        assert_eq!(posts[0]["comments"], json!(["plain string comment"]));
        assert_eq!(posts[1]["reacts"], 0);
        assert_eq!(posts[2]["reacts"], 0);
    }

    #[tokio::test]
    async fn comment_envelopes() {
        let store = Arc::new(MemoryStore::new());
        let id = create_post(&store, 0).await;
        let comment = json!({ "author": "b@x.com", "text": "nice" });

        let (_, body) = send(
            app(store.clone()),
            Method::PATCH,
            &format!("/post-comment/{id}"),
            Some(comment.clone()),
        )
        .await;
        assert_eq!(
            body,
            json!({ "status": 200, "message": "Comment add successful!" })
        );
        assert_eq!(get_posts(&store).await["posts"][0]["comments"], json!([comment]));

        let (_, body) = send(
            app(store.clone()),
            Method::PATCH,
            &format!("/post-comment/{id}"),
            Some(json!("plain string comment")),
        )
        .await;
        assert_eq!(body["status"], 200);
        assert_eq!(
            get_posts(&store).await["posts"][0]["comments"][1],
            "plain string comment"
        );

        let (_, body) = send(
            app(store),
            Method::PATCH,
            "/post-comment/000000000000000000000000",
            Some(comment),
        )
        .await;
        assert_eq!(
            body,
            json!({ "status": 500, "message": "Something Went Wrong!" })
        );
    }

    #[tokio::test]
    async fn reaction_round_trip() {
        let store = Arc::new(MemoryStore::new());
        send(
            app(store.clone()),
            Method::POST,
            "/new-user",
            Some(json!({ "email": "a@x.com" })),
        )
        .await;
        let id = create_post(&store, 0).await;

        for (reacts, expected_reacts, expected_likes) in
            [(0, 1, json!([id.as_str()])), (1, 0, json!([]))]
        {
            let (_, body) = send(
                app(store.clone()),
                Method::PATCH,
                "/calculate-reactions",
                Some(json!({ "email": "a@x.com", "postId": id.as_str(), "reacts": reacts })),
            )
            .await;
            assert_eq!(
                body,
                json!({ "status": 200, "message": "Reaction added successfully!" })
            );

            assert_eq!(get_posts(&store).await["posts"][0]["reacts"], expected_reacts);
            let (_, user) = send(
                app(store.clone()),
                Method::GET,
                "/current-user/a@x.com",
                None,
            )
            .await;
            assert_eq!(user["user"]["likedPosts"], expected_likes);
        }
    }

    #[tokio::test]
    async fn reaction_for_unknown_user() {
        let store = Arc::new(MemoryStore::new());
        let id = create_post(&store, 0).await;

        let (_, body) = send(
            app(store),
            Method::PATCH,
            "/calculate-reactions",
            Some(json!({ "email": "ghost@x.com", "postId": id, "reacts": 0 })),
        )
        .await;

        assert_eq!(
            body,
            json!({ "status": 500, "message": "Something Went Wrong!" })
        );
    }
}
