use crate::service::{HandlerError, Result};
use pathfinder_common::model::{
    Id,
    post::{Comment, CreatePost, Post, PostMarker},
};
use pathfinder_db::client::Store;
use tracing::info;

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PostListing {
    Found(Vec<Post>),
    Empty,
}

pub async fn create(store: &dyn Store, post: CreatePost) -> Result<Post> {
    let id = store.create_post(&post).await?;
    info!(%id, "Created post");

    Ok(post.into_post(id))
}

pub async fn list_all(store: &dyn Store) -> Result<PostListing> {
    let posts = store.fetch_posts().await?;

    if posts.is_empty() {
        Ok(PostListing::Empty)
    } else {
        Ok(PostListing::Found(posts))
    }
}

pub async fn append_comment(store: &dyn Store, post_id: &str, comment: Comment) -> Result<()> {
    let post_id: Id<PostMarker> = post_id.parse()?;

    if store.push_comment(post_id, &comment).await? {
        Ok(())
    } else {
        Err(HandlerError::NotModified("post"))
    }
}
