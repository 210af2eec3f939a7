use crate::service::{HandlerError, Result};
use pathfinder_common::model::{
    Id,
    post::{PostMarker, Reaction, ToggleReaction},
};
use pathfinder_db::client::Store;
use tracing::{debug, warn};

/// Flips whether the user likes the post and moves the post's count along with it.
///
/// The two writes are independent. Both have to modify their document for the toggle to
/// succeed, but a write that did go through is not undone when the other one fails.
pub async fn toggle(store: &dyn Store, request: ToggleReaction) -> Result<Reaction> {
    let ToggleReaction {
        email,
        post_id,
        reacts,
    } = request;
    let post_id: Id<PostMarker> = post_id.parse()?;

    let user = store
        .fetch_user_by_email(&email)
        .await?
        .ok_or_else(|| HandlerError::NotFound(email.clone()))?;

    let reaction = if user.has_liked(post_id) {
        Reaction::Unlike
    } else {
        Reaction::Like
    };

    if let Some(post) = store.fetch_post(post_id).await?
        && i64::try_from(post.reacts) != Ok(reacts)
    {
        warn!(
            %post_id,
            stored = post.reacts,
            supplied = reacts,
            "Caller has a stale reaction count"
        );
    }

    let user_modified = store.set_liked(&email, post_id, reaction).await?;
    let post_modified = store.adjust_reacts(post_id, reaction).await?;
    debug!(%email, %post_id, ?reaction, user_modified, post_modified, "Toggled reaction");

    match (user_modified, post_modified) {
        (true, true) => Ok(reaction),
        (false, _) => Err(HandlerError::NotModified("user")),
        (true, false) => Err(HandlerError::NotModified("post")),
    }
}
