//! Post and comment mutations.
//!
//! Every mutation is guarded by [`SessionContext::require_user`]: an
//! anonymous actor is sent to login and nothing is sent to the backend.
//! Likes are applied optimistically (see [`PendingLike`]) and rolled back
//! on failure. Deletes and comments only touch local state after the
//! backend acknowledged them.

use std::sync::Arc;

use plaza_types::{Comment, LikeResult, Post, PostId};

use crate::api::Api;
use crate::context::SessionContext;
use crate::feed::FeedState;
use crate::http::{
    ApiError, ApiErrorKind, ApiResult, FileUpload, FormField, HttpTransport, Transport,
};
use crate::optimistic::{LikeState, Transaction};

/// Largest accepted image attachment.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const LIKE_PROMPT: &str = "Please log in to like posts.";
pub const COMMENT_PROMPT: &str = "Please log in to comment.";
pub const POST_PROMPT: &str = "Please log in to create posts.";
pub const DELETE_PROMPT: &str = "Please log in to manage your posts.";

/// Content for a new or edited post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub content: String,
    pub image: Option<FileUpload>,
}

impl PostDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            image: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: FileUpload) -> Self {
        self.image = Some(image);
        self
    }

    /// # Errors
    /// Rejects oversized images and drafts with neither text nor image.
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(image) = &self.image
            && image.data.len() > MAX_IMAGE_BYTES
        {
            return Err(ApiError::invalid("Image size should be less than 5MB"));
        }
        if self.content.trim().is_empty() && self.image.is_none() {
            return Err(ApiError::invalid("Please add some content or an image"));
        }
        Ok(())
    }

    pub(crate) fn to_form_fields(&self) -> Vec<FormField> {
        let mut fields = vec![FormField::text("content", self.content.as_str())];
        if let Some(image) = &self.image {
            fields.push(FormField::file("image", image.clone()));
        }
        fields
    }
}

/// A like already applied to a post and not yet sent.
#[must_use = "a pending like must be sent and settled"]
#[derive(Debug)]
pub struct PendingLike {
    post_id: PostId,
    tx: Transaction<Post>,
}

impl PendingLike {
    pub fn post_id(&self) -> PostId {
        self.post_id
    }
}

/// The backend's answer to a [`PendingLike`].
#[must_use = "a like reply must be settled onto its post"]
#[derive(Debug)]
pub struct LikeReply {
    tx: Transaction<Post>,
    result: ApiResult<LikeResult>,
}

impl LikeReply {
    /// On success keeps the new count and takes the flag from the backend;
    /// on failure restores flag and count exactly.
    ///
    /// # Errors
    /// Returns the backend error after rollback.
    pub fn settle(self, post: &mut Post) -> ApiResult<bool> {
        match self.result {
            Ok(result) => {
                self.tx.commit();
                post.viewer_has_liked = result.liked;
                Ok(result.liked)
            }
            Err(err) => {
                self.tx.rollback(post);
                Err(err)
            }
        }
    }
}

pub struct PostActions<T = HttpTransport> {
    api: Arc<Api<T>>,
}

impl<T: Transport> PostActions<T> {
    pub fn new(api: Arc<Api<T>>) -> Self {
        Self { api }
    }

    fn session(&self) -> &Arc<SessionContext> {
        self.api.session()
    }

    /// Whether the current user authored `post`.
    pub fn is_owner(&self, post: &Post) -> bool {
        self.session()
            .current_user()
            .is_some_and(|user| user.id == post.author.id)
    }

    /// Likes or unlikes `post`, returning the backend's resulting flag.
    ///
    /// Shorthand for [`PostActions::begin_like`], [`PostActions::send_like`]
    /// and [`LikeReply::settle`] when nothing needs to render the pending
    /// state in between.
    ///
    /// # Errors
    /// `AuthRequired` for anonymous users (no request made), otherwise the
    /// backend error after rollback.
    pub async fn toggle_like(&self, post: &mut Post, return_to: Option<&str>) -> ApiResult<bool> {
        let pending = self.begin_like(post, return_to)?;
        self.send_like(pending).await.settle(post)
    }

    /// Flips the like flag and count on `post` right away. The post is free
    /// to be rendered while the returned [`PendingLike`] is sent.
    ///
    /// # Errors
    /// `AuthRequired` for anonymous users; `post` is left untouched.
    pub fn begin_like(&self, post: &mut Post, return_to: Option<&str>) -> ApiResult<PendingLike> {
        self.session().require_user(return_to, LIKE_PROMPT)?;
        let tx = Transaction::begin(post, |p| {
            let mut like = LikeState::of(p);
            like.toggle();
            like.apply_to(p);
        });
        Ok(PendingLike { post_id: post.id, tx })
    }

    /// Sends a pending like. A failure is announced here and rolled back
    /// when the reply is settled.
    pub async fn send_like(&self, pending: PendingLike) -> LikeReply {
        let PendingLike { post_id, tx } = pending;
        let result = self.api.toggle_like(post_id).await;
        if let Err(err) = &result {
            tracing::warn!(post = post_id, error = %err, "Like toggle failed");
            self.session().events().error("Failed to update like");
        }
        LikeReply { tx, result }
    }

    /// Deletes a post the current user owns.
    ///
    /// # Errors
    /// `AuthRequired` for anonymous users, `Forbidden` for someone else's
    /// post (neither sends a request), otherwise the backend error.
    pub async fn delete_post(&self, post: &Post, return_to: Option<&str>) -> ApiResult<()> {
        self.require_owner(post, return_to)?;

        match self.api.delete_post(post.id).await {
            Ok(()) => {
                tracing::info!(post = post.id, "Post deleted");
                self.session().events().success("Post deleted successfully");
                Ok(())
            }
            Err(err) => {
                self.session().events().error("Failed to delete post");
                Err(err)
            }
        }
    }

    /// Deletes a feed entry, removing it locally only once the backend
    /// confirmed. A failure leaves it in place.
    ///
    /// # Errors
    /// `NotFound` when the feed has no such post; otherwise as
    /// [`PostActions::delete_post`].
    pub async fn delete_from_feed(
        &self,
        feed: &mut FeedState,
        id: PostId,
        return_to: Option<&str>,
    ) -> ApiResult<()> {
        let post = feed
            .posts()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::new(ApiErrorKind::NotFound, format!("Post {id} not found")))?;
        self.delete_post(&post, return_to).await?;
        feed.remove(id);
        Ok(())
    }

    /// # Errors
    /// `AuthRequired` for anonymous users, a validation error for an
    /// invalid draft, otherwise the backend error.
    pub async fn create_post(&self, draft: &PostDraft) -> ApiResult<Post> {
        self.session().require_user(None, POST_PROMPT)?;
        self.check_draft(draft)?;

        match self.api.create_post(draft).await {
            Ok(post) => {
                tracing::info!(post = post.id, "Post created");
                self.session().events().success("Post created successfully!");
                Ok(post)
            }
            Err(err) => {
                self.session().events().error("Failed to create post");
                Err(err)
            }
        }
    }

    /// Replaces the content (and optionally the image) of an owned post.
    ///
    /// # Errors
    /// As [`PostActions::create_post`], plus `Forbidden` for someone
    /// else's post.
    pub async fn update_post(
        &self,
        post: &mut Post,
        draft: &PostDraft,
        return_to: Option<&str>,
    ) -> ApiResult<()> {
        self.require_owner(post, return_to)?;
        self.check_draft(draft)?;

        match self.api.update_post(post.id, draft).await {
            Ok(updated) => {
                *post = updated;
                self.session().events().success("Post updated successfully!");
                Ok(())
            }
            Err(err) => {
                self.session().events().error("Failed to update post");
                Err(err)
            }
        }
    }

    /// # Errors
    /// Returns the backend error after announcing it, unless the post is
    /// missing, which callers show inline.
    pub async fn load_post(&self, id: PostId) -> ApiResult<Post> {
        self.api
            .get_post(id)
            .await
            .inspect_err(|err| self.announce_load_failure(err, "Failed to load post"))
    }

    /// # Errors
    /// As [`PostActions::load_post`].
    pub async fn load_comments(&self, post_id: PostId) -> ApiResult<Vec<Comment>> {
        self.api
            .list_comments(post_id)
            .await
            .map(|page| page.results)
            .inspect_err(|err| self.announce_load_failure(err, "Failed to load comments"))
    }

    /// Posts a comment and appends it to `comments` once acknowledged.
    /// Blank content is ignored and returns `None`.
    ///
    /// # Errors
    /// `AuthRequired` for anonymous users (no request made), otherwise the
    /// backend error.
    pub async fn add_comment(
        &self,
        comments: &mut Vec<Comment>,
        post_id: PostId,
        content: &str,
        return_to: Option<&str>,
    ) -> ApiResult<Option<Comment>> {
        self.session().require_user(return_to, COMMENT_PROMPT)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        match self.api.create_comment(post_id, content).await {
            Ok(comment) => {
                comments.push(comment.clone());
                self.session().events().success("Comment added!");
                Ok(Some(comment))
            }
            Err(err) => {
                self.session().events().error("Failed to add comment");
                Err(err)
            }
        }
    }

    fn require_owner(&self, post: &Post, return_to: Option<&str>) -> ApiResult<()> {
        let user = self.session().require_user(return_to, DELETE_PROMPT)?;
        if user.id == post.author.id {
            Ok(())
        } else {
            Err(ApiError::new(
                ApiErrorKind::Forbidden,
                "You can only change your own posts",
            ))
        }
    }

    fn check_draft(&self, draft: &PostDraft) -> ApiResult<()> {
        draft
            .validate()
            .inspect_err(|err| self.session().events().error(err.message.clone()))
    }

    fn announce_load_failure(&self, err: &ApiError, message: &str) {
        if err.kind != ApiErrorKind::NotFound {
            self.session().events().error(message);
        }
    }
}
