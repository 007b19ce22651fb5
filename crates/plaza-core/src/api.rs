//! Typed REST endpoints on top of the auth pipeline.

use std::sync::Arc;

use plaza_types::{
    Comment, Credentials, LikeResult, NewComment, Page, Post, PostId, Profile, Registration,
    TokenPair, User,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::SessionContext;
use crate::http::{
    ApiError, ApiRequest, ApiResult, AuthPipeline, HttpTransport, RequestContext, Transport,
};
use crate::posts::PostDraft;

pub const REGISTER_PATH: &str = "/users/register/";
pub const TOKEN_PATH: &str = "/token/";
pub const CURRENT_USER_PATH: &str = "/users/me/";
pub const POSTS_PATH: &str = "/posts/";

fn post_path(id: PostId) -> String {
    format!("/posts/{id}/")
}

fn to_json(value: &impl Serialize) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::decode(format!("Failed to serialize request: {e}")))
}

/// Client for the plaza REST API.
///
/// Credential exchanges run quietly and without refresh; every other
/// endpoint goes through the announcing pipeline, and controllers add
/// their own context-specific notice on top.
pub struct Api<T = HttpTransport> {
    pipeline: AuthPipeline<T>,
}

impl<T: Transport> Api<T> {
    pub fn new(transport: T, session: Arc<SessionContext>) -> Self {
        Self {
            pipeline: AuthPipeline::new(transport, session),
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.pipeline.session()
    }

    pub fn pipeline(&self) -> &AuthPipeline<T> {
        &self.pipeline
    }

    async fn fetch<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
        ctx: RequestContext,
    ) -> ApiResult<R> {
        self.pipeline.execute_with(request, ctx).await?.json()
    }

    /// Creates an account. Does not log in.
    ///
    /// # Errors
    /// Validation errors carry the backend's per-field messages.
    pub async fn register(&self, registration: &Registration) -> ApiResult<User> {
        let request = ApiRequest::post(REGISTER_PATH).json(to_json(registration)?);
        self.fetch(request, RequestContext::quiet().without_refresh())
            .await
    }

    /// Exchanges credentials for a token pair.
    ///
    /// # Errors
    /// A 401 here means the credentials were rejected.
    pub async fn obtain_tokens(&self, credentials: &Credentials) -> ApiResult<TokenPair> {
        let request = ApiRequest::post(TOKEN_PATH).json(to_json(credentials)?);
        self.fetch(request, RequestContext::quiet().without_refresh())
            .await
    }

    /// # Errors
    /// Fails when the stored token is rejected and cannot be refreshed.
    pub async fn current_user(&self) -> ApiResult<User> {
        self.fetch_announced(ApiRequest::get(CURRENT_USER_PATH))
            .await
    }

    async fn fetch_announced<R: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<R> {
        self.fetch(request, RequestContext::default()).await
    }

    /// Fetches one page of the feed (1-based).
    ///
    /// # Errors
    /// Returns the pipeline error for the request.
    pub async fn list_posts(&self, page: u32) -> ApiResult<Page<Post>> {
        let request = ApiRequest::get(POSTS_PATH).query("page", page);
        self.fetch_announced(request).await
    }

    /// # Errors
    /// A missing post is a `NotFound` error.
    pub async fn get_post(&self, id: PostId) -> ApiResult<Post> {
        self.fetch_announced(ApiRequest::get(post_path(id))).await
    }

    /// # Errors
    /// Returns the pipeline error for the request.
    pub async fn create_post(&self, draft: &PostDraft) -> ApiResult<Post> {
        let request = ApiRequest::post(POSTS_PATH).multipart(draft.to_form_fields());
        self.fetch_announced(request).await
    }

    /// # Errors
    /// Returns the pipeline error for the request.
    pub async fn update_post(&self, id: PostId, draft: &PostDraft) -> ApiResult<Post> {
        let request = ApiRequest::patch(post_path(id)).multipart(draft.to_form_fields());
        self.fetch_announced(request).await
    }

    /// # Errors
    /// Returns the pipeline error for the request.
    pub async fn delete_post(&self, id: PostId) -> ApiResult<()> {
        self.pipeline
            .execute(ApiRequest::delete(post_path(id)))
            .await
            .map(|_| ())
    }

    /// Toggles the viewer's like; the response carries the resulting state.
    ///
    /// # Errors
    /// Returns the pipeline error for the request.
    pub async fn toggle_like(&self, id: PostId) -> ApiResult<LikeResult> {
        let request = ApiRequest::post(format!("/posts/{id}/like/"));
        self.fetch_announced(request).await
    }

    /// # Errors
    /// Returns the pipeline error for the request.
    pub async fn list_comments(&self, post_id: PostId) -> ApiResult<Page<Comment>> {
        let request = ApiRequest::get(format!("/posts/{post_id}/comments/"));
        self.fetch_announced(request).await
    }

    /// # Errors
    /// Returns the pipeline error for the request.
    pub async fn create_comment(&self, post_id: PostId, content: &str) -> ApiResult<Comment> {
        let body = to_json(&NewComment {
            content: content.to_string(),
        })?;
        let request = ApiRequest::post(format!("/posts/{post_id}/comments/")).json(body);
        self.fetch_announced(request).await
    }

    /// # Errors
    /// A missing user is a `NotFound` error; usernames containing `/` are
    /// rejected locally.
    pub async fn get_profile(&self, username: &str) -> ApiResult<Profile> {
        let username = username.trim();
        if username.is_empty() || username.contains('/') {
            return Err(ApiError::invalid(format!("Invalid username: {username:?}")));
        }
        let request = ApiRequest::get(format!("/profiles/{username}/"));
        self.fetch_announced(request).await
    }
}
