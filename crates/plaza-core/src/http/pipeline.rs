//! Auth pipeline around a [`Transport`].
//!
//! Request stage: attach the stored access token as a bearer credential.
//! Response stage: on a 401 for a request that has not been retried yet,
//! refresh the access token over the bare transport and replay the request
//! once. A failed refresh ends the session. Errors are then announced to
//! the front end before they are returned, including the one that ended
//! the session.

use std::sync::Arc;

use plaza_types::RefreshedToken;
use serde_json::json;

use super::error::{ApiError, ApiResult};
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::context::SessionContext;

/// Token refresh endpoint, relative to the base URL.
pub const REFRESH_PATH: &str = "/token/refresh/";

/// Per-call pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Set once the request has been replayed after a refresh.
    pub retried: bool,
    /// Whether a 401 may trigger a refresh at all. Credential exchanges turn
    /// this off: a 401 there means wrong credentials, not an expired token.
    pub refresh_on_unauthorized: bool,
    /// Whether failures are announced as global notices.
    pub announce_errors: bool,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            retried: false,
            refresh_on_unauthorized: true,
            announce_errors: true,
        }
    }
}

impl RequestContext {
    /// A context for calls whose caller reports failures itself.
    pub fn quiet() -> Self {
        Self {
            announce_errors: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }
}

enum RefreshOutcome {
    Refreshed,
    NoRefreshToken,
    Failed,
}

pub struct AuthPipeline<T> {
    transport: T,
    session: Arc<SessionContext>,
}

impl<T: Transport> AuthPipeline<T> {
    pub fn new(transport: T, session: Arc<SessionContext>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// The underlying transport, bypassing both interception stages.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request` through both stages with a fresh context.
    ///
    /// # Errors
    /// Returns the original error when the request fails and cannot be
    /// recovered by a token refresh.
    pub async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        self.execute_with(request, RequestContext::default()).await
    }

    /// Sends `request` with an explicit context.
    ///
    /// # Errors
    /// See [`AuthPipeline::execute`].
    pub async fn execute_with(
        &self,
        request: ApiRequest,
        mut ctx: RequestContext,
    ) -> ApiResult<ApiResponse> {
        loop {
            let error = match self.send_authorized(&request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => ApiError::from_status(response.status, &response.body),
                Err(err) => err,
            };

            if error.is_unauthorized() && ctx.refresh_on_unauthorized && !ctx.retried {
                ctx.retried = true;
                match self.refresh().await {
                    // Replay through the request stage, which picks up the new token.
                    RefreshOutcome::Refreshed => continue,
                    RefreshOutcome::NoRefreshToken => {}
                    RefreshOutcome::Failed => self.session.expire(),
                }
            }

            if ctx.announce_errors && error.is_announced() {
                self.session.events().error(error.notice_message());
            }
            return Err(error);
        }
    }

    async fn send_authorized(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let mut outgoing = request.clone();
        outgoing.bearer = self.session.store().access_token();

        let result = self.transport.send(&outgoing).await;
        match &result {
            Ok(response) => tracing::debug!(
                method = %outgoing.method,
                path = %outgoing.path,
                status = response.status,
                authenticated = outgoing.bearer.is_some(),
                "api request"
            ),
            Err(err) => tracing::debug!(
                method = %outgoing.method,
                path = %outgoing.path,
                error = %err,
                "api request failed"
            ),
        }
        result
    }

    /// Exchanges the stored refresh token for a new access token over the
    /// bare transport.
    async fn refresh(&self) -> RefreshOutcome {
        let Some(refresh) = self.session.store().refresh_token() else {
            tracing::debug!("401 without a refresh token; not refreshing");
            return RefreshOutcome::NoRefreshToken;
        };

        let request = ApiRequest::post(REFRESH_PATH).json(json!({ "refresh": refresh }));
        let refreshed = self
            .transport
            .send(&request)
            .await
            .and_then(ApiResponse::error_for_status)
            .and_then(|response| response.json::<RefreshedToken>());

        match refreshed {
            Ok(token) => match self.session.store().update_access(&token) {
                Ok(()) => {
                    tracing::info!("Access token refreshed");
                    RefreshOutcome::Refreshed
                }
                Err(e) => {
                    tracing::warn!("Failed to persist refreshed token: {e:#}");
                    RefreshOutcome::Failed
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh failed; ending session");
                RefreshOutcome::Failed
            }
        }
    }
}
