//! Application root: wires configuration, storage, transport and the
//! controllers around one shared session context.

use std::sync::Arc;

use anyhow::{Context, Result};
use plaza_types::Profile;

use crate::api::Api;
use crate::config::Config;
use crate::context::SessionContext;
use crate::credentials::CredentialStore;
use crate::events::{EventReceiver, EventSink};
use crate::feed::FeedController;
use crate::http::{ApiErrorKind, ApiResult, HttpTransport, Transport};
use crate::posts::PostActions;
use crate::session::SessionManager;

pub struct Plaza<T = HttpTransport> {
    api: Arc<Api<T>>,
    pub session: SessionManager<T>,
    pub feed: FeedController<T>,
    pub posts: PostActions<T>,
}

impl Plaza<HttpTransport> {
    /// Builds a client from configuration, using the default credential
    /// file. Returns the receiving end of the event channel.
    ///
    /// # Errors
    /// Fails when the credential file is unreadable, the base URL is
    /// invalid, or the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<(Self, EventReceiver)> {
        let store = CredentialStore::open_default()?;
        let transport = HttpTransport::new(&config.effective_base_url()?, config.timeout())
            .context("Failed to create HTTP transport")?;
        let (events, rx) = EventSink::channel();
        Ok((Self::new(transport, store, events), rx))
    }
}

impl<T: Transport> Plaza<T> {
    pub fn new(transport: T, store: CredentialStore, events: EventSink) -> Self {
        let context = SessionContext::new(store, events);
        let api = Arc::new(Api::new(transport, context));
        Self {
            session: SessionManager::new(Arc::clone(&api)),
            feed: FeedController::new(Arc::clone(&api)),
            posts: PostActions::new(Arc::clone(&api)),
            api,
        }
    }

    pub fn api(&self) -> &Arc<Api<T>> {
        &self.api
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        self.api.session()
    }

    /// # Errors
    /// Returns the backend error; anything but a missing profile is also
    /// announced.
    pub async fn load_profile(&self, username: &str) -> ApiResult<Profile> {
        self.api.get_profile(username).await.inspect_err(|err| {
            if !matches!(err.kind, ApiErrorKind::NotFound | ApiErrorKind::Validation) {
                self.context().events().error("Failed to load profile");
            }
        })
    }
}
