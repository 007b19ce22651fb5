//! Session context shared by the pipeline, the session manager and the
//! controllers.
//!
//! Created once at the application root and passed down as
//! `Arc<SessionContext>`. Locks are never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use plaza_types::User;

use crate::credentials::CredentialStore;
use crate::events::{ClientEvent, EventSink};
use crate::http::{ApiError, ApiResult};

#[derive(Debug)]
pub struct SessionContext {
    store: CredentialStore,
    user: Mutex<Option<User>>,
    events: EventSink,
}

impl SessionContext {
    pub fn new(store: CredentialStore, events: EventSink) -> Arc<Self> {
        Arc::new(Self {
            store,
            user: Mutex::new(None),
            events,
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock_user().clone()
    }

    /// Derived from user presence; there is no separate flag.
    pub fn is_authenticated(&self) -> bool {
        self.lock_user().is_some()
    }

    /// Returns the current user, or redirects an anonymous actor to login.
    ///
    /// When nobody is logged in this emits `NavigateToLogin` with the
    /// return location and an informational `prompt`, then fails with
    /// `AuthRequired`. Callers must not attempt any mutation in that case.
    ///
    /// # Errors
    /// Returns `AuthRequired` when there is no current user.
    pub fn require_user(&self, return_to: Option<&str>, prompt: &str) -> ApiResult<User> {
        if let Some(user) = self.current_user() {
            return Ok(user);
        }
        self.events.emit(ClientEvent::NavigateToLogin {
            return_to: return_to.map(str::to_string),
        });
        self.events.info(prompt);
        Err(ApiError::auth_required(prompt))
    }

    pub(crate) fn set_user(&self, user: Option<User>) {
        *self.lock_user() = user;
    }

    /// Drops the in-memory user and every persisted credential.
    pub(crate) fn clear(&self) {
        self.set_user(None);
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear stored credentials: {e:#}");
        }
    }

    /// Ends the session after an unrecoverable refresh failure.
    pub(crate) fn expire(&self) {
        self.clear();
        self.events.emit(ClientEvent::SessionExpired);
        self.events
            .emit(ClientEvent::NavigateToLogin { return_to: None });
        self.events.error("Session expired. Please log in again.");
    }

    fn lock_user(&self) -> MutexGuard<'_, Option<User>> {
        self.user.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
