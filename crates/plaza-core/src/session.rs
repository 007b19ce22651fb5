//! Auth session lifecycle.
//!
//! ```text
//! Uninitialized -> Restoring -> { Authenticated, Anonymous }
//! Authenticated -> Anonymous   (logout, forced expiry)
//! Anonymous     -> Authenticated (login)
//! ```
//!
//! Once restore has finished, `Authenticated` vs `Anonymous` is derived
//! from whether the shared context holds a user.

use std::sync::{Arc, LazyLock};

use plaza_types::{Credentials, Registration, User};
use regex::Regex;

use crate::api::Api;
use crate::context::SessionContext;
use crate::http::{ApiError, ApiErrorKind, ApiResult, FieldErrors, HttpTransport, Transport};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Uninitialized,
    Restoring,
    Authenticated,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Restoring,
    Ready,
}

pub struct SessionManager<T = HttpTransport> {
    api: Arc<Api<T>>,
    phase: Phase,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(api: Arc<Api<T>>) -> Self {
        Self {
            api,
            phase: Phase::Uninitialized,
        }
    }

    fn session(&self) -> &Arc<SessionContext> {
        self.api.session()
    }

    pub fn state(&self) -> AuthState {
        match self.phase {
            Phase::Uninitialized => AuthState::Uninitialized,
            Phase::Restoring => AuthState::Restoring,
            Phase::Ready if self.session().is_authenticated() => AuthState::Authenticated,
            Phase::Ready => AuthState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.session().current_user()
    }

    /// Restores a persisted session, validating it against the backend.
    ///
    /// Shows the cached user right away, then confirms it with
    /// `/users/me/`. Any failure wipes the stored credentials. Always ends
    /// in `Authenticated` or `Anonymous`; later calls are no-ops.
    pub async fn initialize(&mut self) -> AuthState {
        if self.phase == Phase::Ready {
            return self.state();
        }
        self.phase = Phase::Restoring;

        let session = Arc::clone(self.session());
        if session.store().load().is_some() {
            if let Some(cached) = session.store().cached_user() {
                session.set_user(Some(cached));
            }

            match self.api.current_user().await {
                Ok(user) => {
                    if let Err(e) = session.store().save_user(&user) {
                        tracing::warn!("Failed to cache user record: {e:#}");
                    }
                    tracing::info!(user = %user.username, "Session restored");
                    session.set_user(Some(user));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Stored session rejected; clearing credentials");
                    session.clear();
                }
            }
        } else {
            // Half a session is no session.
            session.clear();
        }

        self.phase = Phase::Ready;
        self.state()
    }

    /// Exchanges credentials for tokens and loads the current user.
    ///
    /// # Errors
    /// Local validation errors are returned without contacting the
    /// backend. Backend failures carry a user-facing message taken from
    /// the payload's `detail`, or "Login failed".
    pub async fn login(&mut self, credentials: &Credentials) -> ApiResult<User> {
        validate_credentials(credentials)?;
        let session = Arc::clone(self.session());

        let tokens = match self.api.obtain_tokens(credentials).await {
            Ok(tokens) => tokens,
            Err(err) => {
                let message = err.detail().unwrap_or("Login failed").to_string();
                tracing::info!(error = %err, "Login rejected");
                session.events().error(message.clone());
                return Err(err.with_message(message));
            }
        };

        if let Err(e) = session.store().save(&tokens) {
            session.events().error("Login failed");
            return Err(ApiError::storage(&e));
        }

        let user = match self.api.current_user().await {
            Ok(user) => user,
            Err(err) => {
                session.clear();
                return Err(err);
            }
        };
        if let Err(e) = session.store().save_user(&user) {
            tracing::warn!("Failed to cache user record: {e:#}");
        }

        session.set_user(Some(user.clone()));
        self.phase = Phase::Ready;
        tracing::info!(user = %user.username, "Logged in");
        session.events().success("Login successful!");
        Ok(user)
    }

    /// Clears credentials and the in-memory user. Never contacts the backend.
    pub fn logout(&mut self) {
        let session = Arc::clone(self.session());
        session.clear();
        self.phase = Phase::Ready;
        tracing::info!("Logged out");
        session.events().success("Logged out successfully");
    }

    /// Creates an account. The caller logs in separately afterwards.
    ///
    /// # Errors
    /// Validation errors (local or from the backend) carry per-field
    /// messages; other failures are announced and returned.
    pub async fn register(&self, registration: &Registration) -> ApiResult<User> {
        validate_registration(registration)?;
        let events = self.session().events();

        match self.api.register(registration).await {
            Ok(user) => {
                tracing::info!(user = %user.username, "Registered");
                events.success("Account created successfully! Please log in.");
                Ok(user)
            }
            Err(err) if err.kind == ApiErrorKind::Validation => Err(err),
            Err(err) => {
                events.error("Registration failed. Please try again.");
                Err(err)
            }
        }
    }
}

fn require(fields: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }
}

/// Checks login input before any request is made.
///
/// # Errors
/// Returns a validation error listing every missing field.
pub fn validate_credentials(credentials: &Credentials) -> ApiResult<()> {
    let mut fields = FieldErrors::new();
    require(&mut fields, "email", &credentials.email, "Email is required");
    require(&mut fields, "password", &credentials.password, "Password is required");
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(fields))
    }
}

/// Checks registration input before any request is made.
///
/// # Errors
/// Returns a validation error keyed by field name.
pub fn validate_registration(registration: &Registration) -> ApiResult<()> {
    let mut fields = FieldErrors::new();
    let mut reject = |field: &str, message: &str| {
        fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    };

    let username = registration.username.trim();
    if username.is_empty() {
        reject("username", "Username is required");
    } else if username.chars().count() < MIN_USERNAME_LEN {
        reject("username", "Username must be at least 3 characters");
    }

    let email = registration.email.trim();
    if email.is_empty() {
        reject("email", "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        reject("email", "Please enter a valid email address");
    }

    if registration.password.is_empty() {
        reject("password", "Password is required");
    } else if registration.password.chars().count() < MIN_PASSWORD_LEN {
        reject("password", "Password must be at least 8 characters");
    }

    if registration.first_name.trim().is_empty() {
        reject("first_name", "First name is required");
    }
    if registration.last_name.trim().is_empty() {
        reject("last_name", "Last name is required");
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(fields))
    }
}
