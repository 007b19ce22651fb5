//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod feed;
pub mod posts;
pub mod profile;

/// The current invocation without the binary name, used as the
/// "come back here after login" hint.
pub(crate) fn return_to() -> String {
    std::env::args().skip(1).collect::<Vec<_>>().join(" ")
}
