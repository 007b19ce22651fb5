//! Client library for the plaza social network API.
//!
//! [`Plaza`] is the application root. It owns one shared
//! [`SessionContext`](context::SessionContext) and hands it to the auth
//! pipeline, the session manager and the feed and post controllers.

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod events;
pub mod feed;
pub mod http;
pub mod optimistic;
pub mod posts;
pub mod session;

pub use client::Plaza;
