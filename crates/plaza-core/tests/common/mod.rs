//! Shared fixtures for plaza-core integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use plaza_core::Plaza;
use plaza_core::credentials::CredentialStore;
use plaza_core::events::{EventReceiver, EventSink};
use plaza_core::http::HttpTransport;
use plaza_types::TokenPair;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::MockServer;

pub struct Harness {
    pub plaza: Plaza,
    pub events: EventReceiver,
    pub credentials: PathBuf,
    _home: TempDir,
}

/// A client against `server` with an empty credential file.
pub fn client(server: &MockServer) -> Harness {
    client_with(server, |_| {})
}

/// A client whose credential file holds `access` / `refresh`.
pub fn logged_in_client(server: &MockServer, access: &str, refresh: &str) -> Harness {
    client_with(server, |store| {
        store
            .save(&TokenPair {
                access: access.to_string(),
                refresh: refresh.to_string(),
            })
            .unwrap();
    })
}

pub fn client_with(server: &MockServer, seed: impl FnOnce(&CredentialStore)) -> Harness {
    let home = TempDir::new().unwrap();
    let credentials = home.path().join("credentials.json");
    let store = CredentialStore::open(&credentials).unwrap();
    seed(&store);

    let transport = HttpTransport::new(&server.uri(), None).unwrap();
    let (sink, events) = EventSink::channel();
    Harness {
        plaza: Plaza::new(transport, store, sink),
        events,
        credentials,
        _home: home,
    }
}

pub fn user_json(id: u64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "first_name": "Ana",
        "last_name": "Lima",
        "bio": "",
        "profile_picture": null,
        "date_joined": "2024-05-01T12:00:00Z"
    })
}

pub fn post_json(id: u64, author_id: u64, likes: u64, liked: bool) -> Value {
    json!({
        "id": id,
        "author": { "id": author_id, "username": "ana", "profile_picture": null },
        "content": format!("post {id}"),
        "image": null,
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z",
        "likes_count": likes,
        "comments_count": 0,
        "is_liked": liked
    })
}

pub fn page_json(ids: impl IntoIterator<Item = u64>, next: Option<&str>) -> Value {
    let results: Vec<Value> = ids.into_iter().map(|id| post_json(id, 1, 0, false)).collect();
    json!({
        "count": null,
        "next": next,
        "previous": null,
        "results": results
    })
}
