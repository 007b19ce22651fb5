mod common;

use plaza_core::events::{self, ClientEvent, NoticeLevel};
use plaza_core::feed::LoadOutcome;
use plaza_core::http::{ApiErrorKind, FileUpload};
use plaza_core::posts::{LIKE_PROMPT, PostDraft};
use plaza_types::Post;
use serde_json::json;
use wiremock::matchers::{any, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{Harness, client, logged_in_client, page_json, post_json, user_json};

async fn logged_in(server: &MockServer, user_id: u64) -> Harness {
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(user_id, "ana")))
        .mount(server)
        .await;
    let mut h = logged_in_client(server, "acc", "ref");
    h.plaza.session.initialize().await;
    events::drain(&mut h.events);
    h
}

fn post(id: u64, author_id: u64, likes: u64, liked: bool) -> Post {
    serde_json::from_value(post_json(id, author_id, likes, liked)).unwrap()
}

fn notices(h: &mut Harness) -> Vec<(NoticeLevel, String)> {
    events::drain(&mut h.events)
        .into_iter()
        .filter_map(|e| match e {
            ClientEvent::Notice { level, message } => Some((level, message)),
            _ => None,
        })
        .collect()
}

/// Test: page 1 (10 posts, `next` set) then page 2 (4 posts, no `next`)
/// accumulate 14 posts in order and end the feed.
#[tokio::test]
async fn test_feed_accumulates_two_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(1..=10, Some("http://x/api/posts/?page=2"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(11..=14, None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = client(&server);
    let feed = &mut h.plaza.feed;
    assert_eq!(
        feed.load_first().await.unwrap(),
        LoadOutcome::Loaded { page: 1, added: 10 }
    );
    assert_eq!(
        feed.on_viewport_bottom().await.unwrap(),
        LoadOutcome::Loaded { page: 2, added: 4 }
    );
    // Exhausted: no third request.
    assert_eq!(feed.load_next().await.unwrap(), LoadOutcome::Skipped);

    let ids: Vec<u64> = feed.posts().iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..=14).collect::<Vec<_>>());
    assert!(!feed.state().has_next_page());
}

#[tokio::test]
async fn test_feed_failure_keeps_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(1..=2, Some("http://x/?page=2"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut h = client(&server);
    h.plaza.feed.load_first().await.unwrap();
    let err = h.plaza.feed.load_next().await.unwrap_err();

    assert_eq!(err.status, Some(503));
    assert_eq!(h.plaza.feed.posts().len(), 2);
    assert_eq!(h.plaza.feed.state().current_page(), 1);
    assert_eq!(
        notices(&mut h),
        vec![
            (
                NoticeLevel::Error,
                "Request failed with status code 503".to_string()
            ),
            (NoticeLevel::Error, "Failed to load posts".to_string()),
        ]
    );
}

/// Test: like succeeds and the flag follows the backend's answer.
#[tokio::test]
async fn test_like_commits_and_reconciles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/5/like/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"liked": true})))
        .expect(1)
        .mount(&server)
        .await;

    let h = logged_in(&server, 1).await;
    let mut post = post(5, 2, 5, false);
    let liked = h.plaza.posts.toggle_like(&mut post, Some("/")).await.unwrap();

    assert!(liked);
    assert!(post.viewer_has_liked);
    assert_eq!(post.like_count, 6);
}

/// Test: the pending like is visible as {true, 6} while the request is
/// out, and a failure reverts to exactly {false, 5} after announcing the
/// backend's message.
#[tokio::test]
async fn test_like_failure_rolls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/5/like/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = logged_in(&server, 1).await;
    let mut post = post(5, 2, 5, false);

    let pending = h.plaza.posts.begin_like(&mut post, None).unwrap();
    assert_eq!(pending.post_id(), 5);
    assert!(post.viewer_has_liked);
    assert_eq!(post.like_count, 6);
    let sent = server.received_requests().await.unwrap();
    assert!(sent.iter().all(|r| r.url.path() != "/posts/5/like/"));

    let reply = h.plaza.posts.send_like(pending).await;
    // Still pending until settled.
    assert_eq!(post.like_count, 6);

    let err = reply.settle(&mut post).unwrap_err();
    assert_eq!(err.status, Some(500));
    assert!(!post.viewer_has_liked);
    assert_eq!(post.like_count, 5);
    assert_eq!(
        notices(&mut h),
        vec![
            (NoticeLevel::Error, "db down".to_string()),
            (NoticeLevel::Error, "Failed to update like".to_string()),
        ]
    );
}

/// Test: anonymous like and comment redirect to login with zero backend calls.
#[tokio::test]
async fn test_anonymous_mutations_make_no_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut h = client(&server);
    h.plaza.session.initialize().await;

    let mut post = post(5, 2, 5, false);
    let err = h
        .plaza
        .posts
        .toggle_like(&mut post, Some("/posts/5"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::AuthRequired);
    assert_eq!(post.like_count, 5);
    assert!(!post.viewer_has_liked);

    let mut comments = Vec::new();
    let err = h
        .plaza
        .posts
        .add_comment(&mut comments, 5, "hello", Some("/posts/5"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::AuthRequired);
    assert!(comments.is_empty());

    assert_eq!(
        events::drain(&mut h.events),
        vec![
            ClientEvent::NavigateToLogin {
                return_to: Some("/posts/5".to_string())
            },
            ClientEvent::Notice {
                level: NoticeLevel::Info,
                message: LIKE_PROMPT.to_string()
            },
            ClientEvent::NavigateToLogin {
                return_to: Some("/posts/5".to_string())
            },
            ClientEvent::Notice {
                level: NoticeLevel::Info,
                message: "Please log in to comment.".to_string()
            },
        ]
    );
}

/// Test: a failed delete leaves the post in the feed.
#[tokio::test]
async fn test_delete_failure_keeps_post() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(1..=3, None)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/posts/2/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = logged_in(&server, 1).await;
    h.plaza.feed.load_first().await.unwrap();
    let Harness { plaza, .. } = &mut h;
    let err = plaza
        .posts
        .delete_from_feed(plaza.feed.state_mut(), 2, None)
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(500));
    assert!(h.plaza.feed.posts().iter().any(|p| p.id == 2));
    assert_eq!(
        notices(&mut h),
        vec![
            (
                NoticeLevel::Error,
                "Request failed with status code 500".to_string()
            ),
            (NoticeLevel::Error, "Failed to delete post".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_delete_success_removes_after_ack() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(1..=3, None)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/posts/2/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = logged_in(&server, 1).await;
    h.plaza.feed.load_first().await.unwrap();
    let Harness { plaza, .. } = &mut h;
    plaza
        .posts
        .delete_from_feed(plaza.feed.state_mut(), 2, None)
        .await
        .unwrap();

    let ids: Vec<u64> = h.plaza.feed.posts().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

/// Test: someone else's post cannot be deleted and no request is sent.
#[tokio::test]
async fn test_non_owner_delete_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let h = logged_in(&server, 1).await;
    let theirs = post(4, 99, 0, false);
    assert!(!h.plaza.posts.is_owner(&theirs));

    let err = h.plaza.posts.delete_post(&theirs, None).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Forbidden);
}

#[tokio::test]
async fn test_comment_appended_after_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/5/comments/"))
        .and(body_json(json!({"content": "nice"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 11,
            "author": {"id": 1, "username": "ana"},
            "content": "nice",
            "created_at": "2024-05-01T12:00:00Z",
            "post": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = logged_in(&server, 1).await;
    let mut comments = Vec::new();

    let blank = h
        .plaza
        .posts
        .add_comment(&mut comments, 5, "   ", None)
        .await
        .unwrap();
    assert!(blank.is_none());

    let added = h
        .plaza
        .posts
        .add_comment(&mut comments, 5, "  nice ", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(added.id, 11);
    assert_eq!(added.post_id, 5);
    assert_eq!(comments, vec![added]);
    assert_eq!(
        notices(&mut h),
        vec![(NoticeLevel::Success, "Comment added!".to_string())]
    );
}

#[tokio::test]
async fn test_create_post_sends_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(post_json(40, 1, 0, false)))
        .expect(1)
        .mount(&server)
        .await;

    let mut h = logged_in(&server, 1).await;
    let draft = PostDraft::new("hello").with_image(FileUpload {
        file_name: "cat.png".to_string(),
        mime_type: "image/png".to_string(),
        data: vec![1u8, 2, 3].into(),
    });
    let created = h.plaza.posts.create_post(&draft).await.unwrap();
    assert_eq!(created.id, 40);

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/posts/")
        .unwrap();
    let content_type = create
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&create.body);
    assert!(body.contains("name=\"content\""));
    assert!(body.contains("filename=\"cat.png\""));

    assert_eq!(
        notices(&mut h),
        vec![(NoticeLevel::Success, "Post created successfully!".to_string())]
    );
}

#[tokio::test]
async fn test_empty_post_rejected_without_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut h = logged_in(&server, 1).await;
    let err = h
        .plaza
        .posts
        .create_post(&PostDraft::new("  "))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Validation);
    assert_eq!(
        notices(&mut h),
        vec![(
            NoticeLevel::Error,
            "Please add some content or an image".to_string()
        )]
    );
}

/// Test: a missing profile is reported to the caller but not announced.
#[tokio::test]
async fn test_missing_profile_is_inline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles/ghost/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profiles/ana/"))
        .respond_with(ResponseTemplate::new(200).set_body_json({
            let mut profile = user_json(1, "ana");
            profile["posts"] = json!([post_json(1, 1, 2, true)]);
            profile
        }))
        .mount(&server)
        .await;

    let mut h = client(&server);
    let err = h.plaza.load_profile("ghost").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::NotFound);
    assert!(events::drain(&mut h.events).is_empty());

    let profile = h.plaza.load_profile("ana").await.unwrap();
    assert_eq!(profile.user.username, "ana");
    assert_eq!(profile.posts.len(), 1);
    assert!(profile.posts[0].viewer_has_liked);
}
