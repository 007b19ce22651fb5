//! Terminal rendering for posts, comments and client events.

use plaza_core::events::{self, ClientEvent, EventReceiver, NoticeLevel};
use plaza_types::{Comment, Post};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Prints every queued client event to stderr.
pub fn events(rx: &mut EventReceiver) {
    for event in events::drain(rx) {
        match event {
            ClientEvent::Notice { level, message } => match level {
                NoticeLevel::Success => eprintln!("✓ {message}"),
                NoticeLevel::Info => eprintln!("  {message}"),
                NoticeLevel::Error => eprintln!("! {message}"),
            },
            ClientEvent::SessionExpired => {}
            ClientEvent::NavigateToLogin { return_to } => match return_to {
                Some(command) if !command.is_empty() => {
                    eprintln!("  Run `plaza login`, then `plaza {command}` again.");
                }
                _ => eprintln!("  Run `plaza login` to sign in."),
            },
        }
    }
}

pub fn post(post: &Post) {
    println!(
        "#{} @{} · {}",
        post.id,
        post.author.username,
        post.created_at.format(TIME_FORMAT)
    );
    if !post.content.trim().is_empty() {
        println!("{}", post.content.trim_end());
    }
    if let Some(image) = &post.image {
        println!("[image] {image}");
    }
    let liked = if post.viewer_has_liked { " (liked)" } else { "" };
    println!(
        "{} likes{liked} · {} comments",
        post.like_count, post.comment_count
    );
}

pub fn posts(posts: &[Post]) {
    for (i, p) in posts.iter().enumerate() {
        if i > 0 {
            println!();
        }
        post(p);
    }
}

pub fn comment(comment: &Comment) {
    println!(
        "  @{} · {}: {}",
        comment.author.username,
        comment.created_at.format(TIME_FORMAT),
        comment.content
    );
}
