//! Feed command handler.

use anyhow::Result;
use plaza_core::Plaza;

use crate::cli::render;

/// Loads `pages` pages (at least one) and prints them in order.
pub async fn show(plaza: &mut Plaza, pages: u32) -> Result<()> {
    plaza.feed.load_first().await?;
    for _ in 1..pages {
        if !plaza.feed.state().has_next_page() {
            break;
        }
        plaza.feed.on_viewport_bottom().await?;
    }

    let posts = plaza.feed.posts();
    if posts.is_empty() {
        println!("No posts yet.");
        return Ok(());
    }
    render::posts(posts);

    let state = plaza.feed.state();
    if state.has_next_page() {
        println!();
        println!(
            "More posts available: plaza feed --pages {}",
            state.current_page() + 1
        );
    }
    Ok(())
}
