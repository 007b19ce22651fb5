//! Profile command handler.

use anyhow::Result;
use plaza_core::Plaza;

use crate::cli::render;

pub async fn show(plaza: &Plaza, username: &str) -> Result<()> {
    let profile = plaza.load_profile(username).await?;
    let user = &profile.user;

    let name = format!("{} {}", user.first_name, user.last_name);
    if name.trim().is_empty() {
        println!("@{}", user.username);
    } else {
        println!("{} (@{})", name.trim(), user.username);
    }
    if let Some(bio) = user.bio.as_deref().filter(|b| !b.trim().is_empty()) {
        println!("{bio}");
    }
    if let Some(joined) = user.joined_at {
        println!("Joined {}", joined.format("%B %Y"));
    }

    println!();
    if profile.posts.is_empty() {
        println!("No posts yet.");
    } else {
        println!("Posts ({})", profile.posts.len());
        println!();
        render::posts(&profile.posts);
    }
    Ok(())
}
