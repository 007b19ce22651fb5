//! Post, like and comment command handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use plaza_core::Plaza;
use plaza_core::http::FileUpload;
use plaza_core::posts::{DELETE_PROMPT, LIKE_PROMPT, PostDraft};
use plaza_types::PostId;

use super::return_to;
use crate::cli::render;

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn read_image(path: &str) -> Result<FileUpload> {
    let path = Path::new(path);
    let data = fs::read(path).with_context(|| format!("read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(FileUpload {
        file_name,
        mime_type: mime_type(path).to_string(),
        data: data.into(),
    })
}

fn draft(content: String, image: Option<&str>) -> Result<PostDraft> {
    let mut draft = PostDraft::new(content);
    if let Some(path) = image {
        draft = draft.with_image(read_image(path)?);
    }
    Ok(draft)
}

pub async fn show(plaza: &Plaza, id: PostId) -> Result<()> {
    let post = plaza.posts.load_post(id).await?;
    render::post(&post);

    let comments = plaza.posts.load_comments(id).await?;
    if !comments.is_empty() {
        println!();
        for comment in &comments {
            render::comment(comment);
        }
    }
    Ok(())
}

pub async fn create(plaza: &Plaza, content: String, image: Option<&str>) -> Result<()> {
    let post = plaza.posts.create_post(&draft(content, image)?).await?;
    render::post(&post);
    Ok(())
}

/// Sends an anonymous actor to login before anything is fetched.
fn require_login(plaza: &Plaza, prompt: &str) -> Result<()> {
    plaza.context().require_user(Some(&return_to()), prompt)?;
    Ok(())
}

pub async fn edit(plaza: &Plaza, id: PostId, content: String, image: Option<&str>) -> Result<()> {
    require_login(plaza, DELETE_PROMPT)?;
    let draft = draft(content, image)?;
    let mut post = plaza.posts.load_post(id).await?;
    plaza
        .posts
        .update_post(&mut post, &draft, Some(&return_to()))
        .await?;
    render::post(&post);
    Ok(())
}

pub async fn delete(plaza: &Plaza, id: PostId) -> Result<()> {
    require_login(plaza, DELETE_PROMPT)?;
    let post = plaza.posts.load_post(id).await?;
    plaza.posts.delete_post(&post, Some(&return_to())).await?;
    Ok(())
}

pub async fn like(plaza: &Plaza, id: PostId) -> Result<()> {
    require_login(plaza, LIKE_PROMPT)?;
    let mut post = plaza.posts.load_post(id).await?;
    let pending = plaza.posts.begin_like(&mut post, Some(&return_to()))?;
    let verb = if post.viewer_has_liked { "Liking" } else { "Unliking" };
    println!("{verb} post #{id} ({} likes)...", post.like_count);

    let liked = plaza.posts.send_like(pending).await.settle(&mut post)?;
    let verb = if liked { "Liked" } else { "Unliked" };
    println!("{verb} post #{id} ({} likes)", post.like_count);
    Ok(())
}

pub async fn comments(plaza: &Plaza, id: PostId) -> Result<()> {
    let comments = plaza.posts.load_comments(id).await?;
    if comments.is_empty() {
        println!("No comments yet.");
    }
    for comment in &comments {
        render::comment(comment);
    }
    Ok(())
}

pub async fn comment(plaza: &Plaza, id: PostId, text: &str) -> Result<()> {
    let mut comments = Vec::new();
    match plaza
        .posts
        .add_comment(&mut comments, id, text, Some(&return_to()))
        .await?
    {
        Some(comment) => render::comment(&comment),
        None => println!("Nothing to post: the comment is empty."),
    }
    Ok(())
}
