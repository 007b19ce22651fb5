//! Forward-only feed pagination.
//!
//! [`FeedState`] is plain state with reducer-style transitions so the
//! in-flight and end-of-feed guards can be tested without a backend.
//! [`FeedController`] couples it with the API.

use std::sync::Arc;

use plaza_types::{Page, Post, PostId};

use crate::api::Api;
use crate::http::{ApiResult, HttpTransport, Transport};

pub const LOAD_FAILED: &str = "Failed to load posts";

#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    posts: Vec<Post>,
    /// Last page applied; 0 before the first load.
    current_page: u32,
    has_next_page: bool,
    in_flight: Option<u32>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            current_page: 0,
            has_next_page: true,
            in_flight: None,
        }
    }
}

impl FeedState {
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a reload from page 1, unless a load is already running.
    pub fn begin_first(&mut self) -> Option<u32> {
        if self.in_flight.is_some() {
            return None;
        }
        self.in_flight = Some(1);
        Some(1)
    }

    /// Returns the page to fetch next and marks it in flight, or `None`
    /// when a load is running or the feed is exhausted.
    pub fn begin_next(&mut self) -> Option<u32> {
        if self.in_flight.is_some() || !self.has_next_page {
            return None;
        }
        let page = self.current_page.saturating_add(1);
        self.in_flight = Some(page);
        Some(page)
    }

    /// Applies the outcome of fetching `page` and returns how many posts
    /// were added.
    ///
    /// Page 1 replaces the sequence; later pages are appended in fetch
    /// order without de-duplication. A response for a page that is not in
    /// flight is ignored. On failure existing posts and the page cursor
    /// stay as they were.
    ///
    /// # Errors
    /// Passes the fetch error through.
    pub fn finish(&mut self, page: u32, result: ApiResult<Page<Post>>) -> ApiResult<usize> {
        if self.in_flight != Some(page) {
            tracing::debug!(page, "Ignoring stale feed page");
            return Ok(0);
        }
        self.in_flight = None;

        let fetched = result?;
        let added = fetched.results.len();
        let has_next = fetched.has_next();
        if page == 1 {
            self.posts = fetched.results;
        } else {
            self.posts.extend(fetched.results);
        }
        self.current_page = page;
        self.has_next_page = has_next;
        Ok(added)
    }

    pub fn post_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == id)
    }

    /// Shows a freshly created post at the top.
    pub fn prepend(&mut self, post: Post) {
        self.posts.insert(0, post);
    }

    /// Drops a post after the backend confirmed its deletion.
    pub fn remove(&mut self, id: PostId) -> Option<Post> {
        let index = self.posts.iter().position(|p| p.id == id)?;
        Some(self.posts.remove(index))
    }
}

/// What a load request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Guarded out: already loading, or no further pages.
    Skipped,
    Loaded { page: u32, added: usize },
}

pub struct FeedController<T = HttpTransport> {
    api: Arc<Api<T>>,
    state: FeedState,
}

impl<T: Transport> FeedController<T> {
    pub fn new(api: Arc<Api<T>>) -> Self {
        Self {
            api,
            state: FeedState::default(),
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut FeedState {
        &mut self.state
    }

    pub fn posts(&self) -> &[Post] {
        self.state.posts()
    }

    /// Loads page 1, replacing whatever was shown.
    ///
    /// # Errors
    /// Returns the fetch error after announcing "Failed to load posts".
    pub async fn load_first(&mut self) -> ApiResult<LoadOutcome> {
        let Some(page) = self.state.begin_first() else {
            return Ok(LoadOutcome::Skipped);
        };
        self.load(page).await
    }

    /// Appends the next page. A no-op while a load is in flight or after
    /// the last page.
    ///
    /// # Errors
    /// Returns the fetch error after announcing "Failed to load posts".
    pub async fn load_next(&mut self) -> ApiResult<LoadOutcome> {
        let Some(page) = self.state.begin_next() else {
            return Ok(LoadOutcome::Skipped);
        };
        self.load(page).await
    }

    /// Passive trigger for "the viewport reached the end of the list".
    ///
    /// # Errors
    /// Same as [`FeedController::load_next`].
    pub async fn on_viewport_bottom(&mut self) -> ApiResult<LoadOutcome> {
        self.load_next().await
    }

    async fn load(&mut self, page: u32) -> ApiResult<LoadOutcome> {
        let result = self.api.list_posts(page).await;
        match self.state.finish(page, result) {
            Ok(added) => {
                tracing::debug!(page, added, "Feed page loaded");
                Ok(LoadOutcome::Loaded { page, added })
            }
            Err(err) => {
                tracing::warn!(page, error = %err, "Feed page failed");
                self.api.session().events().error(LOAD_FAILED);
                Err(err)
            }
        }
    }
}
