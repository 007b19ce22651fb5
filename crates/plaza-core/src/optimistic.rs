//! Snapshot / apply / commit-or-rollback for optimistic mutations.
//!
//! A [`Transaction`] captures the target's snapshot, applies the change
//! immediately and then either commits (drops the snapshot) or rolls the
//! target back to exactly the captured state.

use plaza_types::Post;

/// State that can be captured and restored exactly.
pub trait Reversible {
    type Snapshot;

    fn snapshot(&self) -> Self::Snapshot;
    fn restore(&mut self, snapshot: Self::Snapshot);
}

/// An applied but unconfirmed change.
#[must_use = "a transaction must be committed or rolled back"]
#[derive(Debug)]
pub struct Transaction<S: Reversible> {
    snapshot: S::Snapshot,
}

impl<S: Reversible> Transaction<S> {
    /// Snapshots `target`, then applies `change` to it.
    pub fn begin(target: &mut S, change: impl FnOnce(&mut S)) -> Self {
        let snapshot = target.snapshot();
        change(target);
        Self { snapshot }
    }

    /// Keeps the applied change.
    pub fn commit(self) {}

    /// Puts `target` back to the state captured by [`Transaction::begin`].
    pub fn rollback(self, target: &mut S) {
        target.restore(self.snapshot);
    }
}

/// The viewer's like flag together with the visible like count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

impl LikeState {
    /// Flips the flag and moves the count by one. Never underflows.
    pub fn toggle(&mut self) {
        self.liked = !self.liked;
        self.count = if self.liked {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
    }

    pub fn of(post: &Post) -> Self {
        Self {
            liked: post.viewer_has_liked,
            count: post.like_count,
        }
    }

    pub fn apply_to(self, post: &mut Post) {
        post.viewer_has_liked = self.liked;
        post.like_count = self.count;
    }
}

impl Reversible for LikeState {
    type Snapshot = LikeState;

    fn snapshot(&self) -> LikeState {
        *self
    }

    fn restore(&mut self, snapshot: LikeState) {
        *self = snapshot;
    }
}

/// Only the like fields of a post take part in a like transaction.
impl Reversible for Post {
    type Snapshot = LikeState;

    fn snapshot(&self) -> LikeState {
        LikeState::of(self)
    }

    fn restore(&mut self, snapshot: LikeState) {
        snapshot.apply_to(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: {false, 5} becomes {true, 6} on begin and returns to exactly
    /// {false, 5} on rollback.
    #[test]
    fn test_like_rollback_restores_exact_state() {
        let mut state = LikeState {
            liked: false,
            count: 5,
        };
        let tx = Transaction::begin(&mut state, LikeState::toggle);
        assert_eq!(
            state,
            LikeState {
                liked: true,
                count: 6
            }
        );

        tx.rollback(&mut state);
        assert_eq!(
            state,
            LikeState {
                liked: false,
                count: 5
            }
        );
    }

    #[test]
    fn test_commit_keeps_change() {
        let mut state = LikeState {
            liked: true,
            count: 1,
        };
        Transaction::begin(&mut state, LikeState::toggle).commit();
        assert_eq!(
            state,
            LikeState {
                liked: false,
                count: 0
            }
        );
    }

    #[test]
    fn test_unlike_at_zero_saturates() {
        let mut state = LikeState {
            liked: true,
            count: 0,
        };
        state.toggle();
        assert_eq!(state.count, 0);
        assert!(!state.liked);
    }
}
