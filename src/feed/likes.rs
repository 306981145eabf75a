use crate::api::{ApiClient, ApiError};
use crate::types::{LikeState, Post};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct Entry {
    state: LikeState,
    /// Bumped on every toggle; only the holder of the latest value may settle.
    seq: u64,
}

/// Per-post like state with optimistic toggling. When toggles overlap, the
/// last one issued decides the final state.
#[derive(Clone)]
pub struct LikeTracker {
    api: ApiClient,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl LikeTracker {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn seed(&self, post: &Post) -> LikeState {
        let state = LikeState {
            post_id: post.id.clone(),
            liked: post.liked_by_viewer.unwrap_or(false),
            count: post.like_count,
        };
        let mut entries = self.entries.lock();
        let entry = entries.entry(post.id.clone()).or_default();
        entry.state = state.clone();
        state
    }

    pub fn state(&self, post_id: &str) -> Option<LikeState> {
        self.entries.lock().get(post_id).map(|e| e.state.clone())
    }

    /// Reads the server's view of a post's likes and tracks it.
    pub async fn load(&self, post_id: &str) -> Result<LikeState, ApiError> {
        let state = self.server_state(post_id).await?;
        let mut entries = self.entries.lock();
        let entry = entries.entry(post_id.to_string()).or_default();
        entry.state = state.clone();
        Ok(state)
    }

    /// Records a like or unlike the server already accepted, without asking
    /// it for fresh numbers.
    pub fn assume(&self, post_id: &str, liked: bool) -> LikeState {
        let mut entries = self.entries.lock();
        let entry = entries.entry(post_id.to_string()).or_insert_with(|| Entry {
            state: LikeState {
                post_id: post_id.to_string(),
                liked: !liked,
                count: 0,
            },
            seq: 0,
        });
        if entry.state.liked != liked {
            entry.state.liked = liked;
            entry.state.count = if liked {
                entry.state.count.saturating_add(1)
            } else {
                entry.state.count.saturating_sub(1)
            };
        }
        entry.state.clone()
    }

    fn is_latest(&self, post_id: &str, seq: u64) -> bool {
        self.entries
            .lock()
            .get(post_id)
            .is_some_and(|e| e.seq == seq)
    }

    /// Flips the like immediately, then settles against the server. A toggle
    /// overtaken by a newer one returns the current state untouched.
    pub async fn toggle(&self, post_id: &str) -> Result<LikeState, ApiError> {
        self.api.signed_in_user()?;

        let (seq, before, optimistic) = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(post_id.to_string()).or_insert_with(|| Entry {
                state: LikeState {
                    post_id: post_id.to_string(),
                    ..LikeState::default()
                },
                seq: 0,
            });
            let before = entry.state.clone();
            entry.seq += 1;
            entry.state.liked = !before.liked;
            entry.state.count = if entry.state.liked {
                before.count.saturating_add(1)
            } else {
                before.count.saturating_sub(1)
            };
            (entry.seq, before, entry.state.clone())
        };

        let result = if optimistic.liked {
            self.api.like_post(post_id).await
        } else {
            self.api.unlike_post(post_id).await
        };

        if !self.is_latest(post_id, seq) {
            tracing::debug!(post_id, seq, "like toggle superseded by a newer one");
            return Ok(self.state(post_id).unwrap_or(optimistic));
        }

        match result {
            Ok(()) => {
                let settled = self.reconcile(&optimistic).await;
                let mut entries = self.entries.lock();
                let entry = entries.entry(post_id.to_string()).or_default();
                if entry.seq == seq {
                    entry.state = settled;
                }
                Ok(entry.state.clone())
            }
            Err(e) => {
                // `before` may be an earlier toggle's unsettled guess.
                let restored = match self.server_state(post_id).await {
                    Ok(state) => state,
                    Err(read_err) => {
                        tracing::debug!(post_id, error = %read_err, "like state unreadable; reverting");
                        before
                    }
                };
                tracing::warn!(post_id, error = %e, "like toggle failed");
                let mut entries = self.entries.lock();
                if let Some(entry) = entries.get_mut(post_id) {
                    if entry.seq == seq {
                        entry.state = restored;
                    }
                }
                Err(e)
            }
        }
    }

    async fn server_state(&self, post_id: &str) -> Result<LikeState, ApiError> {
        let count = self.api.like_count(post_id).await?;
        let liked = match self.api.viewer_id() {
            Some(_) => self.api.like_check(post_id).await?,
            None => false,
        };
        Ok(LikeState {
            post_id: post_id.to_string(),
            liked,
            count,
        })
    }

    /// Server values win; a failed read keeps the optimistic value.
    async fn reconcile(&self, optimistic: &LikeState) -> LikeState {
        let liked = match self.api.like_check(&optimistic.post_id).await {
            Ok(liked) => liked,
            Err(e) => {
                tracing::debug!(post_id = %optimistic.post_id, error = %e, "like check failed");
                optimistic.liked
            }
        };
        let count = match self.api.like_count(&optimistic.post_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!(post_id = %optimistic.post_id, error = %e, "like count failed");
                optimistic.count
            }
        };
        LikeState {
            post_id: optimistic.post_id.clone(),
            liked,
            count,
        }
    }
}
