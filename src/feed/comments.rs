use crate::api::{ApiClient, ApiError};
use crate::types::{Comment, CommentAuthor};
use std::collections::HashMap;

pub const UNKNOWN_AUTHOR: &str = "unknown";

pub fn author_name(author: &CommentAuthor) -> &str {
    match author {
        CommentAuthor::Named { username, .. } => username,
        CommentAuthor::Id { .. } | CommentAuthor::Unknown => UNKNOWN_AUTHOR,
    }
}

/// Comments of one post with their authors resolved to display names.
pub struct CommentThread {
    api: ApiClient,
    post_id: String,
    comments: Vec<Comment>,
    /// `None` marks an id that failed to resolve; it is not retried.
    names: HashMap<String, Option<String>>,
}

impl CommentThread {
    pub fn new(api: ApiClient, post_id: impl Into<String>) -> Self {
        Self {
            api,
            post_id: post_id.into(),
            comments: Vec::new(),
            names: HashMap::new(),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub async fn load(&mut self) -> Result<&[Comment], ApiError> {
        let mut comments = self.api.list_comments(&self.post_id).await?;
        for comment in &mut comments {
            self.resolve(comment).await;
        }
        self.comments = comments;
        Ok(&self.comments)
    }

    async fn resolve(&mut self, comment: &mut Comment) {
        let CommentAuthor::Id { id } = &comment.author else {
            return;
        };
        let id = id.clone();

        if !self.names.contains_key(&id) {
            let name = match self.api.get_user(&id).await {
                Ok(user) if !user.username.is_empty() => Some(user.username),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(user_id = %id, error = %e, "could not resolve comment author");
                    None
                }
            };
            self.names.insert(id.clone(), name);
        }

        if let Some(Some(username)) = self.names.get(&id) {
            comment.author = CommentAuthor::Named {
                id: Some(id),
                username: username.clone(),
            };
        }
    }

    pub async fn add(&mut self, text: &str) -> Result<&Comment, ApiError> {
        let mut comment = self.api.add_comment(&self.post_id, text).await?;
        self.resolve(&mut comment).await;
        self.comments.push(comment);
        let index = self.comments.len() - 1;
        Ok(&self.comments[index])
    }

    pub async fn edit(&mut self, comment_id: &str, text: &str) -> Result<&Comment, ApiError> {
        let mut updated = self
            .api
            .update_comment(&self.post_id, comment_id, text)
            .await?;

        let existing = self.comments.iter().position(|c| c.id == comment_id);
        let known_author = existing
            .map(|i| self.comments[i].author.clone())
            .filter(|a| matches!(a, CommentAuthor::Named { .. }));
        match known_author {
            // Keep an already resolved author over a bare id echo.
            Some(author) if !matches!(updated.author, CommentAuthor::Named { .. }) => {
                updated.author = author;
            }
            _ => self.resolve(&mut updated).await,
        }

        let index = match existing {
            Some(i) => {
                self.comments[i] = updated;
                i
            }
            None => {
                self.comments.push(updated);
                self.comments.len() - 1
            }
        };
        Ok(&self.comments[index])
    }

    pub async fn remove(&mut self, comment_id: &str) -> Result<(), ApiError> {
        self.api.delete_comment(&self.post_id, comment_id).await?;
        self.comments.retain(|c| c.id != comment_id);
        Ok(())
    }
}
