use super::{decode, seg, ApiClient, ApiError};
use crate::session::PendingRequest;
use crate::types::{Comment, CommentAuthor};
use serde_json::{json, Value};

fn comment_text(text: &str) -> Result<&str, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::InvalidInput("comment text is empty".to_string()));
    }
    Ok(text)
}

fn decode_comment(body: &Value, post_id: &str) -> Result<Comment, ApiError> {
    let record = body.get("comment").unwrap_or(body);
    decode::comment(record, post_id)
        .ok_or_else(|| ApiError::Decode("response carried no comment".to_string()))
}

impl ApiClient {
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, ApiError> {
        let body = self
            .execute_json(PendingRequest::get(format!("/posts/{}/comments", seg(post_id))))
            .await?;
        Ok(decode::comments(&body, post_id))
    }

    /// The author of a fresh comment is the signed-in user, whatever shape
    /// the backend echoes back.
    pub async fn add_comment(&self, post_id: &str, text: &str) -> Result<Comment, ApiError> {
        let text = comment_text(text)?;
        let user = self.signed_in_user()?;
        let body = self
            .execute_json(
                PendingRequest::post(format!("/posts/{}/comments", seg(post_id)))
                    .json(json!({ "userId": user.id, "text": text })),
            )
            .await?;
        let mut comment = decode_comment(&body, post_id)?;
        comment.author = CommentAuthor::Named {
            id: Some(user.id),
            username: user.username,
        };
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<Comment, ApiError> {
        let text = comment_text(text)?;
        let body = self
            .execute_json(
                PendingRequest::put(format!(
                    "/posts/{}/comments/{}",
                    seg(post_id),
                    seg(comment_id)
                ))
                .json(json!({ "text": text })),
            )
            .await?;
        decode_comment(&body, post_id)
    }

    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), ApiError> {
        self.execute_unit(PendingRequest::delete(format!(
            "/posts/{}/comments/{}",
            seg(post_id),
            seg(comment_id)
        )))
        .await
    }
}
