//! Normalizes the backend's JSON into typed records.
//!
//! The backend is not consistent about field names (`_id` vs `id`, `imgUrl`
//! vs `imageUrl`, likes as a number or as a list of likers, comment authors as
//! ids, names or embedded users). Every variant is handled here so nothing
//! downstream has to probe for fields.

use crate::types::{AuthTokens, Comment, CommentAuthor, Post, UserProfile};
use serde::Deserialize;
use serde_json::{Map, Value};

fn read_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn read_first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| read_string(obj.get(*key)))
}

fn read_id_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        other => read_string(Some(other)),
    }
}

fn read_id(obj: &Map<String, Value>) -> Option<String> {
    read_id_value(obj.get("_id")).or_else(|| read_id_value(obj.get("id")))
}

/// Accepts a bare array or an object wrapping it under one of `keys`.
fn list_items<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    match value {
        Value::Array(items) => items,
        Value::Object(obj) => keys
            .iter()
            .find_map(|key| obj.get(*key).and_then(|v| v.as_array()))
            .map(|items| items.as_slice())
            .unwrap_or(&[]),
        _ => &[],
    }
}

pub fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => read_first_string(&obj, &["message", "error"]),
        Ok(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Ok(_) => None,
        // Plain-text error pages; keep short ones, they are usually a sentence.
        Err(_) => (body.len() <= 200 && !body.starts_with('<')).then(|| body.to_string()),
    }
}

pub fn user_profile(value: &Value) -> Option<UserProfile> {
    let obj = value.as_object()?;
    let id = read_id(obj).unwrap_or_default();
    let username = read_first_string(obj, &["username", "name"]).unwrap_or_default();
    if id.is_empty() && username.is_empty() {
        return None;
    }
    Some(UserProfile {
        id,
        username,
        email: read_string(obj.get("email")).unwrap_or_default(),
        password_echo: read_string(obj.get("password")).unwrap_or_default(),
        img_url: read_first_string(obj, &["imgUrl", "imageUrl"]).unwrap_or_default(),
    })
}

fn tokens_from(obj: &Map<String, Value>) -> Option<AuthTokens> {
    Some(AuthTokens {
        access_token: read_string(obj.get("accessToken"))?,
        refresh_token: read_string(obj.get("refreshToken")),
    })
}

/// Login responses carry the tokens next to the profile fields, or the
/// profile nested under `user`.
pub fn auth_response(value: &Value) -> Option<(AuthTokens, Option<UserProfile>)> {
    let obj = value.as_object()?;
    let tokens = tokens_from(obj)?;
    let user = match obj.get("user") {
        Some(nested @ Value::Object(_)) => user_profile(nested),
        _ => user_profile(value),
    };
    Some((tokens, user))
}

pub fn refreshed_tokens(value: &Value) -> Option<AuthTokens> {
    tokens_from(value.as_object()?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireLikes {
    Count(u64),
    Likers(Vec<Value>),
}

fn liker_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => read_id(obj),
        other => read_id_value(Some(other)),
    }
}

fn owner_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(obj) => read_id(obj),
        other => read_id_value(Some(other)),
    }
}

pub fn post(value: &Value, viewer_id: Option<&str>) -> Option<Post> {
    let obj = value.as_object()?;
    let id = read_id(obj)?;

    let (like_count, liked_by_viewer) = match obj
        .get("likes")
        .cloned()
        .map(serde_json::from_value::<WireLikes>)
    {
        Some(Ok(WireLikes::Count(n))) => (n, None),
        Some(Ok(WireLikes::Likers(likers))) => {
            let liked = viewer_id.map(|viewer| {
                likers
                    .iter()
                    .filter_map(liker_id)
                    .any(|liker| liker == viewer)
            });
            (likers.len() as u64, liked)
        }
        Some(Err(_)) | None => (0, None),
    };

    Some(Post {
        id,
        owner_id: owner_id(obj.get("owner")),
        title: read_string(obj.get("title")).unwrap_or_default(),
        content: read_string(obj.get("content")).unwrap_or_default(),
        img_url: read_first_string(obj, &["imgUrl", "imageUrl"]),
        like_count,
        liked_by_viewer,
    })
}

pub fn posts(value: &Value, viewer_id: Option<&str>) -> Vec<Post> {
    let items = list_items(value, &["posts", "data"]);
    let decoded: Vec<Post> = items.iter().filter_map(|v| post(v, viewer_id)).collect();
    if decoded.len() < items.len() {
        tracing::warn!(
            skipped = items.len() - decoded.len(),
            "skipped malformed posts in response"
        );
    }
    decoded
}

/// `owner` and `userId` hold ids that still need resolving; `user` holds the
/// display name. An embedded user object is already resolved.
fn comment_author(obj: &Map<String, Value>) -> CommentAuthor {
    for key in ["owner", "userId", "user"] {
        match obj.get(key) {
            Some(Value::Object(user)) => {
                if let Some(username) = read_first_string(user, &["username", "name"]) {
                    return CommentAuthor::Named {
                        id: read_id(user),
                        username,
                    };
                }
                if let Some(id) = read_id(user) {
                    return CommentAuthor::Id { id };
                }
            }
            Some(value) => {
                let Some(text) = read_id_value(Some(value)) else {
                    continue;
                };
                return if key == "user" {
                    CommentAuthor::Named {
                        id: None,
                        username: text,
                    }
                } else {
                    CommentAuthor::Id { id: text }
                };
            }
            None => {}
        }
    }
    CommentAuthor::Unknown
}

pub fn comment(value: &Value, post_id: &str) -> Option<Comment> {
    let obj = value.as_object()?;
    Some(Comment {
        id: read_id(obj)?,
        post_id: read_first_string(obj, &["postId", "post"]).unwrap_or_else(|| post_id.to_string()),
        text: read_first_string(obj, &["text", "content"]).unwrap_or_default(),
        author: comment_author(obj),
    })
}

pub fn comments(value: &Value, post_id: &str) -> Vec<Comment> {
    let items = list_items(value, &["comments", "data"]);
    let decoded: Vec<Comment> = items.iter().filter_map(|v| comment(v, post_id)).collect();
    if decoded.len() < items.len() {
        tracing::warn!(
            skipped = items.len() - decoded.len(),
            post_id,
            "skipped malformed comments in response"
        );
    }
    decoded
}

pub fn like_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::Object(obj) => ["count", "likes", "likeCount"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(|v| v.as_u64())),
        _ => None,
    }
}

pub fn like_check(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Object(obj) => ["liked", "isLiked", "hasLiked"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(|v| v.as_bool())),
        _ => None,
    }
}
