use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignOutReason {
    UserLogout,
    RefreshFailed,
    AccountDeleted,
    ProfileUnavailable,
}

/// Cached copy of the signed-in user's profile. The backend owns the real one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "password", skip_serializing_if = "String::is_empty")]
    pub password_echo: String,
    pub img_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    /// `None` when the backend did not rotate the refresh token.
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub owner_id: Option<String>,
    pub title: String,
    pub content: String,
    pub img_url: Option<String>,
    pub like_count: u64,
    /// Only known when the backend sends the list of likers.
    pub liked_by_viewer: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommentAuthor {
    Named {
        id: Option<String>,
        username: String,
    },
    Id {
        id: String,
    },
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub text: String,
    pub author: CommentAuthor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub post_id: String,
    pub liked: bool,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image: Option<ImageUpload>,
    /// Existing image to keep when no new file is attached.
    pub img_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotSignedIn,
    NotFound,
    Rejected,
    Network,
    InvalidInput,
    Storage,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyError {
    pub code: ErrorCode,
    pub message: String,
}

/// Envelope printed by the command line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Ok { ok: bool, value: T },
    Err { ok: bool, error: ReplyError },
}

impl<T> Reply<T> {
    pub fn ok(value: T) -> Self {
        Self::Ok { ok: true, value }
    }

    pub fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Err {
            ok: false,
            error: ReplyError {
                code,
                message: message.into(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_profile_round_trips_through_storage_json() {
        let user = UserProfile {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_echo: String::new(),
            img_url: "avatar.png".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["imgUrl"], "avatar.png");
        assert!(json.get("password").is_none());

        let back: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn reply_serializes_with_ok_flag() {
        let ok = serde_json::to_value(Reply::ok(3)).unwrap();
        assert_eq!(ok, serde_json::json!({ "ok": true, "value": 3 }));

        let err = serde_json::to_value(Reply::<()>::err(ErrorCode::NotSignedIn, "nope")).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"]["code"], "not_signed_in");
    }
}
