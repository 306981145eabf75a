use super::{decode, seg, ApiClient, ApiError};
use crate::session::{MultipartBody, PendingRequest};
use crate::types::{ImageUpload, ProfileUpdate, SignOutReason, UserProfile};
use serde_json::Value;

fn decode_user(body: &Value) -> Option<UserProfile> {
    match body.get("user") {
        Some(nested @ Value::Object(_)) => decode::user_profile(nested),
        _ => decode::user_profile(body),
    }
}

impl ApiClient {
    fn is_self(&self, user_id: &str) -> bool {
        self.viewer_id().as_deref() == Some(user_id)
    }

    fn cache_if_self(&self, user: &UserProfile) -> Result<(), ApiError> {
        if self.is_self(&user.id) {
            self.session().update_cached_user(user)?;
        }
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserProfile, ApiError> {
        let body = self
            .execute_json(PendingRequest::get(format!("/users/{}", seg(user_id))))
            .await?;
        decode_user(&body).ok_or_else(|| ApiError::Decode("response carried no user".to_string()))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<UserProfile, ApiError> {
        let body = self
            .execute_json(PendingRequest::get(format!(
                "/users/username/{}",
                seg(username)
            )))
            .await?;
        decode_user(&body).ok_or_else(|| ApiError::Decode("response carried no user".to_string()))
    }

    /// Updating your own profile also refreshes the cached copy.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput("nothing to update".to_string()));
        }
        let payload = serde_json::to_value(update).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let body = self
            .execute_json(PendingRequest::put(format!("/users/{}", seg(user_id))).json(payload))
            .await?;

        let user = match decode_user(&body) {
            Some(user) => user,
            None => {
                // Backend answered with a bare acknowledgement.
                let mut user = self
                    .session()
                    .current_user()
                    .filter(|u| u.id == user_id)
                    .unwrap_or_else(|| UserProfile {
                        id: user_id.to_string(),
                        ..UserProfile::default()
                    });
                if let Some(username) = &update.username {
                    user.username = username.clone();
                }
                if let Some(email) = &update.email {
                    user.email = email.clone();
                }
                user
            }
        };
        self.cache_if_self(&user)?;
        Ok(user)
    }

    /// Deleting your own account ends the session.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        self.execute_unit(PendingRequest::delete(format!("/users/{}", seg(user_id))))
            .await?;
        if self.is_self(user_id) {
            self.session().end_session(SignOutReason::AccountDeleted);
        }
        Ok(())
    }

    /// Uploads a new profile picture, then reloads the profile so the cached
    /// copy carries the stored image URL.
    pub async fn upload_profile_image(
        &self,
        user_id: &str,
        image: ImageUpload,
    ) -> Result<UserProfile, ApiError> {
        let current = self.session().current_user().filter(|u| u.id == user_id);
        let mut form = MultipartBody::new().text("id", user_id);
        if let Some(current) = &current {
            form = form
                .text("username", current.username.clone())
                .text("imgUrl", current.img_url.clone());
        }
        form = form.file("file", image);

        self.execute_unit(
            PendingRequest::post(format!("/users/{}/image", seg(user_id))).multipart(form),
        )
        .await?;

        let user = self.get_user(user_id).await?;
        self.cache_if_self(&user)?;
        Ok(user)
    }
}
