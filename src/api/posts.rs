use super::{decode, seg, ApiClient, ApiError};
use crate::session::{MultipartBody, PendingRequest};
use crate::types::{Post, PostDraft};
use serde_json::{json, Value};

fn post_form(owner_id: &str, draft: &PostDraft) -> MultipartBody {
    let mut form = MultipartBody::new()
        .text("owner", owner_id)
        .text("title", draft.title.trim())
        .text("content", draft.content.trim());
    if let Some(img_url) = &draft.img_url {
        form = form.text("imgUrl", img_url.clone());
    }
    if let Some(image) = &draft.image {
        form = form.file("file", image.clone());
    }
    form
}

impl ApiClient {
    fn decode_post(&self, body: &Value) -> Result<Post, ApiError> {
        // Some handlers wrap the record as `{ post: {...} }`.
        let record = body.get("post").unwrap_or(body);
        decode::post(record, self.viewer_id().as_deref())
            .ok_or_else(|| ApiError::Decode("response carried no post".to_string()))
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        let body = self.execute_json(PendingRequest::get("/posts")).await?;
        Ok(decode::posts(&body, self.viewer_id().as_deref()))
    }

    pub async fn list_posts_by_owner(&self, owner_id: &str) -> Result<Vec<Post>, ApiError> {
        let body = self
            .execute_json(PendingRequest::get("/posts").query("owner", owner_id))
            .await?;
        Ok(decode::posts(&body, self.viewer_id().as_deref()))
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Post, ApiError> {
        let body = self
            .execute_json(PendingRequest::get(format!("/posts/{}", seg(post_id))))
            .await?;
        self.decode_post(&body)
    }

    pub async fn create_post(&self, draft: &PostDraft) -> Result<Post, ApiError> {
        let user = self.signed_in_user()?;
        if draft.title.trim().is_empty() {
            return Err(ApiError::InvalidInput("post title is required".to_string()));
        }
        let body = self
            .execute_json(PendingRequest::post("/posts").multipart(post_form(&user.id, draft)))
            .await?;
        let post = self.decode_post(&body)?;
        tracing::info!(post_id = %post.id, "post created");
        Ok(post)
    }

    pub async fn update_post(&self, post_id: &str, draft: &PostDraft) -> Result<Post, ApiError> {
        let user = self.signed_in_user()?;
        let body = self
            .execute_json(
                PendingRequest::put(format!("/posts/{}", seg(post_id)))
                    .multipart(post_form(&user.id, draft)),
            )
            .await?;
        self.decode_post(&body)
    }

    pub async fn delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        self.execute_unit(PendingRequest::delete(format!("/posts/{}", seg(post_id))))
            .await
    }

    pub async fn like_post(&self, post_id: &str) -> Result<(), ApiError> {
        let user = self.signed_in_user()?;
        self.execute_unit(
            PendingRequest::post(format!("/posts/{}/like", seg(post_id)))
                .json(json!({ "userId": user.id })),
        )
        .await
    }

    /// The backend exposes unlike as `POST /posts/<id>/delete`.
    pub async fn unlike_post(&self, post_id: &str) -> Result<(), ApiError> {
        let user = self.signed_in_user()?;
        self.execute_unit(
            PendingRequest::post(format!("/posts/{}/delete", seg(post_id)))
                .json(json!({ "userId": user.id })),
        )
        .await
    }

    pub async fn like_count(&self, post_id: &str) -> Result<u64, ApiError> {
        let body = self
            .execute_json(PendingRequest::get(format!("/posts/{}/like-count", seg(post_id))))
            .await?;
        decode::like_count(&body).ok_or_else(|| ApiError::Decode("like count missing".to_string()))
    }

    pub async fn like_check(&self, post_id: &str) -> Result<bool, ApiError> {
        let user = self.signed_in_user()?;
        let body = self
            .execute_json(
                PendingRequest::get(format!("/posts/{}/like-check", seg(post_id)))
                    .query("userId", user.id),
            )
            .await?;
        decode::like_check(&body).ok_or_else(|| ApiError::Decode("like check missing".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{client_for, sign_in};
    use crate::types::ImageUpload;
    use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn list_posts_marks_posts_the_viewer_liked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "_id": "p1", "title": "Sunset", "owner": "u2", "likes": ["u1", "u3"] },
                { "_id": "p2", "title": "Lake", "owner": "u2", "likes": 4 },
                { "title": "no id" }
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");
        let posts = client.list_posts().await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].like_count, 2);
        assert_eq!(posts[0].liked_by_viewer, Some(true));
        assert_eq!(posts[1].like_count, 4);
        assert_eq!(posts[1].liked_by_viewer, None);
    }

    #[tokio::test]
    async fn owner_filter_is_sent_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts"))
            .and(query_param("owner", "u2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "posts": [{ "_id": "p1" }] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let posts = client.list_posts_by_owner("u2").await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn missing_post_surfaces_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/p404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Post not found" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_post("p404").await.unwrap_err();
        assert_eq!(err.to_string(), "Post not found (404)");
    }

    #[tokio::test]
    async fn create_post_sends_owner_and_image_as_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts"))
            .and(body_string_contains("name=\"owner\""))
            .and(body_string_contains("name=\"file\"; filename=\"sunset.png\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "_id": "p7",
                "owner": { "_id": "u1", "username": "alice" },
                "title": "Sunset",
                "content": "at the beach",
                "imgUrl": "/uploads/sunset.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");
        let draft = PostDraft {
            title: "Sunset".to_string(),
            content: "at the beach".to_string(),
            image: Some(ImageUpload {
                file_name: "sunset.png".to_string(),
                mime: "image/png".to_string(),
                bytes: b"png-bytes".to_vec(),
            }),
            img_url: None,
        };

        let post = client.create_post(&draft).await.unwrap();
        assert_eq!(post.id, "p7");
        assert_eq!(post.owner_id.as_deref(), Some("u1"));
        assert_eq!(post.img_url.as_deref(), Some("/uploads/sunset.png"));
    }

    #[tokio::test]
    async fn create_post_requires_a_session() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let draft = PostDraft {
            title: "Sunset".to_string(),
            content: String::new(),
            image: None,
            img_url: None,
        };
        let err = client.create_post(&draft).await.unwrap_err();
        assert!(matches!(err, ApiError::NotSignedIn));
    }

    #[tokio::test]
    async fn multipart_upload_is_resent_after_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/posts/p7"))
            .and(wiremock::matchers::header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "A2" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/posts/p7"))
            .and(wiremock::matchers::header("authorization", "Bearer A2"))
            .and(body_string_contains("Edited"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "p7", "title": "Edited" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");
        let draft = PostDraft {
            title: "Edited".to_string(),
            content: String::new(),
            image: None,
            img_url: Some("/uploads/sunset.png".to_string()),
        };
        let post = client.update_post("p7", &draft).await.unwrap();
        assert_eq!(post.title, "Edited");
    }

    #[tokio::test]
    async fn like_and_unlike_send_viewer_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/p1/like"))
            .and(body_json(json!({ "userId": "u1" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/posts/p1/delete"))
            .and(body_json(json!({ "userId": "u1" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");
        client.like_post("p1").await.unwrap();
        client.unlike_post("p1").await.unwrap();
    }

    #[tokio::test]
    async fn like_count_and_check_accept_wrapped_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/p1/like-count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 5 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts/p1/like-check"))
            .and(query_param("userId", "u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        sign_in(&client, "A1", "R1");
        assert_eq!(client.like_count("p1").await.unwrap(), 5);
        assert!(client.like_check("p1").await.unwrap());
    }

    #[tokio::test]
    async fn path_segments_are_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/posts/a%2Fb"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete_post("a/b").await.unwrap();
    }
}
