use crate::api::ApiError;
use crate::types::ImageUpload;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    RefreshOnUnauthorized,
    /// Credential exchanges (login, register, logout) never trigger a refresh.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FilePart {
    field: String,
    upload: ImageUpload,
}

/// Multipart payload kept in a cloneable form so every attempt can rebuild
/// its own `reqwest` form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    file: Option<FilePart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn file(mut self, field: &str, upload: ImageUpload) -> Self {
        self.file = Some(FilePart {
            field: field.to_string(),
            upload,
        });
        self
    }

    fn to_form(&self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        if let Some(file) = &self.file {
            let part = Part::bytes(file.upload.bytes.clone())
                .file_name(file.upload.file_name.clone())
                .mime_str(&file.upload.mime)?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

/// One logical API call. Values are never mutated once dispatched: a retry is
/// a new value produced by [`PendingRequest::retry`] with the attempt bumped.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    policy: RetryPolicy,
    attempt: u8,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            policy: RetryPolicy::RefreshOnUnauthorized,
            attempt: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    pub fn without_refresh(mut self) -> Self {
        self.policy = RetryPolicy::Never;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 0
    }

    pub fn can_refresh(&self) -> bool {
        self.policy == RetryPolicy::RefreshOnUnauthorized
    }

    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt.saturating_add(1),
            ..self.clone()
        }
    }

    pub(crate) fn build(
        &self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<reqwest::Request, ApiError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let mut builder = http.request(self.method.clone(), url);
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        builder = match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };
        Ok(builder.build()?)
    }
}
