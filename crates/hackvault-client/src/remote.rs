use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use hackvault_types::api::{
    ApprovalResponse, ContentQuery, CreateContentRequest, DeleteResponse, ErrorBody, LoginRequest,
    LoginResponse, PostThread, RegisterRequest, RegisterResponse, SetVisibilityRequest,
};
use hackvault_types::models::{Category, ContentItem, ContentKind, Profile};

use crate::error::{ClientError, Result};

/// The hosted data service as seen by the client.
///
/// `HttpRemote` talks to a running server; tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse>;
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse>;
    async fn me(&self, token: &str) -> Result<Profile>;

    async fn categories(&self) -> Result<Vec<Category>>;

    async fn list(
        &self,
        token: Option<&str>,
        kind: ContentKind,
        query: &ContentQuery,
    ) -> Result<Vec<ContentItem>>;
    async fn get(&self, token: Option<&str>, kind: ContentKind, id: Uuid) -> Result<ContentItem>;
    async fn thread(&self, token: Option<&str>, post_id: Uuid) -> Result<PostThread>;
    async fn create(
        &self,
        token: &str,
        kind: ContentKind,
        req: &CreateContentRequest,
    ) -> Result<ContentItem>;
    async fn delete(&self, token: &str, kind: ContentKind, id: Uuid) -> Result<DeleteResponse>;
    async fn set_visibility(
        &self,
        token: &str,
        kind: ContentKind,
        id: Uuid,
        is_public: bool,
    ) -> Result<ContentItem>;

    async fn pending_users(&self, token: &str) -> Result<Vec<Profile>>;
    async fn approve_user(&self, token: &str, user_id: Uuid) -> Result<ApprovalResponse>;
    async fn reject_user(&self, token: &str, user_id: Uuid) -> Result<()>;
}

pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_at(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.client.get(self.url(path)), token)
    }

    fn post_at(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.client.post(self.url(path)), token)
    }
}

fn authorize(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => req.header("Authorization", format!("Bearer {}", token)),
        None => req,
    }
}

async fn send(req: RequestBuilder) -> Result<reqwest::Response> {
    let resp = req
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    send(req)
        .await?
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse> {
        send_json(self.post_at("/auth/register", None).json(req)).await
    }

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        send_json(self.post_at("/auth/login", None).json(req)).await
    }

    async fn me(&self, token: &str) -> Result<Profile> {
        send_json(self.get_at("/auth/me", Some(token))).await
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        send_json(self.get_at("/categories", None)).await
    }

    async fn list(
        &self,
        token: Option<&str>,
        kind: ContentKind,
        query: &ContentQuery,
    ) -> Result<Vec<ContentItem>> {
        let path = format!("/content/{}", kind);
        send_json(self.get_at(&path, token).query(query)).await
    }

    async fn get(&self, token: Option<&str>, kind: ContentKind, id: Uuid) -> Result<ContentItem> {
        send_json(self.get_at(&format!("/content/{}/{}", kind, id), token)).await
    }

    async fn thread(&self, token: Option<&str>, post_id: Uuid) -> Result<PostThread> {
        send_json(self.get_at(&format!("/posts/{}/thread", post_id), token)).await
    }

    async fn create(
        &self,
        token: &str,
        kind: ContentKind,
        req: &CreateContentRequest,
    ) -> Result<ContentItem> {
        let path = format!("/content/{}", kind);
        send_json(self.post_at(&path, Some(token)).json(req)).await
    }

    async fn delete(&self, token: &str, kind: ContentKind, id: Uuid) -> Result<DeleteResponse> {
        let req = authorize(
            self.client.delete(self.url(&format!("/content/{}/{}", kind, id))),
            Some(token),
        );
        send_json(req).await
    }

    async fn set_visibility(
        &self,
        token: &str,
        kind: ContentKind,
        id: Uuid,
        is_public: bool,
    ) -> Result<ContentItem> {
        let req = authorize(
            self.client
                .patch(self.url(&format!("/content/{}/{}/visibility", kind, id))),
            Some(token),
        )
        .json(&SetVisibilityRequest { is_public });
        send_json(req).await
    }

    async fn pending_users(&self, token: &str) -> Result<Vec<Profile>> {
        send_json(self.get_at("/admin/users/pending", Some(token))).await
    }

    async fn approve_user(&self, token: &str, user_id: Uuid) -> Result<ApprovalResponse> {
        let path = format!("/admin/users/{}/approve", user_id);
        send_json(self.post_at(&path, Some(token))).await
    }

    async fn reject_user(&self, token: &str, user_id: Uuid) -> Result<()> {
        let path = format!("/admin/users/{}/reject", user_id);
        send(self.post_at(&path, Some(token))).await?;
        Ok(())
    }
}
