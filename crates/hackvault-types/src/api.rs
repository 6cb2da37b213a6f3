use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError};

use crate::models::{ApprovalOutcome, ContentBody, ContentItem, Profile};

// -- JWT Claims --

/// Session token claims, shared by the API middleware and the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Pending accounts get no token; they must wait for approval and log in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: Profile,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: Profile,
    pub token: String,
}

// -- Content --

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub category_id: Option<Uuid>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(flatten)]
    #[validate(custom(function = "validate_body"))]
    pub body: ContentBody,
}

const MAX_BODY_LEN: usize = 100_000;

fn required_text(value: &str, code: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.len() > MAX_BODY_LEN {
        return Err(ValidationError::new(code));
    }
    Ok(())
}

fn url(value: &str) -> Result<(), ValidationError> {
    if !value.validate_url() {
        return Err(ValidationError::new("url"));
    }
    Ok(())
}

fn validate_body(body: &ContentBody) -> Result<(), ValidationError> {
    match body {
        ContentBody::CodeSnippet { code, .. } => required_text(code, "code"),
        ContentBody::WriteUp { content } => required_text(content, "content"),
        ContentBody::TestingTool { url: link, .. } | ContentBody::YoutubeChannel { url: link, .. } => {
            url(link)
        }
        ContentBody::CtfComponent { description, url: link, .. } => {
            required_text(description, "description")?;
            match link {
                Some(link) => url(link),
                None => Ok(()),
            }
        }
        ContentBody::Post { content, .. } => required_text(content, "content"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetVisibilityRequest {
    pub is_public: bool,
}

/// Filters for content listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentQuery {
    /// Category slug.
    pub category: Option<String>,
    /// Only replies to this post.
    pub parent_id: Option<Uuid>,
}

/// Ids removed by a delete: the item itself plus any cascaded replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostThread {
    pub post: ContentItem,
    pub replies: Vec<ContentItem>,
}

// -- Admin --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub user: Profile,
    pub outcome: ApprovalOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: ContentBody) -> CreateContentRequest {
        CreateContentRequest {
            title: "title".into(),
            category_id: None,
            is_public: true,
            body,
        }
    }

    #[test]
    fn register_rejects_bad_email_and_short_password() {
        let req = RegisterRequest {
            username: "neo".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn tool_url_must_be_a_url() {
        let bad = request(ContentBody::TestingTool {
            url: "burp".into(),
            description: None,
        });
        assert!(bad.validate().is_err());

        let good = request(ContentBody::TestingTool {
            url: "https://portswigger.net/burp".into(),
            description: Some("proxy".into()),
        });
        assert!(good.validate().is_ok());
    }

    #[test]
    fn blank_post_is_rejected() {
        let req = request(ContentBody::Post {
            content: "   ".into(),
            parent_id: None,
        });
        assert!(req.validate().is_err());
    }

    #[test]
    fn visibility_defaults_to_public() {
        let req: CreateContentRequest = serde_json::from_value(serde_json::json!({
            "title": "rev101",
            "kind": "write_ups",
            "content": "step one: open ghidra",
        }))
        .unwrap();
        assert!(req.is_public);
        assert!(matches!(req.body, ContentBody::WriteUp { .. }));
    }
}
