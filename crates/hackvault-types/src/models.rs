use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user. The password hash stays in the database layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration state derived from the `(is_admin, is_approved)` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Approved,
    Admin,
}

/// Result of an admin approving an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved,
    AlreadyApproved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// The six content tables. Serialized as the table name, which is also the
/// path segment used by the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    #[serde(rename = "code_snippets")]
    CodeSnippet,
    #[serde(rename = "write_ups")]
    WriteUp,
    #[serde(rename = "testing_tools")]
    TestingTool,
    #[serde(rename = "ctf_components")]
    CtfComponent,
    #[serde(rename = "youtube_channels")]
    YoutubeChannel,
    #[serde(rename = "posts")]
    Post,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::CodeSnippet,
        ContentKind::WriteUp,
        ContentKind::TestingTool,
        ContentKind::CtfComponent,
        ContentKind::YoutubeChannel,
        ContentKind::Post,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Self::CodeSnippet => "code_snippets",
            Self::WriteUp => "write_ups",
            Self::TestingTool => "testing_tools",
            Self::CtfComponent => "ctf_components",
            Self::YoutubeChannel => "youtube_channels",
            Self::Post => "posts",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.table() == s)
            .ok_or_else(|| format!("unknown content kind: {}", s))
    }
}

/// Kind-specific payload of a content item. The `kind` tag matches
/// [`ContentKind`]'s serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ContentBody {
    #[serde(rename = "code_snippets")]
    CodeSnippet {
        code: String,
        language: Option<String>,
    },
    #[serde(rename = "write_ups")]
    WriteUp { content: String },
    #[serde(rename = "testing_tools")]
    TestingTool {
        url: String,
        description: Option<String>,
    },
    #[serde(rename = "ctf_components")]
    CtfComponent {
        description: String,
        difficulty: Option<String>,
        url: Option<String>,
    },
    #[serde(rename = "youtube_channels")]
    YoutubeChannel {
        url: String,
        description: Option<String>,
    },
    #[serde(rename = "posts")]
    Post {
        content: String,
        parent_id: Option<Uuid>,
    },
}

impl ContentBody {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::CodeSnippet { .. } => ContentKind::CodeSnippet,
            Self::WriteUp { .. } => ContentKind::WriteUp,
            Self::TestingTool { .. } => ContentKind::TestingTool,
            Self::CtfComponent { .. } => ContentKind::CtfComponent,
            Self::YoutubeChannel { .. } => ContentKind::YoutubeChannel,
            Self::Post { .. } => ContentKind::Post,
        }
    }

    /// Parent post for replies; `None` for everything else.
    pub fn parent_id(&self) -> Option<Uuid> {
        match self {
            Self::Post { parent_id, .. } => *parent_id,
            _ => None,
        }
    }
}

/// A stored content item of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub category_id: Option<Uuid>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: ContentBody,
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        self.body.kind()
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.body.parent_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_from_table_name() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.table().parse::<ContentKind>().unwrap(), kind);
        }
        assert!("profiles".parse::<ContentKind>().is_err());
    }

    #[test]
    fn item_json_carries_kind_tag() {
        let item = ContentItem {
            id: Uuid::new_v4(),
            title: "nmap cheatsheet".into(),
            author_id: Uuid::new_v4(),
            author_username: "alice".into(),
            category_id: None,
            is_public: true,
            created_at: Utc::now(),
            body: ContentBody::TestingTool {
                url: "https://nmap.org".into(),
                description: None,
            },
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "testing_tools");
        assert_eq!(json["url"], "https://nmap.org");

        let back: ContentItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn reply_exposes_parent() {
        let parent = Uuid::new_v4();
        let body = ContentBody::Post {
            content: "same here".into(),
            parent_id: Some(parent),
        };
        assert_eq!(body.parent_id(), Some(parent));
        assert_eq!(body.kind(), ContentKind::Post);
    }
}
