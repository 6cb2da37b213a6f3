//! Persisted mirror of the session and content tables.
//!
//! The cache is disposable: a missing or unreadable file yields an empty
//! cache rather than an error, and the server stays the source of truth.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use hackvault_access::Viewer;
use hackvault_types::models::{Category, ContentItem, ContentKind, Profile};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Profile,
}

impl Session {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            id: self.user.id,
            is_admin: self.user.is_admin,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalCache {
    pub session: Option<Session>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    tables: HashMap<ContentKind, Vec<ContentItem>>,
}

impl LocalCache {
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("cannot read cache {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(cache) => {
                debug!("loaded cache from {}", path.display());
                cache
            }
            Err(e) => {
                warn!("discarding corrupt cache {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| ClientError::Cache(e.to_string()))?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|e| ClientError::Cache(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| ClientError::Cache(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| ClientError::Cache(e.to_string()))
    }

    pub fn items(&self, kind: ContentKind) -> &[ContentItem] {
        self.tables.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, kind: ContentKind, id: Uuid) -> Option<&ContentItem> {
        self.items(kind).iter().find(|item| item.id == id)
    }

    /// Swap in a fresh top-level listing. Cached replies survive as long as
    /// their parent is still listed.
    pub fn replace(&mut self, kind: ContentKind, mut items: Vec<ContentItem>) {
        if let Some(old) = self.tables.remove(&kind) {
            let replies: Vec<ContentItem> = old
                .into_iter()
                .filter(|item| {
                    item.parent_id()
                        .is_some_and(|p| items.iter().any(|top| top.id == p))
                })
                .collect();
            items.extend(replies);
        }
        self.tables.insert(kind, items);
    }

    /// Insert or update by id. New items go first, matching the server's
    /// newest-first listings.
    pub fn upsert(&mut self, item: ContentItem) {
        let table = self.tables.entry(item.kind()).or_default();
        match table.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => table.insert(0, item),
        }
    }

    /// Remove the given ids and any replies whose parent is among them.
    pub fn remove(&mut self, kind: ContentKind, ids: &[Uuid]) {
        if let Some(table) = self.tables.get_mut(&kind) {
            table.retain(|item| {
                !ids.contains(&item.id) && !item.parent_id().is_some_and(|p| ids.contains(&p))
            });
        }
    }

    pub fn set_visibility(&mut self, kind: ContentKind, id: Uuid, is_public: bool) {
        if let Some(item) = self
            .tables
            .get_mut(&kind)
            .and_then(|table| table.iter_mut().find(|item| item.id == id))
        {
            item.is_public = is_public;
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn category_slug(&self, category_id: Option<Uuid>) -> Option<&str> {
        let id = category_id?;
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.slug.as_str())
    }

    pub fn category_id(&self, slug: &str) -> Option<Uuid> {
        self.categories.iter().find(|c| c.slug == slug).map(|c| c.id)
    }

    /// Drops the session and everything fetched under it. Categories are
    /// public and survive.
    pub fn sign_out(&mut self) {
        self.session = None;
        self.tables.clear();
    }
}
