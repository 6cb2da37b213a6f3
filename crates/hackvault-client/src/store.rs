use std::path::PathBuf;

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use hackvault_access::{Controls, Viewer, controls, filter_visible};
use hackvault_types::api::{
    ApprovalResponse, ContentQuery, CreateContentRequest, LoginRequest, PostThread,
    RegisterRequest, RegisterResponse,
};
use hackvault_types::models::{Category, ContentItem, ContentKind, Profile};

use crate::cache::{LocalCache, Session};
use crate::error::{ClientError, Result};
use crate::remote::RemoteService;

/// Client state mirrored between the data service and a local cache.
///
/// Writes go to the remote first; the cache only changes once the remote
/// confirms, so a failed write never leaves a phantom row behind. Reads fall
/// back to the cache when the remote cannot be reached. Everything handed out
/// has passed the visibility gate for the current session.
pub struct MirroredStore<R> {
    remote: R,
    cache: LocalCache,
    cache_path: Option<PathBuf>,
}

impl<R: RemoteService> MirroredStore<R> {
    /// A store whose cache lives only in memory.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            cache: LocalCache::default(),
            cache_path: None,
        }
    }

    /// A store persisted at `path`, starting from whatever was saved there.
    pub fn open(remote: R, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            remote,
            cache: LocalCache::load(&path),
            cache_path: Some(path),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn session(&self) -> Option<&Session> {
        self.cache.session.as_ref()
    }

    pub fn viewer(&self) -> Option<Viewer> {
        self.session().map(Session::viewer)
    }

    /// The cached table for `kind`, gated for the current session.
    pub fn cached(&self, kind: ContentKind) -> Vec<ContentItem> {
        filter_visible(self.cache.items(kind).to_vec(), self.viewer().as_ref())
    }

    /// Which mutation controls a renderer should offer for `item`.
    ///
    /// An item whose category is not in the cached list might be protected,
    /// so it gets no delete control until categories are loaded.
    pub fn controls(&self, item: &ContentItem) -> Controls {
        let slug = self.cache.category_slug(item.category_id);
        let mut offered = controls(item, slug, self.viewer().as_ref());
        if item.category_id.is_some() && slug.is_none() {
            offered.can_delete = false;
        }
        offered
    }

    // -- Auth --

    /// Pending accounts come back without a token and stay signed out.
    pub async fn register(&mut self, req: RegisterRequest) -> Result<RegisterResponse> {
        req.validate()?;
        let resp = self.remote.register(&req).await?;

        if let Some(token) = &resp.token {
            self.start_session(token.clone(), resp.user.clone());
        } else {
            info!("{} registered, awaiting approval", resp.user.username);
        }
        Ok(resp)
    }

    pub async fn login(&mut self, req: LoginRequest) -> Result<Profile> {
        req.validate()?;
        let resp = self.remote.login(&req).await?;
        self.start_session(resp.token, resp.user.clone());
        Ok(resp.user)
    }

    /// Re-reads the signed-in profile, e.g. to pick up a role change.
    pub async fn refresh_session(&mut self) -> Result<Profile> {
        let token = self.token()?.to_string();
        let result = self.remote.me(&token).await;
        let user = self.checked(result)?;
        if let Some(session) = self.cache.session.as_mut() {
            session.user = user.clone();
        }
        self.persist();
        Ok(user)
    }

    pub fn sign_out(&mut self) {
        self.cache.sign_out();
        self.persist();
    }

    fn start_session(&mut self, token: String, user: Profile) {
        // A different account must not see the previous one's mirror.
        if self.session().is_some_and(|s| s.user.id != user.id) {
            self.cache.sign_out();
        }
        info!("signed in as {}", user.username);
        self.cache.session = Some(Session { token, user });
        self.persist();
    }

    // -- Reads --

    pub async fn categories(&mut self) -> Result<Vec<Category>> {
        match self.remote.categories().await {
            Ok(categories) => {
                self.cache.set_categories(categories.clone());
                self.persist();
                Ok(categories)
            }
            Err(ClientError::Transport(e)) => {
                warn!("offline, serving cached categories: {}", e);
                Ok(self.cache.categories().to_vec())
            }
            Err(e) => Err(e),
        }
    }

    /// Lists `kind`, refreshing the mirror on success.
    ///
    /// An unfiltered listing replaces the cached table; a filtered one only
    /// merges what it returned.
    pub async fn load(&mut self, kind: ContentKind, query: &ContentQuery) -> Result<Vec<ContentItem>> {
        let token = self.session().map(|s| s.token.clone());
        let result = self.remote.list(token.as_deref(), kind, query).await;

        let items = match result {
            Ok(items) => {
                if query.category.is_none() && query.parent_id.is_none() {
                    self.cache.replace(kind, items.clone());
                } else {
                    for item in &items {
                        self.cache.upsert(item.clone());
                    }
                }
                self.persist();
                items
            }
            Err(ClientError::Transport(e)) => {
                warn!("offline, serving cached {}: {}", kind, e);
                self.cached_matching(kind, query)
            }
            Err(e) => return Err(self.expire_on_unauthorized(e)),
        };

        Ok(filter_visible(items, self.viewer().as_ref()))
    }

    /// Full reload of one table.
    pub async fn refresh(&mut self, kind: ContentKind) -> Result<Vec<ContentItem>> {
        self.load(kind, &ContentQuery::default()).await
    }

    pub async fn get(&mut self, kind: ContentKind, id: Uuid) -> Result<ContentItem> {
        let token = self.session().map(|s| s.token.clone());
        match self.remote.get(token.as_deref(), kind, id).await {
            Ok(item) => {
                self.cache.upsert(item.clone());
                self.persist();
                Ok(item)
            }
            Err(ClientError::Transport(e)) => {
                warn!("offline, serving cached {} {}: {}", kind, id, e);
                self.cache
                    .find(kind, id)
                    .filter(|item| hackvault_access::can_view(item, self.viewer().as_ref()))
                    .cloned()
                    .ok_or(ClientError::Transport(e))
            }
            Err(e) => Err(self.expire_on_unauthorized(e)),
        }
    }

    pub async fn thread(&mut self, post_id: Uuid) -> Result<PostThread> {
        let token = self.session().map(|s| s.token.clone());
        match self.remote.thread(token.as_deref(), post_id).await {
            Ok(thread) => {
                self.cache.upsert(thread.post.clone());
                for reply in &thread.replies {
                    self.cache.upsert(reply.clone());
                }
                self.persist();
                let viewer = self.viewer();
                Ok(PostThread {
                    post: thread.post,
                    replies: filter_visible(thread.replies, viewer.as_ref()),
                })
            }
            Err(ClientError::Transport(e)) => {
                warn!("offline, rebuilding thread {} from cache: {}", post_id, e);
                self.cached_thread(post_id).ok_or(ClientError::Transport(e))
            }
            Err(e) => Err(self.expire_on_unauthorized(e)),
        }
    }

    // -- Writes --

    pub async fn create(&mut self, req: CreateContentRequest) -> Result<ContentItem> {
        req.validate()?;
        let token = self.token()?.to_string();
        let kind = req.body.kind();

        let result = self.remote.create(&token, kind, &req).await;
        let created = self.checked(result)?;
        debug!("remote confirmed {} {}", kind, created.id);

        self.cache.upsert(created.clone());
        self.persist();
        Ok(created)
    }

    /// Returns every id the remote removed, cascaded replies included.
    pub async fn delete(&mut self, kind: ContentKind, id: Uuid) -> Result<Vec<Uuid>> {
        let token = self.token()?.to_string();
        let result = self.remote.delete(&token, kind, id).await;
        let resp = self.checked(result)?;

        self.cache.remove(kind, &resp.deleted);
        self.persist();
        Ok(resp.deleted)
    }

    pub async fn set_visibility(
        &mut self,
        kind: ContentKind,
        id: Uuid,
        is_public: bool,
    ) -> Result<ContentItem> {
        let token = self.token()?.to_string();
        let result = self.remote.set_visibility(&token, kind, id, is_public).await;
        let updated = self.checked(result)?;

        self.cache.set_visibility(kind, updated.id, updated.is_public);
        self.persist();
        Ok(updated)
    }

    // -- Admin --

    pub async fn pending_users(&mut self) -> Result<Vec<Profile>> {
        let token = self.token()?.to_string();
        let result = self.remote.pending_users(&token).await;
        self.checked(result)
    }

    pub async fn approve_user(&mut self, user_id: Uuid) -> Result<ApprovalResponse> {
        let token = self.token()?.to_string();
        let result = self.remote.approve_user(&token, user_id).await;
        self.checked(result)
    }

    pub async fn reject_user(&mut self, user_id: Uuid) -> Result<()> {
        let token = self.token()?.to_string();
        let result = self.remote.reject_user(&token, user_id).await;
        self.checked(result)
    }

    // -- Helpers --

    fn token(&self) -> Result<&str> {
        self.session()
            .map(|s| s.token.as_str())
            .ok_or(ClientError::NotSignedIn)
    }

    fn checked<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.expire_on_unauthorized(e))
    }

    /// A 401 means the stored token is no longer accepted.
    fn expire_on_unauthorized(&mut self, err: ClientError) -> ClientError {
        if err.is_unauthorized() && self.session().is_some() {
            warn!("session rejected by server, signing out");
            self.sign_out();
        }
        err
    }

    fn cached_matching(&self, kind: ContentKind, query: &ContentQuery) -> Vec<ContentItem> {
        let category_id = query.category.as_deref().map(|slug| self.cache.category_id(slug));

        self.cache
            .items(kind)
            .iter()
            .filter(|item| match category_id {
                Some(id) => id.is_some() && item.category_id == id,
                None => true,
            })
            .filter(|item| {
                kind != ContentKind::Post || item.parent_id() == query.parent_id
            })
            .cloned()
            .collect()
    }

    fn cached_thread(&self, post_id: Uuid) -> Option<PostThread> {
        let viewer = self.viewer();
        let mut post = self.cache.find(ContentKind::Post, post_id)?;
        if let Some(parent_id) = post.parent_id() {
            post = self.cache.find(ContentKind::Post, parent_id)?;
        }
        if !hackvault_access::can_view(post, viewer.as_ref()) {
            return None;
        }

        let mut replies: Vec<ContentItem> = self
            .cache
            .items(ContentKind::Post)
            .iter()
            .filter(|item| item.parent_id() == Some(post.id))
            .cloned()
            .collect();
        replies.sort_by_key(|item| item.created_at);

        Some(PostThread {
            post: post.clone(),
            replies: filter_visible(replies, viewer.as_ref()),
        })
    }

    fn persist(&self) {
        let Some(path) = &self.cache_path else {
            return;
        };
        if let Err(e) = self.cache.save(path) {
            warn!("failed to persist cache: {}", e);
        }
    }
}
