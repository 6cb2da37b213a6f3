use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use hackvault_access::{Viewer, can_view, controls, filter_visible, is_protected};
use hackvault_db::content::ContentFilter;
use hackvault_types::api::{
    ContentQuery, CreateContentRequest, DeleteResponse, PostThread, SetVisibilityRequest,
};
use hackvault_types::models::{ContentItem, ContentKind};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::{AdminUser, CurrentUser, MaybeUser};

pub async fn list_content(
    State(state): State<AppState>,
    Path(kind): Path<ContentKind>,
    Query(query): Query<ContentQuery>,
    viewer: MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let items = blocking(&state, move |db| {
        let category_id = match query.category.as_deref() {
            Some(slug) => match db.get_category_by_slug(slug)? {
                Some(category) => Some(category.id),
                None => return Ok(None),
            },
            None => None,
        };
        let filter = ContentFilter {
            category_id,
            parent_id: query.parent_id,
        };
        db.list_content(kind, &filter).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::BadRequest("unknown category".into()))?;

    Ok(Json(filter_visible(items, viewer.viewer().as_ref())))
}

pub async fn get_content(
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    viewer: MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let item = load_visible(&state, kind, id, viewer.viewer().as_ref()).await?;
    Ok(Json(item))
}

pub async fn create_content(
    State(state): State<AppState>,
    Path(kind): Path<ContentKind>,
    user: CurrentUser,
    Json(req): Json<CreateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    if req.body.kind() != kind {
        return Err(ApiError::BadRequest(format!(
            "body kind {} does not match {}",
            req.body.kind(),
            kind
        )));
    }

    if let Some(category_id) = req.category_id {
        let exists = blocking(&state, move |db| db.get_category(category_id))
            .await?
            .is_some();
        if !exists {
            return Err(ApiError::BadRequest("unknown category".into()));
        }
    }

    // Replies live in their parent's category.
    let mut category_id = req.category_id;
    if let Some(parent_id) = req.body.parent_id() {
        let parent = load_visible(&state, ContentKind::Post, parent_id, Some(&user.viewer()))
            .await
            .map_err(|_| ApiError::BadRequest("parent post not found".into()))?;
        if parent.parent_id().is_some() {
            return Err(ApiError::BadRequest("replies cannot be nested".into()));
        }
        category_id = parent.category_id;
    }

    let CurrentUser(claims) = user;
    let item = ContentItem {
        id: Uuid::new_v4(),
        title: req.title,
        author_id: claims.sub,
        author_username: claims.username,
        category_id,
        is_public: req.is_public,
        created_at: chrono::Utc::now(),
        body: req.body,
    };

    let stored = item.clone();
    blocking(&state, move |db| db.insert_content(&stored)).await?;

    info!("{} created {} {}", item.author_username, kind, item.id);
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn delete_content(
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = user.viewer();
    let item = load_visible(&state, kind, id, Some(&viewer)).await?;
    let slug = category_slug(&state, item.category_id).await?;

    if !controls(&item, slug.as_deref(), Some(&viewer)).can_delete {
        return Err(ApiError::Forbidden("content in this category cannot be deleted".into()));
    }
    if kind == ContentKind::Post && has_protected_reply(&state, id).await? {
        return Err(ApiError::Forbidden("post has replies that cannot be deleted".into()));
    }

    let deleted = blocking(&state, move |db| db.delete_content(kind, id)).await?;
    if deleted.is_empty() {
        return Err(ApiError::NotFound("content not found".into()));
    }

    info!("{} deleted {} {} ({} rows)", user.0.username, kind, id, deleted.len());
    Ok(Json(DeleteResponse { deleted }))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    Path((kind, id)): Path<(ContentKind, Uuid)>,
    AdminUser(claims): AdminUser,
    Json(req): Json<SetVisibilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = Viewer::from(&claims);
    let mut item = load_visible(&state, kind, id, Some(&viewer)).await?;
    let slug = category_slug(&state, item.category_id).await?;

    if !controls(&item, slug.as_deref(), Some(&viewer)).can_toggle_visibility {
        return Err(ApiError::Forbidden("visibility can only be changed by admins".into()));
    }

    let is_public = req.is_public;
    let updated = blocking(&state, move |db| db.set_visibility(kind, id, is_public)).await?;
    if !updated {
        return Err(ApiError::NotFound("content not found".into()));
    }

    item.is_public = is_public;
    Ok(Json(item))
}

/// A post with its replies. Asking for a reply returns its whole thread.
pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    viewer: MaybeUser,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = viewer.viewer();
    let mut post = load_visible(&state, ContentKind::Post, id, viewer.as_ref()).await?;
    if let Some(parent_id) = post.parent_id() {
        post = load_visible(&state, ContentKind::Post, parent_id, viewer.as_ref()).await?;
    }

    let root = post.id;
    let replies = blocking(&state, move |db| db.list_replies(root)).await?;

    Ok(Json(PostThread {
        post,
        replies: filter_visible(replies, viewer.as_ref()),
    }))
}

/// Hidden items answer exactly like missing ones.
async fn load_visible(
    state: &AppState,
    kind: ContentKind,
    id: Uuid,
    viewer: Option<&Viewer>,
) -> Result<ContentItem, ApiError> {
    blocking(state, move |db| db.get_content(kind, id))
        .await?
        .filter(|item| can_view(item, viewer))
        .ok_or_else(|| ApiError::NotFound("content not found".into()))
}

/// The delete cascade must not take protected replies along.
async fn has_protected_reply(state: &AppState, post_id: Uuid) -> Result<bool, ApiError> {
    let replies = blocking(state, move |db| db.list_replies(post_id)).await?;
    for reply in replies {
        let slug = category_slug(state, reply.category_id).await?;
        if is_protected(slug.as_deref()) {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn category_slug(state: &AppState, category_id: Option<Uuid>) -> Result<Option<String>, ApiError> {
    let Some(category_id) = category_id else {
        return Ok(None);
    };
    let category = blocking(state, move |db| db.get_category(category_id)).await?;
    Ok(category.map(|c| c.slug))
}
