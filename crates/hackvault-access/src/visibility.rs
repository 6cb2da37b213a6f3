use uuid::Uuid;

use hackvault_types::api::Claims;
use hackvault_types::models::ContentItem;

/// Category slugs whose content can never be deleted, whatever the role.
pub const PROTECTED_CATEGORY_SLUGS: &[&str] = &["announcements", "rules"];

/// An authenticated viewer. Anonymous viewers are `None` at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub id: Uuid,
    pub is_admin: bool,
}

impl From<&Claims> for Viewer {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            is_admin: claims.is_admin,
        }
    }
}

/// Mutation controls a renderer may show for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub can_delete: bool,
    pub can_toggle_visibility: bool,
}

pub fn is_protected(category_slug: Option<&str>) -> bool {
    category_slug.is_some_and(|slug| PROTECTED_CATEGORY_SLUGS.contains(&slug))
}

/// Public items are visible to everyone; private ones only to admins and
/// their author.
pub fn can_view(item: &ContentItem, viewer: Option<&Viewer>) -> bool {
    item.is_public || viewer.is_some_and(|v| v.is_admin || v.id == item.author_id)
}

pub fn can_toggle_visibility(viewer: Option<&Viewer>) -> bool {
    viewer.is_some_and(|v| v.is_admin)
}

/// Any signed-in viewer who can see the item, unless its category is
/// protected.
pub fn can_delete(item: &ContentItem, category_slug: Option<&str>, viewer: Option<&Viewer>) -> bool {
    viewer.is_some() && can_view(item, viewer) && !is_protected(category_slug)
}

/// `category_slug` is the slug of the item's category, if it has one.
pub fn controls(item: &ContentItem, category_slug: Option<&str>, viewer: Option<&Viewer>) -> Controls {
    if viewer.is_none() || !can_view(item, viewer) {
        return Controls::default();
    }

    Controls {
        can_delete: can_delete(item, category_slug, viewer),
        can_toggle_visibility: can_toggle_visibility(viewer),
    }
}

pub fn filter_visible(items: Vec<ContentItem>, viewer: Option<&Viewer>) -> Vec<ContentItem> {
    items.into_iter().filter(|item| can_view(item, viewer)).collect()
}
