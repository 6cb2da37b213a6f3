use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, ToSql};
use uuid::Uuid;

use hackvault_types::models::{ContentBody, ContentItem, ContentKind};

use crate::Database;
use crate::models::{opt_uuid_at, timestamp, timestamp_at, uuid_at};

/// Listing filters, already resolved to ids.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub category_id: Option<Uuid>,
    /// For posts: replies to this post. Without it, posts list top-level
    /// threads only.
    pub parent_id: Option<Uuid>,
}

/// Kind-specific columns, in the order `body_values` and `body_from_row` use.
fn body_columns(kind: ContentKind) -> &'static [&'static str] {
    match kind {
        ContentKind::CodeSnippet => &["code", "language"],
        ContentKind::WriteUp => &["content"],
        ContentKind::TestingTool => &["url", "description"],
        ContentKind::CtfComponent => &["description", "difficulty", "url"],
        ContentKind::YoutubeChannel => &["url", "description"],
        ContentKind::Post => &["content", "parent_id"],
    }
}

fn body_values(body: &ContentBody) -> Vec<Option<String>> {
    match body {
        ContentBody::CodeSnippet { code, language } => vec![Some(code.clone()), language.clone()],
        ContentBody::WriteUp { content } => vec![Some(content.clone())],
        ContentBody::TestingTool { url, description }
        | ContentBody::YoutubeChannel { url, description } => {
            vec![Some(url.clone()), description.clone()]
        }
        ContentBody::CtfComponent {
            description,
            difficulty,
            url,
        } => vec![Some(description.clone()), difficulty.clone(), url.clone()],
        ContentBody::Post { content, parent_id } => {
            vec![Some(content.clone()), parent_id.map(|id| id.to_string())]
        }
    }
}

fn body_from_row(kind: ContentKind, row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<ContentBody> {
    Ok(match kind {
        ContentKind::CodeSnippet => ContentBody::CodeSnippet {
            code: row.get(at)?,
            language: row.get(at + 1)?,
        },
        ContentKind::WriteUp => ContentBody::WriteUp { content: row.get(at)? },
        ContentKind::TestingTool => ContentBody::TestingTool {
            url: row.get(at)?,
            description: row.get(at + 1)?,
        },
        ContentKind::CtfComponent => ContentBody::CtfComponent {
            description: row.get(at)?,
            difficulty: row.get(at + 1)?,
            url: row.get(at + 2)?,
        },
        ContentKind::YoutubeChannel => ContentBody::YoutubeChannel {
            url: row.get(at)?,
            description: row.get(at + 1)?,
        },
        ContentKind::Post => ContentBody::Post {
            content: row.get(at)?,
            parent_id: opt_uuid_at(row, at + 1)?,
        },
    })
}

fn select_sql(kind: ContentKind) -> String {
    let extra: Vec<String> = body_columns(kind).iter().map(|c| format!("c.{}", c)).collect();
    // JOIN profiles to fetch author_username in a single query
    format!(
        "SELECT c.id, c.title, c.author_id, p.username, c.category_id, c.is_public, c.created_at, {}
         FROM {} c
         LEFT JOIN profiles p ON c.author_id = p.id",
        extra.join(", "),
        kind.table()
    )
}

fn item_row(kind: ContentKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentItem> {
    Ok(ContentItem {
        id: uuid_at(row, 0)?,
        title: row.get(1)?,
        author_id: uuid_at(row, 2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        category_id: opt_uuid_at(row, 4)?,
        is_public: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
        body: body_from_row(kind, row, 7)?,
    })
}

impl Database {
    /// Insert an item. The author username on `item` is display-only and
    /// not stored.
    pub fn insert_content(&self, item: &ContentItem) -> Result<()> {
        let kind = item.kind();
        let columns = body_columns(kind);
        let placeholders: Vec<String> = (7..7 + columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} (id, title, author_id, category_id, is_public, created_at, {}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, {})",
            kind.table(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let id = item.id.to_string();
        let author_id = item.author_id.to_string();
        let category_id = item.category_id.map(|c| c.to_string());
        let created_at = timestamp(&item.created_at);
        let body = body_values(&item.body);

        self.with_conn(|conn| {
            let mut params: Vec<&dyn ToSql> = vec![
                &id,
                &item.title,
                &author_id,
                &category_id,
                &item.is_public,
                &created_at,
            ];
            params.extend(body.iter().map(|v| v as &dyn ToSql));
            conn.execute(&sql, params.as_slice())?;
            Ok(())
        })
    }

    pub fn get_content(&self, kind: ContentKind, id: Uuid) -> Result<Option<ContentItem>> {
        self.with_conn(|conn| query_content(conn, kind, id))
    }

    pub fn list_content(&self, kind: ContentKind, filter: &ContentFilter) -> Result<Vec<ContentItem>> {
        self.with_conn(|conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut params: Vec<String> = Vec::new();

            if let Some(category_id) = filter.category_id {
                params.push(category_id.to_string());
                clauses.push("c.category_id = ?");
            }
            if kind == ContentKind::Post {
                match filter.parent_id {
                    Some(parent_id) => {
                        params.push(parent_id.to_string());
                        clauses.push("c.parent_id = ?");
                    }
                    None => clauses.push("c.parent_id IS NULL"),
                }
            }

            let mut sql = select_sql(kind);
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            // Replies read oldest-first; everything else newest-first.
            if kind == ContentKind::Post && filter.parent_id.is_some() {
                sql.push_str(" ORDER BY c.created_at ASC, c.rowid ASC");
            } else {
                sql.push_str(" ORDER BY c.created_at DESC, c.rowid DESC");
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| item_row(kind, row))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Replies to a post, oldest first.
    pub fn list_replies(&self, post_id: Uuid) -> Result<Vec<ContentItem>> {
        self.list_content(
            ContentKind::Post,
            &ContentFilter {
                category_id: None,
                parent_id: Some(post_id),
            },
        )
    }

    /// Returns false when no such item exists.
    pub fn set_visibility(&self, kind: ContentKind, id: Uuid, is_public: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                &format!("UPDATE {} SET is_public = ?1 WHERE id = ?2", kind.table()),
                rusqlite::params![is_public, id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete an item. Deleting a post also deletes its direct replies.
    /// Returns every removed id (empty when the item did not exist).
    pub fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut deleted = Vec::new();

            if kind == ContentKind::Post {
                let mut stmt = tx.prepare("SELECT id FROM posts WHERE parent_id = ?1")?;
                let replies = stmt
                    .query_map([id.to_string()], |row| uuid_at(row, 0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                drop(stmt);

                tx.execute("DELETE FROM posts WHERE parent_id = ?1", [id.to_string()])?;
                deleted.extend(replies);
            }

            let removed = tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
                [id.to_string()],
            )?;
            if removed == 0 {
                // Dropping the transaction rolls back.
                return Ok(Vec::new());
            }
            deleted.insert(0, id);

            tx.commit()?;
            Ok(deleted)
        })
    }
}

fn query_content(conn: &Connection, kind: ContentKind, id: Uuid) -> Result<Option<ContentItem>> {
    let sql = format!("{} WHERE c.id = ?1", select_sql(kind));
    let row = conn
        .query_row(&sql, [id.to_string()], |row| item_row(kind, row))
        .optional()?;
    Ok(row)
}
