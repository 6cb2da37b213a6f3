use crate::Database;
use crate::models::{ProfileRow, profile_row, timestamp, uuid_at};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use hackvault_types::models::{Category, Profile};

const PROFILE_COLUMNS: &str = "id, username, email, password, is_admin, is_approved, created_at";

impl Database {
    // -- Profiles --

    /// Returns false when the username or email is already taken.
    pub fn create_profile(&self, profile: &Profile, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO profiles (id, username, email, password, is_admin, is_approved, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    profile.id.to_string(),
                    profile.username,
                    profile.email,
                    password_hash,
                    profile.is_admin,
                    profile.is_approved,
                    timestamp(&profile.created_at),
                ],
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "id", &id.to_string()))
    }

    pub fn get_profile_by_email(&self, email: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "email", email))
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "username", username))
    }

    /// All profiles, or only those still awaiting approval.
    pub fn list_profiles(&self, pending_only: bool) -> Result<Vec<Profile>> {
        self.with_conn(|conn| {
            let filter = if pending_only {
                "WHERE is_admin = 0 AND is_approved = 0"
            } else {
                ""
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM profiles {} ORDER BY created_at ASC",
                PROFILE_COLUMNS, filter
            ))?;

            let rows = stmt
                .query_map([], profile_row)?
                .map(|r| r.map(|row| row.profile))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Returns whether a row changed; approving twice changes nothing.
    pub fn approve_profile(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET is_approved = 1 WHERE id = ?1 AND is_approved = 0",
                [id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the profile only while it is still pending.
    pub fn delete_pending_profile(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM profiles WHERE id = ?1 AND is_admin = 0 AND is_approved = 0",
                [id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, slug FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], category_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, slug FROM categories WHERE id = ?1",
                    [id.to_string()],
                    category_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, slug FROM categories WHERE slug = ?1",
                    [slug],
                    category_row,
                )
                .optional()?;
            Ok(row)
        })
    }
}

/// `column` is always one of our own literals, never user input.
fn query_profile(conn: &Connection, column: &str, value: &str) -> Result<Option<ProfileRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM profiles WHERE {} = ?1",
        PROFILE_COLUMNS, column
    ))?;

    let row = stmt.query_row([value], profile_row).optional()?;
    Ok(row)
}

fn category_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
    })
}
