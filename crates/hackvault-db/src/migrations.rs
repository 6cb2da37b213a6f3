use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Columns every content table carries, followed by the table's own ones.
const CONTENT_COMMON: &str = "
    id           TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    author_id    TEXT NOT NULL REFERENCES profiles(id),
    category_id  TEXT REFERENCES categories(id),
    is_public    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(&format!(
            "
            CREATE TABLE profiles (
                id           TEXT PRIMARY KEY,
                username     TEXT NOT NULL UNIQUE,
                email        TEXT NOT NULL UNIQUE,
                password     TEXT NOT NULL,
                is_admin     INTEGER NOT NULL DEFAULT 0,
                is_approved  INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE categories (
                id    TEXT PRIMARY KEY,
                name  TEXT NOT NULL,
                slug  TEXT NOT NULL UNIQUE
            );

            CREATE TABLE code_snippets ({common},
                code      TEXT NOT NULL,
                language  TEXT
            );

            CREATE TABLE write_ups ({common},
                content  TEXT NOT NULL
            );

            CREATE TABLE testing_tools ({common},
                url          TEXT NOT NULL,
                description  TEXT
            );

            CREATE TABLE ctf_components ({common},
                description  TEXT NOT NULL,
                difficulty   TEXT,
                url          TEXT
            );

            CREATE TABLE youtube_channels ({common},
                url          TEXT NOT NULL,
                description  TEXT
            );

            CREATE TABLE posts ({common},
                content    TEXT NOT NULL,
                parent_id  TEXT REFERENCES posts(id)
            );

            CREATE INDEX idx_posts_parent ON posts(parent_id);

            INSERT INTO categories (id, name, slug) VALUES
                ('00000000-0000-0000-0000-000000000001', 'Web Exploitation', 'web-exploitation'),
                ('00000000-0000-0000-0000-000000000002', 'Binary Exploitation', 'binary-exploitation'),
                ('00000000-0000-0000-0000-000000000003', 'Cryptography', 'cryptography'),
                ('00000000-0000-0000-0000-000000000004', 'Forensics', 'forensics'),
                ('00000000-0000-0000-0000-000000000005', 'Reverse Engineering', 'reverse-engineering'),
                ('00000000-0000-0000-0000-000000000006', 'OSINT', 'osint'),
                ('00000000-0000-0000-0000-000000000007', 'Networking', 'networking'),
                ('00000000-0000-0000-0000-000000000008', 'Announcements', 'announcements'),
                ('00000000-0000-0000-0000-000000000009', 'Rules', 'rules');

            INSERT INTO schema_version (version) VALUES (1);
            ",
            common = CONTENT_COMMON
        ))?;
    }

    info!("Database migrations complete");
    Ok(())
}
