use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (playgrounds and comments)");
        conn.execute_batch(
            "
            CREATE TABLE playgrounds (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                name                TEXT NOT NULL,
                address             TEXT NOT NULL,
                postal_code         TEXT NOT NULL,
                city                TEXT NOT NULL,
                department          TEXT NOT NULL,
                long                REAL NOT NULL DEFAULT 0,
                lat                 REAL NOT NULL DEFAULT 0,
                coating             TEXT NOT NULL DEFAULT '',
                kind                TEXT NOT NULL DEFAULT '',
                open                INTEGER NOT NULL DEFAULT 0,
                author              TEXT NOT NULL,
                time_of_submission  TEXT NOT NULL,
                draft               INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX idx_playgrounds_draft ON playgrounds(draft);

            CREATE TABLE comments (
                playground_id       INTEGER NOT NULL REFERENCES playgrounds(id) ON DELETE CASCADE,
                id                  INTEGER NOT NULL,
                content             TEXT NOT NULL,
                author              TEXT NOT NULL,
                time_of_submission  TEXT NOT NULL,
                PRIMARY KEY (playground_id, id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
