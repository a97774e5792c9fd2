use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE provider_tokens (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL,
                token       TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_provider_tokens_owner
                ON provider_tokens(owner_id);

            -- One URL per owner; the constraint, not a pre-check, is authoritative.
            CREATE TABLE channels (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL,
                name        TEXT NOT NULL,
                url         TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(owner_id, url)
            );

            -- Written by the ingestion pipeline; read-only here.
            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                content             TEXT NOT NULL,
                channel_url         TEXT,
                source_message_id   TEXT,
                posted_at           TEXT,
                ingested_at         TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerunning_migrations_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
