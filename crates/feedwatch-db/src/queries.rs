use crate::models::{ChannelRow, MessageRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode};

/// Result of an insert into the owner-scoped channel list.
pub enum ChannelInsert {
    Created(ChannelRow),
    /// The owner already has a channel with this URL; nothing was written.
    DuplicateUrl,
}

impl Database {
    // -- Provider tokens --

    pub fn insert_token(&self, id: &str, owner_id: &str, token: &str, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO provider_tokens (id, owner_id, token, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, owner_id, token, created_at),
            )?;
            Ok(())
        })
    }

    pub fn count_tokens_for_owner(&self, owner_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM provider_tokens WHERE owner_id = ?1",
                [owner_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Channels --

    pub fn list_channels(&self, owner_id: &str) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| query_channels(conn, owner_id))
    }

    pub fn find_channel_by_url(&self, owner_id: &str, url: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner_id, name, url, created_at FROM channels WHERE owner_id = ?1 AND url = ?2",
                (owner_id, url),
                channel_from_row,
            )
            .optional()
        })
    }

    /// Insert-if-absent on `(owner_id, url)`. The UNIQUE constraint decides,
    /// so two racing inserts cannot both succeed.
    pub fn insert_channel(&self, id: &str, owner_id: &str, name: &str, url: &str) -> Result<ChannelInsert> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO channels (id, owner_id, name, url) VALUES (?1, ?2, ?3, ?4)",
                (id, owner_id, name, url),
            );

            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(ChannelInsert::DuplicateUrl),
                Err(e) => return Err(e.into()),
            }

            let row = conn.query_row(
                "SELECT id, owner_id, name, url, created_at FROM channels WHERE id = ?1",
                [id],
                channel_from_row,
            )?;
            Ok(ChannelInsert::Created(row))
        })
    }

    /// Deletes a channel only if it belongs to `owner_id`.
    /// Returns the number of rows removed (0 or 1).
    pub fn delete_channel(&self, owner_id: &str, id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM channels WHERE id = ?1 AND owner_id = ?2",
                (id, owner_id),
            )?;
            Ok(removed)
        })
    }

    // -- Messages --

    /// Case-insensitive (Unicode), unanchored substring match on message
    /// content. `keyword` is matched literally, wildcards included.
    pub fn search_messages(&self, keyword: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, channel_url, source_message_id, posted_at
                 FROM messages
                 WHERE contains_folded(content, ?1)
                 ORDER BY COALESCE(posted_at, ingested_at) DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([keyword], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        channel_url: row.get(2)?,
                        source_message_id: row.get(3)?,
                        posted_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Write path for the ingestion pipeline.
    pub fn insert_message(
        &self,
        id: &str,
        content: &str,
        channel_url: Option<&str>,
        source_message_id: Option<&str>,
        posted_at: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, content, channel_url, source_message_id, posted_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, content, channel_url, source_message_id, posted_at],
            )?;
            Ok(())
        })
    }
}

fn query_channels(conn: &Connection, owner_id: &str) -> Result<Vec<ChannelRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, url, created_at
         FROM channels
         WHERE owner_id = ?1
         ORDER BY rowid",
    )?;

    let rows = stmt
        .query_map([owner_id], channel_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn channel_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        url: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn created(outcome: ChannelInsert) -> ChannelRow {
        match outcome {
            ChannelInsert::Created(row) => row,
            ChannelInsert::DuplicateUrl => panic!("expected insert, got duplicate"),
        }
    }

    #[test]
    fn duplicate_url_for_same_owner_is_refused() {
        let db = db();
        created(db.insert_channel("c1", "u1", "Alpha", "https://t.me/alpha").unwrap());

        let second = db.insert_channel("c2", "u1", "Beta", "https://t.me/alpha").unwrap();
        assert!(matches!(second, ChannelInsert::DuplicateUrl));
        assert_eq!(db.list_channels("u1").unwrap().len(), 1);
    }

    #[test]
    fn same_url_is_allowed_for_different_owners() {
        let db = db();
        created(db.insert_channel("c1", "u1", "Alpha", "https://t.me/alpha").unwrap());
        created(db.insert_channel("c2", "u2", "Alpha", "https://t.me/alpha").unwrap());

        assert_eq!(db.list_channels("u1").unwrap().len(), 1);
        assert_eq!(db.list_channels("u2").unwrap().len(), 1);
    }

    #[test]
    fn list_is_scoped_and_in_insertion_order() {
        let db = db();
        created(db.insert_channel("c1", "u1", "First", "https://t.me/one").unwrap());
        created(db.insert_channel("c2", "u2", "Other", "https://t.me/other").unwrap());
        created(db.insert_channel("c3", "u1", "Second", "https://t.me/two").unwrap());

        let names: Vec<String> = db.list_channels("u1").unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn find_by_url_matches_exact_owner_and_url() {
        let db = db();
        created(db.insert_channel("c1", "u1", "Alpha", "https://t.me/alpha").unwrap());

        assert!(db.find_channel_by_url("u1", "https://t.me/alpha").unwrap().is_some());
        assert!(db.find_channel_by_url("u2", "https://t.me/alpha").unwrap().is_none());
        assert!(db.find_channel_by_url("u1", "https://t.me/beta").unwrap().is_none());
    }

    #[test]
    fn delete_is_owner_scoped() {
        let db = db();
        created(db.insert_channel("c1", "u1", "Alpha", "https://t.me/alpha").unwrap());

        assert_eq!(db.delete_channel("u2", "c1").unwrap(), 0);
        assert_eq!(db.list_channels("u1").unwrap().len(), 1);

        assert_eq!(db.delete_channel("u1", "c1").unwrap(), 1);
        assert_eq!(db.delete_channel("u1", "c1").unwrap(), 0);
        assert!(db.list_channels("u1").unwrap().is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let db = db();
        db.insert_message("m1", "Testnet launch FCFS", None, None, None).unwrap();
        db.insert_message("m2", "Nothing to see", None, None, None).unwrap();

        for kw in ["fcfs", "FCFS", "net lau"] {
            let hits = db.search_messages(kw).unwrap();
            assert_eq!(hits.len(), 1, "keyword {kw:?}");
            assert_eq!(hits[0].id, "m1");
        }
        assert!(db.search_messages("zzz-no-match").unwrap().is_empty());
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let db = db();
        db.insert_message("m1", "Привет мир ÉTÉ", None, None, None).unwrap();
        db.insert_message("m2", "Straße gesperrt", None, None, None).unwrap();

        for kw in ["привет", "ПРИВЕТ", "été", "Été"] {
            let hits = db.search_messages(kw).unwrap();
            assert_eq!(hits.len(), 1, "keyword {kw:?}");
            assert_eq!(hits[0].id, "m1");
        }
        assert_eq!(db.search_messages("STRASSE").unwrap().len(), 0);
        assert_eq!(db.search_messages("STRAßE").unwrap().len(), 1);
    }

    #[test]
    fn search_treats_like_wildcards_literally() {
        let db = db();
        db.insert_message("m1", "100% allocation", None, None, None).unwrap();
        db.insert_message("m2", "100 percent", None, None, None).unwrap();
        db.insert_message("m3", "snake_case", None, None, None).unwrap();
        db.insert_message("m4", "snakeXcase", None, None, None).unwrap();

        let pct = db.search_messages("100%").unwrap();
        assert_eq!(pct.len(), 1);
        assert_eq!(pct[0].id, "m1");

        let underscore = db.search_messages("e_c").unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].id, "m3");
    }

    #[test]
    fn tokens_accumulate_per_exchange() {
        let db = db();
        db.insert_token("t1", "u1", "tok", "2024-10-01T12:00:00Z").unwrap();
        db.insert_token("t2", "u1", "tok2", "2024-10-02T12:00:00Z").unwrap();

        assert_eq!(db.count_tokens_for_owner("u1").unwrap(), 2);
        assert_eq!(db.count_tokens_for_owner("u2").unwrap(), 0);
    }
}
