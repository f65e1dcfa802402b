use crate::errors::DbError;
use crate::refresh::CacheMetadata;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub fn load_feed_metadata(conn: &Connection, feed: &str) -> Result<Option<CacheMetadata>, DbError> {
    let row = conn
        .query_row(
            "SELECT feed, last_update, item_count, content_hash FROM feed_metadata WHERE feed = ?",
            params![feed],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((feed, last_update, item_count, content_hash)) = row else {
        return Ok(None);
    };

    // An unreadable timestamp counts as never fetched.
    let last_update = last_update
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Some(CacheMetadata {
        feed,
        last_update,
        item_count: item_count.max(0) as usize,
        content_hash,
    }))
}

pub fn save_feed_metadata(conn: &Connection, meta: &CacheMetadata) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO feed_metadata (feed, last_update, item_count, content_hash) VALUES (?, ?, ?, ?)
         ON CONFLICT(feed) DO UPDATE SET last_update = excluded.last_update,
             item_count = excluded.item_count, content_hash = excluded.content_hash",
        params![
            meta.feed,
            meta.last_update.map(|dt| dt.to_rfc3339()),
            meta.item_count as i64,
            meta.content_hash
        ],
    )?;
    Ok(())
}
