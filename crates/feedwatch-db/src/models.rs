//! Database row types. These map directly to SQLite rows.
//! Converted into feedwatch-types models on read so corrupt rows surface as
//! errors instead of leaking out of the store.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use feedwatch_types::models::{Channel, Message};

pub struct ChannelRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub url: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub content: String,
    pub channel_url: Option<String>,
    pub source_message_id: Option<String>,
    pub posted_at: Option<String>,
}

impl TryFrom<ChannelRow> for Channel {
    type Error = anyhow::Error;

    fn try_from(row: ChannelRow) -> Result<Self> {
        let id: Uuid = row
            .id
            .parse()
            .with_context(|| format!("Corrupt channel id '{}'", row.id))?;
        let created_at = parse_timestamp(&row.created_at)
            .ok_or_else(|| anyhow!("Corrupt created_at '{}' on channel '{}'", row.created_at, row.id))?;

        Ok(Channel {
            id,
            owner_id: row.owner_id,
            name: row.name,
            url: row.url,
            created_at,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        let posted_at = match row.posted_at.as_deref() {
            Some(raw) => Some(
                parse_timestamp(raw)
                    .ok_or_else(|| anyhow!("Corrupt posted_at '{}' on message '{}'", raw, row.id))?,
            ),
            None => None,
        };

        Ok(Message {
            id: row.id,
            content: row.content,
            channel_url: row.channel_url,
            source_message_id: row.source_message_id,
            posted_at,
        })
    }
}

/// Accepts RFC 3339 as well as SQLite's `datetime('now')` format, which has
/// no timezone and is UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
