//! Message summaries as served by `GET /messages`.
//!
//! The wire shape is checked at the boundary: every summary must carry a
//! non-empty `id` and a numeric `internalDate` (the backend sends a JSON
//! number, older builds sent a numeric string; both are accepted).

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// One entry of a result set. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSummary")]
pub struct MessageSummary {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub preview: String,
    /// Epoch milliseconds.
    pub internal_date: i64,
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("message id must not be empty")]
    EmptyId,
    #[error("internalDate '{0}' is not epoch milliseconds")]
    BadDate(String),
}

#[derive(Deserialize)]
struct RawSummary {
    id: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    preview: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(rename = "internalDate")]
    internal_date: EpochMillis,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EpochMillis {
    Number(i64),
    Text(String),
}

impl TryFrom<RawSummary> for MessageSummary {
    type Error = SummaryError;

    fn try_from(raw: RawSummary) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err(SummaryError::EmptyId);
        }
        let internal_date = match raw.internal_date {
            EpochMillis::Number(n) => n,
            EpochMillis::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| SummaryError::BadDate(s.clone()))?,
        };
        Ok(Self {
            id: raw.id,
            from: raw.from,
            subject: raw.subject,
            preview: raw.preview.or(raw.snippet).unwrap_or_default(),
            internal_date,
        })
    }
}

impl MessageSummary {
    /// When the message was received, in local time.
    pub fn received_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.internal_date).single()
    }

    /// Human-readable timestamp for list entries.
    pub fn display_date(&self) -> String {
        match self.received_at() {
            Some(ts) => ts.format("%Y/%m/%d %H:%M:%S").to_string(),
            None => "----/--/-- --:--:--".to_string(),
        }
    }

    /// File name used when saving the generated audio.
    pub fn audio_file_name(&self) -> String {
        audio_file_name(&self.id)
    }
}

pub fn audio_file_name(id: &str) -> String {
    format!("{}.mp3", id)
}

/// Body of `GET /messages` and `GET /messages/latest`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    /// The backend encodes an empty list as `null`.
    #[serde(deserialize_with = "null_as_empty")]
    pub messages: Vec<MessageSummary>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<MessageSummary>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<MessageSummary>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_numeric_and_text_dates() {
        let body = r#"{"messages":[
            {"id":"a","from":"x@example.com","subject":"s","preview":"p","internalDate":1700000000000},
            {"id":"b","from":"y@example.com","subject":"t","preview":"q","internalDate":"1700000001000"}
        ]}"#;
        let list: MessageList = serde_json::from_str(body).unwrap();
        assert_eq!(list.messages.len(), 2);
        assert_eq!(list.messages[0].internal_date, 1_700_000_000_000);
        assert_eq!(list.messages[1].internal_date, 1_700_000_001_000);
        assert_eq!(list.messages[1].id, "b");
    }

    #[test]
    fn test_null_messages_is_empty() {
        let list: MessageList = serde_json::from_str(r#"{"messages":null}"#).unwrap();
        assert!(list.messages.is_empty());
    }

    #[test]
    fn test_missing_messages_key_is_rejected() {
        assert!(serde_json::from_str::<MessageList>(r#"{"items":[]}"#).is_err());
    }

    #[test]
    fn test_empty_id_is_rejected() {
        let body = r#"{"messages":[{"id":"","internalDate":1}]}"#;
        let err = serde_json::from_str::<MessageList>(body).unwrap_err();
        assert!(err.to_string().contains("id must not be empty"));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let body = r#"{"messages":[{"id":"a","internalDate":"yesterday"}]}"#;
        assert!(serde_json::from_str::<MessageList>(body).is_err());
    }

    #[test]
    fn test_preview_falls_back_to_snippet() {
        let body = r#"{"id":"a","snippet":"hello","internalDate":0}"#;
        let msg: MessageSummary = serde_json::from_str(body).unwrap();
        assert_eq!(msg.preview, "hello");
        assert_eq!(msg.from, "");
    }

    #[test]
    fn test_display_date_uses_local_time() {
        let msg = MessageSummary {
            id: "a".into(),
            from: String::new(),
            subject: String::new(),
            preview: String::new(),
            internal_date: 1_700_000_000_000,
        };
        let expected = Local
            .timestamp_millis_opt(1_700_000_000_000)
            .unwrap()
            .format("%Y/%m/%d %H:%M:%S")
            .to_string();
        assert_eq!(msg.display_date(), expected);
        assert_eq!(msg.audio_file_name(), "a.mp3");
    }
}
