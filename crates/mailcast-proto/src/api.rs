//! Client for the mail/TTS backend.
//!
//! Endpoints:
//!   GET  /messages?max=N[&q=QUERY]   → { messages: [...] }
//!   GET  /messages/latest            → { messages: [...] }
//!   POST /messages/{id}/tts          → 2xx once the merged mp3 exists
//!   GET  /messages/{id}/tts/stream   → progressive audio
//!   GET  /audios/merged/{id}.mp3     → the generated file
//!   GET  /healthz

use std::time::Duration;

use reqwest::{Client, Response, Url};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::message::{audio_file_name, MessageList, MessageSummary};
use crate::query::SearchQuery;

#[derive(Debug, Clone)]
pub struct MailApi {
    http: Client,
    /// Normalised base URL without trailing slash.
    base: String,
    limit_chars: Option<u32>,
}

impl MailApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            base: normalize_base_url(base_url)?,
            limit_chars: None,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let api = Self::with_client(&config.base_url, builder.build()?)?;
        Ok(api.with_limit_chars(config.limit_chars))
    }

    pub fn with_limit_chars(mut self, limit_chars: Option<u32>) -> Self {
        self.limit_chars = limit_chars.filter(|n| *n > 0);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    // ── URL construction ─────────────────────────────────────────────────────

    /// `q` is appended only for a non-empty query; it is already encoded.
    pub fn list_url(&self, query: &SearchQuery, max: usize) -> String {
        if query.is_empty() {
            format!("{}/messages?max={}", self.base, max)
        } else {
            format!("{}/messages?max={}&q={}", self.base, max, query)
        }
    }

    pub fn latest_url(&self) -> String {
        format!("{}/messages/latest", self.base)
    }

    pub fn generate_url(&self, id: &str) -> String {
        self.with_limit(format!("{}/messages/{}/tts", self.base, urlencoding::encode(id)))
    }

    pub fn stream_url(&self, id: &str) -> String {
        self.with_limit(format!(
            "{}/messages/{}/tts/stream",
            self.base,
            urlencoding::encode(id)
        ))
    }

    pub fn download_url(&self, id: &str) -> String {
        format!(
            "{}/audios/merged/{}",
            self.base,
            urlencoding::encode(&audio_file_name(id))
        )
    }

    pub fn health_url(&self) -> String {
        format!("{}/healthz", self.base)
    }

    fn with_limit(&self, url: String) -> String {
        match self.limit_chars {
            Some(n) => format!("{}?limit={}", url, n),
            None => url,
        }
    }

    // ── Requests ─────────────────────────────────────────────────────────────

    /// Run one search and return the summaries in server order.
    pub async fn fetch_list(
        &self,
        query: &SearchQuery,
        max: usize,
    ) -> Result<Vec<MessageSummary>, ApiError> {
        let url = self.list_url(query, max);
        info!("[api] GET {}", url);
        self.get_messages(&url).await
    }

    /// The single most recent message (wrapped in a list).
    pub async fn fetch_latest(&self) -> Result<Vec<MessageSummary>, ApiError> {
        let url = self.latest_url();
        info!("[api] GET {}", url);
        self.get_messages(&url).await
    }

    /// Ask the backend to synthesize and merge the audio for `id`.
    /// The response body is ignored.
    pub async fn generate_audio(&self, id: &str) -> Result<(), ApiError> {
        let url = self.generate_url(id);
        info!("[api] POST {}", url);
        let response = self.http.post(parse_url(&url)?).send().await?;
        check_status(response, &url)?;
        Ok(())
    }

    /// GET a resource URL (typically from `download_url`) for streaming,
    /// failing on non-success status.
    pub async fn open(&self, url: &str) -> Result<Response, ApiError> {
        debug!("[api] GET {}", url);
        let response = self.http.get(parse_url(url)?).send().await?;
        check_status(response, url)
    }

    pub async fn health(&self) -> Result<(), ApiError> {
        let url = self.health_url();
        let response = self.http.get(parse_url(&url)?).send().await?;
        check_status(response, &url)?;
        Ok(())
    }

    async fn get_messages(&self, url: &str) -> Result<Vec<MessageSummary>, ApiError> {
        let response = self.http.get(parse_url(url)?).send().await?;
        let response = check_status(response, url)?;
        let body = response.bytes().await?;
        let list: MessageList = serde_json::from_slice(&body)?;
        warn_on_duplicate_ids(&list.messages);
        debug!("[api] {} returned {} messages", url, list.messages.len());
        Ok(list.messages)
    }
}

fn check_status(response: Response, url: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Server {
            status,
            url: url.to_string(),
        })
    }
}

fn parse_url(url: &str) -> Result<Url, ApiError> {
    Url::parse(url).map_err(|e| ApiError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::InvalidUrl {
            url: raw.to_string(),
            reason: "base url must not be empty".to_string(),
        });
    }
    let parsed = parse_url(trimmed)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

fn warn_on_duplicate_ids(messages: &[MessageSummary]) {
    let mut seen = std::collections::HashSet::new();
    for m in messages {
        if !seen.insert(m.id.as_str()) {
            warn!("[api] duplicate message id {} in result set", m.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_query;

    fn api() -> MailApi {
        MailApi::new("http://mail.lan:3000/").unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        assert_eq!(api().base_url(), "http://mail.lan:3000");
    }

    #[test]
    fn test_base_url_validation() {
        assert!(MailApi::new("").is_err());
        assert!(MailApi::new("not a url").is_err());
        assert!(MailApi::new("ftp://mail.lan").is_err());
    }

    #[test]
    fn test_list_url_omits_empty_query() {
        let url = api().list_url(&build_query(" ", ""), 5);
        assert_eq!(url, "http://mail.lan:3000/messages?max=5");
        assert!(!url.contains("q="));
    }

    #[test]
    fn test_list_url_appends_encoded_query() {
        let url = api().list_url(&build_query("", "x y"), 20);
        assert_eq!(
            url,
            "http://mail.lan:3000/messages?max=20&q=subject%3Ax%20subject%3Ay"
        );
    }

    #[test]
    fn test_per_message_urls() {
        let api = api();
        assert_eq!(api.stream_url("18c2f"), "http://mail.lan:3000/messages/18c2f/tts/stream");
        assert_eq!(api.generate_url("18c2f"), "http://mail.lan:3000/messages/18c2f/tts");
        assert_eq!(api.download_url("18c2f"), "http://mail.lan:3000/audios/merged/18c2f.mp3");
    }

    #[test]
    fn test_limit_chars_is_forwarded() {
        let api = api().with_limit_chars(Some(300));
        assert_eq!(api.generate_url("a"), "http://mail.lan:3000/messages/a/tts?limit=300");
        assert_eq!(api.stream_url("a"), "http://mail.lan:3000/messages/a/tts/stream?limit=300");
        assert_eq!(api.download_url("a"), "http://mail.lan:3000/audios/merged/a.mp3");

        let api = api.with_limit_chars(Some(0));
        assert_eq!(api.generate_url("a"), "http://mail.lan:3000/messages/a/tts");
    }
}
