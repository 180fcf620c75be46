//! Search and present: filter values in, rendered list out.

use mailcast_proto::{ApiError, Filter, MailApi, MessageSummary};
use tracing::{error, info};

use crate::components::message_list::MessageList;
use crate::session::{MediaPlayer, PlaybackController};

/// What a fetch was for; carried back with its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOrigin {
    Search(Filter),
    Latest,
}

impl FetchOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            FetchOrigin::Search(_) => "searching…",
            FetchOrigin::Latest => "fetching latest…",
        }
    }
}

/// Run the request for `origin`. Nothing is rendered here.
pub async fn fetch(
    api: &MailApi,
    origin: &FetchOrigin,
    max: usize,
) -> Result<Vec<MessageSummary>, ApiError> {
    match origin {
        FetchOrigin::Search(filter) => {
            let query = filter.query();
            info!(
                "[search] from={:?} title={:?} → q={:?}",
                filter.from,
                filter.title,
                query.as_str()
            );
            api.fetch_list(&query, max).await
        }
        FetchOrigin::Latest => api.fetch_latest().await,
    }
}

/// Render a successful result; on failure, log and leave the list and the
/// player exactly as they were.
pub async fn present<P: MediaPlayer>(
    result: Result<Vec<MessageSummary>, ApiError>,
    list: &mut MessageList,
    playback: &mut PlaybackController<P>,
) -> Result<usize, ApiError> {
    match result {
        Ok(messages) => {
            info!("[search] received {} messages", messages.len());
            Ok(list.render(messages, playback).await)
        }
        Err(e) => {
            error!("[search] fetch failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlayer;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_search_renders_results_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages"))
            .and(query_param("max", "5"))
            .and(query_param("q", "subject:週刊Life subject:is subject:beautiful"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    { "id": "m2", "from": "a", "subject": "second", "preview": "p", "internalDate": 2 },
                    { "id": "m1", "from": "a", "subject": "first", "preview": "p", "internalDate": 1 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = MailApi::new(&server.uri()).unwrap();
        let mut list = MessageList::new();
        let mut playback = PlaybackController::new(FakePlayer::default());
        playback.stream(&api, "previous").await.unwrap();

        let origin = FetchOrigin::Search(Filter::new("", "週刊Life is beautiful"));
        let result = fetch(&api, &origin, 5).await;
        let rendered = present(result, &mut list, &mut playback).await.unwrap();

        assert_eq!(rendered, 2);
        let ids: Vec<&str> = list.entries().iter().map(|e| e.id()).collect();
        assert_eq!(ids, ["m2", "m1"]);
        assert!(playback.player().source().is_none());
        assert!(playback.player().paused);
    }

    #[tokio::test]
    async fn test_failed_search_keeps_previous_list_and_playback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let api = MailApi::new(&server.uri()).unwrap();
        let mut list = MessageList::new();
        let mut playback = PlaybackController::new(FakePlayer::default());
        let previous = MessageSummary {
            id: "kept".into(),
            from: "a".into(),
            subject: "b".into(),
            preview: "c".into(),
            internal_date: 0,
        };
        list.render(vec![previous], &mut playback).await;
        playback.stream(&api, "kept").await.unwrap();

        let origin = FetchOrigin::Search(Filter::new("", ""));
        let result = fetch(&api, &origin, 5).await;
        let err = present(result, &mut list, &mut playback).await.unwrap_err();

        assert!(err.is_server());
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].id(), "kept");
        assert!(playback.player().source().is_some());
        assert!(playback.session().is_active("kept"));
    }

    #[tokio::test]
    async fn test_latest_origin_hits_latest_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messages": null })))
            .expect(1)
            .mount(&server)
            .await;

        let api = MailApi::new(&server.uri()).unwrap();
        let messages = fetch(&api, &FetchOrigin::Latest, 5).await.unwrap();
        assert!(messages.is_empty());
    }
}
