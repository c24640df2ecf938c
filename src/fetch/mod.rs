//! Realtime snapshot retrieval.
//!
//! A snapshot is fetched once per query and never cached.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

/// Upper bound on a single realtime fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads the raw body at `url`, failing on any non-2xx status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    Ok(resp.bytes().await?.to_vec())
}

/// Fetches and decodes one GTFS-RT snapshot.
#[tracing::instrument(skip(client))]
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Result<FeedMessage, FetchError> {
    let bytes = fetch_bytes(client, url).await?;
    debug!(bytes = bytes.len(), "Feed bytes received, parsing");

    let feed = parse_feed(&bytes)?;
    debug!(entity_count = feed.entity.len(), "Feed parsed successfully");
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl HttpClient for Unreachable {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            panic!("request should not be sent");
        }
    }

    /// Answers every request with a fixed status and body.
    struct Canned {
        status: u16,
        body: Vec<u8>,
    }

    #[async_trait]
    impl HttpClient for Canned {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body.clone())
                .expect("valid canned response");
            Ok(reqwest::Response::from(resp))
        }
    }

    const URL: &str = "https://feed.example/gtfs-rt";

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let client = Canned {
            status: 503,
            body: b"down for maintenance".to_vec(),
        };

        let err = fetch_feed(&client, URL).await.unwrap_err();

        match err {
            FetchError::Status(status) => assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_reported() {
        let client = Canned {
            status: 200,
            body: vec![0xFF, 0xFE, 0x00, 0x01],
        };

        let err = fetch_feed(&client, URL).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_valid_body_is_decoded() {
        use prost::Message;

        let feed = FeedMessage {
            entity: vec![crate::gtfs_rt::FeedEntity {
                id: "1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let client = Canned {
            status: 200,
            body: feed.encode_to_vec(),
        };

        let fetched = fetch_feed(&client, URL).await.unwrap();
        assert_eq!(fetched.entity.len(), 1);
        assert_eq!(fetched.entity[0].id, "1");
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_sending() {
        let err = fetch_feed(&Unreachable, "not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_basic_client_builds() {
        assert!(BasicClient::new(FETCH_TIMEOUT).is_ok());
    }
}
