use crate::feed::parser::{parse_feed, FeedParseError, ResolvedFeed};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while resolving a feed title.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Body could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Feed parsed but declares no title
    #[error("Feed has no title")]
    MissingTitle,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Maps a subscription URL to the feed behind it.
///
/// Export only depends on this trait, so tests can swap the network out.
#[allow(async_fn_in_trait)]
pub trait TitleResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedFeed, FetchError>;
}

/// Resolves titles by downloading the feed over HTTP.
///
/// One GET per call, no retries. Non-2xx statuses fail immediately.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpResolver {
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client, timeout))
    }

    pub fn with_client(client: reqwest::Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

impl TitleResolver for HttpResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedFeed, FetchError> {
        let bytes = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch(url))
                .await
                .map_err(|_| FetchError::Timeout(limit))??,
            None => self.fetch(url).await?,
        };

        let feed = parse_feed(&bytes).map_err(|e| match e {
            FeedParseError::MissingTitle => FetchError::MissingTitle,
            FeedParseError::Invalid(e) => FetchError::Parse(e.to_string()),
        })?;
        tracing::debug!(url = %url, title = %feed.title, kind = feed.kind.as_str(), "Resolved feed");
        Ok(feed)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>A Show</title>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    fn resolver(timeout: Option<Duration>) -> HttpResolver {
        HttpResolver::with_client(reqwest::Client::new(), timeout)
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let feed = resolver(None).resolve(&url).await.unwrap();
        assert_eq!(feed.title, "A Show");
        assert_eq!(feed.kind, FeedKind::Rss);
    }

    #[tokio::test]
    async fn test_resolve_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        match resolver(None).resolve(&url).await.unwrap_err() {
            FetchError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_resolve_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let err = resolver(None).resolve(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(500)));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        match resolver(None).resolve(&url).await.unwrap_err() {
            FetchError::Parse(_) => {}
            e => panic!("Expected Parse error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_untitled_feed_is_missing_title() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#,
            ))
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let err = resolver(None).resolve(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingTitle), "{:?}", err);
    }

    #[tokio::test]
    async fn test_oversized_content_length_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b' '; MAX_FEED_SIZE + 1]))
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let err = resolver(None).resolve(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::ResponseTooLarge), "{:?}", err);
    }

    #[tokio::test]
    async fn test_slow_feed_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let err = resolver(Some(Duration::from_millis(100)))
            .resolve(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is closed on test machines.
        let err = resolver(None)
            .resolve("http://127.0.0.1:9/feed")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
