//! Shared HTTP client and plain-GET adapters (schedule page, media downloads)

use async_trait::async_trait;
use courtside_domain::{
    FetchedMedia, MediaError, MediaFetcher, ScheduleError, ScheduleSource,
};
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_SCHEDULE_URL: &str = "https://goduke.com/sports/mens-basketball/schedule/text";

/// Build the client shared by every adapter; each request inherits the timeout
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// Fetches the text-only schedule page
pub struct HttpScheduleSource {
    client: Client,
    url: String,
}

impl HttpScheduleSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn fetch_schedule_text(&self) -> Result<String, ScheduleError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ScheduleError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScheduleError::Status {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ScheduleError::Network(e.to_string()))
    }
}

/// Downloads media bytes by URL
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        tracing::debug!(url = %url, bytes = bytes.len(), content_type = %content_type, "Fetched media");

        Ok(FetchedMedia {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_client("courtside-test/1.0", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_schedule_fetch_sends_user_agent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/schedule/text"))
            .and(header("User-Agent", "courtside-test/1.0"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("Nov 10 (Mon) 7 p.m. Home Texas\n"),
            )
            .mount(&mock_server)
            .await;

        let source =
            HttpScheduleSource::new(client(), format!("{}/schedule/text", mock_server.uri()));
        let text = source.fetch_schedule_text().await.unwrap();

        assert!(text.contains("Home Texas"));
    }

    #[tokio::test]
    async fn test_schedule_fetch_status_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let source = HttpScheduleSource::new(client(), mock_server.uri());
        let result = source.fetch_schedule_text().await;

        assert!(matches!(result, Err(ScheduleError::Status { status: 503 })));
    }

    #[tokio::test]
    async fn test_media_fetch_reports_content_type() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/media/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpMediaFetcher::new(client());
        let media = fetcher
            .fetch(&format!("{}/media/a.jpg", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(media.bytes, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(media.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_media_fetch_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpMediaFetcher::new(client());
        let result = fetcher.fetch(&format!("{}/gone.png", mock_server.uri())).await;

        assert!(matches!(result, Err(MediaError::Status { status: 404, .. })));
    }
}
