//! RapidAPI read adapter for fetching posts

use async_trait::async_trait;
use courtside_domain::{Post, PostSource, PostSourceError};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use super::normalize::{parse_list_timeline, parse_user_timeline};

pub const DEFAULT_RAPIDAPI_HOST: &str = "twitter-api45.p.rapidapi.com";

/// Where and how to read the timeline
#[derive(Debug, Clone)]
pub struct RapidApiConfig {
    pub base_url: String,
    /// Value of the `X-RapidAPI-Host` header
    pub host: String,
    /// Read a list timeline instead of the identity's own timeline
    pub list_id: Option<String>,
}

impl Default for RapidApiConfig {
    fn default() -> Self {
        Self {
            base_url: format!("https://{}", DEFAULT_RAPIDAPI_HOST),
            host: DEFAULT_RAPIDAPI_HOST.to_string(),
            list_id: None,
        }
    }
}

/// RapidAPI post source for reading X timelines
pub struct RapidApiPostSource {
    client: Client,
    api_key: SecretString,
    config: RapidApiConfig,
}

impl RapidApiPostSource {
    pub fn new(client: Client, api_key: SecretString, config: RapidApiConfig) -> Self {
        Self {
            client,
            api_key,
            config,
        }
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, PostSourceError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("X-RapidAPI-Key", self.api_key.expose_secret())
            .header("X-RapidAPI-Host", &self.config.host)
            .send()
            .await
            .map_err(|e| PostSourceError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PostSourceError::Auth(format!("HTTP {}", status.as_u16())));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PostSourceError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostSourceError::Api(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PostSourceError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl PostSource for RapidApiPostSource {
    async fn fetch_recent(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<Post>, PostSourceError> {
        let mut posts = match &self.config.list_id {
            Some(list_id) => {
                tracing::info!(list_id = %list_id, limit, "Fetching list timeline");
                let body = self
                    .get_json(
                        "/listtimeline.php",
                        &[("list_id", list_id.clone()), ("limit", limit.to_string())],
                    )
                    .await?;
                parse_list_timeline(&body, identity)?
            }
            None => {
                tracing::info!(identity = %identity, limit, "Fetching user timeline");
                let body = self
                    .get_json(
                        &format!("/user/tweets/{}", identity),
                        &[("limit", limit.to_string())],
                    )
                    .await?;
                parse_user_timeline(&body, identity)?
            }
        };

        posts.truncate(limit);
        tracing::info!(count = posts.len(), "Fetched posts");

        Ok(posts)
    }

    fn is_configured(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }
}
