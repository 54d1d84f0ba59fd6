// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Giphy search adapter implementing [`GifSource`].

use std::time::Duration;

use async_trait::async_trait;
use balbes_config::model::MediaConfig;
use balbes_core::{AdapterType, BalbesError, GifSource, HealthStatus, PluginAdapter};
use serde::Deserialize;
use tracing::debug;

/// Results requested per search.
const SEARCH_LIMIT: u32 = 8;

/// Words of the message text used as the search query.
const QUERY_WORDS: usize = 5;

/// Query used when the message has no words at all.
const FALLBACK_QUERY: &str = "reaction";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<GifObject>,
}

#[derive(Debug, Default, Deserialize)]
struct GifObject {
    #[serde(default)]
    images: Images,
}

#[derive(Debug, Default, Deserialize)]
struct Images {
    original_mp4: Option<Rendition>,
    fixed_height_mp4: Option<Rendition>,
    original: Option<Rendition>,
}

#[derive(Debug, Default, Deserialize)]
struct Rendition {
    mp4: Option<String>,
    url: Option<String>,
}

impl GifObject {
    /// Preferred rendition: mp4 variants first, then the original GIF.
    fn best_url(self) -> Option<String> {
        let Images {
            original_mp4,
            fixed_height_mp4,
            original,
        } = self.images;
        let original = original.unwrap_or_default();

        [
            original_mp4.and_then(|r| r.mp4),
            fixed_height_mp4.and_then(|r| r.mp4),
            original.mp4,
            original.url,
        ]
        .into_iter()
        .flatten()
        .find(|u| !u.is_empty())
    }
}

/// Builds a search query from the first few words of a message.
pub fn search_query(text: &str) -> String {
    let query = text
        .split_whitespace()
        .take(QUERY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    if query.is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        query
    }
}

/// Giphy API client.
///
/// API key resolution order: `media.giphy_api_key` -> `GIPHY_API_KEY` env var -> error.
#[derive(Debug, Clone)]
pub struct GiphyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    rating: String,
    lang: String,
}

impl GiphyClient {
    pub fn new(config: &MediaConfig) -> Result<Self, BalbesError> {
        let api_key = resolve_api_key(&config.giphy_api_key)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BalbesError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.giphy_base_url.trim_end_matches('/').to_string(),
            rating: config.giphy_rating.clone(),
            lang: config.giphy_lang.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for GiphyClient {
    fn name(&self) -> &str {
        "giphy"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::GifSource
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        Ok(())
    }
}

#[async_trait]
impl GifSource for GiphyClient {
    async fn search(&self, text: &str) -> Result<Option<String>, BalbesError> {
        let query = search_query(text);
        let limit = SEARCH_LIMIT.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("q", query.as_str()),
                ("limit", limit.as_str()),
                ("rating", self.rating.as_str()),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BalbesError::Internal(format!("giphy request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "giphy search returned an error status");
            return Ok(None);
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| BalbesError::Internal(format!("invalid giphy response: {e}")))?;

        let url = body.data.into_iter().find_map(GifObject::best_url);
        debug!(query = %query, found = url.is_some(), "giphy search finished");
        Ok(url)
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, BalbesError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GIPHY_API_KEY").map_err(|_| {
        BalbesError::Config(
            "Giphy API key not found. Set media.giphy_api_key in config or GIPHY_API_KEY environment variable.".into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GiphyClient {
        let config = MediaConfig {
            giphy_api_key: Some("gk".into()),
            giphy_base_url: server.uri(),
            ..MediaConfig::default()
        };
        GiphyClient::new(&config).unwrap()
    }

    #[test]
    fn query_keeps_first_five_words() {
        assert_eq!(search_query("  раз два\nтри четыре пять шесть "), "раз два три четыре пять");
        assert_eq!(search_query("   "), "reaction");
    }

    #[tokio::test]
    async fn search_prefers_mp4_rendition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "gk"))
            .and(query_param("q", "ну ты даёшь"))
            .and(query_param("limit", "8"))
            .and(query_param("rating", "r"))
            .and(query_param("lang", "ru"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"images": {}},
                    {"images": {
                        "original": {"url": "https://g/orig.gif", "mp4": "https://g/orig.mp4"},
                        "fixed_height_mp4": {"mp4": "https://g/fh.mp4"}
                    }}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.search("ну ты даёшь").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://g/fh.mp4"));
    }

    #[tokio::test]
    async fn search_falls_back_to_original_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"images": {"original": {"url": "https://g/orig.gif"}}}]
            })))
            .mount(&server)
            .await;

        let url = client_for(&server).search("кек").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://g/orig.gif"));
    }

    #[tokio::test]
    async fn error_status_means_no_gif() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).search("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_results_mean_no_gif() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).search("x").await.unwrap(), None);
    }
}
