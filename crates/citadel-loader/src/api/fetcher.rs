//! Paginated resource fetcher.
//!
//! Page 1 is requested first because it carries the total page count. Pages
//! 2..N are then requested through a bounded fan-out (`page_concurrency`
//! requests in flight) and concatenated in ascending page order.

use super::records::{Page, ResourceRecord};
use super::Resource;
use crate::error::FetchError;
use citadel_config::ApiConfig;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    client: Client,
    base_url: String,
    page_concurrency: usize,
}

impl ResourceFetcher {
    /// Create a fetcher around an existing client.
    #[must_use]
    pub fn new(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_concurrency: config.page_concurrency.max(1),
        }
    }

    /// Build a client with the configured timeout and user agent.
    pub fn from_config(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self::new(client, config))
    }

    pub fn page_url(&self, resource: Resource, page: u32) -> String {
        format!("{}/{}/?page={}", self.base_url, resource, page)
    }

    /// Fetch every page of `R`'s collection.
    ///
    /// Records come back in page order, then in the order the API returned
    /// them within each page. Any failing page fails the whole fetch.
    pub async fn fetch_all<R: ResourceRecord>(&self) -> Result<Vec<R>, FetchError> {
        let resource = R::RESOURCE;
        let first: Page<R> = self.fetch_page(resource, 1).await?;
        let total_pages = first.info.pages;
        let mut records = first.results;

        if total_pages > 1 {
            let remaining: Vec<Page<R>> = stream::iter(2..=total_pages)
                .map(|page| self.fetch_page::<R>(resource, page))
                .buffered(self.page_concurrency)
                .try_collect()
                .await?;

            for page in remaining {
                records.extend(page.results);
            }
        }

        info!(
            resource = %resource,
            pages = total_pages,
            records = records.len(),
            "Fetched {}",
            resource
        );
        Ok(records)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: Resource,
        page: u32,
    ) -> Result<Page<T>, FetchError> {
        let url = self.page_url(resource, page);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;
        let parsed: Page<T> =
            serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })?;

        debug!(
            "Fetched {} page #{}, {} records",
            resource,
            page,
            parsed.results.len()
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Character, Episode, Location};
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> ApiConfig {
        ApiConfig {
            base_url: format!("{}/api", server.uri()),
            page_concurrency: 2,
            ..ApiConfig::default()
        }
    }

    fn episode_page(pages: u32, ids: std::ops::Range<i64>) -> Value {
        let results: Vec<Value> = ids
            .map(|id| json!({"id": id, "name": format!("Episode {}", id), "episode": format!("S01E{:02}", id)}))
            .collect();
        json!({"info": {"pages": pages, "count": 47}, "results": results})
    }

    async fn mount_page(server: &MockServer, resource: &str, page: u32, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}/", resource)))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_concatenates_all_pages_in_order() {
        let server = MockServer::start().await;
        mount_page(&server, "episode", 1, episode_page(3, 1..21)).await;
        mount_page(&server, "episode", 2, episode_page(3, 21..41)).await;
        mount_page(&server, "episode", 3, episode_page(3, 41..48)).await;

        let fetcher = ResourceFetcher::new(Client::new(), &test_config(&server));
        let episodes: Vec<Episode> = fetcher.fetch_all().await.unwrap();

        assert_eq!(episodes.len(), 47);
        assert_eq!(episodes[0].id, 1);
        let ids: Vec<i64> = episodes.iter().map(|e| e.id).collect();
        assert_eq!(ids, (1..48).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_single_page_issues_one_request() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "location",
            1,
            json!({
                "info": {"pages": 1},
                "results": [{"id": 1, "name": "Earth (C-137)", "residents": []}]
            }),
        )
        .await;

        let fetcher = ResourceFetcher::new(Client::new(), &test_config(&server));
        let locations: Vec<Location> = fetcher.fetch_all().await.unwrap();
        assert_eq!(locations.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_pages_returns_first_page_results() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "character",
            1,
            json!({"info": {"pages": 0}, "results": []}),
        )
        .await;

        let fetcher = ResourceFetcher::new(Client::new(), &test_config(&server));
        let characters: Vec<Character> = fetcher.fetch_all().await.unwrap();
        assert!(characters.is_empty());
    }

    #[tokio::test]
    async fn test_failing_later_page_fails_the_fetch() {
        let server = MockServer::start().await;
        mount_page(&server, "episode", 1, episode_page(2, 1..21)).await;
        Mock::given(method("GET"))
            .and(path("/api/episode/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = ResourceFetcher::new(Client::new(), &test_config(&server));
        let err = fetcher.fetch_all::<Episode>().await.unwrap_err();
        assert!(
            matches!(err, FetchError::Status { status: 500, ref url } if url.ends_with("?page=2")),
            "unexpected error: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_non_json_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/episode/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let fetcher = ResourceFetcher::new(Client::new(), &test_config(&server));
        let err = fetcher.fetch_all::<Episode>().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_record_missing_required_field_is_a_decode_error() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "character",
            1,
            json!({"info": {"pages": 1}, "results": [{"id": 1, "name": "Rick"}]}),
        )
        .await;

        let fetcher = ResourceFetcher::new(Client::new(), &test_config(&server));
        let err = fetcher.fetch_all::<Character>().await.unwrap_err();
        assert!(err.to_string().contains("unexpected response body"));
    }

    #[test]
    fn test_page_url_normalises_trailing_slash() {
        let config = ApiConfig {
            base_url: "https://rickandmortyapi.com/api/".to_string(),
            ..ApiConfig::default()
        };
        let fetcher = ResourceFetcher::new(Client::new(), &config);
        assert_eq!(
            fetcher.page_url(Resource::Location, 4),
            "https://rickandmortyapi.com/api/location/?page=4"
        );
    }
}
