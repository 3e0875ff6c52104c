use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, VideoError};
use crate::script::Script;

pub(crate) trait ImageSearchService {
    /// Image URLs for `query`, at most `per_page` of them. Empty on any failure.
    async fn search(&self, query: &str, per_page: usize) -> Vec<String>;

    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    large: String,
}

#[derive(Debug, Clone)]
pub(crate) struct PexelsClient {
    api_key: String,
    api_base: String,
    client: Client,
}

impl PexelsClient {
    pub(crate) fn new(api_key: String, api_base: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            api_base,
            client,
        })
    }
}

impl ImageSearchService for PexelsClient {
    async fn search(&self, query: &str, per_page: usize) -> Vec<String> {
        let url = format!("{}/search", self.api_base.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&[("query", query.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!("Image search request failed: {}", e);
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Image search returned HTTP {}", status);
            return Vec::new();
        }

        match response.text().await {
            Ok(body) => parse_search_response(&body).unwrap_or_else(|e| {
                warn!("Unreadable image search response: {}", e);
                Vec::new()
            }),
            Err(e) => {
                warn!("Failed to read image search response: {}", e);
                Vec::new()
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let fetch = async {
            let response = self.client.get(url).send().await?.error_for_status()?;
            response.bytes().await
        };
        let bytes = fetch.await.map_err(|source| VideoError::Download {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

fn parse_search_response(body: &str) -> Result<Vec<String>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .photos
        .into_iter()
        .map(|photo| photo.src.large)
        .collect())
}

/// Asks for `count` images keyed by the opening words of `script`.
pub(crate) async fn locate_images<S: ImageSearchService>(
    service: &S,
    script: &Script,
    count: usize,
) -> Vec<String> {
    if script.is_empty() || count == 0 {
        return Vec::new();
    }
    let query = script.search_seed();
    info!("Searching {} images for '{}'", count, query);
    let urls = service.search(&query, count).await;
    info!("Found {} images", urls.len());
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use std::sync::Mutex;

    struct FakeSearch {
        urls: Vec<String>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl ImageSearchService for FakeSearch {
        async fn search(&self, query: &str, per_page: usize) -> Vec<String> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), per_page));
            self.urls.iter().take(per_page).cloned().collect()
        }

        async fn download(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn parses_large_sources_in_order() {
        let body = r#"{
            "page": 1,
            "per_page": 2,
            "photos": [
                { "id": 1, "src": { "original": "o1", "large": "https://img/1-large.jpg" } },
                { "id": 2, "src": { "original": "o2", "large": "https://img/2-large.jpg" } }
            ],
            "total_results": 2
        }"#;
        assert_eq!(
            parse_search_response(body).unwrap(),
            vec!["https://img/1-large.jpg", "https://img/2-large.jpg"]
        );
    }

    #[test]
    fn rejects_bodies_without_photos() {
        assert!(parse_search_response(r#"{ "error": "rate limited" }"#).is_err());
    }

    fn pexels(stub: &StubServer) -> PexelsClient {
        PexelsClient::new("test-key".into(), stub.base_url(), Duration::from_secs(10)).unwrap()
    }

    #[tokio::test]
    async fn search_sends_key_and_paging() {
        let body = r#"{"photos":[{"src":{"large":"https://img/1.jpg"}}]}"#;
        let stub = StubServer::start("200 OK", body).await;

        let urls = pexels(&stub).search("history of ai", 4).await;

        assert_eq!(urls, vec!["https://img/1.jpg"]);
        let request = stub.last_request();
        assert!(request.starts_with("GET /v1/search?query=history+of+ai&per_page=4"));
        assert!(request.to_ascii_lowercase().contains("authorization: test-key"));
    }

    #[tokio::test]
    async fn search_error_status_yields_no_images() {
        for status in ["401 Unauthorized", "500 Internal Server Error"] {
            let stub = StubServer::start(status, r#"{"error":"nope"}"#).await;
            assert!(pexels(&stub).search("anything", 3).await.is_empty());
            assert_eq!(stub.requests(), 1);
        }
    }

    #[tokio::test]
    async fn search_malformed_body_yields_no_images() {
        let stub = StubServer::start("200 OK", "<html>maintenance</html>").await;
        assert!(pexels(&stub).search("anything", 3).await.is_empty());
    }

    #[tokio::test]
    async fn search_unreachable_backend_yields_no_images() {
        let unreachable = PexelsClient::new(
            "test-key".into(),
            "http://127.0.0.1:1/v1".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(unreachable.search("anything", 3).await.is_empty());
    }

    #[tokio::test]
    async fn download_not_found_is_a_download_error() {
        let stub = StubServer::start("404 Not Found", "").await;
        let url = format!("{}/photos/missing.jpg", stub.base_url());

        let err = pexels(&stub).download(&url).await.unwrap_err();

        assert!(matches!(err, VideoError::Download { url: ref failed, .. } if failed == &url));
    }

    #[tokio::test]
    async fn queries_with_seed_and_sentence_count() {
        let service = FakeSearch {
            urls: vec!["a".into(), "b".into(), "c".into()],
            queries: Mutex::new(Vec::new()),
        };
        let script = Script::new("The history of artificial intelligence is long. It began early.");

        let urls = locate_images(&service, &script, 2).await;

        assert_eq!(urls, vec!["a", "b"]);
        assert_eq!(
            service.queries.lock().unwrap().as_slice(),
            &[("The history of artificial intelligence".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn empty_script_skips_search() {
        let service = FakeSearch {
            urls: vec!["a".into()],
            queries: Mutex::new(Vec::new()),
        };
        assert!(locate_images(&service, &Script::new(""), 3).await.is_empty());
        assert!(service.queries.lock().unwrap().is_empty());
    }
}
