//! Maven Central search by package name.
//!
//! The search service indexes fully qualified class names (`fc:`), so a
//! package query returns every artifact containing a class in it.

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::ArtifactLookup;

pub const SEARCH_URL: &str = "https://search.maven.org/solrsearch/select";
const DEFAULT_ROWS: usize = 20;

/// HTTP GET abstraction so lookups can be tested without a network.
pub trait HttpClient {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("osgi-deps/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request to {} failed", url))?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} from {}", response.status(), url));
        }
        let body = response
            .bytes()
            .with_context(|| format!("Failed to read response from {}", url))?;
        Ok(body.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchDoc {
    g: String,
    a: String,
    #[serde(default)]
    v: Option<String>,
    #[serde(default)]
    latest_version: Option<String>,
}

impl SearchDoc {
    fn coordinates(&self) -> String {
        match self.v.as_ref().or(self.latest_version.as_ref()) {
            Some(version) => format!("{}:{}:{}", self.g, self.a, version),
            None => format!("{}:{}", self.g, self.a),
        }
    }
}

pub struct MavenCentralSearch<C: HttpClient> {
    client: C,
    rows: usize,
}

impl MavenCentralSearch<ReqwestClient> {
    pub fn with_default_client() -> Result<Self> {
        Ok(Self::new(ReqwestClient::new()?))
    }
}

impl<C: HttpClient> MavenCentralSearch<C> {
    pub fn new(client: C) -> Self {
        MavenCentralSearch {
            client,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn query_url(&self, package: &str) -> Result<Url> {
        let query = format!("fc:\"{}\"", package);
        let rows = self.rows.to_string();
        Url::parse_with_params(
            SEARCH_URL,
            &[("q", query.as_str()), ("rows", rows.as_str()), ("wt", "json")],
        )
        .with_context(|| format!("Invalid search URL {}", SEARCH_URL))
    }

    fn search(&self, package: &str) -> Result<Vec<String>> {
        let url = self.query_url(package)?;
        debug!("Searching Maven Central: {}", url);
        let body = self.client.get(url.as_str())?;
        let parsed: SearchResponse =
            serde_json::from_slice(&body).context("Unexpected search response")?;

        let mut candidates = Vec::new();
        for doc in &parsed.response.docs {
            let coordinates = doc.coordinates();
            if !candidates.contains(&coordinates) {
                candidates.push(coordinates);
            }
        }
        Ok(candidates)
    }
}

impl<C: HttpClient> ArtifactLookup for MavenCentralSearch<C> {
    fn find_artifacts_for_package(&self, package: &str) -> Vec<String> {
        match self.search(package) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Maven Central lookup for {} failed: {:#}", package, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct MockHttpClient {
        response: Result<Vec<u8>, String>,
        requested: RefCell<Vec<String>>,
    }

    impl MockHttpClient {
        fn new(response: Result<&str, &str>) -> Self {
            MockHttpClient {
                response: response.map(|r| r.as_bytes().to_vec()).map_err(str::to_string),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<Vec<u8>> {
            self.requested.borrow_mut().push(url.to_string());
            self.response.clone().map_err(|e| anyhow!(e))
        }
    }

    #[test]
    fn test_query_url_encodes_package() {
        let search = MavenCentralSearch::new(MockHttpClient::new(Ok("{}"))).with_rows(5);
        let url = search.query_url("org.slf4j").unwrap();

        assert_eq!(url.host_str(), Some("search.maven.org"));
        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            params,
            vec![
                ("q".to_string(), "fc:\"org.slf4j\"".to_string()),
                ("rows".to_string(), "5".to_string()),
                ("wt".to_string(), "json".to_string()),
            ]
        );
    }

    #[test]
    fn test_docs_become_coordinates() {
        let body = r#"{"response": {"numFound": 3, "docs": [
            {"id": "org.slf4j:slf4j-api:1.7.36", "g": "org.slf4j", "a": "slf4j-api", "v": "1.7.36"},
            {"g": "org.slf4j", "a": "slf4j-simple", "latestVersion": "2.0.9"},
            {"g": "org.slf4j", "a": "slf4j-api", "v": "1.7.36"}
        ]}}"#;
        let search = MavenCentralSearch::new(MockHttpClient::new(Ok(body)));

        assert_eq!(
            search.find_artifacts_for_package("org.slf4j"),
            vec!["org.slf4j:slf4j-api:1.7.36", "org.slf4j:slf4j-simple:2.0.9"]
        );
        assert_eq!(search.client.requested.borrow().len(), 1);
    }

    #[test]
    fn test_errors_yield_no_candidates() {
        let failing = MavenCentralSearch::new(MockHttpClient::new(Err("connection refused")));
        assert!(failing.find_artifacts_for_package("org.a").is_empty());

        let garbage = MavenCentralSearch::new(MockHttpClient::new(Ok("<html>")));
        assert!(garbage.find_artifacts_for_package("org.a").is_empty());
    }
}
