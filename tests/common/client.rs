//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for every server endpoint.
//! When routes change, update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Service Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_status(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Status request failed")
    }

    /// GET /{catalog}?{params}
    pub async fn cone_search(&self, catalog: &str, params: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/{}", self.base_url, catalog))
            .query(params)
            .send()
            .await
            .expect("Cone search request failed")
    }

    /// GET /conesearch?{params}
    pub async fn cone_search_selected(&self, params: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/conesearch", self.base_url))
            .query(params)
            .send()
            .await
            .expect("Cone search request failed")
    }

    /// GET on an arbitrary path, with the query string appended verbatim.
    pub async fn get_raw(&self, path_and_query: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path_and_query))
            .send()
            .await
            .expect("Request failed")
    }
}
