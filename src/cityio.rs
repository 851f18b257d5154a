//! Thin cityIO HTTP client.
//!
//! Reads the table header, grid and grid hash from the input URL and posts
//! the KPI result to the output URL. There is no retry logic here; a failed
//! request fails the cycle.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::CityIoConfig;
use crate::error::{KpiError, Result};

/// Default timeout for cityIO requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one cityIO table
#[derive(Debug, Clone)]
pub struct CityIoClient {
    http: Client,
    input_url: String,
    output_url: String,
    token: Option<String>,
}

impl CityIoClient {
    pub fn new(input_url: &str, output_url: &str, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| KpiError::Http {
                url: input_url.to_string(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            input_url: input_url.to_string(),
            output_url: output_url.to_string(),
            token,
        })
    }

    /// Build a client from configuration, resolving the token file
    pub fn from_config(config: &CityIoConfig) -> Result<Self> {
        Self::new(&config.input_url, &config.output_url, config.resolve_token()?)
    }

    /// Full URL of a topic below the input URL
    pub fn topic_url(&self, topic: &str) -> String {
        format!("{}{}", self.input_url, topic)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(CONTENT_TYPE, "application/json");
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// GET a topic and parse it as JSON
    pub async fn fetch(&self, topic: &str) -> Result<Value> {
        let url = self.topic_url(topic);
        debug!(url = %url, "Fetching topic");

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;

        if response.status() != StatusCode::OK {
            return Err(KpiError::UpstreamStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| http_error(&url, e))
    }

    pub async fn fetch_header(&self) -> Result<Value> {
        self.fetch("header").await
    }

    pub async fn fetch_grid(&self) -> Result<Value> {
        self.fetch("grid").await
    }

    pub async fn fetch_grid_hash(&self) -> Result<Value> {
        self.fetch("meta/hashes/grid").await
    }

    /// POST a result record to the output URL
    pub async fn post_result<T: Serialize>(&self, result: &T) -> Result<()> {
        let url = self.output_url.clone();

        let response = self
            .authorize(self.http.post(&url))
            .json(result)
            .send()
            .await
            .map_err(|e| http_error(&url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(KpiError::UpstreamStatus {
                url,
                status: status.as_u16(),
            });
        }

        info!(url = %url, status = status.as_u16(), "Posted result to cityIO");
        Ok(())
    }
}

fn http_error(url: &str, e: reqwest::Error) -> KpiError {
    KpiError::Http {
        url: url.to_string(),
        message: e.to_string(),
    }
}
