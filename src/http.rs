//! Blocking HTTP access shared by the registry, WFS and download stages

use crate::config::PipelineConfig;
use crate::ScrapeError;

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with a transport error unless the status is 2xx
    pub fn error_for_status(self, url: &str) -> Result<Self, ScrapeError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScrapeError::transport(url, format!("HTTP {}", self.status)))
        }
    }
}

/// Source of HTTP GET responses
///
/// Implementations must be shareable across the download worker threads.
pub trait HttpSource: Send + Sync {
    /// Issue a GET request; only network-level failures are errors,
    /// non-2xx statuses are returned as responses
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, ScrapeError>;
}

impl<T: HttpSource + ?Sized> HttpSource for &T {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, ScrapeError> {
        (**self).get(url, query)
    }
}

/// reqwest-backed client with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(config: &PipelineConfig) -> Result<Self, ScrapeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpSource for HttpClient {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, ScrapeError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| ScrapeError::transport(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| ScrapeError::transport(url, e))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
