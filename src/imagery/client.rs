//! HTTP client seam for the imagery provider.

use crate::constants::imagery::USER_AGENT;
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::trace;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for HTTP 200.
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Synchronous HTTP GET used to talk to the imagery provider.
///
/// A trait so tests can observe or stub network traffic.
pub trait ImageryHttpClient: Send + Sync {
    /// Perform a GET request.
    ///
    /// Non-2xx statuses are returned as responses, not errors; only
    /// transport failures (DNS, connect, timeout) are `Err`.
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Blocking `reqwest` client with a request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl ImageryHttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        trace!("GET {}", redact_key(url));
        let response = self.client.get(url).send().map_err(|e| Error::ImageryFetch {
            url: redact_key(url),
            source: Box::new(e),
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| Error::ImageryFetch {
            url: redact_key(url),
            source: Box::new(e),
        })?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Replace the value of any `key=` query parameter with `HIDDEN`.
pub fn redact_key(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let query = query
        .split('&')
        .map(|pair| {
            if pair.starts_with("key=") {
                "key=HIDDEN"
            } else {
                pair
            }
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}
