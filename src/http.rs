// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outgoing HTTP, used to fetch episode and channel artwork

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Artwork hosts that stall should not hold up a download batch
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

pub struct HttpResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    /// Raw `Content-Type` header, parameters included
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction, mocked in tests
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET and hand back the body as a stream
    ///
    /// Non-2xx answers are still `Ok`; callers inspect `status`.
    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;
}

#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(HttpResponse {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            content_type,
            body: Box::pin(response.bytes_stream()),
        })
    }
}
