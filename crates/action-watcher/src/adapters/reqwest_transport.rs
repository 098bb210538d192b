//! `HttpTransport` over reqwest.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

use crate::domain::DeliveryError;
use crate::ports::HttpTransport;

/// JSON POSTs through a shared reqwest client (connections are pooled).
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent(concat!("action-watcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &Url,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        let content = response.bytes().await.map_err(classify)?;
        if content.is_empty() {
            debug!(%url, status = status.as_u16(), "Receiver replied with no content");
        }
        Ok(())
    }
}

fn classify(error: reqwest::Error) -> DeliveryError {
    if error.is_timeout() {
        DeliveryError::Timeout
    } else if error.is_connect() {
        DeliveryError::Connection(error.to_string())
    } else if error.is_body() || error.is_decode() {
        DeliveryError::MalformedResponse(error.to_string())
    } else {
        DeliveryError::Transport(error.to_string())
    }
}
