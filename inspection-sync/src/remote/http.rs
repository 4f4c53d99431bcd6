//! reqwest implementation of `RemoteApi`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};

use crate::config::RemoteConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteApi, ShiftPayload, SubmitReceipt};

pub struct HttpRemote {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpRemote {
    pub fn new(config: RemoteConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.server_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> SyncResult<Response> {
        let response = self.authorize(req).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "Remote request failed");

        // 5xx and 429 are retried by the sync queue.
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Err(SyncError::Network(format!("Server returned {}", status)))
        } else {
            Err(SyncError::RemoteRejected(format!("Server returned {}: {}", status, body)))
        }
    }

    async fn get_json(&self, path: &str) -> SyncResult<serde_json::Value> {
        let response = self.send(self.client.get(self.url(path))).await?;
        response
            .json()
            .await
            .map_err(|e| SyncError::RemoteRejected(format!("Undecodable response: {}", e)))
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn fetch_codes(&self) -> SyncResult<serde_json::Value> {
        self.get_json("codes").await
    }

    async fn fetch_water_bodies(&self) -> SyncResult<serde_json::Value> {
        self.get_json("water-bodies").await
    }

    async fn submit_shift(&self, payload: &ShiftPayload) -> SyncResult<SubmitReceipt> {
        let req = match payload.remote_id {
            Some(remote_id) => self.client.put(self.url(&format!("shifts/{}", remote_id))),
            None => self.client.post(self.url("shifts")),
        };

        tracing::debug!(
            shift_id = %payload.local_id,
            remote_id = ?payload.remote_id,
            revision = payload.revision,
            inspections = payload.inspections.len(),
            "Submitting shift"
        );

        let response = self.send(req.json(payload)).await?;
        response
            .json()
            .await
            .map_err(|e| SyncError::RemoteRejected(format!("Undecodable receipt: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let remote = HttpRemote::new(RemoteConfig {
            server_url: "https://example.test/api/".to_string(),
            ..RemoteConfig::default()
        })
        .unwrap();
        assert_eq!(remote.url("codes"), "https://example.test/api/codes");
        assert_eq!(remote.url("shifts/12"), "https://example.test/api/shifts/12");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let remote = HttpRemote::new(RemoteConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..RemoteConfig::default()
        })
        .unwrap();

        let err = remote.fetch_codes().await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {:?}", err);
    }
}
