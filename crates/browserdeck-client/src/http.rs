//! HTTP client for the agent backend's REST endpoints.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use browserdeck_core::{RecordingInfo, ResearchRequest, RunTaskRequest, StatusPatch, TaskId};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Acknowledgement returned when a task or research job is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Identifier to watch the task under.
    pub task_id: TaskId,

    /// Initial status string (normally "started").
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct RecordingsResponse {
    recordings: Vec<RecordingInfo>,
}

/// A point-in-time source of task status.
///
/// The polling fallback and the session's initial fetch go through this seam
/// so they can be driven by a test double as well as the live [`ApiClient`].
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status fragment for a task.
    async fn fetch_status(&self, task_id: &TaskId) -> Result<StatusPatch, ClientError>;
}

/// HTTP client for the agent backend REST API.
pub struct ApiClient {
    inner: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the given backend base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url)
    }

    /// Check if the backend is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let url = format!("{}/api/health", self.base_url);
        debug!(url = %url, "Checking health");

        let response = self.inner.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// Submit a browser-automation task.
    pub async fn run_task(&self, request: &RunTaskRequest) -> Result<SubmitResponse, ClientError> {
        self.post_json("/api/agent/run", request).await
    }

    /// Submit a deep-research job.
    pub async fn run_research(
        &self,
        request: &ResearchRequest,
    ) -> Result<SubmitResponse, ClientError> {
        self.post_json("/api/research/run", request).await
    }

    /// Fetch the current status fragment for a task.
    pub async fn task_status(&self, task_id: &TaskId) -> Result<StatusPatch, ClientError> {
        self.get_json(&format!("/api/agent/status/{task_id}")).await
    }

    /// Ask the backend to stop a running task.
    ///
    /// The effect is observed indirectly through later status updates.
    pub async fn stop_task(&self, task_id: &TaskId) -> Result<(), ClientError> {
        let path = format!("/api/agent/stop/{task_id}");
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Stopping task");

        let response = self.inner.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Api {
                status: response.status().as_u16(),
                path,
            });
        }
        Ok(())
    }

    /// List stored recordings.
    pub async fn recordings(&self) -> Result<Vec<RecordingInfo>, ClientError> {
        let response: RecordingsResponse = self.get_json("/api/recordings").await?;
        Ok(response.recordings)
    }

    /// Get JSON from an endpoint.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Api {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// Post a JSON body and decode a JSON response.
    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST request");

        let response = self.inner.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Api {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, task_id: &TaskId) -> Result<StatusPatch, ClientError> {
        self.task_status(task_id).await
    }
}
