use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::http::{build_client, decode_json, ensure_success};
use crate::naming::ContainerReference;
use crate::worker::readiness::ReadinessProber;
use crate::worker::types::{
    MergeRequest, PlugRequest, ProcessRequest, ProcessResponse, StandardResponse,
};
use crate::worker::{service_url, WorkerApi};

/// Talks to worker containers over the coordinator network.
pub struct HttpWorkerClient {
    http: Client,
    prober: ReadinessProber,
    base_url: Option<String>,
}

impl HttpWorkerClient {
    pub fn new(http: Client, prober: ReadinessProber) -> Self {
        Self {
            http,
            prober,
            base_url: None,
        }
    }

    /// Builds a client with the configured request timeout and readiness policy.
    pub fn from_config(config: &CoordinatorConfig) -> Result<Self> {
        Ok(Self::new(
            build_client(config.request_timeout)?,
            ReadinessProber::new(config.readiness_attempts, config.readiness_interval)?,
        ))
    }

    /// Sends every call to `base_url` instead of the container's own address,
    /// e.g. a single worker reached through a port forward.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn endpoint(&self, container: &ContainerReference, path: &str) -> Result<String> {
        match &self.base_url {
            Some(base) => Ok(format!("{base}{path}")),
            None => Ok(format!("{}{path}", service_url(container)?)),
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        debug!(endpoint = %url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        ensure_success(response, url).await
    }
}

#[async_trait]
impl WorkerApi for HttpWorkerClient {
    async fn wait_ready(&self, container: &ContainerReference) -> Result<()> {
        let url = self.endpoint(container, "/")?;
        self.prober.wait_ready(&url).await
    }

    async fn process(
        &self,
        container: &ContainerReference,
        request: &ProcessRequest,
    ) -> Result<ProcessResponse> {
        let url = self.endpoint(container, "/api/process")?;
        let response = self.post(&url, request).await?;
        decode_json(response, &url).await
    }

    async fn plug(&self, container: &ContainerReference, request: &PlugRequest) -> Result<()> {
        let url = self.endpoint(container, "/api/plug")?;
        self.post(&url, request).await?;
        Ok(())
    }

    async fn merge(
        &self,
        container: &ContainerReference,
        session: &str,
        request: &MergeRequest,
    ) -> Result<StandardResponse> {
        let url = self.endpoint(container, &format!("/merge/{session}"))?;
        let response = self.post(&url, request).await?;
        decode_json(response, &url).await
    }
}
