// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP implementation of both backend protocols.

use crate::backend::{
    CaptureBackend, FinishSessionRequest, JobStatus, RemoteJobRequest, RemoteRenderBackend,
    SessionStarted, StartSessionRequest,
};
use crate::error::{ExportError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};

/// Header carrying the capture session id on frame uploads
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

/// Header carrying the zero-based frame index on frame uploads
pub const FRAME_INDEX_HEADER: &str = "X-Frame-Index";

/// Render/encode server reached over HTTP.
///
/// No request timeout is set: a hung request holds the export until the
/// server answers or the connection drops.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    /// Connect to the server at `base_url`
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        let mut url = Url::parse(base_url)
            .map_err(|e| ExportError::InvalidSettings(format!("backend url '{base_url}': {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ExportError::connectivity("create HTTP client", e))?;

        Ok(Self {
            base_url: url,
            client,
        })
    }

    /// Server root all endpoints are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ExportError::InvalidSettings(format!("endpoint '{path}': {e}")))
    }

    /// `path` with the session id appended as one percent-encoded segment
    fn session_endpoint(&self, path: &str, session_id: &str) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|()| {
                let reason = format!("backend url '{}' cannot have a path", self.base_url);
                ExportError::InvalidSettings(reason)
            })?
            .push(session_id);
        Ok(url)
    }
}

/// Turn transport errors and non-2xx replies into connectivity errors
fn check(operation: &str, response: reqwest::Result<Response>) -> Result<Response> {
    let response = response.map_err(|e| ExportError::connectivity(operation, e))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ExportError::connectivity(operation, format!("HTTP {status}")))
    }
}

async fn read_bytes(operation: &str, response: Response) -> Result<Vec<u8>> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExportError::connectivity(operation, e))?;
    Ok(bytes.to_vec())
}

impl CaptureBackend for HttpBackend {
    async fn start_session(&self, request: &StartSessionRequest) -> Result<String> {
        let operation = "start export session";
        let url = self.endpoint("api/export/start")?;
        let response = check(operation, self.client.post(url).json(request).send().await)?;
        let started: SessionStarted = response
            .json()
            .await
            .map_err(|e| ExportError::connectivity(operation, e))?;
        Ok(started.session_id)
    }

    async fn upload_frame(&self, session_id: &str, frame_index: u64, image: Vec<u8>) -> Result<()> {
        let operation = format!("upload frame {frame_index}");
        let url = self.endpoint("api/export/frame")?;
        let response = self
            .client
            .post(url)
            .header(SESSION_ID_HEADER, session_id)
            .header(FRAME_INDEX_HEADER, frame_index.to_string())
            .header(CONTENT_TYPE, "image/png")
            .body(image)
            .send()
            .await;
        check(&operation, response)?;
        Ok(())
    }

    async fn finish_session(&self, request: &FinishSessionRequest) -> Result<Vec<u8>> {
        let operation = "finish export session";
        let url = self.endpoint("api/export/finish")?;
        let response = check(operation, self.client.post(url).json(request).send().await)?;
        read_bytes(operation, response).await
    }
}

impl RemoteRenderBackend for HttpBackend {
    async fn start_job(&self, request: &RemoteJobRequest) -> Result<String> {
        let operation = "start render job";
        let url = self.endpoint("api/render/start")?;
        let response = check(operation, self.client.post(url).json(request).send().await)?;
        let started: SessionStarted = response
            .json()
            .await
            .map_err(|e| ExportError::connectivity(operation, e))?;
        Ok(started.session_id)
    }

    async fn job_status(&self, session_id: &str) -> Result<JobStatus> {
        let operation = "poll render status";
        let url = self.session_endpoint("api/render/status", session_id)?;
        let response = check(operation, self.client.get(url).send().await)?;
        response
            .json()
            .await
            .map_err(|e| ExportError::connectivity(operation, e))
    }

    async fn download_result(&self, session_id: &str) -> Result<Vec<u8>> {
        let operation = "download video";
        let url = self.session_endpoint("api/render/download", session_id)?;
        let response = check(operation, self.client.get(url).send().await)?;
        read_bytes(operation, response).await
    }

    async fn cancel_job(&self, session_id: &str) -> Result<()> {
        let operation = "cancel render job";
        let url = self.session_endpoint("api/render/cancel", session_id)?;
        check(operation, self.client.post(url).send().await)?;
        Ok(())
    }
}
