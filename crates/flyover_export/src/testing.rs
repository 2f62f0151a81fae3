// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording renderer and backends for unit tests.

use crate::backend::{
    CaptureBackend, FinishSessionRequest, JobState, JobStatus, RemoteJobRequest,
    RemoteRenderBackend,
    StartSessionRequest,
};
use crate::error::{CaptureError, ExportError, Result};
use crate::renderer::FrameRenderer;
use crate::session::{ExportEvent, ExportHandle};
use flyover_sequencer::{CameraPose, Viewport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Everything the renderer and backend were asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Pose(CameraPose),
    Fov(f64),
    Interactive(bool),
    Resize(u32, u32),
    Capture,
    StartSession(StartSessionRequest),
    Upload(String, u64),
    Finish(FinishSessionRequest),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn uploads(log: &CallLog) -> Vec<u64> {
    log.lock()
        .iter()
        .filter_map(|c| match c {
            Call::Upload(_, frame) => Some(*frame),
            _ => None,
        })
        .collect()
}

pub fn event_log() -> (Arc<Mutex<Vec<ExportEvent>>>, impl FnMut(&ExportEvent) + Send + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    (log, move |e: &ExportEvent| sink.lock().push(e.clone()))
}

pub struct MockRenderer {
    pub log: CallLog,
    pub size: (u32, u32),
    pub fail_capture_at: Option<u64>,
    captures: u64,
}

impl MockRenderer {
    pub fn new(log: CallLog, width: u32, height: u32) -> Self {
        Self {
            log,
            size: (width, height),
            fail_capture_at: None,
            captures: 0,
        }
    }
}

impl Viewport for MockRenderer {
    fn set_pose(&mut self, pose: &CameraPose) {
        self.log.lock().push(Call::Pose(*pose));
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        self.log.lock().push(Call::Fov(degrees));
    }

    fn enable_interactive_control(&mut self, enabled: bool) {
        self.log.lock().push(Call::Interactive(enabled));
    }
}

impl FrameRenderer for MockRenderer {
    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.log.lock().push(Call::Resize(width, height));
    }

    async fn render_and_capture(&mut self) -> std::result::Result<Vec<u8>, CaptureError> {
        let index = self.captures;
        self.captures += 1;
        self.log.lock().push(Call::Capture);
        if self.fail_capture_at == Some(index) {
            return Err(CaptureError("surface lost".into()));
        }
        Ok(vec![0x89, b'P', b'N', b'G', index as u8])
    }
}

pub struct MockCaptureBackend {
    pub log: CallLog,
    pub fail_start: bool,
    pub fail_upload_at: Option<u64>,
    pub cancel_during_upload: Option<(u64, ExportHandle)>,
}

impl MockCaptureBackend {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_start: false,
            fail_upload_at: None,
            cancel_during_upload: None,
        }
    }
}

impl CaptureBackend for MockCaptureBackend {
    async fn start_session(&self, request: &StartSessionRequest) -> Result<String> {
        self.log.lock().push(Call::StartSession(request.clone()));
        if self.fail_start {
            return Err(ExportError::connectivity("start export session", "connection refused"));
        }
        Ok("session-1".to_owned())
    }

    async fn upload_frame(
        &self,
        session_id: &str,
        frame_index: u64,
        _image: Vec<u8>,
    ) -> Result<()> {
        self.log.lock().push(Call::Upload(session_id.to_owned(), frame_index));
        if self.fail_upload_at == Some(frame_index) {
            return Err(ExportError::connectivity(
                format!("upload frame {frame_index}"),
                "HTTP 500",
            ));
        }
        if let Some((at, handle)) = &self.cancel_during_upload {
            if *at == frame_index {
                handle.cancel();
            }
        }
        Ok(())
    }

    async fn finish_session(&self, request: &FinishSessionRequest) -> Result<Vec<u8>> {
        self.log.lock().push(Call::Finish(request.clone()));
        Ok(b"video".to_vec())
    }
}

pub fn status(state: JobState, progress: f64, message: &str) -> JobStatus {
    JobStatus {
        status: state,
        progress,
        message: message.to_owned(),
        error: None,
    }
}

pub struct MockRemoteBackend {
    pub submitted: Mutex<Option<RemoteJobRequest>>,
    pub statuses: Mutex<VecDeque<JobStatus>>,
    pub polls: Mutex<usize>,
    pub cancelled: Mutex<bool>,
    pub downloads: Mutex<usize>,
    pub cancel_on_poll: Option<(usize, ExportHandle)>,
}

impl MockRemoteBackend {
    pub fn new(statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        Self {
            submitted: Mutex::new(None),
            statuses: Mutex::new(statuses.into_iter().collect()),
            polls: Mutex::new(0),
            cancelled: Mutex::new(false),
            downloads: Mutex::new(0),
            cancel_on_poll: None,
        }
    }
}

impl RemoteRenderBackend for MockRemoteBackend {
    async fn start_job(&self, request: &RemoteJobRequest) -> Result<String> {
        *self.submitted.lock() = Some(request.clone());
        Ok("job-7".to_owned())
    }

    async fn job_status(&self, _session_id: &str) -> Result<JobStatus> {
        let poll = {
            let mut polls = self.polls.lock();
            *polls += 1;
            *polls
        };
        if let Some((at, handle)) = &self.cancel_on_poll {
            if *at == poll {
                handle.cancel();
            }
        }
        let mut statuses = self.statuses.lock();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(next.unwrap_or_else(|| status(JobState::Processing, 0.0, "")))
    }

    async fn download_result(&self, _session_id: &str) -> Result<Vec<u8>> {
        *self.downloads.lock() += 1;
        Ok(b"remote-video".to_vec())
    }

    async fn cancel_job(&self, _session_id: &str) -> Result<()> {
        *self.cancelled.lock() = true;
        Ok(())
    }
}
