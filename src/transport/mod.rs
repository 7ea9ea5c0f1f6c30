//! Network seams between the control panel and the capture server.
//!
//! [`CaptureTransport`] carries the three calls the capture workflow makes.
//! [`PanelApi`] covers the one-shot camera configuration and system calls.
//! Both are object-safe so the session controller and poller can hold an
//! `Arc<dyn ...>` and tests can substitute [`MockTransport`].

mod http;
mod mock;

pub use http::{ClientConfig, PanelClient};
pub use mock::MockTransport;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{
    ConfigReply, SetConfigResponse, StartCaptureResponse, StatusResponse, StopCaptureResponse,
    SystemActionResponse, SystemActionsReply,
};
use crate::request::CaptureRequest;

/// Start, status and stop calls for a capture sequence.
///
/// Implementations return `Err(CaptureError::Transport)` only when no usable
/// response arrived. A response that reports failure is returned as `Ok` so
/// the caller can read the server's message.
#[async_trait]
pub trait CaptureTransport: Send + Sync {
    /// `POST /start_capture`
    async fn start_capture(&self, request: &CaptureRequest) -> Result<StartCaptureResponse>;

    /// `GET /status`
    async fn capture_status(&self) -> Result<StatusResponse>;

    /// `POST /stop_capture`
    async fn stop_capture(&self) -> Result<StopCaptureResponse>;
}

/// Camera configuration and host system calls.
#[async_trait]
pub trait PanelApi: Send + Sync {
    /// `GET /api/config/{name}`
    async fn get_config(&self, name: &str) -> Result<ConfigReply>;

    /// `POST /api/config/{name}`
    async fn set_config(&self, name: &str, value: &str) -> Result<SetConfigResponse>;

    /// `GET /api/system`
    async fn system_actions(&self) -> Result<SystemActionsReply>;

    /// `POST /api/system`
    async fn run_system_action(&self, action: &str) -> Result<SystemActionResponse>;
}
