//! Scripted in-memory transport.
//!
//! Capture calls pop pre-loaded responses in order; configuration and system
//! calls are served from a small simulated camera. Call counts and the last
//! start request are recorded for assertions.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{CaptureTransport, PanelApi};
use crate::error::{CaptureError, Result};
use crate::protocol::{
    ConfigChoice, ConfigReply, SetConfigResponse, StartCaptureResponse, StatusResponse,
    StopCaptureResponse, SystemActionResponse, SystemActionsReply, STATUS_SUCCESS,
};
use crate::request::CaptureRequest;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
struct SimulatedSetting {
    current: String,
    choices: Vec<String>,
}

/// Transport that replays scripted responses.
#[derive(Debug, Default)]
pub struct MockTransport {
    start_replies: Mutex<VecDeque<Result<StartCaptureResponse>>>,
    status_replies: Mutex<VecDeque<Result<StatusResponse>>>,
    stop_replies: Mutex<VecDeque<Result<StopCaptureResponse>>>,
    latency: Mutex<Duration>,
    start_calls: AtomicUsize,
    status_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    last_request: Mutex<Option<CaptureRequest>>,
    settings: Mutex<BTreeMap<String, SimulatedSetting>>,
    actions: Mutex<Vec<String>>,
    actions_run: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Empty script; every capture call fails until responses are queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every capture call by `latency` before answering.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *lock(&self.latency) = latency;
        self
    }

    /// Queue the reply to the next start call.
    pub fn push_start(&self, reply: Result<StartCaptureResponse>) -> &Self {
        lock(&self.start_replies).push_back(reply);
        self
    }

    /// Queue a start reply with the given status and message.
    pub fn push_start_reply(&self, status: &str, message: &str) -> &Self {
        self.push_start(Ok(StartCaptureResponse {
            status: status.to_string(),
            message: message.to_string(),
        }))
    }

    /// Queue the reply to the next status call.
    pub fn push_status(&self, reply: Result<StatusResponse>) -> &Self {
        lock(&self.status_replies).push_back(reply);
        self
    }

    /// Queue a status reply with the given status and message.
    pub fn push_status_reply(&self, status: &str, message: &str) -> &Self {
        self.push_status(Ok(StatusResponse::new(status, message)))
    }

    /// Queue the reply to the next stop call.
    pub fn push_stop(&self, reply: Result<StopCaptureResponse>) -> &Self {
        lock(&self.stop_replies).push_back(reply);
        self
    }

    /// Queue a stop reply carrying `message`.
    pub fn push_stop_reply(&self, message: &str) -> &Self {
        self.push_stop(Ok(StopCaptureResponse {
            status: None,
            message: message.to_string(),
        }))
    }

    /// Add a camera setting to the simulated camera.
    pub fn add_setting(&self, name: &str, current: &str, choices: &[&str]) -> &Self {
        lock(&self.settings).insert(
            name.to_string(),
            SimulatedSetting {
                current: current.to_string(),
                choices: choices.iter().map(|c| (*c).to_string()).collect(),
            },
        );
        self
    }

    /// Current value of a simulated setting.
    #[must_use]
    pub fn setting(&self, name: &str) -> Option<String> {
        lock(&self.settings).get(name).map(|s| s.current.clone())
    }

    /// Set the system actions the simulated host supports.
    pub fn set_actions(&self, actions: &[&str]) -> &Self {
        *lock(&self.actions) = actions.iter().map(|a| (*a).to_string()).collect();
        self
    }

    /// System actions run so far, in order.
    #[must_use]
    pub fn actions_run(&self) -> Vec<String> {
        lock(&self.actions_run).clone()
    }

    /// Number of start calls made.
    #[must_use]
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Number of status calls made.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Number of stop calls made.
    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// The most recent start request.
    #[must_use]
    pub fn last_request(&self) -> Option<CaptureRequest> {
        lock(&self.last_request).clone()
    }

    async fn simulate_latency(&self) {
        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn unscripted(call: &str) -> CaptureError {
    CaptureError::Transport(format!("no scripted response for {call}"))
}

#[async_trait]
impl CaptureTransport for MockTransport {
    async fn start_capture(&self, request: &CaptureRequest) -> Result<StartCaptureResponse> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_request) = Some(request.clone());
        self.simulate_latency().await;
        let reply = lock(&self.start_replies).pop_front();
        reply.unwrap_or_else(|| Err(unscripted("start_capture")))
    }

    async fn capture_status(&self) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        let reply = lock(&self.status_replies).pop_front();
        reply.unwrap_or_else(|| Err(unscripted("status")))
    }

    async fn stop_capture(&self) -> Result<StopCaptureResponse> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        let reply = lock(&self.stop_replies).pop_front();
        reply.unwrap_or_else(|| Err(unscripted("stop_capture")))
    }
}

#[async_trait]
impl PanelApi for MockTransport {
    async fn get_config(&self, name: &str) -> Result<ConfigReply> {
        let settings = lock(&self.settings);
        Ok(match settings.get(name) {
            Some(setting) => ConfigReply::Setting {
                choices: setting
                    .choices
                    .iter()
                    .map(|value| ConfigChoice {
                        value: value.clone(),
                    })
                    .collect(),
                current: setting.current.clone(),
            },
            None => ConfigReply::Error {
                error: format!("Unknown setting: {name}"),
            },
        })
    }

    async fn set_config(&self, name: &str, value: &str) -> Result<SetConfigResponse> {
        let mut settings = lock(&self.settings);
        let reply = match settings.get_mut(name) {
            Some(setting) if setting.choices.iter().any(|c| c == value) => {
                setting.current = value.to_string();
                SetConfigResponse {
                    status: STATUS_SUCCESS.to_string(),
                    message: Some(format!("{name} set to {value}")),
                }
            }
            Some(_) => SetConfigResponse {
                status: "error".to_string(),
                message: Some(format!("Invalid value for {name}: {value}")),
            },
            None => SetConfigResponse {
                status: "error".to_string(),
                message: None,
            },
        };
        Ok(reply)
    }

    async fn system_actions(&self) -> Result<SystemActionsReply> {
        let actions = lock(&self.actions);
        if actions.is_empty() {
            return Ok(SystemActionsReply::Error {
                error: "System actions not available".to_string(),
            });
        }
        Ok(SystemActionsReply::Actions {
            choices: actions.clone(),
        })
    }

    async fn run_system_action(&self, action: &str) -> Result<SystemActionResponse> {
        lock(&self.actions_run).push(action.to_string());
        Ok(SystemActionResponse {
            message: format!("Executing {action}..."),
        })
    }
}
