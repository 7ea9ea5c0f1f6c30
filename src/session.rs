//! Capture session state machine.
//!
//! [`CaptureSessionController`] owns the single capture the panel can run at a
//! time. It is the only component that issues start, status and stop calls
//! for captures, and the only writer of the displayed capture status.
//!
//! # State Machine
//!
//! ```text
//!                 start()
//!   Idle ───────────────────> Starting
//!    ▲                           │
//!    │  error / lost    accepted │
//!    ├───────────────────────────┤
//!    │                           ▼
//!    │  terminal / lost     Capturing ◄──┐ "capturing"
//!    ├────────────────────────── │ ──────┘ (one poll re-armed)
//!    │                           │ cancel()
//!    │  stop answered / lost     ▼
//!    └──────────────────────  Stopping
//! ```
//!
//! Network calls run on spawned tasks and report back over an mpsc channel.
//! The owner drains that channel with [`CaptureSessionController::process_events`]
//! from a frame loop, or awaits [`CaptureSessionController::next_event`].
//! Every result carries the attempt id it was issued for; anything that does
//! not match the current attempt and state is dropped.

use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{CaptureError, Result};
use crate::notifications::NotificationSink;
use crate::poller::{PollHandle, PollOutcome, PollReport, SessionId, StatusPoller};
use crate::protocol::{StartCaptureResponse, StopCaptureResponse};
use crate::request::CaptureRequest;
use crate::transport::CaptureTransport;

/// Lifecycle of the panel's capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No capture; a new one may be started
    Idle,
    /// Start request in flight
    Starting,
    /// Server is capturing; status is being polled
    Capturing,
    /// Stop request in flight
    Stopping,
}

impl SessionState {
    /// Short status label for display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting...",
            Self::Capturing => "Capturing",
            Self::Stopping => "Stopping...",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The capture currently running on the server.
#[derive(Debug)]
pub struct CaptureSession {
    id: SessionId,
    is_active: bool,
    last_message: String,
    poll_handle: Option<PollHandle>,
    request: CaptureRequest,
    started_at: DateTime<Local>,
}

impl CaptureSession {
    /// Attempt id this session was started under.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// True until the session ends.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Latest message from the server.
    #[must_use]
    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Returns true while a status poll is armed.
    #[must_use]
    pub fn has_pending_poll(&self) -> bool {
        self.poll_handle.is_some()
    }

    /// The request that started this session.
    #[must_use]
    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    /// When the server accepted the start request.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }
}

/// Results reported by spawned network tasks.
#[derive(Debug)]
enum SessionEvent {
    Started {
        session: SessionId,
        result: Result<StartCaptureResponse>,
    },
    Polled(PollReport),
    Stopped {
        session: SessionId,
        result: Result<StopCaptureResponse>,
    },
}

impl From<PollReport> for SessionEvent {
    fn from(report: PollReport) -> Self {
        Self::Polled(report)
    }
}

/// Drives one capture at a time through start, polling and stop.
pub struct CaptureSessionController {
    /// Current lifecycle state
    state: SessionState,
    /// Present from accepted start until the session ends
    session: Option<CaptureSession>,
    /// Request awaiting the start reply
    pending_request: Option<CaptureRequest>,
    /// Text shown as the capture status
    status_line: String,
    /// Current attempt id; bumped on every accepted start()
    attempt: SessionId,
    transport: Arc<dyn CaptureTransport>,
    poller: StatusPoller,
    sink: Arc<dyn NotificationSink>,
    runtime: Handle,
    tx: mpsc::Sender<SessionEvent>,
    rx: mpsc::Receiver<SessionEvent>,
}

impl CaptureSessionController {
    /// Create a controller that spawns its network tasks on `runtime`.
    pub fn new(
        transport: Arc<dyn CaptureTransport>,
        sink: Arc<dyn NotificationSink>,
        runtime: Handle,
    ) -> Self {
        let (tx, rx) = mpsc::channel(16);
        Self {
            state: SessionState::Idle,
            session: None,
            pending_request: None,
            status_line: String::new(),
            attempt: 0,
            poller: StatusPoller::new(Arc::clone(&transport)),
            transport,
            sink,
            runtime,
            tx,
            rx,
        }
    }

    /// Use `interval` between status polls instead of the default.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = StatusPoller::with_interval(Arc::clone(&self.transport), interval);
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True from the moment the server accepts a start until the session
    /// returns to idle.
    #[must_use]
    pub fn capture_in_progress(&self) -> bool {
        matches!(self.state, SessionState::Capturing | SessionState::Stopping)
    }

    /// True while any start, poll or stop result is still expected.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state != SessionState::Idle
    }

    /// Latest status text from the server.
    #[must_use]
    pub fn current_status(&self) -> &str {
        &self.status_line
    }

    /// The running session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Returns true while a status poll is armed.
    #[must_use]
    pub fn has_pending_poll(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(CaptureSession::has_pending_poll)
    }

    /// Delay between status polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poller.interval()
    }

    /// Start a capture.
    ///
    /// Returns `false` if a capture is already starting, running or stopping;
    /// the existing session is left untouched.
    pub fn start(&mut self, request: CaptureRequest) -> bool {
        self.try_start(request).is_ok()
    }

    /// Start a capture, reporting why it was refused.
    pub fn try_start(&mut self, request: CaptureRequest) -> Result<()> {
        if self.state != SessionState::Idle {
            self.notify_warn("A capture is already in progress.");
            return Err(CaptureError::SessionBusy(self.state.label()));
        }

        self.attempt += 1;
        let session = self.attempt;
        self.state = SessionState::Starting;
        self.notify_info(&format!("Starting {} capture...", request.frame_type()));
        tracing::debug!(session, request = %request, "Issuing start request");

        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let body = request.clone();
        self.pending_request = Some(request);

        self.runtime.spawn(async move {
            let result = transport.start_capture(&body).await;
            let _ = tx.send(SessionEvent::Started { session, result }).await;
        });
        Ok(())
    }

    /// Ask the server to stop the running capture.
    ///
    /// Only acts while capturing; returns `false` otherwise, including while a
    /// stop request is already in flight.
    pub fn cancel(&mut self) -> bool {
        if self.state != SessionState::Capturing {
            tracing::debug!(state = ?self.state, "Ignoring cancel");
            return false;
        }

        let session = self.attempt;
        if let Some(handle) = self.session.as_mut().and_then(|s| s.poll_handle.take()) {
            handle.cancel();
        }

        self.state = SessionState::Stopping;
        self.notify_info("Sending stop request...");

        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = transport.stop_capture().await;
            let _ = tx.send(SessionEvent::Stopped { session, result }).await;
        });
        true
    }

    /// Apply every result that has arrived, without waiting.
    ///
    /// Call this in the UI update loop. Returns true if anything was applied.
    pub fn process_events(&mut self) -> bool {
        let mut handled = false;
        while let Ok(event) = self.rx.try_recv() {
            handled |= self.handle_event(event);
        }
        handled
    }

    /// Wait for the next result and apply it.
    ///
    /// Returns the state after applying it, or `None` immediately when idle
    /// and nothing is outstanding.
    pub async fn next_event(&mut self) -> Option<SessionState> {
        if self.state == SessionState::Idle {
            // Late results from a finished session may still be queued
            self.process_events();
            return None;
        }
        let event = self.rx.recv().await?;
        self.handle_event(event);
        Some(self.state)
    }

    /// Wait until the current session, if any, is back to idle.
    pub async fn wait_idle(&mut self) {
        while self.next_event().await.is_some() {}
    }

    fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Started { session, result } => {
                if session != self.attempt || self.state != SessionState::Starting {
                    tracing::debug!(session, state = ?self.state, "Ignored stale start result");
                    return false;
                }
                self.on_started(session, result);
            }
            SessionEvent::Polled(report) => {
                if report.session != self.attempt || self.state != SessionState::Capturing {
                    tracing::debug!(
                        session = report.session,
                        state = ?self.state,
                        "Ignored stale poll result"
                    );
                    return false;
                }
                self.on_polled(report.outcome);
            }
            SessionEvent::Stopped { session, result } => {
                if session != self.attempt || self.state != SessionState::Stopping {
                    tracing::debug!(session, state = ?self.state, "Ignored stale stop result");
                    return false;
                }
                self.on_stopped(result);
            }
        }
        true
    }

    fn on_started(&mut self, session: SessionId, result: Result<StartCaptureResponse>) {
        let request = self.pending_request.take();
        match result {
            Ok(reply) if !reply.is_error() => {
                let Some(request) = request else {
                    tracing::error!(session, "Start accepted without a pending request");
                    self.finish();
                    return;
                };
                self.state = SessionState::Capturing;
                let message = message_or(reply.message, "Capture started");
                self.status_line.clone_from(&message);
                self.notify_info(&message);
                tracing::info!(session, request = %request, "Capture started");

                let poll_handle = self.arm_poll(session, Duration::ZERO);
                self.session = Some(CaptureSession {
                    id: session,
                    is_active: true,
                    last_message: message,
                    poll_handle: Some(poll_handle),
                    request,
                    started_at: Local::now(),
                });
            }
            Ok(reply) => {
                let message = message_or(reply.message, "Capture rejected by server");
                self.notify_error(&format!("Error: {message}"));
                self.status_line = message;
                self.finish();
            }
            Err(e) => {
                self.notify_error(&format!("Network or server error: {e}"));
                self.finish();
            }
        }
    }

    fn on_polled(&mut self, outcome: PollOutcome) {
        let session = self.attempt;
        if let Some(active) = self.session.as_mut() {
            // The handle that produced this result has fired
            active.poll_handle = None;
        }

        match outcome {
            PollOutcome::Status(status) if status.is_capturing() => {
                self.status_line.clone_from(&status.message);
                self.notify_info(&status.message);
                let next = self.arm_poll(session, self.poller.interval());
                if let Some(active) = self.session.as_mut() {
                    active.last_message = status.message;
                    active.poll_handle = Some(next);
                }
            }
            PollOutcome::Status(status) => {
                self.status_line.clone_from(&status.message);
                self.notify_info(&format!("Finished: {}", status.message));
                tracing::info!(session, status = %status.status, "Capture finished");
                self.finish();
            }
            PollOutcome::Lost(e) => {
                self.notify_error(&format!("Status check failed: {e}"));
                self.finish();
            }
        }
    }

    fn on_stopped(&mut self, result: Result<StopCaptureResponse>) {
        match result {
            Ok(reply) => {
                let message = message_or(reply.message, "Stop requested");
                self.notify_info(&message);
                self.status_line = message;
            }
            Err(e) => {
                self.notify_error(&format!("Error stopping capture: {e}"));
            }
        }
        self.finish();
    }

    fn arm_poll(&self, session: SessionId, delay: Duration) -> PollHandle {
        self.poller
            .schedule(&self.runtime, delay, session, self.tx.clone())
    }

    /// Return to idle, ending the session and disarming any poll.
    fn finish(&mut self) {
        if let Some(mut ended) = self.session.take() {
            ended.is_active = false;
            if let Some(handle) = ended.poll_handle.take() {
                handle.cancel();
            }
            tracing::debug!(
                session = ended.id,
                elapsed = ?(Local::now() - ended.started_at).to_std().ok(),
                "Session ended"
            );
        }
        self.pending_request = None;
        self.state = SessionState::Idle;
    }

    fn notify_info(&self, message: &str) {
        tracing::info!(target: "astropi::notify", "{message}");
        self.sink.info(message);
    }

    fn notify_warn(&self, message: &str) {
        tracing::warn!(target: "astropi::notify", "{message}");
        self.sink.warn(message);
    }

    fn notify_error(&self, message: &str) {
        tracing::error!(target: "astropi::notify", "{message}");
        self.sink.error(message);
    }
}

/// Server text, or `fallback` when the server sent none.
fn message_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

impl fmt::Debug for CaptureSessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSessionController")
            .field("state", &self.state)
            .field("attempt", &self.attempt)
            .field("session", &self.session)
            .field("status_line", &self.status_line)
            .finish_non_exhaustive()
    }
}
