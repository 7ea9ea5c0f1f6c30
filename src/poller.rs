//! Status polling for a running capture.
//!
//! The poller never loops on its own. Each [`StatusPoller::schedule`] call
//! arms exactly one delayed status request and reports its outcome on a
//! channel; the session controller decides whether to arm the next one.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::error::CaptureError;
use crate::protocol::StatusResponse;
use crate::transport::CaptureTransport;

/// Delay between status checks while a capture is running.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Identifies one capture session attempt.
pub type SessionId = u64;

/// Result of one status request.
#[derive(Debug)]
pub enum PollOutcome {
    /// The server answered; the status may be running or terminal
    Status(StatusResponse),
    /// No usable response
    Lost(CaptureError),
}

/// A poll outcome tagged with the session that asked for it.
#[derive(Debug)]
pub struct PollReport {
    /// Session the poll was scheduled for
    pub session: SessionId,
    /// What the server said, if anything
    pub outcome: PollOutcome,
}

/// Cancels a scheduled poll that has not started its request yet.
///
/// Dropping the handle has the same effect as [`PollHandle::cancel`].
#[derive(Debug)]
pub struct PollHandle {
    session: SessionId,
    cancel: Option<oneshot::Sender<()>>,
}

impl PollHandle {
    /// Session this poll belongs to.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Prevent the poll from firing if it is still waiting out its delay.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The task may already be past its delay; nothing to do then
            let _ = cancel.send(());
        }
    }
}

/// Issues status requests against a transport.
#[derive(Clone)]
pub struct StatusPoller {
    transport: Arc<dyn CaptureTransport>,
    interval: Duration,
}

impl StatusPoller {
    /// Poller with the default two-second interval.
    pub fn new(transport: Arc<dyn CaptureTransport>) -> Self {
        Self::with_interval(transport, DEFAULT_POLL_INTERVAL)
    }

    /// Poller with a custom interval.
    pub fn with_interval(transport: Arc<dyn CaptureTransport>, interval: Duration) -> Self {
        Self {
            transport,
            interval,
        }
    }

    /// Delay used between consecutive polls.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Perform a single status request.
    pub async fn poll_once(&self) -> PollOutcome {
        poll_transport(self.transport.as_ref()).await
    }

    /// Arm one status request after `delay`, reporting on `tx`.
    pub fn schedule<T>(
        &self,
        runtime: &Handle,
        delay: Duration,
        session: SessionId,
        tx: mpsc::Sender<T>,
    ) -> PollHandle
    where
        T: From<PollReport> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let transport = Arc::clone(&self.transport);

        runtime.spawn(async move {
            tokio::select! {
                biased;
                // Fires on cancel() and on a dropped handle alike
                _ = cancel_rx => {
                    tracing::trace!(session, "Scheduled poll cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            let outcome = poll_transport(transport.as_ref()).await;
            if tx.send(PollReport { session, outcome }.into()).await.is_err() {
                tracing::debug!(session, "Poll result dropped, controller is gone");
            }
        });

        PollHandle {
            session,
            cancel: Some(cancel_tx),
        }
    }
}

async fn poll_transport(transport: &dyn CaptureTransport) -> PollOutcome {
    match transport.capture_status().await {
        Ok(status) => {
            tracing::trace!(status = %status.status, message = %status.message, "Status poll");
            PollOutcome::Status(status)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Status poll failed");
            PollOutcome::Lost(e)
        }
    }
}
