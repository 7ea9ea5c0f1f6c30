//! Host system actions such as shutdown or restart.

use std::sync::Arc;

use crate::error::{CaptureError, Result};
use crate::notifications::NotificationSink;
use crate::protocol::SystemActionsReply;
use crate::transport::PanelApi;

/// Lists and runs the server's system actions.
pub struct SystemActions {
    api: Arc<dyn PanelApi>,
    sink: Arc<dyn NotificationSink>,
}

impl SystemActions {
    /// Wrap a panel API.
    pub fn new(api: Arc<dyn PanelApi>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { api, sink }
    }

    /// Actions the server supports.
    pub async fn actions(&self) -> Result<Vec<String>> {
        let result = match self.api.system_actions().await {
            Ok(SystemActionsReply::Actions { choices }) => Ok(choices),
            Ok(SystemActionsReply::Error { error }) => Err(CaptureError::ServerRejection(error)),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            self.sink.error(&format!("Failed to load system actions: {e}"));
        }
        result
    }

    /// Run `action` on the server host.
    pub async fn run(&self, action: &str) -> Result<String> {
        let action = action.trim();
        if action.is_empty() {
            let err = CaptureError::InvalidParameter("system action cannot be empty".to_string());
            self.sink.error(&format!("Error: {err}"));
            return Err(err);
        }

        tracing::info!(action, "Running system action");
        match self.api.run_system_action(action).await {
            Ok(reply) => {
                self.sink.info(&reply.message);
                Ok(reply.message)
            }
            Err(e) => {
                self.sink.error(&format!("Error running {action}: {e}"));
                Err(e)
            }
        }
    }
}
