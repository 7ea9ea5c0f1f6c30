//! JSON request and response bodies exchanged with the capture server.
//!
//! Field names are the compatibility surface; do not rename them.

use serde::{Deserialize, Serialize};

/// Status value the server reports while a capture is running.
pub const STATUS_CAPTURING: &str = "capturing";

/// Status value signalling a rejected start request.
pub const STATUS_ERROR: &str = "error";

/// Status value signalling an accepted configuration change.
pub const STATUS_SUCCESS: &str = "success";

/// Reply to `POST /start_capture`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCaptureResponse {
    /// `"error"` on rejection; anything else means the capture started
    pub status: String,
    /// Human-readable detail
    #[serde(default)]
    pub message: String,
}

impl StartCaptureResponse {
    /// Returns true if the server refused to start.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }
}

/// Reply to `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// `"capturing"` while running; any other value is terminal
    pub status: String,
    /// Progress or completion text
    #[serde(default)]
    pub message: String,
}

impl StatusResponse {
    /// Build a status reply.
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Returns true while the server reports the capture as running.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.status == STATUS_CAPTURING
    }
}

/// Reply to `POST /stop_capture`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCaptureResponse {
    /// Some servers include a status; it does not affect the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human-readable detail
    #[serde(default)]
    pub message: String,
}

/// One entry of a configuration choice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChoice {
    /// Value as the camera names it
    pub value: String,
}

/// Reply to `GET /api/config/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigReply {
    /// The server could not read the setting
    Error {
        /// Reason given by the server
        error: String,
    },
    /// Current value and the values the camera accepts
    Setting {
        /// Accepted values
        #[serde(default)]
        choices: Vec<ConfigChoice>,
        /// Current value
        current: String,
    },
}

/// Body of `POST /api/config/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetConfigBody {
    /// New value
    pub value: String,
}

/// Reply to `POST /api/config/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetConfigResponse {
    /// `"success"` when applied
    pub status: String,
    /// Optional detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SetConfigResponse {
    /// Returns true if the value was applied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Reply to `GET /api/system`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemActionsReply {
    /// The server could not list actions
    Error {
        /// Reason given by the server
        error: String,
    },
    /// Supported action names
    Actions {
        /// e.g. `["shutdown", "restart"]`
        choices: Vec<String>,
    },
}

/// Body of `POST /api/system`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemActionBody {
    /// Action name
    pub action: String,
}

/// Reply to `POST /api/system`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemActionResponse {
    /// Human-readable detail
    #[serde(default)]
    pub message: String,
}
