//! Camera configuration: read and change settings such as ISO.

use std::fmt;
use std::sync::Arc;

use crate::error::{CaptureError, Result};
use crate::notifications::NotificationSink;
use crate::protocol::ConfigReply;
use crate::transport::PanelApi;

/// Shutter-speed setting name.
pub const SHUTTER_SPEED: &str = "shutterspeed";
/// ISO setting name.
pub const ISO: &str = "iso";
/// Aperture setting name.
pub const APERTURE: &str = "aperture";

/// Settings the panel loads on start-up.
pub const WELL_KNOWN: [&str; 3] = [SHUTTER_SPEED, ISO, APERTURE];

/// One camera setting with the values the camera accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSetting {
    /// Setting name
    pub name: String,
    /// Value currently set on the camera
    pub current: String,
    /// Values the camera accepts, in camera order
    pub choices: Vec<String>,
}

impl ConfigSetting {
    /// Returns true if the camera offers `value`.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.choices.iter().any(|c| c == value)
    }
}

impl fmt::Display for ConfigSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.current)
    }
}

/// Reads and writes camera settings, reporting to the notification sink.
pub struct CameraSettings {
    api: Arc<dyn PanelApi>,
    sink: Arc<dyn NotificationSink>,
}

impl CameraSettings {
    /// Wrap a panel API.
    pub fn new(api: Arc<dyn PanelApi>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { api, sink }
    }

    /// Load one setting.
    pub async fn fetch(&self, name: &str) -> Result<ConfigSetting> {
        let result = match self.api.get_config(name).await {
            Ok(ConfigReply::Setting { choices, current }) => Ok(ConfigSetting {
                name: name.to_string(),
                current,
                choices: choices.into_iter().map(|c| c.value).collect(),
            }),
            Ok(ConfigReply::Error { error }) => Err(CaptureError::ServerRejection(error)),
            Err(e) => Err(e),
        };

        match &result {
            Ok(setting) => self.sink.info(&format!("Loaded {}: {}", setting.name, setting.current)),
            Err(e) => {
                tracing::warn!(setting = name, error = %e, "Failed to load camera setting");
                self.sink.error(&format!("Failed to load {name}: {e}"));
            }
        }
        result
    }

    /// Load every well-known setting; failures are reported and skipped.
    pub async fn fetch_all(&self) -> Vec<ConfigSetting> {
        let mut loaded = Vec::with_capacity(WELL_KNOWN.len());
        for name in WELL_KNOWN {
            if let Ok(setting) = self.fetch(name).await {
                loaded.push(setting);
            }
        }
        loaded
    }

    /// Change a setting.
    pub async fn apply(&self, name: &str, value: &str) -> Result<String> {
        self.sink.info(&format!("Setting {name} to {value}..."));

        let reply = match self.api.set_config(name, value).await {
            Ok(reply) => reply,
            Err(e) => {
                self.sink.error(&format!("Error setting {name}: {e}"));
                return Err(e);
            }
        };

        if !reply.is_success() {
            let reason = reply
                .message
                .unwrap_or_else(|| format!("Failed to set {name}"));
            self.sink.error(&format!("Error: {reason}"));
            return Err(CaptureError::ServerRejection(reason));
        }

        let message = reply
            .message
            .unwrap_or_else(|| format!("{name} set to {value}"));
        self.sink.info(&message);
        Ok(message)
    }

    /// Change a setting after checking the value against the camera's choices.
    pub async fn apply_checked(&self, setting: &ConfigSetting, value: &str) -> Result<String> {
        if !setting.contains(value) {
            let err = CaptureError::InvalidParameter(format!(
                "'{value}' is not an accepted value for {}",
                setting.name
            ));
            self.sink.error(&format!("Error: {err}"));
            return Err(err);
        }
        self.apply(&setting.name, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationLog;
    use crate::transport::MockTransport;

    fn settings(mock: &Arc<MockTransport>) -> (CameraSettings, NotificationLog) {
        let log = NotificationLog::new();
        let settings = CameraSettings::new(
            Arc::clone(mock) as Arc<dyn PanelApi>,
            Arc::new(log.clone()),
        );
        (settings, log)
    }

    #[tokio::test]
    async fn fetch_reports_current_value() {
        let mock = Arc::new(MockTransport::new());
        mock.add_setting(ISO, "800", &["100", "400", "800", "1600"]);
        let (settings, log) = settings(&mock);

        let iso = settings.fetch(ISO).await.unwrap();
        assert_eq!(iso.current, "800");
        assert!(iso.contains("1600"));
        assert!(!iso.contains("3200"));
        assert_eq!(log.messages(), vec!["Loaded iso: 800"]);
    }

    #[tokio::test]
    async fn fetch_all_skips_failures() {
        let mock = Arc::new(MockTransport::new());
        mock.add_setting(SHUTTER_SPEED, "1/100", &["bulb", "30", "1/100"]);
        mock.add_setting(ISO, "400", &["400"]);
        let (settings, log) = settings(&mock);

        let loaded = settings.fetch_all().await;
        let names: Vec<_> = loaded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![SHUTTER_SPEED, ISO]);
        assert!(log.last().unwrap().is_error());
    }

    #[tokio::test]
    async fn apply_rejected_value_is_server_rejection() {
        let mock = Arc::new(MockTransport::new());
        mock.add_setting(ISO, "400", &["400", "800"]);
        let (settings, _log) = settings(&mock);

        let err = settings.apply(ISO, "12800").await.unwrap_err();
        assert!(matches!(err, CaptureError::ServerRejection(_)));
        assert_eq!(mock.setting(ISO).as_deref(), Some("400"));

        let message = settings.apply(ISO, "800").await.unwrap();
        assert_eq!(message, "iso set to 800");
        assert_eq!(mock.setting(ISO).as_deref(), Some("800"));
    }

    #[tokio::test]
    async fn apply_checked_validates_locally() {
        let mock = Arc::new(MockTransport::new());
        mock.add_setting(APERTURE, "5.6", &["4", "5.6"]);
        let (settings, log) = settings(&mock);

        let aperture = settings.fetch(APERTURE).await.unwrap();
        let err = settings.apply_checked(&aperture, "22").await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidParameter(_)));
        // The fetch plus one error entry; nothing was sent
        assert_eq!(log.len(), 2);
        assert!(log.last().unwrap().is_error());
        assert_eq!(mock.setting(APERTURE).as_deref(), Some("5.6"));
    }
}
