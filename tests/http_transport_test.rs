//! PanelClient against an in-process HTTP server.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use astropi_control::camera_settings::{CameraSettings, ISO};
use astropi_control::exposure::ExposureValue;
use astropi_control::notifications::NotificationLog;
use astropi_control::system::SystemActions;
use astropi_control::transport::{CaptureTransport, PanelApi};
use astropi_control::{
    CaptureError, CaptureForm, CaptureRequestBuilder, CaptureSessionController, FrameType,
    SessionState,
};
use common::FakeServer;
use serde_json::json;

#[tokio::test]
async fn start_capture_sends_typed_body() {
    let server = FakeServer::with_statuses(&[]);
    let client = common::spawn(Arc::clone(&server)).await;

    let request =
        CaptureRequestBuilder::build(FrameType::Lights, ExposureValue::Seconds(0.01), "5").unwrap();
    let reply = client.start_capture(&request).await.unwrap();
    assert!(!reply.is_error());
    assert_eq!(reply.message, "Started lights capture.");

    let bulb = CaptureForm {
        frame_type: FrameType::Darks,
        shutter_speed: "Bulb".into(),
        bulb_duration: "120".into(),
        count: "2".into(),
    }
    .into_request()
    .unwrap();
    client.start_capture(&bulb).await.unwrap();

    let bodies = server.start_bodies.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec![
            json!({"type": "lights", "exposure": 0.01, "count": 5}),
            json!({"type": "darks", "exposure": "120", "count": 2}),
        ]
    );
}

#[tokio::test]
async fn error_status_codes_still_yield_bodies() {
    let server = FakeServer::with_statuses(&[]);
    *server.busy.lock().unwrap() = Some("camera busy".to_string());
    let client = common::spawn(Arc::clone(&server)).await;

    let request =
        CaptureRequestBuilder::build(FrameType::Offsets, ExposureValue::Seconds(0.0), "50").unwrap();
    let reply = client.start_capture(&request).await.unwrap();
    assert!(reply.is_error());
    assert_eq!(reply.message, "camera busy");
}

#[tokio::test]
async fn status_and_stop_round_trip() {
    let server = FakeServer::with_statuses(&[("capturing", "3/10 frames")]);
    let client = common::spawn(Arc::clone(&server)).await;

    let status = client.capture_status().await.unwrap();
    assert!(status.is_capturing());
    assert_eq!(status.message, "3/10 frames");

    let stop = client.stop_capture().await.unwrap();
    assert_eq!(stop.message, "Capture process terminated.");
    assert_eq!(stop.status.as_deref(), Some("stopped"));
    assert_eq!(*server.stops.lock().unwrap(), 1);
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let client = common::unreachable_client();
    let err = client.capture_status().await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err}");
}

#[tokio::test]
async fn camera_settings_over_http() {
    let server = FakeServer::with_statuses(&[]);
    let client = Arc::new(common::spawn(Arc::clone(&server)).await);
    let log = NotificationLog::new();
    let settings = CameraSettings::new(client as Arc<dyn PanelApi>, Arc::new(log.clone()));

    let iso = settings.fetch(ISO).await.unwrap();
    assert_eq!(iso.current, "400");
    assert_eq!(iso.choices, vec!["100", "400", "1600"]);

    assert_eq!(settings.apply(ISO, "1600").await.unwrap(), "iso set to 1600");
    assert_eq!(*server.iso.lock().unwrap(), "1600");

    let err = settings.apply(ISO, "999").await.unwrap_err();
    assert!(matches!(err, CaptureError::ServerRejection(ref m) if m == "Cannot set iso to 999"));

    let err = settings.fetch("whitebalance").await.unwrap_err();
    assert!(matches!(err, CaptureError::ServerRejection(_)));
    assert!(log.last().unwrap().is_error());
}

#[tokio::test]
async fn system_actions_over_http() {
    let server = FakeServer::with_statuses(&[]);
    let client = Arc::new(common::spawn(server).await);
    let system = SystemActions::new(client as Arc<dyn PanelApi>, Arc::new(NotificationLog::new()));

    assert_eq!(system.actions().await.unwrap(), vec!["shutdown", "restart"]);
    assert_eq!(system.run("shutdown").await.unwrap(), "Executing shutdown...");
}

#[tokio::test]
async fn unreachable_system_actions_are_logged() {
    let client = Arc::new(common::unreachable_client());
    let log = NotificationLog::new();
    let system = SystemActions::new(client as Arc<dyn PanelApi>, Arc::new(log.clone()));

    let err = system.actions().await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err}");
    assert_eq!(log.len(), 1);
    assert!(log.last().unwrap().is_error());
}

#[tokio::test]
async fn full_session_over_http() {
    let server = FakeServer::with_statuses(&[
        ("capturing", "1/3 frames"),
        ("capturing", "2/3 frames"),
        ("finished", "Capture complete."),
    ]);
    let client = Arc::new(common::spawn(Arc::clone(&server)).await);
    let log = NotificationLog::new();
    let mut controller = CaptureSessionController::new(
        client as Arc<dyn CaptureTransport>,
        Arc::new(log.clone()),
        Handle::current(),
    )
    .with_poll_interval(Duration::from_millis(20));

    let request =
        CaptureRequestBuilder::build(FrameType::Lights, ExposureValue::Seconds(30.0), "3").unwrap();
    assert!(controller.start(request));

    tokio::time::timeout(Duration::from_secs(10), controller.wait_idle())
        .await
        .expect("session did not finish");

    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(
        log.messages(),
        vec![
            "Starting lights capture...",
            "Started lights capture.",
            "1/3 frames",
            "2/3 frames",
            "Finished: Capture complete.",
        ]
    );
    assert_eq!(controller.current_status(), "Capture complete.");
}
