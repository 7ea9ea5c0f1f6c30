//! # AstroPi Control Library
//!
//! Client side of the AstroPi capture server: builds capture requests from
//! operator input, runs one capture session at a time against the server's
//! HTTP API, polls its progress and keeps an operator-facing log of what
//! happened. The `astropi` binary (`main.rs`) is a thin terminal front end
//! over this library; a graphical panel can drive the same controller from its
//! frame loop.
//!
//! ## Crate Structure
//!
//! - **`session`**: `CaptureSessionController`, the Idle/Starting/Capturing/
//!   Stopping state machine that owns the active capture.
//! - **`poller`**: `StatusPoller`, one delayed and cancellable status request
//!   at a time.
//! - **`request`**: frame types, `CaptureRequest` and its validating builder.
//! - **`exposure`**: shutter-speed token parsing (`"1/100"`, `"30"`, `"bulb"`).
//! - **`transport`**: the `CaptureTransport`/`PanelApi` seams, the `reqwest`
//!   client and a scripted mock.
//! - **`protocol`**: JSON bodies exchanged with the server.
//! - **`camera_settings`** and **`system`**: one-shot configuration and host
//!   actions.
//! - **`notifications`**: the append-only operator log.
//! - **`config`**, **`connection`**, **`tracing_setup`**, **`error`**: layered
//!   configuration, server addressing, diagnostics and the error type.

pub mod camera_settings;
pub mod config;
pub mod connection;
pub mod error;
pub mod exposure;
pub mod notifications;
pub mod poller;
pub mod protocol;
pub mod request;
pub mod session;
pub mod system;
pub mod tracing_setup;
pub mod transport;

pub use error::{CaptureError, Result};
pub use request::{CaptureForm, CaptureRequest, CaptureRequestBuilder, FrameType};
pub use session::{CaptureSessionController, SessionState};
