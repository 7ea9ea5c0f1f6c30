//! Capture request assembly.
//!
//! [`CaptureRequestBuilder`] is the single place where operator input is
//! validated before it reaches the server.

use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::{CaptureError, Result};
use crate::exposure::{parse_shutter_speed, ExposureResolver, ExposureValue};

/// Kind of frames in a capture sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    /// Exposures of the target
    Lights,
    /// Shutter-closed frames at the light exposure
    Darks,
    /// Shortest-possible bias frames
    Offsets,
}

impl FrameType {
    /// All frame types, in display order.
    pub const ALL: [FrameType; 3] = [FrameType::Lights, FrameType::Darks, FrameType::Offsets];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lights => "lights",
            Self::Darks => "darks",
            Self::Offsets => "offsets",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameType {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lights" | "light" => Ok(Self::Lights),
            "darks" | "dark" => Ok(Self::Darks),
            "offsets" | "offset" | "bias" => Ok(Self::Offsets),
            other => Err(CaptureError::InvalidParameter(format!(
                "unknown frame type '{other}' (expected lights, darks or offsets)"
            ))),
        }
    }
}

/// Body of `POST /start_capture`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureRequest {
    #[serde(rename = "type")]
    frame_type: FrameType,
    exposure: ExposureValue,
    count: NonZeroU32,
}

impl CaptureRequest {
    /// Frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Resolved exposure.
    #[must_use]
    pub fn exposure(&self) -> &ExposureValue {
        &self.exposure
    }

    /// Number of frames.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count.get()
    }
}

impl fmt::Display for CaptureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x{} @ {}",
            self.frame_type, self.count, self.exposure
        )
    }
}

/// Validates parameters and produces a [`CaptureRequest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureRequestBuilder;

impl CaptureRequestBuilder {
    /// Build a request from an already-resolved exposure and the raw count text.
    pub fn build(
        frame_type: FrameType,
        exposure: ExposureValue,
        count_raw: &str,
    ) -> Result<CaptureRequest> {
        let count = parse_count(count_raw)?;

        if let ExposureValue::Bulb(duration) = &exposure {
            match parse_shutter_speed(duration) {
                Ok(seconds) if seconds > 0.0 => {}
                _ => {
                    return Err(CaptureError::InvalidParameter(format!(
                        "bulb duration must be a positive number of seconds, got '{duration}'"
                    )))
                }
            }
        }

        Ok(CaptureRequest {
            frame_type,
            exposure,
            count,
        })
    }
}

fn parse_count(raw: &str) -> Result<NonZeroU32> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| {
            CaptureError::InvalidParameter(format!(
                "frame count must be a positive integer, got '{trimmed}'"
            ))
        })
}

/// Raw operator input for one capture, as typed into a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureForm {
    /// Which sequence to shoot
    pub frame_type: FrameType,
    /// Selected shutter-speed token
    pub shutter_speed: String,
    /// Duration used when the shutter token is bulb
    pub bulb_duration: String,
    /// Frame count as typed
    pub count: String,
}

impl CaptureForm {
    /// Resolve the exposure and validate everything in one step.
    pub fn into_request(self) -> Result<CaptureRequest> {
        let exposure = ExposureResolver::resolve(&self.shutter_speed, &self.bulb_duration);
        CaptureRequestBuilder::build(self.frame_type, exposure, &self.count)
    }
}
