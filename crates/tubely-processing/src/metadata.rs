//! Video metadata reported by the prober

use serde::{Deserialize, Serialize};
use tubely_core::AspectClass;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Seconds. Missing for streams ffprobe cannot time.
    pub duration: Option<f64>,
    pub codec: String,
    pub bitrate: Option<u64>,
    pub framerate: Option<f32>,
}

impl VideoMetadata {
    pub fn aspect_class(&self) -> AspectClass {
        AspectClass::from_dimensions(self.width, self.height)
    }
}

/// Parse an ffprobe rational such as `30000/1001`.
pub(crate) fn parse_frame_rate(rate: &str) -> Option<f32> {
    let (num, den) = rate.split_once('/')?;
    let num: f32 = num.trim().parse().ok()?;
    let den: f32 = den.trim().parse().ok()?;
    if den != 0.0 {
        Some(num / den)
    } else {
        None
    }
}
