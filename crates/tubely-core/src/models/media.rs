//! Media classification types: aspect class and accepted video containers.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Absolute tolerance used when matching a ratio against 16:9 and 9:16.
pub const ASPECT_TOLERANCE: f64 = 0.05;

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;

/// Symmetric, inclusive absolute-difference comparison.
pub fn approx_equal(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Coarse orientation bucket of a video, used only as a storage key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Classify a width/height ratio. 16:9 is checked before 9:16.
    pub fn from_ratio(ratio: f64) -> Self {
        if approx_equal(ratio, LANDSCAPE_RATIO, ASPECT_TOLERANCE) {
            AspectClass::Landscape
        } else if approx_equal(ratio, PORTRAIT_RATIO, ASPECT_TOLERANCE) {
            AspectClass::Portrait
        } else {
            AspectClass::Other
        }
    }

    /// Classify pixel dimensions. A zero height has no ratio and is `Other`.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            return AspectClass::Other;
        }
        Self::from_ratio(f64::from(width) / f64::from(height))
    }

    pub fn key_prefix(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl Display for AspectClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.key_prefix())
    }
}

/// Video container formats the ingestion pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    Mp4,
    QuickTime,
}

impl VideoContainer {
    /// Map a normalized media type (see [`parse_media_type`]) to a container.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "video/mp4" => Some(VideoContainer::Mp4),
            "video/quicktime" => Some(VideoContainer::QuickTime),
            _ => None,
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "video/mp4",
            VideoContainer::QuickTime => "video/quicktime",
        }
    }

    /// File extension used in storage keys (without the leading dot).
    pub fn extension(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "mp4",
            VideoContainer::QuickTime => "mov",
        }
    }

    /// ffmpeg muxer name passed to `-f` when remuxing.
    pub fn muxer(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "mp4",
            VideoContainer::QuickTime => "mov",
        }
    }
}

/// Strip parameters from a Content-Type header value and lowercase it.
///
/// `"Video/MP4; codecs=avc1"` becomes `"video/mp4"`. Returns `None` when the
/// value has no `type/subtype` shape.
pub fn parse_media_type(content_type: &str) -> Option<String> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let (kind, subtype) = media_type.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return None;
    }
    Some(media_type)
}
