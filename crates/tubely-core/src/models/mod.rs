//! Domain models

pub mod media;
pub mod video;

pub use media::{approx_equal, parse_media_type, AspectClass, VideoContainer, ASPECT_TOLERANCE};
pub use video::VideoRecord;
