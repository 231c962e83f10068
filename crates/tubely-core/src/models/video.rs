use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Video metadata record owned by the metadata collaborator.
///
/// The ingestion pipeline only reads it to confirm existence and writes back
/// `video_reference` (the storage key) after a successful publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn new(owner_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            description: description.into(),
            thumbnail_url: None,
            video_reference: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let mut record = VideoRecord::new(Uuid::nil(), "Boots", "A video about boots");
        record.video_reference = Some("portrait/abc.mp4".to_string());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["video_reference"], "portrait/abc.mp4");
        assert_eq!(value["thumbnail_url"], serde_json::Value::Null);
        assert_eq!(value["owner_id"], "00000000-0000-0000-0000-000000000000");

        let back: VideoRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
