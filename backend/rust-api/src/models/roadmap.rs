use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_datetime_as_chrono;

/// One roadmap per user; `_id` is the owning user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roadmap {
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegenerateRoadmapRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoadmapResponse {
    pub roadmap: Vec<String>,
}
