use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bson_datetime_as_chrono;

/// Aggregate returned by `GET /progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub completed_tasks: u32,
    pub total_tasks: u32,
    pub completed_subtasks: u32,
    pub total_subtasks: u32,
    pub quizzes_taken: u32,
    pub avg_score: f64,
    pub percentage: u32,
}

/// Cached copy of the last computed report, keyed by user id. Never read back
/// as a source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(rename = "completedTasks")]
    pub completed_tasks: u32,
    #[serde(rename = "quizzesTaken")]
    pub quizzes_taken: u32,
    #[serde(rename = "avgScore")]
    pub avg_score: f64,
    pub percentage: u32,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn from_report(user_id: impl Into<String>, report: &ProgressReport) -> Self {
        Self {
            user_id: user_id.into(),
            completed_tasks: report.completed_tasks,
            quizzes_taken: report.quizzes_taken,
            avg_score: report.avg_score,
            percentage: report.percentage,
            updated_at: Utc::now(),
        }
    }
}
