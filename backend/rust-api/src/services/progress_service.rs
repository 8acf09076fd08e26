use std::sync::Arc;

use crate::error::AppError;
use crate::models::progress::{ProgressReport, ProgressSnapshot};
use crate::models::quiz::Quiz;
use crate::models::task::Task;
use crate::store::DocumentStore;

const TASK_WEIGHT: f64 = 0.7;
const QUIZ_WEIGHT: f64 = 0.3;

pub struct ProgressService {
    store: Arc<dyn DocumentStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Computes the report from live task and quiz state, then caches a
    /// snapshot. A failed cache write is logged and ignored.
    pub async fn report(&self, user_id: &str) -> Result<ProgressReport, AppError> {
        let tasks = self.store.list_tasks(user_id).await?;
        let quizzes = self.store.list_quizzes(user_id).await?;
        let report = compute_progress(&tasks, &quizzes);

        let snapshot = ProgressSnapshot::from_report(user_id, &report);
        if let Err(e) = self.store.upsert_progress(&snapshot).await {
            tracing::warn!("Failed to cache progress snapshot for {}: {:#}", user_id, e);
        }

        Ok(report)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn ratio(done: u32, total: u32) -> f64 {
    finite_or_zero(done as f64 / total as f64 * 100.0)
}

pub fn compute_progress(tasks: &[Task], quizzes: &[Quiz]) -> ProgressReport {
    let total_tasks = tasks.len() as u32;
    let completed_tasks = tasks.iter().filter(|t| t.completed).count() as u32;
    let total_subtasks = tasks.iter().map(|t| t.subtasks.len() as u32).sum::<u32>();
    let completed_subtasks = tasks
        .iter()
        .flat_map(|t| t.subtasks.iter())
        .filter(|s| s.completed)
        .count() as u32;

    let task_percent = match (total_tasks > 0, total_subtasks > 0) {
        (true, true) => {
            (ratio(completed_tasks, total_tasks) + ratio(completed_subtasks, total_subtasks)) / 2.0
        }
        (true, false) => ratio(completed_tasks, total_tasks),
        (false, true) => ratio(completed_subtasks, total_subtasks),
        (false, false) => 0.0,
    };

    // Latest attempt of each answered quiz.
    let quiz_scores: Vec<f64> = quizzes
        .iter()
        .filter_map(|q| q.attempts.last())
        .map(|a| finite_or_zero(a.score as f64 / a.answers.len().max(1) as f64 * 100.0))
        .collect();
    let quizzes_taken = quiz_scores.len() as u32;
    let avg_score = if quiz_scores.is_empty() {
        0.0
    } else {
        finite_or_zero(quiz_scores.iter().sum::<f64>() / quiz_scores.len() as f64)
    };

    let weighted = finite_or_zero(task_percent * TASK_WEIGHT + avg_score * QUIZ_WEIGHT);

    ProgressReport {
        completed_tasks,
        total_tasks,
        completed_subtasks,
        total_subtasks,
        quizzes_taken,
        avg_score: (avg_score * 100.0).round() / 100.0,
        percentage: weighted.round().clamp(0.0, 100.0) as u32,
    }
}
