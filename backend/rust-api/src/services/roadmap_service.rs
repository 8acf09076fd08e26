use std::sync::Arc;

use chrono::Utc;

use crate::error::AppError;
use crate::metrics::{self, source_label, track_oracle_call};
use crate::models::roadmap::Roadmap;
use crate::models::task::Task;
use crate::oracle::{steps_from, ContentOracle, ROADMAP_FALLBACK};
use crate::store::DocumentStore;

pub struct RoadmapService {
    store: Arc<dyn DocumentStore>,
    oracle: Arc<dyn ContentOracle>,
}

pub fn default_prompt(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "Generate a beginner-friendly learning roadmap for a new student".to_string();
    }
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    format!(
        "Generate a personalized learning roadmap for these tasks: {}",
        titles.join(", ")
    )
}

impl RoadmapService {
    pub fn new(store: Arc<dyn DocumentStore>, oracle: Arc<dyn ContentOracle>) -> Self {
        Self { store, oracle }
    }

    pub async fn get(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .store
            .find_roadmap(user_id)
            .await?
            .map(|r| r.steps)
            .unwrap_or_default())
    }

    /// Regenerates and stores the roadmap, falling back to the fixed steps if
    /// the oracle yields nothing usable.
    pub async fn regenerate(&self, user_id: &str, prompt: Option<String>) -> Result<Vec<String>, AppError> {
        let prompt = match prompt.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
            Some(prompt) => prompt,
            None => default_prompt(&self.store.list_tasks(user_id).await?),
        };

        let steps = match track_oracle_call("roadmap", self.oracle.roadmap(&prompt)).await {
            Ok(payload) => payload.normalize(),
            Err(e) => {
                tracing::warn!("Roadmap generation failed for user {}: {}", user_id, e);
                Vec::new()
            }
        };
        let from_oracle = !steps.is_empty();
        let steps = if from_oracle {
            steps
        } else {
            tracing::warn!("Using fallback roadmap for user {}", user_id);
            steps_from(&ROADMAP_FALLBACK)
        };

        let roadmap = Roadmap {
            user_id: user_id.to_string(),
            steps,
            updated_at: Utc::now(),
        };
        self.store.upsert_roadmap(&roadmap).await?;
        metrics::ROADMAPS_GENERATED_TOTAL
            .with_label_values(&[source_label(from_oracle)])
            .inc();

        tracing::info!("Stored roadmap with {} steps for user {}", roadmap.steps.len(), user_id);
        Ok(roadmap.steps)
    }
}
