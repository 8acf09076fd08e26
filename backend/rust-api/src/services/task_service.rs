use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::{self, source_label, track_oracle_call};
use crate::models::quiz::Question;
use crate::models::task::{LegacyQuizGrade, LegacySelection, Task, TaskPatch};
use crate::oracle::{
    fallback_quiz, fallback_subtasks, gradable_questions, suggestion_titles, ContentOracle,
};
use crate::store::DocumentStore;

pub struct TaskService {
    store: Arc<dyn DocumentStore>,
    oracle: Arc<dyn ContentOracle>,
}

impl TaskService {
    pub fn new(store: Arc<dyn DocumentStore>, oracle: Arc<dyn ContentOracle>) -> Self {
        Self { store, oracle }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Task>, AppError> {
        Ok(self.store.list_tasks(user_id).await?)
    }

    pub async fn get(&self, user_id: &str, task_id: &str) -> Result<Task, AppError> {
        self.store
            .find_task(user_id, task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task not found"))
    }

    /// Creates a task with suggested subtasks, or the fixed template when the
    /// oracle has nothing to offer.
    pub async fn create(
        &self,
        user_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Task, AppError> {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::validation("Title is required"))?;
        let description = description.unwrap_or_default();

        let context = format!("{}\n\n{}", title, description);
        let suggested = match track_oracle_call("analyze", self.oracle.analyze(&context)).await {
            Ok(analysis) => analysis.subtask_titles(),
            Err(e) => {
                tracing::warn!("Subtask analysis failed for \"{}\": {}", title, e);
                Vec::new()
            }
        };
        let subtasks = if suggested.is_empty() {
            tracing::warn!("Using fallback subtasks for \"{}\"", title);
            fallback_subtasks(&title)
        } else {
            suggested
        };

        let task = Task::new(user_id, title, description, subtasks);
        self.store.insert_task(&task).await?;
        metrics::TASKS_CREATED_TOTAL.inc();

        tracing::info!(
            "Created task {} with {} subtasks for user {}",
            task.id,
            task.subtasks.len(),
            user_id
        );
        Ok(task)
    }

    pub async fn apply_patch(&self, user_id: &str, patch: TaskPatch) -> Result<Task, AppError> {
        let mut task = self.get(user_id, patch.task_id()).await?;

        match patch {
            TaskPatch::ToggleTaskDone { .. } => {
                let completed = task.toggle_done();
                tracing::info!("Task {} toggled to completed={}", task.id, completed);
            }
            TaskPatch::UpdateTask { completed, .. } => {
                task.set_completed_cascade(completed);
                tracing::info!("Task {} set to completed={}", task.id, completed);
            }
            TaskPatch::UpdateSubtasks { subtasks, .. } => {
                task.replace_subtasks(subtasks);
                tracing::info!(
                    "Task {} subtasks replaced ({}), completed={}",
                    task.id,
                    task.subtasks.len(),
                    task.completed
                );
            }
        }

        self.save(task).await
    }

    pub async fn toggle_subtask(
        &self,
        user_id: &str,
        task_id: &str,
        subtask_id: &str,
    ) -> Result<Task, AppError> {
        let mut task = self.get(user_id, task_id).await?;
        task.toggle_subtask(subtask_id)
            .ok_or_else(|| AppError::not_found("Subtask not found"))?;
        self.save(task).await
    }

    pub async fn delete_subtask(
        &self,
        user_id: &str,
        task_id: &str,
        subtask_id: &str,
    ) -> Result<Task, AppError> {
        let mut task = self.get(user_id, task_id).await?;
        if !task.remove_subtask(subtask_id) {
            return Err(AppError::not_found("Subtask not found"));
        }
        self.save(task).await
    }

    /// Asks for more subtasks and appends the ones whose titles are new. The
    /// fixed template is merged only when the oracle call fails; an empty
    /// answer adds nothing.
    pub async fn generate_more_subtasks(&self, user_id: &str, task_id: &str) -> Result<Task, AppError> {
        let mut task = self.get(user_id, task_id).await?;

        let titles = match track_oracle_call(
            "subtasks",
            self.oracle.subtasks(&task.title, &task.description),
        )
        .await
        {
            Ok(suggestions) => suggestion_titles(&suggestions),
            Err(e) => {
                tracing::warn!("Subtask generation failed for task {}: {}", task.id, e);
                fallback_subtasks(&task.title)
            }
        };

        let added = task.merge_subtask_titles(titles);
        tracing::info!("Added {} subtasks to task {}", added, task.id);
        self.save(task).await
    }

    /// Generates questions and appends them to the task's embedded quiz.
    /// Returns only the questions just added.
    pub async fn append_task_quiz(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Vec<Question>, AppError> {
        let mut task = self.get(user_id, task_id).await?;
        let questions = self.task_questions(&task).await;
        task.append_quiz(questions.clone());
        self.save(task).await?;
        Ok(questions)
    }

    /// Replaces the embedded quiz with fresh questions and drops past results.
    pub async fn reset_task_quiz(&self, user_id: &str, task_id: &str) -> Result<Task, AppError> {
        let mut task = self.get(user_id, task_id).await?;
        let questions = self.task_questions(&task).await;
        task.reset_quiz(questions);
        self.save(task).await
    }

    pub async fn submit_task_quiz(
        &self,
        user_id: &str,
        task_id: &str,
        answers: &[Option<LegacySelection>],
    ) -> Result<LegacyQuizGrade, AppError> {
        let mut task = self.get(user_id, task_id).await?;
        if task.quizzes.is_empty() {
            return Err(AppError::validation("Task has no quiz to submit"));
        }
        let grade = task.grade_quiz(answers);
        tracing::info!(
            "Task {} quiz graded {}/{} for user {}",
            task.id,
            grade.score,
            grade.total,
            user_id
        );
        self.save(task).await?;
        Ok(grade)
    }

    async fn task_questions(&self, task: &Task) -> Vec<Question> {
        let generated = match track_oracle_call("quiz", self.oracle.quiz(&task.title, &task.description)).await {
            Ok(raw) => gradable_questions(raw),
            Err(e) => {
                tracing::warn!("Task quiz generation failed for task {}: {}", task.id, e);
                Vec::new()
            }
        };
        let from_oracle = !generated.is_empty();
        metrics::QUIZZES_GENERATED_TOTAL
            .with_label_values(&[source_label(from_oracle)])
            .inc();
        if from_oracle {
            generated
        } else {
            tracing::warn!("Using fallback quiz for task {}", task.id);
            fallback_quiz(&task.title)
        }
    }

    pub async fn delete(&self, user_id: &str, task_id: &str) -> Result<Task, AppError> {
        let task = self
            .store
            .delete_task(user_id, task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task not found"))?;
        tracing::info!("Deleted task {} for user {}", task.id, user_id);
        Ok(task)
    }

    async fn save(&self, task: Task) -> Result<Task, AppError> {
        if !self.store.save_task(&task).await? {
            return Err(AppError::not_found("Task not found"));
        }
        Ok(task)
    }
}
