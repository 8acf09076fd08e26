//! Document persistence for users, tasks, quizzes, roadmaps and progress
//! snapshots. Every query is scoped by the owning user id.

pub mod memory;
pub mod mongo;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::progress::ProgressSnapshot;
use crate::models::quiz::{Attempt, Quiz};
use crate::models::roadmap::Roadmap;
use crate::models::task::Task;
use crate::models::user::{ChatMessage, User};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Overwrites the tutor chat log. `false` if the user does not exist.
    async fn replace_chat_history(&self, user_id: &str, history: &[ChatMessage]) -> Result<bool>;

    async fn insert_task(&self, task: &Task) -> Result<()>;
    async fn find_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>>;
    /// Newest first.
    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>>;
    /// Replaces the stored task document. `false` if it no longer exists.
    async fn save_task(&self, task: &Task) -> Result<bool>;
    async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>>;

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()>;
    async fn find_quiz(&self, user_id: &str, quiz_id: &str) -> Result<Option<Quiz>>;
    /// Most recently created quiz for the task, if any.
    async fn latest_quiz_for_task(&self, user_id: &str, task_id: &str) -> Result<Option<Quiz>>;
    async fn list_quizzes(&self, user_id: &str) -> Result<Vec<Quiz>>;
    /// Appends an attempt and sets the quiz's latest score. Existing attempts
    /// are left untouched. `false` if the quiz does not exist.
    async fn append_attempt(&self, user_id: &str, quiz_id: &str, attempt: &Attempt) -> Result<bool>;

    async fn find_roadmap(&self, user_id: &str) -> Result<Option<Roadmap>>;
    async fn upsert_roadmap(&self, roadmap: &Roadmap) -> Result<()>;

    async fn upsert_progress(&self, snapshot: &ProgressSnapshot) -> Result<()>;
}
