use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::models::progress::ProgressSnapshot;
use crate::models::quiz::{Attempt, Quiz};
use crate::models::roadmap::Roadmap;
use crate::models::task::Task;
use crate::models::user::{ChatMessage, User};

/// Process-local store. Collections are kept in insertion order so "newest"
/// means "last inserted".
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    tasks: RwLock<Vec<Task>>,
    quizzes: RwLock<Vec<Quiz>>,
    roadmaps: RwLock<HashMap<String, Roadmap>>,
    progress: RwLock<HashMap<String, ProgressSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last cached progress snapshot for a user.
    pub async fn progress_snapshot(&self, user_id: &str) -> Option<ProgressSnapshot> {
        self.progress.read().await.get(user_id).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            bail!("duplicate email: {}", user.email);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn replace_chat_history(&self, user_id: &str, history: &[ChatMessage]) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.chat_history = history.to_vec();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_task(&self, task: &Task) -> Result<()> {
        self.tasks.write().await.push(task.clone());
        Ok(())
    }

    async fn find_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .find(|t| t.id == task_id && t.user_id == user_id)
            .cloned())
    }

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_task(&self, task: &Task) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.user_id == task.user_id)
        {
            Some(slot) => {
                *slot = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let index = tasks
            .iter()
            .position(|t| t.id == task_id && t.user_id == user_id);
        Ok(index.map(|i| tasks.remove(i)))
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.quizzes.write().await.push(quiz.clone());
        Ok(())
    }

    async fn find_quiz(&self, user_id: &str, quiz_id: &str) -> Result<Option<Quiz>> {
        Ok(self
            .quizzes
            .read()
            .await
            .iter()
            .find(|q| q.id == quiz_id && q.user_id == user_id)
            .cloned())
    }

    async fn latest_quiz_for_task(&self, user_id: &str, task_id: &str) -> Result<Option<Quiz>> {
        Ok(self
            .quizzes
            .read()
            .await
            .iter()
            .rev()
            .find(|q| q.task_id == task_id && q.user_id == user_id)
            .cloned())
    }

    async fn list_quizzes(&self, user_id: &str) -> Result<Vec<Quiz>> {
        Ok(self
            .quizzes
            .read()
            .await
            .iter()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn append_attempt(&self, user_id: &str, quiz_id: &str, attempt: &Attempt) -> Result<bool> {
        let mut quizzes = self.quizzes.write().await;
        match quizzes
            .iter_mut()
            .find(|q| q.id == quiz_id && q.user_id == user_id)
        {
            Some(quiz) => {
                quiz.record_attempt(attempt.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_roadmap(&self, user_id: &str) -> Result<Option<Roadmap>> {
        Ok(self.roadmaps.read().await.get(user_id).cloned())
    }

    async fn upsert_roadmap(&self, roadmap: &Roadmap) -> Result<()> {
        self.roadmaps
            .write()
            .await
            .insert(roadmap.user_id.clone(), roadmap.clone());
        Ok(())
    }

    async fn upsert_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        self.progress
            .write()
            .await
            .insert(snapshot.user_id.clone(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tasks_are_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let first = Task::new("u1", "first", "", Vec::new());
        let second = Task::new("u1", "second", "", Vec::new());
        let foreign = Task::new("u2", "other", "", Vec::new());
        for task in [&first, &second, &foreign] {
            store.insert_task(task).await.unwrap();
        }

        let titles: Vec<_> = store
            .list_tasks("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert!(store.find_task("u2", &first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let user = User::new("A".into(), "a@b.io".into(), "hash".into());
        store.insert_user(&user).await.unwrap();
        let again = User::new("B".into(), "a@b.io".into(), "hash".into());
        assert!(store.insert_user(&again).await.is_err());
    }

    #[tokio::test]
    async fn append_attempt_keeps_prior_attempts() {
        let store = MemoryStore::new();
        let quiz = Quiz::new("u1", "t1", Vec::new());
        store.insert_quiz(&quiz).await.unwrap();

        let first = Attempt::new(2, Vec::new());
        assert!(store.append_attempt("u1", &quiz.id, &first).await.unwrap());
        assert!(store
            .append_attempt("u1", &quiz.id, &Attempt::new(1, Vec::new()))
            .await
            .unwrap());
        assert!(!store
            .append_attempt("u2", &quiz.id, &Attempt::new(1, Vec::new()))
            .await
            .unwrap());

        let stored = store.find_quiz("u1", &quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts.len(), 2);
        assert_eq!(stored.attempts[0], first);
        assert_eq!(stored.score, 1);
    }
}
