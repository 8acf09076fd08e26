use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, to_bson};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use super::DocumentStore;
use crate::metrics::track_db_operation;
use crate::models::progress::ProgressSnapshot;
use crate::models::quiz::{Attempt, Quiz};
use crate::models::roadmap::Roadmap;
use crate::models::task::Task;
use crate::models::user::{ChatMessage, User};

const USERS: &str = "users";
const TASKS: &str = "tasks";
const QUIZZES: &str = "quizzes";
const ROADMAPS: &str = "roadmaps";
const PROGRESS: &str = "progress";

fn chrono_to_bson(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = mongodb::Client::with_uri_str(uri)
            .await
            .context("Failed to connect to MongoDB")?;
        let store = Self {
            db: client.database(database),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .context("Failed to create users.email index")?;

        self.tasks()
            .create_index(IndexModel::builder().keys(doc! { "userId": 1, "createdAt": -1 }).build())
            .await
            .context("Failed to create tasks index")?;

        self.quizzes()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "userId": 1, "taskId": 1, "createdAt": -1 })
                    .build(),
            )
            .await
            .context("Failed to create quizzes index")?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn tasks(&self) -> Collection<Task> {
        self.db.collection(TASKS)
    }

    fn quizzes(&self) -> Collection<Quiz> {
        self.db.collection(QUIZZES)
    }

    fn roadmaps(&self) -> Collection<Roadmap> {
        self.db.collection(ROADMAPS)
    }

    fn progress(&self) -> Collection<ProgressSnapshot> {
        self.db.collection(PROGRESS)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        track_db_operation("insert", USERS, async {
            self.users()
                .insert_one(user)
                .await
                .context("Failed to insert user")?;
            Ok(())
        })
        .await
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        track_db_operation("find_one", USERS, async {
            self.users()
                .find_one(doc! { "_id": user_id })
                .await
                .context("Failed to find user")
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        track_db_operation("find_one", USERS, async {
            self.users()
                .find_one(doc! { "email": email })
                .await
                .context("Failed to find user by email")
        })
        .await
    }

    async fn replace_chat_history(&self, user_id: &str, history: &[ChatMessage]) -> Result<bool> {
        track_db_operation("update", USERS, async {
            let result = self
                .users()
                .update_one(
                    doc! { "_id": user_id },
                    doc! {
                        "$set": {
                            "tutorChatHistory": to_bson(history)?,
                            "updatedAt": chrono_to_bson(Utc::now()),
                        }
                    },
                )
                .await
                .context("Failed to update chat history")?;
            Ok(result.matched_count > 0)
        })
        .await
    }

    async fn insert_task(&self, task: &Task) -> Result<()> {
        track_db_operation("insert", TASKS, async {
            self.tasks()
                .insert_one(task)
                .await
                .context("Failed to insert task")?;
            Ok(())
        })
        .await
    }

    async fn find_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        track_db_operation("find_one", TASKS, async {
            self.tasks()
                .find_one(doc! { "_id": task_id, "userId": user_id })
                .await
                .context("Failed to find task")
        })
        .await
    }

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        track_db_operation("find", TASKS, async {
            let cursor = self
                .tasks()
                .find(doc! { "userId": user_id })
                .sort(doc! { "createdAt": -1 })
                .await
                .context("Failed to query tasks")?;
            cursor.try_collect().await.context("Failed to read tasks cursor")
        })
        .await
    }

    async fn save_task(&self, task: &Task) -> Result<bool> {
        track_db_operation("replace", TASKS, async {
            let result = self
                .tasks()
                .replace_one(doc! { "_id": &task.id, "userId": &task.user_id }, task)
                .await
                .context("Failed to save task")?;
            Ok(result.matched_count > 0)
        })
        .await
    }

    async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        track_db_operation("delete", TASKS, async {
            self.tasks()
                .find_one_and_delete(doc! { "_id": task_id, "userId": user_id })
                .await
                .context("Failed to delete task")
        })
        .await
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        track_db_operation("insert", QUIZZES, async {
            self.quizzes()
                .insert_one(quiz)
                .await
                .context("Failed to insert quiz")?;
            Ok(())
        })
        .await
    }

    async fn find_quiz(&self, user_id: &str, quiz_id: &str) -> Result<Option<Quiz>> {
        track_db_operation("find_one", QUIZZES, async {
            self.quizzes()
                .find_one(doc! { "_id": quiz_id, "userId": user_id })
                .await
                .context("Failed to find quiz")
        })
        .await
    }

    async fn latest_quiz_for_task(&self, user_id: &str, task_id: &str) -> Result<Option<Quiz>> {
        track_db_operation("find_one", QUIZZES, async {
            self.quizzes()
                .find_one(doc! { "userId": user_id, "taskId": task_id })
                .sort(doc! { "createdAt": -1 })
                .await
                .context("Failed to find latest quiz")
        })
        .await
    }

    async fn list_quizzes(&self, user_id: &str) -> Result<Vec<Quiz>> {
        track_db_operation("find", QUIZZES, async {
            let cursor = self
                .quizzes()
                .find(doc! { "userId": user_id })
                .await
                .context("Failed to query quizzes")?;
            cursor.try_collect().await.context("Failed to read quizzes cursor")
        })
        .await
    }

    async fn append_attempt(&self, user_id: &str, quiz_id: &str, attempt: &Attempt) -> Result<bool> {
        track_db_operation("update", QUIZZES, async {
            let date = chrono_to_bson(attempt.date);
            let result = self
                .quizzes()
                .update_one(
                    doc! { "_id": quiz_id, "userId": user_id },
                    doc! {
                        "$push": { "attempts": to_bson(attempt)? },
                        "$set": {
                            "score": attempt.score as i64,
                            "lastAttempt": date,
                            "updatedAt": date,
                        }
                    },
                )
                .await
                .context("Failed to append quiz attempt")?;
            Ok(result.matched_count > 0)
        })
        .await
    }

    async fn find_roadmap(&self, user_id: &str) -> Result<Option<Roadmap>> {
        track_db_operation("find_one", ROADMAPS, async {
            self.roadmaps()
                .find_one(doc! { "_id": user_id })
                .await
                .context("Failed to find roadmap")
        })
        .await
    }

    async fn upsert_roadmap(&self, roadmap: &Roadmap) -> Result<()> {
        track_db_operation("upsert", ROADMAPS, async {
            self.roadmaps()
                .replace_one(doc! { "_id": &roadmap.user_id }, roadmap)
                .upsert(true)
                .await
                .context("Failed to upsert roadmap")?;
            Ok(())
        })
        .await
    }

    async fn upsert_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        track_db_operation("upsert", PROGRESS, async {
            self.progress()
                .replace_one(doc! { "_id": &snapshot.user_id }, snapshot)
                .upsert(true)
                .await
                .context("Failed to upsert progress snapshot")?;
            Ok(())
        })
        .await
    }
}
