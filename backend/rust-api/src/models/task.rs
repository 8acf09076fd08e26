use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::Question;
use super::{bson_datetime_as_chrono, new_id};

/// Learning task stored in MongoDB "tasks" collection. Subtasks live inside the
/// task document and have no lifetime of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Questions embedded by the legacy per-task quiz flow.
    #[serde(default)]
    pub quizzes: Vec<Question>,
    #[serde(rename = "quizResults", default)]
    pub quiz_results: Vec<LegacyQuizResult>,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyQuizResult {
    pub score: f64,
    #[serde(default)]
    pub answers: Vec<LegacyAnswer>,
    #[serde(rename = "takenAt", with = "bson_datetime_as_chrono")]
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegacyAnswer {
    pub question: String,
    pub selected: String,
    pub correct: String,
}

impl Task {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        subtask_titles: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            user_id: user_id.into(),
            title: title.into(),
            description: description.into(),
            completed: false,
            subtasks: subtask_titles.into_iter().map(Subtask::new).collect(),
            quizzes: Vec::new(),
            quiz_results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the task flag and pushes the same value down to every subtask.
    pub fn set_completed_cascade(&mut self, completed: bool) {
        self.completed = completed;
        for subtask in &mut self.subtasks {
            subtask.completed = completed;
        }
        self.touch();
    }

    /// Flips the task flag, cascading to subtasks. Returns the new value.
    pub fn toggle_done(&mut self) -> bool {
        let next = !self.completed;
        self.set_completed_cascade(next);
        next
    }

    /// Task is complete iff every subtask is (vacuously true with no subtasks).
    pub fn sync_completion_from_subtasks(&mut self) {
        self.completed = self.subtasks.iter().all(|s| s.completed);
        self.touch();
    }

    /// Replaces the subtask list wholesale, then syncs the task flag from it.
    pub fn replace_subtasks(&mut self, drafts: Vec<SubtaskDraft>) {
        let mut seen = HashSet::new();
        self.subtasks = drafts
            .into_iter()
            .map(|draft| {
                let id = draft
                    .id
                    .filter(|id| !id.trim().is_empty() && !seen.contains(id))
                    .unwrap_or_else(new_id);
                seen.insert(id.clone());
                Subtask {
                    id,
                    title: draft.title,
                    completed: draft.completed,
                }
            })
            .collect();
        self.sync_completion_from_subtasks();
    }

    /// Flips one subtask, then recomputes `completed` from all subtasks (unlike
    /// `remove_subtask`, which leaves the task flag alone). Returns the
    /// subtask's new value, or `None` if the id is unknown.
    pub fn toggle_subtask(&mut self, subtask_id: &str) -> Option<bool> {
        let subtask = self.subtasks.iter_mut().find(|s| s.id == subtask_id)?;
        subtask.completed = !subtask.completed;
        let value = subtask.completed;
        self.sync_completion_from_subtasks();
        Some(value)
    }

    /// Appends titles not already present (exact, case-sensitive match).
    /// Returns how many subtasks were added.
    pub fn merge_subtask_titles<I>(&mut self, titles: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut existing: HashSet<String> = self.subtasks.iter().map(|s| s.title.clone()).collect();
        let before = self.subtasks.len();
        for title in titles {
            if existing.insert(title.clone()) {
                self.subtasks.push(Subtask::new(title));
            }
        }
        let added = self.subtasks.len() - before;
        if added > 0 {
            self.touch();
        }
        added
    }

    /// Removes a subtask by id without touching the completion flag.
    pub fn remove_subtask(&mut self, subtask_id: &str) -> bool {
        let before = self.subtasks.len();
        self.subtasks.retain(|s| s.id != subtask_id);
        let removed = self.subtasks.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Adds questions to the task's embedded quiz.
    pub fn append_quiz(&mut self, questions: Vec<Question>) {
        self.quizzes.extend(questions);
        self.touch();
    }

    /// Starts the embedded quiz over: new questions, no past results.
    pub fn reset_quiz(&mut self, questions: Vec<Question>) {
        self.quizzes = questions;
        self.quiz_results.clear();
        self.touch();
    }

    /// Grades `answers` against the embedded quiz by position and records the
    /// percentage in `quiz_results`. Missing answers count as blank.
    pub fn grade_quiz(&mut self, answers: &[Option<LegacySelection>]) -> LegacyQuizGrade {
        let details: Vec<LegacyAnswer> = self
            .quizzes
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let selected = answers
                    .get(i)
                    .and_then(Option::as_ref)
                    .and_then(|answer| answer.resolve(&q.options))
                    .unwrap_or_default();
                LegacyAnswer {
                    question: q.question.clone(),
                    selected,
                    correct: q.correct_answer.clone(),
                }
            })
            .collect();

        let score = details
            .iter()
            .filter(|a| !a.selected.is_empty() && a.selected == a.correct)
            .count() as u32;
        let total = details.len() as u32;
        let percentage = if total > 0 {
            f64::from(score) / f64::from(total) * 100.0
        } else {
            0.0
        };

        self.quiz_results.push(LegacyQuizResult {
            score: percentage,
            answers: details.clone(),
            taken_at: Utc::now(),
        });
        self.touch();

        LegacyQuizGrade {
            score,
            total,
            percentage,
            answers: details,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One submitted answer: the option text, or its position (as a number or a
/// string of digits).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LegacySelection {
    Index(usize),
    Text(String),
}

impl LegacySelection {
    fn resolve(&self, options: &[String]) -> Option<String> {
        match self {
            LegacySelection::Index(idx) => options.get(*idx).cloned(),
            LegacySelection::Text(text) if is_index(text) => text
                .parse::<usize>()
                .ok()
                .and_then(|idx| options.get(idx).cloned()),
            LegacySelection::Text(text) => Some(text.clone()),
        }
    }
}

fn is_index(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacySubmitRequest {
    #[serde(default)]
    pub answers: Vec<Option<LegacySelection>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyQuizGrade {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub answers: Vec<LegacyAnswer>,
}

/// Questions added by `POST /tasks/{task_id}/quizzes/generate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyQuizBatch {
    pub quizzes: Vec<Question>,
}

/// Task quiz state after `POST /tasks/{task_id}/quizzes/retry`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyQuizReset {
    pub id: String,
    pub quizzes: Vec<Question>,
    pub quiz_results: Vec<LegacyQuizResultView>,
}

/// Subtask as sent by clients in `update-subtasks`; ids are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskDraft {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `PATCH /tasks` body, dispatched on `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TaskPatch {
    ToggleTaskDone {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    UpdateTask {
        #[serde(rename = "taskId")]
        task_id: String,
        completed: bool,
    },
    UpdateSubtasks {
        #[serde(rename = "taskId")]
        task_id: String,
        subtasks: Vec<SubtaskDraft>,
    },
}

impl TaskPatch {
    pub fn task_id(&self) -> &str {
        match self {
            TaskPatch::ToggleTaskDone { task_id }
            | TaskPatch::UpdateTask { task_id, .. }
            | TaskPatch::UpdateSubtasks { task_id, .. } => task_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub quizzes: Vec<Question>,
    #[serde(default)]
    pub quiz_results: Vec<LegacyQuizResultView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyQuizResultView {
    pub score: f64,
    pub answers: Vec<LegacyAnswer>,
    pub taken_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        TaskResponse {
            id: task.id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            subtasks: task.subtasks,
            quizzes: task.quizzes,
            quiz_results: task
                .quiz_results
                .into_iter()
                .map(|r| LegacyQuizResultView {
                    score: r.score,
                    answers: r.answers,
                    taken_at: r.taken_at,
                })
                .collect(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteTaskResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskResponse>,
}
