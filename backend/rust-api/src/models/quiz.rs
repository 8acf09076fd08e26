use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{bson_datetime_as_chrono, bson_datetime_as_chrono_option, new_id};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer", default)]
    pub correct_answer: String,
}

impl Question {
    pub fn new(question: impl Into<String>, options: &[&str], correct_answer: &str) -> Self {
        Self {
            question: question.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct_answer.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerDetail {
    pub question: String,
    pub submitted: String,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
}

/// One scored submission. Appended to the quiz, never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
    pub id: String,
    #[serde(with = "bson_datetime_as_chrono")]
    pub date: DateTime<Utc>,
    pub score: u32,
    #[serde(default)]
    pub answers: Vec<AnswerDetail>,
}

impl Attempt {
    pub fn new(score: u32, answers: Vec<AnswerDetail>) -> Self {
        Self {
            id: new_id(),
            date: Utc::now(),
            score,
            answers,
        }
    }
}

/// Quiz stored in MongoDB "quizzes" collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "taskId")]
    pub task_id: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Score of the most recent attempt (last write wins).
    #[serde(default)]
    pub score: u32,
    #[serde(
        rename = "lastAttempt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    pub fn new(user_id: impl Into<String>, task_id: impl Into<String>, questions: Vec<Question>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            user_id: user_id.into(),
            task_id: task_id.into(),
            questions,
            score: 0,
            last_attempt: None,
            attempts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Records an attempt in memory the same way the store's append does.
    pub fn record_attempt(&mut self, attempt: Attempt) {
        self.score = attempt.score;
        self.last_attempt = Some(attempt.date);
        self.updated_at = attempt.date;
        self.attempts.push(attempt);
    }
}

/// `POST /quiz` body, dispatched on `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum QuizAction {
    Generate {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    Submit {
        #[serde(rename = "quizId")]
        quiz_id: String,
        #[serde(default)]
        answers: Option<Vec<String>>,
    },
    Retry {
        #[serde(rename = "taskId")]
        task_id: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: String,
    pub date: DateTime<Utc>,
    pub score: u32,
    pub answers: Vec<AnswerDetail>,
}

impl From<Attempt> for AttemptView {
    fn from(attempt: Attempt) -> Self {
        AttemptView {
            id: attempt.id,
            date: attempt.date,
            score: attempt.score,
            answers: attempt.answers,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: String,
    pub task_id: String,
    pub questions: Vec<Question>,
    pub score: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub attempts: Vec<AttemptView>,
    pub created_at: DateTime<Utc>,
}

impl From<Quiz> for QuizResponse {
    fn from(quiz: Quiz) -> Self {
        QuizResponse {
            id: quiz.id,
            task_id: quiz.task_id,
            questions: quiz.questions,
            score: quiz.score,
            last_attempt: quiz.last_attempt,
            attempts: quiz.attempts.into_iter().map(AttemptView::from).collect(),
            created_at: quiz.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    pub id: String,
    pub task_id: String,
    pub task_title: String,
    pub questions: Vec<Question>,
    pub attempts: Vec<AttemptView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub quiz_id: String,
    pub date: DateTime<Utc>,
    pub score: u32,
    pub task_id: String,
    pub task_title: String,
    pub questions: Vec<Question>,
    pub answers: Vec<AnswerDetail>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizHistoryPage {
    pub attempts: Vec<HistoryEntry>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub attempt_id: String,
    pub score: u32,
    pub total: u32,
    pub answers: Vec<AnswerDetail>,
    pub roadmap: Vec<String>,
}
