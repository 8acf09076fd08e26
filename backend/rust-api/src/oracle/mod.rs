//! Content oracle: the external ML text-generation service and the shapes it
//! may answer with. Every capability can fail; callers fall back to the fixed
//! templates at the bottom of this module.

pub mod http;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::quiz::Question;
use crate::models::user::ChatMessage;

pub use http::HttpOracle;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request timed out")]
    Timeout,

    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unrecognized oracle response: {0}")]
    Decode(String),

    #[error("oracle returned no content")]
    Empty,
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OracleError::Timeout
        } else if err.is_decode() {
            OracleError::Decode(err.to_string())
        } else {
            OracleError::Transport(err.to_string())
        }
    }
}

impl OracleError {
    /// Short label used for the oracle metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Timeout => "timeout",
            OracleError::Transport(_) => "transport",
            OracleError::Status { .. } => "status",
            OracleError::Decode(_) => "decode",
            OracleError::Empty => "empty",
        }
    }
}

#[async_trait]
pub trait ContentOracle: Send + Sync {
    /// Free-text analysis of a task; yields subtasks or keywords.
    async fn analyze(&self, text: &str) -> Result<AnalyzeResponse, OracleError>;

    async fn subtasks(&self, title: &str, description: &str) -> Result<Vec<SubtaskSuggestion>, OracleError>;

    async fn quiz(&self, topic: &str, description: &str) -> Result<Vec<RawQuestion>, OracleError>;

    async fn roadmap(&self, prompt: &str) -> Result<RoadmapPayload, OracleError>;

    async fn tutor(&self, history: &[ChatMessage]) -> Result<String, OracleError>;

    async fn recommend(&self, query: &str) -> Result<Vec<Resource>, OracleError>;
}

/// Subtask entry as the oracle sends it: either a bare string or `{title}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubtaskSuggestion {
    Title(String),
    Item { title: String },
}

impl SubtaskSuggestion {
    pub fn title(&self) -> &str {
        match self {
            SubtaskSuggestion::Title(title) | SubtaskSuggestion::Item { title } => title,
        }
    }
}

impl From<&str> for SubtaskSuggestion {
    fn from(title: &str) -> Self {
        SubtaskSuggestion::Title(title.to_string())
    }
}

/// Trimmed, non-blank titles in order.
pub fn suggestion_titles(suggestions: &[SubtaskSuggestion]) -> Vec<String> {
    suggestions
        .iter()
        .map(|s| s.title().trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

const MAX_KEYWORD_SUBTASKS: usize = 6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub subtasks: Vec<SubtaskSuggestion>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl AnalyzeResponse {
    /// Subtask titles if any were suggested, otherwise `Study <keyword>` for
    /// the first few keywords.
    pub fn subtask_titles(&self) -> Vec<String> {
        let titles = suggestion_titles(&self.subtasks);
        if !titles.is_empty() {
            return titles;
        }
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .take(MAX_KEYWORD_SUBTASKS)
            .map(|k| format!("Study {}", k))
            .collect()
    }
}

/// Question as generated; the answer may arrive under `answer` instead of
/// `correctAnswer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(rename = "correctAnswer", default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl RawQuestion {
    pub fn normalize(self) -> Question {
        let correct_answer = self
            .correct_answer
            .filter(|a| !a.is_empty())
            .or(self.answer)
            .unwrap_or_default();
        Question {
            question: self.question,
            options: self.options.unwrap_or_default(),
            correct_answer,
        }
    }
}

const MIN_OPTIONS: usize = 2;

/// Normalizes generated questions and keeps only gradable ones: non-blank
/// text, at least two options and a non-empty correct answer.
pub fn gradable_questions(raw: Vec<RawQuestion>) -> Vec<Question> {
    raw.into_iter()
        .map(RawQuestion::normalize)
        .filter(|q| {
            !q.question.trim().is_empty()
                && q.options.len() >= MIN_OPTIONS
                && !q.correct_answer.is_empty()
        })
        .collect()
}

/// The roadmap capability answers in several shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoadmapPayload {
    /// `[...]` or `{"roadmap": [...]}`
    Steps(Vec<String>),
    /// `{"roadmap": {"roadmap": [...]}}`
    Nested(Vec<String>),
    /// A bare string, one step per line.
    Lines(String),
    /// `{"text": "..."}`, one step per line.
    Text(String),
}

lazy_static! {
    static ref LIST_MARKER: Regex = Regex::new(r"^(?:\d+[.)]|[-*•])\s+").expect("valid list marker regex");
}

impl RoadmapPayload {
    /// Classifies a raw response. `None` for any shape not listed above.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(RoadmapPayload::Steps(string_items(items))),
            Value::String(text) => Some(RoadmapPayload::Lines(text)),
            Value::Object(mut map) => match map.remove("roadmap") {
                Some(Value::Array(items)) => Some(RoadmapPayload::Steps(string_items(items))),
                Some(Value::Object(mut inner)) => match inner.remove("roadmap") {
                    Some(Value::Array(items)) => Some(RoadmapPayload::Nested(string_items(items))),
                    _ => None,
                },
                Some(Value::String(text)) => Some(RoadmapPayload::Lines(text)),
                Some(_) => None,
                None => match map.remove("text") {
                    Some(Value::String(text)) => Some(RoadmapPayload::Text(text)),
                    _ => None,
                },
            },
            _ => None,
        }
    }

    /// Trimmed, non-empty steps. List markers are stripped from text shapes.
    pub fn normalize(self) -> Vec<String> {
        match self {
            RoadmapPayload::Steps(steps) | RoadmapPayload::Nested(steps) => steps
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            RoadmapPayload::Lines(text) | RoadmapPayload::Text(text) => text
                .lines()
                .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

fn string_items(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_or_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

// Fallbacks used whenever the oracle fails or returns nothing usable.

pub fn fallback_subtasks(title: &str) -> Vec<String> {
    vec![
        format!("Understand {}", title),
        format!("Review examples for {}", title),
        format!("Practice {} problems", title),
    ]
}

pub fn fallback_quiz(title: &str) -> Vec<Question> {
    vec![
        Question::new(
            format!("What is \"{}\" mainly about?", title),
            &["Syntax", "Semantics", "Logic", "Compilation"],
            "Syntax",
        ),
        Question::new(
            format!("Which concept is most important in \"{}\"?", title),
            &["Loops", "Data Types", "Functions", "Pointers"],
            "Functions",
        ),
    ]
}

pub const IMPROVEMENT_FALLBACK: [&str; 5] = [
    "Review the fundamentals again",
    "Practice exercises on weak areas",
    "Revisit tutorials or videos",
    "Attempt small coding problems",
    "Retake the quiz after practice",
];

pub const ROADMAP_FALLBACK: [&str; 5] = [
    "Understand fundamentals",
    "Review tutorials",
    "Practice coding problems",
    "Take quizzes",
    "Advance to next level",
];

pub const TUTOR_FALLBACK: &str = "I couldn't reach the tutor right now. Try reviewing examples and running small tests.";

pub fn fallback_resources() -> Vec<Resource> {
    vec![Resource {
        kind: "web".to_string(),
        title: "Sample: Read algorithm article".to_string(),
        url: "https://example.com/article".to_string(),
        channel_or_source: None,
        quality_score: None,
        relevance_score: None,
    }]
}

pub fn steps_from(template: &[&str]) -> Vec<String> {
    template.iter().map(|s| s.to_string()).collect()
}
