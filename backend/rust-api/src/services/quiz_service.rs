use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::{self, source_label, track_oracle_call};
use crate::models::quiz::{
    AnswerDetail, Attempt, AttemptView, HistoryEntry, Question, Quiz, QuizDetail, QuizHistoryPage,
    SubmitResult,
};
use crate::models::task::Task;
use crate::oracle::{fallback_quiz, gradable_questions, steps_from, ContentOracle, IMPROVEMENT_FALLBACK};
use crate::store::DocumentStore;

pub const UNTITLED_TASK: &str = "Untitled Task";
pub const MAX_HISTORY_LIMIT: u32 = 50;

pub struct QuizService {
    store: Arc<dyn DocumentStore>,
    oracle: Arc<dyn ContentOracle>,
    default_page_size: u32,
}

impl QuizService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        oracle: Arc<dyn ContentOracle>,
        default_page_size: u32,
    ) -> Self {
        Self {
            store,
            oracle,
            default_page_size,
        }
    }

    async fn owned_task(&self, user_id: &str, task_id: &str) -> Result<Task, AppError> {
        self.store
            .find_task(user_id, task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task not found"))
    }

    /// Always creates a new quiz for the task.
    pub async fn generate(&self, user_id: &str, task_id: &str) -> Result<Quiz, AppError> {
        let task = self.owned_task(user_id, task_id).await?;
        self.generate_for(user_id, &task).await
    }

    async fn generate_for(&self, user_id: &str, task: &Task) -> Result<Quiz, AppError> {
        let generated = match track_oracle_call("quiz", self.oracle.quiz(&task.title, &task.description)).await {
            Ok(raw) => gradable_questions(raw),
            Err(e) => {
                tracing::warn!("Quiz generation failed for task {}: {}", task.id, e);
                Vec::new()
            }
        };

        let from_oracle = !generated.is_empty();
        let questions = if from_oracle {
            generated
        } else {
            tracing::warn!("Using fallback quiz for task {}", task.id);
            fallback_quiz(&task.title)
        };

        let quiz = Quiz::new(user_id, task.id.clone(), questions);
        self.store.insert_quiz(&quiz).await?;
        metrics::QUIZZES_GENERATED_TOTAL
            .with_label_values(&[source_label(from_oracle)])
            .inc();

        tracing::info!(
            "Generated quiz {} ({} questions) for task {}",
            quiz.id,
            quiz.questions.len(),
            task.id
        );
        Ok(quiz)
    }

    /// Returns the latest quiz for the task untouched, generating one only if
    /// none exists yet.
    pub async fn retry(&self, user_id: &str, task_id: &str) -> Result<Quiz, AppError> {
        let task = self.owned_task(user_id, task_id).await?;
        match self.store.latest_quiz_for_task(user_id, &task.id).await? {
            Some(quiz) => {
                tracing::info!("Reusing quiz {} for task {}", quiz.id, task.id);
                Ok(quiz)
            }
            None => self.generate_for(user_id, &task).await,
        }
    }

    pub async fn submit(
        &self,
        user_id: &str,
        quiz_id: &str,
        answers: Option<Vec<String>>,
    ) -> Result<SubmitResult, AppError> {
        let answers = answers.ok_or_else(|| AppError::validation("Answers are required"))?;
        let quiz = self
            .store
            .find_quiz(user_id, quiz_id)
            .await?
            .ok_or_else(|| AppError::not_found("Quiz not found"))?;

        let (details, score) = score_answers(&quiz.questions, &answers);
        let total = quiz.questions.len() as u32;
        let attempt = Attempt::new(score, details.clone());

        if !self.store.append_attempt(user_id, &quiz.id, &attempt).await? {
            return Err(AppError::not_found("Quiz not found"));
        }
        let result_label = if score == total { "perfect" } else { "partial" };
        metrics::QUIZ_ATTEMPTS_TOTAL
            .with_label_values(&[result_label])
            .inc();
        tracing::info!("Quiz {} attempt {} scored {}/{}", quiz.id, attempt.id, score, total);

        let task_title = self
            .store
            .find_task(user_id, &quiz.task_id)
            .await?
            .map(|t| t.title)
            .unwrap_or_else(|| UNTITLED_TASK.to_string());
        let wrong: Vec<&str> = details
            .iter()
            .filter(|d| !d.is_correct)
            .map(|d| d.question.as_str())
            .collect();
        let prompt = improvement_prompt(&task_title, score, total, &wrong);
        let roadmap = self.improvement_roadmap(&prompt).await;

        Ok(SubmitResult {
            attempt_id: attempt.id,
            score,
            total,
            answers: details,
            roadmap,
        })
    }

    async fn improvement_roadmap(&self, prompt: &str) -> Vec<String> {
        let steps = match track_oracle_call("roadmap", self.oracle.roadmap(prompt)).await {
            Ok(payload) => payload.normalize(),
            Err(e) => {
                tracing::warn!("Improvement roadmap failed: {}", e);
                Vec::new()
            }
        };
        if steps.is_empty() {
            steps_from(&IMPROVEMENT_FALLBACK)
        } else {
            steps
        }
    }

    pub async fn get_by_id(&self, user_id: &str, quiz_id: &str) -> Result<QuizDetail, AppError> {
        let quiz = self
            .store
            .find_quiz(user_id, quiz_id)
            .await?
            .ok_or_else(|| AppError::not_found("Quiz not found"))?;

        let task_title = self
            .store
            .find_task(user_id, &quiz.task_id)
            .await?
            .map(|t| t.title)
            .unwrap_or_else(|| UNTITLED_TASK.to_string());

        Ok(QuizDetail {
            id: quiz.id,
            task_id: quiz.task_id,
            task_title,
            questions: quiz.questions,
            attempts: quiz.attempts.into_iter().map(AttemptView::from).collect(),
        })
    }

    pub async fn history(
        &self,
        user_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<QuizHistoryPage, AppError> {
        let quizzes = self.store.list_quizzes(user_id).await?;
        let titles: HashMap<String, String> = self
            .store
            .list_tasks(user_id)
            .await?
            .into_iter()
            .map(|t| (t.id, t.title))
            .collect();

        let entries = build_history(quizzes, &titles);
        let limit = limit
            .unwrap_or(self.default_page_size)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(paginate(entries, page.unwrap_or(1), limit))
    }
}

/// Exact, case-sensitive comparison per question index. Missing answers count
/// as empty strings.
pub fn score_answers(questions: &[Question], answers: &[String]) -> (Vec<AnswerDetail>, u32) {
    let details: Vec<AnswerDetail> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let submitted = answers.get(i).cloned().unwrap_or_default();
            let is_correct = submitted == q.correct_answer;
            AnswerDetail {
                question: q.question.clone(),
                submitted,
                correct_answer: q.correct_answer.clone(),
                is_correct,
            }
        })
        .collect();
    let score = details.iter().filter(|d| d.is_correct).count() as u32;
    (details, score)
}

pub fn improvement_prompt(title: &str, score: u32, total: u32, wrong: &[&str]) -> String {
    let wrong = if wrong.is_empty() {
        "None".to_string()
    } else {
        wrong.join(", ")
    };
    format!(
        "The user attempted a quiz on \"{}\" and scored {}/{}.\nWrong topics: {}.\nGenerate a short 5-step improvement roadmap focusing on weak areas.",
        title, score, total, wrong
    )
}

/// Every attempt of every quiz, newest first.
pub fn build_history(quizzes: Vec<Quiz>, titles: &HashMap<String, String>) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = quizzes
        .into_iter()
        .flat_map(|quiz| {
            let task_title = titles
                .get(&quiz.task_id)
                .cloned()
                .unwrap_or_else(|| UNTITLED_TASK.to_string());
            let Quiz {
                id: quiz_id,
                task_id,
                questions,
                attempts,
                ..
            } = quiz;
            attempts.into_iter().map(move |attempt| HistoryEntry {
                id: attempt.id,
                quiz_id: quiz_id.clone(),
                date: attempt.date,
                score: attempt.score,
                task_id: task_id.clone(),
                task_title: task_title.clone(),
                questions: questions.clone(),
                answers: attempt.answers,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

/// 1-indexed; pages past the end come back empty.
pub fn paginate(entries: Vec<HistoryEntry>, page: u32, limit: u32) -> QuizHistoryPage {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = entries.len() as u32;
    let total_pages = total.div_ceil(limit).max(1);
    let skip = ((page - 1) as usize).saturating_mul(limit as usize);

    QuizHistoryPage {
        attempts: entries
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect(),
        page,
        total_pages,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn questions() -> Vec<Question> {
        vec![
            Question::new("2+2?", &["3", "4"], "4"),
            Question::new("Capital of France?", &["Paris", "Rome"], "Paris"),
        ]
    }

    #[test]
    fn exact_answers_score_full_marks() {
        let (details, score) = score_answers(&questions(), &["4".to_string(), "Paris".to_string()]);
        assert_eq!(score, 2);
        assert!(details.iter().all(|d| d.is_correct));
    }

    #[test]
    fn scoring_is_case_sensitive_and_untrimmed() {
        let (details, score) = score_answers(&questions(), &[" 4".to_string(), "paris".to_string()]);
        assert_eq!(score, 0);
        assert_eq!(details[0].submitted, " 4");
    }

    #[test]
    fn missing_answers_count_as_empty() {
        let (details, score) = score_answers(&questions(), &["4".to_string()]);
        assert_eq!(score, 1);
        assert_eq!(details[1].submitted, "");
        assert!(!details[1].is_correct);
    }

    #[test]
    fn prompt_lists_wrong_topics_or_none() {
        let prompt = improvement_prompt("Rust", 1, 2, &["Capital of France?"]);
        assert!(prompt.contains("\"Rust\" and scored 1/2"));
        assert!(prompt.contains("Wrong topics: Capital of France?."));

        let prompt = improvement_prompt("Rust", 2, 2, &[]);
        assert!(prompt.contains("Wrong topics: None."));
    }

    fn quiz_with_attempts(task_id: &str, count: usize) -> Quiz {
        let mut quiz = Quiz::new("u1", task_id, questions());
        let base = Utc::now();
        for i in 0..count {
            let mut attempt = Attempt::new(i as u32, Vec::new());
            attempt.date = base + Duration::seconds(i as i64);
            quiz.attempts.push(attempt);
        }
        quiz
    }

    #[test]
    fn history_is_flattened_newest_first() {
        let mut titles = HashMap::new();
        titles.insert("t1".to_string(), "Rust".to_string());
        let entries = build_history(
            vec![quiz_with_attempts("t1", 3), quiz_with_attempts("gone", 2)],
            &titles,
        );

        assert_eq!(entries.len(), 5);
        assert!(entries.windows(2).all(|w| w[0].date >= w[1].date));
        assert!(entries.iter().any(|e| e.task_title == UNTITLED_TASK));
        assert!(entries.iter().any(|e| e.task_title == "Rust"));
    }

    #[test]
    fn pagination_of_twelve_by_five() {
        let entries = build_history(vec![quiz_with_attempts("t1", 12)], &HashMap::new());

        let page = paginate(entries.clone(), 3, 5);
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.attempts.len(), 2);

        let past_end = paginate(entries.clone(), 9, 5);
        assert!(past_end.attempts.is_empty());

        let first = paginate(entries, 0, 5);
        assert_eq!(first.page, 1);
        assert_eq!(first.attempts.len(), 5);
    }

    #[test]
    fn empty_history_has_one_page() {
        let page = paginate(Vec::new(), 1, 5);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total, 0);
    }
}
