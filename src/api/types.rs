//! Backend resource types.
//!
//! These round-trip through JSON twice: once off the wire and once through
//! the response cache, so every type is both `Serialize` and `Deserialize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Courses and materials
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: String,
  pub code: String,
  pub title: String,
  pub instructor_id: String,
  #[serde(default)]
  pub term: Option<String>,
}

/// OCR/ingestion state of an uploaded material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
  Pending,
  Processing,
  Ready,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
  pub id: String,
  pub course_id: String,
  pub filename: String,
  pub status: MaterialStatus,
  #[serde(default)]
  pub pages: Option<u32>,
  pub uploaded_at: DateTime<Utc>,
}

// ============================================================================
// Exams and questions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
  Draft,
  Published,
  Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
  pub id: String,
  pub course_id: String,
  pub title: String,
  pub status: ExamStatus,
  #[serde(default)]
  pub question_count: u32,
  #[serde(default)]
  pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  MultipleChoice,
  ShortAnswer,
  Essay,
}

impl QuestionKind {
  pub fn parse(s: &str) -> Option<Self> {
    match s.to_lowercase().as_str() {
      "mc" | "multiple_choice" | "multiple-choice" => Some(Self::MultipleChoice),
      "short" | "short_answer" | "short-answer" => Some(Self::ShortAnswer),
      "essay" => Some(Self::Essay),
      _ => None,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::MultipleChoice => "multiple choice",
      Self::ShortAnswer => "short answer",
      Self::Essay => "essay",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub exam_id: String,
  pub kind: QuestionKind,
  pub prompt: String,
  #[serde(default)]
  pub choices: Vec<String>,
  pub points: f32,
}

// ============================================================================
// Submissions, grades and appeals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub id: String,
  pub exam_id: String,
  pub student_id: String,
  pub submitted_at: DateTime<Utc>,
  #[serde(default)]
  pub graded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
  pub id: String,
  pub submission_id: String,
  pub exam_id: String,
  pub student_id: String,
  pub score: f32,
  pub max_score: f32,
  #[serde(default)]
  pub feedback: Option<String>,
  pub graded_at: DateTime<Utc>,
}

impl Grade {
  /// Score as a percentage of the maximum, 0 when the maximum is 0.
  pub fn percent(&self) -> f32 {
    if self.max_score <= 0.0 {
      0.0
    } else {
      self.score / self.max_score * 100.0
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
  Pending,
  Accepted,
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appeal {
  pub id: String,
  pub grade_id: String,
  pub student_id: String,
  pub reason: String,
  pub status: AppealStatus,
  #[serde(default)]
  pub response: Option<String>,
  pub created_at: DateTime<Utc>,
}

// ============================================================================
// Analytics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStat {
  pub question_id: String,
  /// Fraction of submissions that earned full points, 0.0 - 1.0
  pub correct_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamAnalytics {
  pub exam_id: String,
  pub submissions: u32,
  pub mean: f32,
  pub median: f32,
  pub std_dev: f32,
  pub highest: f32,
  pub lowest: f32,
  #[serde(default)]
  pub questions: Vec<QuestionStat>,
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GenerateQuestionsRequest {
  pub count: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kind: Option<QuestionKind>,
  /// Restrict generation to these materials; empty means the whole course
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub material_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeRequest {
  /// Let the backend grade with its model instead of a manual score
  pub use_ai: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppealRequest {
  pub grade_id: String,
  pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveAppealRequest {
  pub accept: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response: Option<String>,
}

/// Error body returned by the backend on failure
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub detail: String,
}

// ============================================================================
// Aggregates
// ============================================================================

/// One course with the exams loaded for it.
#[derive(Debug)]
pub struct CourseOverview {
  pub course: Course,
  /// Error text if this course's exams failed to load
  pub exams: Result<Vec<Exam>, String>,
}

/// Everything the landing view shows.
#[derive(Debug)]
pub struct Dashboard {
  pub courses: Vec<CourseOverview>,
  pub grades: Vec<Grade>,
}
