//! Backend paths and the cache entries each write makes stale.

pub const COURSES: &str = "/courses";
pub const GRADES: &str = "/grades";
pub const APPEALS: &str = "/appeals";

pub fn course_materials(course_id: &str) -> String {
  format!("/courses/{}/materials", course_id)
}

pub fn course_exams(course_id: &str) -> String {
  format!("/courses/{}/exams", course_id)
}

pub fn exam_questions(exam_id: &str) -> String {
  format!("/exams/{}/questions", exam_id)
}

pub fn generate_questions(exam_id: &str) -> String {
  format!("/exams/{}/questions/generate", exam_id)
}

pub fn exam_submissions(exam_id: &str) -> String {
  format!("/exams/{}/submissions", exam_id)
}

pub fn exam_analytics(exam_id: &str) -> String {
  format!("/exams/{}/analytics", exam_id)
}

pub fn grade_submission(submission_id: &str) -> String {
  format!("/submissions/{}/grade", submission_id)
}

pub fn resolve_appeal(appeal_id: &str) -> String {
  format!("/appeals/{}/resolve", appeal_id)
}

/// Writes the client performs against the backend.
#[derive(Clone, Debug)]
pub enum Mutation {
  /// New material added to a course
  UploadMaterial { course_id: String },
  /// Questions generated into an exam
  GenerateQuestions { exam_id: String },
  /// A submission of this exam received a grade
  GradeSubmission { exam_id: String },
  /// A student filed an appeal
  SubmitAppeal,
  /// An instructor accepted or rejected an appeal
  ResolveAppeal,
}

impl Mutation {
  /// Substring patterns whose cache entries this write makes stale.
  pub fn invalidates(&self) -> Vec<String> {
    match self {
      Self::UploadMaterial { course_id } => vec![course_materials(course_id)],
      Self::GenerateQuestions { exam_id } => vec![exam_questions(exam_id), course_exams_marker()],
      Self::GradeSubmission { exam_id } => vec![
        exam_submissions(exam_id),
        exam_analytics(exam_id),
        GRADES.to_string(),
      ],
      Self::SubmitAppeal => vec![APPEALS.to_string(), GRADES.to_string()],
      Self::ResolveAppeal => vec![APPEALS.to_string(), GRADES.to_string()],
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::UploadMaterial { course_id } => format!("upload to course {}", course_id),
      Self::GenerateQuestions { exam_id } => format!("generate questions for exam {}", exam_id),
      Self::GradeSubmission { exam_id } => format!("grade submission of exam {}", exam_id),
      Self::SubmitAppeal => "submit appeal".to_string(),
      Self::ResolveAppeal => "resolve appeal".to_string(),
    }
  }
}

/// Matches every course's exam listing. Generating questions changes an
/// exam's question count, and the owning course is not known from the exam id.
fn course_exams_marker() -> String {
  "/exams:".to_string()
}
