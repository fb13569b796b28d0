//! Plain-text rendering for shell output.

use crate::api::types::{
  Appeal, AppealStatus, Course, Dashboard, Exam, ExamAnalytics, ExamStatus, Grade, Material, MaterialStatus,
  Question, Submission,
};
use crate::cache::CacheStats;

const MAX_CELL: usize = 48;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Extract the host from the backend URL for the banner
pub fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

/// Left-aligned columns sized to their widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
  if rows.is_empty() {
    return "(none)\n".to_string();
  }

  let rows: Vec<Vec<String>> = rows
    .iter()
    .map(|row| row.iter().map(|cell| truncate(cell, MAX_CELL)).collect())
    .collect();

  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in &rows {
    for (i, cell) in row.iter().enumerate().take(widths.len()) {
      widths[i] = widths[i].max(cell.chars().count());
    }
  }

  let line = |cells: Vec<&str>| -> String {
    let padded: Vec<String> = cells
      .iter()
      .zip(&widths)
      .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
      .collect();
    format!("{}\n", padded.join("  ").trim_end())
  };

  let mut out = line(headers.to_vec());
  let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
  out.push_str(&line(rules.iter().map(String::as_str).collect()));
  for row in &rows {
    out.push_str(&line(row.iter().map(String::as_str).collect()));
  }
  out
}

pub fn courses(courses: &[Course]) -> String {
  let rows: Vec<Vec<String>> = courses
    .iter()
    .map(|c| {
      vec![
        c.id.clone(),
        c.code.clone(),
        c.title.clone(),
        c.term.clone().unwrap_or_default(),
      ]
    })
    .collect();
  table(&["ID", "CODE", "TITLE", "TERM"], &rows)
}

fn material_status(status: MaterialStatus) -> &'static str {
  match status {
    MaterialStatus::Pending => "pending",
    MaterialStatus::Processing => "processing",
    MaterialStatus::Ready => "ready",
    MaterialStatus::Failed => "failed",
  }
}

pub fn materials(materials: &[Material]) -> String {
  let rows: Vec<Vec<String>> = materials
    .iter()
    .map(|m| {
      vec![
        m.id.clone(),
        m.filename.clone(),
        material_status(m.status).to_string(),
        m.pages.map(|p| p.to_string()).unwrap_or_default(),
        m.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
      ]
    })
    .collect();
  table(&["ID", "FILE", "STATUS", "PAGES", "UPLOADED"], &rows)
}

fn exam_status(status: ExamStatus) -> &'static str {
  match status {
    ExamStatus::Draft => "draft",
    ExamStatus::Published => "published",
    ExamStatus::Closed => "closed",
  }
}

pub fn exams(exams: &[Exam]) -> String {
  let rows: Vec<Vec<String>> = exams
    .iter()
    .map(|e| {
      vec![
        e.id.clone(),
        e.title.clone(),
        exam_status(e.status).to_string(),
        e.question_count.to_string(),
        e.due_at
          .map(|d| d.format("%Y-%m-%d").to_string())
          .unwrap_or_default(),
      ]
    })
    .collect();
  table(&["ID", "TITLE", "STATUS", "QUESTIONS", "DUE"], &rows)
}

pub fn questions(questions: &[Question]) -> String {
  if questions.is_empty() {
    return "(none)\n".to_string();
  }

  let mut out = String::new();
  for (n, q) in questions.iter().enumerate() {
    out.push_str(&format!(
      "{}. [{}, {} pts] {}\n",
      n + 1,
      q.kind.label(),
      q.points,
      q.prompt
    ));
    for (i, choice) in q.choices.iter().enumerate() {
      let letter = (b'a' + (i % 26) as u8) as char;
      out.push_str(&format!("   {}) {}\n", letter, choice));
    }
  }
  out
}

pub fn submissions(submissions: &[Submission]) -> String {
  let rows: Vec<Vec<String>> = submissions
    .iter()
    .map(|s| {
      vec![
        s.id.clone(),
        s.student_id.clone(),
        s.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
        if s.graded { "yes" } else { "no" }.to_string(),
      ]
    })
    .collect();
  table(&["ID", "STUDENT", "SUBMITTED", "GRADED"], &rows)
}

pub fn grades(grades: &[Grade]) -> String {
  let rows: Vec<Vec<String>> = grades
    .iter()
    .map(|g| {
      vec![
        g.id.clone(),
        g.exam_id.clone(),
        g.student_id.clone(),
        format!("{}/{}", g.score, g.max_score),
        format!("{:.1}%", g.percent()),
        g.feedback.clone().unwrap_or_default(),
      ]
    })
    .collect();
  table(&["ID", "EXAM", "STUDENT", "SCORE", "PCT", "FEEDBACK"], &rows)
}

fn appeal_status(status: AppealStatus) -> &'static str {
  match status {
    AppealStatus::Pending => "pending",
    AppealStatus::Accepted => "accepted",
    AppealStatus::Rejected => "rejected",
  }
}

pub fn appeals(appeals: &[Appeal]) -> String {
  let rows: Vec<Vec<String>> = appeals
    .iter()
    .map(|a| {
      vec![
        a.id.clone(),
        a.grade_id.clone(),
        appeal_status(a.status).to_string(),
        a.reason.clone(),
        a.response.clone().unwrap_or_default(),
      ]
    })
    .collect();
  table(&["ID", "GRADE", "STATUS", "REASON", "RESPONSE"], &rows)
}

pub fn appeal(appeal: &Appeal) -> String {
  format!(
    "Appeal {} on grade {} is {}\n",
    appeal.id,
    appeal.grade_id,
    appeal_status(appeal.status)
  )
}

pub fn analytics(analytics: &ExamAnalytics) -> String {
  let mut out = format!(
    "Exam {}: {} submissions\n  mean {:.1}  median {:.1}  std dev {:.1}  range {:.1} - {:.1}\n",
    analytics.exam_id,
    analytics.submissions,
    analytics.mean,
    analytics.median,
    analytics.std_dev,
    analytics.lowest,
    analytics.highest
  );
  if !analytics.questions.is_empty() {
    let rows: Vec<Vec<String>> = analytics
      .questions
      .iter()
      .map(|q| vec![q.question_id.clone(), format!("{:.0}%", q.correct_rate * 100.0)])
      .collect();
    out.push_str(&table(&["QUESTION", "CORRECT"], &rows));
  }
  out
}

pub fn dashboard(dashboard: &Dashboard) -> String {
  let mut out = String::new();
  for overview in &dashboard.courses {
    out.push_str(&format!("{} {}\n", overview.course.code, overview.course.title));
    match &overview.exams {
      Ok(exams) if exams.is_empty() => out.push_str("  no exams\n"),
      Ok(exams) => {
        for exam in exams {
          out.push_str(&format!("  {} {} ({})\n", exam.id, exam.title, exam_status(exam.status)));
        }
      }
      Err(e) => out.push_str(&format!("  exams unavailable: {}\n", e)),
    }
  }
  if dashboard.courses.is_empty() {
    out.push_str("No courses.\n");
  }
  out.push_str(&format!("\nRecent grades ({})\n", dashboard.grades.len()));
  out.push_str(&grades(&dashboard.grades));
  out
}

pub fn cache_stats(stats: &CacheStats) -> String {
  let mut out = format!("{} cached responses (hit rate not tracked)\n", stats.size);
  for key in &stats.keys {
    out.push_str(&format!("  {}\n", truncate(key, 100)));
  }
  out
}
