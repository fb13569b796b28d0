//! Cached backend client that wraps ExamClient with the response cache.

use color_eyre::{Report, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use tracing::info;

use crate::cache::{
  batch_api_requests, cached_api_request, get_cache_stats, invalidate_cache, prefetch_data, ApiCache,
  CacheStats, PrefetchConfig, RequestOptions,
};
use crate::config::{CacheConfig, Config};

use super::client::ExamClient;
use super::endpoints::{self, Mutation};
use super::types::{
  Appeal, AppealRequest, Course, CourseOverview, Dashboard, Exam, ExamAnalytics, GenerateQuestionsRequest,
  Grade, GradeRequest, Material, Question, ResolveAppealRequest, Submission,
};

/// Backend client with transparent response caching.
///
/// Reads go through the shared [`ApiCache`]; writes go straight to the
/// backend and then drop whatever cached listings they made stale.
#[derive(Clone)]
pub struct CachedExamClient {
  inner: ExamClient,
  cache: ApiCache,
  settings: CacheConfig,
}

impl CachedExamClient {
  /// Create a cached client around `cache`, which the caller owns and may share.
  pub fn new(config: &Config, cache: ApiCache) -> Result<Self> {
    let inner = ExamClient::new(config)?;
    info!(url = %config.backend.url, caching = config.cache.enabled, "Backend client ready");
    Ok(Self::with_parts(inner, cache, config.cache.clone()))
  }

  pub fn with_parts(inner: ExamClient, cache: ApiCache, settings: CacheConfig) -> Self {
    Self { inner, cache, settings }
  }

  pub fn cache(&self) -> &ApiCache {
    &self.cache
  }

  fn options(&self, endpoint: &str) -> RequestOptions {
    let options = RequestOptions::default();
    let options = match self.settings.ttl_for(endpoint) {
      Some(ttl) => options.with_ttl(ttl),
      None => options,
    };
    if self.settings.enabled {
      options
    } else {
      options.no_cache()
    }
  }

  async fn fetch<T, F, Fut>(&self, endpoint: &str, params: &Value, fetcher: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    cached_api_request(&self.cache, fetcher, endpoint, params, &self.options(endpoint)).await
  }

  fn invalidate(&self, mutation: Mutation) {
    let removed: usize = mutation
      .invalidates()
      .iter()
      .map(|pattern| invalidate_cache(&self.cache, pattern))
      .sum();
    info!(mutation = %mutation.description(), removed, "Dropped stale cache entries");
  }

  pub async fn courses(&self) -> Result<Vec<Course>> {
    self
      .fetch(endpoints::COURSES, &no_params(), || self.inner.list_courses())
      .await
  }

  pub async fn materials(&self, course_id: &str) -> Result<Vec<Material>> {
    self
      .fetch(&endpoints::course_materials(course_id), &no_params(), || {
        self.inner.list_materials(course_id)
      })
      .await
  }

  /// Upload material (not cached - write operation).
  pub async fn upload_material(&self, course_id: &str, file: &Path) -> Result<Material> {
    let material = self.inner.upload_material(course_id, file).await?;
    self.invalidate(Mutation::UploadMaterial {
      course_id: course_id.to_string(),
    });
    Ok(material)
  }

  pub async fn exams(&self, course_id: &str) -> Result<Vec<Exam>> {
    self
      .fetch(&endpoints::course_exams(course_id), &no_params(), || {
        self.inner.list_exams(course_id)
      })
      .await
  }

  pub async fn questions(&self, exam_id: &str) -> Result<Vec<Question>> {
    self
      .fetch(&endpoints::exam_questions(exam_id), &no_params(), || {
        self.inner.get_questions(exam_id)
      })
      .await
  }

  /// Generate questions (not cached - write operation).
  pub async fn generate_questions(
    &self,
    exam_id: &str,
    request: &GenerateQuestionsRequest,
  ) -> Result<Vec<Question>> {
    let questions = self.inner.generate_questions(exam_id, request).await?;
    self.invalidate(Mutation::GenerateQuestions {
      exam_id: exam_id.to_string(),
    });
    Ok(questions)
  }

  pub async fn submissions(&self, exam_id: &str) -> Result<Vec<Submission>> {
    self
      .fetch(&endpoints::exam_submissions(exam_id), &no_params(), || {
        self.inner.list_submissions(exam_id)
      })
      .await
  }

  /// Grade a submission (not cached - write operation).
  pub async fn grade_submission(&self, submission_id: &str, request: &GradeRequest) -> Result<Grade> {
    let grade = self.inner.grade_submission(submission_id, request).await?;
    self.invalidate(Mutation::GradeSubmission {
      exam_id: grade.exam_id.clone(),
    });
    Ok(grade)
  }

  pub async fn grades(&self, student_id: Option<&str>) -> Result<Vec<Grade>> {
    self
      .fetch(endpoints::GRADES, &student_params(student_id), || {
        self.inner.list_grades(student_id)
      })
      .await
  }

  pub async fn appeals(&self, student_id: Option<&str>) -> Result<Vec<Appeal>> {
    self
      .fetch(endpoints::APPEALS, &student_params(student_id), || {
        self.inner.list_appeals(student_id)
      })
      .await
  }

  /// File an appeal (not cached - write operation).
  pub async fn submit_appeal(&self, request: &AppealRequest) -> Result<Appeal> {
    let appeal = self.inner.submit_appeal(request).await?;
    self.invalidate(Mutation::SubmitAppeal);
    Ok(appeal)
  }

  /// Accept or reject an appeal (not cached - write operation).
  pub async fn resolve_appeal(&self, appeal_id: &str, request: &ResolveAppealRequest) -> Result<Appeal> {
    let appeal = self.inner.resolve_appeal(appeal_id, request).await?;
    self.invalidate(Mutation::ResolveAppeal);
    Ok(appeal)
  }

  pub async fn analytics(&self, exam_id: &str) -> Result<ExamAnalytics> {
    self
      .fetch(&endpoints::exam_analytics(exam_id), &no_params(), || {
        self.inner.get_analytics(exam_id)
      })
      .await
  }

  /// Load the landing view.
  ///
  /// With caching enabled, courses and grades are warmed together first.
  /// Then every course's exams are loaded in windows of `batch_concurrency`.
  /// A course whose exams fail to load is still listed, with the error.
  pub async fn dashboard(&self, student_id: Option<&str>) -> Result<Dashboard> {
    // Prefetched entries are only read back when caching is on
    if self.settings.enabled {
      let courses_client = self.inner.clone();
      let grades_client = self.inner.clone();
      let grades_student = student_id.map(String::from);

      prefetch_data(
        &self.cache,
        vec![
          PrefetchConfig::new(
            endpoints::COURSES,
            &no_params(),
            self.options(endpoints::COURSES),
            move || async move { courses_client.list_courses().await },
          ),
          PrefetchConfig::new(
            endpoints::GRADES,
            &student_params(student_id),
            self.options(endpoints::GRADES),
            move || async move { grades_client.list_grades(grades_student.as_deref()).await },
          ),
        ],
      )
      .await;
    }

    let courses = self.courses().await?;
    let grades = self.grades(student_id).await?;

    let results = batch_api_requests(
      courses.iter().map(|course| self.exams(&course.id)),
      self.settings.batch_concurrency,
    )
    .await;

    let courses = courses
      .into_iter()
      .zip(results)
      .map(|(course, exams)| CourseOverview {
        course,
        exams: exams.into_result().map_err(|e: Report| e.to_string()),
      })
      .collect();

    Ok(Dashboard { courses, grades })
  }

  /// Drop cached responses matching `pattern` ("*" for all).
  pub fn refresh(&self, pattern: &str) -> usize {
    invalidate_cache(&self.cache, pattern)
  }

  pub fn stats(&self) -> CacheStats {
    get_cache_stats(&self.cache)
  }
}

fn no_params() -> Value {
  json!({})
}

fn student_params(student_id: Option<&str>) -> Value {
  match student_id {
    Some(id) => json!({ "student_id": id }),
    None => json!({}),
  }
}
