use crate::api::endpoints;
use crate::api::types::{
  ApiErrorBody, Appeal, AppealRequest, Course, Exam, ExamAnalytics, GenerateQuestionsRequest, Grade,
  GradeRequest, Material, Question, ResolveAppealRequest, Submission,
};
use crate::config::{BackendConfig, Config};
use color_eyre::{eyre::eyre, Result};
use reqwest::{multipart, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Assessment backend API client
#[derive(Clone)]
pub struct ExamClient {
  http: reqwest::Client,
  base: Url,
  token: String,
}

impl ExamClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    Self::with_token(&config.backend, token)
  }

  pub fn with_token(backend: &BackendConfig, token: String) -> Result<Self> {
    // Url::join drops the last path segment unless the base ends in '/'
    let mut base = backend.url.clone();
    if !base.ends_with('/') {
      base.push('/');
    }
    let base = Url::parse(&base).map_err(|e| eyre!("Invalid backend url {}: {}", backend.url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(backend.timeout_secs))
      .user_agent(concat!("examkit/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base, token })
  }

  /// Resolve an endpoint path against the backend base url
  pub fn url(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path.trim_start_matches('/'))
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
    let url = self.url(path)?;
    debug!("Backend request: {} {}", method, url);
    Ok(self.http.request(method, url).bearer_auth(&self.token))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
    let response = self
      .request(Method::GET, path)?
      .query(query)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach backend for GET {}: {}", path, e))?;
    Self::decode("GET", path, response).await
  }

  async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
    let response = self
      .request(Method::POST, path)?
      .json(body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach backend for POST {}: {}", path, e))?;
    Self::decode("POST", path, response).await
  }

  async fn decode<T: DeserializeOwned>(method: &str, path: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.detail)
        .unwrap_or(body);
      return Err(eyre!("{} {} failed with {}: {}", method, path, status, detail));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response of {} {}: {}", method, path, e))
  }

  /// List courses visible to the current user
  pub async fn list_courses(&self) -> Result<Vec<Course>> {
    self.get(endpoints::COURSES, &[]).await
  }

  pub async fn list_materials(&self, course_id: &str) -> Result<Vec<Material>> {
    self.get(&endpoints::course_materials(course_id), &[]).await
  }

  /// Upload a file as course material; OCR runs on the backend afterwards
  pub async fn upload_material(&self, course_id: &str, file: &Path) -> Result<Material> {
    let filename = file
      .file_name()
      .and_then(|n| n.to_str())
      .ok_or_else(|| eyre!("Not a file path: {}", file.display()))?
      .to_string();
    let bytes = tokio::fs::read(file)
      .await
      .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;

    let form = multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(filename));
    let path = endpoints::course_materials(course_id);

    let response = self
      .request(Method::POST, &path)?
      .multipart(form)
      .send()
      .await
      .map_err(|e| eyre!("Failed to upload {}: {}", file.display(), e))?;
    Self::decode("POST", &path, response).await
  }

  pub async fn list_exams(&self, course_id: &str) -> Result<Vec<Exam>> {
    self.get(&endpoints::course_exams(course_id), &[]).await
  }

  pub async fn get_questions(&self, exam_id: &str) -> Result<Vec<Question>> {
    self.get(&endpoints::exam_questions(exam_id), &[]).await
  }

  /// Ask the backend to generate questions from the course materials
  pub async fn generate_questions(
    &self,
    exam_id: &str,
    request: &GenerateQuestionsRequest,
  ) -> Result<Vec<Question>> {
    self.post(&endpoints::generate_questions(exam_id), request).await
  }

  pub async fn list_submissions(&self, exam_id: &str) -> Result<Vec<Submission>> {
    self.get(&endpoints::exam_submissions(exam_id), &[]).await
  }

  pub async fn grade_submission(&self, submission_id: &str, request: &GradeRequest) -> Result<Grade> {
    self.post(&endpoints::grade_submission(submission_id), request).await
  }

  /// List grades, optionally only those of one student
  pub async fn list_grades(&self, student_id: Option<&str>) -> Result<Vec<Grade>> {
    match student_id {
      Some(id) => self.get(endpoints::GRADES, &[("student_id", id)]).await,
      None => self.get(endpoints::GRADES, &[]).await,
    }
  }

  pub async fn list_appeals(&self, student_id: Option<&str>) -> Result<Vec<Appeal>> {
    match student_id {
      Some(id) => self.get(endpoints::APPEALS, &[("student_id", id)]).await,
      None => self.get(endpoints::APPEALS, &[]).await,
    }
  }

  pub async fn submit_appeal(&self, request: &AppealRequest) -> Result<Appeal> {
    self.post(endpoints::APPEALS, request).await
  }

  pub async fn resolve_appeal(&self, appeal_id: &str, request: &ResolveAppealRequest) -> Result<Appeal> {
    self.post(&endpoints::resolve_appeal(appeal_id), request).await
  }

  pub async fn get_analytics(&self, exam_id: &str) -> Result<ExamAnalytics> {
    self.get(&endpoints::exam_analytics(exam_id), &[]).await
  }
}
