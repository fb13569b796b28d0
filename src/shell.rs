//! Interactive session: reads command lines and prints results.
//!
//! The whole session shares one cached client, so repeated listings are
//! served from the cache until they expire or a write invalidates them.

use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::api::cached_client::CachedExamClient;
use crate::api::types::{AppealRequest, GenerateQuestionsRequest, GradeRequest, ResolveAppealRequest};
use crate::cache::ApiCache;
use crate::commands::{self, Action};
use crate::config::{Config, Role};
use crate::render;

/// What the session should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  Continue,
  Quit,
}

pub struct Shell {
  client: CachedExamClient,
  config: Config,
}

impl Shell {
  pub fn new(config: Config, cache: ApiCache) -> Result<Self> {
    let client = CachedExamClient::new(&config, cache)?;
    Ok(Self::with_client(config, client))
  }

  pub fn with_client(config: Config, client: CachedExamClient) -> Self {
    Self { client, config }
  }

  /// Read lines from stdin until `quit` or end of input.
  pub async fn run(&self) -> Result<()> {
    let domain = render::extract_domain(&self.config.backend.url).to_string();
    println!("examkit connected to {} (type 'help' for commands)", domain);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
      print!("examkit@{}> ", domain);
      std::io::stdout()
        .flush()
        .map_err(|e| eyre!("Failed to write prompt: {}", e))?;

      let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| eyre!("Failed to read input: {}", e))?
      else {
        println!();
        break;
      };

      if line.trim().is_empty() {
        continue;
      }
      if self.execute(&line).await == Flow::Quit {
        break;
      }
    }

    info!("Session ended");
    Ok(())
  }

  /// Run one line, printing its output or error.
  pub async fn execute(&self, line: &str) -> Flow {
    let action = match self.resolve(line) {
      Ok(action) => action,
      Err(e) => {
        eprintln!("{}", e);
        return Flow::Continue;
      }
    };
    if action == Action::Quit {
      return Flow::Quit;
    }

    match self.dispatch(action).await {
      Ok(output) => print!("{}", output),
      Err(e) => eprintln!("error: {:#}", e),
    }
    Flow::Continue
  }

  /// Run a single command outside the session, printing its output.
  ///
  /// Unlike `execute`, any failure is returned so the process exits non-zero.
  pub async fn run_once(&self, line: &str) -> Result<()> {
    let action = self.resolve(line)?;
    if action != Action::Quit {
      print!("{}", self.dispatch(action).await?);
    }
    Ok(())
  }

  /// Parse a line and check the configured role may run it.
  fn resolve(&self, line: &str) -> Result<Action> {
    let (cmd, action) = commands::parse(line).map_err(|e| eyre!("{}", e))?;
    if !cmd.audience.allows(self.config.role) {
      return Err(eyre!("'{}' is not available to your role", cmd.name));
    }
    debug!(command = cmd.name, "Running command");
    Ok(action)
  }

  /// Student listings default to the configured user
  fn student_scope(&self, explicit: Option<String>) -> Option<String> {
    match (explicit, self.config.role) {
      (Some(id), _) => Some(id),
      (None, Role::Student) => self.config.user_id.clone(),
      (None, Role::Instructor) => None,
    }
  }

  async fn dispatch(&self, action: Action) -> Result<String> {
    let client = &self.client;
    let output = match action {
      Action::Courses => render::courses(&client.courses().await?),
      Action::Materials { course_id } => render::materials(&client.materials(&course_id).await?),
      Action::Upload { course_id, file } => {
        let material = client.upload_material(&course_id, &file).await?;
        format!("Uploaded {} as material {}\n", material.filename, material.id)
      }
      Action::Exams { course_id } => render::exams(&client.exams(&course_id).await?),
      Action::Questions { exam_id } => render::questions(&client.questions(&exam_id).await?),
      Action::Generate { exam_id, count, kind } => {
        let request = GenerateQuestionsRequest {
          count,
          kind,
          material_ids: Vec::new(),
        };
        let questions = client.generate_questions(&exam_id, &request).await?;
        format!("Generated {} questions\n{}", questions.len(), render::questions(&questions))
      }
      Action::Submissions { exam_id } => render::submissions(&client.submissions(&exam_id).await?),
      Action::Grade {
        submission_id,
        score,
        feedback,
      } => {
        let request = GradeRequest {
          use_ai: score.is_none(),
          score,
          feedback,
        };
        let grade = client.grade_submission(&submission_id, &request).await?;
        render::grades(std::slice::from_ref(&grade))
      }
      Action::Grades { student_id } => {
        let student = self.student_scope(student_id);
        render::grades(&client.grades(student.as_deref()).await?)
      }
      Action::Appeals { student_id } => {
        let student = self.student_scope(student_id);
        render::appeals(&client.appeals(student.as_deref()).await?)
      }
      Action::Appeal { grade_id, reason } => {
        let appeal = client.submit_appeal(&AppealRequest { grade_id, reason }).await?;
        render::appeal(&appeal)
      }
      Action::Resolve {
        appeal_id,
        accept,
        response,
      } => {
        let appeal = client
          .resolve_appeal(&appeal_id, &ResolveAppealRequest { accept, response })
          .await?;
        render::appeal(&appeal)
      }
      Action::Analytics { exam_id } => render::analytics(&client.analytics(&exam_id).await?),
      Action::Dashboard => {
        let student = self.student_scope(None);
        render::dashboard(&client.dashboard(student.as_deref()).await?)
      }
      Action::Refresh { pattern } => format!("Dropped {} cached responses\n", client.refresh(&pattern)),
      Action::Stats => render::cache_stats(&client.stats()),
      Action::Help => commands::help(self.config.role),
      Action::Quit => String::new(),
    };
    Ok(output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::ExamClient;
  use crate::config::{BackendConfig, CacheConfig, LogConfig};
  use serde_json::json;

  fn shell(role: Role, user_id: Option<&str>) -> Shell {
    let config = Config {
      backend: BackendConfig {
        url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 1,
      },
      cache: CacheConfig::default(),
      log: LogConfig::default(),
      role,
      user_id: user_id.map(String::from),
    };
    let inner = ExamClient::with_token(&config.backend, "t".to_string()).unwrap();
    let client = CachedExamClient::with_parts(inner, ApiCache::new(), config.cache.clone());
    Shell::with_client(config, client)
  }

  #[test]
  fn test_student_scope_defaults_to_self() {
    let student = shell(Role::Student, Some("u1"));
    assert_eq!(student.student_scope(None).as_deref(), Some("u1"));
    assert_eq!(student.student_scope(Some("u2".into())).as_deref(), Some("u2"));

    let instructor = shell(Role::Instructor, Some("i1"));
    assert_eq!(instructor.student_scope(None), None);
  }

  #[tokio::test]
  async fn test_quit_and_bad_input_flow() {
    let shell = shell(Role::Instructor, None);
    assert_eq!(shell.execute("quit").await, Flow::Quit);
    assert_eq!(shell.execute("exit").await, Flow::Quit);
    assert_eq!(shell.execute("frobnicate").await, Flow::Continue);
    // blocked by role before any request is made
    assert_eq!(shell.execute("appeal g1 unfair").await, Flow::Continue);
  }

  #[tokio::test]
  async fn test_local_commands_need_no_backend() {
    let shell = shell(Role::Instructor, None);
    shell.client.cache().set("/courses:{}", json!([]), None);
    shell.client.cache().set("/grades:{}", json!([]), None);

    let stats = shell.dispatch(Action::Stats).await.unwrap();
    assert!(stats.starts_with("2 cached responses"));

    let refreshed = shell
      .dispatch(Action::Refresh {
        pattern: "grades".to_string(),
      })
      .await
      .unwrap();
    assert_eq!(refreshed, "Dropped 1 cached responses\n");

    // served from the cache, so the unreachable backend is never contacted
    let courses = shell.dispatch(Action::Courses).await.unwrap();
    assert_eq!(courses, "(none)\n");
  }

  #[tokio::test]
  async fn test_run_once_reports_failures() {
    let shell = shell(Role::Instructor, None);

    let unknown = shell.run_once("frobnicate").await.unwrap_err();
    assert!(unknown.to_string().contains("unknown command"));

    let blocked = shell.run_once("appeal g1 unfair").await.unwrap_err();
    assert!(blocked.to_string().contains("not available to your role"));

    // nothing listens on the backend port
    assert!(shell.run_once("courses").await.is_err());

    assert!(shell.run_once("stats").await.is_ok());
    assert!(shell.run_once("quit").await.is_ok());
  }
}
