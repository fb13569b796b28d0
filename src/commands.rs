//! Available commands, argument parsing and "did you mean" suggestions.

use crate::api::types::QuestionKind;
use crate::config::Role;
use std::path::PathBuf;

/// Who may run a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
  Everyone,
  Instructor,
  Student,
}

impl Audience {
  pub fn allows(&self, role: Role) -> bool {
    match self {
      Audience::Everyone => true,
      Audience::Instructor => role == Role::Instructor,
      Audience::Student => role == Role::Student,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
  pub audience: Audience,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "courses",
    aliases: &["c", "course"],
    usage: "courses",
    description: "List your courses",
    audience: Audience::Everyone,
  },
  Command {
    name: "materials",
    aliases: &["m", "material"],
    usage: "materials <course>",
    description: "List uploaded course materials",
    audience: Audience::Instructor,
  },
  Command {
    name: "upload",
    aliases: &["u"],
    usage: "upload <course> <file>",
    description: "Upload a course material for OCR",
    audience: Audience::Instructor,
  },
  Command {
    name: "exams",
    aliases: &["e", "exam"],
    usage: "exams <course>",
    description: "List exams of a course",
    audience: Audience::Everyone,
  },
  Command {
    name: "questions",
    aliases: &["q", "question"],
    usage: "questions <exam>",
    description: "Show exam questions",
    audience: Audience::Instructor,
  },
  Command {
    name: "generate",
    aliases: &["gen"],
    usage: "generate <exam> [count] [mc|short|essay]",
    description: "Generate questions from course materials",
    audience: Audience::Instructor,
  },
  Command {
    name: "submissions",
    aliases: &["s", "subs"],
    usage: "submissions <exam>",
    description: "List submissions of an exam",
    audience: Audience::Instructor,
  },
  Command {
    name: "grade",
    aliases: &["g"],
    usage: "grade <submission> [score [feedback...]]",
    description: "Grade a submission (AI grading without a score)",
    audience: Audience::Instructor,
  },
  Command {
    name: "grades",
    aliases: &["gr"],
    usage: "grades [student]",
    description: "List grades",
    audience: Audience::Everyone,
  },
  Command {
    name: "appeals",
    aliases: &["a"],
    usage: "appeals [student]",
    description: "List grade appeals",
    audience: Audience::Everyone,
  },
  Command {
    name: "appeal",
    aliases: &["ap"],
    usage: "appeal <grade> <reason...>",
    description: "Appeal a grade",
    audience: Audience::Student,
  },
  Command {
    name: "resolve",
    aliases: &["r"],
    usage: "resolve <appeal> accept|reject [response...]",
    description: "Accept or reject an appeal",
    audience: Audience::Instructor,
  },
  Command {
    name: "analytics",
    aliases: &["an", "stats-exam"],
    usage: "analytics <exam>",
    description: "Score distribution of an exam",
    audience: Audience::Instructor,
  },
  Command {
    name: "dashboard",
    aliases: &["d", "home"],
    usage: "dashboard",
    description: "Courses, exams and recent grades",
    audience: Audience::Everyone,
  },
  Command {
    name: "refresh",
    aliases: &["invalidate"],
    usage: "refresh [pattern]",
    description: "Drop cached responses (all, or keys containing pattern)",
    audience: Audience::Everyone,
  },
  Command {
    name: "stats",
    aliases: &["cache"],
    usage: "stats",
    description: "Show cached responses",
    audience: Audience::Everyone,
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "Show this list",
    audience: Audience::Everyone,
  },
  Command {
    name: "quit",
    aliases: &["exit"],
    usage: "quit",
    description: "Exit examkit",
    audience: Audience::Everyone,
  },
];

/// A parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  Courses,
  Materials { course_id: String },
  Upload { course_id: String, file: PathBuf },
  Exams { course_id: String },
  Questions { exam_id: String },
  Generate {
    exam_id: String,
    count: u32,
    kind: Option<QuestionKind>,
  },
  Submissions { exam_id: String },
  Grade {
    submission_id: String,
    score: Option<f32>,
    feedback: Option<String>,
  },
  Grades { student_id: Option<String> },
  Appeals { student_id: Option<String> },
  Appeal { grade_id: String, reason: String },
  Resolve {
    appeal_id: String,
    accept: bool,
    response: Option<String>,
  },
  Analytics { exam_id: String },
  Dashboard,
  Refresh { pattern: String },
  Stats,
  Help,
  Quit,
}

/// Number of questions requested when `generate` gets no count
pub const DEFAULT_GENERATE_COUNT: u32 = 10;

/// Why a line could not be turned into an [`Action`]
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
  Empty,
  Unknown { input: String, suggestions: Vec<&'static str> },
  Usage(&'static Command),
  Invalid(String),
}

impl std::fmt::Display for ParseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ParseError::Empty => write!(f, "empty command"),
      ParseError::Unknown { input, suggestions } if suggestions.is_empty() => {
        write!(f, "unknown command '{}', try 'help'", input)
      }
      ParseError::Unknown { input, suggestions } => {
        write!(f, "unknown command '{}', did you mean: {}", input, suggestions.join(", "))
      }
      ParseError::Usage(cmd) => write!(f, "usage: {}", cmd.usage),
      ParseError::Invalid(msg) => write!(f, "{}", msg),
    }
  }
}

impl std::error::Error for ParseError {}

/// Find the command whose name or alias is exactly `name`
pub fn lookup(name: &str) -> Option<&'static Command> {
  let name = name.to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == name || cmd.aliases.contains(&name.as_str()))
}

/// Parse one shell line
pub fn parse(line: &str) -> Result<(&'static Command, Action), ParseError> {
  let mut words = line.split_whitespace();
  let head = words.next().ok_or(ParseError::Empty)?;
  let args: Vec<&str> = words.collect();

  let cmd = lookup(head).ok_or_else(|| ParseError::Unknown {
    input: head.to_string(),
    suggestions: get_suggestions(head).iter().take(3).map(|c| c.name).collect(),
  })?;

  let arg = |i: usize| args.get(i).map(|s| s.to_string()).ok_or(ParseError::Usage(cmd));
  let rest = |from: usize| {
    let joined = args.get(from..).map(|words| words.join(" ")).unwrap_or_default();
    (!joined.is_empty()).then_some(joined)
  };

  let action = match cmd.name {
    "courses" => Action::Courses,
    "materials" => Action::Materials { course_id: arg(0)? },
    "upload" => Action::Upload {
      course_id: arg(0)?,
      file: PathBuf::from(arg(1)?),
    },
    "exams" => Action::Exams { course_id: arg(0)? },
    "questions" => Action::Questions { exam_id: arg(0)? },
    "generate" => {
      let exam_id = arg(0)?;
      let count = match args.get(1) {
        Some(n) => n
          .parse::<u32>()
          .ok()
          .filter(|n| *n > 0)
          .ok_or_else(|| ParseError::Invalid(format!("question count must be a positive number, got '{}'", n)))?,
        None => DEFAULT_GENERATE_COUNT,
      };
      let kind = match args.get(2) {
        Some(k) => Some(
          QuestionKind::parse(k).ok_or_else(|| ParseError::Invalid(format!("unknown question kind '{}'", k)))?,
        ),
        None => None,
      };
      Action::Generate { exam_id, count, kind }
    }
    "submissions" => Action::Submissions { exam_id: arg(0)? },
    "grade" => {
      let submission_id = arg(0)?;
      let score = match args.get(1) {
        Some(s) => Some(
          s.parse::<f32>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| ParseError::Invalid(format!("score must be a non-negative number, got '{}'", s)))?,
        ),
        None => None,
      };
      Action::Grade {
        submission_id,
        score,
        feedback: rest(2),
      }
    }
    "grades" => Action::Grades {
      student_id: args.first().map(|s| s.to_string()),
    },
    "appeals" => Action::Appeals {
      student_id: args.first().map(|s| s.to_string()),
    },
    "appeal" => Action::Appeal {
      grade_id: arg(0)?,
      reason: rest(1).ok_or(ParseError::Usage(cmd))?,
    },
    "resolve" => {
      let appeal_id = arg(0)?;
      let accept = match arg(1)?.to_lowercase().as_str() {
        "accept" | "yes" => true,
        "reject" | "no" => false,
        other => return Err(ParseError::Invalid(format!("expected accept or reject, got '{}'", other))),
      };
      Action::Resolve {
        appeal_id,
        accept,
        response: rest(2),
      }
    }
    "analytics" => Action::Analytics { exam_id: arg(0)? },
    "dashboard" => Action::Dashboard,
    "refresh" => Action::Refresh {
      pattern: args.first().unwrap_or(&crate::cache::INVALIDATE_ALL).to_string(),
    },
    "stats" => Action::Stats,
    "help" => Action::Help,
    "quit" => Action::Quit,
    other => return Err(ParseError::Invalid(format!("command '{}' is not wired up", other))),
  };

  Ok((cmd, action))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input_lower).map(|rank| (cmd, rank)))
    .collect();

  // Stable sort keeps table order within a rank
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

/// Help text listing the commands `role` may run
pub fn help(role: Role) -> String {
  let visible: Vec<&Command> = COMMANDS.iter().filter(|c| c.audience.allows(role)).collect();
  let width = visible.iter().map(|c| c.usage.len()).max().unwrap_or(0);
  visible
    .iter()
    .map(|c| format!("  {:<width$}  {}\n", c.usage, c.description, width = width))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn action(line: &str) -> Action {
    parse(line).unwrap().1
  }

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match_first() {
    let suggestions = get_suggestions("grades");
    assert_eq!(suggestions[0].name, "grades");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(lookup("E").unwrap().name, "exams");
    assert_eq!(lookup("?").unwrap().name, "help");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("ana");
    assert_eq!(suggestions[0].name, "analytics");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("mission");
    assert_eq!(suggestions[0].name, "submissions");
  }

  #[test]
  fn test_unknown_command_suggests() {
    match parse("dash") {
      Err(ParseError::Unknown { suggestions, .. }) => assert_eq!(suggestions, vec!["dashboard"]),
      other => panic!("expected unknown command, got {:?}", other),
    }
    assert_eq!(parse("   "), Err(ParseError::Empty));
  }

  #[test]
  fn test_missing_argument_shows_usage() {
    let err = parse("exams").unwrap_err();
    assert_eq!(err.to_string(), "usage: exams <course>");
  }

  #[test]
  fn test_generate_defaults_and_kind() {
    assert_eq!(
      action("generate e1"),
      Action::Generate {
        exam_id: "e1".to_string(),
        count: DEFAULT_GENERATE_COUNT,
        kind: None
      }
    );
    assert_eq!(
      action("gen e1 4 essay"),
      Action::Generate {
        exam_id: "e1".to_string(),
        count: 4,
        kind: Some(QuestionKind::Essay)
      }
    );
    assert!(matches!(parse("generate e1 0"), Err(ParseError::Invalid(_))));
    assert!(matches!(parse("generate e1 3 haiku"), Err(ParseError::Invalid(_))));
  }

  #[test]
  fn test_grade_with_and_without_score() {
    assert_eq!(
      action("grade s1"),
      Action::Grade {
        submission_id: "s1".to_string(),
        score: None,
        feedback: None
      }
    );
    assert_eq!(
      action("grade s1 17.5 good work overall"),
      Action::Grade {
        submission_id: "s1".to_string(),
        score: Some(17.5),
        feedback: Some("good work overall".to_string())
      }
    );
    assert!(matches!(parse("grade s1 -3"), Err(ParseError::Invalid(_))));
  }

  #[test]
  fn test_appeal_joins_reason() {
    assert_eq!(
      action("appeal g7 question 3 was marked   wrong"),
      Action::Appeal {
        grade_id: "g7".to_string(),
        reason: "question 3 was marked wrong".to_string()
      }
    );
    assert!(matches!(parse("appeal g7"), Err(ParseError::Usage(_))));
  }

  #[test]
  fn test_resolve() {
    assert_eq!(
      action("resolve a1 reject rubric applied correctly"),
      Action::Resolve {
        appeal_id: "a1".to_string(),
        accept: false,
        response: Some("rubric applied correctly".to_string())
      }
    );
    assert!(matches!(parse("resolve a1 maybe"), Err(ParseError::Invalid(_))));
  }

  #[test]
  fn test_refresh_defaults_to_everything() {
    assert_eq!(
      action("refresh"),
      Action::Refresh {
        pattern: "*".to_string()
      }
    );
    assert_eq!(
      action("refresh grades"),
      Action::Refresh {
        pattern: "grades".to_string()
      }
    );
  }

  #[test]
  fn test_audience() {
    let upload = lookup("upload").unwrap();
    assert!(upload.audience.allows(Role::Instructor));
    assert!(!upload.audience.allows(Role::Student));
    assert!(lookup("appeal").unwrap().audience.allows(Role::Student));
    assert!(!help(Role::Student).contains("upload"));
    assert!(help(Role::Instructor).contains("upload <course> <file>"));
  }
}
