use std::path::{Path, PathBuf};

use crate::lang::{LiteralError, ParseError, RuntimeError};

/// Errors of the sketch harness.
#[derive(Debug, thiserror::Error)]
pub enum SketchError {
  /// More than one live hole in a program.
  #[error("multiple holes not allowed: found {} live `??` markers on lines {lines:?}", .lines.len())]
  MultipleHoles { lines: Vec<usize> },

  /// `None` submitted as the value of an observation.
  #[error("cannot record None as the value of the hole at line {line}")]
  NoneValue { line: usize },

  /// A hole was reached with no record and no fallback value.
  #[error("hole at line {line} was reached before any value was configured for it")]
  Unconfigured { line: usize },

  #[error("cannot access {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{}: SyntaxError: {err}", location(.path, .line))]
  Syntax { path: PathBuf, line: Option<usize>, err: ParseError },

  #[error("{}: {err}", location(.path, .line))]
  Runtime { path: PathBuf, line: Option<usize>, err: RuntimeError },

  #[error("malformed environment payload {text:?}: {reason}")]
  Payload { text: String, reason: String },

  #[error("malformed session file: {0}")]
  Session(#[from] serde_json::Error),

  #[error("malformed literal {text:?} in session: {err}")]
  Literal { text: String, err: LiteralError },
}

impl SketchError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn payload(text: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::Payload { text: text.into(), reason: reason.into() }
  }
}

fn location(path: &Path, line: &Option<usize>) -> String {
  match line {
    Some(line) => format!("{}:{line}", path.display()),
    None => path.display().to_string(),
  }
}
