//! # Resolution session
//!
//! The session holds one record per hole location plus the process-wide fallback value (the
//! "container"). It is passed explicitly to the resolver and the mutator, and can be persisted to a
//! JSON file so that the mutator may run as a separate process between runs of the program.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::SketchError;
use crate::lang::{eval_literal, Env, Value};

/// A value produced for a hole under a captured environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
  pub env: Env,
  pub value: Value,
}

/// Everything known about one hole location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoleRecord {
  /// Observations in the order they were recorded. Environments are pairwise distinct.
  pub observations: Vec<Observation>,
  /// Expression hypothesized to compute the hole's value from its locals.
  pub candidate: Option<String>,
  /// Result of the most recent evaluation of the candidate.
  pub generated: Option<Value>,
  /// Value taking precedence over the candidate. `Some(Value::None)` counts as absent.
  pub override_value: Option<Value>,
}

impl HoleRecord {
  /// The recorded `(environment, value)` pairs, oldest first.
  pub fn examples(&self) -> impl Iterator<Item = (&Env, &Value)> {
    self.observations.iter().map(|o| (&o.env, &o.value))
  }

  pub fn active_override(&self) -> Option<&Value> {
    self.override_value.as_ref().filter(|v| !v.is_none())
  }

  pub fn observation(&self, env: &Env) -> Option<&Observation> {
    self.observations.iter().find(|o| o.env == *env)
  }
}

/// # Sessions
///
/// Records are keyed by the source line of their hole and created on first use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
  holes: BTreeMap<usize, HoleRecord>,
  container: Option<Value>,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn hole(&self, line: usize) -> Option<&HoleRecord> {
    self.holes.get(&line)
  }

  pub fn hole_mut(&mut self, line: usize) -> Option<&mut HoleRecord> {
    self.holes.get_mut(&line)
  }

  /// Returns the record for `line`, creating an empty one if needed.
  pub fn hole_or_default(&mut self, line: usize) -> &mut HoleRecord {
    self.holes.entry(line).or_default()
  }

  pub fn holes(&self) -> impl Iterator<Item = (usize, &HoleRecord)> {
    self.holes.iter().map(|(line, record)| (*line, record))
  }

  /// The last known value, if one was ever assigned.
  pub fn container(&self) -> Option<&Value> {
    self.container.as_ref()
  }

  pub fn set_container(&mut self, value: Value) {
    self.container = Some(value);
  }

  /// Installs a candidate expression for `line` and clears its override.
  pub fn set_candidate(&mut self, line: usize, expr: impl Into<String>) {
    let record = self.hole_or_default(line);
    record.candidate = Some(expr.into());
    record.override_value = None;
    debug!(line, candidate = ?record.candidate, "installed candidate expression");
  }

  /// Clears the override of `line`. Returns whether one was active.
  pub fn clear_override(&mut self, line: usize) -> bool {
    match self.holes.get_mut(&line) {
      Some(record) => record.override_value.take().is_some_and(|v| !v.is_none()),
      None => false,
    }
  }

  /// Removes both the candidate and the override of `line` if both are present. Returns whether
  /// anything was removed.
  pub fn drop_overridden_candidate(&mut self, line: usize) -> bool {
    match self.holes.get_mut(&line) {
      Some(record) if record.candidate.is_some() && record.active_override().is_some() => {
        record.candidate = None;
        record.override_value = None;
        true
      }
      _ => false,
    }
  }

  pub fn to_json(&self) -> Result<String, SketchError> {
    Ok(serde_json::to_string_pretty(&SessionFile::from(self))?)
  }

  pub fn from_json(json: &str) -> Result<Self, SketchError> {
    serde_json::from_str::<SessionFile>(json)?.try_into()
  }

  pub fn load(path: &Path) -> Result<Self, SketchError> {
    let json = std::fs::read_to_string(path).map_err(|e| SketchError::io(path, e))?;
    Self::from_json(&json)
  }

  /// Like [`Session::load`], but a missing file yields an empty session.
  pub fn load_or_new(path: &Path) -> Result<Self, SketchError> {
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::new())
    }
  }

  pub fn save(&self, path: &Path) -> Result<(), SketchError> {
    std::fs::write(path, self.to_json()?).map_err(|e| SketchError::io(path, e))
  }
}

// On-disk form. Values are stored as their literal text.

#[derive(Serialize, Deserialize)]
struct SessionFile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  container: Option<String>,
  #[serde(default)]
  holes: Vec<HoleFile>,
}

#[derive(Serialize, Deserialize)]
struct HoleFile {
  line: usize,
  #[serde(default)]
  observations: Vec<ObservationFile>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  candidate: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  generated: Option<String>,
  #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
  override_value: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ObservationFile {
  env: BTreeMap<String, String>,
  value: String,
}

/// Literal text of a value, or `None` for values with no literal form.
fn encode(value: &Value) -> Option<String> {
  value.is_literal().then(|| value.repr())
}

fn decode(text: &str) -> Result<Value, SketchError> {
  eval_literal(text).map_err(|err| SketchError::Literal { text: text.to_string(), err })
}

fn decode_opt(text: Option<String>) -> Result<Option<Value>, SketchError> {
  text.as_deref().map(decode).transpose()
}

impl From<&Session> for SessionFile {
  fn from(session: &Session) -> Self {
    let holes = session
      .holes()
      .map(|(line, record)| HoleFile {
        line,
        observations: record
          .observations
          .iter()
          .filter_map(|o| {
            let env = o.env.iter().filter_map(|(name, v)| Some((name.clone(), encode(v)?))).collect();
            Some(ObservationFile { env, value: encode(&o.value)? })
          })
          .collect(),
        candidate: record.candidate.clone(),
        generated: record.generated.as_ref().and_then(encode),
        override_value: record.override_value.as_ref().and_then(encode),
      })
      .collect();
    Self { container: session.container.as_ref().and_then(encode), holes }
  }
}

impl TryFrom<SessionFile> for Session {
  type Error = SketchError;

  fn try_from(file: SessionFile) -> Result<Self, SketchError> {
    let mut session = Session { holes: BTreeMap::new(), container: decode_opt(file.container)? };
    for hole in file.holes {
      let observations = hole
        .observations
        .into_iter()
        .map(|o| {
          let env = o.env.iter().map(|(name, text)| Ok((name.clone(), decode(text)?))).collect::<Result<_, SketchError>>()?;
          Ok(Observation { env, value: decode(&o.value)? })
        })
        .collect::<Result<_, SketchError>>()?;
      let record = HoleRecord {
        observations,
        candidate: hole.candidate,
        generated: decode_opt(hole.generated)?,
        override_value: decode_opt(hole.override_value)?,
      };
      session.holes.insert(hole.line, record);
    }
    Ok(session)
  }
}
