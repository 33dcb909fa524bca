//! # Session mutator
//!
//! The entry point used by an interactive tool to feed user-confirmed values for a hole back into
//! the session.

use tracing::{debug, warn};

use super::errors::SketchError;
use super::session::{HoleRecord, Observation, Session};
use super::snapshot::snapshot;
use crate::lang::{eval_literal, Env, Value};

/// Decodes an environment payload: one `name:literal` binding per line, split on the first colon.
/// Blank lines are ignored. Literals are read with the literal evaluator, never executed.
pub fn decode_payload(payload: &str) -> Result<Env, SketchError> {
  let mut env = Env::new();
  for text in payload.lines().filter(|l| !l.trim().is_empty()) {
    let (name, literal) = text.split_once(':').ok_or_else(|| SketchError::payload(text, "expected `name:value`"))?;
    let name = name.trim();
    if name.is_empty() {
      return Err(SketchError::payload(text, "empty binding name"));
    }
    let value = eval_literal(literal.trim()).map_err(|e| SketchError::payload(text, e.to_string()))?;
    env.insert(name.to_string(), value);
  }
  Ok(env)
}

impl Session {
  /// Records that the hole at `line` should produce `value` when its locals are `locals_payload`.
  ///
  /// An observation with the same environment is overwritten in place. Otherwise, if the record
  /// has a candidate whose last generated value differs from `value`, `value` becomes the override.
  /// Every successful call also makes `value` the last known value.
  pub fn record_observation(
    &mut self,
    locals_payload: &str,
    globals_payload: &str,
    value: Value,
    line: usize,
  ) -> Result<(), SketchError> {
    if value.is_none() {
      return Err(SketchError::NoneValue { line });
    }
    let env = snapshot(&decode_payload(locals_payload)?);
    decode_payload(globals_payload)?;
    self.record(line, env, value)
  }

  /// [`Session::record_observation`] with an already captured environment.
  pub fn record(&mut self, line: usize, env: Env, value: Value) -> Result<(), SketchError> {
    if value.is_none() {
      return Err(SketchError::NoneValue { line });
    }
    match self.hole_mut(line) {
      Some(record) => observe(record, line, env, value.clone()),
      None => {
        debug!(line, %value, "created hole record");
        let record = self.hole_or_default(line);
        record.observations.push(Observation { env, value: value.clone() });
      }
    }
    self.set_container(value);
    Ok(())
  }
}

fn observe(record: &mut HoleRecord, line: usize, env: Env, value: Value) {
  if let Some(existing) = record.observations.iter_mut().find(|o| o.env == env) {
    debug!(line, old = %existing.value, new = %value, "overwrote observation");
    existing.value = value;
    return;
  }
  if record.candidate.is_some() && record.generated.as_ref() != Some(&value) {
    warn!(line, %value, candidate = ?record.candidate, "observed value disagrees with candidate, overriding");
    record.override_value = Some(value.clone());
  }
  debug!(line, %value, "recorded observation");
  record.observations.push(Observation { env, value });
}
