//! # Hole resolution
//!
//! The resolver is installed as the interpreter's [`HoleHook`]. For each arrival at the hole it
//! decides, in order:
//!
//! 1. no record for the line: the container value, or [`SketchError::Unconfigured`] without one;
//! 2. a candidate expression and no active override: the candidate evaluated against a snapshot
//!    of the call site's locals, recorded as the generated value and the new container value;
//! 3. otherwise, or when the candidate fails: the override, else the container value.

use std::error::Error;

use tracing::{debug, error};

use super::errors::SketchError;
use super::session::Session;
use super::snapshot::snapshot;
use crate::lang::{compile_expression, Env, HoleHook, Interpreter, Value};

/// Evaluates candidate expressions.
pub trait ExprEvaluator {
  /// Evaluates `expr` with `locals` as the local namespace and `globals` as the global one.
  fn evaluate(&mut self, expr: &str, locals: Env, globals: &Env) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

/// Evaluates candidates with the scripting language interpreter. Output printed by a candidate
/// is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterEvaluator;

impl ExprEvaluator for InterpreterEvaluator {
  fn evaluate(&mut self, expr: &str, locals: Env, globals: &Env) -> Result<Value, Box<dyn Error + Send + Sync>> {
    let expr = compile_expression(expr)?;
    let mut out = std::io::sink();
    let mut interp = Interpreter::with_globals(&mut out, globals.clone());
    Ok(interp.eval_expression(&expr, locals)?)
  }
}

pub struct Resolver<'s, E = InterpreterEvaluator> {
  session: &'s mut Session,
  evaluator: E,
}

impl<'s> Resolver<'s> {
  pub fn new(session: &'s mut Session) -> Self {
    Self::with_evaluator(session, InterpreterEvaluator)
  }
}

impl<'s, E: ExprEvaluator> Resolver<'s, E> {
  pub fn with_evaluator(session: &'s mut Session, evaluator: E) -> Self {
    Self { session, evaluator }
  }

  pub fn session(&self) -> &Session {
    &*self.session
  }

  /// Decides the value of the hole at `line` given the bindings at the call site.
  pub fn resolve_hole(&mut self, line: usize, locals: &Env, globals: &Env) -> Result<Value, SketchError> {
    let Some(record) = self.session.hole(line) else {
      debug!(line, "no record for hole, using last known value");
      return self.session.container().cloned().ok_or(SketchError::Unconfigured { line });
    };
    let candidate = match record.active_override() {
      None => record.candidate.clone(),
      Some(_) => None,
    };
    if let Some(expr) = candidate {
      match self.evaluator.evaluate(&expr, snapshot(locals), globals) {
        Ok(value) => {
          debug!(line, %expr, %value, "evaluated candidate expression");
          self.session.hole_or_default(line).generated = Some(value.clone());
          self.session.set_container(value.clone());
          return Ok(value);
        }
        Err(err) => error!(line, %expr, %err, "candidate expression failed, falling back to last known value"),
      }
    }
    let record = self.session.hole(line);
    record
      .and_then(|r| r.active_override())
      .or(self.session.container())
      .cloned()
      .ok_or(SketchError::Unconfigured { line })
  }
}

impl<E: ExprEvaluator> HoleHook for Resolver<'_, E> {
  fn resolve(&mut self, line: usize, locals: Env, globals: &Env) -> Result<Value, Box<dyn Error + Send + Sync>> {
    Ok(self.resolve_hole(line, &locals, globals)?)
  }
}
