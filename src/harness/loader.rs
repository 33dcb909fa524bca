//! # Loading and running target programs
//!
//! Validates the raw source, rewrites the hole into a resolver call, compiles the result and runs
//! it as the program's top-level code. Rewriting keeps every line in place, so errors refer to
//! positions in the original file.

use std::io::Write;
use std::path::Path;

use tracing::info;

use super::errors::SketchError;
use super::holes::{rewrite, scan, validate};
use super::resolver::{ExprEvaluator, Resolver};
use super::session::Session;
use crate::lang::{compile, ErrorKind, Interpreter, Program, RuntimeError, Value};

/// Validates, rewrites and compiles `source`. `path` names the program in errors.
pub fn prepare(path: &Path, source: &str) -> Result<Program, SketchError> {
  validate(source)?;
  let rewritten = rewrite(source, &scan(source));
  compile(&rewritten).map_err(|err| SketchError::Syntax { path: path.to_path_buf(), line: err.line(), err })
}

/// Reads the program at `path` and runs it against `session`. `print` output goes to `out`.
pub fn run_file(path: &Path, session: &mut Session, out: &mut dyn Write) -> Result<(), SketchError> {
  let source = std::fs::read_to_string(path).map_err(|e| SketchError::io(path, e))?;
  run_source(path, &source, session, out)
}

pub fn run_source(path: &Path, source: &str, session: &mut Session, out: &mut dyn Write) -> Result<(), SketchError> {
  let program = prepare(path, source)?;
  run_program(path, &program, &mut Resolver::new(session), out)
}

/// Runs a prepared program with a fresh module namespace, resolving holes with `resolver`.
pub fn run_program<E: ExprEvaluator>(
  path: &Path,
  program: &Program,
  resolver: &mut Resolver<'_, E>,
  out: &mut dyn Write,
) -> Result<(), SketchError> {
  info!(path = %path.display(), "running program");
  let mut interp = Interpreter::new(out).with_hook(resolver);
  interp.define_global("__file__", Value::from(path.display().to_string()));
  interp.run(program).map_err(|err| from_runtime(path, err))?;
  info!(path = %path.display(), "program finished");
  Ok(())
}

/// Unwraps harness errors raised by the resolver; everything else is a runtime error of the
/// program.
fn from_runtime(path: &Path, err: RuntimeError) -> SketchError {
  let line = err.line;
  match err.into_hook() {
    Ok(boxed) => match boxed.downcast::<SketchError>() {
      Ok(err) => *err,
      Err(other) => SketchError::Runtime {
        path: path.to_path_buf(),
        line,
        err: RuntimeError { kind: ErrorKind::Hook(other), line },
      },
    },
    Err(err) => SketchError::Runtime { path: path.to_path_buf(), line, err },
  }
}
