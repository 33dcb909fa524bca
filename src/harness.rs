//! # Sketch harness
//!
//! Runs a target program containing a single `??` hole. The loader rewrites the hole into a call
//! to the [`Resolver`], which consults the [`Session`] each time execution reaches it: an override
//! wins, then a candidate expression evaluated against the call site's locals, then the last known
//! value. The session mutator records user-confirmed examples for the hole between runs.

mod errors;
mod holes;
mod loader;
mod mutator;
mod resolver;
mod session;
mod snapshot;

pub use errors::SketchError;
pub use holes::{hook_call, rewrite, scan, validate, HoleSite, MARKER};
pub use loader::{prepare, run_file, run_program, run_source};
pub use mutator::decode_payload;
pub use resolver::{ExprEvaluator, InterpreterEvaluator, Resolver};
pub use session::{HoleRecord, Observation, Session};
pub use snapshot::{snapshot, INTERNAL_PREFIX};
