//! # Environment snapshots
//!
//! Captured environments are stored in the session and compared across runs, so they are copied
//! and stripped of bindings that only make sense inside a single run.

use crate::lang::Env;

/// Names starting with this prefix are internal to the harness and the runtime.
pub const INTERNAL_PREFIX: &str = "__";

/// Returns a sanitized, independent copy of `env`: internal names and module bindings are dropped.
pub fn snapshot(env: &Env) -> Env {
  env
    .iter()
    .filter(|(name, value)| !name.starts_with(INTERNAL_PREFIX) && !value.is_module())
    .map(|(name, value)| (name.clone(), value.clone()))
    .collect()
}
