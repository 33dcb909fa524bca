//! Finding and rewriting hole markers.
//!
//! This is a textual pass over the raw source, so it works on programs that do not parse. A marker
//! is live unless it sits in a `#` comment or inside a string literal; an unterminated
//! triple-quoted string swallows the rest of the file.

use tracing::debug;

use super::errors::SketchError;
use crate::lang::HOLE_HOOK;

/// The hole marker.
pub const MARKER: &str = "??";

/// A live hole marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoleSite {
  /// Byte offset of the marker.
  pub offset: usize,
  /// 1-based source line.
  pub line: usize,
}

#[derive(Clone, Copy)]
enum State {
  Code,
  Comment,
  /// Inside a single-line string opened by the given quote.
  Quoted(u8),
  /// Inside a triple-quoted string opened by the given quote.
  Triple(u8),
}

/// Returns the live hole markers of `source` in order.
pub fn scan(source: &str) -> Vec<HoleSite> {
  // All delimiters are ASCII, so byte positions never split a UTF-8 sequence.
  let bytes = source.as_bytes();
  let marker = MARKER.as_bytes();
  let mut sites = Vec::new();
  let mut state = State::Code;
  let mut line = 1;
  let mut i = 0;
  while i < bytes.len() {
    let rest = &bytes[i..];
    let mut step = 1;
    match state {
      State::Code => match bytes[i] {
        _ if rest.starts_with(marker) => {
          sites.push(HoleSite { offset: i, line });
          step = marker.len();
        }
        b'#' => state = State::Comment,
        q @ (b'\'' | b'"') if rest.starts_with(&[q, q, q]) => {
          state = State::Triple(q);
          step = 3;
        }
        q @ (b'\'' | b'"') => state = State::Quoted(q),
        _ => {}
      },
      State::Comment => {
        if bytes[i] == b'\n' {
          state = State::Code;
        }
      }
      State::Quoted(q) => match bytes[i] {
        b'\\' if rest.len() > 1 => step = 2,
        b'\n' => state = State::Code,
        c if c == q => state = State::Code,
        _ => {}
      },
      State::Triple(q) => match bytes[i] {
        _ if rest.starts_with(&[q, q, q]) => {
          state = State::Code;
          step = 3;
        }
        b'\\' if rest.len() > 1 => step = 2,
        _ => {}
      },
    }
    let end = (i + step).min(bytes.len());
    line += bytes[i..end].iter().filter(|b| **b == b'\n').count();
    i = end;
  }
  sites
}

/// Checks that `source` has at most one live hole and returns it.
pub fn validate(source: &str) -> Result<Option<HoleSite>, SketchError> {
  let sites = scan(source);
  match sites[..] {
    [] => Ok(None),
    [site] => Ok(Some(site)),
    _ => Err(SketchError::MultipleHoles { lines: sites.iter().map(|s| s.line).collect() }),
  }
}

/// The call that replaces a marker on `line`.
pub fn hook_call(line: usize) -> String {
  format!("{HOLE_HOOK}({line}, locals(), globals())")
}

/// Replaces every site in `sites` (as returned by [`scan`]) with its hook call. Line numbers are
/// preserved since calls never contain line breaks.
pub fn rewrite(source: &str, sites: &[HoleSite]) -> String {
  let mut res = String::with_capacity(source.len() + sites.len() * 48);
  let mut last = 0;
  for site in sites {
    res.push_str(&source[last..site.offset]);
    res.push_str(&hook_call(site.line));
    last = site.offset + MARKER.len();
    debug!(line = site.line, "rewrote hole marker");
  }
  res.push_str(&source[last..]);
  res
}
