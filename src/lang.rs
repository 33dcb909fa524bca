//! # Sketch script
//!
//! A small indentation-structured scripting language. Target programs are written in it, and the
//! harness rewrites, parses and runs them through this module.

mod builtins;
mod errors;
mod lexer;
mod parser;

pub mod ast;
pub mod interp;
pub mod literal;
pub mod value;

pub use ast::{Expr, Program, Stmt};
pub use errors::{ErrorKind, LexError, LiteralError, ParseError, RuntimeError};
pub use interp::{HoleHook, Interpreter, HOLE_HOOK};
pub use lexer::{lex, Span, Token};
pub use literal::eval_literal;
pub use parser::{parse_expression, parse_program};
pub use value::{Env, Value};

/// Lexes and parses a whole program.
pub fn compile(source: &str) -> Result<Program, ParseError> {
  parse_program(lex(source)?)
}

/// Lexes and parses a single expression.
pub fn compile_expression(source: &str) -> Result<Expr, ParseError> {
  parse_expression(lex(source.trim())?)
}
