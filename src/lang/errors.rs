use super::lexer::{Span, Token};

/// # Lexing errors
///
/// Errors produced by the lexer. Lines and columns are 1-based and counted in characters.
#[derive(Debug, Clone)]
pub enum LexError {
  UnexpectedChar { ch: char, line: usize, col: usize },
  UnterminatedString { line: usize, col: usize },
  Dedent { line: usize },
}

/// # Parsing errors
///
/// Errors produced by the recursive descent parser.
#[derive(Debug, Clone)]
pub enum ParseError {
  Lex { err: LexError },
  UnexpectedToken { tok: Token, line: usize, col: usize },
  InvalidTarget { line: usize },
  UnexpectedEof,
}

/// # Literal errors
///
/// Errors produced by the safe literal evaluator.
#[derive(Debug, Clone)]
pub enum LiteralError {
  Parse { err: ParseError },
  NotLiteral { text: String },
}

/// The category of a runtime error, mirroring the exception names of the scripting language.
#[derive(Debug)]
pub enum ErrorKind {
  Name(String),
  Type(String),
  Value(String),
  Index(String),
  Key(String),
  Attribute(String),
  Import(String),
  ZeroDivision,
  Overflow(String),
  Recursion,
  /// Raised by a [`super::HoleHook`]; the payload is the hook's own error.
  Hook(Box<dyn std::error::Error + Send + Sync>),
}

/// # Runtime errors
///
/// Errors raised while executing a program. The line is the source line of the statement that was
/// executing, filled in as the error propagates out of the statement.
#[derive(Debug)]
pub struct RuntimeError {
  pub kind: ErrorKind,
  pub line: Option<usize>,
}

impl LexError {
  pub fn line(&self) -> usize {
    match self {
      Self::UnexpectedChar { line, .. } => *line,
      Self::UnterminatedString { line, .. } => *line,
      Self::Dedent { line } => *line,
    }
  }
}

impl ParseError {
  pub fn unexpected(next: Option<Span>) -> Self {
    match next {
      Some(span) => Self::UnexpectedToken { tok: span.tok, line: span.line, col: span.col },
      None => Self::UnexpectedEof,
    }
  }

  /// Returns the source line of the error, if it has one.
  pub fn line(&self) -> Option<usize> {
    match self {
      Self::Lex { err } => Some(err.line()),
      Self::UnexpectedToken { line, .. } => Some(*line),
      Self::InvalidTarget { line } => Some(*line),
      Self::UnexpectedEof => None,
    }
  }
}

impl RuntimeError {
  pub fn new(kind: ErrorKind) -> Self {
    Self { kind, line: None }
  }

  pub fn name(name: &str) -> Self {
    Self::new(ErrorKind::Name(format!("name '{name}' is not defined")))
  }

  pub fn type_error(msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::Type(msg.into()))
  }

  pub fn value_error(msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::Value(msg.into()))
  }

  pub fn index(msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::Index(msg.into()))
  }

  pub fn key(repr: impl Into<String>) -> Self {
    Self::new(ErrorKind::Key(repr.into()))
  }

  pub fn overflow(msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::Overflow(msg.into()))
  }

  pub fn attribute(type_name: &str, attr: &str) -> Self {
    Self::new(ErrorKind::Attribute(format!("'{type_name}' object has no attribute '{attr}'")))
  }

  /// Attaches `line` unless a more precise line was already recorded.
  pub fn at(mut self, line: usize) -> Self {
    self.line.get_or_insert(line);
    self
  }

  /// Takes the hook error out of this error, if it was raised by a hook.
  pub fn into_hook(self) -> Result<Box<dyn std::error::Error + Send + Sync>, Self> {
    match self.kind {
      ErrorKind::Hook(err) => Ok(err),
      kind => Err(Self { kind, line: self.line }),
    }
  }
}

impl std::convert::From<LexError> for ParseError {
  fn from(err: LexError) -> Self {
    Self::Lex { err }
  }
}

impl std::convert::From<ParseError> for LiteralError {
  fn from(err: ParseError) -> Self {
    Self::Parse { err }
  }
}

impl std::convert::From<LexError> for LiteralError {
  fn from(err: LexError) -> Self {
    Self::Parse { err: err.into() }
  }
}

impl std::fmt::Display for LexError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::UnexpectedChar { ch, line: _, col } => write!(f, "unexpected character {ch:?} at column {col}"),
      Self::UnterminatedString { line: _, col } => write!(f, "unterminated string starting at column {col}"),
      Self::Dedent { line: _ } => write!(f, "unindent does not match any outer indentation level"),
    }
  }
}

impl std::fmt::Display for ParseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Lex { err } => write!(f, "{err}"),
      Self::UnexpectedToken { tok, line: _, col } => write!(f, "unexpected token {tok:?} at column {col}"),
      Self::InvalidTarget { line: _ } => write!(f, "cannot assign to expression"),
      Self::UnexpectedEof => write!(f, "unexpected end of input"),
    }
  }
}

impl std::fmt::Display for LiteralError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Parse { err } => write!(f, "{err}"),
      Self::NotLiteral { text } => write!(f, "malformed literal {text:?}"),
    }
  }
}

impl std::fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Name(msg) => write!(f, "NameError: {msg}"),
      Self::Type(msg) => write!(f, "TypeError: {msg}"),
      Self::Value(msg) => write!(f, "ValueError: {msg}"),
      Self::Index(msg) => write!(f, "IndexError: {msg}"),
      Self::Key(repr) => write!(f, "KeyError: {repr}"),
      Self::Attribute(msg) => write!(f, "AttributeError: {msg}"),
      Self::Import(name) => write!(f, "ImportError: no module named '{name}'"),
      Self::ZeroDivision => write!(f, "ZeroDivisionError: division by zero"),
      Self::Overflow(msg) => write!(f, "OverflowError: {msg}"),
      Self::Recursion => write!(f, "RecursionError: maximum recursion depth exceeded"),
      Self::Hook(err) => write!(f, "{err}"),
    }
  }
}

impl std::fmt::Display for RuntimeError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.kind)
  }
}

impl std::error::Error for LexError {}
impl std::error::Error for ParseError {}
impl std::error::Error for LiteralError {}
impl std::error::Error for RuntimeError {}
