//! # Runtime values
//!
//! Values have value semantics: containers own their elements, so [`Clone`] always produces an
//! independent deep copy. Only code (functions) and modules are shared behind [`Rc`].

use std::collections::BTreeMap;
use std::fmt::{Formatter, Write};
use std::rc::Rc;

use super::ast::FunctionDef;

/// Variable bindings, keyed by name.
pub type Env = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub enum Value {
  None,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  List(Vec<Value>),
  Tuple(Vec<Value>),
  /// Insertion-ordered mapping.
  Dict(Vec<(Value, Value)>),
  /// Numeric array, written `array([...])`.
  Array(Vec<f64>),
  Function(Rc<FunctionDef>),
  Builtin(Builtin),
  Module(Rc<Module>),
}

#[derive(Debug)]
pub struct Module {
  pub name: String,
  pub members: Env,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
  Print,
  Len,
  Range,
  Str,
  Int,
  Float,
  Bool,
  Abs,
  Min,
  Max,
  Sum,
  Sorted,
  List,
  Round,
  Locals,
  Globals,
  Array,
  Hole,
  Sqrt,
  Floor,
  Ceil,
  Pow,
}

impl Builtin {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Print => "print",
      Self::Len => "len",
      Self::Range => "range",
      Self::Str => "str",
      Self::Int => "int",
      Self::Float => "float",
      Self::Bool => "bool",
      Self::Abs => "abs",
      Self::Min => "min",
      Self::Max => "max",
      Self::Sum => "sum",
      Self::Sorted => "sorted",
      Self::List => "list",
      Self::Round => "round",
      Self::Locals => "locals",
      Self::Globals => "globals",
      Self::Array => "array",
      Self::Hole => super::interp::HOLE_HOOK,
      Self::Sqrt => "sqrt",
      Self::Floor => "floor",
      Self::Ceil => "ceil",
      Self::Pow => "pow",
    }
  }
}

impl Value {
  pub fn type_name(&self) -> &'static str {
    match self {
      Self::None => "NoneType",
      Self::Bool(_) => "bool",
      Self::Int(_) => "int",
      Self::Float(_) => "float",
      Self::Str(_) => "str",
      Self::List(_) => "list",
      Self::Tuple(_) => "tuple",
      Self::Dict(_) => "dict",
      Self::Array(_) => "ndarray",
      Self::Function(_) => "function",
      Self::Builtin(_) => "builtin_function_or_method",
      Self::Module(_) => "module",
    }
  }

  pub fn is_none(&self) -> bool {
    matches!(self, Self::None)
  }

  pub fn is_module(&self) -> bool {
    matches!(self, Self::Module(_))
  }

  /// Whether the value can be written as a literal and read back by [`super::eval_literal`].
  pub fn is_literal(&self) -> bool {
    match self {
      // Its magnitude does not fit an integer literal, so the text would read back as a float.
      Self::Int(i64::MIN) => false,
      Self::None | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_) | Self::Array(_) => true,
      Self::List(xs) | Self::Tuple(xs) => xs.iter().all(Self::is_literal),
      Self::Dict(kvs) => kvs.iter().all(|(k, v)| k.is_literal() && v.is_literal()),
      Self::Function(_) | Self::Builtin(_) | Self::Module(_) => false,
    }
  }

  pub fn truthy(&self) -> bool {
    match self {
      Self::None => false,
      Self::Bool(b) => *b,
      Self::Int(n) => *n != 0,
      Self::Float(x) => *x != 0.0,
      Self::Str(s) => !s.is_empty(),
      Self::List(xs) | Self::Tuple(xs) => !xs.is_empty(),
      Self::Dict(kvs) => !kvs.is_empty(),
      Self::Array(xs) => !xs.is_empty(),
      Self::Function(_) | Self::Builtin(_) | Self::Module(_) => true,
    }
  }

  /// Numeric view of booleans, integers and floats.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
      Self::Int(n) => Some(*n as f64),
      Self::Float(x) => Some(*x),
      _ => None,
    }
  }

  /// Integer view of booleans and integers.
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Bool(b) => Some(*b as i64),
      Self::Int(n) => Some(*n),
      _ => None,
    }
  }

  /// Returns the literal representation, e.g. `'abc'` for a string.
  pub fn repr(&self) -> String {
    let mut s = String::new();
    // Writing into a `String` cannot fail.
    let _ = write!(s, "{}", Repr(self));
    s
  }

  fn print(&self, f: &mut Formatter<'_>, repr: bool) -> std::fmt::Result {
    /// Prints a sequence of items separated by commas.
    fn items<'v>(f: &mut Formatter<'_>, xs: impl Iterator<Item = &'v Value>) -> std::fmt::Result {
      for (i, x) in xs.enumerate() {
        if i != 0 {
          write!(f, ", ")?;
        }
        x.print(f, true)?;
      }
      Ok(())
    }
    match self {
      Self::None => write!(f, "None"),
      Self::Bool(true) => write!(f, "True"),
      Self::Bool(false) => write!(f, "False"),
      Self::Int(n) => write!(f, "{n}"),
      Self::Float(x) => write!(f, "{}", float_repr(*x)),
      Self::Str(s) if !repr => write!(f, "{s}"),
      Self::Str(s) => {
        write!(f, "'")?;
        for c in s.chars() {
          match c {
            '\'' => write!(f, "\\'")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c => write!(f, "{c}")?,
          }
        }
        write!(f, "'")
      }
      Self::List(xs) => {
        write!(f, "[")?;
        items(f, xs.iter())?;
        write!(f, "]")
      }
      Self::Tuple(xs) => {
        write!(f, "(")?;
        items(f, xs.iter())?;
        if xs.len() == 1 {
          write!(f, ",")?;
        }
        write!(f, ")")
      }
      Self::Dict(kvs) => {
        write!(f, "{{")?;
        for (i, (k, v)) in kvs.iter().enumerate() {
          if i != 0 {
            write!(f, ", ")?;
          }
          k.print(f, true)?;
          write!(f, ": ")?;
          v.print(f, true)?;
        }
        write!(f, "}}")
      }
      Self::Array(xs) => {
        write!(f, "array([")?;
        for (i, x) in xs.iter().enumerate() {
          if i != 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", float_repr(*x))?;
        }
        write!(f, "])")
      }
      Self::Function(def) => write!(f, "<function {}>", def.name),
      Self::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
      Self::Module(m) => write!(f, "<module '{}'>", m.name),
    }
  }
}

/// Formats a float the way the scripting language prints it: integral values keep a `.0`.
fn float_repr(x: f64) -> String {
  if x.is_nan() {
    "nan".into()
  } else if x.is_infinite() {
    if x > 0.0 { "inf".into() } else { "-inf".into() }
  } else if x.fract() == 0.0 && x.abs() < 1e16 {
    format!("{x:.1}")
  } else if x.abs() >= 1e16 {
    format!("{x:e}")
  } else {
    format!("{x}")
  }
}

/// Literal representation wrapper, see [`Value::repr`].
pub struct Repr<'v>(pub &'v Value);

impl std::fmt::Display for Repr<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    self.0.print(f, true)
  }
}

/// Prints like the `print` builtin.
impl std::fmt::Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    self.print(f, false)
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::None, Self::None) => true,
      (Self::Str(a), Self::Str(b)) => a == b,
      (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
      (Self::Dict(a), Self::Dict(b)) => a.len() == b.len() && a.iter().all(|(k, v)| b.iter().any(|(l, w)| k == l && v == w)),
      (Self::Array(a), Self::Array(b)) => a == b,
      (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
      (Self::Builtin(a), Self::Builtin(b)) => a == b,
      (Self::Module(a), Self::Module(b)) => a.name == b.name,
      (Self::Int(a), Self::Int(b)) => a == b,
      (a, b) => match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
      },
    }
  }
}

impl From<i64> for Value {
  fn from(n: i64) -> Self {
    Self::Int(n)
  }
}

impl From<f64> for Value {
  fn from(x: f64) -> Self {
    Self::Float(x)
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Self::Bool(b)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Self::Str(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Self::Str(s)
  }
}
