//! # Syntax trees
//!
//! Statements carry the source line they start on, so runtime errors and hole resolution can refer
//! back to positions in the original file.

use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
  Add,
  Sub,
  Mul,
  Div,
  FloorDiv,
  Mod,
  Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
  In,
  NotIn,
  Is,
  IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Pos,
  Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  None,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  Name(String),
  List(Vec<Expr>),
  Tuple(Vec<Expr>),
  Dict(Vec<(Expr, Expr)>),
  Unary(UnaryOp, Box<Expr>),
  Binary(BinOp, Box<Expr>, Box<Expr>),
  /// Chained comparison `a < b <= c`.
  Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
  /// `then if cond else otherwise`.
  IfElse(Box<Expr>, Box<Expr>, Box<Expr>),
  Call(Box<Expr>, Vec<Expr>),
  Index(Box<Expr>, Box<Expr>),
  Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
  Attr(Box<Expr>, String),
}

/// Assignment targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
  Name(String),
  Index(Expr, Expr),
  Tuple(Vec<Target>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
  pub kind: StmtKind,
  pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
  Expr(Expr),
  Assign(Target, Expr),
  AugAssign(Target, BinOp, Expr),
  If(Vec<(Expr, Vec<Stmt>)>, Vec<Stmt>),
  While(Expr, Vec<Stmt>),
  For(Target, Expr, Vec<Stmt>),
  Def(Rc<FunctionDef>),
  Return(Option<Expr>),
  Import(String, Option<String>),
  Global(Vec<String>),
  Pass,
  Break,
  Continue,
}

#[derive(Debug, PartialEq)]
pub struct FunctionDef {
  pub name: String,
  pub params: Vec<String>,
  pub body: Vec<Stmt>,
  pub line: usize,
}

/// A parsed program: its top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub body: Vec<Stmt>,
}

impl Target {
  /// Converts an expression on the left-hand side of `=` into a target.
  pub fn from_expr(expr: Expr) -> Option<Self> {
    match expr {
      Expr::Name(name) => Some(Self::Name(name)),
      Expr::Index(x, i) => Some(Self::Index(*x, *i)),
      Expr::Tuple(xs) | Expr::List(xs) => xs.into_iter().map(Self::from_expr).collect::<Option<_>>().map(Self::Tuple),
      _ => None,
    }
  }
}
