//! # Literal evaluation
//!
//! Turns the text of a literal (as produced by [`Value::repr`]) back into a value without running
//! any code. Accepted forms are `None`, booleans, numbers with an optional sign (including `inf` and
//! `nan`), strings, lists, tuples, dicts and `array([...])` of numbers.

use super::ast::{Expr, UnaryOp};
use super::errors::LiteralError;
use super::value::Value;

pub fn eval_literal(text: &str) -> Result<Value, LiteralError> {
  let expr = super::compile_expression(text)?;
  literal(&expr).ok_or_else(|| LiteralError::NotLiteral { text: text.trim().to_string() })
}

fn literal(expr: &Expr) -> Option<Value> {
  let items = |xs: &[Expr]| xs.iter().map(literal).collect::<Option<Vec<_>>>();
  match expr {
    Expr::None => Some(Value::None),
    Expr::Bool(b) => Some(Value::Bool(*b)),
    Expr::Int(n) => Some(Value::Int(*n)),
    Expr::Float(x) => Some(Value::Float(*x)),
    Expr::Str(s) => Some(Value::Str(s.clone())),
    Expr::List(xs) => items(xs).map(Value::List),
    Expr::Tuple(xs) => items(xs).map(Value::Tuple),
    Expr::Dict(kvs) => {
      let mut res: Vec<(Value, Value)> = Vec::with_capacity(kvs.len());
      for (k, v) in kvs {
        let (k, v) = (literal(k)?, literal(v)?);
        match res.iter_mut().find(|(l, _)| *l == k) {
          Some(entry) => entry.1 = v,
          None => res.push((k, v)),
        }
      }
      Some(Value::Dict(res))
    }
    // Spellings of non-finite floats.
    Expr::Name(name) if name == "inf" => Some(Value::Float(f64::INFINITY)),
    Expr::Name(name) if name == "nan" => Some(Value::Float(f64::NAN)),
    Expr::Unary(op @ (UnaryOp::Neg | UnaryOp::Pos), x) => match (op, x.as_ref()) {
      (UnaryOp::Neg, Expr::Int(n)) => Some(Value::Int(n.checked_neg()?)),
      (UnaryOp::Neg, Expr::Float(_) | Expr::Name(_)) => Some(Value::Float(-literal(x)?.as_f64()?)),
      (_, Expr::Int(n)) => Some(Value::Int(*n)),
      (_, Expr::Float(_) | Expr::Name(_)) => Some(Value::Float(literal(x)?.as_f64()?)),
      _ => None,
    },
    Expr::Call(f, args) => match (f.as_ref(), &args[..]) {
      (Expr::Name(name), [arg]) if name == "array" => match literal(arg)? {
        Value::List(xs) => xs.iter().map(Value::as_f64).collect::<Option<Vec<_>>>().map(Value::Array),
        _ => None,
      },
      _ => None,
    },
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reads_back_reprs() {
    let v = Value::Dict(vec![
      (Value::from("a"), Value::List(vec![Value::Int(-3), Value::Float(2.5)])),
      (Value::from("b"), Value::Tuple(vec![Value::None, Value::Bool(true)])),
      (Value::from("c"), Value::Array(vec![1.0, -2.0])),
    ]);
    assert_eq!(eval_literal(&v.repr()).unwrap(), v);
  }

  #[test]
  fn test_reads_non_finite_floats() {
    let v = Value::List(vec![Value::Float(f64::INFINITY), Value::Float(f64::NEG_INFINITY)]);
    assert_eq!(eval_literal(&v.repr()).unwrap(), v);
    assert_eq!(eval_literal("array([1.0, -inf])").unwrap(), Value::Array(vec![1.0, f64::NEG_INFINITY]));
    assert!(matches!(eval_literal("nan"), Ok(Value::Float(x)) if x.is_nan()));
    assert!(matches!(eval_literal("-True"), Err(LiteralError::NotLiteral { .. })));
  }

  #[test]
  fn test_rejects_code() {
    assert!(matches!(eval_literal("len([1])"), Err(LiteralError::NotLiteral { .. })));
    assert!(matches!(eval_literal("x + 1"), Err(LiteralError::NotLiteral { .. })));
    assert!(matches!(eval_literal("[1,"), Err(LiteralError::Parse { .. })));
  }
}
