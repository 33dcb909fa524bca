//! Operators, builtin functions, methods and library modules.

use std::cmp::Ordering;
use std::rc::Rc;

use super::ast::BinOp;
use super::errors::{ErrorKind, RuntimeError};
use super::value::{Builtin, Env, Module, Value};

pub fn builtin(name: &str) -> Option<Builtin> {
  let b = match name {
    "print" => Builtin::Print,
    "len" => Builtin::Len,
    "range" => Builtin::Range,
    "str" => Builtin::Str,
    "int" => Builtin::Int,
    "float" => Builtin::Float,
    "bool" => Builtin::Bool,
    "abs" => Builtin::Abs,
    "min" => Builtin::Min,
    "max" => Builtin::Max,
    "sum" => Builtin::Sum,
    "sorted" => Builtin::Sorted,
    "list" => Builtin::List,
    "round" => Builtin::Round,
    "locals" => Builtin::Locals,
    "globals" => Builtin::Globals,
    "array" => Builtin::Array,
    super::interp::HOLE_HOOK => Builtin::Hole,
    _ => return None,
  };
  Some(b)
}

/// Library modules available to `import`.
pub fn module(name: &str) -> Option<Rc<Module>> {
  let mut members = Env::new();
  match name {
    "math" => {
      members.insert("pi".into(), Value::Float(std::f64::consts::PI));
      members.insert("e".into(), Value::Float(std::f64::consts::E));
      members.insert("inf".into(), Value::Float(f64::INFINITY));
      for b in [Builtin::Sqrt, Builtin::Floor, Builtin::Ceil, Builtin::Pow] {
        members.insert(b.name().into(), Value::Builtin(b));
      }
    }
    "numpy" => {
      members.insert("pi".into(), Value::Float(std::f64::consts::PI));
      for b in [Builtin::Array, Builtin::Sqrt, Builtin::Abs, Builtin::Sum, Builtin::Min, Builtin::Max] {
        members.insert(b.name().into(), Value::Builtin(b));
      }
    }
    _ => return None,
  }
  Some(Rc::new(Module { name: name.to_string(), members }))
}

pub fn member(m: &Module, name: &str) -> Result<Value, RuntimeError> {
  m.members
    .get(name)
    .cloned()
    .ok_or_else(|| RuntimeError::new(ErrorKind::Attribute(format!("module '{}' has no attribute '{name}'", m.name))))
}

/// Returns the items produced by iterating over `v`.
pub fn iterate(v: &Value) -> Result<Vec<Value>, RuntimeError> {
  match v {
    Value::List(xs) | Value::Tuple(xs) => Ok(xs.clone()),
    Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
    Value::Dict(kvs) => Ok(kvs.iter().map(|(k, _)| k.clone()).collect()),
    Value::Array(xs) => Ok(xs.iter().map(|x| Value::Float(*x)).collect()),
    v => Err(RuntimeError::type_error(format!("'{}' object is not iterable", v.type_name()))),
  }
}

/// Normalises a possibly negative sequence index.
fn position(ix: &Value, len: usize) -> Result<usize, RuntimeError> {
  let n = ix
    .as_i64()
    .ok_or_else(|| RuntimeError::type_error(format!("indices must be integers, not '{}'", ix.type_name())))?;
  let m = if n < 0 { n + len as i64 } else { n };
  if m < 0 || m as usize >= len {
    return Err(RuntimeError::index("index out of range"));
  }
  Ok(m as usize)
}

pub fn index(x: &Value, ix: &Value) -> Result<Value, RuntimeError> {
  match x {
    Value::List(xs) | Value::Tuple(xs) => Ok(xs[position(ix, xs.len())?].clone()),
    Value::Array(xs) => Ok(Value::Float(xs[position(ix, xs.len())?])),
    Value::Str(s) => {
      let chars: Vec<char> = s.chars().collect();
      Ok(Value::Str(chars[position(ix, chars.len())?].to_string()))
    }
    Value::Dict(kvs) => kvs
      .iter()
      .find(|(k, _)| k == ix)
      .map(|(_, v)| v.clone())
      .ok_or_else(|| RuntimeError::key(ix.repr())),
    x => Err(RuntimeError::type_error(format!("'{}' object is not subscriptable", x.type_name()))),
  }
}

pub fn item_mut<'v>(x: &'v mut Value, ix: &Value) -> Result<&'v mut Value, RuntimeError> {
  match x {
    Value::List(xs) => {
      let i = position(ix, xs.len())?;
      Ok(&mut xs[i])
    }
    Value::Dict(kvs) => kvs
      .iter_mut()
      .find(|(k, _)| k == ix)
      .map(|(_, v)| v)
      .ok_or_else(|| RuntimeError::key(ix.repr())),
    x => Err(RuntimeError::type_error(format!("'{}' object does not support item assignment", x.type_name()))),
  }
}

pub fn set_item(x: &mut Value, ix: &Value, v: Value) -> Result<(), RuntimeError> {
  match x {
    Value::List(xs) => {
      let i = position(ix, xs.len())?;
      xs[i] = v;
    }
    Value::Array(xs) => {
      let i = position(ix, xs.len())?;
      xs[i] = v
        .as_f64()
        .ok_or_else(|| RuntimeError::type_error(format!("cannot store '{}' in a numeric array", v.type_name())))?;
    }
    Value::Dict(kvs) => match kvs.iter_mut().find(|(k, _)| k == ix) {
      Some(entry) => entry.1 = v,
      None => kvs.push((ix.clone(), v)),
    },
    x => {
      return Err(RuntimeError::type_error(format!("'{}' object does not support item assignment", x.type_name())))
    }
  }
  Ok(())
}

pub fn slice(x: &Value, lo: Option<&Value>, hi: Option<&Value>) -> Result<Value, RuntimeError> {
  fn bounds(lo: Option<&Value>, hi: Option<&Value>, len: usize) -> Result<(usize, usize), RuntimeError> {
    let clamp = |v: Option<&Value>, default: usize| -> Result<usize, RuntimeError> {
      match v {
        None | Some(Value::None) => Ok(default),
        Some(v) => {
          let n = v.as_i64().ok_or_else(|| RuntimeError::type_error("slice indices must be integers"))?;
          let n = if n < 0 { n + len as i64 } else { n };
          Ok(n.clamp(0, len as i64) as usize)
        }
      }
    };
    let lo = clamp(lo, 0)?;
    let hi = clamp(hi, len)?;
    Ok((lo, hi.max(lo)))
  }
  match x {
    Value::List(xs) => {
      let (lo, hi) = bounds(lo, hi, xs.len())?;
      Ok(Value::List(xs[lo..hi].to_vec()))
    }
    Value::Tuple(xs) => {
      let (lo, hi) = bounds(lo, hi, xs.len())?;
      Ok(Value::Tuple(xs[lo..hi].to_vec()))
    }
    Value::Array(xs) => {
      let (lo, hi) = bounds(lo, hi, xs.len())?;
      Ok(Value::Array(xs[lo..hi].to_vec()))
    }
    Value::Str(s) => {
      let chars: Vec<char> = s.chars().collect();
      let (lo, hi) = bounds(lo, hi, chars.len())?;
      Ok(Value::Str(chars[lo..hi].iter().collect()))
    }
    x => Err(RuntimeError::type_error(format!("'{}' object is not subscriptable", x.type_name()))),
  }
}

pub fn contains(container: &Value, x: &Value) -> Result<bool, RuntimeError> {
  match (container, x) {
    (Value::Str(s), Value::Str(t)) => Ok(s.contains(t.as_str())),
    (Value::Str(_), x) => Err(RuntimeError::type_error(format!(
      "'in <string>' requires string as left operand, not {}",
      x.type_name()
    ))),
    (Value::List(xs) | Value::Tuple(xs), x) => Ok(xs.contains(x)),
    (Value::Dict(kvs), x) => Ok(kvs.iter().any(|(k, _)| k == x)),
    (Value::Array(xs), x) => Ok(x.as_f64().is_some_and(|x| xs.contains(&x))),
    (c, _) => Err(RuntimeError::type_error(format!("argument of type '{}' is not iterable", c.type_name()))),
  }
}

/// Total order used by `<`, `sorted`, `min` and `max`.
pub fn order(a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
  match (a, b) {
    (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
    (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
    (Value::List(xs), Value::List(ys)) | (Value::Tuple(xs), Value::Tuple(ys)) => {
      for (x, y) in xs.iter().zip(ys) {
        match order(x, y)? {
          Ordering::Equal => {}
          o => return Ok(o),
        }
      }
      Ok(xs.len().cmp(&ys.len()))
    }
    (a, b) => match (a.as_f64(), b.as_f64()) {
      (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| RuntimeError::value_error("cannot order NaN")),
      _ => Err(RuntimeError::type_error(format!(
        "'<' not supported between instances of '{}' and '{}'",
        a.type_name(),
        b.type_name()
      ))),
    },
  }
}

pub fn negate(x: Value) -> Result<Value, RuntimeError> {
  match x {
    Value::Bool(b) => Ok(Value::Int(-(b as i64))),
    Value::Int(n) => Ok(n.checked_neg().map(Value::Int).unwrap_or(Value::Float(-(n as f64)))),
    Value::Float(x) => Ok(Value::Float(-x)),
    Value::Array(xs) => Ok(Value::Array(xs.into_iter().map(|x| -x).collect())),
    x => Err(RuntimeError::type_error(format!("bad operand type for unary -: '{}'", x.type_name()))),
  }
}

fn op_symbol(op: BinOp) -> &'static str {
  match op {
    BinOp::Add => "+",
    BinOp::Sub => "-",
    BinOp::Mul => "*",
    BinOp::Div => "/",
    BinOp::FloorDiv => "//",
    BinOp::Mod => "%",
    BinOp::Pow => "**",
  }
}

fn float_op(op: BinOp, x: f64, y: f64) -> Result<f64, RuntimeError> {
  match op {
    BinOp::Add => Ok(x + y),
    BinOp::Sub => Ok(x - y),
    BinOp::Mul => Ok(x * y),
    BinOp::Div | BinOp::FloorDiv | BinOp::Mod if y == 0.0 => Err(RuntimeError::new(ErrorKind::ZeroDivision)),
    BinOp::Div => Ok(x / y),
    BinOp::FloorDiv => Ok((x / y).floor()),
    BinOp::Mod => Ok(x - y * (x / y).floor()),
    BinOp::Pow => Ok(x.powf(y)),
  }
}

fn int_op(op: BinOp, x: i64, y: i64) -> Result<Value, RuntimeError> {
  let checked = match op {
    BinOp::Add => x.checked_add(y),
    BinOp::Sub => x.checked_sub(y),
    BinOp::Mul => x.checked_mul(y),
    BinOp::Div => return float_op(op, x as f64, y as f64).map(Value::Float),
    BinOp::FloorDiv | BinOp::Mod if y == 0 => return Err(RuntimeError::new(ErrorKind::ZeroDivision)),
    BinOp::FloorDiv => x.checked_div_euclid(y).map(|q| if y < 0 && x.rem_euclid(y) != 0 { q - 1 } else { q }),
    BinOp::Mod => x.checked_rem_euclid(y).map(|r| if y < 0 && r != 0 { r + y } else { r }),
    BinOp::Pow if y < 0 => return float_op(op, x as f64, y as f64).map(Value::Float),
    BinOp::Pow => u32::try_from(y).ok().and_then(|y| x.checked_pow(y)),
  };
  // Integers that overflow degrade to floats.
  match checked {
    Some(n) => Ok(Value::Int(n)),
    None => float_op(op, x as f64, y as f64).map(Value::Float),
  }
}

/// Longest sequence a single operation may build.
const MAX_LEN: usize = 1 << 28;

/// Length of `len` items repeated `n` times, if it stays within [`MAX_LEN`].
fn repeat_len(len: usize, n: i64) -> Result<usize, RuntimeError> {
  let n = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
  len
    .checked_mul(n)
    .filter(|total| *total <= MAX_LEN)
    .ok_or_else(|| RuntimeError::overflow("repeated sequence is too long"))
}

fn repeat<T: Clone>(xs: &[T], n: i64) -> Result<Vec<T>, RuntimeError> {
  let total = repeat_len(xs.len(), n)?;
  Ok(xs.iter().cloned().cycle().take(total).collect())
}

pub fn binary(op: BinOp, a: Value, b: Value) -> Result<Value, RuntimeError> {
  match (op, a, b) {
    (op, Value::Int(x), Value::Int(y)) => int_op(op, x, y),
    (op, Value::Array(xs), Value::Array(ys)) => {
      if xs.len() != ys.len() {
        return Err(RuntimeError::value_error(format!(
          "operands could not be broadcast together with shapes ({},) ({},)",
          xs.len(),
          ys.len()
        )));
      }
      let zs = xs.iter().zip(&ys).map(|(x, y)| float_op(op, *x, *y)).collect::<Result<_, _>>()?;
      Ok(Value::Array(zs))
    }
    (op, Value::Array(xs), y) if y.as_f64().is_some() => {
      let y = y.as_f64().unwrap_or_default();
      Ok(Value::Array(xs.into_iter().map(|x| float_op(op, x, y)).collect::<Result<_, _>>()?))
    }
    (op, x, Value::Array(ys)) if x.as_f64().is_some() => {
      let x = x.as_f64().unwrap_or_default();
      Ok(Value::Array(ys.into_iter().map(|y| float_op(op, x, y)).collect::<Result<_, _>>()?))
    }
    (BinOp::Add, Value::Str(x), Value::Str(y)) => Ok(Value::Str(x + &y)),
    (BinOp::Add, Value::List(mut xs), Value::List(ys)) => {
      xs.extend(ys);
      Ok(Value::List(xs))
    }
    (BinOp::Add, Value::Tuple(mut xs), Value::Tuple(ys)) => {
      xs.extend(ys);
      Ok(Value::Tuple(xs))
    }
    (BinOp::Mul, Value::Str(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Str(s)) => {
      repeat_len(s.len(), n)?;
      Ok(Value::Str(s.repeat(n.max(0) as usize)))
    }
    (BinOp::Mul, Value::List(xs), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::List(xs)) => {
      Ok(Value::List(repeat(&xs, n)?))
    }
    (BinOp::Mod, Value::Str(fmt), arg) => format_percent(&fmt, arg),
    (op, a, b) => match (a.as_i64(), b.as_i64(), a.as_f64(), b.as_f64()) {
      (Some(x), Some(y), _, _) => int_op(op, x, y),
      (_, _, Some(x), Some(y)) => float_op(op, x, y).map(Value::Float),
      _ => Err(RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op_symbol(op),
        a.type_name(),
        b.type_name()
      ))),
    },
  }
}

/// `%`-formatting with `%s`, `%d`, `%f` and `%%`.
fn format_percent(fmt: &str, arg: Value) -> Result<Value, RuntimeError> {
  let args = match arg {
    Value::Tuple(xs) => xs,
    x => vec![x],
  };
  let mut args = args.into_iter();
  let mut res = String::new();
  let mut chars = fmt.chars();
  while let Some(c) = chars.next() {
    if c != '%' {
      res.push(c);
      continue;
    }
    let conv = chars.next().ok_or_else(|| RuntimeError::value_error("incomplete format"))?;
    if conv == '%' {
      res.push('%');
      continue;
    }
    let arg = args.next().ok_or_else(|| RuntimeError::type_error("not enough arguments for format string"))?;
    match conv {
      's' => res.push_str(&arg.to_string()),
      'r' => res.push_str(&arg.repr()),
      'd' => match arg.as_f64() {
        Some(x) => res.push_str(&(x.trunc() as i64).to_string()),
        None => return Err(RuntimeError::type_error("%d format: a number is required")),
      },
      'f' => match arg.as_f64() {
        Some(x) => res.push_str(&format!("{x:.6}")),
        None => return Err(RuntimeError::type_error("%f format: a number is required")),
      },
      c => return Err(RuntimeError::value_error(format!("unsupported format character '{c}'"))),
    }
  }
  Ok(Value::Str(res))
}

fn arity(b: Builtin, args: &[Value], min: usize, max: usize) -> Result<(), RuntimeError> {
  if args.len() < min || args.len() > max {
    return Err(RuntimeError::type_error(format!("{}() got {} arguments", b.name(), args.len())));
  }
  Ok(())
}

fn number(b: Builtin, v: &Value) -> Result<f64, RuntimeError> {
  v.as_f64()
    .ok_or_else(|| RuntimeError::type_error(format!("{}() requires a number, not '{}'", b.name(), v.type_name())))
}

/// Arguments of `min`, `max` and `sum`: a single iterable, or the arguments themselves.
fn spread(args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
  match <[Value; 1]>::try_from(args) {
    Ok([single]) => iterate(&single),
    Err(args) => Ok(args),
  }
}

fn extremum(b: Builtin, args: Vec<Value>, keep: Ordering) -> Result<Value, RuntimeError> {
  let mut items = spread(args)?.into_iter();
  let mut best = items.next().ok_or_else(|| RuntimeError::value_error(format!("{}() arg is an empty sequence", b.name())))?;
  for x in items {
    if order(&x, &best)? == keep {
      best = x;
    }
  }
  Ok(best)
}

/// Calls a builtin function that needs no interpreter state.
pub fn call(b: Builtin, args: Vec<Value>) -> Result<Value, RuntimeError> {
  match b {
    Builtin::Len => {
      arity(b, &args, 1, 1)?;
      let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(xs) | Value::Tuple(xs) => xs.len(),
        Value::Dict(kvs) => kvs.len(),
        Value::Array(xs) => xs.len(),
        x => return Err(RuntimeError::type_error(format!("object of type '{}' has no len()", x.type_name()))),
      };
      Ok(Value::Int(n as i64))
    }
    Builtin::Range => {
      arity(b, &args, 1, 3)?;
      let ns = args
        .iter()
        .map(|v| v.as_i64().ok_or_else(|| RuntimeError::type_error("range() arguments must be integers")))
        .collect::<Result<Vec<_>, _>>()?;
      let (start, stop, step) = match ns[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(RuntimeError::type_error("range expected at most 3 arguments")),
      };
      if step == 0 {
        return Err(RuntimeError::value_error("range() arg 3 must not be zero"));
      }
      let (lo, hi) = if step > 0 { (start, stop) } else { (stop, start) };
      let span = i128::from(hi) - i128::from(lo);
      let len = if span > 0 { (span - 1) / i128::from(step).abs() + 1 } else { 0 };
      if len > MAX_LEN as i128 {
        return Err(RuntimeError::overflow("range is too long"));
      }
      let mut res = Vec::with_capacity(len as usize);
      let mut i = Some(start);
      while let Some(n) = i.filter(|n| (step > 0 && *n < stop) || (step < 0 && *n > stop)) {
        res.push(Value::Int(n));
        i = n.checked_add(step);
      }
      Ok(Value::List(res))
    }
    Builtin::Str => {
      arity(b, &args, 0, 1)?;
      Ok(Value::Str(args.first().map(|v| v.to_string()).unwrap_or_default()))
    }
    Builtin::Int => {
      arity(b, &args, 0, 1)?;
      match args.into_iter().next() {
        None => Ok(Value::Int(0)),
        Some(Value::Str(s)) => s
          .trim()
          .parse::<i64>()
          .map(Value::Int)
          .map_err(|_| RuntimeError::value_error(format!("invalid literal for int(): {}", Value::Str(s.clone()).repr()))),
        Some(Value::Float(x)) => Ok(Value::Int(x.trunc() as i64)),
        Some(v) => v
          .as_i64()
          .map(Value::Int)
          .ok_or_else(|| RuntimeError::type_error(format!("int() argument must be a string or a number, not '{}'", v.type_name()))),
      }
    }
    Builtin::Float => {
      arity(b, &args, 0, 1)?;
      match args.into_iter().next() {
        None => Ok(Value::Float(0.0)),
        Some(Value::Str(s)) => s
          .trim()
          .parse::<f64>()
          .map(Value::Float)
          .map_err(|_| RuntimeError::value_error(format!("could not convert string to float: {}", Value::Str(s.clone()).repr()))),
        Some(v) => number(b, &v).map(Value::Float),
      }
    }
    Builtin::Bool => {
      arity(b, &args, 0, 1)?;
      Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
    }
    Builtin::Abs => {
      arity(b, &args, 1, 1)?;
      match &args[0] {
        Value::Int(n) => Ok(n.checked_abs().map(Value::Int).unwrap_or(Value::Float((*n as f64).abs()))),
        Value::Array(xs) => Ok(Value::Array(xs.iter().map(|x| x.abs()).collect())),
        v => number(b, v).map(|x| Value::Float(x.abs())),
      }
    }
    Builtin::Min => extremum(b, args, Ordering::Less),
    Builtin::Max => extremum(b, args, Ordering::Greater),
    Builtin::Sum => {
      let mut total = Value::Int(0);
      for x in spread(args)? {
        total = binary(BinOp::Add, total, x)?;
      }
      Ok(total)
    }
    Builtin::Sorted => {
      arity(b, &args, 1, 1)?;
      let mut items = iterate(&args[0])?;
      let mut err = None;
      items.sort_by(|x, y| {
        order(x, y).unwrap_or_else(|e| {
          err.get_or_insert(e);
          Ordering::Equal
        })
      });
      match err {
        Some(e) => Err(e),
        None => Ok(Value::List(items)),
      }
    }
    Builtin::List => {
      arity(b, &args, 0, 1)?;
      match args.first() {
        None => Ok(Value::List(Vec::new())),
        Some(v) => iterate(v).map(Value::List),
      }
    }
    Builtin::Round => {
      arity(b, &args, 1, 2)?;
      let x = number(b, &args[0])?;
      match args.get(1) {
        None => Ok(Value::Int(x.round() as i64)),
        Some(d) => {
          let d = d.as_i64().ok_or_else(|| RuntimeError::type_error("round() digits must be an integer"))?;
          let scale = 10f64.powi(d as i32);
          Ok(Value::Float((x * scale).round() / scale))
        }
      }
    }
    Builtin::Array => {
      arity(b, &args, 1, 1)?;
      let xs = iterate(&args[0])?
        .iter()
        .map(|v| number(b, v))
        .collect::<Result<Vec<_>, _>>()?;
      Ok(Value::Array(xs))
    }
    Builtin::Sqrt => {
      arity(b, &args, 1, 1)?;
      match &args[0] {
        Value::Array(xs) => Ok(Value::Array(xs.iter().map(|x| x.sqrt()).collect())),
        v => {
          let x = number(b, v)?;
          if x < 0.0 {
            return Err(RuntimeError::value_error("math domain error"));
          }
          Ok(Value::Float(x.sqrt()))
        }
      }
    }
    Builtin::Floor => {
      arity(b, &args, 1, 1)?;
      Ok(Value::Int(number(b, &args[0])?.floor() as i64))
    }
    Builtin::Ceil => {
      arity(b, &args, 1, 1)?;
      Ok(Value::Int(number(b, &args[0])?.ceil() as i64))
    }
    Builtin::Pow => {
      arity(b, &args, 2, 2)?;
      Ok(Value::Float(number(b, &args[0])?.powf(number(b, &args[1])?)))
    }
    Builtin::Print | Builtin::Locals | Builtin::Globals | Builtin::Hole => {
      Err(RuntimeError::type_error(format!("{}() needs an interpreter", b.name())))
    }
  }
}

/// Calls a method on `recv`, mutating it in place where the method does.
pub fn call_method(recv: &mut Value, method: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
  let type_name = recv.type_name();
  let nargs = args.len();
  let bad_args = || RuntimeError::type_error(format!("{type_name}.{method}() got {nargs} arguments"));
  match (recv, method) {
    (Value::List(xs), "append") => {
      let [x] = <[Value; 1]>::try_from(args.clone()).map_err(|_| bad_args())?;
      xs.push(x);
      Ok(Value::None)
    }
    (Value::List(xs), "extend") => {
      let [x] = <[Value; 1]>::try_from(args.clone()).map_err(|_| bad_args())?;
      xs.extend(iterate(&x)?);
      Ok(Value::None)
    }
    (Value::List(xs), "insert") => {
      let [i, x] = <[Value; 2]>::try_from(args.clone()).map_err(|_| bad_args())?;
      let i = i.as_i64().ok_or_else(|| RuntimeError::type_error("list indices must be integers"))?;
      let len = xs.len() as i64;
      let i = if i < 0 { (i + len).max(0) } else { i.min(len) };
      xs.insert(i as usize, x);
      Ok(Value::None)
    }
    (Value::List(xs), "pop") => {
      if xs.is_empty() {
        return Err(RuntimeError::index("pop from empty list"));
      }
      let i = match args.first() {
        None => xs.len() - 1,
        Some(ix) => position(ix, xs.len())?,
      };
      Ok(xs.remove(i))
    }
    (Value::List(xs), "remove") => {
      let [x] = <[Value; 1]>::try_from(args.clone()).map_err(|_| bad_args())?;
      let i = xs
        .iter()
        .position(|y| *y == x)
        .ok_or_else(|| RuntimeError::value_error("list.remove(x): x not in list"))?;
      xs.remove(i);
      Ok(Value::None)
    }
    (Value::List(xs), "clear") => {
      xs.clear();
      Ok(Value::None)
    }
    (Value::List(xs), "sort") => {
      let sorted = call(Builtin::Sorted, vec![Value::List(std::mem::take(xs))])?;
      if let Value::List(ys) = sorted {
        *xs = ys;
      }
      Ok(Value::None)
    }
    (Value::List(xs) | Value::Tuple(xs), "index") => {
      let [x] = <[Value; 1]>::try_from(args.clone()).map_err(|_| bad_args())?;
      xs.iter()
        .position(|y| *y == x)
        .map(|i| Value::Int(i as i64))
        .ok_or_else(|| RuntimeError::value_error(format!("{} is not in list", x.repr())))
    }
    (Value::List(xs) | Value::Tuple(xs), "count") => {
      let [x] = <[Value; 1]>::try_from(args.clone()).map_err(|_| bad_args())?;
      Ok(Value::Int(xs.iter().filter(|y| **y == x).count() as i64))
    }
    (Value::Dict(kvs), "keys") => Ok(Value::List(kvs.iter().map(|(k, _)| k.clone()).collect())),
    (Value::Dict(kvs), "values") => Ok(Value::List(kvs.iter().map(|(_, v)| v.clone()).collect())),
    (Value::Dict(kvs), "items") => {
      Ok(Value::List(kvs.iter().map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()])).collect()))
    }
    (Value::Dict(kvs), "get") => {
      let mut args = args.into_iter();
      let key = args.next().ok_or_else(|| RuntimeError::type_error("get expected at least 1 argument"))?;
      let default = args.next().unwrap_or(Value::None);
      Ok(kvs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone()).unwrap_or(default))
    }
    (Value::Str(s), "upper") => Ok(Value::Str(s.to_uppercase())),
    (Value::Str(s), "lower") => Ok(Value::Str(s.to_lowercase())),
    (Value::Str(s), "strip") => Ok(Value::Str(s.trim().to_string())),
    (Value::Str(s), "split") => {
      let parts: Vec<Value> = match args.first() {
        None | Some(Value::None) => s.split_whitespace().map(Value::from).collect(),
        Some(Value::Str(sep)) if !sep.is_empty() => s.split(sep.as_str()).map(Value::from).collect(),
        Some(_) => return Err(RuntimeError::value_error("empty or non-string separator")),
      };
      Ok(Value::List(parts))
    }
    (Value::Str(s), "join") => {
      let [items] = <[Value; 1]>::try_from(args.clone()).map_err(|_| bad_args())?;
      let parts = iterate(&items)?
        .into_iter()
        .map(|v| match v {
          Value::Str(t) => Ok(t),
          v => Err(RuntimeError::type_error(format!("sequence item: expected str instance, {} found", v.type_name()))),
        })
        .collect::<Result<Vec<_>, _>>()?;
      Ok(Value::Str(parts.join(s.as_str())))
    }
    (Value::Str(s), "replace") => match &args[..] {
      [Value::Str(from), Value::Str(to)] => Ok(Value::Str(s.replace(from.as_str(), to))),
      _ => Err(bad_args()),
    },
    (Value::Str(s), "startswith") => match &args[..] {
      [Value::Str(p)] => Ok(Value::Bool(s.starts_with(p.as_str()))),
      _ => Err(bad_args()),
    },
    (Value::Str(s), "endswith") => match &args[..] {
      [Value::Str(p)] => Ok(Value::Bool(s.ends_with(p.as_str()))),
      _ => Err(bad_args()),
    },
    (Value::Array(xs), "tolist") => Ok(Value::List(xs.iter().map(|x| Value::Float(*x)).collect())),
    (Value::Array(xs), "sum") => Ok(Value::Float(xs.iter().sum())),
    (_, method) => Err(RuntimeError::attribute(type_name, method)),
  }
}
