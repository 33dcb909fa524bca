//! # Tree-walking interpreter
//!
//! Executes a [`Program`] statement by statement on the calling thread. Module-level code binds
//! globals; every function call gets a fresh frame of locals. Name lookup goes locals, globals,
//! then builtins.
//!
//! The hole hook ([`HOLE_HOOK`]) is an ordinary builtin call: when the rewritten program reaches
//! it, control transfers synchronously to the installed [`HoleHook`], whose result becomes the
//! value of the call expression.

use std::io::Write;
use std::rc::Rc;

use super::ast::{CmpOp, Expr, FunctionDef, Program, Stmt, StmtKind, Target, UnaryOp};
use super::builtins;
use super::errors::{ErrorKind, RuntimeError};
use super::value::{Builtin, Env, Value};

/// Name of the builtin that rewritten hole sites call.
pub const HOLE_HOOK: &str = "__sketch_hole__";

/// Maximum number of nested function frames.
pub const MAX_DEPTH: usize = 200;

/// Receives control when execution reaches a hole site.
///
/// `locals` is a copy of the bindings at the call site; `globals` is the module namespace at the
/// same moment.
pub trait HoleHook {
  fn resolve(&mut self, line: usize, locals: Env, globals: &Env) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// Non-local control flow out of a statement.
enum Flow {
  Normal,
  Return(Value),
  Break,
  Continue,
}

#[derive(Debug, Default)]
struct Frame {
  locals: Env,
  globals_decl: Vec<String>,
}

pub struct Interpreter<'a> {
  globals: Env,
  frames: Vec<Frame>,
  out: &'a mut dyn Write,
  hook: Option<&'a mut dyn HoleHook>,
}

impl<'a> Interpreter<'a> {
  /// Creates an interpreter with a fresh module namespace. `print` writes to `out`.
  pub fn new(out: &'a mut dyn Write) -> Self {
    let mut globals = Env::new();
    globals.insert("__name__".into(), Value::from("__main__"));
    Self::with_globals(out, globals)
  }

  /// Creates an interpreter whose module namespace is `globals`.
  pub fn with_globals(out: &'a mut dyn Write, globals: Env) -> Self {
    Self { globals, frames: Vec::new(), out, hook: None }
  }

  /// Installs the receiver of hole calls.
  pub fn with_hook(mut self, hook: &'a mut dyn HoleHook) -> Self {
    self.hook = Some(hook);
    self
  }

  pub fn globals(&self) -> &Env {
    &self.globals
  }

  pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
    self.globals.insert(name.into(), value);
  }

  /// Bindings of the innermost frame, or the module namespace at top level.
  pub fn locals(&self) -> &Env {
    match self.frames.last() {
      Some(frame) => &frame.locals,
      None => &self.globals,
    }
  }

  /// Runs the top-level statements of `program` to completion.
  pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
    match self.exec_block(&program.body)? {
      Flow::Normal | Flow::Return(_) => Ok(()),
      Flow::Break | Flow::Continue => Err(RuntimeError::type_error("'break' or 'continue' outside loop")),
    }
  }

  /// Evaluates `expr` with `locals` as the local namespace and the interpreter's globals as the
  /// global namespace.
  pub fn eval_expression(&mut self, expr: &Expr, locals: Env) -> Result<Value, RuntimeError> {
    self.frames.push(Frame { locals, globals_decl: Vec::new() });
    let res = self.eval(expr);
    self.frames.pop();
    res
  }

  fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, RuntimeError> {
    for stmt in body {
      match self.exec(stmt)? {
        Flow::Normal => {}
        flow => return Ok(flow),
      }
    }
    Ok(Flow::Normal)
  }

  fn exec(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
    self.exec_kind(&stmt.kind).map_err(|e| e.at(stmt.line))
  }

  fn exec_kind(&mut self, kind: &StmtKind) -> Result<Flow, RuntimeError> {
    match kind {
      StmtKind::Expr(e) => {
        self.eval(e)?;
      }
      StmtKind::Assign(target, e) => {
        let v = self.eval(e)?;
        self.assign(target, v)?;
      }
      StmtKind::AugAssign(target, op, e) => {
        let rhs = self.eval(e)?;
        match target {
          Target::Name(name) => {
            let lhs = self.lookup(name)?;
            let v = builtins::binary(*op, lhs, rhs)?;
            self.scope_mut(name).insert(name.clone(), v);
          }
          Target::Index(x, i) => {
            let (name, mut path) = self.place(x)?;
            path.push(self.eval(i)?);
            let lhs = self.slot_mut(&name, &path)?.clone();
            let v = builtins::binary(*op, lhs, rhs)?;
            self.assign_path(&name, &path, v)?;
          }
          Target::Tuple(_) => return Err(RuntimeError::type_error("illegal expression for augmented assignment")),
        }
      }
      StmtKind::If(branches, otherwise) => {
        for (cond, body) in branches {
          if self.eval(cond)?.truthy() {
            return self.exec_block(body);
          }
        }
        return self.exec_block(otherwise);
      }
      StmtKind::While(cond, body) => {
        while self.eval(cond)?.truthy() {
          match self.exec_block(body)? {
            Flow::Break => break,
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Normal | Flow::Continue => {}
          }
        }
      }
      StmtKind::For(target, iter, body) => {
        let items = builtins::iterate(&self.eval(iter)?)?;
        for item in items {
          self.assign(target, item)?;
          match self.exec_block(body)? {
            Flow::Break => break,
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Normal | Flow::Continue => {}
          }
        }
      }
      StmtKind::Def(def) => {
        self.scope_mut(&def.name).insert(def.name.clone(), Value::Function(def.clone()));
      }
      StmtKind::Return(e) => {
        let v = match e {
          Some(e) => self.eval(e)?,
          None => Value::None,
        };
        return Ok(Flow::Return(v));
      }
      StmtKind::Import(name, alias) => {
        let module = builtins::module(name).ok_or_else(|| RuntimeError::new(ErrorKind::Import(name.clone())))?;
        let bound = alias.clone().unwrap_or_else(|| name.split('.').next().unwrap_or(name).to_string());
        self.scope_mut(&bound).insert(bound.clone(), Value::Module(module));
      }
      StmtKind::Global(names) => {
        if let Some(frame) = self.frames.last_mut() {
          frame.globals_decl.extend(names.iter().cloned());
        }
      }
      StmtKind::Pass => {}
      StmtKind::Break => return Ok(Flow::Break),
      StmtKind::Continue => return Ok(Flow::Continue),
    }
    Ok(Flow::Normal)
  }

  /// The namespace that assignments to `name` write into.
  fn scope_mut(&mut self, name: &str) -> &mut Env {
    match self.frames.last_mut() {
      Some(frame) if !frame.globals_decl.iter().any(|g| g == name) => &mut frame.locals,
      _ => &mut self.globals,
    }
  }

  fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
    if let Some(frame) = self.frames.last() {
      if !frame.globals_decl.iter().any(|g| g == name) {
        if let Some(v) = frame.locals.get(name) {
          return Ok(v.clone());
        }
      }
    }
    if let Some(v) = self.globals.get(name) {
      return Ok(v.clone());
    }
    builtins::builtin(name).map(Value::Builtin).ok_or_else(|| RuntimeError::name(name))
  }

  fn var_mut(&mut self, name: &str) -> Result<&mut Value, RuntimeError> {
    let in_locals = self
      .frames
      .last()
      .is_some_and(|f| !f.globals_decl.iter().any(|g| g == name) && f.locals.contains_key(name));
    match self.frames.last_mut() {
      Some(frame) if in_locals => frame.locals.get_mut(name),
      _ => self.globals.get_mut(name),
    }
    .ok_or_else(|| RuntimeError::name(name))
  }

  /// Resolves an assignable expression into a variable name and a path of subscripts.
  fn place(&mut self, expr: &Expr) -> Result<(String, Vec<Value>), RuntimeError> {
    match expr {
      Expr::Name(name) => Ok((name.clone(), Vec::new())),
      Expr::Index(x, i) => {
        let (name, mut path) = self.place(x)?;
        path.push(self.eval(i)?);
        Ok((name, path))
      }
      _ => Err(RuntimeError::type_error("expression is not assignable")),
    }
  }

  fn slot_mut(&mut self, name: &str, path: &[Value]) -> Result<&mut Value, RuntimeError> {
    let mut slot = self.var_mut(name)?;
    for key in path {
      slot = builtins::item_mut(slot, key)?;
    }
    Ok(slot)
  }

  fn assign_path(&mut self, name: &str, path: &[Value], value: Value) -> Result<(), RuntimeError> {
    match path.split_last() {
      None => {
        self.scope_mut(name).insert(name.to_string(), value);
        Ok(())
      }
      Some((key, init)) => builtins::set_item(self.slot_mut(name, init)?, key, value),
    }
  }

  fn assign(&mut self, target: &Target, value: Value) -> Result<(), RuntimeError> {
    match target {
      Target::Name(name) => {
        self.scope_mut(name).insert(name.clone(), value);
        Ok(())
      }
      Target::Index(x, i) => {
        let (name, mut path) = self.place(x)?;
        path.push(self.eval(i)?);
        self.assign_path(&name, &path, value)
      }
      Target::Tuple(targets) => {
        let items = builtins::iterate(&value)?;
        if items.len() != targets.len() {
          return Err(RuntimeError::value_error(format!(
            "expected {} values to unpack, got {}",
            targets.len(),
            items.len()
          )));
        }
        for (t, v) in targets.iter().zip(items) {
          self.assign(t, v)?;
        }
        Ok(())
      }
    }
  }

  fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
    match expr {
      Expr::None => Ok(Value::None),
      Expr::Bool(b) => Ok(Value::Bool(*b)),
      Expr::Int(n) => Ok(Value::Int(*n)),
      Expr::Float(x) => Ok(Value::Float(*x)),
      Expr::Str(s) => Ok(Value::Str(s.clone())),
      Expr::Name(name) => self.lookup(name),
      Expr::List(xs) => Ok(Value::List(self.eval_all(xs)?)),
      Expr::Tuple(xs) => Ok(Value::Tuple(self.eval_all(xs)?)),
      Expr::Dict(kvs) => {
        let mut res: Vec<(Value, Value)> = Vec::with_capacity(kvs.len());
        for (k, v) in kvs {
          let k = self.eval(k)?;
          let v = self.eval(v)?;
          match res.iter_mut().find(|(l, _)| *l == k) {
            Some(entry) => entry.1 = v,
            None => res.push((k, v)),
          }
        }
        Ok(Value::Dict(res))
      }
      Expr::Unary(op, x) => {
        let x = self.eval(x)?;
        match op {
          UnaryOp::Not => Ok(Value::Bool(!x.truthy())),
          UnaryOp::Neg => builtins::negate(x),
          UnaryOp::Pos => match x {
            Value::Bool(b) => Ok(Value::Int(b as i64)),
            x @ (Value::Int(_) | Value::Float(_) | Value::Array(_)) => Ok(x),
            x => Err(RuntimeError::type_error(format!("bad operand type for unary +: '{}'", x.type_name()))),
          },
        }
      }
      Expr::Binary(op, a, b) => {
        let a = self.eval(a)?;
        let b = self.eval(b)?;
        builtins::binary(*op, a, b)
      }
      Expr::Compare(first, rest) => {
        let mut lhs = self.eval(first)?;
        for (op, rhs) in rest {
          let rhs = self.eval(rhs)?;
          if !compare(*op, &lhs, &rhs)? {
            return Ok(Value::Bool(false));
          }
          lhs = rhs;
        }
        Ok(Value::Bool(true))
      }
      Expr::And(a, b) => {
        let a = self.eval(a)?;
        if !a.truthy() {
          return Ok(a);
        }
        self.eval(b)
      }
      Expr::Or(a, b) => {
        let a = self.eval(a)?;
        if a.truthy() {
          return Ok(a);
        }
        self.eval(b)
      }
      Expr::IfElse(then, cond, otherwise) => {
        if self.eval(cond)?.truthy() {
          self.eval(then)
        } else {
          self.eval(otherwise)
        }
      }
      Expr::Call(callee, args) => {
        if let Expr::Attr(obj, method) = callee.as_ref() {
          return self.call_attr(obj, method, args);
        }
        let f = self.eval(callee)?;
        let args = self.eval_all(args)?;
        self.call(f, args)
      }
      Expr::Index(x, i) => {
        let x = self.eval(x)?;
        let i = self.eval(i)?;
        builtins::index(&x, &i)
      }
      Expr::Slice(x, lo, hi) => {
        let x = self.eval(x)?;
        let lo = lo.as_ref().map(|e| self.eval(e)).transpose()?;
        let hi = hi.as_ref().map(|e| self.eval(e)).transpose()?;
        builtins::slice(&x, lo.as_ref(), hi.as_ref())
      }
      Expr::Attr(x, attr) => match self.eval(x)? {
        Value::Module(m) => builtins::member(&m, attr),
        x => Err(RuntimeError::attribute(x.type_name(), attr)),
      },
    }
  }

  fn eval_all(&mut self, xs: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
    xs.iter().map(|x| self.eval(x)).collect()
  }

  /// Calls `obj.method(args)`. Methods on variables and their elements mutate in place.
  fn call_attr(&mut self, obj: &Expr, method: &str, args: &[Expr]) -> Result<Value, RuntimeError> {
    let place = match obj {
      Expr::Name(_) | Expr::Index(_, _) => Some(self.place(obj)?),
      _ => None,
    };
    let args = self.eval_all(args)?;
    let member = match place {
      Some((name, path)) => {
        // Names that only exist as builtins have no slot to mutate.
        if path.is_empty() && self.var_mut(&name).is_err() {
          let mut recv = self.lookup(&name)?;
          return builtins::call_method(&mut recv, method, args);
        }
        match self.slot_mut(&name, &path)? {
          Value::Module(m) => builtins::member(m, method)?,
          slot => return builtins::call_method(slot, method, args),
        }
      }
      None => match self.eval(obj)? {
        Value::Module(m) => builtins::member(&m, method)?,
        mut recv => return builtins::call_method(&mut recv, method, args),
      },
    };
    self.call(member, args)
  }

  fn call(&mut self, f: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match f {
      Value::Function(def) => self.call_function(&def, args),
      Value::Builtin(b) => self.call_builtin(b, args),
      f => Err(RuntimeError::type_error(format!("'{}' object is not callable", f.type_name()))),
    }
  }

  fn call_function(&mut self, def: &Rc<FunctionDef>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    if args.len() != def.params.len() {
      return Err(RuntimeError::type_error(format!(
        "{}() takes {} positional arguments but {} were given",
        def.name,
        def.params.len(),
        args.len()
      )));
    }
    if self.frames.len() >= MAX_DEPTH {
      return Err(RuntimeError::new(ErrorKind::Recursion));
    }
    let locals = def.params.iter().cloned().zip(args).collect();
    self.frames.push(Frame { locals, globals_decl: Vec::new() });
    let res = self.exec_block(&def.body);
    self.frames.pop();
    match res? {
      Flow::Return(v) => Ok(v),
      _ => Ok(Value::None),
    }
  }

  fn call_builtin(&mut self, b: Builtin, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match b {
      Builtin::Print => {
        let line = args.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(self.out, "{line}").map_err(|e| RuntimeError::value_error(format!("cannot write output: {e}")))?;
        Ok(Value::None)
      }
      Builtin::Locals => Ok(env_to_dict(self.locals())),
      Builtin::Globals => Ok(env_to_dict(&self.globals)),
      Builtin::Hole => {
        let [line, locals, globals] = <[Value; 3]>::try_from(args)
          .map_err(|_| RuntimeError::type_error(format!("{HOLE_HOOK}() takes exactly 3 arguments")))?;
        let line = line
          .as_i64()
          .and_then(|n| usize::try_from(n).ok())
          .ok_or_else(|| RuntimeError::type_error("hole line must be a non-negative integer"))?;
        let locals = dict_to_env(locals)?;
        let globals = dict_to_env(globals)?;
        let hook = self
          .hook
          .as_deref_mut()
          .ok_or_else(|| RuntimeError::type_error("no hole resolver is installed"))?;
        hook.resolve(line, locals, &globals).map_err(|e| RuntimeError::new(ErrorKind::Hook(e)))
      }
      b => builtins::call(b, args),
    }
  }
}

fn compare(op: CmpOp, a: &Value, b: &Value) -> Result<bool, RuntimeError> {
  use std::cmp::Ordering::*;
  match op {
    CmpOp::Eq => Ok(a == b),
    CmpOp::Ne => Ok(a != b),
    CmpOp::Lt => Ok(builtins::order(a, b)? == Less),
    CmpOp::Le => Ok(builtins::order(a, b)? != Greater),
    CmpOp::Gt => Ok(builtins::order(a, b)? == Greater),
    CmpOp::Ge => Ok(builtins::order(a, b)? != Less),
    CmpOp::In => builtins::contains(b, a),
    CmpOp::NotIn => Ok(!builtins::contains(b, a)?),
    CmpOp::Is => Ok(identical(a, b)),
    CmpOp::IsNot => Ok(!identical(a, b)),
  }
}

fn identical(a: &Value, b: &Value) -> bool {
  std::mem::discriminant(a) == std::mem::discriminant(b) && a == b
}

/// Converts bindings into a dictionary value keyed by strings.
pub fn env_to_dict(env: &Env) -> Value {
  Value::Dict(env.iter().map(|(k, v)| (Value::from(k.as_str()), v.clone())).collect())
}

/// Converts a dictionary value keyed by strings back into bindings.
pub fn dict_to_env(dict: Value) -> Result<Env, RuntimeError> {
  match dict {
    Value::Dict(kvs) => kvs
      .into_iter()
      .map(|(k, v)| match k {
        Value::Str(k) => Ok((k, v)),
        k => Err(RuntimeError::type_error(format!("namespace keys must be strings, not '{}'", k.type_name()))),
      })
      .collect(),
    v => Err(RuntimeError::type_error(format!("namespace must be a dict, not '{}'", v.type_name()))),
  }
}
