use std::iter::Peekable;
use std::rc::Rc;

use super::ast::{BinOp, CmpOp, Expr, FunctionDef, Program, Stmt, StmtKind, Target, UnaryOp};
use super::errors::ParseError;
use super::lexer::{Span, Token};

type Tokens = Peekable<std::vec::IntoIter<Span>>;

/// Checks whether the next token has the same kind as `tok`.
fn peek_is(it: &mut Tokens, tok: &Token) -> bool {
  it.peek().is_some_and(|s| std::mem::discriminant(&s.tok) == std::mem::discriminant(tok))
}

/// Consumes the next token if it has the same kind as `tok`.
fn eat(it: &mut Tokens, tok: &Token) -> bool {
  if peek_is(it, tok) {
    it.next();
    true
  } else {
    false
  }
}

/// Expects the next token to have the same kind as `tok`.
fn expect(it: &mut Tokens, tok: Token) -> Result<Span, ParseError> {
  match it.next() {
    Some(s) if std::mem::discriminant(&s.tok) == std::mem::discriminant(&tok) => Ok(s),
    other => Err(ParseError::unexpected(other)),
  }
}

/// Expects the next token to be an identifier.
fn expect_id(it: &mut Tokens) -> Result<String, ParseError> {
  match it.next() {
    Some(Span { tok: Token::Id(x), .. }) => Ok(x),
    other => Err(ParseError::unexpected(other)),
  }
}

/// Expects the end of a simple statement.
fn expect_newline(it: &mut Tokens) -> Result<(), ParseError> {
  match it.next() {
    None | Some(Span { tok: Token::Newline, .. }) => Ok(()),
    other => Err(ParseError::unexpected(other)),
  }
}

fn line_of(it: &mut Tokens) -> usize {
  it.peek().map(|s| s.line).unwrap_or(0)
}

/// Parses a list of [`Span`] into a [`Program`].
///
/// The grammar is roughly given by the following BNF:
///
/// ```bnf
/// <program>  ::= <stmt>*
/// <stmt>     ::= <simple> NEWLINE
///              | "if" <expr> ":" <block> ("elif" <expr> ":" <block>)* ("else" ":" <block>)?
///              | "while" <expr> ":" <block>
///              | "for" <id> ("," <id>)* "in" <exprs> ":" <block>
///              | "def" <id> "(" (<id> ("," <id>)*)? ")" ":" <block>
/// <simple>   ::= "pass" | "break" | "continue" | "return" <exprs>? | "global" <id> ("," <id>)*
///              | "import" <id> ("." <id>)* ("as" <id>)?
///              | <exprs> | <exprs> "=" <exprs> | <exprs> <augop> <exprs>
/// <block>    ::= <simple> NEWLINE | NEWLINE INDENT <stmt>+ DEDENT
/// ```
pub fn parse_program(spans: Vec<Span>) -> Result<Program, ParseError> {
  let mut it = spans.into_iter().peekable();
  let mut body = Vec::new();
  while it.peek().is_some() {
    body.push(parse_stmt(&mut it)?);
  }
  Ok(Program { body })
}

/// Parses a list of [`Span`] into a single [`Expr`]. Trailing newlines are permitted.
pub fn parse_expression(spans: Vec<Span>) -> Result<Expr, ParseError> {
  let mut it = spans.into_iter().peekable();
  let res = parse_exprs(&mut it)?;
  while eat(&mut it, &Token::Newline) {}
  match it.next() {
    None => Ok(res),
    other => Err(ParseError::unexpected(other)),
  }
}

fn parse_stmt(it: &mut Tokens) -> Result<Stmt, ParseError> {
  let line = line_of(it);
  let kind = match it.peek().map(|s| &s.tok) {
    Some(Token::If) => {
      it.next();
      let mut branches = Vec::new();
      let cond = parse_expr(it)?;
      expect(it, Token::Colon)?;
      branches.push((cond, parse_block(it)?));
      let mut otherwise = Vec::new();
      loop {
        if eat(it, &Token::Elif) {
          let cond = parse_expr(it)?;
          expect(it, Token::Colon)?;
          branches.push((cond, parse_block(it)?));
        } else if eat(it, &Token::Else) {
          expect(it, Token::Colon)?;
          otherwise = parse_block(it)?;
          break;
        } else {
          break;
        }
      }
      StmtKind::If(branches, otherwise)
    }
    Some(Token::While) => {
      it.next();
      let cond = parse_expr(it)?;
      expect(it, Token::Colon)?;
      StmtKind::While(cond, parse_block(it)?)
    }
    Some(Token::For) => {
      it.next();
      let mut names = vec![Target::Name(expect_id(it)?)];
      while eat(it, &Token::Comma) {
        names.push(Target::Name(expect_id(it)?));
      }
      let target = if names.len() == 1 { names.remove(0) } else { Target::Tuple(names) };
      expect(it, Token::In)?;
      let iter = parse_exprs(it)?;
      expect(it, Token::Colon)?;
      StmtKind::For(target, iter, parse_block(it)?)
    }
    Some(Token::Def) => {
      it.next();
      let name = expect_id(it)?;
      expect(it, Token::LeftParen)?;
      let mut params = Vec::new();
      while !peek_is(it, &Token::RightParen) {
        params.push(expect_id(it)?);
        if !eat(it, &Token::Comma) {
          break;
        }
      }
      expect(it, Token::RightParen)?;
      expect(it, Token::Colon)?;
      let body = parse_block(it)?;
      StmtKind::Def(Rc::new(FunctionDef { name, params, body, line }))
    }
    _ => {
      let kind = parse_simple(it, line)?;
      expect_newline(it)?;
      kind
    }
  };
  Ok(Stmt { kind, line })
}

fn parse_block(it: &mut Tokens) -> Result<Vec<Stmt>, ParseError> {
  if !eat(it, &Token::Newline) {
    // A simple statement on the same line as the header.
    let line = line_of(it);
    let kind = parse_simple(it, line)?;
    expect_newline(it)?;
    return Ok(vec![Stmt { kind, line }]);
  }
  expect(it, Token::Indent)?;
  let mut body = Vec::new();
  while !eat(it, &Token::Dedent) {
    if it.peek().is_none() {
      break;
    }
    body.push(parse_stmt(it)?);
  }
  Ok(body)
}

fn parse_simple(it: &mut Tokens, line: usize) -> Result<StmtKind, ParseError> {
  match it.peek().map(|s| &s.tok) {
    Some(Token::Pass) => {
      it.next();
      Ok(StmtKind::Pass)
    }
    Some(Token::Break) => {
      it.next();
      Ok(StmtKind::Break)
    }
    Some(Token::Continue) => {
      it.next();
      Ok(StmtKind::Continue)
    }
    Some(Token::Return) => {
      it.next();
      if peek_is(it, &Token::Newline) || it.peek().is_none() {
        Ok(StmtKind::Return(None))
      } else {
        Ok(StmtKind::Return(Some(parse_exprs(it)?)))
      }
    }
    Some(Token::Global) => {
      it.next();
      let mut names = vec![expect_id(it)?];
      while eat(it, &Token::Comma) {
        names.push(expect_id(it)?);
      }
      Ok(StmtKind::Global(names))
    }
    Some(Token::Import) => {
      it.next();
      let mut name = expect_id(it)?;
      while eat(it, &Token::Dot) {
        name.push('.');
        name.push_str(&expect_id(it)?);
      }
      let alias = if eat(it, &Token::As) { Some(expect_id(it)?) } else { None };
      Ok(StmtKind::Import(name, alias))
    }
    _ => {
      let lhs = parse_exprs(it)?;
      let op = match it.peek().map(|s| &s.tok) {
        Some(Token::Assign) => None,
        Some(Token::PlusAssign) => Some(BinOp::Add),
        Some(Token::MinusAssign) => Some(BinOp::Sub),
        Some(Token::StarAssign) => Some(BinOp::Mul),
        Some(Token::SlashAssign) => Some(BinOp::Div),
        _ => return Ok(StmtKind::Expr(lhs)),
      };
      it.next();
      let target = Target::from_expr(lhs).ok_or(ParseError::InvalidTarget { line })?;
      let rhs = parse_exprs(it)?;
      match op {
        None => Ok(StmtKind::Assign(target, rhs)),
        Some(op) => Ok(StmtKind::AugAssign(target, op, rhs)),
      }
    }
  }
}

/// Parses a comma separated list of expressions, producing a tuple if there is more than one.
fn parse_exprs(it: &mut Tokens) -> Result<Expr, ParseError> {
  let first = parse_expr(it)?;
  if !peek_is(it, &Token::Comma) {
    return Ok(first);
  }
  let mut xs = vec![first];
  while eat(it, &Token::Comma) {
    if starts_expr(it) {
      xs.push(parse_expr(it)?);
    } else {
      break;
    }
  }
  Ok(Expr::Tuple(xs))
}

/// Whether the next token can begin an expression.
fn starts_expr(it: &mut Tokens) -> bool {
  matches!(
    it.peek().map(|s| &s.tok),
    Some(
      Token::Id(_)
        | Token::Int(_)
        | Token::Float(_)
        | Token::Str(_)
        | Token::True
        | Token::False
        | Token::None
        | Token::LeftParen
        | Token::LeftBracket
        | Token::LeftBrace
        | Token::Minus
        | Token::Plus
        | Token::Not
    )
  )
}

/// Parses a conditional expression, the loosest binding expression form.
fn parse_expr(it: &mut Tokens) -> Result<Expr, ParseError> {
  let then = parse_or(it)?;
  if eat(it, &Token::If) {
    let cond = parse_or(it)?;
    expect(it, Token::Else)?;
    let otherwise = parse_expr(it)?;
    return Ok(Expr::IfElse(Box::new(then), Box::new(cond), Box::new(otherwise)));
  }
  Ok(then)
}

fn parse_or(it: &mut Tokens) -> Result<Expr, ParseError> {
  let mut res = parse_and(it)?;
  while eat(it, &Token::Or) {
    res = Expr::Or(Box::new(res), Box::new(parse_and(it)?));
  }
  Ok(res)
}

fn parse_and(it: &mut Tokens) -> Result<Expr, ParseError> {
  let mut res = parse_not(it)?;
  while eat(it, &Token::And) {
    res = Expr::And(Box::new(res), Box::new(parse_not(it)?));
  }
  Ok(res)
}

fn parse_not(it: &mut Tokens) -> Result<Expr, ParseError> {
  if eat(it, &Token::Not) {
    return Ok(Expr::Unary(UnaryOp::Not, Box::new(parse_not(it)?)));
  }
  parse_compare(it)
}

fn parse_compare(it: &mut Tokens) -> Result<Expr, ParseError> {
  let first = parse_arith(it)?;
  let mut rest = Vec::new();
  loop {
    let op = match it.peek().map(|s| &s.tok) {
      Some(Token::Eq) => CmpOp::Eq,
      Some(Token::Ne) => CmpOp::Ne,
      Some(Token::Lt) => CmpOp::Lt,
      Some(Token::Le) => CmpOp::Le,
      Some(Token::Gt) => CmpOp::Gt,
      Some(Token::Ge) => CmpOp::Ge,
      Some(Token::In) => CmpOp::In,
      Some(Token::Not) => {
        it.next();
        expect(it, Token::In)?;
        rest.push((CmpOp::NotIn, parse_arith(it)?));
        continue;
      }
      Some(Token::Is) => {
        it.next();
        let op = if eat(it, &Token::Not) { CmpOp::IsNot } else { CmpOp::Is };
        rest.push((op, parse_arith(it)?));
        continue;
      }
      _ => break,
    };
    it.next();
    rest.push((op, parse_arith(it)?));
  }
  if rest.is_empty() {
    Ok(first)
  } else {
    Ok(Expr::Compare(Box::new(first), rest))
  }
}

fn parse_arith(it: &mut Tokens) -> Result<Expr, ParseError> {
  let mut res = parse_term(it)?;
  loop {
    let op = match it.peek().map(|s| &s.tok) {
      Some(Token::Plus) => BinOp::Add,
      Some(Token::Minus) => BinOp::Sub,
      _ => break Ok(res),
    };
    it.next();
    res = Expr::Binary(op, Box::new(res), Box::new(parse_term(it)?));
  }
}

fn parse_term(it: &mut Tokens) -> Result<Expr, ParseError> {
  let mut res = parse_unary(it)?;
  loop {
    let op = match it.peek().map(|s| &s.tok) {
      Some(Token::Star) => BinOp::Mul,
      Some(Token::Slash) => BinOp::Div,
      Some(Token::DoubleSlash) => BinOp::FloorDiv,
      Some(Token::Percent) => BinOp::Mod,
      _ => break Ok(res),
    };
    it.next();
    res = Expr::Binary(op, Box::new(res), Box::new(parse_unary(it)?));
  }
}

fn parse_unary(it: &mut Tokens) -> Result<Expr, ParseError> {
  if eat(it, &Token::Minus) {
    return Ok(Expr::Unary(UnaryOp::Neg, Box::new(parse_unary(it)?)));
  }
  if eat(it, &Token::Plus) {
    return Ok(Expr::Unary(UnaryOp::Pos, Box::new(parse_unary(it)?)));
  }
  let base = parse_postfix(it)?;
  if eat(it, &Token::DoubleStar) {
    // Right associative, and binds tighter than a unary operator on its left.
    return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(parse_unary(it)?)));
  }
  Ok(base)
}

fn parse_postfix(it: &mut Tokens) -> Result<Expr, ParseError> {
  let mut res = parse_atom(it)?;
  loop {
    if eat(it, &Token::LeftParen) {
      let mut args = Vec::new();
      while !peek_is(it, &Token::RightParen) {
        args.push(parse_expr(it)?);
        if !eat(it, &Token::Comma) {
          break;
        }
      }
      expect(it, Token::RightParen)?;
      res = Expr::Call(Box::new(res), args);
    } else if eat(it, &Token::LeftBracket) {
      let lo = if peek_is(it, &Token::Colon) { None } else { Some(Box::new(parse_expr(it)?)) };
      if eat(it, &Token::Colon) {
        let hi = if peek_is(it, &Token::RightBracket) { None } else { Some(Box::new(parse_expr(it)?)) };
        expect(it, Token::RightBracket)?;
        res = Expr::Slice(Box::new(res), lo, hi);
      } else {
        expect(it, Token::RightBracket)?;
        let ix = lo.ok_or(ParseError::UnexpectedEof)?;
        res = Expr::Index(Box::new(res), ix);
      }
    } else if eat(it, &Token::Dot) {
      res = Expr::Attr(Box::new(res), expect_id(it)?);
    } else {
      break Ok(res);
    }
  }
}

fn parse_atom(it: &mut Tokens) -> Result<Expr, ParseError> {
  // All atoms begin with a terminal token that can be taken unconditionally.
  match it.next() {
    Some(Span { tok: Token::None, .. }) => Ok(Expr::None),
    Some(Span { tok: Token::True, .. }) => Ok(Expr::Bool(true)),
    Some(Span { tok: Token::False, .. }) => Ok(Expr::Bool(false)),
    Some(Span { tok: Token::Int(n), .. }) => Ok(Expr::Int(n)),
    Some(Span { tok: Token::Float(x), .. }) => Ok(Expr::Float(x)),
    Some(Span { tok: Token::Str(s), .. }) => {
      // Adjacent string literals are concatenated.
      let mut s = s;
      while let Some(Span { tok: Token::Str(_), .. }) = it.peek() {
        if let Some(Span { tok: Token::Str(t), .. }) = it.next() {
          s.push_str(&t);
        }
      }
      Ok(Expr::Str(s))
    }
    Some(Span { tok: Token::Id(x), .. }) => Ok(Expr::Name(x)),
    // Parsing a parenthesised expression or a tuple.
    Some(Span { tok: Token::LeftParen, .. }) => {
      if eat(it, &Token::RightParen) {
        return Ok(Expr::Tuple(Vec::new()));
      }
      let first = parse_expr(it)?;
      if eat(it, &Token::RightParen) {
        return Ok(first);
      }
      let mut xs = vec![first];
      while eat(it, &Token::Comma) {
        if peek_is(it, &Token::RightParen) {
          break;
        }
        xs.push(parse_expr(it)?);
      }
      expect(it, Token::RightParen)?;
      Ok(Expr::Tuple(xs))
    }
    Some(Span { tok: Token::LeftBracket, .. }) => {
      let mut xs = Vec::new();
      while !peek_is(it, &Token::RightBracket) {
        xs.push(parse_expr(it)?);
        if !eat(it, &Token::Comma) {
          break;
        }
      }
      expect(it, Token::RightBracket)?;
      Ok(Expr::List(xs))
    }
    Some(Span { tok: Token::LeftBrace, .. }) => {
      let mut kvs = Vec::new();
      while !peek_is(it, &Token::RightBrace) {
        let k = parse_expr(it)?;
        expect(it, Token::Colon)?;
        kvs.push((k, parse_expr(it)?));
        if !eat(it, &Token::Comma) {
          break;
        }
      }
      expect(it, Token::RightBrace)?;
      Ok(Expr::Dict(kvs))
    }
    other => Err(ParseError::unexpected(other)),
  }
}
