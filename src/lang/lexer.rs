use super::errors::LexError;

/// # Lexer tokens
///
/// Produced by the lexer. Layout is turned into explicit `Newline`, `Indent` and `Dedent` tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
  Newline,
  Indent,
  Dedent,
  LeftParen,
  RightParen,
  LeftBracket,
  RightBracket,
  LeftBrace,
  RightBrace,
  Comma,
  Colon,
  Dot,
  Plus,
  Minus,
  Star,
  DoubleStar,
  Slash,
  DoubleSlash,
  Percent,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
  Assign,
  PlusAssign,
  MinusAssign,
  StarAssign,
  SlashAssign,
  Def,
  Return,
  If,
  Elif,
  Else,
  While,
  For,
  In,
  Not,
  And,
  Or,
  Is,
  True,
  False,
  None,
  Import,
  As,
  Pass,
  Break,
  Continue,
  Global,
  Int(i64),
  Float(f64),
  Str(String),
  Id(String),
}

/// # Lexer spans
///
/// Tokens together with their 1-based line and column in the input string.
#[derive(Debug, Clone)]
pub struct Span {
  pub tok: Token,
  pub line: usize,
  pub col: usize,
}

fn keyword(s: &str) -> Option<Token> {
  let tok = match s {
    "def" => Token::Def,
    "return" => Token::Return,
    "if" => Token::If,
    "elif" => Token::Elif,
    "else" => Token::Else,
    "while" => Token::While,
    "for" => Token::For,
    "in" => Token::In,
    "not" => Token::Not,
    "and" => Token::And,
    "or" => Token::Or,
    "is" => Token::Is,
    "True" => Token::True,
    "False" => Token::False,
    "None" => Token::None,
    "import" => Token::Import,
    "as" => Token::As,
    "pass" => Token::Pass,
    "break" => Token::Break,
    "continue" => Token::Continue,
    "global" => Token::Global,
    _ => return None,
  };
  Some(tok)
}

/// Character cursor keeping track of lines and columns.
struct Cursor {
  chars: Vec<char>,
  pos: usize,
  line: usize,
  line_start: usize,
}

impl Cursor {
  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn peek_at(&self, n: usize) -> Option<char> {
    self.chars.get(self.pos + n).copied()
  }

  fn col(&self) -> usize {
    self.pos - self.line_start + 1
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += 1;
    if c == '\n' {
      self.line += 1;
      self.line_start = self.pos;
    }
    Some(c)
  }

  fn starts_with(&self, s: &str) -> bool {
    s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
  }
}

/// Tokenises `source` into a list of [`Span`].
pub fn lex(source: &str) -> Result<Vec<Span>, LexError> {
  let mut cur = Cursor { chars: source.chars().collect(), pos: 0, line: 1, line_start: 0 };
  let mut res: Vec<Span> = Vec::new();
  let mut indents = vec![0usize];
  let mut depth = 0usize;
  let mut at_line_start = true;

  loop {
    if at_line_start && depth == 0 {
      // Measuring the indentation of a new logical line.
      let mut width = 0;
      while let Some(c) = cur.peek() {
        match c {
          ' ' => width += 1,
          '\t' => width = (width / 8 + 1) * 8,
          '\r' | '\x0c' => {}
          _ => break,
        }
        cur.bump();
      }
      match cur.peek() {
        // Blank and comment-only lines do not affect layout.
        Some('#') => {
          while cur.peek().is_some_and(|c| c != '\n') {
            cur.bump();
          }
          continue;
        }
        Some('\n') => {
          cur.bump();
          continue;
        }
        None => break,
        Some(_) => {}
      }
      let line = cur.line;
      let col = cur.col();
      let top = indents.last().copied().unwrap_or(0);
      if width > top {
        indents.push(width);
        res.push(Span { tok: Token::Indent, line, col });
      } else if width < top {
        while indents.last().is_some_and(|&w| w > width) {
          indents.pop();
          res.push(Span { tok: Token::Dedent, line, col });
        }
        if indents.last() != Some(&width) {
          return Err(LexError::Dedent { line });
        }
      }
      at_line_start = false;
    }

    let Some(c) = cur.peek() else { break };
    let line = cur.line;
    let col = cur.col();
    let push = |res: &mut Vec<Span>, tok: Token| res.push(Span { tok, line, col });

    match c {
      '\n' => {
        cur.bump();
        if depth == 0 {
          push(&mut res, Token::Newline);
          at_line_start = true;
        }
      }
      ' ' | '\t' | '\r' | '\x0c' => {
        cur.bump();
      }
      '\\' if cur.peek_at(1) == Some('\n') => {
        cur.bump();
        cur.bump();
      }
      '#' => {
        while cur.peek().is_some_and(|c| c != '\n') {
          cur.bump();
        }
      }
      '"' | '\'' => {
        let s = lex_string(&mut cur, c)?;
        push(&mut res, Token::Str(s));
      }
      c if c.is_ascii_digit() || (c == '.' && cur.peek_at(1).is_some_and(|d| d.is_ascii_digit())) => {
        let tok = lex_number(&mut cur);
        push(&mut res, tok);
      }
      c if c.is_alphabetic() || c == '_' => {
        let mut s = String::new();
        while let Some(d) = cur.peek() {
          if !(d.is_alphanumeric() || d == '_') {
            break;
          }
          s.push(d);
          cur.bump();
        }
        let tok = keyword(&s).unwrap_or(Token::Id(s));
        push(&mut res, tok);
      }
      _ => {
        // Longest operators first.
        const OPS: &[(&str, Token)] = &[
          ("**", Token::DoubleStar),
          ("//", Token::DoubleSlash),
          ("==", Token::Eq),
          ("!=", Token::Ne),
          ("<=", Token::Le),
          (">=", Token::Ge),
          ("+=", Token::PlusAssign),
          ("-=", Token::MinusAssign),
          ("*=", Token::StarAssign),
          ("/=", Token::SlashAssign),
          ("(", Token::LeftParen),
          (")", Token::RightParen),
          ("[", Token::LeftBracket),
          ("]", Token::RightBracket),
          ("{", Token::LeftBrace),
          ("}", Token::RightBrace),
          (",", Token::Comma),
          (":", Token::Colon),
          (".", Token::Dot),
          ("+", Token::Plus),
          ("-", Token::Minus),
          ("*", Token::Star),
          ("/", Token::Slash),
          ("%", Token::Percent),
          ("<", Token::Lt),
          (">", Token::Gt),
          ("=", Token::Assign),
        ];
        let Some((op, tok)) = OPS.iter().find(|(op, _)| cur.starts_with(op)) else {
          return Err(LexError::UnexpectedChar { ch: c, line, col });
        };
        for _ in 0..op.len() {
          cur.bump();
        }
        match tok {
          Token::LeftParen | Token::LeftBracket | Token::LeftBrace => depth += 1,
          Token::RightParen | Token::RightBracket | Token::RightBrace => depth = depth.saturating_sub(1),
          _ => {}
        }
        push(&mut res, tok.clone());
      }
    }
  }

  // Closing the last logical line and all open blocks.
  let line = cur.line;
  if res.last().is_some_and(|s| s.tok != Token::Newline) {
    res.push(Span { tok: Token::Newline, line, col: cur.col() });
  }
  for _ in 1..indents.len() {
    res.push(Span { tok: Token::Dedent, line, col: cur.col() });
  }
  Ok(res)
}

/// Lexes a single, double or triple quoted string starting at the cursor.
fn lex_string(cur: &mut Cursor, quote: char) -> Result<String, LexError> {
  let line = cur.line;
  let col = cur.col();
  let triple: String = [quote; 3].iter().collect();
  let is_triple = cur.starts_with(&triple);
  for _ in 0..if is_triple { 3 } else { 1 } {
    cur.bump();
  }
  let mut s = String::new();
  loop {
    if is_triple && cur.starts_with(&triple) {
      for _ in 0..3 {
        cur.bump();
      }
      return Ok(s);
    }
    match cur.bump() {
      None => return Err(LexError::UnterminatedString { line, col }),
      Some('\n') if !is_triple => return Err(LexError::UnterminatedString { line, col }),
      Some(c) if c == quote && !is_triple => return Ok(s),
      Some('\\') => match cur.bump() {
        Some('n') => s.push('\n'),
        Some('t') => s.push('\t'),
        Some('r') => s.push('\r'),
        Some('0') => s.push('\0'),
        Some('\n') => {}
        Some(e @ ('\\' | '\'' | '"')) => s.push(e),
        Some(e) => {
          s.push('\\');
          s.push(e);
        }
        None => return Err(LexError::UnterminatedString { line, col }),
      },
      Some(c) => s.push(c),
    }
  }
}

/// Lexes an integer or floating point literal starting at the cursor.
fn lex_number(cur: &mut Cursor) -> Token {
  let mut s = String::new();
  let mut float = false;
  while let Some(d) = cur.peek() {
    if d.is_ascii_digit() || d == '_' {
      if d != '_' {
        s.push(d);
      }
    } else if d == '.' && !float {
      float = true;
      s.push(d);
    } else if (d == 'e' || d == 'E')
      && (cur.peek_at(1).is_some_and(|e| e.is_ascii_digit())
        || (matches!(cur.peek_at(1), Some('+' | '-')) && cur.peek_at(2).is_some_and(|e| e.is_ascii_digit())))
    {
      float = true;
      s.push(d);
      cur.bump();
      if let Some(sign) = cur.peek().filter(|c| *c == '+' || *c == '-') {
        s.push(sign);
        cur.bump();
      }
      continue;
    } else {
      break;
    }
    cur.bump();
  }
  if !float {
    if let Ok(n) = s.parse::<i64>() {
      return Token::Int(n);
    }
  }
  Token::Float(s.parse::<f64>().unwrap_or(f64::INFINITY))
}
