use sketch::lang::{compile, eval_literal, lex, ErrorKind, Interpreter, LexError, ParseError, RuntimeError, Token, Value};

fn run(source: &str) -> String {
  try_run(source).unwrap()
}

fn try_run(source: &str) -> Result<String, RuntimeError> {
  let program = compile(source).unwrap();
  let mut out = Vec::new();
  Interpreter::new(&mut out).run(&program)?;
  Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_lex_layout() {
  let toks: Vec<Token> = lex("if x:\n  y = 1\n\n  # note\nz = 2\n").unwrap().into_iter().map(|s| s.tok).collect();
  assert_eq!(
    toks,
    vec![
      Token::If,
      Token::Id("x".into()),
      Token::Colon,
      Token::Newline,
      Token::Indent,
      Token::Id("y".into()),
      Token::Assign,
      Token::Int(1),
      Token::Newline,
      Token::Dedent,
      Token::Id("z".into()),
      Token::Assign,
      Token::Int(2),
      Token::Newline,
    ]
  );
}

#[test]
fn test_lex_brackets_join_lines() {
  let toks: Vec<Token> = lex("xs = [1,\n      2]\n").unwrap().into_iter().map(|s| s.tok).collect();
  assert!(!toks[..toks.len() - 1].contains(&Token::Newline));
}

#[test]
fn test_lex_errors() {
  assert!(matches!(lex("x = ?"), Err(LexError::UnexpectedChar { ch: '?', line: 1, col: 5 })));
  assert!(matches!(lex("s = 'abc\n"), Err(LexError::UnterminatedString { line: 1, .. })));
  assert!(matches!(lex("if x:\n    y = 1\n  z = 2\n"), Err(LexError::Dedent { line: 3 })));
}

#[test]
fn test_parse_error_line() {
  let err = compile("x = 1\ny = = 2\n").unwrap_err();
  assert!(matches!(err, ParseError::UnexpectedToken { tok: Token::Assign, line: 2, .. }));
  assert_eq!(err.line(), Some(2));
  assert!(matches!(compile("x = (1, 2"), Err(ParseError::UnexpectedToken { .. } | ParseError::UnexpectedEof)));
}

#[test]
fn test_arithmetic() {
  assert_eq!(run("x = 7\nprint(x // 2, x % 3, -7 // 2, -7 % 3, 7 // -2, 7 / 2, 2 ** 10)\n"), "3 1 -4 2 -4 3.5 1024\n");
  assert_eq!(run("print(1.0, 3 * 1.5, 2 ** -1, 10 - 2 * 3)\n"), "1.0 4.5 0.5 4\n");
  assert_eq!(run("print('ab' * 2 + 'c', [0] * 3, 'n=%d' % 3)\n"), "ababc [0, 0, 0] n=3\n");
}

#[test]
fn test_functions_and_recursion() {
  let src = "
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)

print(fact(10))
";
  assert_eq!(run(src), "3628800\n");
}

#[test]
fn test_lists_and_methods() {
  let src = "
xs = [3, 1, 2]
xs.append(5)
xs[0] = 10
ys = sorted(xs)
print(xs, ys, len(xs), xs[-1], xs[1:3])
";
  assert_eq!(run(src), "[10, 1, 2, 5] [1, 2, 5, 10] 4 5 [1, 2]\n");
}

#[test]
fn test_nested_assignment() {
  let src = "
grid = [[0, 0], [0, 0]]
grid[1][0] = 7
grid[1][0] += 1
print(grid)
";
  assert_eq!(run(src), "[[0, 0], [8, 0]]\n");
}

#[test]
fn test_dicts_and_strings() {
  let src = "
d = {'a': 1}
d['b'] = 2
for k, v in d.items():
    print(k, v)
print(', '.join(['x', 'y']).upper(), 'abc'[1], d.get('c', 0), 'b' in d)
";
  assert_eq!(run(src), "a 1\nb 2\nX, Y b 0 True\n");
}

#[test]
fn test_globals_and_loops() {
  let src = "
count = 0
def bump():
    global count
    count += 1

while True:
    bump()
    if count >= 3:
        break
total = 0
for i in range(10):
    if i % 2 == 0:
        continue
    total += i
print(count, total)
";
  assert_eq!(run(src), "3 25\n");
}

#[test]
fn test_modules() {
  assert_eq!(run("import math\nprint(math.sqrt(16), math.floor(2.7))\n"), "4.0 2\n");
  assert_eq!(run("import numpy as np\nprint(np.array([1, 2]) * 2)\n"), "array([2.0, 4.0])\n");
}

#[test]
fn test_runtime_errors_carry_lines() {
  let err = try_run("x = 1\ny = x / 0\n").unwrap_err();
  assert!(matches!(err.kind, ErrorKind::ZeroDivision));
  assert_eq!(err.line, Some(2));

  let err = try_run("def f():\n    return z\n\nf()\n").unwrap_err();
  assert!(matches!(err.kind, ErrorKind::Name(_)));
  assert_eq!(err.line, Some(2));

  let err = try_run("import os\n").unwrap_err();
  assert!(matches!(err.kind, ErrorKind::Import(_)));
}

#[test]
fn test_recursion_limit() {
  // Deep interpretation needs more native stack than the default test thread has.
  let handle = std::thread::Builder::new()
    .stack_size(256 << 20)
    .spawn(|| try_run("def f(n):\n    return f(n + 1)\n\nf(0)\n").unwrap_err())
    .unwrap();
  let err = handle.join().unwrap();
  assert!(matches!(err.kind, ErrorKind::Recursion));
}

#[test]
fn test_value_semantics() {
  assert_eq!(run("a = [1, [2]]\nb = a\nb[1].append(3)\nprint(a, b)\n"), "[1, [2]] [1, [2, 3]]\n");
  assert_eq!(Value::Int(1), Value::Float(1.0));
  assert_ne!(Value::Int(1), Value::from("1"));
}

#[test]
fn test_repr_round_trip() {
  for text in ["None", "-3", "2.5", "'it\\'s'", "[1, 'a', (2,), {'k': None}]", "array([1.0, -2.5])", "1e+20"] {
    let v = eval_literal(text).unwrap();
    assert_eq!(eval_literal(&v.repr()).unwrap(), v);
  }
}

#[test]
fn test_globals_after_run() {
  let program = compile("x = 2\ndef f():\n    y = 1\n    return y\nz = f()\n").unwrap();
  let mut out = Vec::new();
  let mut interp = Interpreter::new(&mut out);
  interp.define_global("seed", Value::Int(7));
  interp.run(&program).unwrap();
  let globals = interp.globals();
  assert_eq!(globals["x"], Value::Int(2));
  assert_eq!(globals["z"], Value::Int(1));
  assert_eq!(globals["seed"], Value::Int(7));
  assert!(!globals.contains_key("y"));
  assert_eq!(interp.locals(), interp.globals());
}

#[test]
fn test_sizes_near_integer_limits() {
  let top = i64::MAX;
  assert_eq!(run(&format!("print(range({}, {top}, 5))\n", top - 1)), format!("[{}]\n", top - 1));
  assert_eq!(run(&format!("print(len(range({}, {}, -5)))\n", i64::MIN + 2, i64::MIN + 1)), "1\n");
  for src in [
    format!("x = [1, 2] * {top}\n"),
    format!("x = 'ab' * {top}\n"),
    format!("x = {top} * 'ab'\n"),
    "x = range(10 ** 18)\n".to_string(),
  ] {
    let err = try_run(&src).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Overflow(_)), "{src}: {err}");
  }
  assert_eq!(run(&format!("print([] * {top}, '' * {top})\n")), "[] \n");
}
