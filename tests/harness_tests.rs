use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use sketch::harness::{
  decode_payload, rewrite, run_file, run_program, run_source, scan, snapshot, validate, ExprEvaluator, HoleSite,
  Resolver, Session, SketchError,
};
use sketch::lang::value::Module;
use sketch::lang::{Env, Value};

fn env(bindings: &[(&str, Value)]) -> Env {
  bindings.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn run(session: &mut Session, source: &str) -> Result<String, SketchError> {
  let mut out = Vec::new();
  run_source(Path::new("target.sk"), source, session, &mut out)?;
  Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_single_hole_is_accepted() {
  assert_eq!(validate("x = ??\nprint(x)\n").unwrap(), Some(HoleSite { offset: 4, line: 1 }));
  assert_eq!(validate("x = 1\n").unwrap(), None);
}

#[test]
fn test_multiple_holes_are_rejected() {
  match validate("x = ??\ny = 1\nz = ?? + 1\n") {
    Err(SketchError::MultipleHoles { lines }) => assert_eq!(lines, vec![1, 3]),
    other => panic!("unexpected {other:?}"),
  }
}

#[test]
fn test_holes_in_comments_and_strings_are_ignored() {
  let src = "# what is ??\nx = ?? # or ??\ns = '''\n??\n'''\nt = \"??\"\n";
  let sites = scan(src);
  assert_eq!(sites.len(), 1);
  assert_eq!(sites[0].line, 2);
  assert!(validate(src).is_ok());

  // A backslash at the end of a line continues a single-quoted string.
  let src = "s = 'a\\\n??'\nx = ??\nprint(s, x)\n";
  assert_eq!(scan(src).iter().map(|s| s.line).collect::<Vec<_>>(), vec![3]);
  let mut session = Session::new();
  session.record_observation("", "", Value::Int(1), 3).unwrap();
  assert_eq!(run(&mut session, src).unwrap(), "a?? 1\n");
}

#[test]
fn test_unterminated_triple_quote_hides_the_rest() {
  assert_eq!(scan("x = ??\n\"\"\"\ny = ??\n").len(), 1);
  // A triple quote of the other style does not close the string.
  let sites = scan("s = \"\"\" ''' ?? \"\"\"\nx = ??\n");
  assert_eq!(sites.iter().map(|s| s.line).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_rewrite_keeps_lines() {
  let src = "a = 1\nx = ??  # ??\nprint('??')\n";
  let out = rewrite(src, &scan(src));
  assert_eq!(out, "a = 1\nx = __sketch_hole__(2, locals(), globals())  # ??\nprint('??')\n");
}

#[test]
fn test_override_takes_precedence() {
  let mut session = Session::new();
  session.set_candidate(3, "a + b");
  session.hole_or_default(3).override_value = Some(Value::Int(42));
  let locals = env(&[("a", Value::Int(2)), ("b", Value::Int(3))]);
  {
    let mut resolver = Resolver::new(&mut session);
    for _ in 0..3 {
      assert_eq!(resolver.resolve_hole(3, &locals, &Env::new()).unwrap(), Value::Int(42));
    }
  }
  assert!(session.clear_override(3));
  let mut resolver = Resolver::new(&mut session);
  assert_eq!(resolver.resolve_hole(3, &locals, &Env::new()).unwrap(), Value::Int(5));
}

#[test]
fn test_none_override_counts_as_absent() {
  let mut session = Session::new();
  session.set_candidate(1, "a * 2");
  session.hole_or_default(1).override_value = Some(Value::None);
  let mut resolver = Resolver::new(&mut session);
  let locals = env(&[("a", Value::Int(4))]);
  assert_eq!(resolver.resolve_hole(1, &locals, &Env::new()).unwrap(), Value::Int(8));
}

#[test]
fn test_observations_are_deduplicated() {
  let mut session = Session::new();
  session.record_observation("a: 1\nb: 2", "", Value::Int(3), 5).unwrap();
  session.record_observation("b:2\na:1", "", Value::Int(4), 5).unwrap();
  session.record_observation("a: 1\nb: 3", "", Value::Int(4), 5).unwrap();
  let record = session.hole(5).unwrap();
  assert_eq!(record.observations.len(), 2);
  let examples: Vec<_> = record.examples().map(|(env, v)| (env.clone(), v.clone())).collect();
  assert_eq!(examples[0], (env(&[("a", Value::Int(1)), ("b", Value::Int(2))]), Value::Int(4)));
  assert_eq!(examples[1].0, env(&[("a", Value::Int(1)), ("b", Value::Int(3))]));
  let seen = record.observation(&env(&[("b", Value::Int(2)), ("a", Value::Int(1))])).unwrap();
  assert_eq!(seen.value, Value::Int(4));
  assert!(record.observation(&env(&[("a", Value::Int(1))])).is_none());
}

#[test]
fn test_drift_sets_override() {
  let mut session = Session::new();
  session.set_candidate(3, "a + b");
  let locals = env(&[("a", Value::Int(2)), ("b", Value::Int(3))]);
  Resolver::new(&mut session).resolve_hole(3, &locals, &Env::new()).unwrap();
  assert_eq!(session.hole(3).unwrap().generated, Some(Value::Int(5)));

  // Agreeing with the candidate leaves it in charge.
  session.record_observation("a: 2\nb: 3", "", Value::Int(5), 3).unwrap();
  assert_eq!(session.hole(3).unwrap().override_value, None);

  session.record_observation("a: 2\nb: 4", "", Value::Int(7), 3).unwrap();
  assert_eq!(session.hole(3).unwrap().override_value, Some(Value::Int(7)));
  assert_eq!(session.container(), Some(&Value::Int(7)));
  let mut resolver = Resolver::new(&mut session);
  assert_eq!(resolver.resolve_hole(3, &locals, &Env::new()).unwrap(), Value::Int(7));
  assert_eq!(resolver.session().hole(3).unwrap().generated, Some(Value::Int(5)));
}

#[test]
fn test_unconfigured_hole_is_fatal() {
  let mut session = Session::new();
  let mut resolver = Resolver::new(&mut session);
  assert!(matches!(resolver.resolve_hole(1, &Env::new(), &Env::new()), Err(SketchError::Unconfigured { line: 1 })));
  assert!(matches!(run(&mut Session::new(), "x = ??\n"), Err(SketchError::Unconfigured { line: 1 })));
}

#[test]
fn test_snapshot_is_sanitized_and_idempotent() {
  let math = Rc::new(Module { name: "math".into(), members: Env::new() });
  let raw = env(&[
    ("__name__", Value::from("__main__")),
    ("math", Value::Module(math)),
    ("xs", Value::List(vec![Value::Int(1)])),
    ("k", Value::Float(0.5)),
  ]);
  let once = snapshot(&raw);
  assert_eq!(once.keys().map(String::as_str).collect::<Vec<_>>(), vec!["k", "xs"]);
  assert_eq!(snapshot(&once), once);

  let mut live = raw;
  if let Some(Value::List(xs)) = live.get_mut("xs") {
    xs.push(Value::Int(2));
  }
  assert_eq!(once["xs"], Value::List(vec![Value::Int(1)]));
}

#[test]
fn test_seeded_container_feeds_hole() {
  let mut session = Session::new();
  session.record_observation("", "", Value::Int(5), 1).unwrap();
  assert_eq!(run(&mut session, "x = ??\nprint(x)\n").unwrap(), "5\n");
}

#[test]
fn test_two_holes_abort_before_output() {
  let mut session = Session::new();
  session.record_observation("", "", Value::Int(5), 2).unwrap();
  let mut out = Vec::new();
  let res = run_source(Path::new("target.sk"), "print('before')\nx = ??\ny = ??\n", &mut session, &mut out);
  assert!(matches!(res, Err(SketchError::MultipleHoles { .. })));
  assert!(out.is_empty());
}

#[test]
fn test_candidate_uses_call_site_locals() {
  let mut session = Session::new();
  session.set_candidate(3, "a+b");
  assert_eq!(run(&mut session, "a = 2\nb = 3\nc = ??\nprint(c)\n").unwrap(), "5\n");
  assert_eq!(session.hole(3).unwrap().generated, Some(Value::Int(5)));
  assert_eq!(session.container(), Some(&Value::Int(5)));
}

#[test]
fn test_candidate_inside_function() {
  let mut session = Session::new();
  session.set_candidate(2, "a * 10");
  let src = "def f(a):\n    return ??\n\nprint(f(2), f(5))\n";
  assert_eq!(run(&mut session, src).unwrap(), "20 50\n");
  assert_eq!(session.hole(2).unwrap().generated, Some(Value::Int(50)));
}

#[test]
fn test_none_value_is_rejected() {
  let mut session = Session::new();
  let res = session.record_observation("a: 1", "", Value::None, 4);
  assert!(matches!(res, Err(SketchError::NoneValue { line: 4 })));
  assert_eq!(session, Session::new());
}

#[test]
fn test_failing_candidate_falls_back() {
  let mut session = Session::new();
  session.record_observation("", "", Value::Int(9), 1).unwrap();
  session.set_candidate(1, "missing + 1");
  assert_eq!(run(&mut session, "x = ??\nprint(x)\n").unwrap(), "9\n");
  assert_eq!(session.hole(1).unwrap().generated, None);

  let mut fresh = Session::new();
  fresh.set_candidate(1, "missing + 1");
  assert!(matches!(run(&mut fresh, "x = ??\n"), Err(SketchError::Unconfigured { line: 1 })));
}

struct Fixed {
  calls: Rc<Cell<usize>>,
}

impl ExprEvaluator for Fixed {
  fn evaluate(
    &mut self,
    expr: &str,
    locals: Env,
    _globals: &Env,
  ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
    self.calls.set(self.calls.get() + 1);
    assert!(!locals.contains_key("__name__"));
    Ok(Value::from(format!("{expr}:{}", locals.len())))
  }
}

#[test]
fn test_custom_evaluator() {
  let mut session = Session::new();
  session.set_candidate(2, "anything");
  let calls = Rc::new(Cell::new(0));
  let program = sketch::harness::prepare(Path::new("target.sk"), "a = 1\nprint(??)\n").unwrap();
  let mut out = Vec::new();
  let mut resolver = Resolver::with_evaluator(&mut session, Fixed { calls: calls.clone() });
  run_program(Path::new("target.sk"), &program, &mut resolver, &mut out).unwrap();
  assert_eq!(String::from_utf8(out).unwrap(), "anything:1\n");
  assert_eq!(calls.get(), 1);
}

#[test]
fn test_load_errors() {
  let mut session = Session::new();
  match run(&mut session, "x = 1\ny = ??\nz = = 2\n") {
    Err(SketchError::Syntax { line, .. }) => assert_eq!(line, Some(3)),
    other => panic!("unexpected {other:?}"),
  }
  match run(&mut session, "x = 1\ny = x / 0\n") {
    Err(err @ SketchError::Runtime { .. }) => assert!(err.to_string().starts_with("target.sk:2: ZeroDivisionError")),
    other => panic!("unexpected {other:?}"),
  }
  let dir = tempfile::tempdir().unwrap();
  let res = run_file(&dir.path().join("missing.sk"), &mut session, &mut Vec::new());
  assert!(matches!(res, Err(SketchError::Io { .. })));
}

#[test]
fn test_run_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("prog.sk");
  std::fs::write(&path, "import math\nr = ??\nprint(math.floor(r * 2))\n").unwrap();
  let mut session = Session::new();
  session.record_observation("", "", Value::Float(1.75), 2).unwrap();
  let mut out = Vec::new();
  run_file(&path, &mut session, &mut out).unwrap();
  assert_eq!(String::from_utf8(out).unwrap(), "3\n");
}

#[test]
fn test_decode_payload() {
  let decoded = decode_payload("a: 1\n\nb: {'k': [1, 2]}\nc: 'x:y'\nv: array([1, 2.5])\n").unwrap();
  assert_eq!(decoded["a"], Value::Int(1));
  assert_eq!(decoded["b"], Value::Dict(vec![(Value::from("k"), Value::List(vec![Value::Int(1), Value::Int(2)]))]));
  assert_eq!(decoded["c"], Value::from("x:y"));
  assert_eq!(decoded["v"], Value::Array(vec![1.0, 2.5]));
  assert!(matches!(decode_payload("novalue"), Err(SketchError::Payload { .. })));
  assert!(matches!(decode_payload("x: len([1])"), Err(SketchError::Payload { .. })));
  assert!(matches!(decode_payload(": 1"), Err(SketchError::Payload { .. })));
}

#[test]
fn test_drop_overridden_candidate() {
  let mut session = Session::new();
  session.set_candidate(1, "x + 1");
  assert!(!session.drop_overridden_candidate(1));
  session.hole_or_default(1).override_value = Some(Value::Int(3));
  assert!(session.drop_overridden_candidate(1));
  let record = session.hole(1).unwrap();
  assert_eq!((record.candidate.as_deref(), record.active_override()), (None, None));
  assert!(!session.drop_overridden_candidate(1));
}

#[test]
fn test_session_persistence() {
  let mut session = Session::new();
  session
    .record_observation("xs: [1, 2]\nname: 'bob'\nv: array([1.0, 2.5])", "g: 1", Value::Int(3), 4)
    .unwrap();
  session.set_candidate(4, "len(xs) + 1");
  session.hole_or_default(4).generated = Some(Value::Int(3));
  session.record_observation("xs: []\nname: ''\nv: array([])", "", Value::Int(0), 4).unwrap();

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("session.json");
  session.save(&path).unwrap();
  let loaded = Session::load(&path).unwrap();
  assert_eq!(loaded, session);
  assert_eq!(loaded.hole(4).unwrap().override_value, Some(Value::Int(0)));

  assert!(matches!(Session::from_json("{"), Err(SketchError::Session(_))));
  assert!(matches!(Session::from_json(r#"{"container": "f(1)"}"#), Err(SketchError::Literal { .. })));
  assert_eq!(Session::load_or_new(&dir.path().join("none.json")).unwrap(), Session::new());
}

#[test]
fn test_session_persistence_of_extreme_numbers() {
  let mut session = Session::new();
  let captured = env(&[("big", Value::Int(i64::MAX)), ("small", Value::Int(i64::MIN))]);
  session.record(1, captured, Value::Float(f64::INFINITY)).unwrap();
  session.hole_or_default(1).generated = Some(Value::Float(f64::NEG_INFINITY));
  session.hole_or_default(2).generated = Some(Value::Float(f64::NAN));

  let loaded = Session::from_json(&session.to_json().unwrap()).unwrap();
  let record = loaded.hole(1).unwrap();
  // The smallest integer has no literal text and is left out.
  assert_eq!(record.observations[0].env, env(&[("big", Value::Int(i64::MAX))]));
  assert_eq!(record.observations[0].value, Value::Float(f64::INFINITY));
  assert_eq!(record.generated, Some(Value::Float(f64::NEG_INFINITY)));
  assert_eq!(loaded.container(), Some(&Value::Float(f64::INFINITY)));
  assert!(matches!(loaded.hole(2).unwrap().generated, Some(Value::Float(x)) if x.is_nan()));
}
