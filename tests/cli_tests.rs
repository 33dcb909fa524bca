use std::path::Path;
use std::process::{Command, Output};

use sketch::harness::Session;
use sketch::lang::Value;

fn sketch(dir: &Path, args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_sketch"))
    .current_dir(dir)
    .env_remove("RUST_LOG")
    .args(args)
    .output()
    .unwrap()
}

fn stdout(out: &Output) -> String {
  String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn test_no_program() {
  let dir = tempfile::tempdir().unwrap();
  let out = sketch(dir.path(), &[]);
  assert!(out.status.success());
  assert!(stdout(&out).contains("no program"));
}

#[test]
fn test_record_then_run() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("prog.sk"), "x = ??\nprint(x * 2)\n").unwrap();
  let out = sketch(dir.path(), &["record", "--session", "s.json", "--line", "1", "--value", "21"]);
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  let out = sketch(dir.path(), &["prog.sk", "--session", "s.json"]);
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  assert_eq!(stdout(&out), "42\n");
}

#[test]
fn test_solve_then_run() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("prog.sk"), "a = 4\nb = ??\nprint(b)\n").unwrap();
  assert!(sketch(dir.path(), &["solve", "--session", "s.json", "--line", "2", "--expr", "a * a"]).status.success());
  let out = sketch(dir.path(), &["prog.sk", "--session", "s.json", "--save-session", "after.json"]);
  assert_eq!(stdout(&out), "16\n");
  let saved = Session::load(&dir.path().join("after.json")).unwrap();
  assert_eq!(saved.hole(2).unwrap().generated, Some(Value::Int(16)));
}

#[test]
fn test_record_overrides_and_clear() {
  let dir = tempfile::tempdir().unwrap();
  let session = dir.path().join("s.json");
  assert!(sketch(dir.path(), &["solve", "--session", "s.json", "--line", "3", "--expr", "a + 1"]).status.success());
  let args = ["record", "--session", "s.json", "--line", "3", "--value", "-5", "--local", "a: 1", "--global", "g: 2"];
  assert!(sketch(dir.path(), &args).status.success());
  let loaded = Session::load(&session).unwrap();
  assert_eq!(loaded.hole(3).unwrap().override_value, Some(Value::Int(-5)));
  assert_eq!(loaded.hole(3).unwrap().observations.len(), 1);

  assert!(sketch(dir.path(), &["clear", "--session", "s.json", "--line", "3"]).status.success());
  assert_eq!(Session::load(&session).unwrap().hole(3).unwrap().override_value, None);
}

#[test]
fn test_failures_exit_non_zero() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("two.sk"), "x = ??\ny = ??\n").unwrap();
  let out = sketch(dir.path(), &["two.sk"]);
  assert!(!out.status.success());
  assert!(String::from_utf8_lossy(&out.stderr).contains("multiple holes"));
  assert!(stdout(&out).is_empty());

  let out = sketch(dir.path(), &["record", "--session", "s.json", "--line", "1", "--value", "None"]);
  assert!(!out.status.success());
  assert!(!dir.path().join("s.json").exists());
}
