//! `sketch`: runs a program with a hole, and edits the session that resolves it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sketch::lang::eval_literal;
use sketch::harness::{run_file, Session, SketchError};

#[derive(Parser)]
#[command(name = "sketch")]
#[command(about = "Run a program containing a `??` hole and feed it values", long_about = None)]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
  /// Target program
  path: Option<PathBuf>,

  /// Session file to resolve the hole with
  #[arg(long)]
  session: Option<PathBuf>,

  /// Write the session to this file after the run
  #[arg(long)]
  save_session: Option<PathBuf>,

  /// Log level used when RUST_LOG is not set
  #[arg(long, env = "SKETCH_LOG", default_value = "warn", global = true)]
  log_level: String,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Record the value the hole should produce under the given bindings
  Record {
    #[arg(long)]
    session: PathBuf,
    /// Line of the hole
    #[arg(long)]
    line: usize,
    /// Value as a literal, e.g. `5` or `[1, 'a']`
    #[arg(long, allow_hyphen_values = true)]
    value: String,
    /// Local binding as `name:literal`
    #[arg(long = "local")]
    locals: Vec<String>,
    /// Global binding as `name:literal`
    #[arg(long = "global")]
    globals: Vec<String>,
  },

  /// Install a candidate expression for a hole, clearing its override
  Solve {
    #[arg(long)]
    session: PathBuf,
    #[arg(long)]
    line: usize,
    #[arg(long)]
    expr: String,
  },

  /// Clear the override of a hole
  Clear {
    #[arg(long)]
    session: PathBuf,
    #[arg(long)]
    line: usize,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level.as_str().into()))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).without_time())
    .init();

  match execute(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("error: {e}");
      ExitCode::FAILURE
    }
  }
}

fn execute(cli: Cli) -> Result<(), SketchError> {
  match cli.command {
    Some(Command::Record { session, line, value, locals, globals }) => {
      let value = eval_literal(&value).map_err(|err| SketchError::Literal { text: value.clone(), err })?;
      update(&session, |s| s.record_observation(&locals.join("\n"), &globals.join("\n"), value, line))
    }
    Some(Command::Solve { session, line, expr }) => update(&session, |s| {
      s.set_candidate(line, expr);
      Ok(())
    }),
    Some(Command::Clear { session, line }) => update(&session, |s| {
      if !s.clear_override(line) {
        info!(line, "no override to clear");
      }
      Ok(())
    }),
    None => match cli.path {
      Some(path) => run(&path, cli.session.as_deref(), cli.save_session.as_deref()),
      None => {
        println!("usage: sketch <PATH>: no program given, nothing to run");
        Ok(())
      }
    },
  }
}

fn run(path: &Path, session: Option<&Path>, save_to: Option<&Path>) -> Result<(), SketchError> {
  let mut session = match session {
    Some(file) => Session::load(file)?,
    None => Session::new(),
  };
  let res = run_file(path, &mut session, &mut std::io::stdout());
  if let Some(file) = save_to {
    session.save(file)?;
  }
  res
}

/// Loads the session file (empty if missing), applies `f` and writes it back.
fn update(path: &Path, f: impl FnOnce(&mut Session) -> Result<(), SketchError>) -> Result<(), SketchError> {
  let mut session = Session::load_or_new(path)?;
  f(&mut session)?;
  session.save(path)
}
