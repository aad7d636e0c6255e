//! `inherit session`: long-lived pipeline fed batches on stdin.
//!
//! Each non-empty line is one batch of whitespace-separated paths. The graph
//! and cache persist across lines, so later batches emit dependents learned
//! from earlier ones. A line consisting of `:reset` clears that state.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Args;
use inherit_core::Context;
use tracing::{debug, info};

use super::{EngineArgs, render_report_text, run_batch};
use crate::output::{CliError, OutputMode, render, render_error};

/// Line that resets the session context.
pub const RESET_COMMAND: &str = ":reset";

/// Arguments for `inherit session`.
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Execute `inherit session` over stdin.
pub fn run_session(
    args: &SessionArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let engine = args.engine.build_engine(project_root, output)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    drive(&engine, stdin.lock(), &mut stdout.lock(), output)
}

/// Run batches read from `input`, writing one report per batch to `out`.
///
/// Unreadable files fail their batch only; the session keeps going.
fn drive(
    engine: &inherit_core::Engine,
    input: impl BufRead,
    out: &mut dyn Write,
    output: OutputMode,
) -> anyhow::Result<()> {
    let mut context = Context::new();
    let mut batch = 0;

    for line in input.lines() {
        let line = line.context("failed to read batch from stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == RESET_COMMAND {
            context.reset();
            info!("session context reset");
            continue;
        }

        batch += 1;
        let paths: Vec<PathBuf> = line.split_whitespace().map(PathBuf::from).collect();
        debug!(batch, files = paths.len(), "session batch");

        match run_batch(engine, &mut context, &paths, batch) {
            Ok(report) => render(out, output, &report, true, |report, w| {
                writeln!(w, "# batch {}", report.batch)?;
                render_report_text(report, w)
            })?,
            Err(err) => render_error(output, &CliError::from_inherit(&err))?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inherit_core::Engine;

    fn fixture() -> (tempfile::TempDir, Engine) {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::write(root.path().join("page"), "@include base\n").expect("write");
        std::fs::write(root.path().join("base"), "base\n").expect("write");
        let engine = Engine::builder()
            .pattern(r"(?m)^@include\s+(.+)$")
            .root(root.path())
            .build()
            .expect("engine");
        (root, engine)
    }

    fn session(engine: &Engine, root: &Path, script: &str) -> String {
        let script = script.replace("{root}", &root.display().to_string());
        let mut out = Vec::new();
        drive(engine, script.as_bytes(), &mut out, OutputMode::Text).expect("session");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn later_batches_see_earlier_dependents() {
        let (root, engine) = fixture();
        let text = session(&engine, root.path(), "{root}/page {root}/base\n\n{root}/base\n");
        let page = root.path().join("page").display().to_string();
        assert_eq!(text, format!("# batch 1\n{page}\n# batch 2\n{page}\n"));
    }

    #[test]
    fn reset_forgets_dependents() {
        let (root, engine) = fixture();
        let text = session(
            &engine,
            root.path(),
            "{root}/page {root}/base\n:reset\n{root}/base\n",
        );
        let base = root.path().join("base").display().to_string();
        assert!(text.ends_with(&format!("# batch 2\n{base}\n")));
    }

    #[test]
    fn unreadable_file_does_not_end_session() {
        let (root, engine) = fixture();
        let text = session(&engine, root.path(), "{root}/missing\n{root}/base\n");
        let base = root.path().join("base").display().to_string();
        assert_eq!(text, format!("# batch 2\n{base}\n"));
    }
}
