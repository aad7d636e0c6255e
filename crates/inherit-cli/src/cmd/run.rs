//! `inherit run`: one batch over the files named on the command line.

use std::path::{Path, PathBuf};

use clap::Args;
use inherit_core::Context;

use super::{EngineArgs, render_report_text, run_batch};
use crate::output::{CliError, OutputMode, render, render_error};

/// Arguments for `inherit run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Files forming the batch, in order.
    #[arg(required = true, value_name = "PATHS")]
    pub paths: Vec<PathBuf>,
}

/// Execute `inherit run`.
pub fn run_run(args: &RunArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let engine = args.engine.build_engine(project_root, output)?;
    let mut context = Context::new();

    let report = match run_batch(&engine, &mut context, &args.paths, 1) {
        Ok(report) => report,
        Err(err) => {
            render_error(output, &CliError::from_inherit(&err))?;
            anyhow::bail!(err);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    render(&mut out, output, &report, false, render_report_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn run_args_require_paths() {
        assert!(Wrapper::try_parse_from(["test"]).is_err());
    }

    #[test]
    fn run_args_parse_paths_and_flags() {
        let parsed = Wrapper::parse_from(["test", "--include-all", "a.scss", "b.scss"]);
        assert!(parsed.args.engine.include_all);
        assert_eq!(
            parsed.args.paths,
            vec![PathBuf::from("a.scss"), PathBuf::from("b.scss")]
        );
    }
}
