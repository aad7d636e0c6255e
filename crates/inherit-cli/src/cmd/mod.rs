pub mod run;
pub mod session;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use inherit_core::{
    Context, Engine, EngineConfig, FileRecord, InheritError, NormalizeMode, Record, load_config,
    load_config_file,
};
use serde::Serialize;
use tracing::debug;

use crate::output::{CliError, OutputMode, render_error};

/// Engine options shared by every command.
///
/// Values given on the command line override `.inherit.toml`.
#[derive(Args, Debug, Default, Clone)]
pub struct EngineArgs {
    /// Regular expression whose first capture group matches a reference.
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Emit every changed file, not only leaves and dependents.
    #[arg(long)]
    pub include_all: bool,

    /// Key files by the path they were first read from.
    #[arg(long)]
    pub original_paths: bool,

    /// How files are keyed in the dependency graph.
    #[arg(long, value_enum, value_name = "MODE")]
    pub normalize: Option<NormalizeArg>,

    /// Characters trimmed from the start of basename keys.
    #[arg(long, value_name = "CHARS")]
    pub strip_prefix: Option<String>,

    /// Configuration file (default: .inherit.toml in the working directory).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NormalizeArg {
    /// Absolute path resolved against the working directory.
    Absolute,
    /// File name only.
    Basename,
}

impl From<NormalizeArg> for NormalizeMode {
    fn from(arg: NormalizeArg) -> Self {
        match arg {
            NormalizeArg::Absolute => Self::Absolute,
            NormalizeArg::Basename => Self::Basename,
        }
    }
}

impl EngineArgs {
    /// Load the config file and layer command-line overrides on top.
    pub fn resolve_config(&self, project_root: &Path) -> Result<EngineConfig, InheritError> {
        let mut cfg = match &self.config {
            Some(path) => load_config_file(path)?,
            None => load_config(project_root)?,
        };

        if let Some(pattern) = &self.pattern {
            cfg.pattern = Some(pattern.clone());
        }
        cfg.include_all |= self.include_all;
        cfg.original_paths |= self.original_paths;
        if let Some(mode) = self.normalize {
            cfg.normalize = mode.into();
        }
        if let Some(strip) = &self.strip_prefix {
            cfg.strip_prefix.clone_from(strip);
        }

        debug!(?cfg, "resolved engine config");
        Ok(cfg)
    }

    /// Build the engine, rendering construction errors in `output` mode.
    pub fn build_engine(&self, project_root: &Path, output: OutputMode) -> anyhow::Result<Engine> {
        let built = self
            .resolve_config(project_root)
            .and_then(|cfg| cfg.builder::<FileRecord>().root(project_root).build());

        match built {
            Ok(engine) => Ok(engine),
            Err(err) => {
                render_error(output, &CliError::from_inherit(&err))?;
                anyhow::bail!(err)
            }
        }
    }
}

/// One emitted file as reported to the user.
#[derive(Debug, Serialize)]
pub struct EmittedFile {
    pub path: String,
    pub bytes: usize,
}

/// Result of one batch.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub batch: usize,
    pub integrated: usize,
    pub emitted: Vec<EmittedFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycles: Vec<Vec<String>>,
}

/// Read `paths` and run them through `engine` as a single batch.
///
/// A file that cannot be read aborts the batch before anything is integrated.
pub fn run_batch(
    engine: &Engine,
    context: &mut Context,
    paths: &[PathBuf],
    batch: usize,
) -> Result<BatchReport, InheritError> {
    let records = paths
        .iter()
        .map(FileRecord::read)
        .collect::<Result<Vec<_>, _>>()?;

    let mut pass = engine.begin(context);
    let integrated = records
        .into_iter()
        .filter_map(|record| pass.integrate(record))
        .count();
    let emitted = pass.finish();

    let emitted = emitted
        .iter()
        .map(|record| EmittedFile {
            path: record.path().display().to_string(),
            bytes: record.contents().len(),
        })
        .collect();

    let cycles = context
        .graph()
        .cycles()
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|key| key.to_string()).collect())
        .collect();

    Ok(BatchReport {
        batch,
        integrated,
        emitted,
        cycles,
    })
}

/// Text rendering: one emitted path per line.
pub fn render_report_text(report: &BatchReport, w: &mut dyn Write) -> std::io::Result<()> {
    for file in &report.emitted {
        writeln!(w, "{}", file.path)?;
    }
    Ok(())
}
