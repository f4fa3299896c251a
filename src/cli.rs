//! CLI front door.
//!
//! Thin by design: argument parsing, file I/O, and progress printing live
//! here; everything else is the engine. The input file is never written —
//! output goes to `--output` or stdout.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::visitors::CommandVisitor;
use crate::{rename_with_stats, EngineError, IdentityVisitor, NameVisitor, RenameOptions};

/// Rename minified JavaScript identifiers with LLM-suggested names.
#[derive(Debug, Parser)]
#[command(name = "humanify", version, about)]
pub struct Cli {
    /// Input JavaScript file.
    pub input: PathBuf,

    /// Where to write the renamed source (defaults to stdout).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// External visitor command (JSON on stdin, name mapping on stdout).
    /// Without it the run is a pipeline dry-run that changes nothing.
    #[arg(long, value_name = "COMMAND")]
    pub visitor_cmd: Option<String>,

    /// Character budget for one prompt's code context.
    #[arg(long, default_value_t = 4_000)]
    pub context_size: usize,

    /// Maximum identifiers per LLM call.
    #[arg(long, default_value_t = 10)]
    pub batch_size: usize,

    /// Concurrent visitor calls.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Resume file: checkpoints are written to a sidecar derived from this
    /// path, and a matching sidecar is picked up on start.
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Require every handed-out name to be unique across the run.
    #[arg(long)]
    pub unique_names: bool,

    /// Fold scopes with at most this many bindings into shared batches
    /// (0 disables merging).
    #[arg(long, default_value_t = 2)]
    pub merge_limit: usize,

    /// Minimum context line count considered informative.
    #[arg(long, default_value_t = 16)]
    pub min_info_score: usize,

    /// Checkpoint every N batches while renames are landing.
    #[arg(long, default_value_t = 50)]
    pub checkpoint_interval: usize,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn options(&self) -> RenameOptions {
        let mut options = RenameOptions::new(self.context_size);
        options.max_batch_size = self.batch_size;
        options.batch_concurrency = self.concurrency;
        options.unique_names = self.unique_names;
        options.small_scope_merge_limit = self.merge_limit;
        options.min_information_score = self.min_info_score;
        options.dirty_checkpoint_interval = self.checkpoint_interval;
        options.resume_path = self.resume.clone();
        options.file_path = Some(self.input.clone());
        options
    }

    fn visitor(&self) -> Result<Arc<dyn NameVisitor>, CliError> {
        match &self.visitor_cmd {
            Some(command) => {
                let visitor = CommandVisitor::from_command_line(command)
                    .ok_or_else(|| CliError::EmptyVisitorCommand)?;
                Ok(Arc::new(visitor))
            }
            None => Ok(Arc::new(IdentityVisitor)),
        }
    }
}

/// CLI-level failures, wrapping engine errors with I/O context.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        source: io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        source: io::Error,
    },

    #[error("--visitor-cmd is empty")]
    EmptyVisitorCommand,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl CliError {
    /// Stable process exit code per failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ReadInput { .. } | CliError::WriteOutput { .. } => 3,
            CliError::EmptyVisitorCommand => 2,
            CliError::Engine(EngineError::Config(_)) => 2,
            CliError::Engine(EngineError::Parse(_)) => 4,
            CliError::Engine(_) => 10,
        }
    }
}

/// Run the CLI to completion.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let source = std::fs::read_to_string(&cli.input).map_err(|source| CliError::ReadInput {
        path: cli.input.clone(),
        source,
    })?;

    let visitor = cli.visitor()?;
    let options = cli.options();

    let progress: Option<crate::ProgressFn> = if io::stderr().is_terminal() {
        Some(Box::new(|fraction| {
            eprint!("\rrenaming... {:>5.1}%", fraction * 100.0);
            if fraction >= 1.0 {
                eprintln!();
            }
            let _ = io::stderr().flush();
        }))
    } else {
        None
    };

    let (renamed, stats) = rename_with_stats(&source, visitor, options, progress).await?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, renamed).map_err(|source| CliError::WriteOutput {
                path: path.clone(),
                source,
            })?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(renamed.as_bytes())
                .map_err(|source| CliError::WriteOutput {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
    }

    info!(
        batches = stats.batches,
        renames = stats.renames_applied,
        skipped = stats.bindings_skipped,
        "done"
    );
    Ok(())
}
