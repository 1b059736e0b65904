mod files;
mod report;

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docsweep_core::{
    DocsweepConfig, DocsweepError, OutputFormat, VcsConfig, VcsKind, CONFIG_FILE_NAME,
};
use docsweep_history::{analyze_file, FileAnalysis};

/// Exit status when at least one file could not be analyzed.
const EXIT_SKIPPED: i32 = 2;
/// Exit status for `--exit-code` when a unit is over the threshold.
const EXIT_OUTDATED: i32 = 1;

#[derive(Parser)]
#[command(
    name = "docsweep",
    version,
    about = "Find Python docstrings that may have fallen behind their code",
    long_about = "docsweep mines version control history to find documentation that\n\
                   may be outdated: for every documented module, class, function and\n\
                   method it counts how often the code changed since the docstring last did.\n\n\
                   Examples:\n  \
                     docsweep check src/              Analyze every Python file under src/\n  \
                     docsweep check --format lint .   Emit flake8-style diagnostics\n  \
                     docsweep check --vcs hg app.py   Analyze a file in a Mercurial repository\n  \
                     docsweep init                    Create a .docsweep.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .docsweep.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show progress information
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Show debugging information, including every VCS command
    #[arg(long, short, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Report docstring staleness for Python files
    #[command(long_about = "Report docstring staleness for Python files.\n\n\
        Analyzes the newest committed revision of each file. Directories are\n\
        searched for *.py files, respecting .gitignore.\n\n\
        Examples:\n  docsweep check .\n  docsweep check --max-changes 3 --exit-code src/")]
    Check {
        /// Files or directories to analyze
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(
            long,
            default_value = "text",
            long_help = "Output format for the results.\n\n\
                           Formats:\n  \
                             text  Per-unit summary (default)\n  \
                             json  Machine-readable JSON with camelCase keys\n  \
                             lint  One flake8-style diagnostic per outdated docstring"
        )]
        format: OutputFormat,

        /// Version control system: git or hg
        #[arg(long)]
        vcs: Option<VcsKind>,

        /// Path to the version control executable
        #[arg(long)]
        vcs_executable: Option<PathBuf>,

        /// Stop at renames instead of following the file's earlier history
        #[arg(long)]
        no_follow_rename: bool,

        /// Code changes tolerated since the last docstring change
        #[arg(long)]
        max_changes: Option<usize>,

        /// Exit with status 1 if any docstring is over the threshold
        #[arg(long)]
        exit_code: bool,

        /// Number of files analyzed concurrently
        #[arg(long, short)]
        jobs: Option<usize>,
    },
    /// Create a default .docsweep.toml configuration file
    #[command(long_about = "Create a default .docsweep.toml configuration file.\n\n\
        Fails if .docsweep.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# docsweep configuration

# Version control system of the analyzed files: "git" or "hg".
vcs = "git"

# Follow renames when walking a file's history.
follow_rename = true

# Report docstrings whose code changed more than this many times since
# the docstring itself last changed.
max_changes = 0

# Number of files analyzed concurrently (default: available parallelism).
# jobs = 4

[git]
executable = "git"

[hg]
executable = "hg"
"#;

fn init_tracing(verbose: bool, debug: bool) {
    let default = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<DocsweepConfig> {
    let config = match explicit {
        Some(path) => DocsweepConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.exists() {
                DocsweepConfig::from_file(default_path)?
            } else {
                DocsweepConfig::default()
            }
        }
    };
    Ok(config)
}

/// Analyze `files` concurrently, returning results in input order.
///
/// A fatal error stops all pending work and is returned as the overall error.
async fn analyze_all(
    files: &[PathBuf],
    vcs: VcsConfig,
    jobs: usize,
    progress: Option<&indicatif::ProgressBar>,
) -> Result<Vec<Result<FileAnalysis, DocsweepError>>> {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let vcs = Arc::new(vcs);
    let mut tasks = JoinSet::new();

    for (index, path) in files.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let vcs = Arc::clone(&vcs);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = tokio::task::spawn_blocking(move || analyze_file(&path, &vcs)).await;
            (index, result)
        });
    }

    let mut results = Vec::with_capacity(files.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.into_diagnostic()?;
        let result = result.into_diagnostic()?;
        if let Some(pb) = progress {
            pb.inc(1);
        }
        match result {
            Err(err) if err.is_fatal() => {
                tasks.abort_all();
                return Err(err.into());
            }
            result => results.push((index, result)),
        }
    }

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}

async fn run_check(
    config: DocsweepConfig,
    paths: &[PathBuf],
    format: OutputFormat,
    exit_code: bool,
    show_progress: bool,
) -> Result<i32> {
    let files = files::expand_paths(paths);
    let vcs = config.vcs_config();
    let jobs = config.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    info!(
        files = files.len(),
        vcs = %vcs.kind,
        executable = %vcs.executable.display(),
        follow_renames = vcs.follow_renames,
        jobs,
        "starting analysis"
    );

    let progress = if show_progress && format == OutputFormat::Text && files.len() > 1 {
        let pb = indicatif::ProgressBar::new(files.len() as u64);
        pb.set_style(
            indicatif::ProgressStyle::with_template("{bar:30.cyan} {pos}/{len} files ({elapsed})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        Some(pb)
    } else {
        None
    };

    let results = analyze_all(&files, vcs, jobs, progress.as_ref()).await;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let mut analyses = Vec::new();
    let mut skipped = 0usize;
    for (path, result) in files.iter().zip(results?) {
        match result {
            Ok(analysis) => analyses.push(analysis),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping file");
                skipped += 1;
            }
        }
    }

    print!("{}", report::render(&analyses, format, config.max_changes)?);
    std::io::stdout().flush().into_diagnostic()?;

    if skipped > 0 {
        return Ok(EXIT_SKIPPED);
    }
    let outdated = analyses
        .iter()
        .flat_map(|a| &a.units)
        .any(|s| s.exceeds(config.max_changes));
    if exit_code && outdated {
        return Ok(EXIT_OUTDATED);
    }
    Ok(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    match cli.command {
        Command::Check {
            paths,
            format,
            vcs,
            vcs_executable,
            no_follow_rename,
            max_changes,
            exit_code,
            jobs,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(kind) = vcs {
                config.vcs = kind;
            }
            if let Some(executable) = vcs_executable {
                match config.vcs {
                    VcsKind::Git => config.git.executable = executable,
                    VcsKind::Mercurial => config.hg.executable = executable,
                }
            }
            if no_follow_rename {
                config.follow_rename = false;
            }
            if let Some(max) = max_changes {
                config.max_changes = max;
            }
            if jobs.is_some() {
                config.jobs = jobs;
            }

            let show_progress = std::io::stderr().is_terminal() && !cli.verbose && !cli.debug;
            let code = run_check(config, &paths, format, exit_code, show_progress).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE_NAME);
            if path.exists() {
                miette::bail!("{CONFIG_FILE_NAME} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE_NAME} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "docsweep", &mut std::io::stdout());
        }
    }

    Ok(())
}
