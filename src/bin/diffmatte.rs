use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{ArgAction, Parser};

const EXAMPLES: &str = "\
Examples:
  diffmatte ball_white.png ball_black.png ball.png
  diffmatte --single sprite.png sprite_transparent.png
  diffmatte --batch ./raw ./output";

/// Recover a true alpha channel from a subject shot over pure white and pure black.
#[derive(Parser, Debug)]
#[command(name = "diffmatte", version, after_help = EXAMPLES, arg_required_else_help = true)]
struct Cli {
    /// White-background image, black-background image, output PNG.
    #[arg(
        num_args = 3,
        value_names = ["WHITE", "BLACK", "OUTPUT"],
        conflicts_with_all = ["single", "batch"]
    )]
    paths: Vec<PathBuf>,

    /// Single-image fallback through an external background remover (less accurate).
    #[arg(long, num_args = 2, value_names = ["INPUT", "OUTPUT"], conflicts_with = "batch")]
    single: Option<Vec<PathBuf>>,

    /// Process every `<base>_white.*` / `<base>_black.*` pair in INPUT_DIR.
    #[arg(long, num_args = 2, value_names = ["INPUT_DIR", "OUTPUT_DIR"])]
    batch: Option<Vec<PathBuf>>,

    /// Split each extraction across rows in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (requires --parallel).
    #[arg(long, requires = "parallel")]
    threads: Option<usize>,

    /// Program used by --single (called as `<PROGRAM> i - -`).
    #[arg(long, default_value = diffmatte::DEFAULT_REMOVER)]
    remover: String,

    /// Write a JSON batch report to this path (--batch only).
    #[arg(long, requires = "batch")]
    report: Option<PathBuf>,

    /// Stop the batch at the first pair that fails.
    #[arg(long, requires = "batch")]
    fail_fast: bool,

    /// More log output (repeat for more).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug)]
enum Mode {
    TwoPass {
        white: PathBuf,
        black: PathBuf,
        output: PathBuf,
    },
    Single {
        input: PathBuf,
        output: PathBuf,
    },
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
    },
}

impl Cli {
    fn mode(&self) -> anyhow::Result<Mode> {
        match (
            self.single.as_deref(),
            self.batch.as_deref(),
            self.paths.as_slice(),
        ) {
            (Some([input, output]), None, []) => Ok(Mode::Single {
                input: input.clone(),
                output: output.clone(),
            }),
            (None, Some([input_dir, output_dir]), []) => Ok(Mode::Batch {
                input_dir: input_dir.clone(),
                output_dir: output_dir.clone(),
            }),
            (None, None, [white, black, output]) => Ok(Mode::TwoPass {
                white: white.clone(),
                black: black.clone(),
                output: output.clone(),
            }),
            _ => anyhow::bail!("expected <WHITE> <BLACK> <OUTPUT>, --single or --batch"),
        }
    }

    fn threading(&self) -> diffmatte::ExtractThreading {
        diffmatte::ExtractThreading {
            parallel: self.parallel,
            threads: self.threads,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        tracing::Level::ERROR
    } else {
        match verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.mode()? {
        Mode::TwoPass {
            white,
            black,
            output,
        } => cmd_two_pass(&cli, white, black, output),
        Mode::Single { input, output } => cmd_single(&cli, input, output),
        Mode::Batch {
            input_dir,
            output_dir,
        } => cmd_batch(&cli, input_dir, output_dir),
    }
}

fn cmd_two_pass(
    cli: &Cli,
    white: PathBuf,
    black: PathBuf,
    output: PathBuf,
) -> anyhow::Result<ExitCode> {
    diffmatte::extract_pair_file(&white, &black, &output, &cli.threading())
        .with_context(|| format!("extract alpha from '{}'", white.display()))?;
    eprintln!("wrote {}", output.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_single(cli: &Cli, input: PathBuf, output: PathBuf) -> anyhow::Result<ExitCode> {
    // Fail before touching any input when the remover cannot run.
    diffmatte::probe_remover(&cli.remover).require()?;

    let remover = diffmatte::CommandRemover::new(cli.remover.as_str());
    diffmatte::remove_background_file(&remover, &input, &output)
        .with_context(|| format!("remove background from '{}'", input.display()))?;
    eprintln!("wrote {}", output.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_batch(cli: &Cli, input_dir: PathBuf, output_dir: PathBuf) -> anyhow::Result<ExitCode> {
    let opts = diffmatte::BatchOptions {
        threading: cli.threading(),
        fail_fast: cli.fail_fast,
    };
    let report = diffmatte::match_and_process(&input_dir, &output_dir, &opts)
        .with_context(|| format!("batch process '{}'", input_dir.display()))?;

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        eprintln!("wrote {}", path.display());
    }

    println!("processed {} images", report.processed);

    // Unmatched files alone are an expected skip; only fail when nothing that was paired worked.
    if report.processed == 0 && report.failed() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
