// gstrecon CLI - CIS purchase register vs GSTR-2B reconciliation

mod exit_codes;
mod export;
mod load;
mod logging;
mod recon;
mod sample;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_CSV_PARSE, EXIT_IO, EXIT_SUCCESS};
use recon::RunOptions;

#[derive(Parser)]
#[command(name = "gstrecon")]
#[command(about = "Reconcile a CIS purchase register against GSTR-2B")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  gstrecon run recon.toml
  gstrecon run recon.toml --json
  gstrecon run recon.toml --output result.json --out-dir reports/
  gstrecon run recon.toml --no-fuzzy --fail-on-unmatched")]
    Run {
        /// Path to the recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Directory for the annotated CSV outputs (default: [output].dir, else <config dir>/out)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Exit 1 when any CIS record is left unmatched
        #[arg(long)]
        fail_on_unmatched: bool,

        /// Skip layer 7 (fuzzy invoice match)
        #[arg(long)]
        no_fuzzy: bool,

        /// Skip layer 8 (reverse clubbing)
        #[arg(long)]
        no_reverse_clubbing: bool,
    },

    /// Validate a recon config and the CSV headers it names, without matching
    #[command(after_help = "\
Examples:
  gstrecon validate recon.toml")]
    Validate {
        /// Path to the recon.toml config file
        config: PathBuf,
    },

    /// Write synthetic CIS and GSTR-2B ledgers plus a matching recon.toml
    #[command(after_help = "\
Examples:
  gstrecon sample --out-dir demo/
  gstrecon sample --records 500 --seed 7 --out-dir demo/
  gstrecon run demo/recon.toml")]
    Sample {
        /// Number of base invoices (1-1000)
        #[arg(long, default_value_t = 100)]
        records: usize,

        /// RNG seed; the same seed always produces the same files
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Directory to write cis.csv, gstr2b.csv and recon.toml into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            out_dir,
            fail_on_unmatched,
            no_fuzzy,
            no_reverse_clubbing,
        } => recon::cmd_run(
            config,
            RunOptions { json, output, out_dir, fail_on_unmatched, no_fuzzy, no_reverse_clubbing },
        ),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Sample { records, seed, out_dir } => sample::cmd_sample(records, seed, out_dir),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CSV_PARSE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
