//! `gstrecon run` / `gstrecon validate`: config-driven CIS vs GSTR-2B reconciliation.

use std::path::{Path, PathBuf};

use gstrecon::records::build_records;
use gstrecon::{Ledger, ReconConfig, ReconError, ReconResult};

use crate::exit_codes::{recon_exit_code, EXIT_RECON_INVALID_CONFIG, EXIT_UNMATCHED};
use crate::export::write_outputs;
use crate::load::load_input;
use crate::CliError;

/// Options for `gstrecon run`, straight from the command line.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub json: bool,
    pub output: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub fail_on_unmatched: bool,
    pub no_fuzzy: bool,
    pub no_reverse_clubbing: bool,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: ReconError) -> CliError {
    recon_err(recon_exit_code(&err), err.to_string())
}

/// Read and validate the config file. Relative paths inside it resolve
/// against the returned base directory.
fn read_config(config_path: &Path) -> Result<(ReconConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::io(format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = ReconConfig::from_toml(&config_str).map_err(|e| {
        recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string())
            .with_hint(format!("check {}", config_path.display()))
    })?;

    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

/// `--out-dir`, else `[output].dir` relative to the config, else `<config dir>/out`.
pub fn resolve_out_dir(cli: Option<PathBuf>, config: &ReconConfig, base_dir: &Path) -> PathBuf {
    match (cli, &config.output.dir) {
        (Some(dir), _) => dir,
        (None, Some(dir)) => base_dir.join(dir),
        (None, None) => base_dir.join("out"),
    }
}

fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "recon '{}': {}/{} CIS records matched ({:.2}%), {} unmatched, {} time-barred",
        result.meta.config_name,
        s.source_matched,
        s.source_records,
        s.match_rate_pct,
        s.source_unmatched,
        s.time_barred,
    );
    eprintln!(
        "GSTR-2B: {}/{} records matched, {} unmatched",
        s.reference_matched, s.reference_records, s.reference_unmatched,
    );
    for count in result.layer_stats.iter() {
        eprintln!("  {:<28} {}", count.layer.name(), count.matched_groups);
    }

    let a = &s.analysis;
    if a.total_unmatched > 0 {
        eprintln!(
            "unmatched: {} invoice format, {} GSTIN, {} zero amount, {} time-barred",
            a.invoice_format_issues, a.gstin_issues, a.amount_issues, a.time_barred,
        );
    }
}

pub fn cmd_run(config_path: PathBuf, opts: RunOptions) -> Result<(), CliError> {
    let (mut config, base_dir) = read_config(&config_path)?;
    if opts.no_fuzzy {
        config.layers.fuzzy = false;
    }
    if opts.no_reverse_clubbing {
        config.layers.reverse_clubbing = false;
    }

    let (resolved, input) = load_input(&config, &base_dir)?;

    let result = gstrecon::run_with_progress(&resolved, &input, |message, percent| {
        tracing::debug!("[{percent:>3}%] {message}");
    })
    .map_err(engine_err)?;

    let out_dir = resolve_out_dir(opts.out_dir, &config, &base_dir);
    for path in write_outputs(&result, &out_dir)? {
        eprintln!("wrote {}", path.display());
    }

    if opts.json || opts.output.is_some() {
        let json_str = result.to_json_pretty().map_err(engine_err)?;

        if let Some(ref path) = opts.output {
            std::fs::write(path, &json_str).map_err(|e| {
                CliError::io(format!("cannot write output {}: {e}", path.display()))
            })?;
            eprintln!("wrote {}", path.display());
        }

        if opts.json {
            println!("{json_str}");
        }
    }

    print_summary(&result);

    let unmatched = result.summary.source_unmatched;
    if opts.fail_on_unmatched && unmatched > 0 {
        return Err(recon_err(EXIT_UNMATCHED, format!("{unmatched} CIS record(s) unmatched")));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&config_path)?;
    let (resolved, input) = load_input(&config, &base_dir)?;

    let source = build_records(Ledger::Source, &input.source, &resolved.source.columns)
        .map_err(engine_err)?;
    let reference = build_records(Ledger::Reference, &input.reference, &resolved.reference.columns)
        .map_err(engine_err)?;

    eprintln!(
        "valid: recon '{}' with {} CIS record(s) from {}, {} GSTR-2B record(s) from {}",
        config.name,
        source.len(),
        config.source.file,
        reference.len(),
        config.reference.file,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: Option<&str>) -> ReconConfig {
        let mut toml = crate::sample::SAMPLE_CONFIG.replace("[output]\ndir = \"out\"\n", "");
        if let Some(dir) = dir {
            toml.push_str(&format!("\n[output]\ndir = \"{dir}\"\n"));
        }
        ReconConfig::from_toml(&toml).unwrap()
    }

    #[test]
    fn out_dir_flag_wins() {
        let got = resolve_out_dir(Some("/tmp/x".into()), &config(Some("reports")), Path::new("cfg"));
        assert_eq!(got, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn out_dir_from_config_is_config_relative() {
        let got = resolve_out_dir(None, &config(Some("reports")), Path::new("cfg"));
        assert_eq!(got, PathBuf::from("cfg/reports"));
    }

    #[test]
    fn out_dir_defaults_next_to_config() {
        let got = resolve_out_dir(None, &config(None), Path::new("cfg"));
        assert_eq!(got, PathBuf::from("cfg/out"));
    }

    #[test]
    fn unreadable_config_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_validate(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_IO);
    }
}
