use crate::assemble::assemble;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::fuzzy::run_fuzzy_layer;
use crate::matcher::{run_standard_layer, STANDARD_LAYERS};
use crate::model::{Layer, Ledger, ReconInput, ReconResult};
use crate::records::build_records;
use crate::reverse::run_reverse_clubbing;
use crate::session::ReconSession;

/// Progress percentages reported before each of layers 1-6.
const STANDARD_LAYER_PROGRESS: [u8; 6] = [30, 40, 50, 60, 65, 70];

/// Run reconciliation per config. Returns annotated tables, stats and audit log.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    run_with_progress(config, input, |_, _| {})
}

/// Same as [`run`], reporting `(message, percent)` between stages.
///
/// All precondition errors surface before the first layer runs.
pub fn run_with_progress<F>(
    config: &ReconConfig,
    input: &ReconInput,
    mut progress: F,
) -> Result<ReconResult, ReconError>
where
    F: FnMut(&str, u8),
{
    config.validate()?;

    progress("Preprocessing data...", 10);
    let source = build_records(Ledger::Source, &input.source, &config.source.columns)?;
    let reference = build_records(Ledger::Reference, &input.reference, &config.reference.columns)?;
    log::info!(
        "reconciling {} source against {} reference records",
        source.len(),
        reference.len()
    );

    progress("Grouping CIS records...", 20);
    let mut session = ReconSession::new(source, reference);
    log::debug!("{} source groups", session.groups().len());

    for (spec, pct) in STANDARD_LAYERS.iter().zip(STANDARD_LAYER_PROGRESS) {
        progress(&format!("Running {}...", spec.layer), pct);
        let matched = run_standard_layer(&mut session, spec, &config.tolerance);
        session.record_layer(spec.layer, matched);
    }

    progress(&format!("Running {}...", Layer::Fuzzy), 75);
    let matched = if config.layers.fuzzy {
        run_fuzzy_layer(&mut session, &config.tolerance, config.layers.fuzzy_threshold)
    } else {
        log::info!("{} disabled", Layer::Fuzzy);
        0
    };
    session.record_layer(Layer::Fuzzy, matched);

    progress(&format!("Running {}...", Layer::ReverseClubbing), 85);
    let matched = if config.layers.reverse_clubbing {
        run_reverse_clubbing(&mut session, &config.tolerance)
    } else {
        log::info!("{} disabled", Layer::ReverseClubbing);
        0
    };
    session.record_layer(Layer::ReverseClubbing, matched);

    progress("Finalizing results...", 90);
    let result = assemble(config, input, session.finish());

    progress("Reconciliation complete!", 100);
    Ok(result)
}
