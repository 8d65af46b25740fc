//! Per-chip cross-talk run.
//!
//! For every configured chip the three injection-pattern maps are loaded,
//! classified and persisted independently. A failing chip is reported with
//! its id and either skipped or ends the run, depending on [`ErrorPolicy`].

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use crate::chip::ChipKey;
use crate::classifier::{classify, ClassificationResult, InjectionGrids};
use crate::config::{ErrorPolicy, RunConfig};
use crate::error::{Error, Result};
use crate::histogram::EfficiencyGrid;
use crate::render::{save_png, RenderOptions};
use crate::store::{DirectorySink, GridSink, GridSource, HistogramFile};
use crate::thresholds::Thresholds;

pub const XTALK_SUFFIX: &str = "xtalk";

/// Sources of the three injection patterns.
#[derive(Debug)]
pub struct InjectionSources<S> {
    pub self_injection: S,
    pub coupled_injection: S,
    pub uncoupled_injection: S,
}

impl<S: GridSource> InjectionSources<S> {
    /// Efficiency maps of one chip in self, coupled, uncoupled order.
    pub fn load(&self, key: &ChipKey, scan: &str) -> Result<[EfficiencyGrid; 3]> {
        let object_path = key.object_path(scan);
        let load = |pattern: &str, source: &S| -> Result<EfficiencyGrid> {
            let hist = source.fetch_histogram(&object_path)?;
            tracing::debug!(
                chip = key.chip,
                pattern,
                origin = %source.origin(),
                histogram = %hist.name,
                "Loaded injection map"
            );
            Ok(hist.to_efficiency_grid())
        };
        Ok([
            load("self", &self.self_injection)?,
            load("coupled", &self.coupled_injection)?,
            load("uncoupled", &self.uncoupled_injection)?,
        ])
    }
}

/// Loads and classifies one chip.
pub fn process_chip<S: GridSource>(
    sources: &InjectionSources<S>,
    key: &ChipKey,
    scan: &str,
    thresholds: &Thresholds,
) -> Result<ClassificationResult> {
    let [self_eff, coupled, uncoupled] = sources.load(key, scan)?;
    tracing::info!(
        chip = key.chip,
        n_rows = self_eff.rows(),
        n_columns = self_eff.cols(),
        "Classifying chip"
    );

    let result = classify(
        &InjectionGrids::new(&self_eff, &coupled, &uncoupled),
        thresholds,
    )?;

    for pixel in &result.dead {
        tracing::debug!(chip = key.chip, row = pixel.row, col = pixel.col, "Dead pixel");
    }
    for pixel in &result.confirmed {
        tracing::debug!(chip = key.chip, row = pixel.row, col = pixel.col, "Confirmed disconnected pixel");
    }
    tracing::info!(
        chip = key.chip,
        alive_efficiency = thresholds.alive_efficiency,
        coupled_efficiency = thresholds.coupled_efficiency,
        uncoupled_efficiency = thresholds.uncoupled_efficiency,
        dead = result.dead_count(),
        confirmed = result.confirmed_count(),
        "Chip classified"
    );

    Ok(result)
}

#[derive(Debug)]
pub struct ChipOutcome {
    pub chip: u32,
    pub dead: usize,
    pub confirmed: usize,
    pub output: PathBuf,
    pub plot: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ChipFailure {
    pub chip: u32,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub succeeded: Vec<ChipOutcome>,
    pub failed: Vec<ChipFailure>,
    /// Chips never attempted because the run was aborted.
    pub not_run: Vec<u32>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.not_run.is_empty()
    }

    pub fn log(&self) {
        let succeeded: Vec<u32> = self.succeeded.iter().map(|outcome| outcome.chip).collect();
        let failed: Vec<u32> = self.failed.iter().map(|failure| failure.chip).collect();
        if self.is_success() {
            tracing::info!(?succeeded, "Cross-talk run finished");
        } else {
            tracing::warn!(?succeeded, ?failed, not_run = ?self.not_run, "Cross-talk run finished with failures");
        }
    }
}

/// Runs every configured chip, opening inputs with `open` and writing through `sink`.
pub fn run_chips<S, K>(
    config: &RunConfig,
    open: impl Fn(&Path) -> Result<S>,
    sink: &mut K,
) -> Result<RunSummary>
where
    S: GridSource,
    K: GridSink,
{
    config.validate()?;
    let mut summary = RunSummary::default();

    for (index, &chip) in config.chips.iter().enumerate() {
        match run_one(config, chip, &open, sink) {
            Ok(outcome) => summary.succeeded.push(outcome),
            Err(error) => {
                tracing::error!(chip, %error, "Chip failed");
                summary.failed.push(ChipFailure { chip, error });
                if config.on_error == ErrorPolicy::Abort {
                    summary.not_run = config.chips[index + 1..].to_vec();
                    break;
                }
            }
        }
    }

    summary.log();
    Ok(summary)
}

fn run_one<S, K>(
    config: &RunConfig,
    chip: u32,
    open: &impl Fn(&Path) -> Result<S>,
    sink: &mut K,
) -> Result<ChipOutcome>
where
    S: GridSource,
    K: GridSink,
{
    let key = config.chip_key(chip);
    let sources = InjectionSources {
        self_injection: open(config.inputs.self_injection.as_path())?,
        coupled_injection: open(config.inputs.coupled_injection.as_path())?,
        uncoupled_injection: open(config.inputs.uncoupled_injection.as_path())?,
    };

    let result = process_chip(&sources, &key, &config.scan, &config.thresholds)?;
    let histogram = result.to_histogram(chip);
    let output = sink.persist(&config.module, chip, &histogram, &result.summary(&config.thresholds))?;
    tracing::info!(chip, path = %output.display(), "Result written");

    let plot = match &config.plot_dir {
        Some(dir) => {
            let path = dir.join(format!("{}_confirmed2D_chip{chip}.png", config.module));
            save_png(&histogram, &path, &RenderOptions::binary([0xFF, 0x00, 0x00]))?;
            Some(path)
        }
        None => None,
    };

    Ok(ChipOutcome {
        chip,
        dead: result.dead_count(),
        confirmed: result.confirmed_count(),
        output,
        plot,
    })
}

/// Runs the configuration against store files on disk.
pub fn run_xtalk(config: &RunConfig) -> Result<RunSummary> {
    let mut sink = DirectorySink::new(&config.output_dir, config.output_format, XTALK_SUFFIX);
    run_chips(config, |path: &Path| HistogramFile::open(path), &mut sink)
}
