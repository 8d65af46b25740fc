//! Forward/reverse bias S-curve comparison.
//!
//! A bump that is connected to the sensor changes its threshold and noise
//! when the sensor bias is reversed. Pixels whose `(Δthreshold, Δnoise)`
//! stays within `max_distance` of the origin are reported as missing.

use serde::{Deserialize, Serialize};

use crate::chip::ChipKey;
use crate::error::Result;
use crate::histogram::Histogram2D;
use crate::store::{Counts, GridSource, HistogramFile};

pub const THRESHOLD_SCAN: &str = "Threshold2D";
pub const NOISE_SCAN: &str = "Noise2D";
pub const DEFAULT_MAX_DISTANCE: f64 = 5.0;

pub const DELTA_THRESHOLD_HISTOGRAM: &str = "delta_thr";
pub const DELTA_NOISE_HISTOGRAM: &str = "delta_ns";
pub const MISSING_MAP_HISTOGRAM: &str = "missing_map";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasScanParams {
    pub max_distance: f64,
}

impl Default for BiasScanParams {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

/// Threshold and noise maps of one S-curve run.
#[derive(Debug, Clone)]
pub struct SCurveMaps {
    pub threshold: Histogram2D,
    pub noise: Histogram2D,
}

impl SCurveMaps {
    pub fn load(source: &impl GridSource, key: &ChipKey) -> Result<Self> {
        Ok(Self {
            threshold: source.fetch_histogram(&key.object_path(THRESHOLD_SCAN))?,
            noise: source.fetch_histogram(&key.object_path(NOISE_SCAN))?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BiasScanResult {
    pub delta_threshold: Histogram2D,
    pub delta_noise: Histogram2D,
    pub missing_map: Histogram2D,
}

impl BiasScanResult {
    pub fn missing_count(&self) -> usize {
        self.missing_map.nonzero_count()
    }

    pub fn summary(&self, params: &BiasScanParams) -> Counts {
        Counts::from([
            ("missing".to_string(), self.missing_count() as f64),
            ("total".to_string(), self.missing_map.contents.len() as f64),
            ("max_distance".to_string(), params.max_distance),
        ])
    }

    pub fn write_to(&self, file: &mut HistogramFile, params: &BiasScanParams) {
        file.put_histogram(self.delta_threshold.clone());
        file.put_histogram(self.delta_noise.clone());
        file.put_histogram(self.missing_map.clone());
        file.put_counts(crate::store::SUMMARY_OBJECT, self.summary(params));
    }
}

/// Compares forward- and reverse-bias maps bin by bin.
pub fn compare_bias(
    forward: &SCurveMaps,
    reverse: &SCurveMaps,
    params: &BiasScanParams,
) -> Result<BiasScanResult> {
    let reference = &forward.threshold;
    reference.ensure_same_shape(&forward.noise, "forward noise")?;
    reference.ensure_same_shape(&reverse.threshold, "reverse threshold")?;
    reference.ensure_same_shape(&reverse.noise, "reverse noise")?;

    let mut delta_threshold = forward.threshold.clone_as(DELTA_THRESHOLD_HISTOGRAM);
    let mut delta_noise = forward.noise.clone_as(DELTA_NOISE_HISTOGRAM);
    delta_threshold
        .contents
        .iter_mut()
        .zip(reverse.threshold.contents.iter())
        .for_each(|(value, reverse)| *value -= reverse);
    delta_noise
        .contents
        .iter_mut()
        .zip(reverse.noise.contents.iter())
        .for_each(|(value, reverse)| *value -= reverse);

    let mut missing_map = delta_threshold.empty_like(MISSING_MAP_HISTOGRAM, reference.title.clone());
    for ((flag, dthr), dns) in missing_map
        .contents
        .iter_mut()
        .zip(delta_threshold.contents.iter())
        .zip(delta_noise.contents.iter())
    {
        if dthr.hypot(*dns) <= params.max_distance {
            *flag = 1.0;
        }
    }

    tracing::info!(
        missing = missing_map.nonzero_count(),
        total = missing_map.contents.len(),
        max_distance = params.max_distance,
        "Bias scan comparison finished"
    );

    Ok(BiasScanResult {
        delta_threshold,
        delta_noise,
        missing_map,
    })
}
