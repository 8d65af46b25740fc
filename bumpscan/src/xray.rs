//! X-ray missing-bump analysis.
//!
//! Under uniform X-ray illumination every connected pixel collects hits.
//! Enabled pixels with (almost) no hits have lost their bump bond.


use common::Grid;
use serde::{Deserialize, Serialize};

use crate::enable_mask::EnableMask;
use crate::error::{Error, Result};
use crate::histogram::Histogram2D;
use crate::store::{Counts, HistogramFile};

pub const MISSING_MAP_HISTOGRAM: &str = "MissingMap";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrayParams {
    /// Pixels with fewer hits are missing.
    pub missing_hits: f64,
    /// Pixels with fewer hits (but at least `missing_hits`) have low occupancy.
    pub low_occupancy_hits: f64,
    pub triggers: f64,
    /// Bunch crossings read out per trigger.
    pub bursts: f64,
}

impl Default for XrayParams {
    fn default() -> Self {
        Self {
            missing_hits: 1.0,
            low_occupancy_hits: 1000.0,
            triggers: 1e7,
            bursts: 10.0,
        }
    }
}

impl XrayParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.triggers > 0.0 && self.bursts > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "triggers ({}) and bursts ({}) must be positive",
                self.triggers, self.bursts
            )));
        }
        if self.low_occupancy_hits < self.missing_hits {
            return Err(Error::InvalidConfig(format!(
                "low_occupancy_hits ({}) must not be below missing_hits ({})",
                self.low_occupancy_hits, self.missing_hits
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter)]
pub enum BumpStatus {
    Masked,
    MaskedWithHits,
    Missing,
    LowOccupancy,
    Good,
}

impl BumpStatus {
    pub fn classify(enabled: bool, hits: f64, params: &XrayParams) -> Self {
        match (enabled, hits < params.missing_hits) {
            (false, true) => BumpStatus::Masked,
            (false, false) => BumpStatus::MaskedWithHits,
            (true, true) => BumpStatus::Missing,
            (true, false) if hits < params.low_occupancy_hits => BumpStatus::LowOccupancy,
            (true, false) => BumpStatus::Good,
        }
    }

    /// Value in the stored missing map.
    pub fn map_value(self) -> f64 {
        match self {
            BumpStatus::Missing => 1.0,
            BumpStatus::LowOccupancy => -1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct XraySummary {
    pub total: usize,
    pub masked: usize,
    pub masked_with_hits: usize,
    pub missing: usize,
    pub low_occupancy: usize,
    pub good: usize,
    pub missing_percentage: f64,
    pub low_occupancy_percentage: f64,
}

impl XraySummary {
    pub fn disabled(&self) -> usize {
        self.masked + self.masked_with_hits
    }

    pub fn enabled(&self) -> usize {
        self.total - self.disabled()
    }

    pub fn to_counts(&self) -> Counts {
        Counts::from([
            ("total".to_string(), self.total as f64),
            ("masked".to_string(), self.masked as f64),
            ("masked_with_hits".to_string(), self.masked_with_hits as f64),
            ("missing".to_string(), self.missing as f64),
            ("low_occupancy".to_string(), self.low_occupancy as f64),
            ("good".to_string(), self.good as f64),
            ("missing_percentage".to_string(), self.missing_percentage),
            ("low_occupancy_percentage".to_string(), self.low_occupancy_percentage),
        ])
    }
}

fn percentage(count: usize, of: usize) -> f64 {
    if of == 0 {
        0.0
    } else {
        count as f64 / of as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct XrayResult {
    pub hits: Grid<f64>,
    pub statuses: Grid<BumpStatus>,
    pub summary: XraySummary,
}

impl XrayResult {
    pub fn missing_map(&self) -> Histogram2D {
        Histogram2D::from_grid(
            MISSING_MAP_HISTOGRAM,
            "Missing Map",
            &self.statuses.map(|status| status.map_value()),
        )
    }

    pub fn hit_map(&self) -> Histogram2D {
        Histogram2D::from_grid("HitMap", "Hit Map", &self.hits)
    }

    pub fn write_to(&self, file: &mut HistogramFile) {
        file.put_histogram(self.missing_map());
        file.put_histogram(self.hit_map());
        file.put_counts(crate::store::SUMMARY_OBJECT, self.summary.to_counts());
    }
}

/// Classifies every pixel of an X-ray occupancy map against the enable mask.
pub fn analyze_xray(
    occupancy: &Histogram2D,
    mask: &EnableMask,
    params: &XrayParams,
) -> Result<XrayResult> {
    params.validate()?;
    if occupancy.shape() != mask.shape() {
        return Err(Error::DimensionMismatch {
            grid: "enable mask".to_string(),
            expected: occupancy.shape(),
            actual: mask.shape(),
        });
    }

    let scale = params.triggers * params.bursts;
    let hits = occupancy.contents.map(|&value| value * scale);
    let statuses = hits
        .zip_map(mask, |&count, &enabled| BumpStatus::classify(enabled, count, params))
        .map_err(|e| Error::InvalidHistogram {
            name: occupancy.name.clone(),
            reason: e.to_string(),
        })?;

    let mut summary = XraySummary {
        total: statuses.len(),
        ..XraySummary::default()
    };
    for (row, col, status) in statuses.indexed_iter() {
        match status {
            BumpStatus::Masked => summary.masked += 1,
            BumpStatus::MaskedWithHits => summary.masked_with_hits += 1,
            BumpStatus::Missing => {
                summary.missing += 1;
                tracing::debug!(row, col, "Missing bump");
            }
            BumpStatus::LowOccupancy => summary.low_occupancy += 1,
            BumpStatus::Good => summary.good += 1,
        }
    }
    summary.missing_percentage = percentage(summary.missing, summary.enabled());
    summary.low_occupancy_percentage = percentage(summary.low_occupancy, summary.enabled());

    tracing::info!(
        masked = summary.disabled(),
        missing = summary.missing,
        missing_percentage = %format!("{:.4}", summary.missing_percentage),
        low_occupancy = summary.low_occupancy,
        low_occupancy_percentage = %format!("{:.4}", summary.low_occupancy_percentage),
        masked_with_hits = summary.masked_with_hits,
        good = summary.good,
        "X-ray analysis finished"
    );

    Ok(XrayResult {
        hits,
        statuses,
        summary,
    })
}
