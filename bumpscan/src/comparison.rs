//! Overlap of the three defect maps of one chip.
//!
//! Every bin is assigned to at most one of seven categories depending on
//! which of the X-ray, cross-talk and bias-scan maps flag it (non-zero
//! content). Bins flagged by none of them belong to no category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::bias_scan;
use crate::classifier::CONFIRMED_HISTOGRAM;
use crate::error::Result;
use crate::histogram::Histogram2D;
use crate::store::{Counts, HistogramFile};
use crate::xray;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, Serialize, Deserialize)]
pub enum Category {
    XrayExclusive,
    XtalkExclusive,
    FrbiasExclusive,
    XrayXtalk,
    XrayFrbias,
    XtalkFrbias,
    XrayXtalkFrbias,
}

impl Category {
    pub fn from_flags(xray: bool, xtalk: bool, frbias: bool) -> Option<Self> {
        match (xray, xtalk, frbias) {
            (false, false, false) => None,
            (true, false, false) => Some(Category::XrayExclusive),
            (false, true, false) => Some(Category::XtalkExclusive),
            (false, false, true) => Some(Category::FrbiasExclusive),
            (true, true, false) => Some(Category::XrayXtalk),
            (true, false, true) => Some(Category::XrayFrbias),
            (false, true, true) => Some(Category::XtalkFrbias),
            (true, true, true) => Some(Category::XrayXtalkFrbias),
        }
    }

    pub fn histogram_name(self) -> &'static str {
        match self {
            Category::XrayExclusive => "h_xray_exclusive",
            Category::XtalkExclusive => "h_xtalk_exclusive",
            Category::FrbiasExclusive => "h_frbias_exclusive",
            Category::XrayXtalk => "h_xray_xtalk",
            Category::XrayFrbias => "h_xray_frbias",
            Category::XtalkFrbias => "h_xtalk_frbias",
            Category::XrayXtalkFrbias => "h_xray_xtalk_frbias",
        }
    }

    /// Colour of flagged bins when rendered on white.
    pub fn color(self) -> [u8; 3] {
        match self {
            Category::XrayExclusive => [0x00, 0x00, 0xFF],
            Category::XtalkExclusive => [0xFF, 0x00, 0x00],
            Category::FrbiasExclusive => [0x00, 0xFF, 0x00],
            Category::XrayXtalk => [0xFF, 0x00, 0xFF],
            Category::XrayFrbias => [0x00, 0xFF, 0xFF],
            Category::XtalkFrbias => [0xFF, 0xFF, 0x00],
            Category::XrayXtalkFrbias => [0x00, 0x00, 0x00],
        }
    }
}

/// Names of the three input maps inside their result files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapNames {
    pub xray: String,
    pub xtalk: String,
    pub frbias: String,
}

impl Default for MapNames {
    fn default() -> Self {
        Self {
            xray: xray::MISSING_MAP_HISTOGRAM.to_string(),
            xtalk: CONFIRMED_HISTOGRAM.to_string(),
            frbias: bias_scan::MISSING_MAP_HISTOGRAM.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub maps: BTreeMap<Category, Histogram2D>,
}

impl ComparisonResult {
    pub fn count(&self, category: Category) -> usize {
        self.maps
            .get(&category)
            .map_or(0, Histogram2D::nonzero_count)
    }

    pub fn counts(&self) -> Counts {
        Category::iter()
            .map(|category| (category.histogram_name().to_string(), self.count(category) as f64))
            .collect()
    }

    pub fn write_to(&self, file: &mut HistogramFile) {
        for hist in self.maps.values() {
            file.put_histogram(hist.clone());
        }
        file.put_counts(crate::store::SUMMARY_OBJECT, self.counts());
    }
}

/// Splits the bins flagged by any of the three maps into exclusive categories.
pub fn compare_maps(
    xray_map: &Histogram2D,
    xtalk_map: &Histogram2D,
    frbias_map: &Histogram2D,
) -> Result<ComparisonResult> {
    xray_map.ensure_same_shape(xtalk_map, "cross-talk map")?;
    xray_map.ensure_same_shape(frbias_map, "bias scan map")?;

    let mut maps: BTreeMap<Category, Histogram2D> = Category::iter()
        .map(|category| {
            let hist = xray_map.empty_like(category.histogram_name(), xray_map.title.clone());
            (category, hist)
        })
        .collect();

    for (row, col, &xray) in xray_map.contents.indexed_iter() {
        let category = Category::from_flags(
            xray != 0.0,
            xtalk_map.value(row, col) != 0.0,
            frbias_map.value(row, col) != 0.0,
        );
        if let Some(hist) = category.and_then(|category| maps.get_mut(&category)) {
            hist.set_value(row, col, 1.0);
        }
    }

    let result = ComparisonResult { maps };
    for category in Category::iter() {
        tracing::info!(
            category = category.histogram_name(),
            bins = result.count(category),
            "Defect map overlap"
        );
    }
    Ok(result)
}

/// Loads the three top-level maps and compares them.
pub fn compare_files(
    xray_file: &HistogramFile,
    xtalk_file: &HistogramFile,
    frbias_file: &HistogramFile,
    names: &MapNames,
) -> Result<ComparisonResult> {
    compare_maps(
        xray_file.histogram(&names.xray)?,
        xtalk_file.histogram(&names.xtalk)?,
        frbias_file.histogram(&names.frbias)?,
    )
}
