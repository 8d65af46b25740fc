//! Bumpscan - bump-bond defect analyses for hybrid pixel detector modules.
//!
//! This library provides:
//! - Cross-talk classification of disconnected bump bonds from three
//!   injection-pattern efficiency maps
//! - Forward/reverse bias S-curve comparison
//! - X-ray missing-bump analysis against the chip enable mask
//! - Overlap of the resulting defect maps
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bumpscan::{classify, HistogramFile, InjectionGrids, Thresholds, ChipKey};
//!
//! let key = ChipKey::new(12);
//! let path = key.object_path(bumpscan::PIXEL_ALIVE);
//! let self_eff = HistogramFile::open("Run000059_PixelAlive.json")?.canvas_primitive(&path, None)?.to_efficiency_grid();
//! // ... coupled and uncoupled likewise
//!
//! let result = classify(&InjectionGrids::new(&self_eff, &coupled, &uncoupled), &Thresholds::default())?;
//! println!("{} disconnected pixels", result.confirmed_count());
//! ```

pub mod bias_scan;
pub mod chip;
pub mod classifier;
pub mod comparison;
pub mod config;
pub mod enable_mask;
pub mod error;
pub mod histogram;
pub mod render;
pub mod run;
pub mod store;
pub mod thresholds;
pub mod toy;
pub mod xray;

// ============================================================================
// Core types
// ============================================================================

pub use chip::{ChipKey, PIXEL_ALIVE};
pub use error::{Error, Result};
pub use histogram::{Axis, EfficiencyGrid, Histogram2D};
pub use store::{Canvas, Counts, DirectorySink, GridSink, GridSource, HistogramFile, StoredObject};

// ============================================================================
// Cross-talk classification
// ============================================================================

pub use classifier::{
    classify, classify_pixel, ClassificationResult, InjectionGrids, Pixel, PixelClass,
    PixelEfficiencies,
};
pub use config::{ErrorPolicy, InjectionInputs, RunConfig};
pub use run::{process_chip, run_chips, run_xtalk, InjectionSources, RunSummary};
pub use thresholds::Thresholds;

// ============================================================================
// Sibling analyses
// ============================================================================

pub use bias_scan::{compare_bias, BiasScanParams, BiasScanResult, SCurveMaps};
pub use comparison::{compare_files, compare_maps, Category, ComparisonResult, MapNames};
pub use enable_mask::{parse_enable_mask, read_enable_mask, EnableMask};
pub use toy::{toy_histograms, write_toy_histograms, ToyParams};
pub use xray::{analyze_xray, BumpStatus, XrayParams, XrayResult, XraySummary};

// ============================================================================
// Rendering
// ============================================================================

pub use render::{render, save_png, Palette, RenderOptions};
