//! Cross-talk run configuration.

use std::path::{Path, PathBuf};

use common::file_format::FileFormat;
use serde::{Deserialize, Serialize};

use crate::chip::{ChipKey, PIXEL_ALIVE};
use crate::error::{Error, Result};
use crate::thresholds::Thresholds;

/// What to do when one chip fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Report the chip and continue with the next one.
    #[default]
    Skip,
    /// Stop the run at the first failing chip.
    Abort,
}

/// Store files of the three injection patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionInputs {
    pub self_injection: PathBuf,
    pub coupled_injection: PathBuf,
    pub uncoupled_injection: PathBuf,
}

fn default_scan() -> String {
    PIXEL_ALIVE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Module identifier used in output names.
    pub module: String,
    pub chips: Vec<u32>,
    #[serde(default)]
    pub board: u32,
    #[serde(default)]
    pub optical_group: u32,
    #[serde(default)]
    pub hybrid: u32,
    #[serde(default = "default_scan")]
    pub scan: String,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub plot_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_format: FileFormat,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    pub inputs: InjectionInputs,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl RunConfig {
    pub fn new(
        module: impl Into<String>,
        chips: Vec<u32>,
        inputs: InjectionInputs,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            module: module.into(),
            chips,
            board: 0,
            optical_group: 0,
            hybrid: 0,
            scan: default_scan(),
            output_dir: output_dir.into(),
            plot_dir: None,
            output_format: FileFormat::Json,
            on_error: ErrorPolicy::Skip,
            inputs,
            thresholds: Thresholds::default(),
        }
    }

    /// Reads a `.yaml`, `.yml`, `.json` or `.toml` file and validates it.
    pub fn load(path: &Path) -> Result<Self> {
        let format = FileFormat::from_path(path).map_err(|source| Error::Format {
            path: path.to_path_buf(),
            source,
        })?;
        if format == FileFormat::Bin {
            return Err(Error::InvalidConfig(format!(
                "'{}': configuration must be yaml, json or toml",
                path.display()
            )));
        }
        let bytes = std::fs::read(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig =
            common::serde::deserialize(&bytes, format).map_err(|e| Error::Decode {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.module.trim().is_empty() {
            return Err(Error::InvalidConfig("module must not be empty".to_string()));
        }
        if self.chips.is_empty() {
            return Err(Error::InvalidConfig("chips must list at least one chip".to_string()));
        }
        if self.scan.trim().is_empty() {
            return Err(Error::InvalidConfig("scan must not be empty".to_string()));
        }
        if self.output_format == FileFormat::Toml {
            return Err(Error::InvalidConfig(
                "output_format must be json, yaml or bin".to_string(),
            ));
        }
        self.thresholds.validate()
    }

    pub fn chip_key(&self, chip: u32) -> ChipKey {
        ChipKey::with_location(self.board, self.optical_group, self.hybrid, chip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "\
module: RH0026
chips: [12, 13]
inputs:
  self_injection: inputroot/Run000059_PixelAlive.json
  coupled_injection: inputroot/Run000060_PixelAlive.json
  uncoupled_injection: inputroot/Run000061_PixelAlive.json
thresholds:
  alive_efficiency: 0.85
output_dir: outputroot/xtalk
on_error: abort
";

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_load_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::load(&write(dir.path(), "run.yaml", YAML)).unwrap();

        assert_eq!(config.module, "RH0026");
        assert_eq!(config.chips, vec![12, 13]);
        assert_eq!(config.scan, "PixelAlive");
        assert_eq!(config.board, 0);
        assert_eq!(config.thresholds, Thresholds::new(0.85, 0.5, 0.3));
        assert_eq!(config.output_format, FileFormat::Json);
        assert_eq!(config.plot_dir, None);
        assert_eq!(config.on_error, ErrorPolicy::Abort);
        assert_eq!(
            config.chip_key(12).object_path(&config.scan),
            "Detector/Board_0/OpticalGroup_0/Hybrid_0/Chip_12/D_B(0)_O(0)_H(0)_PixelAlive_Chip(12)"
        );
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = InjectionInputs {
            self_injection: "a.json".into(),
            coupled_injection: "b.json".into(),
            uncoupled_injection: "c.json".into(),
        };
        let mut config = RunConfig::new("RH0027", vec![15], inputs, "out");
        config.plot_dir = Some("plots".into());
        config.output_format = FileFormat::Bin;

        for name in ["run.json", "run.toml"] {
            let format = FileFormat::from_file_name(name).unwrap();
            let text = String::from_utf8(common::serde::serialize(&config, format).unwrap()).unwrap();
            let loaded = RunConfig::load(&write(dir.path(), name, &text)).unwrap();
            assert_eq!(loaded, config, "{name}");
        }
    }

    #[test]
    fn test_invalid_threshold_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let text = YAML.replace("0.85", "1.85");
        let err = RunConfig::load(&write(dir.path(), "run.yml", &text)).unwrap_err();
        assert!(matches!(err, Error::ThresholdOutOfRange { .. }));
    }

    #[test]
    fn test_empty_chips_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let text = YAML.replace("[12, 13]", "[]");
        let err = RunConfig::load(&write(dir.path(), "run.yaml", &text)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_field_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::load(&write(dir.path(), "run.yaml", "module: RH0026\n")).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = RunConfig::load(Path::new("run.ini")).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
