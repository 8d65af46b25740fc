use std::collections::HashMap;

use common::Grid;

use super::*;
use crate::chip::PIXEL_ALIVE;
use crate::config::InjectionInputs;
use crate::histogram::Histogram2D;
use crate::store::{Counts, SUMMARY_OBJECT};

#[derive(Default)]
struct MemorySink {
    written: Vec<(String, u32, Histogram2D, Counts)>,
}

impl GridSink for MemorySink {
    fn persist(
        &mut self,
        module: &str,
        chip: u32,
        histogram: &Histogram2D,
        summary: &Counts,
    ) -> Result<PathBuf> {
        self.written
            .push((module.to_string(), chip, histogram.clone(), summary.clone()));
        Ok(PathBuf::from(format!("{module}_chip{chip}")))
    }
}

fn inputs() -> InjectionInputs {
    InjectionInputs {
        self_injection: "self.json".into(),
        coupled_injection: "coupled.json".into(),
        uncoupled_injection: "uncoupled.json".into(),
    }
}

/// Store files holding 4x4 maps for `chips`, with (1, 2) disconnected.
fn stores(chips: &[u32]) -> HashMap<PathBuf, HistogramFile> {
    let patterns = [
        ("self.json", 0.95, 0.95),
        ("coupled.json", 0.8, 0.2),
        ("uncoupled.json", 0.8, 0.1),
    ];
    patterns
        .into_iter()
        .map(|(name, background, disconnected)| {
            let mut file = HistogramFile::create(name).unwrap();
            for &chip in chips {
                let key = ChipKey::new(chip);
                let grid = Grid::from_fn(4, 4, |row, col| {
                    if row == 1 && col == 2 {
                        disconnected
                    } else {
                        background
                    }
                });
                file.put_canvas(
                    &key.object_path(PIXEL_ALIVE),
                    Histogram2D::from_grid(key.object_name(PIXEL_ALIVE), "", &grid),
                );
            }
            (PathBuf::from(name), file)
        })
        .collect()
}

fn opener(stores: &HashMap<PathBuf, HistogramFile>) -> impl Fn(&Path) -> Result<HistogramFile> + '_ {
    move |path: &Path| {
        stores.get(path).cloned().ok_or_else(|| Error::Open {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such store"),
        })
    }
}

#[test]
fn test_process_chip_finds_disconnected_pixel() {
    let stores = stores(&[12]);
    let sources = InjectionSources {
        self_injection: stores[Path::new("self.json")].clone(),
        coupled_injection: stores[Path::new("coupled.json")].clone(),
        uncoupled_injection: stores[Path::new("uncoupled.json")].clone(),
    };
    let result = process_chip(&sources, &ChipKey::new(12), PIXEL_ALIVE, &Thresholds::default()).unwrap();
    assert_eq!(result.confirmed_count(), 1);
    assert!(result.is_confirmed(1, 2));
    assert_eq!(result.dead_count(), 0);
}

/// Saves a 4x4 map filled with `value` for chip 12 and reads it back.
fn uniform_store(dir: &Path, name: &str, value: f64) -> HistogramFile {
    let key = ChipKey::new(12);
    let mut file = HistogramFile::create(dir.join(name)).unwrap();
    file.put_canvas(
        &key.object_path(PIXEL_ALIVE),
        Histogram2D::from_grid(key.object_name(PIXEL_ALIVE), "", &Grid::new_filled(4, 4, value)),
    );
    file.save().unwrap();
    HistogramFile::open(dir.join(name)).unwrap()
}

#[test]
fn test_self_efficiency_at_alive_threshold_is_neither_dead_nor_confirmed() {
    let dir = tempfile::tempdir().unwrap();
    let sources = InjectionSources {
        self_injection: uniform_store(dir.path(), "self.json", 0.9),
        coupled_injection: uniform_store(dir.path(), "coupled.json", 0.0),
        uncoupled_injection: uniform_store(dir.path(), "uncoupled.json", 0.0),
    };

    let result = process_chip(&sources, &ChipKey::new(12), PIXEL_ALIVE, &Thresholds::default()).unwrap();
    assert_eq!(result.dead_count(), 0);
    assert_eq!(result.confirmed_count(), 0);
}

#[test]
fn test_run_persists_every_chip() {
    let stores = stores(&[12, 13]);
    let config = RunConfig::new("RH0026", vec![12, 13], inputs(), "unused");
    let mut sink = MemorySink::default();

    let summary = run_chips(&config, opener(&stores), &mut sink).unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(sink.written.len(), 2);

    let (module, chip, hist, counts) = &sink.written[1];
    assert_eq!(module, "RH0026");
    assert_eq!(*chip, 13);
    assert_eq!(hist.name, "h_confirmed2D");
    assert_eq!(hist.title, "confirmed disconnected channels of chip 13");
    assert_eq!(counts["confirmed"], 1.0);
}

#[test]
fn test_skip_policy_continues_after_missing_chip() {
    let stores = stores(&[12, 14]);
    let config = RunConfig::new("RH0026", vec![12, 13, 14], inputs(), "unused");
    let mut sink = MemorySink::default();

    let summary = run_chips(&config, opener(&stores), &mut sink).unwrap();
    assert!(!summary.is_success());
    assert_eq!(
        summary.succeeded.iter().map(|o| o.chip).collect::<Vec<_>>(),
        vec![12, 14]
    );
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].chip, 13);
    assert!(matches!(summary.failed[0].error, Error::MissingObject { .. }));
    assert!(summary.not_run.is_empty());
}

#[test]
fn test_abort_policy_stops_at_first_failure() {
    let stores = stores(&[12, 14]);
    let mut config = RunConfig::new("RH0026", vec![13, 12, 14], inputs(), "unused");
    config.on_error = ErrorPolicy::Abort;
    let mut sink = MemorySink::default();

    let summary = run_chips(&config, opener(&stores), &mut sink).unwrap();
    assert!(summary.succeeded.is_empty());
    assert_eq!(summary.failed[0].chip, 13);
    assert_eq!(summary.not_run, vec![12, 14]);
    assert!(sink.written.is_empty());
}

#[test]
fn test_unreadable_input_fails_chip() {
    let mut stores = stores(&[12]);
    stores.remove(Path::new("coupled.json"));
    let config = RunConfig::new("RH0026", vec![12], inputs(), "unused");
    let mut sink = MemorySink::default();

    let summary = run_chips(&config, opener(&stores), &mut sink).unwrap();
    assert!(matches!(summary.failed[0].error, Error::Open { .. }));
}

#[test]
fn test_invalid_config_is_rejected_before_any_chip() {
    let stores = stores(&[12]);
    let mut config = RunConfig::new("RH0026", vec![12], inputs(), "unused");
    config.thresholds.alive_efficiency = 1.5;
    let mut sink = MemorySink::default();

    let err = run_chips(&config, opener(&stores), &mut sink).unwrap_err();
    assert!(matches!(err, Error::ThresholdOutOfRange { .. }));
}

#[test]
fn test_run_xtalk_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    for (name, file) in stores(&[12]) {
        let mut on_disk = HistogramFile::create(dir.path().join(&name)).unwrap();
        for object_path in file.object_paths() {
            on_disk.insert(object_path, file.get(object_path).unwrap().clone());
        }
        on_disk.save().unwrap();
    }

    let inputs = InjectionInputs {
        self_injection: dir.path().join("self.json"),
        coupled_injection: dir.path().join("coupled.json"),
        uncoupled_injection: dir.path().join("uncoupled.json"),
    };
    let mut config = RunConfig::new("RH0026", vec![12], inputs, dir.path().join("outputroot/xtalk"));
    config.plot_dir = Some(dir.path().join("plots"));

    let summary = run_xtalk(&config).unwrap();
    assert!(summary.is_success());

    let output = dir.path().join("outputroot/xtalk/RH0026_chip12_xtalk.json");
    assert_eq!(summary.succeeded[0].output, output);
    let written = HistogramFile::open(&output).unwrap();
    assert_eq!(written.histogram("h_confirmed2D").unwrap().integral(), 1.0);
    assert_eq!(written.counts(SUMMARY_OBJECT).unwrap()["dead"], 0.0);
    assert!(dir.path().join("plots/RH0026_confirmed2D_chip12.png").exists());
}
