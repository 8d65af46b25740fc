//! Synthetic input maps used to exercise the pipeline end to end.

use serde::{Deserialize, Serialize};

use crate::histogram::{Axis, Histogram2D};
use crate::store::HistogramFile;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToyParams {
    pub x_bins: usize,
    pub y_bins: usize,
    pub radius: f64,
}

impl Default for ToyParams {
    fn default() -> Self {
        Self {
            x_bins: 432,
            y_bins: 336,
            radius: 150.0,
        }
    }
}

fn toy_histogram(
    name: &str,
    title: &str,
    params: &ToyParams,
    filled: impl Fn(usize, usize) -> bool,
) -> Histogram2D {
    let mut hist = Histogram2D::new(
        name,
        title,
        Axis::pixels(params.x_bins),
        Axis::pixels(params.y_bins),
    );
    for x_bin in 1..=params.x_bins {
        for y_bin in 1..=params.y_bins {
            if filled(x_bin, y_bin) {
                hist.set_bin_content(x_bin, y_bin, 1.0);
            }
        }
    }
    hist
}

/// `hist1` covers the left half of the columns, `hist2` the upper half of
/// the rows and `hist3` a disc around the centre bin.
pub fn toy_histograms(params: &ToyParams) -> [Histogram2D; 3] {
    let half_x = params.x_bins / 2;
    let half_y = params.y_bins / 2;
    let radius_sq = params.radius * params.radius;

    [
        toy_histogram("hist1", "Histogram 1", params, |x, _| x <= half_x),
        toy_histogram("hist2", "Histogram 2", params, |_, y| y > half_y),
        toy_histogram("hist3", "Histogram 3", params, |x, y| {
            let dx = x as f64 - half_x as f64;
            let dy = y as f64 - half_y as f64;
            dx * dx + dy * dy <= radius_sq
        }),
    ]
}

pub fn write_toy_histograms(file: &mut HistogramFile, params: &ToyParams) {
    for hist in toy_histograms(params) {
        file.put_histogram(hist);
    }
    tracing::info!(
        path = %file.path().display(),
        x_bins = params.x_bins,
        y_bins = params.y_bins,
        "Toy histograms generated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toy_histograms() {
        let [hist1, hist2, hist3] = toy_histograms(&ToyParams::default());
        assert_eq!(hist1.x_axis, Axis::pixels(432));
        assert_eq!(hist1.y_axis, Axis::pixels(336));

        assert_eq!(hist1.nonzero_count(), 216 * 336);
        assert_eq!(hist1.bin_content(216, 1), 1.0);
        assert_eq!(hist1.bin_content(217, 1), 0.0);

        assert_eq!(hist2.nonzero_count(), 432 * 168);
        assert_eq!(hist2.bin_content(1, 168), 0.0);
        assert_eq!(hist2.bin_content(1, 169), 1.0);

        assert_eq!(hist3.bin_content(216, 168), 1.0);
        assert_eq!(hist3.bin_content(216 + 150, 168), 1.0);
        assert_eq!(hist3.bin_content(216 + 151, 168), 0.0);
        assert_eq!(hist3.bin_content(1, 1), 0.0);
    }

    #[test]
    fn test_small_toy() {
        let params = ToyParams {
            x_bins: 4,
            y_bins: 4,
            radius: 1.0,
        };
        let [_, _, disc] = toy_histograms(&params);
        // centre (2, 2) plus its four direct neighbours
        assert_eq!(disc.nonzero_count(), 5);
    }

    #[test]
    fn test_write_to_file() {
        let mut file = HistogramFile::create("toy_histograms.json").unwrap();
        write_toy_histograms(&mut file, &ToyParams::default());
        assert_eq!(file.object_paths().collect::<Vec<_>>(), vec!["hist1", "hist2", "hist3"]);
    }
}
