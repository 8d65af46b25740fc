//! PNG rendering of result maps.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::{Error, Result};
use crate::histogram::Histogram2D;

const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Palette {
    /// Blue through yellow to red over the value range.
    Heat,
    /// White for zero, `color` for any other value.
    Binary { color: [u8; 3] },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Output pixels per bin along each axis.
    pub scale: u32,
    /// Fixed `(min, max)` colour range, taken from the data when `None`.
    pub range: Option<(f64, f64)>,
    pub palette: Palette,
    /// Draw row 0 at the bottom of the image.
    pub origin_bottom: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 2,
            range: None,
            palette: Palette::Heat,
            origin_bottom: true,
        }
    }
}

impl RenderOptions {
    pub fn binary(color: [u8; 3]) -> Self {
        Self {
            range: Some((0.0, 1.0)),
            palette: Palette::Binary { color },
            ..Self::default()
        }
    }
}

fn heat_color(t: f64) -> [u8; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let (r, g, b) = if t <= 0.5 {
        let ratio = t / 0.5;
        (255.0 * ratio, 255.0 * ratio, 255.0 * (1.0 - ratio))
    } else {
        let ratio = (t - 0.5) / 0.5;
        (255.0, 255.0 * (1.0 - ratio), 0.0)
    };
    [r.round() as u8, g.round() as u8, b.round() as u8]
}

fn value_range(hist: &Histogram2D) -> (f64, f64) {
    hist.contents
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |range: Option<(f64, f64)>, value| match range {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
        .unwrap_or((0.0, 1.0))
}

/// Rasterizes `hist` with one `scale x scale` block per bin.
pub fn render(hist: &Histogram2D, options: &RenderOptions) -> RgbImage {
    let scale = options.scale.max(1);
    let rows = hist.rows() as u32;
    let cols = hist.cols() as u32;
    let (min, max) = options.range.unwrap_or_else(|| value_range(hist));
    let span = max - min;

    RgbImage::from_fn(cols * scale, rows * scale, |x, y| {
        let col = (x / scale) as usize;
        let image_row = y / scale;
        let row = if options.origin_bottom {
            rows - 1 - image_row
        } else {
            image_row
        };
        let value = hist.value(row as usize, col);

        let color = match options.palette {
            Palette::Binary { color } => {
                if value != 0.0 {
                    color
                } else {
                    WHITE
                }
            }
            Palette::Heat => {
                let t = if span > 0.0 { (value - min) / span } else { 0.0 };
                heat_color(t)
            }
        };
        Rgb(color)
    })
}

pub fn save_png(hist: &Histogram2D, path: &Path, options: &RenderOptions) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    render(hist, options)
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| Error::Render {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %path.display(), histogram = %hist.name, "Rendered map");
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::Grid;

    use super::*;

    fn hist() -> Histogram2D {
        Histogram2D::from_grid("h", "", &Grid::new(2, 3, vec![0.0, 1.0, 0.0, 0.0, 0.0, 2.0]))
    }

    #[test]
    fn test_image_size_follows_scale() {
        let image = render(&hist(), &RenderOptions {
            scale: 4,
            ..RenderOptions::default()
        });
        assert_eq!(image.dimensions(), (12, 8));
    }

    #[test]
    fn test_binary_palette_and_origin() {
        let options = RenderOptions {
            scale: 1,
            ..RenderOptions::binary([0xFF, 0x00, 0x00])
        };
        let image = render(&hist(), &options);
        // row 0 is drawn at the bottom
        assert_eq!(image.get_pixel(1, 1).0, [0xFF, 0x00, 0x00]);
        assert_eq!(image.get_pixel(1, 0).0, WHITE);
        assert_eq!(image.get_pixel(2, 0).0, [0xFF, 0x00, 0x00]);

        let top_down = render(&hist(), &RenderOptions {
            origin_bottom: false,
            ..options
        });
        assert_eq!(top_down.get_pixel(1, 0).0, [0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_heat_palette_endpoints() {
        assert_eq!(heat_color(0.0), [0, 0, 255]);
        assert_eq!(heat_color(0.5), [255, 255, 0]);
        assert_eq!(heat_color(1.0), [255, 0, 0]);
        assert_eq!(heat_color(f64::NAN), [0, 0, 255]);
    }

    #[test]
    fn test_auto_range() {
        let image = render(&hist(), &RenderOptions {
            scale: 1,
            origin_bottom: false,
            ..RenderOptions::default()
        });
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(image.get_pixel(2, 1).0, [255, 0, 0]);
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("map.png");
        save_png(&hist(), &path, &RenderOptions::default()).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 6);
        assert_eq!(decoded.height(), 4);
    }
}
