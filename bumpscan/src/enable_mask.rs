//! Pixel enable mask from a chip configuration text file.
//!
//! Only two line kinds matter: `COL <n>` opens the next column (the first
//! one is column 0) and `ENABLE v0,v1,...` lists per-row enable flags of the
//! current column. Every other line is ignored.

use std::path::Path;

use common::Grid;

use crate::error::{Error, Result};

const COL_PREFIX: &str = "COL ";
const ENABLE_PREFIX: &str = "ENABLE ";

/// `true` for enabled pixels. Pixels never mentioned stay disabled.
pub type EnableMask = Grid<bool>;

pub fn parse_enable_mask(text: &str, rows: usize, cols: usize) -> Result<EnableMask> {
    let mut mask = Grid::new_default(rows, cols);
    let mut col: Option<usize> = None;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.starts_with(COL_PREFIX) {
            let next = col.map_or(0, |c| c + 1);
            if next >= cols {
                return Err(Error::MaskParse {
                    line: line_no,
                    reason: format!("more than {cols} columns"),
                });
            }
            col = Some(next);
        } else if let Some(values) = line.strip_prefix(ENABLE_PREFIX) {
            let col = col.ok_or_else(|| Error::MaskParse {
                line: line_no,
                reason: "ENABLE before any COL".to_string(),
            })?;
            for (row, value) in values.trim().split(',').enumerate() {
                if row >= rows {
                    return Err(Error::MaskParse {
                        line: line_no,
                        reason: format!("more than {rows} rows"),
                    });
                }
                let value: i64 = value.trim().parse().map_err(|_| Error::MaskParse {
                    line: line_no,
                    reason: format!("'{}' is not an integer", value.trim()),
                })?;
                mask[(row, col)] = value != 0;
            }
        }
    }

    Ok(mask)
}

pub fn read_enable_mask(path: &Path, rows: usize, cols: usize) -> Result<EnableMask> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_enable_mask(&text, rows, cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_and_rows() {
        let text = "\
# header
VCAL_HIGH 1000
COL 000
ENABLE 1,0,1
HITBUS 0,0,0
COL 001
ENABLE 0,1,1
";
        let mask = parse_enable_mask(text, 3, 2).unwrap();
        assert_eq!(mask.cells(), &[true, false, false, true, true, true]);
    }

    #[test]
    fn test_missing_columns_stay_disabled() {
        let mask = parse_enable_mask("COL 0\nENABLE 1,1\n", 2, 3).unwrap();
        assert_eq!(mask.count(|&enabled| enabled), 2);
        assert!(!mask[(0, 2)]);
    }

    #[test]
    fn test_enable_before_col() {
        let err = parse_enable_mask("ENABLE 1,1\n", 2, 2).unwrap_err();
        assert!(matches!(err, Error::MaskParse { line: 1, .. }));
    }

    #[test]
    fn test_too_many_columns() {
        let err = parse_enable_mask("COL 0\nCOL 1\nCOL 2\n", 2, 2).unwrap_err();
        assert!(matches!(err, Error::MaskParse { line: 3, .. }));
    }

    #[test]
    fn test_too_many_rows() {
        let err = parse_enable_mask("COL 0\nENABLE 1,1,1\n", 2, 2).unwrap_err();
        assert!(matches!(err, Error::MaskParse { line: 2, .. }));
    }

    #[test]
    fn test_non_integer_value() {
        let err = parse_enable_mask("COL 0\n\nENABLE 1,x\n", 2, 2).unwrap_err();
        assert_eq!(err.to_string(), "Enable mask line 3: 'x' is not an integer");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_enable_mask(&dir.path().join("absent.txt"), 2, 2).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }
}
