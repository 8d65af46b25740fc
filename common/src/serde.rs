use std::io::Write;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::file_format::FileFormat;

pub type Result<T> = anyhow::Result<T>;

/// Text formats are normalized to `\n` line endings with a trailing newline.
fn normalize_text(text: String) -> String {
    let mut text = if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

pub fn serialize<T: Serialize + 'static>(value: &T, format: FileFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    serialize_into(value, format, &mut buffer)?;
    Ok(buffer)
}

pub fn serialize_into<T: Serialize + 'static, W: Write>(
    value: &T,
    format: FileFormat,
    writer: &mut W,
) -> Result<()> {
    match format {
        FileFormat::Yaml => {
            let s = normalize_text(serde_yml::to_string(value)?);
            writer.write_all(s.as_bytes())?;
        }
        FileFormat::Json => {
            let s = normalize_text(serde_json::to_string_pretty(value)?);
            writer.write_all(s.as_bytes())?;
        }
        FileFormat::Toml => {
            let s = normalize_text(toml::to_string(value)?);
            writer.write_all(s.as_bytes())?;
        }
        FileFormat::Bin => {
            let encoded = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
            writer.write_all(&lz4_flex::compress_prepend_size(&encoded))?;
        }
    }

    Ok(())
}

pub fn deserialize<T: DeserializeOwned + 'static>(
    serialized: &[u8],
    format: FileFormat,
) -> Result<T> {
    match format {
        FileFormat::Yaml => {
            let text = std::str::from_utf8(serialized)?;
            Ok(serde_yml::from_str(text)?)
        }
        FileFormat::Json => {
            let text = std::str::from_utf8(serialized)?;
            Ok(serde_json::from_str(text)?)
        }
        FileFormat::Toml => {
            let text = std::str::from_utf8(serialized)?;
            Ok(toml::from_str(text)?)
        }
        FileFormat::Bin => {
            let decompressed = lz4_flex::decompress_size_prepended(serialized)?;
            let (decoded, read) =
                bincode::serde::decode_from_slice(&decompressed, bincode::config::standard())?;
            if read != decompressed.len() {
                anyhow::bail!("binary payload should be fully consumed");
            }
            Ok(decoded)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use super::*;
    use crate::Grid;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        grid: Grid<f64>,
        counts: BTreeMap<String, u64>,
    }

    fn sample() -> Sample {
        Sample {
            name: "h_confirmed2D".to_string(),
            grid: Grid::new(2, 2, vec![0.0, 1.0, 0.0, 0.0]),
            counts: BTreeMap::from([("confirmed".to_string(), 1), ("dead".to_string(), 0)]),
        }
    }

    #[test]
    fn test_round_trip_all_formats() {
        for format in [FileFormat::Json, FileFormat::Yaml, FileFormat::Toml, FileFormat::Bin] {
            let bytes = serialize(&sample(), format).unwrap();
            let back: Sample = deserialize(&bytes, format).unwrap();
            assert_eq!(back, sample(), "format {format:?}");
        }
    }

    #[test]
    fn test_text_output_ends_with_newline() {
        let bytes = serialize(&sample(), FileFormat::Json).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert!(!bytes.contains(&b'\r'));
    }

    #[test]
    fn test_truncated_binary_is_rejected() {
        let bytes = serialize(&sample(), FileFormat::Bin).unwrap();
        let result: Result<Sample> = deserialize(&bytes[..bytes.len() / 2], FileFormat::Bin);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let result: Result<Sample> = deserialize(&[0xff, 0xfe, 0x00], FileFormat::Json);
        assert!(result.is_err());
    }
}
