//! File-backed histogram store.
//!
//! A store file maps slash-separated object paths to stored objects, the way
//! the acquisition software lays out its output: one canvas per scan and
//! chip, with the histogram as a primitive of the canvas. Analysis results
//! are written as top-level histograms next to a `summary` counts object.


use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use common::file_format::FileFormat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::histogram::Histogram2D;

/// Named counters persisted next to result histograms.
pub type Counts = BTreeMap<String, f64>;

pub const SUMMARY_OBJECT: &str = "summary";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub name: String,
    pub primitives: Vec<Histogram2D>,
}

impl Canvas {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primitives: Vec::new(),
        }
    }

    pub fn with_primitive(mut self, histogram: Histogram2D) -> Self {
        self.primitives.push(histogram);
        self
    }

    /// The primitive called `name`, or the first histogram when none matches.
    pub fn primitive(&self, name: &str) -> Option<&Histogram2D> {
        self.primitives
            .iter()
            .find(|hist| hist.name == name)
            .or_else(|| self.primitives.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredObject {
    Canvas(Canvas),
    Histogram(Histogram2D),
    Counts(Counts),
}

impl StoredObject {
    fn kind(&self) -> &'static str {
        match self {
            StoredObject::Canvas(_) => "canvas",
            StoredObject::Histogram(_) => "histogram",
            StoredObject::Counts(_) => "counts",
        }
    }
}

/// Read access to histograms of one input file.
pub trait GridSource {
    /// Histogram at `object_path`, either stored directly or as a canvas primitive
    /// named like the last path segment.
    fn fetch_histogram(&self, object_path: &str) -> Result<Histogram2D>;

    /// Human readable origin used in log and error messages.
    fn origin(&self) -> String;
}

/// Persists a result histogram keyed by module and chip.
pub trait GridSink {
    fn persist(
        &mut self,
        module: &str,
        chip: u32,
        histogram: &Histogram2D,
        summary: &Counts,
    ) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct HistogramFile {
    path: PathBuf,
    format: FileFormat,
    objects: BTreeMap<String, StoredObject>,
}

fn store_format(path: &Path) -> Result<FileFormat> {
    let format = FileFormat::from_path(path).map_err(|source| Error::Format {
        path: path.to_path_buf(),
        source,
    })?;
    if format == FileFormat::Toml {
        return Err(Error::InvalidConfig(format!(
            "'{}': histogram stores must be json, yaml or bin",
            path.display()
        )));
    }
    Ok(format)
}

impl HistogramFile {
    /// Empty store that will be written to `path` on [`save`](Self::save).
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = store_format(&path)?;
        Ok(Self {
            path,
            format,
            objects: BTreeMap::new(),
        })
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = store_format(&path)?;
        let bytes = std::fs::read(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        let objects: BTreeMap<String, StoredObject> = common::serde::deserialize(&bytes, format)
            .map_err(|e| Error::Decode {
                path: path.clone(),
                reason: format!("{e:#}"),
            })?;

        for object in objects.values() {
            match object {
                StoredObject::Histogram(hist) => hist.validate()?,
                StoredObject::Canvas(canvas) => {
                    canvas.primitives.iter().try_for_each(Histogram2D::validate)?
                }
                StoredObject::Counts(_) => {}
            }
        }

        tracing::debug!(path = %path.display(), objects = objects.len(), "Opened histogram file");

        Ok(Self {
            path,
            format,
            objects,
        })
    }

    /// Writes every object, replacing any existing file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let bytes = common::serde::serialize(&self.objects, self.format).map_err(|e| {
            Error::Encode {
                path: self.path.clone(),
                reason: format!("{e:#}"),
            }
        })?;
        std::fs::write(&self.path, bytes).map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(path = %self.path.display(), objects = self.objects.len(), "Saved histogram file");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object_paths(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn insert(&mut self, object_path: impl Into<String>, object: StoredObject) {
        self.objects.insert(object_path.into(), object);
    }

    /// Stores `histogram` at the top level under its own name.
    pub fn put_histogram(&mut self, histogram: Histogram2D) {
        self.insert(histogram.name.clone(), StoredObject::Histogram(histogram));
    }

    /// Stores `histogram` as the single primitive of a canvas at `object_path`.
    pub fn put_canvas(&mut self, object_path: &str, histogram: Histogram2D) {
        let name = object_name(object_path);
        self.insert(
            object_path,
            StoredObject::Canvas(Canvas::new(name).with_primitive(histogram)),
        );
    }

    pub fn put_counts(&mut self, name: impl Into<String>, counts: Counts) {
        self.insert(name, StoredObject::Counts(counts));
    }

    pub fn get(&self, object_path: &str) -> Result<&StoredObject> {
        self.objects
            .get(object_path)
            .ok_or_else(|| Error::MissingObject {
                path: self.path.clone(),
                object: object_path.to_string(),
            })
    }

    pub fn histogram(&self, object_path: &str) -> Result<&Histogram2D> {
        match self.get(object_path)? {
            StoredObject::Histogram(hist) => Ok(hist),
            other => Err(self.wrong_kind(object_path, other, "histogram")),
        }
    }

    pub fn canvas(&self, object_path: &str) -> Result<&Canvas> {
        match self.get(object_path)? {
            StoredObject::Canvas(canvas) => Ok(canvas),
            other => Err(self.wrong_kind(object_path, other, "canvas")),
        }
    }

    pub fn counts(&self, object_path: &str) -> Result<&Counts> {
        match self.get(object_path)? {
            StoredObject::Counts(counts) => Ok(counts),
            other => Err(self.wrong_kind(object_path, other, "counts object")),
        }
    }

    /// Histogram primitive of the canvas at `object_path`. `name` selects a
    /// primitive by name, falling back to the first one.
    pub fn canvas_primitive(&self, object_path: &str, name: Option<&str>) -> Result<&Histogram2D> {
        let canvas = self.canvas(object_path)?;
        let wanted = name.unwrap_or_else(|| object_name(object_path));
        canvas
            .primitive(wanted)
            .ok_or_else(|| Error::NoHistogramPrimitive {
                path: self.path.clone(),
                object: object_path.to_string(),
            })
    }

    fn wrong_kind(&self, object_path: &str, found: &StoredObject, expected: &'static str) -> Error {
        tracing::debug!(object = object_path, found = found.kind(), expected, "Unexpected object kind");
        Error::WrongObjectKind {
            path: self.path.clone(),
            object: object_path.to_string(),
            expected,
        }
    }
}

impl GridSource for HistogramFile {
    fn fetch_histogram(&self, object_path: &str) -> Result<Histogram2D> {
        match self.get(object_path)? {
            StoredObject::Histogram(hist) => Ok(hist.clone()),
            StoredObject::Canvas(_) => self.canvas_primitive(object_path, None).cloned(),
            other => Err(self.wrong_kind(object_path, other, "histogram")),
        }
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// Last segment of a slash-separated object path.
pub fn object_name(object_path: &str) -> &str {
    object_path.rsplit('/').next().unwrap_or(object_path)
}

/// Writes one result file per chip into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    format: FileFormat,
    suffix: String,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, format: FileFormat, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            format,
            suffix: suffix.into(),
        }
    }

    /// `{dir}/{module}_chip{chip}_{suffix}.{ext}`
    pub fn file_path(&self, module: &str, chip: u32) -> PathBuf {
        self.dir.join(format!(
            "{module}_chip{chip}_{}.{}",
            self.suffix,
            self.format.extension()
        ))
    }
}

impl GridSink for DirectorySink {
    fn persist(
        &mut self,
        module: &str,
        chip: u32,
        histogram: &Histogram2D,
        summary: &Counts,
    ) -> Result<PathBuf> {
        let path = self.file_path(module, chip);
        let mut file = HistogramFile::create(&path)?;
        file.put_histogram(histogram.clone());
        file.put_counts(SUMMARY_OBJECT, summary.clone());
        file.save()?;
        Ok(path)
    }
}
