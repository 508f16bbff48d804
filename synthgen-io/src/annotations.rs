//! Bounding-box label files
//!
//! Two formats are written side by side: a CSV table with one row per labeled
//! object per frame, and JSON lines with one image record per frame in the
//! Vertex AI image object detection import schema.

use crate::error::IoError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use synthgen_algorithms::{MlUse, NormalizedBox};
use synthgen_core::{Point3f, Result};

/// Column names of the CSV label table
pub const CSV_HEADER: [&str; 10] = [
    "use",
    "fileName",
    "classification",
    "xMin",
    "yMin",
    "xMax",
    "yMax",
    "camX",
    "camY",
    "camZ",
];

/// Resource label carrying the ML use of an image
pub const ML_USE_LABEL: &str = "aiplatform.googleapis.com/ml_use";

/// Resource label naming the annotation set of a box
pub const ANNOTATION_SET_LABEL: &str = "aiplatform.googleapis.com/annotation_set_name";

/// One labeled object in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub ml_use: MlUse,
    pub file_name: String,
    pub classification: String,
    pub bbox: NormalizedBox,
    pub camera_position: Point3f,
}

/// Quote a CSV field when it contains a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Appends rows to the CSV label table
pub struct CsvAnnotationWriter {
    writer: BufWriter<File>,
}

impl CsvAnnotationWriter {
    /// Create the file and write the header row
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", CSV_HEADER.join(","))?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, row: &AnnotationRow) -> Result<()> {
        let b = &row.bbox;
        let c = &row.camera_position;
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{},{},{}",
            row.ml_use,
            csv_field(&row.file_name),
            csv_field(&row.classification),
            b.x_min,
            b.y_min,
            b.x_max,
            b.y_max,
            c.x,
            c.y,
            c.z
        )?;
        Ok(())
    }

    /// Push buffered rows to disk so a crash keeps completed frames
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One bounding box of an image record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBoxAnnotation {
    pub display_name: String,
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub annotation_resource_labels: BTreeMap<String, String>,
}

/// One image with all its boxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub image_gcs_uri: String,
    pub bounding_box_annotations: Vec<BoundingBoxAnnotation>,
    pub data_item_resource_labels: BTreeMap<String, String>,
}

impl ImageRecord {
    pub fn new(image_gcs_uri: impl Into<String>, ml_use: MlUse) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(ML_USE_LABEL.to_string(), ml_use.to_string());
        Self {
            image_gcs_uri: image_gcs_uri.into(),
            bounding_box_annotations: Vec::new(),
            data_item_resource_labels: labels,
        }
    }

    pub fn add_box(&mut self, display_name: impl Into<String>, bbox: &NormalizedBox, annotation_set: Option<&str>) {
        let mut labels = BTreeMap::new();
        if let Some(set) = annotation_set {
            labels.insert(ANNOTATION_SET_LABEL.to_string(), set.to_string());
        }
        self.bounding_box_annotations.push(BoundingBoxAnnotation {
            display_name: display_name.into(),
            x_min: bbox.x_min,
            x_max: bbox.x_max,
            y_min: bbox.y_min,
            y_max: bbox.y_max,
            annotation_resource_labels: labels,
        });
    }
}

/// Appends image records as JSON lines
pub struct JsonlAnnotationWriter {
    writer: BufWriter<File>,
}

impl JsonlAnnotationWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }

    pub fn write_record(&mut self, record: &ImageRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(IoError::from)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
