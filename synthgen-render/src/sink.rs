//! Destinations for rendered frames

use image::RgbImage;
use std::collections::BTreeMap;
use synthgen_algorithms::{MlUse, NormalizedBox, PixelBox, ProjectedVertex};
use synthgen_core::{Error, Point3f, Resolution, Result};
use synthgen_io::{
    AnnotationRow, CsvAnnotationWriter, DatasetLayout, FrameProjections, ImageRecord, JsonlAnnotationWriter,
    OutputConfig, ProjectionArchive,
};
use tracing::{debug, info};

/// Label of one classified object in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLabel {
    /// Classified object name
    pub object: String,
    pub label: String,
    /// Object whose vertices were projected
    pub part: String,
    pub vertices: Vec<ProjectedVertex>,
    /// `None` when the part has no vertices
    pub pixel_box: Option<PixelBox>,
    /// Box normalized to the image, `None` when the part has no vertices
    pub bbox: Option<NormalizedBox>,
}

/// Everything produced for one frame
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub index: usize,
    pub image: RgbImage,
    pub ml_use: MlUse,
    pub camera_position: Point3f,
    pub resolution: Resolution,
    pub labels: Vec<FrameLabel>,
}

/// Receives frames as they are rendered
pub trait FrameSink {
    fn write_frame(&mut self, frame: &FrameOutput) -> Result<()>;

    /// Called once after the last frame, also when the run stopped early
    fn finish(&mut self) -> Result<()>;
}

/// Writes a dataset to disk.
///
/// Images go to `renders/`, labels are appended to the CSV and JSON-lines
/// files after every frame, and the projection archive is written by
/// [`FrameSink::finish`].
pub struct DatasetSink {
    layout: DatasetLayout,
    gcs_prefix: Option<String>,
    annotation_set: Option<String>,
    csv: CsvAnnotationWriter,
    jsonl: JsonlAnnotationWriter,
    projections: ProjectionArchive,
}

impl DatasetSink {
    /// Create the output directories and label files
    pub fn create(output: &OutputConfig) -> Result<Self> {
        let layout = DatasetLayout::new(&output.root, output.file_name.clone());
        layout.create_dirs()?;
        let csv = CsvAnnotationWriter::create(layout.csv_path())?;
        let jsonl = JsonlAnnotationWriter::create(layout.jsonl_path())?;
        info!(dir = %layout.dataset_dir().display(), "Writing dataset");
        Ok(Self {
            layout,
            gcs_prefix: output.gcs_prefix.clone(),
            annotation_set: output.annotation_set.clone(),
            csv,
            jsonl,
            projections: ProjectionArchive::new(),
        })
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Where the image will live once uploaded, or its local path without a bucket
    fn image_uri(&self, index: usize) -> String {
        match &self.gcs_prefix {
            Some(prefix) => format!("{}{}", prefix, self.layout.render_name(index)),
            None => self.layout.render_path(index).display().to_string(),
        }
    }
}

impl FrameSink for DatasetSink {
    fn write_frame(&mut self, frame: &FrameOutput) -> Result<()> {
        let path = self.layout.render_path(frame.index);
        frame
            .image
            .save(&path)
            .map_err(|e| Error::Render(format!("failed to save {}: {}", path.display(), e)))?;

        let uri = self.image_uri(frame.index);
        let mut record = ImageRecord::new(uri.clone(), frame.ml_use);
        let mut objects = BTreeMap::new();

        for label in &frame.labels {
            objects.insert(label.part.clone(), label.vertices.clone());
            let Some(bbox) = label.bbox.filter(|b| !b.is_empty()) else {
                debug!(frame = frame.index, object = %label.object, "Object outside the image, no box written");
                continue;
            };
            self.csv.write_row(&AnnotationRow {
                ml_use: frame.ml_use,
                file_name: uri.clone(),
                classification: label.label.clone(),
                bbox,
                camera_position: frame.camera_position,
            })?;
            record.add_box(label.label.clone(), &bbox, self.annotation_set.as_deref());
        }

        self.jsonl.write_record(&record)?;
        self.csv.flush()?;
        self.jsonl.flush()?;
        self.projections.push_frame(FrameProjections { frame: frame.index, objects });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.csv.flush()?;
        self.jsonl.flush()?;
        self.projections.write(self.layout.projection_path())?;
        info!(frames = self.projections.len(), "Dataset complete");
        Ok(())
    }
}

/// Keeps frames in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<FrameOutput>,
    pub finished: bool,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &FrameOutput) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
