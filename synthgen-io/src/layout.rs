//! Output directory layout of a dataset

use std::fs;
use std::path::{Path, PathBuf};
use synthgen_core::Result;
use tracing::debug;

/// Paths of every artifact a run writes, under `<root>/<file_name>/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    dataset_dir: PathBuf,
    file_name: String,
}

impl DatasetLayout {
    pub fn new<P: AsRef<Path>>(root: P, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            dataset_dir: root.as_ref().join(&file_name),
            file_name,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.dataset_dir.join("renders")
    }

    pub fn csv_dir(&self) -> PathBuf {
        self.dataset_dir.join("csvFile")
    }

    pub fn json_dir(&self) -> PathBuf {
        self.dataset_dir.join("jsonFile")
    }

    pub fn projection_dir(&self) -> PathBuf {
        self.dataset_dir.join("projectionMat")
    }

    /// File name of frame `index`, e.g. `scene3.png`
    pub fn render_name(&self, index: usize) -> String {
        format!("{}{}.png", self.file_name, index)
    }

    pub fn render_path(&self, index: usize) -> PathBuf {
        self.renders_dir().join(self.render_name(index))
    }

    pub fn csv_path(&self) -> PathBuf {
        self.csv_dir().join(format!("{}.csv", self.file_name))
    }

    pub fn jsonl_path(&self) -> PathBuf {
        self.json_dir().join(format!("{}.jsonl", self.file_name))
    }

    pub fn projection_path(&self) -> PathBuf {
        self.projection_dir().join(format!("{}.json", self.file_name))
    }

    /// Create every output directory
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [self.renders_dir(), self.csv_dir(), self.json_dir(), self.projection_dir()] {
            fs::create_dir_all(&dir)?;
        }
        debug!(dir = %self.dataset_dir.display(), "Created dataset directories");
        Ok(())
    }
}
