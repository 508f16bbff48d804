//! Archive of projected vertices per frame

use crate::error::IoError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use synthgen_algorithms::ProjectedVertex;
use synthgen_core::Result;

/// Projected vertices of every labeled object in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameProjections {
    pub frame: usize,
    pub objects: BTreeMap<String, Vec<ProjectedVertex>>,
}

/// Projections of a whole run, written once at the end
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionArchive {
    pub frames: Vec<FrameProjections>,
}

impl ProjectionArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: FrameProjections) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self).map_err(IoError::from)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader).map_err(IoError::from)?)
    }
}
