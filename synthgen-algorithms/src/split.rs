//! Training / test / validation assignment of frames

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use synthgen_core::{Error, Result, SPLIT_TOLERANCE};

/// Dataset partition a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MlUse {
    Training,
    Test,
    Validation,
}

impl MlUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            MlUse::Training => "training",
            MlUse::Test => "test",
            MlUse::Validation => "validation",
        }
    }
}

impl fmt::Display for MlUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fractions of frames per partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub training: f32,
    pub test: f32,
    pub validation: f32,
}

impl Default for DatasetSplit {
    fn default() -> Self {
        Self {
            training: 0.8,
            test: 0.0,
            validation: 0.2,
        }
    }
}

impl DatasetSplit {
    pub fn new(training: f32, test: f32, validation: f32) -> Self {
        Self { training, test, validation }
    }

    /// Fractions must be non-negative and sum to one
    pub fn validate(&self) -> Result<()> {
        let fractions = [self.training, self.test, self.validation];
        if fractions.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(Error::Configuration(format!(
                "split fractions must be non-negative, got {:?}",
                fractions
            )));
        }
        let total: f32 = fractions.iter().sum();
        if (total - 1.0).abs() > SPLIT_TOLERANCE {
            return Err(Error::Configuration(format!(
                "split fractions sum to {}, expected 1",
                total
            )));
        }
        Ok(())
    }
}

/// Assign every frame exactly one [`MlUse`].
///
/// Frames are shuffled, then the first `round(n * training)` become training
/// frames, the next `round(n * test)` test frames and the rest validation.
pub fn assign_splits<R: Rng + ?Sized>(
    frame_count: usize,
    split: &DatasetSplit,
    rng: &mut R,
) -> Result<Vec<MlUse>> {
    split.validate()?;

    let mut order: Vec<usize> = (0..frame_count).collect();
    order.shuffle(rng);

    let training = ((frame_count as f32 * split.training).round() as usize).min(frame_count);
    let test = ((frame_count as f32 * split.test).round() as usize).min(frame_count - training);

    let mut uses = vec![MlUse::Validation; frame_count];
    for (rank, frame) in order.into_iter().enumerate() {
        if rank < training {
            uses[frame] = MlUse::Training;
        } else if rank < training + test {
            uses[frame] = MlUse::Test;
        }
    }
    Ok(uses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn count(uses: &[MlUse], which: MlUse) -> usize {
        uses.iter().filter(|u| **u == which).count()
    }

    #[test]
    fn test_every_frame_assigned() {
        let mut rng = StdRng::seed_from_u64(41);
        let uses = assign_splits(10, &DatasetSplit::new(0.6, 0.2, 0.2), &mut rng).unwrap();
        assert_eq!(uses.len(), 10);
        assert_eq!(count(&uses, MlUse::Training), 6);
        assert_eq!(count(&uses, MlUse::Test), 2);
        assert_eq!(count(&uses, MlUse::Validation), 2);
    }

    #[test]
    fn test_zero_frames() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(assign_splits(0, &DatasetSplit::default(), &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_rounding_never_overflows() {
        let mut rng = StdRng::seed_from_u64(43);
        let uses = assign_splits(3, &DatasetSplit::new(0.5, 0.5, 0.0), &mut rng).unwrap();
        assert_eq!(uses.len(), 3);
        assert_eq!(count(&uses, MlUse::Training) + count(&uses, MlUse::Test) + count(&uses, MlUse::Validation), 3);
    }

    #[test]
    fn test_bad_fractions_rejected() {
        assert!(DatasetSplit::new(0.5, 0.2, 0.2).validate().is_err());
        assert!(DatasetSplit::new(1.2, -0.2, 0.0).validate().is_err());
        assert!(DatasetSplit::new(0.7, 0.1, 0.2).validate().is_ok());
    }

    #[test]
    fn test_labels() {
        assert_eq!(MlUse::Training.to_string(), "training");
        assert_eq!(serde_json::to_string(&MlUse::Validation).unwrap(), "\"validation\"");
    }
}
