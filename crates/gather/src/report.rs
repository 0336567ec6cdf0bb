use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::store::Field;

/// An output file matched with its trajectory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub output: PathBuf,
    pub trajectory: PathBuf,

    /// frame number of the first frame in both files
    pub start: usize,

    /// the number of frames taken from the pair, starting at `start`
    pub length: usize,

    /// added to every frame number in the pair to place it on the run-wide
    /// time axis. Non-zero only after a restart
    pub offset: usize,
}

impl Pair {
    /// the position of the first frame on the run-wide time axis
    pub fn begin(&self) -> usize {
        self.start + self.offset
    }

    /// whether frame number `frame` falls within the usable part of the pair
    pub fn contains(&self, frame: usize) -> bool {
        frame >= self.start && frame < self.start + self.length
    }
}

impl Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} frames {}-{} offset {}",
            self.output.display(),
            self.trajectory.display(),
            self.start,
            self.start + self.length.max(1) - 1,
            self.offset
        )
    }
}

/// A trajectory file considered for an output file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub path: PathBuf,

    /// the frame number of its first frame
    pub first: usize,
}

/// Something unexpected that did not stop the run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// zero or several trajectories start on the same frame as `output`, so
    /// it was left out
    AmbiguousTrajectory {
        output: PathBuf,
        first: usize,
        candidates: Vec<Candidate>,
    },

    FrameCountMismatch {
        output: PathBuf,
        trajectory: PathBuf,
        output_frames: usize,
        trajectory_frames: usize,
    },

    /// a restarted trajectory did not match any earlier frame, so it keeps
    /// the previous offset
    NoRestartMatch { trajectory: PathBuf },

    /// a replaced geometry lies far from the frame before it
    LargeJump { index: usize, rmsd: f64 },

    /// `field` was missing from frames `first` through `last`
    Gap {
        field: Field,
        first: usize,
        last: usize,
    },

    /// frames left out of the geometry and annotation files because their
    /// charge or spin records were short
    UndersizedFrames { count: usize },

    /// a line that should have held data did not parse
    Parse { message: String },
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::AmbiguousTrajectory {
                output,
                first,
                candidates,
            } => {
                let valid: Vec<_> = candidates
                    .iter()
                    .filter(|c| c.first == *first)
                    .map(|c| c.path.display().to_string())
                    .collect();
                write!(
                    f,
                    "{} starts at frame {first} but {} of {} candidate \
                     trajectories do [{}], skipping it",
                    output.display(),
                    valid.len(),
                    candidates.len(),
                    valid.join(", ")
                )
            }
            Warning::FrameCountMismatch {
                output,
                trajectory,
                output_frames,
                trajectory_frames,
            } => write!(
                f,
                "{} has {output_frames} frames but {} has \
                 {trajectory_frames}",
                output.display(),
                trajectory.display()
            ),
            Warning::NoRestartMatch { trajectory } => write!(
                f,
                "no earlier frame matches the start of {}, \
                 keeping the previous offset",
                trajectory.display()
            ),
            Warning::LargeJump { index, rmsd } => write!(
                f,
                "frame {index} was replaced by coordinates {rmsd:.4} Å \
                 RMSD from the frame before it"
            ),
            Warning::Gap { field, first, last } if first == last => {
                write!(f, "no {field} for frame {first}")
            }
            Warning::Gap { field, first, last } => {
                write!(f, "no {field} for frames {first}-{last}")
            }
            Warning::UndersizedFrames { count } => write!(
                f,
                "{count} frames had incomplete charges or spins and were \
                 left out of the coordinate files"
            ),
            Warning::Parse { message } => write!(f, "{message}"),
        }
    }
}

/// The outcome of a run, written to the manifest
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// the frame number placed at global index zero
    pub base: usize,

    /// pairs in time order, as merged
    pub pairs: Vec<Pair>,

    /// the first global index written out
    pub first_index: usize,

    /// the number of frames written
    pub frames: usize,

    pub warnings: Vec<Warning>,
}

impl Report {
    /// log `warning` and keep it for the manifest
    pub fn warn(&mut self, warning: Warning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let f = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(f, self)?;
        Ok(())
    }
}
