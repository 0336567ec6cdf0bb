//! The concrete tasks of a refinement. [Join] and [Respace] run in-process,
//! the rest wrap an [External](crate::command::External) program.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use geom::Frame;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{Task, TaskError};

pub mod interpolate;
pub mod optimize;

pub use interpolate::{GrowingString, Interpolation};
pub use optimize::Optimization;

/// Which frames of an XYZ file to use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Select {
    All,
    First,
    Last,
    /// a single 0-based frame
    Index(usize),
    /// 0-based and inclusive on both ends
    Range(usize, usize),
    /// everything except the first and last frames
    Interior,
}

impl Select {
    pub fn apply(self, mut frames: Vec<Frame>) -> Vec<Frame> {
        let n = frames.len();
        match self {
            Select::All => frames,
            Select::First => frames.into_iter().take(1).collect(),
            Select::Last => frames.pop().into_iter().collect(),
            Select::Index(i) if i < n => vec![frames.swap_remove(i)],
            Select::Index(_) => Vec::new(),
            Select::Range(a, b) if a <= b && a < n => {
                frames.truncate(b.saturating_add(1).min(n));
                frames.drain(..a);
                frames
            }
            Select::Range(..) => Vec::new(),
            Select::Interior if n > 2 => {
                frames.truncate(n - 1);
                frames.remove(0);
                frames
            }
            Select::Interior => Vec::new(),
        }
    }
}

pub(crate) fn load(path: &Path) -> Result<Vec<Frame>, TaskError> {
    geom::frame::load(path)
        .map_err(|e| TaskError::Xyz(path.display().to_string(), e))
}

pub(crate) fn write(path: &Path, frames: &[Frame]) -> Result<(), TaskError> {
    geom::frame::write(path, frames).map_err(crate::io_error(path))
}

/// One piece of a joined path
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub path: PathBuf,
    pub select: Select,

    /// whether selecting no frames from `path` is an error
    pub required: bool,
}

impl Part {
    pub fn new(path: impl Into<PathBuf>, select: Select) -> Self {
        Self {
            path: path.into(),
            select,
            required: true,
        }
    }

    /// a part that may contribute no frames, like the interior of a path
    /// that is only its two end points
    pub fn optional(path: impl Into<PathBuf>, select: Select) -> Self {
        Self {
            required: false,
            ..Self::new(path, select)
        }
    }
}

/// Concatenate selected frames of several XYZ files into one path
#[derive(Clone, Debug)]
pub struct Join {
    name: String,
    dir: PathBuf,
    parts: Vec<Part>,
    output: PathBuf,
}

impl Join {
    /// join `parts` into `dir/output`
    pub fn new(
        name: impl Into<String>,
        dir: impl AsRef<Path>,
        parts: Vec<Part>,
        output: &str,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            name: name.into(),
            output: dir.join(output),
            dir,
            parts,
        }
    }
}

impl Task for Join {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn inputs(&self) -> Vec<PathBuf> {
        self.parts.iter().map(|p| p.path.clone()).collect()
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        let mut frames = Vec::new();
        for part in &self.parts {
            let got = part.select.apply(load(&part.path)?);
            if got.is_empty() && part.required {
                return Err(TaskError::Selection {
                    task: self.name.clone(),
                    msg: format!(
                        "no frames selected from {} with {:?}",
                        part.path.display(),
                        part.select
                    ),
                });
            }
            frames.extend(got);
        }
        info!("{}: joined {} frames", self.name, frames.len());
        write(&self.output, &frames)
    }
}

/// How finely to resample a path
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Spacing {
    /// exactly this many frames
    Images(usize),

    /// at most this RMSD distance in Å between neighboring frames
    Distance(f64),
}

impl Display for Spacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Spacing::Images(n) => write!(f, "{n} images"),
            Spacing::Distance(d) => write!(f, "{d} Å"),
        }
    }
}

/// Resample a path at equal Cartesian arc length, keeping both end points
#[derive(Clone, Debug)]
pub struct Respace {
    name: String,
    dir: PathBuf,
    input: PathBuf,
    output: PathBuf,
    spacing: Spacing,
}

impl Respace {
    pub fn new(
        name: impl Into<String>,
        dir: impl AsRef<Path>,
        input: &str,
        output: &str,
        spacing: Spacing,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            name: name.into(),
            input: dir.join(input),
            output: dir.join(output),
            dir,
            spacing,
        }
    }
}

impl Task for Respace {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn inputs(&self) -> Vec<PathBuf> {
        vec![self.input.clone()]
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        let frames = load(&self.input)?;
        let spaced = match self.spacing {
            Spacing::Images(n) => geom::respace::resample(&frames, n),
            Spacing::Distance(d) => geom::respace::respace(&frames, d),
        }
        .ok_or_else(|| TaskError::Selection {
            task: self.name.clone(),
            msg: format!(
                "cannot respace {} frames of {} with {:?}",
                frames.len(),
                self.input.display(),
                self.spacing
            ),
        })?;
        info!(
            "{}: respaced {} frames into {}",
            self.name,
            frames.len(),
            spaced.len()
        );
        write(&self.output, &spaced)
    }
}
