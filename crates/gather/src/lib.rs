//! Gather the pieces of a TeraChem molecular-dynamics run, possibly spread
//! over several restarted jobs, into a single consistent trajectory.
//!
//! A run directory holds output logs and XYZ trajectories, in the directory
//! itself or one level below. Each log is paired with the one trajectory that
//! starts on the same frame, restarted pairs are placed on a common time axis
//! by matching geometries, and everything is merged into a [FrameStore] that
//! is then written out as `energies.txt`, `temperatures.txt`,
//! `all-coors.xyz`, `charge-spin.txt`, and `bond-orders.txt`.

use std::{error::Error, fmt::Display, path::Path};

use log::{info, warn};

pub mod config;
pub mod discover;
pub mod emit;
pub mod merge;
pub mod report;
pub mod restart;
pub mod store;

pub use config::Config;
pub use emit::ALL_COORS;
pub use report::{Pair, Report, Warning};
pub use store::{FrameStore, GapError, GapPolicy};

/// the optional file holding the frame number to place at index zero
pub const FIRST_STEP: &str = ".firststep";

#[derive(Debug, Clone, PartialEq)]
pub enum GatherError {
    Io(String, std::io::ErrorKind),
    Parse(terachem::ParseError),
    Xyz(String, geom::XyzError),
    Config(String),

    /// the contents of `.firststep` were not a frame number
    FirstStep(String),

    /// a frame would land before index zero
    NegativeIndex {
        file: String,
        frame: usize,
        offset: usize,
        base: usize,
    },

    Gap(GapError),
}

impl Display for GatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatherError::Io(path, kind) => {
                write!(f, "failed to access {path}: {kind}")
            }
            GatherError::Parse(e) => write!(f, "{e}"),
            GatherError::Xyz(path, e) => write!(f, "{path}: {e}"),
            GatherError::Config(msg) => write!(f, "bad configuration: {msg}"),
            GatherError::FirstStep(s) => {
                write!(f, "{FIRST_STEP} should hold a frame number, got `{s}`")
            }
            GatherError::NegativeIndex {
                file,
                frame,
                offset,
                base,
            } => write!(
                f,
                "frame {frame} of {file} with offset {offset} falls before \
                 the first frame ({base}); check {FIRST_STEP}"
            ),
            GatherError::Gap(e) => write!(f, "{e}"),
        }
    }
}

impl Error for GatherError {}

impl From<terachem::ParseError> for GatherError {
    fn from(value: terachem::ParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<GapError> for GatherError {
    fn from(value: GapError) -> Self {
        Self::Gap(value)
    }
}

/// Read the frame number in `dir/.firststep`, if the file exists
pub fn first_step(dir: &Path) -> Result<Option<usize>, GatherError> {
    let path = dir.join(FIRST_STEP);
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .map_err(|e| GatherError::Io(path.display().to_string(), e.kind()))?;
    let s = s.lines().next().unwrap_or_default().trim();
    s.parse()
        .map(Some)
        .map_err(|_| GatherError::FirstStep(s.to_owned()))
}

/// Gather the run in `dir`, writing the merged files (and the manifest, if
/// one is configured) back into `dir`
pub fn gather(
    dir: impl AsRef<Path>,
    config: &Config,
) -> Result<Report, GatherError> {
    let dir = dir.as_ref();
    let mut report = Report::default();
    let mut sources = discover::discover(dir, config, &mut report)?;
    // stable, so pairs starting together stay in discovery order and the
    // later one wins
    sources.sort_by_key(|s| s.pair.begin());

    let base = match first_step(dir)? {
        Some(b) => {
            info!("frame {b} from {FIRST_STEP} is the first frame");
            b
        }
        None => sources.iter().map(|s| s.pair.begin()).min().unwrap_or(0),
    };
    info!("using these output file / trajectory pairs:");
    for s in &sources {
        info!("{}", s.pair);
    }

    let mut store = FrameStore::new();
    for s in &sources {
        merge::merge(&mut store, s, base, config, &mut report)?;
    }

    if store.is_empty() {
        warn!("no frames found under {}", dir.display());
    } else {
        info!("merged frames cover {} indices", store.span());
    }
    for gap in store.gaps() {
        report.warn(Warning::Gap {
            field: gap.field,
            first: gap.first,
            last: gap.last,
        });
    }
    let frames = store.resolve(config.gaps)?;
    let skipped = emit::write_all(dir, &frames)?;
    if skipped > 0 {
        report.warn(Warning::UndersizedFrames { count: skipped });
    }
    info!("wrote {} frames to {}", frames.len(), dir.display());

    report.base = base;
    report.first_index = frames.first().map(|f| f.index).unwrap_or_default();
    report.frames = frames.len();
    report.pairs = sources.into_iter().map(|s| s.pair).collect();
    if let Some(name) = &config.manifest {
        let path = dir.join(name);
        report.write(&path).map_err(|e| {
            GatherError::Io(path.display().to_string(), e.kind())
        })?;
    }
    Ok(report)
}
