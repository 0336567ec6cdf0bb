//! Placing a restarted trajectory on the time axis of the run it continues.
//! TeraChem starts counting frames from zero again on restart, so the only
//! way to tell where the new trajectory belongs is to find its first geometry
//! among the frames already written.

use std::path::{Path, PathBuf};

use geom::{Frame, Reader, XyzError, frame::load_first, max_deviation};
use log::{debug, trace};
use terachem::trajectory::frame_number;

use crate::{GatherError, report::Pair};

/// Where the first frame of a restarted trajectory was found
#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    pub trajectory: PathBuf,

    /// the frame number of the matching frame within `trajectory`
    pub frame: usize,

    /// the largest coordinate difference between the two frames
    pub deviation: f64,

    /// the offset to apply to frame numbers in the restarted pair
    pub offset: usize,
}

/// The frame of `path` closest to `target`, if any lies within `tolerance`.
/// Frames that fail to parse or carry no frame number are passed over.
pub fn best_frame(
    target: &Frame,
    path: &Path,
    tolerance: f64,
) -> Result<Option<(usize, f64)>, GatherError> {
    let reader = Reader::open(path)
        .map_err(|e| GatherError::Xyz(path.display().to_string(), e))?;
    let mut best: Option<(usize, f64)> = None;
    for frame in reader {
        let frame = match frame {
            Ok(f) => f,
            Err(XyzError::Truncated { .. } | XyzError::ReadFile(..)) => break,
            Err(e) => {
                trace!("skipping bad frame in {}: {e}", path.display());
                continue;
            }
        };
        let Some(number) = frame_number(&frame) else {
            continue;
        };
        let Some(dev) = max_deviation(&target.atoms, &frame.atoms) else {
            continue;
        };
        if dev < tolerance && best.is_none_or(|(_, d)| dev < d) {
            best = Some((number, dev));
        }
    }
    Ok(best)
}

/// Find the first frame of the trajectory at `path` among the trajectories of
/// the `earlier` pairs, searching the most recent first and stopping at the
/// first trajectory with any frame within `tolerance`. The offset places the
/// restarted frame number 1 immediately after the matched frame.
pub fn find_offset(
    path: &Path,
    earlier: &[&Pair],
    tolerance: f64,
) -> Result<Option<Match>, GatherError> {
    let target = load_first(path)
        .map_err(|e| GatherError::Xyz(path.display().to_string(), e))?;
    for pair in earlier.iter().rev() {
        debug!(
            "comparing the start of {} to {}",
            path.display(),
            pair.trajectory.display()
        );
        if let Some((frame, deviation)) =
            best_frame(&target, &pair.trajectory, tolerance)?
        {
            return Ok(Some(Match {
                trajectory: pair.trajectory.clone(),
                frame,
                deviation,
                offset: frame + pair.offset,
            }));
        }
    }
    Ok(None)
}
