use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use geom::{Frame, Reader, XyzError};
use serde::{Deserialize, Serialize};

use crate::{ParseError, read_error};

/// What a quick pass over a TeraChem trajectory tells us
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajInfo {
    /// frame number of the first frame
    pub first: usize,

    /// the number of complete frames in the file
    pub frames: usize,
}

/// The 1-based frame number of `frame`. TeraChem counts trajectory frames from
/// zero, one behind the iterations in the output file.
pub fn frame_number(frame: &Frame) -> Option<usize> {
    let i = frame.reported_index()?;
    usize::try_from(i).ok().map(|i| i + 1)
}

/// Read the frame number of the first frame of the trajectory at `path`. Files
/// whose second line does not contain `marker`, or whose counter does not
/// parse, yield `None`.
pub fn first_frame(
    path: impl AsRef<Path>,
    marker: &str,
) -> Result<Option<usize>, ParseError> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| read_error(path, e))?;
    let mut lines = BufReader::new(f).lines();
    let comment = match lines.nth(1) {
        Some(Ok(l)) => l,
        Some(Err(e)) => return Err(read_error(path, e)),
        None => return Ok(None),
    };
    if !comment.contains(marker) {
        return Ok(None);
    }
    Ok(frame_number(&Frame::new(comment, Vec::new())))
}

impl TrajInfo {
    /// Scan the whole trajectory at `path`, returning `None` if it was not
    /// written by TeraChem. A frame that is cut off at the end of the file,
    /// as happens while a run is still writing, is not counted.
    pub fn scan(
        path: impl AsRef<Path>,
        marker: &str,
    ) -> Result<Option<Self>, ParseError> {
        let path = path.as_ref();
        let Some(first) = first_frame(path, marker)? else {
            return Ok(None);
        };
        let f = File::open(path).map_err(|e| read_error(path, e))?;
        let frames = Reader::new(BufReader::new(f).lines())
            .take_while(|f| {
                !matches!(
                    f,
                    Err(XyzError::Truncated { .. } | XyzError::ReadFile(..))
                )
            })
            .count();
        Ok(Some(Self { first, frames }))
    }
}
