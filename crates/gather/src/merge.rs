use std::path::Path;

use geom::{Reader, XyzError};
use log::debug;
use terachem::{Companions, trajectory::frame_number};

use crate::{
    Config, GatherError,
    discover::Source,
    report::{Pair, Report, Warning},
    store::{FrameStore, Snapshot},
};

/// The global index of frame number `frame` in `pair` when frame number
/// `base` sits at index zero
pub fn global_index(
    frame: usize,
    pair: &Pair,
    base: usize,
) -> Result<usize, GatherError> {
    (frame + pair.offset).checked_sub(base).ok_or_else(|| {
        GatherError::NegativeIndex {
            file: pair.output.display().to_string(),
            frame,
            offset: pair.offset,
            base,
        }
    })
}

/// Read everything usable from `src` into `store`. Later calls win where two
/// pairs cover the same index.
pub(crate) fn merge(
    store: &mut FrameStore,
    src: &Source,
    base: usize,
    config: &Config,
    report: &mut Report,
) -> Result<(), GatherError> {
    let pair = &src.pair;
    for step in src.log.steps.iter().filter(|s| pair.contains(s.frame)) {
        let i = global_index(step.frame, pair, base)?;
        if let Some(e) = step.energy {
            store.set_energy(i, e);
        }
        if let Some(t) = step.temperature {
            store.set_temperature(i, t);
        }
    }

    let path = &pair.trajectory;
    let name = path.display().to_string();
    let mut companions = Companions::open(
        path.parent().unwrap_or(Path::new(".")),
        &config.companions,
    )?;
    let reader =
        Reader::open(path).map_err(|e| GatherError::Xyz(name.clone(), e))?;
    for frame in reader {
        let frame = match frame {
            Ok(f) => f,
            Err(XyzError::Truncated { .. } | XyzError::ReadFile(..)) => break,
            Err(e) => {
                report.warn(Warning::Parse {
                    message: format!("{name}: {e}"),
                });
                // the bad frame still has a row in each companion file
                companions.next_frame(0);
                continue;
            }
        };
        let annotation = companions.next_frame(frame.len());
        let Some(number) = frame_number(&frame) else {
            report.warn(Warning::Parse {
                message: format!(
                    "{name}: no frame counter in `{}`",
                    frame.comment
                ),
            });
            continue;
        };
        if !pair.contains(number) {
            continue;
        }
        let i = global_index(number, pair, base)?;
        let replaced =
            store.set_snapshot(i, Snapshot::new(frame, annotation));
        if replaced.is_none() {
            continue;
        }
        if let Some(rmsd) = store.rmsd_to_previous(i) {
            debug!("replaced coordinates at {i}; RMSD = {rmsd:.4}");
            if rmsd > config.rmsd_warning {
                report.warn(Warning::LargeJump { index: i, rmsd });
            }
        }
    }
    for e in companions.errors.drain(..) {
        report.warn(Warning::Parse {
            message: e.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn negative_index() {
        let pair = Pair {
            output: PathBuf::from("run/md.out"),
            trajectory: PathBuf::new(),
            start: 1,
            length: 10,
            offset: 2,
        };
        assert_eq!(global_index(4, &pair, 6).unwrap(), 0);
        let got = global_index(1, &pair, 6).unwrap_err();
        assert_eq!(
            got,
            GatherError::NegativeIndex {
                file: "run/md.out".to_owned(),
                frame: 1,
                offset: 2,
                base: 6,
            }
        );
    }
}
