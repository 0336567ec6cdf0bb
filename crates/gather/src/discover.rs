use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use log::{debug, info};
use regex::Regex;
use terachem::{Log, TrajInfo};

use crate::{
    ALL_COORS, Config, GatherError,
    report::{Candidate, Pair, Report, Warning},
    restart,
};

/// An accepted pair and the parsed contents of its output file
#[derive(Clone, Debug)]
pub(crate) struct Source {
    pub pair: Pair,
    pub log: Log,
}

/// Compare `a` and `b` the way `ls -v` does, treating runs of digits as
/// numbers so that `run2` sorts before `run10`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = Chunks(a);
    let mut b = Chunks(b);
    loop {
        let ord = match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let xd = x.starts_with(|c: char| c.is_ascii_digit());
                let yd = y.starts_with(|c: char| c.is_ascii_digit());
                if xd && yd {
                    let xs = x.trim_start_matches('0');
                    let ys = y.trim_start_matches('0');
                    xs.len()
                        .cmp(&ys.len())
                        .then_with(|| xs.cmp(ys))
                        .then_with(|| x.len().cmp(&y.len()))
                } else {
                    x.cmp(y)
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

/// splits a string into alternating runs of digits and non-digits
struct Chunks<'a>(&'a str);

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chars = self.0.char_indices();
        let (_, c) = chars.next()?;
        let digit = c.is_ascii_digit();
        let end = chars
            .find(|(_, c)| c.is_ascii_digit() != digit)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        let (chunk, rest) = self.0.split_at(end);
        self.0 = rest;
        Some(chunk)
    }
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, GatherError> {
    let io = |e: std::io::Error| {
        GatherError::Io(dir.display().to_string(), e.kind())
    };
    let mut ret = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        ret.push(entry.map_err(io)?.path());
    }
    Ok(ret)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or_default()
}

/// Find files in `dir` and its immediate subdirectories whose names match
/// `pattern`, in natural order of their paths relative to `dir`
pub fn find_outputs(
    dir: &Path,
    pattern: &Regex,
) -> Result<Vec<PathBuf>, GatherError> {
    let mut ret = Vec::new();
    for path in read_dir(dir)? {
        if path.is_dir() {
            for sub in read_dir(&path)? {
                if sub.is_file() && pattern.is_match(file_name(&sub)) {
                    ret.push(sub);
                }
            }
        } else if path.is_file() && pattern.is_match(file_name(&path)) {
            ret.push(path);
        }
    }
    let rel = |p: &PathBuf| {
        p.strip_prefix(dir).unwrap_or(p).to_string_lossy().into_owned()
    };
    ret.sort_by(|a, b| natural_cmp(&rel(a), &rel(b)));
    Ok(ret)
}

/// Every TeraChem trajectory in `dir` or `dir/scr`, with a summary of each.
/// `exclude` names a file in `top` to leave out, so a previous run's merged
/// trajectory is not mistaken for a source.
fn candidates(
    dir: &Path,
    top: &Path,
    exclude: &str,
    marker: &str,
    report: &mut Report,
) -> Result<Vec<(PathBuf, TrajInfo)>, GatherError> {
    let mut paths = Vec::new();
    for d in [dir.to_path_buf(), dir.join("scr")] {
        if !d.is_dir() {
            continue;
        }
        paths.extend(read_dir(&d)?.into_iter().filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|e| e == "xyz")
                && !(p.parent() == Some(top) && file_name(p) == exclude)
        }));
    }
    paths.sort_by(|a, b| {
        natural_cmp(&a.to_string_lossy(), &b.to_string_lossy())
    });
    let mut ret = Vec::new();
    for path in paths {
        match TrajInfo::scan(&path, marker) {
            Ok(Some(info)) => ret.push((path, info)),
            Ok(None) => {
                debug!("{} is not a TeraChem trajectory", path.display())
            }
            Err(e) => report.warn(Warning::Parse {
                message: e.to_string(),
            }),
        }
    }
    Ok(ret)
}

/// Find every output file under `dir` and pair it with the single trajectory
/// that starts on the same frame, working out the offset of any pair that
/// restarts the frame count. Pairs are returned in discovery order.
pub(crate) fn discover(
    dir: &Path,
    config: &Config,
    report: &mut Report,
) -> Result<Vec<Source>, GatherError> {
    let pattern = config.output_regex()?;
    let mut ret: Vec<Source> = Vec::new();
    let mut offset = 0;
    for output in find_outputs(dir, &pattern)? {
        let log = match Log::read(&output, &config.output_marker) {
            Ok(log) => log,
            Err(e) => {
                report.warn(Warning::Parse {
                    message: e.to_string(),
                });
                continue;
            }
        };
        if !log.is_terachem {
            debug!("{} is not a TeraChem output file", output.display());
            continue;
        }
        let Some(first) = log.first_frame() else {
            debug!("{} has no MD iterations", output.display());
            continue;
        };
        info!(
            "{} is a TeraChem output file starting at frame {first}",
            output.display()
        );
        for e in &log.errors {
            report.warn(Warning::Parse {
                message: e.to_string(),
            });
        }

        let out_dir = output.parent().unwrap_or(dir);
        let found = candidates(
            out_dir,
            dir,
            ALL_COORS,
            &config.trajectory_marker,
            report,
        )?;
        for (path, info) in &found {
            info!(
                "  {} starts at frame {}: {}",
                path.display(),
                info.first,
                if info.first == first { "valid" } else { "invalid" }
            );
        }
        let mut valid: Vec<_> =
            found.iter().filter(|(_, info)| info.first == first).collect();
        if valid.len() != 1 {
            report.warn(Warning::AmbiguousTrajectory {
                output,
                first,
                candidates: found
                    .iter()
                    .map(|(path, info)| Candidate {
                        path: path.clone(),
                        first: info.first,
                    })
                    .collect(),
            });
            continue;
        }
        let (trajectory, info) = valid.remove(0);

        if first == 1 && !ret.is_empty() {
            info!(
                "{} restarts the frame count, looking for its first frame \
                 in earlier trajectories",
                trajectory.display()
            );
            let earlier: Vec<_> = ret.iter().map(|s| &s.pair).collect();
            match restart::find_offset(
                trajectory,
                &earlier,
                config.match_tolerance,
            )? {
                Some(m) => {
                    info!(
                        "matched frame {} of {} (deviation {:.4} Å), \
                         offset is now {}",
                        m.frame,
                        m.trajectory.display(),
                        m.deviation,
                        m.offset
                    );
                    offset = m.offset;
                }
                None => report.warn(Warning::NoRestartMatch {
                    trajectory: trajectory.clone(),
                }),
            }
        }

        let out_frames = log.frame_count();
        if out_frames.abs_diff(info.frames) >= config.mismatch_tolerance {
            report.warn(Warning::FrameCountMismatch {
                output: output.clone(),
                trajectory: trajectory.clone(),
                output_frames: out_frames,
                trajectory_frames: info.frames,
            });
        }
        let length = if config.truncate {
            out_frames.min(info.frames)
        } else {
            out_frames.max(info.frames)
        };
        ret.push(Source {
            pair: Pair {
                output,
                trajectory: trajectory.clone(),
                start: first,
                length,
                offset,
            },
            log,
        });
    }
    Ok(ret)
}
