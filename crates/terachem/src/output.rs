use std::{path::Path, sync::OnceLock};

use log::trace;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{ParseError, parse_field, parse_field_rev, read_error};

/// index of the temperature in the whitespace-separated fields of the MD
/// summary line
pub const TEMP_FIELD: usize = 14;

static CELL: OnceLock<[Regex; 3]> = OnceLock::new();

/// The data recorded for one `MD Iteration` of an output file
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// the 1-based frame number, one more than the iteration TeraChem prints
    pub frame: usize,
    pub energy: Option<f64>,
    pub temperature: Option<f64>,
}

/// The parts of a TeraChem output log needed to line it up with its trajectory
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Log {
    /// whether the banner marker was found anywhere in the file
    pub is_terachem: bool,

    /// one entry per `MD Iteration` line, in file order
    pub steps: Vec<Step>,

    /// lines that looked like data but failed to parse. These are not fatal;
    /// the affected field is left empty
    pub errors: Vec<ParseError>,
}

impl Log {
    /// Read the output file at `path`, using `marker` to decide if it was
    /// written by TeraChem. Only failing to read the file is an error.
    pub fn read(
        path: impl AsRef<Path>,
        marker: &str,
    ) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| read_error(path, e))?;
        let contents = String::from_utf8_lossy(&bytes);
        Ok(Self::parse(&contents, &path.display().to_string(), marker))
    }

    /// Parse the contents of an output file. `name` is only used in errors
    pub fn parse(contents: &str, name: &str, marker: &str) -> Self {
        let [iter_re, energy_re, temp_re] = CELL.get_or_init(|| {
            trace!("initializing terachem output regexes");
            [
                Regex::new(r"MD Iteration\s+(\d+)").unwrap(),
                Regex::new(r"^\s*FINAL ENERGY").unwrap(),
                Regex::new(r"ESCF.*EKIN.*TEMP.*ETOT").unwrap(),
            ]
        });
        let mut ret = Self::default();
        let mut cur: Option<Step> = None;
        for (i, line) in contents.lines().enumerate() {
            let lineno = i + 1;
            if !ret.is_terachem && line.contains(marker) {
                ret.is_terachem = true;
            }
            if line.contains("MD Iteration") {
                let Some(n) = iter_re
                    .captures(line)
                    .and_then(|c| c[1].parse::<usize>().ok())
                else {
                    ret.errors.push(ParseError::Iteration {
                        file: name.to_owned(),
                        line: lineno,
                    });
                    continue;
                };
                if let Some(step) = cur.take() {
                    ret.steps.push(step);
                }
                cur = Some(Step {
                    frame: n + 1,
                    ..Default::default()
                });
            } else if energy_re.is_match(line) {
                let Some(step) = cur.as_mut() else {
                    continue;
                };
                match parse_field_rev(line, 1, || ParseError::Energy {
                    file: name.to_owned(),
                    line: lineno,
                }) {
                    Ok(e) => step.energy = Some(e),
                    Err(e) => ret.errors.push(e),
                }
            } else if temp_re.is_match(line) {
                let Some(step) = cur.as_mut() else {
                    continue;
                };
                match parse_field(line, TEMP_FIELD, || {
                    ParseError::Temperature {
                        file: name.to_owned(),
                        line: lineno,
                    }
                }) {
                    Ok(t) => step.temperature = Some(t),
                    Err(e) => ret.errors.push(e),
                }
            }
        }
        if let Some(step) = cur {
            ret.steps.push(step);
        }
        ret
    }

    /// the frame number of the first `MD Iteration`
    pub fn first_frame(&self) -> Option<usize> {
        self.steps.first().map(|s| s.frame)
    }

    pub fn last_frame(&self) -> Option<usize> {
        self.steps.last().map(|s| s.frame)
    }

    /// the number of frames spanned by the file, counted from the first and
    /// last iteration numbers rather than the number of iterations printed
    pub fn frame_count(&self) -> usize {
        match (self.first_frame(), self.last_frame()) {
            (Some(first), Some(last)) if last >= first => last - first + 1,
            (Some(_), Some(_)) => self.steps.len(),
            _ => 0,
        }
    }
}
