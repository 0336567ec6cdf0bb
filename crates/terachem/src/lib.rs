//! Readers for the files a TeraChem molecular-dynamics run leaves behind: the
//! main output log, the XYZ trajectory, and the per-frame annotation files
//! written next to the trajectory.

use std::{error::Error, fmt::Display};

pub mod companion;
pub mod output;
pub mod trajectory;

pub use companion::{Annotation, Companions, CompanionNames};
pub use output::{Log, Step};
pub use trajectory::TrajInfo;

#[cfg(test)]
mod tests;

/// The line every TeraChem output file prints in its banner
pub const OUTPUT_MARKER: &str = "Chemistry at the Speed of Graphics!";

/// The text TeraChem puts in the comment line of its trajectory frames
pub const TRAJECTORY_MARKER: &str = "generated by terachem";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    ReadFile(String, std::io::ErrorKind),
    Iteration { file: String, line: usize },
    Energy { file: String, line: usize },
    Temperature { file: String, line: usize },
    Companion { file: String, line: usize },
    BondOrderCount { file: String, line: usize },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for ParseError {}

/// parses the `nth` field of `line` into a float and returns `err` if it is
/// missing or fails to parse
#[inline]
fn parse_field(
    line: &str,
    nth: usize,
    err: impl FnOnce() -> ParseError,
) -> Result<f64, ParseError> {
    line.split_whitespace()
        .nth(nth)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(err)
}

/// like [parse_field] but counting from the end of the line
#[inline]
fn parse_field_rev(
    line: &str,
    nth: usize,
    err: impl FnOnce() -> ParseError,
) -> Result<f64, ParseError> {
    line.split_whitespace()
        .rev()
        .nth(nth)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(err)
}

fn read_error(path: &std::path::Path, e: std::io::Error) -> ParseError {
    ParseError::ReadFile(path.display().to_string(), e.kind())
}
