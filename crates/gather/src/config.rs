//! Configuration settings for gathering a trajectory. Every setting has a
//! default, so the config file is optional.

use std::{fmt::Display, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use terachem::{CompanionNames, OUTPUT_MARKER, TRAJECTORY_MARKER};

use crate::{GapPolicy, GatherError};

/// the name of the config file looked for in the working directory
pub const CONFIG_FILE: &str = "gather.toml";

#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// A regular expression matched against file names to find candidate
    /// output files. The default matches the `.out` and `.o123` names that
    /// TeraChem outputs are usually given.
    output_pattern: Option<String>,

    /// Text identifying an output file as TeraChem output. It may appear on
    /// any line.
    output_marker: Option<String>,

    /// Text identifying a trajectory frame as written by TeraChem. It must
    /// appear in the comment line of the first frame.
    trajectory_marker: Option<String>,

    /// Whether to use only the frames present in both the output and the
    /// trajectory of a pair. Setting this to false merges everything either
    /// file contains.
    truncate: Option<bool>,

    /// The difference in frame counts between an output file and its
    /// trajectory at which a warning is raised.
    mismatch_tolerance: Option<usize>,

    /// The largest coordinate difference in Å for two frames to be considered
    /// the same when lining up a restarted run with an earlier trajectory.
    match_tolerance: Option<f64>,

    /// The RMSD in Å between a frame that replaces an earlier one and its
    /// predecessor above which a warning is raised.
    rmsd_warning: Option<f64>,

    /// What to do with frames missing an energy, temperature, or geometry.
    /// One of "repeat", "skip", or "fail".
    gaps: Option<GapPolicy>,

    charge_file: Option<String>,
    spin_file: Option<String>,
    bond_order_file: Option<String>,

    /// The name of the JSON summary written after a successful run. An empty
    /// string disables it.
    manifest: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConfig")]
pub struct Config {
    pub output_pattern: String,
    pub output_marker: String,
    pub trajectory_marker: String,
    pub truncate: bool,
    pub mismatch_tolerance: usize,
    pub match_tolerance: f64,
    pub rmsd_warning: f64,
    pub gaps: GapPolicy,
    pub companions: CompanionNames,

    /// `None` to skip writing the manifest
    pub manifest: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

impl From<RawConfig> for Config {
    fn from(rc: RawConfig) -> Self {
        let names = CompanionNames::default();
        Self {
            output_pattern: rc
                .output_pattern
                .unwrap_or_else(|| String::from(r"\.o[0-9ut]")),
            output_marker: rc
                .output_marker
                .unwrap_or_else(|| OUTPUT_MARKER.to_owned()),
            trajectory_marker: rc
                .trajectory_marker
                .unwrap_or_else(|| TRAJECTORY_MARKER.to_owned()),
            truncate: rc.truncate.unwrap_or(true),
            mismatch_tolerance: rc.mismatch_tolerance.unwrap_or(5),
            match_tolerance: rc.match_tolerance.unwrap_or(0.1),
            rmsd_warning: rc.rmsd_warning.unwrap_or(0.1),
            gaps: rc.gaps.unwrap_or_default(),
            companions: CompanionNames {
                charge: rc.charge_file.unwrap_or(names.charge),
                spin: rc.spin_file.unwrap_or(names.spin),
                bond_order: rc.bond_order_file.unwrap_or(names.bond_order),
            },
            manifest: match rc.manifest {
                Some(s) if s.is_empty() => None,
                Some(s) => Some(s),
                None => Some(String::from("gather.json")),
            },
        }
    }
}

impl Config {
    /// load a [Config] from the TOML file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GatherError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GatherError::Io(path.display().to_string(), e.kind())
        })?;
        let ret: Self = toml::from_str(&contents).map_err(|e| {
            GatherError::Config(format!(
                "failed to deserialize {} with {e}",
                path.display()
            ))
        })?;
        ret.validate()?;
        Ok(ret)
    }

    /// load `path` if it exists, otherwise return the default settings
    pub fn load_or_default(
        path: impl AsRef<Path>,
    ) -> Result<Self, GatherError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn gaps(mut self, gaps: GapPolicy) -> Self {
        self.gaps = gaps;
        self
    }

    pub fn manifest(mut self, manifest: Option<String>) -> Self {
        self.manifest = manifest;
        self
    }

    /// the compiled form of `output_pattern`
    pub fn output_regex(&self) -> Result<Regex, GatherError> {
        Regex::new(&self.output_pattern)
            .map_err(|e| GatherError::Config(e.to_string()))
    }

    /// check that the settings in `self` make any sense
    pub fn validate(&self) -> Result<(), GatherError> {
        self.output_regex()?;
        for (name, v) in [
            ("match_tolerance", self.match_tolerance),
            ("rmsd_warning", self.rmsd_warning),
        ] {
            if !(v > 0.0) {
                return Err(GatherError::Config(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }
        if self.output_marker.is_empty() || self.trajectory_marker.is_empty() {
            return Err(GatherError::Config(String::from(
                "file markers cannot be empty",
            )));
        }
        Ok(())
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Config {
            output_pattern,
            output_marker,
            trajectory_marker,
            truncate,
            mismatch_tolerance,
            match_tolerance,
            rmsd_warning,
            gaps,
            companions,
            manifest,
        } = self;
        writeln!(f, "Configuration Options:")?;
        writeln!(f, "output_pattern = {output_pattern}")?;
        writeln!(f, "output_marker = {output_marker}")?;
        writeln!(f, "trajectory_marker = {trajectory_marker}")?;
        writeln!(f, "truncate = {truncate}")?;
        writeln!(f, "mismatch_tolerance = {mismatch_tolerance}")?;
        writeln!(f, "match_tolerance = {match_tolerance}")?;
        writeln!(f, "rmsd_warning = {rmsd_warning}")?;
        writeln!(f, "gaps = {gaps}")?;
        writeln!(f, "charge_file = {}", companions.charge)?;
        writeln!(f, "spin_file = {}", companions.spin)?;
        writeln!(f, "bond_order_file = {}", companions.bond_order)?;
        if let Some(manifest) = manifest {
            writeln!(f, "manifest = {manifest}")?;
        }
        Ok(())
    }
}
