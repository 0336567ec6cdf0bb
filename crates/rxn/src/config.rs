//! Configuration for `refine`, read from a TOML file. Only the TeraChem input
//! template is required.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{TaskError, calc::Spacing, io_error};

/// the default name of the config file
pub const CONFIG_FILE: &str = "refine.toml";

/// A TeraChem input template, either written out in the config file or read
/// from another file
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TemplateSrc {
    Literal(String),
    File { file: PathBuf },
}

#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// The command line for a TeraChem optimization. `{{.input}}` expands to
    /// the input file name.
    terachem: Option<String>,

    /// The command line for the path interpolation. `{{.input}}` and
    /// `{{.output}}` expand to the input and output XYZ files.
    interpolate: Option<String>,

    /// The command line for a growing-string run, with the same directives
    /// as `interpolate`. The growing string is skipped if this is not set.
    gsm: Option<String>,

    /// The TeraChem input for the optimizations. `{{.geom}}` expands to the
    /// starting geometry file and `{{.charge}}` to `charge`.
    template: Option<TemplateSrc>,

    /// The molecular charge.
    charge: Option<isize>,

    /// The spacing of the path handed to the interpolation, either a number
    /// of frames or a distance in Å.
    spacing: Option<Spacing>,

    /// The spacing of the interpolated path.
    interspacing: Option<Spacing>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub terachem: String,
    pub interpolate: String,
    pub gsm: Option<String>,

    /// the template text, already read in if it came from a file
    pub template: String,
    pub charge: isize,
    pub spacing: Spacing,
    pub interspacing: Spacing,
}

impl Config {
    /// Load a [Config] from the TOML file at `path`. A template given as a
    /// file is read relative to the directory containing `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TaskError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(io_error(path))?;
        let raw: RawConfig = toml::from_str(&contents).map_err(|e| {
            TaskError::Config(format!(
                "failed to deserialize {} with {e}",
                path.display()
            ))
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        let ret = Self::from_raw(raw, base)?;
        ret.validate()?;
        Ok(ret)
    }

    fn from_raw(rc: RawConfig, base: &Path) -> Result<Self, TaskError> {
        let template = match rc.template {
            Some(TemplateSrc::Literal(s)) => s,
            Some(TemplateSrc::File { file }) => {
                let file = base.join(file);
                std::fs::read_to_string(&file).map_err(io_error(&file))?
            }
            None => {
                return Err(TaskError::Config(String::from(
                    "a TeraChem input template is required",
                )));
            }
        };
        Ok(Self {
            terachem: rc
                .terachem
                .unwrap_or_else(|| String::from("terachem {{.input}}")),
            interpolate: rc.interpolate.unwrap_or_else(|| {
                String::from("Nebterpolate.py {{.input}} {{.output}}")
            }),
            gsm: rc.gsm,
            template,
            charge: rc.charge.unwrap_or(0),
            spacing: rc.spacing.unwrap_or(Spacing::Distance(0.1)),
            interspacing: rc.interspacing.unwrap_or(Spacing::Images(21)),
        })
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        for (name, s) in [
            ("spacing", self.spacing),
            ("interspacing", self.interspacing),
        ] {
            match s {
                Spacing::Images(n) if n < 2 => {
                    return Err(TaskError::Config(format!(
                        "{name} needs at least 2 images, got {n}"
                    )));
                }
                Spacing::Distance(d) if !(d > 0.0) => {
                    return Err(TaskError::Config(format!(
                        "{name} must be positive, got {d}"
                    )));
                }
                _ => {}
            }
        }
        if self.terachem.trim().is_empty() || self.interpolate.trim().is_empty()
        {
            return Err(TaskError::Config(String::from(
                "commands cannot be empty",
            )));
        }
        Ok(())
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Config {
            terachem,
            interpolate,
            gsm,
            template: _,
            charge,
            spacing,
            interspacing,
        } = self;
        writeln!(f, "Configuration Options:")?;
        writeln!(f, "terachem = {terachem}")?;
        writeln!(f, "interpolate = {interpolate}")?;
        if let Some(gsm) = gsm {
            writeln!(f, "gsm = {gsm}")?;
        }
        writeln!(f, "charge = {charge}")?;
        writeln!(f, "spacing = {spacing}")?;
        writeln!(f, "interspacing = {interspacing}")?;
        Ok(())
    }
}
