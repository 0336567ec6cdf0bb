use std::path::{Path, PathBuf};

use crate::{
    Task, TaskError,
    command::{External, expand},
    io_error,
};

/// Run an external interpolation program on a path. The path is copied to
/// `interpolate.in.xyz` and the program is expected to write
/// `interpolated.xyz`.
#[derive(Clone, Debug)]
pub struct Interpolation {
    name: String,
    dir: PathBuf,
    source: PathBuf,

    /// `{{.input}}` and `{{.output}}` expand to the file names
    command: String,
}

impl Interpolation {
    pub const INPUT: &str = "interpolate.in.xyz";
    pub const OUTPUT: &str = "interpolated.xyz";
    pub const LOG: &str = "interpolate.log";

    pub fn new(
        name: impl Into<String>,
        dir: impl AsRef<Path>,
        source: impl Into<PathBuf>,
        command: &str,
    ) -> Self {
        Self {
            name: name.into(),
            dir: dir.as_ref().to_path_buf(),
            source: source.into(),
            command: command.to_owned(),
        }
    }
}

impl Task for Interpolation {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn inputs(&self) -> Vec<PathBuf> {
        vec![self.source.clone()]
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.dir.join(Self::OUTPUT)]
    }

    fn prepare(&mut self) -> Result<(), TaskError> {
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let input = self.dir.join(Self::INPUT);
        std::fs::copy(&self.source, &input).map_err(io_error(&input))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        let cmd = expand(
            &self.command,
            &[("input", Self::INPUT), ("output", Self::OUTPUT)],
        );
        External::new(cmd, &self.dir, Self::LOG).run(&self.name)
    }
}

/// A growing-string refinement of a path, run in its own directory
#[derive(Clone, Debug)]
pub struct GrowingString {
    name: String,
    dir: PathBuf,
    source: PathBuf,
    command: String,
}

impl GrowingString {
    pub const INPUT: &str = "initial.xyz";
    pub const OUTPUT: &str = "string.xyz";
    pub const LOG: &str = "gsm.log";

    pub fn new(
        name: impl Into<String>,
        dir: impl AsRef<Path>,
        source: impl Into<PathBuf>,
        command: &str,
    ) -> Self {
        Self {
            name: name.into(),
            dir: dir.as_ref().to_path_buf(),
            source: source.into(),
            command: command.to_owned(),
        }
    }
}

impl Task for GrowingString {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn inputs(&self) -> Vec<PathBuf> {
        vec![self.source.clone()]
    }

    fn outputs(&self) -> Vec<PathBuf> {
        vec![self.dir.join(Self::OUTPUT)]
    }

    fn prepare(&mut self) -> Result<(), TaskError> {
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let input = self.dir.join(Self::INPUT);
        std::fs::copy(&self.source, &input).map_err(io_error(&input))?;
        Ok(())
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        let cmd = expand(
            &self.command,
            &[("input", Self::INPUT), ("output", Self::OUTPUT)],
        );
        External::new(cmd, &self.dir, Self::LOG).run(&self.name)
    }
}
