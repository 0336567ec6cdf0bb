use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use log::info;
use regex::Regex;

use crate::{
    Task, TaskError,
    calc::{Select, load, write},
    command::{External, expand},
    io_error,
};

/// the TeraChem input file written from the template
pub const INPUT: &str = "opt.in";

/// the starting geometry, referenced from the input by `{{.geom}}`
pub const GEOM: &str = "start.xyz";

/// where TeraChem leaves the optimization trajectory
pub const OPTIM: &str = "scr/optim.xyz";

/// the optimized geometry
pub const FINAL: &str = "final.xyz";

pub const LOG: &str = "opt.out";

static INPUT_CELL: OnceLock<[Regex; 2]> = OnceLock::new();

/// A TeraChem geometry optimization of one frame of an XYZ file
#[derive(Clone, Debug)]
pub struct Optimization {
    name: String,
    dir: PathBuf,

    /// the file holding the starting frame and which frame to take
    source: PathBuf,
    select: Select,

    template: String,
    charge: isize,

    /// shell command line. `{{.input}}` expands to the input file name
    command: String,
}

impl Optimization {
    pub fn new(
        name: impl Into<String>,
        dir: impl AsRef<Path>,
        source: impl Into<PathBuf>,
        select: Select,
        template: &str,
        charge: isize,
        command: &str,
    ) -> Self {
        Self {
            name: name.into(),
            dir: dir.as_ref().to_path_buf(),
            source: source.into(),
            select,
            template: template.to_owned(),
            charge,
            command: command.to_owned(),
        }
    }

    /// the TeraChem input built from the template
    pub fn input(&self) -> String {
        let [geom, charge] = INPUT_CELL.get_or_init(|| {
            [
                Regex::new(r"\{\{\.geom\}\}").unwrap(),
                Regex::new(r"\{\{\.charge\}\}").unwrap(),
            ]
        });
        let body = geom.replace_all(&self.template, GEOM);
        charge
            .replace_all(&body, self.charge.to_string())
            .into_owned()
    }
}

impl Task for Optimization {
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
        vec![self.dir.join(FINAL)]
    }

    fn prepare(&mut self) -> Result<(), TaskError> {
        let mut frames = self.select.apply(load(&self.source)?);
        if frames.len() != 1 {
            return Err(TaskError::Selection {
                task: self.name.clone(),
                msg: format!(
                    "expected one frame from {} with {:?}, found {}",
                    self.source.display(),
                    self.select,
                    frames.len()
                ),
            });
        }
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        frames[0].comment = format!("{} starting geometry", self.name);
        write(&self.dir.join(GEOM), &frames)?;
        let input = self.dir.join(INPUT);
        std::fs::write(&input, self.input()).map_err(io_error(&input))
    }

    fn execute(&mut self) -> Result<(), TaskError> {
        let cmd = expand(&self.command, &[("input", INPUT)]);
        External::new(cmd, &self.dir, LOG).run(&self.name)?;
        let optim = self.dir.join(OPTIM);
        if !optim.exists() {
            return Err(TaskError::MissingOutputs {
                task: self.name.clone(),
                missing: vec![optim],
            });
        }
        let last = Select::Last.apply(load(&optim)?);
        info!(
            "{}: optimization finished, writing {}",
            self.name,
            self.dir.join(FINAL).display()
        );
        write(&self.dir.join(FINAL), &last)
    }
}
