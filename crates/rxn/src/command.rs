use std::{
    fs::File,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use log::{debug, info};

use crate::{TaskError, io_error};

/// the script each external command is written to before it runs
pub const SCRIPT: &str = "command.sh";

/// Expand `{{.name}}` directives in `template` with the given values
pub fn expand(template: &str, values: &[(&str, &str)]) -> String {
    let mut ret = template.to_owned();
    for (name, value) in values {
        ret = ret.replace(&format!("{{{{.{name}}}}}"), value);
    }
    ret
}

/// An external program run to completion from a task directory
#[derive(Clone, Debug, PartialEq)]
pub struct External {
    /// the shell command line
    pub command: String,
    pub dir: PathBuf,

    /// file in `dir` receiving both stdout and stderr
    pub log: String,
}

impl External {
    pub fn new(
        command: impl Into<String>,
        dir: impl AsRef<Path>,
        log: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            dir: dir.as_ref().to_path_buf(),
            log: log.into(),
        }
    }

    /// Write the command to [SCRIPT] in `dir`, run it with bash, and wait for
    /// it to exit. `task` is only used in errors
    pub fn run(&self, task: &str) -> Result<(), TaskError> {
        let script = self.dir.join(SCRIPT);
        std::fs::write(&script, format!("{}\n", self.command))
            .map_err(io_error(&script))?;
        let log = self.dir.join(&self.log);
        let out = File::create(&log).map_err(io_error(&log))?;
        let err = out.try_clone().map_err(io_error(&log))?;
        info!("running `{}` in {}", self.command, self.dir.display());
        let status = Command::new("bash")
            .arg(SCRIPT)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(out)
            .stderr(err)
            .status()
            .map_err(io_error("bash"))?;
        debug!("{task} finished with {status}");
        if !status.success() {
            return Err(TaskError::Exit {
                task: task.to_owned(),
                code: status.code(),
            });
        }
        Ok(())
    }
}
