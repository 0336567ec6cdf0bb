use std::path::{Path, PathBuf};

use crate::TaskError;

/// One step of a refinement. Inputs and outputs are full paths, so that
/// [Graph](crate::Graph) can check them without knowing where a task keeps
/// its files.
pub trait Task {
    /// a name unique within a graph
    fn name(&self) -> &str;

    /// the directory the task works in
    fn dir(&self) -> &Path;

    /// files that must exist before the task can run
    fn inputs(&self) -> Vec<PathBuf>;

    /// files the task promises to produce. A task whose outputs all exist is
    /// considered done without running it
    fn outputs(&self) -> Vec<PathBuf>;

    /// write whatever input files the task needs
    fn prepare(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    fn execute(&mut self) -> Result<(), TaskError>;

    /// the declared outputs that do not exist yet
    fn missing_outputs(&self) -> Vec<PathBuf> {
        self.outputs().into_iter().filter(|p| !p.exists()).collect()
    }

    fn missing_inputs(&self) -> Vec<PathBuf> {
        self.inputs().into_iter().filter(|p| !p.exists()).collect()
    }

    fn is_cached(&self) -> bool {
        !self.outputs().is_empty() && self.missing_outputs().is_empty()
    }
}
