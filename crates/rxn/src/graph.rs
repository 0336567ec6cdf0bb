use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::{Status, Task, TaskError};

struct Node {
    task: Box<dyn Task>,
    deps: Vec<usize>,
    status: Status,
}

/// Tasks together with the tasks they depend on. Dependencies can only name
/// tasks added earlier, so the insertion order is already a valid running
/// order and there can be no cycles.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
    ids: FxHashMap<String, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add `task`, to be run after every task named in `deps`
    pub fn add(
        &mut self,
        task: impl Task + 'static,
        deps: &[&str],
    ) -> Result<usize, TaskError> {
        let name = task.name().to_owned();
        if self.ids.contains_key(&name) {
            return Err(TaskError::DuplicateName(name));
        }
        let deps = deps
            .iter()
            .map(|d| {
                self.ids.get(*d).copied().ok_or_else(|| {
                    TaskError::UnknownDependency {
                        task: name.clone(),
                        dependency: d.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let id = self.nodes.len();
        self.ids.insert(name, id);
        self.nodes.push(Node {
            task: Box::new(task),
            deps,
            status: Status::Pending,
        });
        Ok(id)
    }

    pub fn status(&self, name: &str) -> Option<&Status> {
        self.ids.get(name).map(|&id| &self.nodes[id].status)
    }

    /// every task name with its status, in running order
    pub fn statuses(&self) -> Vec<(&str, &Status)> {
        self.nodes
            .iter()
            .map(|n| (n.task.name(), &n.status))
            .collect()
    }

    /// Run every pending task in order. A task whose dependency failed is
    /// failed without running, so one failure does not stop unrelated tasks.
    /// Returns [TaskError::Failed] naming the failed tasks if there were any.
    pub fn run(&mut self) -> Result<(), TaskError> {
        for id in 0..self.nodes.len() {
            if self.nodes[id].status != Status::Pending {
                continue;
            }
            let failed_dep = self.nodes[id]
                .deps
                .iter()
                .find(|&&d| !self.nodes[d].status.is_complete())
                .map(|&d| self.nodes[d].task.name().to_owned());
            let node = &mut self.nodes[id];
            let name = node.task.name().to_owned();
            if let Some(dep) = failed_dep {
                warn!("{name}: skipping because {dep} did not complete");
                node.status.advance(
                    &name,
                    Status::Failed(format!("dependency {dep} failed")),
                )?;
                continue;
            }
            if node.task.is_cached() {
                info!("{name}: outputs already present, skipping");
                node.status.advance(&name, Status::Complete)?;
                continue;
            }
            node.status.advance(&name, Status::Running)?;
            info!("{name}: running in {}", node.task.dir().display());
            let next = match Self::run_task(node.task.as_mut()) {
                Ok(()) => {
                    info!("{name}: complete");
                    Status::Complete
                }
                Err(e) => {
                    warn!("{name}: {e}");
                    Status::Failed(e.to_string())
                }
            };
            node.status.advance(&name, next)?;
        }
        let failed: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.status.is_failed())
            .map(|n| n.task.name().to_owned())
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(TaskError::Failed(failed))
        }
    }

    /// a task succeeds when it runs without error and leaves all of its
    /// declared outputs behind
    fn run_task(task: &mut dyn Task) -> Result<(), TaskError> {
        let missing = task.missing_inputs();
        if !missing.is_empty() {
            return Err(TaskError::MissingInputs {
                task: task.name().to_owned(),
                missing,
            });
        }
        task.prepare()?;
        task.execute()?;
        let missing = task.missing_outputs();
        if !missing.is_empty() {
            return Err(TaskError::MissingOutputs {
                task: task.name().to_owned(),
                missing,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        path::{Path, PathBuf},
        rc::Rc,
    };

    use super::*;

    /// writes its output file unless `fail` is set, counting its runs
    struct Touch {
        name: String,
        dir: PathBuf,
        input: Option<PathBuf>,
        write: bool,
        fail: bool,
        runs: Rc<Cell<usize>>,
    }

    impl Touch {
        fn new(name: &str, dir: &Path, runs: &Rc<Cell<usize>>) -> Self {
            Self {
                name: name.to_owned(),
                dir: dir.to_path_buf(),
                input: None,
                write: true,
                fail: false,
                runs: runs.clone(),
            }
        }
    }

    impl Task for Touch {
        fn name(&self) -> &str {
            &self.name
        }

        fn dir(&self) -> &Path {
            &self.dir
        }

        fn inputs(&self) -> Vec<PathBuf> {
            self.input.iter().cloned().collect()
        }

        fn outputs(&self) -> Vec<PathBuf> {
            vec![self.dir.join(&self.name)]
        }

        fn execute(&mut self) -> Result<(), TaskError> {
            self.runs.set(self.runs.get() + 1);
            if self.fail {
                return Err(TaskError::Exit {
                    task: self.name.clone(),
                    code: Some(1),
                });
            }
            if self.write {
                std::fs::write(self.dir.join(&self.name), "").unwrap();
            }
            Ok(())
        }
    }

    #[test]
    fn runs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        g.add(Touch::new("a", dir.path(), &runs), &[]).unwrap();
        let mut b = Touch::new("b", dir.path(), &runs);
        b.input = Some(dir.path().join("a"));
        g.add(b, &["a"]).unwrap();
        g.run().unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(
            g.statuses(),
            vec![("a", &Status::Complete), ("b", &Status::Complete)]
        );
    }

    #[test]
    fn failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        let mut a = Touch::new("a", dir.path(), &runs);
        a.fail = true;
        g.add(a, &[]).unwrap();
        g.add(Touch::new("b", dir.path(), &runs), &["a"]).unwrap();
        g.add(Touch::new("c", dir.path(), &runs), &["b"]).unwrap();
        g.add(Touch::new("d", dir.path(), &runs), &[]).unwrap();
        let got = g.run();
        assert_eq!(
            got,
            Err(TaskError::Failed(vec![
                "a".to_owned(),
                "b".to_owned(),
                "c".to_owned()
            ]))
        );
        // a and d ran, b and c never did
        assert_eq!(runs.get(), 2);
        assert_eq!(
            g.status("a"),
            Some(&Status::Failed("a exited with status 1".to_owned()))
        );
        assert_eq!(
            g.status("c"),
            Some(&Status::Failed("dependency b failed".to_owned()))
        );
        assert_eq!(g.status("d"), Some(&Status::Complete));
    }

    #[test]
    fn cached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), "").unwrap();
        let runs = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        g.add(Touch::new("a", dir.path(), &runs), &[]).unwrap();
        g.run().unwrap();
        assert_eq!(runs.get(), 0);
        assert_eq!(g.status("a"), Some(&Status::Complete));
    }

    #[test]
    fn missing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        let mut a = Touch::new("a", dir.path(), &runs);
        a.write = false;
        g.add(a, &[]).unwrap();
        assert!(g.run().is_err());
        assert_eq!(runs.get(), 1);
        assert!(g.status("a").unwrap().is_failed());
    }

    #[test]
    fn missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        let mut a = Touch::new("a", dir.path(), &runs);
        a.input = Some(dir.path().join("nope"));
        g.add(a, &[]).unwrap();
        assert!(g.run().is_err());
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn bad_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Rc::new(Cell::new(0));
        let mut g = Graph::new();
        g.add(Touch::new("a", dir.path(), &runs), &[]).unwrap();
        assert_eq!(
            g.add(Touch::new("a", dir.path(), &runs), &[]),
            Err(TaskError::DuplicateName("a".to_owned()))
        );
        assert_eq!(
            g.add(Touch::new("b", dir.path(), &runs), &["c"]),
            Err(TaskError::UnknownDependency {
                task: "b".to_owned(),
                dependency: "c".to_owned()
            })
        );
        assert_eq!(g.len(), 1);
    }
}
