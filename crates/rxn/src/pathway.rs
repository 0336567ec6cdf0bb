//! The two stages of a refinement as sets of tasks. A [Trajectory] cuts a
//! reactive segment out of an MD run and hands the result to a [Pathway],
//! which optimizes its ends and interpolates between them.

use std::path::{Path, PathBuf};

use crate::{
    Config, Graph, TaskError,
    calc::{
        GrowingString, Interpolation, Join, Optimization, Part, Respace,
        Select, optimize,
    },
};

/// opt START, the MD frames, and opt END
pub const JOINED: &str = "joined.xyz";

/// [JOINED] re-spaced, the starting point of a [Pathway]
pub const SPACED: &str = "spaced.xyz";

/// the path with freshly optimized end points
pub const REJOINED: &str = "rejoined.xyz";

pub const RESPACED: &str = "respaced.xyz";

/// the interpolated path re-spaced
pub const INTERSPACED: &str = "interspaced.xyz";

/// A path between two minima, refined in `dir`
#[derive(Clone, Debug, PartialEq)]
pub struct Pathway {
    pub dir: PathBuf,

    /// skip the end-point optimizations and the growing string, and
    /// interpolate the spaced path as it is
    pub prepare_only: bool,
}

impl Pathway {
    pub fn new(dir: impl Into<PathBuf>, prepare_only: bool) -> Self {
        Self {
            dir: dir.into(),
            prepare_only,
        }
    }

    fn opt(
        &self,
        name: &str,
        source: &Path,
        select: Select,
        config: &Config,
    ) -> Optimization {
        Optimization::new(
            name,
            self.dir.join(name),
            source,
            select,
            &config.template,
            config.charge,
            &config.terachem,
        )
    }

    /// Add the tasks refining the path in `spaced` to `graph`. If given,
    /// `after` names the task producing `spaced`.
    pub fn build(
        &self,
        graph: &mut Graph,
        config: &Config,
        spaced: &Path,
        after: Option<&str>,
    ) -> Result<(), TaskError> {
        let after: Vec<&str> = after.into_iter().collect();
        let dir = &self.dir;
        let interpolate = if self.prepare_only {
            graph.add(
                Interpolation::new(
                    "interpolate",
                    dir,
                    spaced,
                    &config.interpolate,
                ),
                &after,
            )?;
            "interpolate"
        } else {
            graph.add(
                self.opt("opt-init", spaced, Select::First, config),
                &after,
            )?;
            graph.add(
                self.opt("opt-final", spaced, Select::Last, config),
                &after,
            )?;
            graph.add(
                Join::new(
                    "rejoin",
                    dir,
                    vec![
                        Part::new(
                            dir.join("opt-init").join(optimize::FINAL),
                            Select::Last,
                        ),
                        Part::optional(spaced, Select::Interior),
                        Part::new(
                            dir.join("opt-final").join(optimize::FINAL),
                            Select::Last,
                        ),
                    ],
                    REJOINED,
                ),
                &["opt-init", "opt-final"],
            )?;
            graph.add(
                Respace::new(
                    "respace",
                    dir,
                    REJOINED,
                    RESPACED,
                    config.spacing,
                ),
                &["rejoin"],
            )?;
            graph.add(
                Interpolation::new(
                    "interpolate",
                    dir,
                    dir.join(RESPACED),
                    &config.interpolate,
                ),
                &["respace"],
            )?;
            "interpolate"
        };
        graph.add(
            Respace::new(
                "interspace",
                dir,
                Interpolation::OUTPUT,
                INTERSPACED,
                config.interspacing,
            ),
            &[interpolate],
        )?;
        if let Some(gsm) = config.gsm.as_deref()
            && !self.prepare_only
        {
            graph.add(
                GrowingString::new(
                    "gsm",
                    dir.join("gsm"),
                    dir.join(INTERSPACED),
                    gsm,
                ),
                &["interspace"],
            )?;
        }
        Ok(())
    }
}

/// A reactive segment of an MD trajectory, from frame `start` to frame `end`
/// (0-based, inclusive)
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub md: PathBuf,
    pub start: usize,
    pub end: usize,
    pub dir: PathBuf,
    pub prepare_only: bool,
}

impl Trajectory {
    /// Add the tasks cutting out the segment and refining it to `graph`
    pub fn build(
        &self,
        graph: &mut Graph,
        config: &Config,
    ) -> Result<(), TaskError> {
        if self.start >= self.end {
            return Err(TaskError::Config(format!(
                "start frame {} must come before end frame {}",
                self.start, self.end
            )));
        }
        let dir = &self.dir;
        let pathway = Pathway::new(dir, self.prepare_only);
        for (name, frame) in [("opt-start", self.start), ("opt-end", self.end)]
        {
            graph.add(
                pathway.opt(name, &self.md, Select::Index(frame), config),
                &[],
            )?;
        }
        graph.add(
            Join::new(
                "join",
                dir,
                vec![
                    Part::new(
                        dir.join("opt-start").join(optimize::FINAL),
                        Select::Last,
                    ),
                    Part::new(&self.md, Select::Range(self.start, self.end)),
                    Part::new(
                        dir.join("opt-end").join(optimize::FINAL),
                        Select::Last,
                    ),
                ],
                JOINED,
            ),
            &["opt-start", "opt-end"],
        )?;
        graph.add(
            Respace::new("space", dir, JOINED, SPACED, config.spacing),
            &["join"],
        )?;
        pathway.build(graph, config, &dir.join(SPACED), Some("space"))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Status, calc::Spacing};

    use super::*;

    fn config(gsm: Option<&str>) -> Config {
        Config {
            terachem: "true".to_owned(),
            interpolate: "true".to_owned(),
            gsm: gsm.map(str::to_owned),
            template: String::new(),
            charge: 0,
            spacing: Spacing::Images(5),
            interspacing: Spacing::Images(3),
        }
    }

    fn names(g: &Graph) -> Vec<&str> {
        g.statuses().into_iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn full() {
        let mut g = Graph::new();
        let t = Trajectory {
            md: "md.xyz".into(),
            start: 3,
            end: 9,
            dir: "out".into(),
            prepare_only: false,
        };
        t.build(&mut g, &config(Some("gsm"))).unwrap();
        assert_eq!(
            names(&g),
            vec![
                "opt-start",
                "opt-end",
                "join",
                "space",
                "opt-init",
                "opt-final",
                "rejoin",
                "respace",
                "interpolate",
                "interspace",
                "gsm",
            ]
        );
        assert!(g.statuses().iter().all(|(_, s)| **s == Status::Pending));
    }

    #[test]
    fn prepare_only() {
        let mut g = Graph::new();
        let t = Trajectory {
            md: "md.xyz".into(),
            start: 3,
            end: 9,
            dir: "out".into(),
            prepare_only: true,
        };
        t.build(&mut g, &config(Some("gsm"))).unwrap();
        assert_eq!(
            names(&g),
            vec![
                "opt-start",
                "opt-end",
                "join",
                "space",
                "interpolate",
                "interspace"
            ]
        );
    }

    #[test]
    fn pathway_without_gsm() {
        let mut g = Graph::new();
        Pathway::new("out", false)
            .build(&mut g, &config(None), Path::new("spaced.xyz"), None)
            .unwrap();
        assert_eq!(g.len(), 6);
        assert_eq!(names(&g).last(), Some(&"interspace"));
    }

    #[test]
    fn backwards_range() {
        let mut g = Graph::new();
        let t = Trajectory {
            md: "md.xyz".into(),
            start: 9,
            end: 9,
            dir: "out".into(),
            prepare_only: false,
        };
        assert!(matches!(
            t.build(&mut g, &config(None)),
            Err(TaskError::Config(_))
        ));
        assert!(g.is_empty());
    }
}
