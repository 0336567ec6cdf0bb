use std::{
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::atom::{Atom, AtomError};

/// A single XYZ block: the comment line and the atoms. The atom-count line is
/// implied by `atoms.len()`
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub comment: String,
    pub atoms: Vec<Atom>,
}

impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.atoms.len())?;
        writeln!(f, "{}", self.comment)?;
        for atom in &self.atoms {
            writeln!(f, "{atom}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XyzError {
    ReadFile(String, std::io::ErrorKind),

    /// the line that should have held the number of atoms did not parse
    AtomCount { line: usize, text: String },

    Atom { line: usize, err: AtomError },

    /// the input ended in the middle of a frame
    Truncated {
        line: usize,
        expected: usize,
        found: usize,
    },

    Empty,
}

impl Display for XyzError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XyzError::ReadFile(name, kind) => {
                write!(f, "failed to read {name}: {kind}")
            }
            XyzError::AtomCount { line, text } => {
                write!(f, "line {line}: expected an atom count, found `{text}`")
            }
            XyzError::Atom { line, err } => write!(f, "line {line}: {err}"),
            XyzError::Truncated {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {line}: frame ended after {found} of {expected} atoms"
            ),
            XyzError::Empty => write!(f, "no frames found"),
        }
    }
}

impl std::error::Error for XyzError {}

impl FromStr for Frame {
    type Err = XyzError;

    /// parse the first frame in `s`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reader::new(s.lines().map(|l| Ok(l.to_owned())))
            .next()
            .unwrap_or(Err(XyzError::Empty))
    }
}

impl Frame {
    pub fn new(comment: impl Into<String>, atoms: Vec<Atom>) -> Self {
        Self {
            comment: comment.into(),
            atoms,
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// the integer in the second whitespace-separated field of the comment
    /// line, if there is one. TeraChem writes comments like
    /// `frame 12 xyz file generated by terachem`
    pub fn reported_index(&self) -> Option<isize> {
        self.comment.split_whitespace().nth(1)?.parse().ok()
    }
}

/// Iterator over the frames of an XYZ trajectory. A frame that fails to parse
/// is yielded as an `Err` and the reader resynchronizes on the next line that
/// holds a bare integer.
pub struct Reader<I> {
    lines: I,
    line: usize,
    done: bool,
    /// set after a bad atom-count line so that the following junk lines are
    /// skipped quietly
    resync: bool,
}

impl<I> Reader<I>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            line: 0,
            done: false,
            resync: false,
        }
    }

    fn next_line(&mut self) -> Option<Result<String, XyzError>> {
        let line = self.lines.next()?;
        self.line += 1;
        Some(line.map_err(|e| XyzError::ReadFile(String::new(), e.kind())))
    }
}

impl Reader<Lines<BufReader<File>>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, XyzError> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            XyzError::ReadFile(path.display().to_string(), e.kind())
        })?;
        Ok(Self::new(BufReader::new(f).lines()))
    }
}

impl<I> Iterator for Reader<I>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    type Item = Result<Frame, XyzError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let natoms = loop {
            let line = match self.next_line()? {
                Ok(l) => l,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match trimmed.parse::<usize>() {
                Ok(n) => {
                    self.resync = false;
                    break n;
                }
                Err(_) if self.resync => continue,
                Err(_) => {
                    self.resync = true;
                    return Some(Err(XyzError::AtomCount {
                        line: self.line,
                        text: line,
                    }));
                }
            }
        };
        let start = self.line;
        let comment = match self.next_line() {
            Some(Ok(l)) => l.trim().to_owned(),
            Some(Err(e)) => {
                self.done = true;
                return Some(Err(e));
            }
            None => {
                self.done = true;
                return Some(Err(XyzError::Truncated {
                    line: start,
                    expected: natoms,
                    found: 0,
                }));
            }
        };
        // the count comes from the file, so it cannot size an allocation
        let mut atoms = Vec::new();
        let mut err = None;
        while atoms.len() < natoms {
            let line = match self.next_line() {
                Some(Ok(l)) => l,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return Some(Err(XyzError::Truncated {
                        line: start,
                        expected: natoms,
                        found: atoms.len(),
                    }));
                }
            };
            match line.parse::<Atom>() {
                Ok(a) => atoms.push(a),
                Err(e) => {
                    // keep consuming the block so the next frame starts in
                    // the right place
                    err.get_or_insert(XyzError::Atom {
                        line: self.line,
                        err: e,
                    });
                    atoms.push(Atom::new(0, 0.0, 0.0, 0.0));
                }
            }
        }
        if let Some(e) = err {
            return Some(Err(e));
        }
        Some(Ok(Frame { comment, atoms }))
    }
}

/// load every frame in the XYZ file at `path`, failing on the first bad frame
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Frame>, XyzError> {
    Reader::open(path)?.collect()
}

/// load only the first frame in the XYZ file at `path`
pub fn load_first(path: impl AsRef<Path>) -> Result<Frame, XyzError> {
    Reader::open(path)?.next().unwrap_or(Err(XyzError::Empty))
}

/// write `frames` to `path` as a concatenated XYZ file
pub fn write<'a>(
    path: impl AsRef<Path>,
    frames: impl IntoIterator<Item = &'a Frame>,
) -> std::io::Result<()> {
    use std::io::Write;
    let mut f = std::io::BufWriter::new(File::create(path)?);
    for frame in frames {
        write!(f, "{frame}")?;
    }
    f.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAJ: &str = "3
frame 0 xyz file generated by terachem
 H          0.0000000000        0.7574590974        0.5217905143
 O          0.0000000000        0.0000000000       -0.0657441568
 H          0.0000000000       -0.7574590974        0.5217905143
3
frame 1 xyz file generated by terachem
 H          0.0000000000        0.7600000000        0.5200000000
 O          0.0000000000        0.0000000000       -0.0650000000
 H          0.0000000000       -0.7600000000        0.5200000000
3
frame 2 xyz file generated by terachem
 H          0.0000000000        0.7600000000        0.5200000000
";

    fn reader(s: &str) -> impl Iterator<Item = Result<Frame, XyzError>> {
        Reader::new(s.lines().map(|l| Ok(l.to_owned())))
    }

    #[test]
    fn read_frames() {
        let got: Vec<_> = reader(TRAJ).collect();
        assert_eq!(got.len(), 3);
        let first = got[0].as_ref().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first.reported_index(), Some(0));
        assert_eq!(first.atoms[1], Atom::new(8, 0.0, 0.0, -0.0657441568));
        assert_eq!(got[1].as_ref().unwrap().reported_index(), Some(1));
        assert_eq!(
            got[2],
            Err(XyzError::Truncated {
                line: 11,
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn resync_after_junk() {
        let s = "garbage line
more garbage
1
comment
He 1.0 2.0 3.0
";
        let got: Vec<_> = reader(s).collect();
        assert_eq!(got.len(), 2);
        assert!(matches!(got[0], Err(XyzError::AtomCount { line: 1, .. })));
        assert_eq!(
            got[1],
            Ok(Frame::new("comment", vec![Atom::new(2, 1.0, 2.0, 3.0)]))
        );
    }

    #[test]
    fn huge_atom_count() {
        let s = "99999999999999999\ncomment\nH 0 0 0\n";
        let got: Vec<_> = reader(s).collect();
        assert_eq!(
            got,
            vec![Err(XyzError::Truncated {
                line: 1,
                expected: 99999999999999999,
                found: 1
            })]
        );
    }

    #[test]
    fn bad_atom_keeps_alignment() {
        let s = "1
first
Zz 1.0 2.0 3.0
1
second
H 1.0 2.0 3.0
";
        let got: Vec<_> = reader(s).collect();
        assert!(matches!(got[0], Err(XyzError::Atom { line: 3, .. })));
        assert_eq!(got[1].as_ref().unwrap().comment, "second");
    }

    #[test]
    fn display_round_trip() {
        let frame: Frame = TRAJ.parse().unwrap();
        let again: Frame = frame.to_string().parse().unwrap();
        assert_eq!(frame, again);
        assert_eq!(
            frame.to_string().lines().take(3).collect::<Vec<_>>(),
            vec![
                "3",
                "frame 0 xyz file generated by terachem",
                "H     0.0000000000    0.7574590974    0.5217905143",
            ]
        );
    }

    #[test]
    fn reported_index() {
        let frame = Frame::new("frame 17 xyz", vec![]);
        assert_eq!(frame.reported_index(), Some(17));
        assert_eq!(Frame::new("frame", vec![]).reported_index(), None);
        assert_eq!(Frame::new("a b", vec![]).reported_index(), None);
    }

    #[test]
    fn write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xyz");
        let frames: Vec<_> = reader(TRAJ).take(2).flatten().collect();
        write(&path, &frames).unwrap();
        assert_eq!(load(&path).unwrap(), frames);
        assert_eq!(load_first(&path).unwrap(), frames[0]);
        assert_eq!(
            load_first(dir.path().join("missing.xyz")),
            Err(XyzError::ReadFile(
                dir.path().join("missing.xyz").display().to_string(),
                std::io::ErrorKind::NotFound
            ))
        );
    }
}
