//! The merged record of a whole run: one entry per global frame index, with
//! every field optional until something has been read for it

use std::{collections::BTreeMap, fmt::Display};

use geom::Frame;
use serde::{Deserialize, Serialize};
use terachem::Annotation;

/// Coordinates together with the annotations read alongside them. These
/// always come from the same trajectory frame, so they are stored together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub frame: Frame,
    pub annotation: Annotation,
}

impl Snapshot {
    pub fn new(frame: Frame, annotation: Annotation) -> Self {
        Self { frame, annotation }
    }

    /// whether the charge and spin records cover every atom
    pub fn is_complete(&self) -> bool {
        let n = self.frame.len();
        self.annotation.charges.len() >= n && self.annotation.spins.len() >= n
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameRecord {
    pub energy: Option<f64>,
    pub temperature: Option<f64>,
    pub snapshot: Option<Snapshot>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Energy,
    Temperature,
    Snapshot,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Field::Energy => "energy",
                Field::Temperature => "temperature",
                Field::Snapshot => "coordinates",
            }
        )
    }
}

/// What to do with a frame index for which some field was never read
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// take the value of the previous frame, or of the first frame that has
    /// one for gaps at the very beginning
    #[default]
    Repeat,

    /// drop the frame
    Skip,

    /// stop with an error
    Fail,
}

impl Display for GapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GapPolicy::Repeat => "repeat",
                GapPolicy::Skip => "skip",
                GapPolicy::Fail => "fail",
            }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GapError {
    Missing { index: usize, field: Field },

    /// nothing was ever read for `field`, so there is nothing to repeat
    Unobserved(Field),
}

impl Display for GapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapError::Missing { index, field } => {
                write!(f, "no {field} recorded for frame {index}")
            }
            GapError::Unobserved(field) => {
                write!(f, "no {field} recorded for any frame")
            }
        }
    }
}

impl std::error::Error for GapError {}

/// A contiguous run of indices missing the same field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub field: Field,
    pub first: usize,
    pub last: usize,
}

/// A frame with every field filled in, ready to be written out
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved<'a> {
    pub index: usize,
    pub energy: f64,
    pub temperature: f64,
    pub snapshot: &'a Snapshot,
}

#[derive(Debug, Default)]
pub struct FrameStore {
    records: BTreeMap<usize, FrameRecord>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_index(&self) -> Option<usize> {
        self.records.keys().next().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.records.keys().next_back().copied()
    }

    /// the number of indices from the first to the last recorded frame,
    /// including any gaps
    pub fn span(&self) -> usize {
        match (self.first_index(), self.last_index()) {
            (Some(a), Some(b)) => b - a + 1,
            _ => 0,
        }
    }

    pub fn get(&self, index: usize) -> Option<&FrameRecord> {
        self.records.get(&index)
    }

    /// store `energy` at `index`, returning the value it replaced
    pub fn set_energy(&mut self, index: usize, energy: f64) -> Option<f64> {
        self.records.entry(index).or_default().energy.replace(energy)
    }

    pub fn set_temperature(&mut self, index: usize, temp: f64) -> Option<f64> {
        self.records
            .entry(index)
            .or_default()
            .temperature
            .replace(temp)
    }

    pub fn set_snapshot(
        &mut self,
        index: usize,
        snapshot: Snapshot,
    ) -> Option<Snapshot> {
        self.records
            .entry(index)
            .or_default()
            .snapshot
            .replace(snapshot)
    }

    /// RMSD between the coordinates at `index` and at `index - 1`, if both
    /// are present with the same number of atoms
    pub fn rmsd_to_previous(&self, index: usize) -> Option<f64> {
        let prev = index.checked_sub(1)?;
        let a = self.get(prev)?.snapshot.as_ref()?;
        let b = self.get(index)?.snapshot.as_ref()?;
        geom::rmsd(&a.frame.atoms, &b.frame.atoms)
    }

    fn field_present(&self, index: usize, field: Field) -> bool {
        let Some(rec) = self.get(index) else {
            return false;
        };
        match field {
            Field::Energy => rec.energy.is_some(),
            Field::Temperature => rec.temperature.is_some(),
            Field::Snapshot => rec.snapshot.is_some(),
        }
    }

    /// every run of missing values between the first and last recorded index,
    /// ordered by field and then by position
    pub fn gaps(&self) -> Vec<Gap> {
        let (Some(first), Some(last)) = (self.first_index(), self.last_index())
        else {
            return Vec::new();
        };
        let mut ret = Vec::new();
        for field in [Field::Energy, Field::Temperature, Field::Snapshot] {
            let mut start = None;
            for i in first..=last {
                match (self.field_present(i, field), start) {
                    (false, None) => start = Some(i),
                    (true, Some(s)) => {
                        ret.push(Gap {
                            field,
                            first: s,
                            last: i - 1,
                        });
                        start = None;
                    }
                    _ => {}
                }
            }
            if let Some(s) = start {
                ret.push(Gap {
                    field,
                    first: s,
                    last,
                });
            }
        }
        ret
    }

    /// Produce one fully-populated frame per index from the first to the last
    /// recorded index, filling or dropping incomplete frames according to
    /// `policy`
    pub fn resolve(
        &self,
        policy: GapPolicy,
    ) -> Result<Vec<Resolved<'_>>, GapError> {
        let (Some(first), Some(last)) = (self.first_index(), self.last_index())
        else {
            return Ok(Vec::new());
        };
        let mut ret = Vec::with_capacity(last - first + 1);
        match policy {
            GapPolicy::Repeat => {
                let first_of = |field| {
                    (first..=last)
                        .find(|&i| self.field_present(i, field))
                        .ok_or(GapError::Unobserved(field))
                };
                let mut energy = self.records[&first_of(Field::Energy)?]
                    .energy
                    .unwrap_or_default();
                let mut temperature = self.records
                    [&first_of(Field::Temperature)?]
                    .temperature
                    .unwrap_or_default();
                let mut snapshot = self.records[&first_of(Field::Snapshot)?]
                    .snapshot
                    .as_ref()
                    .ok_or(GapError::Unobserved(Field::Snapshot))?;
                for index in first..=last {
                    if let Some(rec) = self.get(index) {
                        energy = rec.energy.unwrap_or(energy);
                        temperature = rec.temperature.unwrap_or(temperature);
                        if let Some(s) = &rec.snapshot {
                            snapshot = s;
                        }
                    }
                    ret.push(Resolved {
                        index,
                        energy,
                        temperature,
                        snapshot,
                    });
                }
            }
            GapPolicy::Skip | GapPolicy::Fail => {
                for index in first..=last {
                    let rec = self.get(index);
                    let energy = rec.and_then(|r| r.energy);
                    let temperature = rec.and_then(|r| r.temperature);
                    let snapshot = rec.and_then(|r| r.snapshot.as_ref());
                    match (energy, temperature, snapshot) {
                        (Some(energy), Some(temperature), Some(snapshot)) => {
                            ret.push(Resolved {
                                index,
                                energy,
                                temperature,
                                snapshot,
                            })
                        }
                        _ if policy == GapPolicy::Skip => {}
                        _ => {
                            let field = if energy.is_none() {
                                Field::Energy
                            } else if temperature.is_none() {
                                Field::Temperature
                            } else {
                                Field::Snapshot
                            };
                            return Err(GapError::Missing { index, field });
                        }
                    }
                }
            }
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use geom::Atom;
    use test_case::test_case;

    use super::*;

    fn snap(x: f64) -> Snapshot {
        Snapshot::new(
            Frame::new(format!("frame {x}"), vec![Atom::new(1, x, 0.0, 0.0)]),
            Annotation {
                charges: vec![0.0],
                spins: vec![0.0],
                bond_orders: Vec::new(),
            },
        )
    }

    /// frames 0 and 3 are complete, 1 has only an energy, 2 is absent
    fn gappy() -> FrameStore {
        let mut store = FrameStore::new();
        for i in [0, 3] {
            store.set_energy(i, -(i as f64));
            store.set_temperature(i, 300.0 + i as f64);
            store.set_snapshot(i, snap(i as f64));
        }
        store.set_energy(1, -1.0);
        store
    }

    #[test]
    fn overwrite_returns_previous() {
        let mut store = FrameStore::new();
        assert_eq!(store.set_energy(4, 1.0), None);
        assert_eq!(store.set_energy(4, 2.0), Some(1.0));
        assert_eq!(store.get(4).unwrap().energy, Some(2.0));
        assert!(store.set_snapshot(4, snap(0.0)).is_none());
        assert_eq!(store.set_snapshot(4, snap(1.0)), Some(snap(0.0)));
    }

    #[test]
    fn gaps() {
        let store = gappy();
        assert_eq!(store.span(), 4);
        assert_eq!(
            store.gaps(),
            vec![
                Gap {
                    field: Field::Energy,
                    first: 2,
                    last: 2
                },
                Gap {
                    field: Field::Temperature,
                    first: 1,
                    last: 2
                },
                Gap {
                    field: Field::Snapshot,
                    first: 1,
                    last: 2
                },
            ]
        );
    }

    #[test]
    fn repeat_fills_from_previous() {
        let store = gappy();
        let got = store.resolve(GapPolicy::Repeat).unwrap();
        assert_eq!(got.len(), 4);
        let idx: Vec<_> = got.iter().map(|r| r.index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
        // frame 1 has its own energy but repeats the rest of frame 0
        assert_eq!(got[1].energy, -1.0);
        assert_eq!(got[1].temperature, 300.0);
        assert_eq!(got[1].snapshot, &snap(0.0));
        // frame 2 repeats frame 1
        assert_eq!(got[2].energy, -1.0);
        assert_eq!(got[2].snapshot, &snap(0.0));
        assert_eq!(got[3].temperature, 303.0);
    }

    #[test]
    fn repeat_backfills_leading_gap() {
        let mut store = FrameStore::new();
        store.set_energy(0, -5.0);
        store.set_temperature(1, 250.0);
        store.set_snapshot(1, snap(1.0));
        let got = store.resolve(GapPolicy::Repeat).unwrap();
        assert_eq!(got[0].temperature, 250.0);
        assert_eq!(got[0].snapshot, &snap(1.0));
        assert_eq!(got[1].energy, -5.0);
    }

    #[test]
    fn repeat_needs_something_to_repeat() {
        let mut store = FrameStore::new();
        store.set_energy(0, -5.0);
        store.set_snapshot(0, snap(1.0));
        assert_eq!(
            store.resolve(GapPolicy::Repeat),
            Err(GapError::Unobserved(Field::Temperature))
        );
    }

    #[test_case(GapPolicy::Skip, Ok(vec![0, 3]) ; "skip")]
    #[test_case(
        GapPolicy::Fail,
        Err(GapError::Missing { index: 1, field: Field::Temperature })
        ; "fail"
    )]
    fn strict_policies(policy: GapPolicy, want: Result<Vec<usize>, GapError>) {
        let store = gappy();
        let got = store
            .resolve(policy)
            .map(|v| v.iter().map(|r| r.index).collect::<Vec<_>>());
        assert_eq!(got, want);
    }

    #[test]
    fn rmsd_to_previous() {
        let mut store = FrameStore::new();
        store.set_snapshot(4, snap(0.0));
        store.set_snapshot(5, snap(0.3));
        assert!((store.rmsd_to_previous(5).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(store.rmsd_to_previous(4), None);
        assert_eq!(store.rmsd_to_previous(0), None);
    }

    #[test]
    fn empty_store() {
        let store = FrameStore::new();
        assert!(store.is_empty());
        assert_eq!(store.span(), 0);
        assert!(store.gaps().is_empty());
        assert!(store.resolve(GapPolicy::Fail).unwrap().is_empty());
    }
}
