use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{GatherError, store::Resolved};

pub const ENERGIES: &str = "energies.txt";
pub const TEMPERATURES: &str = "temperatures.txt";
pub const ALL_COORS: &str = "all-coors.xyz";
pub const CHARGE_SPIN: &str = "charge-spin.txt";
pub const BOND_ORDERS: &str = "bond-orders.txt";

/// one energy per line
pub fn write_energies(
    w: &mut impl Write,
    frames: &[Resolved],
) -> std::io::Result<()> {
    for f in frames {
        writeln!(w, "{}", f.energy)?;
    }
    Ok(())
}

/// one temperature per line
pub fn write_temperatures(
    w: &mut impl Write,
    frames: &[Resolved],
) -> std::io::Result<()> {
    for f in frames {
        writeln!(w, "{}", f.temperature)?;
    }
    Ok(())
}

/// every complete frame as a concatenated XYZ file
pub fn write_coords<'a, 'b: 'a>(
    w: &mut impl Write,
    frames: impl IntoIterator<Item = &'a Resolved<'b>>,
) -> std::io::Result<()> {
    for f in frames {
        write!(w, "{}", f.snapshot.frame)?;
    }
    Ok(())
}

/// XYZ-shaped blocks with the Mulliken charge and spin of each atom in place
/// of its coordinates
pub fn write_charge_spin<'a, 'b: 'a>(
    w: &mut impl Write,
    frames: impl IntoIterator<Item = &'a Resolved<'b>>,
) -> std::io::Result<()> {
    for f in frames {
        let s = f.snapshot;
        writeln!(w, "{}", s.frame.len())?;
        writeln!(w, "{} : Mulliken Charge, Spin, 0", s.frame.comment)?;
        for ((atom, q), spin) in s
            .frame
            .atoms
            .iter()
            .zip(&s.annotation.charges)
            .zip(&s.annotation.spins)
        {
            let label = atom.label();
            writeln!(w, "{label:>2}    {q:15.10} {spin:15.10}    0")?;
        }
    }
    Ok(())
}

/// the bond-order block of every complete frame, unchanged
pub fn write_bond_orders<'a, 'b: 'a>(
    w: &mut impl Write,
    frames: impl IntoIterator<Item = &'a Resolved<'b>>,
) -> std::io::Result<()> {
    for f in frames {
        for line in &f.snapshot.annotation.bond_orders {
            writeln!(w, "{line}")?;
        }
    }
    Ok(())
}

fn create(
    dir: &Path,
    name: &str,
    f: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
) -> Result<(), GatherError> {
    let path = dir.join(name);
    let io = |e: std::io::Error| {
        GatherError::Io(path.display().to_string(), e.kind())
    };
    let mut w = BufWriter::new(File::create(&path).map_err(io)?);
    f(&mut w).and_then(|_| w.flush()).map_err(io)
}

/// Write the five output files into `dir`, returning the number of frames
/// left out of the per-atom files for having short charge or spin records
pub fn write_all(
    dir: &Path,
    frames: &[Resolved],
) -> Result<usize, GatherError> {
    let complete: Vec<&Resolved> =
        frames.iter().filter(|f| f.snapshot.is_complete()).collect();
    create(dir, ENERGIES, |w| write_energies(w, frames))?;
    create(dir, TEMPERATURES, |w| write_temperatures(w, frames))?;
    create(dir, ALL_COORS, |w| write_coords(w, complete.iter().copied()))?;
    create(dir, CHARGE_SPIN, |w| {
        write_charge_spin(w, complete.iter().copied())
    })?;
    create(dir, BOND_ORDERS, |w| {
        write_bond_orders(w, complete.iter().copied())
    })?;
    Ok(frames.len() - complete.len())
}

#[cfg(test)]
mod tests {
    use geom::{Atom, Frame};
    use insta::assert_snapshot;
    use terachem::Annotation;

    use super::*;
    use crate::store::Snapshot;

    fn snapshot() -> Snapshot {
        Snapshot::new(
            Frame::new(
                "frame 0 xyz file generated by terachem",
                vec![
                    Atom::new(8, 0.0, 0.0, 0.117),
                    Atom::new(1, 0.0, 0.757, -0.467),
                ],
            ),
            Annotation {
                charges: vec![-0.62, 0.31],
                spins: vec![0.0, 0.0],
                bond_orders: vec![
                    "1".to_owned(),
                    "bond orders".to_owned(),
                    "0 1 0.95".to_owned(),
                ],
            },
        )
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn scalars() {
        let s = snapshot();
        let frames = [
            Resolved {
                index: 0,
                energy: -76.0125,
                temperature: 0.0,
                snapshot: &s,
            },
            Resolved {
                index: 1,
                energy: -76.01,
                temperature: 298.15,
                snapshot: &s,
            },
        ];
        assert_snapshot!(output(|w| write_energies(w, &frames)), @r"
        -76.0125
        -76.01
        ");
        assert_snapshot!(output(|w| write_temperatures(w, &frames)), @r"
        0
        298.15
        ");
    }

    #[test]
    fn charge_spin() {
        let s = snapshot();
        let frames = [Resolved {
            index: 0,
            energy: 0.0,
            temperature: 0.0,
            snapshot: &s,
        }];
        assert_snapshot!(output(|w| write_charge_spin(w, &frames)), @r"
        2
        frame 0 xyz file generated by terachem : Mulliken Charge, Spin, 0
         O      -0.6200000000    0.0000000000    0
         H       0.3100000000    0.0000000000    0
        ");
        assert_snapshot!(output(|w| write_bond_orders(w, &frames)), @r"
        1
        bond orders
        0 1 0.95
        ");
    }

    #[test]
    fn undersized_frames_left_out() {
        let dir = tempfile::tempdir().unwrap();
        let good = snapshot();
        let mut short = snapshot();
        short.annotation.spins.clear();
        let frames = [
            Resolved {
                index: 0,
                energy: -1.0,
                temperature: 1.0,
                snapshot: &good,
            },
            Resolved {
                index: 1,
                energy: -2.0,
                temperature: 2.0,
                snapshot: &short,
            },
        ];
        let skipped = write_all(dir.path(), &frames).unwrap();
        assert_eq!(skipped, 1);
        let read = |name| std::fs::read_to_string(dir.path().join(name));
        assert_eq!(read(ENERGIES).unwrap().lines().count(), 2);
        assert_eq!(read(TEMPERATURES).unwrap().lines().count(), 2);
        let coords = geom::frame::load(dir.path().join(ALL_COORS)).unwrap();
        assert_eq!(coords.len(), 1);
        assert_eq!(read(BOND_ORDERS).unwrap().lines().count(), 3);
    }
}
