use std::{
    fmt::Display,
    ops::{Add, Sub},
    str::FromStr,
};

use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

use crate::Vec3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Atom {
    pub atomic_number: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.abs_diff_eq(other, Self::default_epsilon())
    }
}

impl AbsDiffEq for Atom {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        1e-8
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() < epsilon;
        self.atomic_number == other.atomic_number
            && close(self.x, other.x)
            && close(self.y, other.y)
            && close(self.z, other.z)
    }
}

impl Add<Vec3> for Atom {
    type Output = Atom;

    fn add(self, rhs: Vec3) -> Self::Output {
        Atom {
            x: self.x + rhs[0],
            y: self.y + rhs[1],
            z: self.z + rhs[2],
            ..self
        }
    }
}

/// the displacement vector pointing from `rhs` to `self`
impl Sub for Atom {
    type Output = Vec3;

    fn sub(self, rhs: Self) -> Self::Output {
        self.coord() - rhs.coord()
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:2} {:15.10} {:15.10} {:15.10}",
            self.label(),
            self.x,
            self.y,
            self.z
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomError {
    /// fewer than four fields on the line
    Fields(usize),
    Coord(String),
    Symbol(String),
}

impl Display for AtomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomError::Fields(n) => {
                write!(f, "expected at least 4 fields in atom line, found {n}")
            }
            AtomError::Coord(s) => {
                write!(f, "failed to parse coordinate `{s}` as f64")
            }
            AtomError::Symbol(s) => write!(f, "unknown atomic symbol `{s}`"),
        }
    }
}

impl std::error::Error for AtomError {}

impl FromStr for Atom {
    type Err = AtomError;

    /// parse an Atom from a line like
    ///  C 1.0 1.0 1.0
    /// any fields after the coordinates are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<_> = s.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(AtomError::Fields(fields.len()));
        }
        let mut coord = [0.0; 3];
        for (c, f) in coord.iter_mut().zip(&fields[1..4]) {
            *c = f.parse().map_err(|_| AtomError::Coord(f.to_string()))?;
        }
        let [x, y, z] = coord;
        Self::new_from_label(fields[0], x, y, z)
    }
}

pub const NUMBER_TO_SYMBOL: [&str; 87] = [
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg",
    "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn",
    "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
    "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta",
    "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At",
    "Rn",
];

fn symbol_to_number(s: &str) -> Option<usize> {
    NUMBER_TO_SYMBOL.iter().position(|&x| x == s)
}

fn titlecase(s: &str) -> String {
    let mut cs = s.chars();
    let Some(first) = cs.next() else {
        return String::new();
    };
    let mut ret = first.to_uppercase().to_string();
    ret.extend(cs.flat_map(char::to_lowercase));
    ret
}

impl Atom {
    pub fn new(atomic_number: usize, x: f64, y: f64, z: f64) -> Self {
        Self {
            atomic_number,
            x,
            y,
            z,
        }
    }

    /// construct an Atom from a case-insensitive element symbol
    pub fn new_from_label(
        atomic_symbol: &str,
        x: f64,
        y: f64,
        z: f64,
    ) -> Result<Self, AtomError> {
        let num = symbol_to_number(atomic_symbol)
            .or_else(|| symbol_to_number(&titlecase(atomic_symbol)))
            .ok_or_else(|| AtomError::Symbol(atomic_symbol.to_owned()))?;
        Ok(Self::new(num, x, y, z))
    }

    #[inline]
    pub const fn label(&self) -> &str {
        NUMBER_TO_SYMBOL[self.atomic_number]
    }

    pub fn coord(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// return a copy of `self` moved to `coord`
    pub fn with_coord(&self, coord: Vec3) -> Self {
        Self {
            x: coord[0],
            y: coord[1],
            z: coord[2],
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titlecase() {
        assert_eq!(super::titlecase("AL"), "Al");
        assert_eq!(super::titlecase("Al"), "Al");
        assert_eq!(super::titlecase("al"), "Al");
        assert_eq!(super::titlecase("H"), "H");
        assert_eq!(super::titlecase("h"), "H");
        assert_eq!(super::titlecase(""), "");
    }

    #[test]
    fn parse() {
        let got: Atom = "  c   1.0  -2.5 3.25   0.117".parse().unwrap();
        assert_eq!(got, Atom::new(6, 1.0, -2.5, 3.25));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("C 1.0 2.0".parse::<Atom>(), Err(AtomError::Fields(3)));
        assert_eq!(
            "C 1.0 two 3.0".parse::<Atom>(),
            Err(AtomError::Coord("two".into()))
        );
        assert_eq!(
            "Qq 1.0 2.0 3.0".parse::<Atom>(),
            Err(AtomError::Symbol("Qq".into()))
        );
    }

    #[test]
    fn display() {
        let atom = Atom::new(8, 0.0, -0.0657441568, 1.5);
        assert_eq!(
            atom.to_string(),
            "O     0.0000000000   -0.0657441568    1.5000000000"
        );
    }
}
