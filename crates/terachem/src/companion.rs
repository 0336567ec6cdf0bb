use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{ParseError, read_error};

/// the block written for a frame when there is no bond-order file
pub const NO_BOND_ORDERS: [&str; 2] = ["0", "No bond orders in this frame"];

/// File names of the annotation files TeraChem writes next to a trajectory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionNames {
    pub charge: String,
    pub spin: String,
    pub bond_order: String,
}

impl Default for CompanionNames {
    fn default() -> Self {
        Self {
            charge: "charge.xls".to_owned(),
            spin: "spin.xls".to_owned(),
            bond_order: "bond_order.list".to_owned(),
        }
    }
}

/// Per-atom data accompanying one trajectory frame
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Mulliken charges, one per atom
    pub charges: Vec<f64>,

    /// Mulliken spin densities, one per atom
    pub spins: Vec<f64>,

    /// the raw bond-order block: a count line, a comment line, and `count`
    /// entries
    pub bond_orders: Vec<String>,
}

struct Source {
    name: String,
    lines: Lines<BufReader<File>>,
    line: usize,
}

impl Source {
    /// open `path` if it exists. the outer `Result` is for files that exist
    /// but cannot be read
    fn open(path: &Path) -> Result<Option<Self>, ParseError> {
        if !path.exists() {
            return Ok(None);
        }
        let f = File::open(path).map_err(|e| read_error(path, e))?;
        Ok(Some(Self {
            name: path.display().to_string(),
            lines: BufReader::new(f).lines(),
            line: 0,
        }))
    }

    /// the next line, or `None` at the end of the file or on a read error
    fn next_line(&mut self) -> Option<String> {
        let l = self.lines.next()?.ok()?;
        self.line += 1;
        Some(l)
    }
}

/// Readers for the charge, spin, and bond-order files next to a trajectory,
/// advanced one frame at a time in step with the trajectory itself
pub struct Companions {
    charge: Option<Source>,
    spin: Option<Source>,
    bond_order: Option<Source>,

    /// lines that failed to parse. The affected frame gets an empty vector,
    /// which is later treated as an undersized record
    pub errors: Vec<ParseError>,
}

impl Companions {
    /// Open whichever companion files exist in `dir`. The charge and spin
    /// tables start with a header line, which is discarded here.
    pub fn open(
        dir: impl AsRef<Path>,
        names: &CompanionNames,
    ) -> Result<Self, ParseError> {
        let dir = dir.as_ref();
        let mut charge = Source::open(&dir.join(&names.charge))?;
        let mut spin = Source::open(&dir.join(&names.spin))?;
        let bond_order = Source::open(&dir.join(&names.bond_order))?;
        for table in [&mut charge, &mut spin].into_iter().flatten() {
            table.next_line();
        }
        debug!(
            "companions in {}: charge={} spin={} bond_order={}",
            dir.display(),
            charge.is_some(),
            spin.is_some(),
            bond_order.is_some()
        );
        Ok(Self {
            charge,
            spin,
            bond_order,
            errors: Vec::new(),
        })
    }

    /// Read the annotation for the next frame, which has `natoms` atoms.
    /// Missing charge or spin files give zeros for every atom, and a missing
    /// bond-order file gives [NO_BOND_ORDERS].
    pub fn next_frame(&mut self, natoms: usize) -> Annotation {
        let charges = match &mut self.charge {
            Some(src) => Self::table_row(src, &mut self.errors),
            None => vec![0.0; natoms],
        };
        let spins = match &mut self.spin {
            Some(src) => Self::table_row(src, &mut self.errors),
            None => vec![0.0; natoms],
        };
        let bond_orders = self.bond_order_block();
        Annotation {
            charges,
            spins,
            bond_orders,
        }
    }

    fn table_row(src: &mut Source, errors: &mut Vec<ParseError>) -> Vec<f64> {
        let Some(line) = src.next_line() else {
            return Vec::new();
        };
        let row: Result<Vec<f64>, _> =
            line.split_whitespace().map(str::parse).collect();
        row.unwrap_or_else(|_| {
            errors.push(ParseError::Companion {
                file: src.name.clone(),
                line: src.line,
            });
            Vec::new()
        })
    }

    fn bond_order_block(&mut self) -> Vec<String> {
        let default = || NO_BOND_ORDERS.map(String::from).to_vec();
        let Some(src) = &mut self.bond_order else {
            return default();
        };
        let Some(count_line) = src.next_line() else {
            return default();
        };
        let Ok(count) = count_line.trim().parse::<usize>() else {
            self.errors.push(ParseError::BondOrderCount {
                file: src.name.clone(),
                line: src.line,
            });
            // without a count there is no telling where the next block
            // starts, so stop reading this file
            self.bond_order = None;
            return default();
        };
        let mut block = vec![count_line];
        // the comment line and then the entries. the count is untrusted, so
        // reading stops at the end of the file
        for _ in 0..=count {
            match src.next_line() {
                Some(l) => block.push(l),
                None => break,
            }
        }
        block
    }
}
