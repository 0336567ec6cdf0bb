//! Atoms, XYZ frames and the handful of geometric comparisons needed to line up
//! and resample molecular-dynamics trajectories

pub mod atom;
pub mod frame;
pub mod respace;

pub use atom::{Atom, AtomError};
pub use frame::{Frame, Reader, XyzError};

pub type Vec3 = nalgebra::Vector3<f64>;

/// The largest absolute difference between any pair of corresponding
/// coordinates in `a` and `b`. Returns `None` if the atom counts differ.
pub fn max_deviation(a: &[Atom], b: &[Atom]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    Some(
        a.iter()
            .zip(b)
            .map(|(&i, &j)| (i - j).abs().max())
            .fold(0.0, f64::max),
    )
}

/// Root-mean-square displacement between `a` and `b` without any alignment,
/// `‖a - b‖ / √N`. Returns `None` if the atom counts differ.
pub fn rmsd(a: &[Atom], b: &[Atom]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    if a.is_empty() {
        return Some(0.0);
    }
    let sum: f64 = a.iter().zip(b).map(|(&i, &j)| (i - j).norm_squared()).sum();
    Some((sum / a.len() as f64).sqrt())
}
