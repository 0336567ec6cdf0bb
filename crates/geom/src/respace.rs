//! Resampling of a path of frames at equal Cartesian arc length

use crate::{Frame, rmsd};

/// Resample `frames` so that consecutive frames are separated by at most
/// `spacing` of RMSD arc length, with all segments of equal length. The first
/// and last frames are always kept. Returns `None` if the frames do not all
/// have the same atoms or `spacing` is not positive.
pub fn respace(frames: &[Frame], spacing: f64) -> Option<Vec<Frame>> {
    if spacing <= 0.0 {
        return None;
    }
    let arc = arc_lengths(frames)?;
    let total = arc.last().copied().unwrap_or(0.0);
    let segments = (total / spacing).ceil().max(1.0) as usize;
    resample_arc(frames, &arc, segments + 1)
}

/// Resample `frames` into exactly `images` frames evenly spaced in RMSD arc
/// length
pub fn resample(frames: &[Frame], images: usize) -> Option<Vec<Frame>> {
    let arc = arc_lengths(frames)?;
    resample_arc(frames, &arc, images)
}

/// cumulative RMSD distance along `frames`, starting at 0
fn arc_lengths(frames: &[Frame]) -> Option<Vec<f64>> {
    let first = frames.first()?;
    let mut ret = Vec::with_capacity(frames.len());
    ret.push(0.0);
    let mut s = 0.0;
    for w in frames.windows(2) {
        if !same_atoms(first, &w[1]) {
            return None;
        }
        s += rmsd(&w[0].atoms, &w[1].atoms)?;
        ret.push(s);
    }
    Some(ret)
}

fn same_atoms(a: &Frame, b: &Frame) -> bool {
    a.len() == b.len()
        && a.atoms
            .iter()
            .zip(&b.atoms)
            .all(|(i, j)| i.atomic_number == j.atomic_number)
}

fn resample_arc(
    frames: &[Frame],
    arc: &[f64],
    images: usize,
) -> Option<Vec<Frame>> {
    let (first, last) = (frames.first()?, frames.last()?);
    let total = *arc.last()?;
    if images < 2 || frames.len() < 2 || total == 0.0 {
        return Some(vec![first.clone(), last.clone()]);
    }
    let mut ret = Vec::with_capacity(images);
    let mut seg = 0;
    for k in 0..images {
        let target = total * k as f64 / (images - 1) as f64;
        while seg + 2 < arc.len() && arc[seg + 1] < target {
            seg += 1;
        }
        let (a, b) = (&frames[seg], &frames[seg + 1]);
        let width = arc[seg + 1] - arc[seg];
        let t = if width > 0.0 {
            ((target - arc[seg]) / width).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let atoms = a
            .atoms
            .iter()
            .zip(&b.atoms)
            .map(|(&i, &j)| i + (j - i) * t)
            .collect();
        ret.push(Frame::new(format!("frame {k} respaced"), atoms));
    }
    Some(ret)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    use super::*;
    use crate::Atom;

    /// a single hydrogen atom moving along x
    fn line(xs: &[f64]) -> Vec<Frame> {
        xs.iter()
            .map(|&x| Frame::new("", vec![Atom::new(1, x, 0.0, 0.0)]))
            .collect()
    }

    fn xs(frames: &[Frame]) -> Vec<f64> {
        frames.iter().map(|f| f.atoms[0].x).collect()
    }

    #[test_case(0.5, &[0.0, 0.5, 1.0, 1.5, 2.0] ; "even")]
    #[test_case(0.75, &[0.0, 2.0 / 3.0, 4.0 / 3.0, 2.0] ; "rounded up")]
    #[test_case(10.0, &[0.0, 2.0] ; "coarse")]
    fn respace_line(spacing: f64, want: &[f64]) {
        let path = line(&[0.0, 0.2, 1.5, 2.0]);
        let got = xs(&respace(&path, spacing).unwrap());
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert_abs_diff_eq!(*g, *w, epsilon = 1e-12);
        }
    }

    #[test]
    fn resample_keeps_ends() {
        let path = line(&[1.0, 1.1, 3.0]);
        let got = xs(&resample(&path, 3).unwrap());
        assert_abs_diff_eq!(got[0], 1.0);
        assert_abs_diff_eq!(got[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(got[2], 3.0);
    }

    #[test]
    fn mismatched_atoms() {
        let mut path = line(&[0.0, 1.0]);
        path[1].atoms[0].atomic_number = 6;
        assert!(respace(&path, 0.1).is_none());
        assert!(respace(&line(&[0.0, 1.0]), 0.0).is_none());
    }
}
