//! Retinal activation patterns.
//!
//! Each developmental epoch stimulates a small set of retinal neurons; which
//! set is drawn depends on the configured pattern. The correlated patterns
//! (`Pairs`, `Squares`, `Sweep`) drive map formation; `Singles`, `TwoSingles`
//! and `Strobe` are intentionally degenerate controls and are not expected to
//! produce an ordered map. `OccularDominance` alternates half-sheets to probe
//! column segregation.
//!
//! "Adjacent" always means Manhattan distance 1, chosen among the in-bounds
//! directions; neighbor choices clamp at the sheet edges, never wrap.

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::grid::SheetDims;

/// Retinal stimulation policy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActivityPattern {
    /// A random neuron plus one adjacent neighbor.
    Pairs,
    /// A 2x2 cluster anchored at a random neuron.
    Squares,
    /// Deterministic column/row sweep keyed by the epoch index.
    Sweep,
    /// Two disjoint adjacent pairs.
    TwoPairs,
    /// One uniform random neuron. Degenerate control.
    Singles,
    /// Two distinct uniform random neurons. Degenerate control.
    TwoSingles,
    /// The entire retinal sheet at once. Degenerate control.
    Strobe,
    /// Alternating left/right half-sheet by epoch parity.
    OccularDominance,
}

impl ActivityPattern {
    /// Draw the activation set for one epoch.
    ///
    /// Returns linear retinal indices, distinct within one call. The
    /// deterministic patterns (`Sweep`, `Strobe`, `OccularDominance`) ignore
    /// the random source.
    pub fn generate(
        &self,
        retina: SheetDims,
        epoch: usize,
        rng: &mut impl Rng,
    ) -> Vec<usize> {
        match self {
            ActivityPattern::Pairs => {
                let (a, b) = adjacent_pair(retina, rng);
                vec![a, b]
            }
            ActivityPattern::Squares => squares(retina, rng),
            ActivityPattern::Sweep => sweep(retina, epoch),
            ActivityPattern::TwoPairs => two_pairs(retina, rng),
            ActivityPattern::Singles => {
                vec![uniform_index(retina, rng)]
            }
            ActivityPattern::TwoSingles => two_singles(retina, rng),
            ActivityPattern::Strobe => (0..retina.count()).collect(),
            ActivityPattern::OccularDominance => occular_dominance(retina, epoch),
        }
    }
}

fn uniform_index(retina: SheetDims, rng: &mut impl Rng) -> usize {
    let row = rng.gen_range(0..retina.height);
    let col = rng.gen_range(0..retina.width);
    retina.linear_index(row, col)
}

/// A uniform neuron plus a Manhattan-distance-1 neighbor.
///
/// The neighbor row is drawn uniformly from the in-bounds subset of
/// {row-1, row, row+1}; if the row is unchanged the column must move, so the
/// pair is always distinct.
fn adjacent_pair(retina: SheetDims, rng: &mut impl Rng) -> (usize, usize) {
    let row = rng.gen_range(0..retina.height);
    let col = rng.gen_range(0..retina.width);

    let row2 = step_or_stay(row, retina.height, rng);
    let col2 = if row2 == row {
        step_sideways(col, retina.width, rng)
    } else {
        col
    };

    (
        retina.linear_index(row, col),
        retina.linear_index(row2, col2),
    )
}

/// Uniform choice among the in-bounds subset of {v-1, v, v+1}.
fn step_or_stay(v: usize, len: usize, rng: &mut impl Rng) -> usize {
    if v == 0 {
        [v, v + 1][rng.gen_range(0..2)]
    } else if v == len - 1 {
        [v, v - 1][rng.gen_range(0..2)]
    } else {
        [v - 1, v, v + 1][rng.gen_range(0..3)]
    }
}

/// A move of exactly one step, clamped inward at the edges.
fn step_sideways(v: usize, len: usize, rng: &mut impl Rng) -> usize {
    if v == 0 {
        v + 1
    } else if v == len - 1 {
        v - 1
    } else {
        [v - 1, v + 1][rng.gen_range(0..2)]
    }
}

/// A step of exactly one, reflected inward at the edges.
fn reflect_step(v: usize, len: usize, rng: &mut impl Rng) -> usize {
    if v == 0 {
        1
    } else if v == len - 1 {
        len - 2
    } else {
        [v - 1, v + 1][rng.gen_range(0..2)]
    }
}

/// Four neurons forming a 2x2 block around a uniform anchor.
fn squares(retina: SheetDims, rng: &mut impl Rng) -> Vec<usize> {
    let row = rng.gen_range(0..retina.height);
    let col = rng.gen_range(0..retina.width);
    let row2 = reflect_step(row, retina.height, rng);
    let col2 = reflect_step(col, retina.width, rng);

    vec![
        retina.linear_index(row, col),
        retina.linear_index(row2, col),
        retina.linear_index(row, col2),
        retina.linear_index(row2, col2),
    ]
}

/// Column k for k < width, then row (k - width); period width + height.
fn sweep(retina: SheetDims, epoch: usize) -> Vec<usize> {
    let k = epoch % (retina.width + retina.height);
    if k < retina.width {
        (0..retina.height)
            .map(|row| retina.linear_index(row, k))
            .collect()
    } else {
        let row = k - retina.width;
        (0..retina.width)
            .map(|col| retina.linear_index(row, col))
            .collect()
    }
}

/// Two adjacent pairs; the second pair is re-drawn until it shares no neuron
/// with the first. Validation guarantees the retina is large enough for a
/// disjoint second pair to exist.
fn two_pairs(retina: SheetDims, rng: &mut impl Rng) -> Vec<usize> {
    let (a, b) = adjacent_pair(retina, rng);
    loop {
        let (c, d) = adjacent_pair(retina, rng);
        if c != a && c != b && d != a && d != b {
            return vec![a, b, c, d];
        }
    }
}

fn two_singles(retina: SheetDims, rng: &mut impl Rng) -> Vec<usize> {
    let first = uniform_index(retina, rng);
    loop {
        let second = uniform_index(retina, rng);
        if second != first {
            return vec![first, second];
        }
    }
}

/// Even epochs activate columns [0, width/2), odd epochs [width/2, width),
/// in row-major order.
fn occular_dominance(retina: SheetDims, epoch: usize) -> Vec<usize> {
    let half = retina.width / 2;
    let cols = if epoch % 2 == 0 {
        0..half
    } else {
        half..retina.width
    };

    let mut out = Vec::with_capacity(cols.len() * retina.height);
    for row in 0..retina.height {
        for col in cols.clone() {
            out.push(retina.linear_index(row, col));
        }
    }
    out
}
