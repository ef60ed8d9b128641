//! The retinal-to-tectal synapse matrix.
//!
//! Dense row-major storage: row t holds the incoming weights of tectal neuron
//! t from every retinal neuron, which doubles as that neuron's receptive
//! field. The matrix is created once per run, mutated in place by every
//! epoch's plasticity step, and read out by the map metrics at run end.

use rand::Rng;
use rand_distr::{Distribution, Normal};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::SheetDims;

/// Where the 2x2 square polarity anchors sit on the two sheets.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Anchor {
    /// Both anchors at the top-left corner of their sheet.
    TopLeft,
    /// Independent random anchors, drawn so the 2x2 block always fits.
    Random,
    /// Explicit anchor coordinates (top-left cell of each 2x2 block).
    Fixed {
        retinal: (usize, usize),
        tectal: (usize, usize),
    },
}

/// Initialization-time symmetry breaking.
///
/// Without a polarity bias the map can form in any of the eight grid
/// orientations; the markers pin the orientation before the first epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PolarityMarkers {
    /// Strengthen the four synapses between a 2x2 retinal block and the
    /// matching 2x2 tectal block.
    Square { anchor: Anchor, strength: f32 },
    /// Bias every synapse by how close the two neurons sit in normalized
    /// sheet coordinates.
    Graded,
}

/// Dense (tectal x retinal) weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SynapseMatrix {
    tectum: SheetDims,
    retina: SheetDims,
    weights: Vec<f32>,
}

impl SynapseMatrix {
    /// Seed every synapse independently from Normal(mean, sd).
    ///
    /// Negative draws are permitted; with a large sd relative to the mean the
    /// matrix can start with negative weights, which the algorithm tolerates
    /// but the quality of the resulting map does not.
    pub fn init_normal(
        mean: f32,
        sd: f32,
        tectum: SheetDims,
        retina: SheetDims,
        rng: &mut impl Rng,
    ) -> Result<Self, ConfigError> {
        let normal = Normal::new(mean, sd).map_err(|_| ConfigError::InvalidInitSd { sd })?;
        let weights = (0..tectum.count() * retina.count())
            .map(|_| normal.sample(rng))
            .collect();
        Ok(Self {
            tectum,
            retina,
            weights,
        })
    }

    pub fn tectum(&self) -> SheetDims {
        self.tectum
    }

    pub fn retina(&self) -> SheetDims {
        self.retina
    }

    #[inline]
    pub fn weight(&self, tectal: usize, retinal: usize) -> f32 {
        self.weights[tectal * self.retina.count() + retinal]
    }

    #[inline]
    pub fn weight_mut(&mut self, tectal: usize, retinal: usize) -> &mut f32 {
        let cols = self.retina.count();
        &mut self.weights[tectal * cols + retinal]
    }

    /// Receptive field of one tectal neuron.
    pub fn row(&self, tectal: usize) -> &[f32] {
        let cols = self.retina.count();
        &self.weights[tectal * cols..(tectal + 1) * cols]
    }

    /// Apply the configured polarity markers in place.
    ///
    /// Anchor bounds are checked by `SimConfig::validate`; this only consumes
    /// the random source when the anchor mode asks for it.
    pub fn apply_polarity(&mut self, markers: PolarityMarkers, rng: &mut impl Rng) {
        match markers {
            PolarityMarkers::Square { anchor, strength } => {
                self.square_markers(anchor, strength, rng)
            }
            PolarityMarkers::Graded => self.graded_markers(),
        }
    }

    fn square_markers(&mut self, anchor: Anchor, strength: f32, rng: &mut impl Rng) {
        let ((r_row, r_col), (t_row, t_col)) = match anchor {
            Anchor::TopLeft => ((0, 0), (0, 0)),
            Anchor::Random => (
                random_anchor(self.retina, rng),
                random_anchor(self.tectum, rng),
            ),
            Anchor::Fixed { retinal, tectal } => (retinal, tectal),
        };

        // Each retinal marker strengthens only the synapse onto the tectal
        // marker in the same corner of the block.
        for (dr, dc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            let r = self.retina.linear_index(r_row + dr, r_col + dc);
            let t = self.tectum.linear_index(t_row + dr, t_col + dc);
            *self.weight_mut(t, r) *= strength;
        }
    }

    /// Dense O(T*R) pass: positions normalized by their sheet dimension,
    /// Euclidean distance normalized by the maximum possible separation
    /// (sqrt 2), and a linearly decaying boost of 5x at distance 0 down to 1x
    /// at distance 0.5. The factor depends on both indices jointly, so there
    /// is no cheaper formulation.
    fn graded_markers(&mut self) {
        let cols = self.retina.count();
        for t in 0..self.tectum.count() {
            let (t_row, t_col) = self.tectum.grid_coords(t);
            let ty = t_row as f32 / self.tectum.height as f32;
            let tx = t_col as f32 / self.tectum.width as f32;
            for r in 0..cols {
                let (r_row, r_col) = self.retina.grid_coords(r);
                let ry = r_row as f32 / self.retina.height as f32;
                let rx = r_col as f32 / self.retina.width as f32;

                let dy = ty - ry;
                let dx = tx - rx;
                let dist = (dy * dy + dx * dx).sqrt() / std::f32::consts::SQRT_2;
                if dist < 0.5 {
                    self.weights[t * cols + r] *= 5.0 - 8.0 * dist;
                }
            }
        }
    }

    /// Rescale every tectal row so its mean equals `target_mean`.
    ///
    /// Counters the unbounded growth of the Hebbian rule; the epoch driver
    /// decides the cadence. A row whose mean is exactly zero cannot be
    /// rescaled and is left untouched.
    pub fn normalize_rows(&mut self, target_mean: f32) {
        let cols = self.retina.count();
        for row in self.weights.chunks_mut(cols) {
            let mean = row.iter().sum::<f32>() / cols as f32;
            if mean == 0.0 {
                continue;
            }
            let scale = target_mean / mean;
            for w in row {
                *w *= scale;
            }
        }
    }

    /// Initial tectal activity for one epoch: per tectal neuron, the summed
    /// weight from every neuron in the activation set.
    pub fn drive(&self, active: &[usize]) -> Vec<f32> {
        let cols = self.retina.count();
        let mut h = vec![0.0; self.tectum.count()];
        for (t, out) in h.iter_mut().enumerate() {
            let row = &self.weights[t * cols..(t + 1) * cols];
            for &r in active {
                *out += row[r];
            }
        }
        h
    }
}

fn random_anchor(dims: SheetDims, rng: &mut impl Rng) -> (usize, usize) {
    (
        rng.gen_range(0..dims.height - 1),
        rng.gen_range(0..dims.width - 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn matrix(tectum: SheetDims, retina: SheetDims, seed: u64) -> SynapseMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        SynapseMatrix::init_normal(2.5, 0.14, tectum, retina, &mut rng).unwrap()
    }

    #[test]
    fn init_sample_mean_tracks_configured_mean() {
        let s = matrix(SheetDims::new(16, 16), SheetDims::new(16, 16), 1);
        let n = (16 * 16 * 16 * 16) as f32;
        let mean = (0..256)
            .flat_map(|t| s.row(t).iter().copied().collect::<Vec<_>>())
            .sum::<f32>()
            / n;
        assert!((mean - 2.5).abs() < 0.01, "sample mean {mean}");
        for t in 0..256 {
            assert!(s.row(t).iter().all(|w| w.is_finite()));
        }
    }

    #[test]
    fn init_rejects_negative_sd() {
        let mut rng = StdRng::seed_from_u64(1);
        let dims = SheetDims::new(4, 4);
        let err = SynapseMatrix::init_normal(2.5, -1.0, dims, dims, &mut rng);
        assert!(matches!(err, Err(ConfigError::InvalidInitSd { .. })));
    }

    #[test]
    fn square_markers_scale_exactly_four_synapses() {
        let dims = SheetDims::new(8, 8);
        let mut s = matrix(dims, dims, 2);
        let before = s.clone();

        let mut rng = StdRng::seed_from_u64(0);
        s.apply_polarity(
            PolarityMarkers::Square {
                anchor: Anchor::TopLeft,
                strength: 5.0,
            },
            &mut rng,
        );

        let mut scaled = 0;
        for t in 0..dims.count() {
            for r in 0..dims.count() {
                let old = before.weight(t, r);
                let new = s.weight(t, r);
                if new != old {
                    assert!((new - old * 5.0).abs() < 1e-5);
                    scaled += 1;
                }
            }
        }
        assert_eq!(scaled, 4);

        // The default anchor is the top-left 2x2 block of both sheets.
        for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            let t = dims.linear_index(row, col);
            let r = dims.linear_index(row, col);
            assert!((s.weight(t, r) - before.weight(t, r) * 5.0).abs() < 1e-5);
        }
    }

    #[test]
    fn random_square_markers_fit_the_sheet() {
        let tectum = SheetDims::new(5, 4);
        let retina = SheetDims::new(3, 6);
        for seed in 0..50 {
            let mut s = matrix(tectum, retina, seed);
            let before = s.clone();
            let mut rng = StdRng::seed_from_u64(seed);
            s.apply_polarity(
                PolarityMarkers::Square {
                    anchor: Anchor::Random,
                    strength: 5.0,
                },
                &mut rng,
            );
            let changed = (0..tectum.count())
                .flat_map(|t| (0..retina.count()).map(move |r| (t, r)))
                .filter(|&(t, r)| s.weight(t, r) != before.weight(t, r))
                .count();
            assert_eq!(changed, 4, "seed {seed}");
        }
    }

    #[test]
    fn graded_markers_scale_by_five_at_distance_zero() {
        let dims = SheetDims::new(8, 8);
        let mut s = matrix(dims, dims, 3);
        let before = s.clone();
        let mut rng = StdRng::seed_from_u64(0);
        s.apply_polarity(PolarityMarkers::Graded, &mut rng);

        // Same grid position on both sheets: normalized distance 0, factor 5.
        for (row, col) in [(0, 0), (3, 5), (7, 7)] {
            let t = dims.linear_index(row, col);
            let r = dims.linear_index(row, col);
            assert!((s.weight(t, r) - before.weight(t, r) * 5.0).abs() < 1e-4);
        }

        // Opposite corners: normalized distance near 1, no change.
        let t = dims.linear_index(0, 0);
        let r = dims.linear_index(7, 7);
        assert_eq!(s.weight(t, r), before.weight(t, r));
    }

    #[test]
    fn normalize_rows_restores_the_target_mean() {
        let dims = SheetDims::new(6, 6);
        let mut s = matrix(dims, dims, 4);
        // Perturb one row hard, as a long run of Hebbian updates would.
        for r in 0..dims.count() {
            *s.weight_mut(7, r) += 40.0;
        }
        s.normalize_rows(2.5);
        for t in 0..dims.count() {
            let mean = s.row(t).iter().sum::<f32>() / dims.count() as f32;
            assert!((mean - 2.5).abs() < 1e-4, "row {t} mean {mean}");
        }
    }

    #[test]
    fn drive_sums_weights_of_the_active_set() {
        let dims = SheetDims::new(4, 4);
        let s = matrix(dims, dims, 5);
        let active = [0usize, 5, 9];
        let h = s.drive(&active);
        assert_eq!(h.len(), dims.count());
        for t in 0..dims.count() {
            let expect: f32 = active.iter().map(|&r| s.weight(t, r)).sum();
            assert!((h[t] - expect).abs() < 1e-5);
        }
    }
}
