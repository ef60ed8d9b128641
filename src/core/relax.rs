//! Tectal lateral-interaction relaxation.
//!
//! Given the retinal drive H0, the tectal sheet settles under short-range
//! excitation, longer-range inhibition and membrane decay:
//!
//!   dH/dt = H0 + K * max(H - theta, 0) + alpha * H
//!
//! where K is a fixed 7x7 kernel over Manhattan distance (1 -> beta,
//! 2 -> gamma, 3 -> delta) with zero-fill boundaries. The loop integrates
//! with explicit Euler steps until the grid mean stops moving, or errors out
//! at the iteration guard: parameter sets where excitation dominates
//! inhibition never satisfy the convergence test.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::grid::SheetDims;

const KERNEL_RADIUS: i64 = 3;

/// Lateral-interaction and integration parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RelaxationConfig {
    /// Euler integration step.
    pub dt: f32,
    /// Excitation at Manhattan distance 1.
    pub beta: f32,
    /// Excitation at Manhattan distance 2.
    pub gamma: f32,
    /// Inhibition at Manhattan distance 3 (negative).
    pub delta: f32,
    /// Membrane decay coefficient (negative).
    pub alpha: f32,
    /// Firing threshold.
    pub theta: f32,
    /// Iteration guard: exceeding this is a `NonConvergence` failure, never a
    /// silent fallback.
    pub max_steps: usize,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            beta: 0.05,
            gamma: 0.025,
            delta: -0.06,
            alpha: -0.5,
            theta: 10.0,
            max_steps: 10_000,
        }
    }
}

/// A settled tectal sheet.
#[derive(Debug, Clone)]
pub struct Converged {
    /// Membrane depolarization per tectal neuron, row-major.
    pub activity: Vec<f32>,
    /// Iterations taken to settle.
    pub steps: usize,
    /// Relative mean change on the final iteration.
    pub last_rel_change: f32,
}

/// The iteration guard fired before the sheet settled.
#[derive(Debug, Clone)]
pub struct NonConvergence {
    pub steps: usize,
    pub last_mean: f32,
    pub last_rel_change: f32,
}

/// Elementwise `max(h - theta, 0)`.
pub fn threshold(h: &[f32], theta: f32) -> Vec<f32> {
    h.iter().map(|&v| (v - theta).max(0.0)).collect()
}

/// 7x7 lateral kernel indexed by Manhattan distance from the center.
fn lateral_kernel(cfg: &RelaxationConfig) -> [[f32; 7]; 7] {
    let mut k = [[0.0f32; 7]; 7];
    for dy in -KERNEL_RADIUS..=KERNEL_RADIUS {
        for dx in -KERNEL_RADIUS..=KERNEL_RADIUS {
            let tap = match dy.abs() + dx.abs() {
                1 => cfg.beta,
                2 => cfg.gamma,
                3 => cfg.delta,
                _ => 0.0,
            };
            k[(dy + KERNEL_RADIUS) as usize][(dx + KERNEL_RADIUS) as usize] = tap;
        }
    }
    k
}

/// Same-shape 2-D convolution with zero-fill boundaries (no wraparound, no
/// reflection). The kernel is symmetric, so correlation and convolution
/// coincide.
fn convolve_same(src: &[f32], dims: SheetDims, kernel: &[[f32; 7]; 7]) -> Vec<f32> {
    let w = dims.width as i64;
    let h = dims.height as i64;
    let mut out = vec![0.0; src.len()];

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for ky in -KERNEL_RADIUS..=KERNEL_RADIUS {
                let sy = y + ky;
                if sy < 0 || sy >= h {
                    continue;
                }
                for kx in -KERNEL_RADIUS..=KERNEL_RADIUS {
                    let sx = x + kx;
                    if sx < 0 || sx >= w {
                        continue;
                    }
                    acc += kernel[(ky + KERNEL_RADIUS) as usize][(kx + KERNEL_RADIUS) as usize]
                        * src[(sy * w + sx) as usize];
                }
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    out
}

fn grid_mean(h: &[f32]) -> f32 {
    h.iter().sum::<f32>() / h.len() as f32
}

/// Relax the tectal sheet from the retinal drive until the mean activity is
/// stable to within 0.5% between consecutive iterations.
///
/// The mean is taken over the full grid, zero cells included. Output is the
/// settled grid; nothing is retained for the next epoch.
pub fn relax(
    drive: &[f32],
    dims: SheetDims,
    cfg: &RelaxationConfig,
) -> Result<Converged, NonConvergence> {
    debug_assert_eq!(drive.len(), dims.count());

    let kernel = lateral_kernel(cfg);
    let mut h = drive.to_vec();
    let mut last_rel_change = f32::INFINITY;

    for step in 1..=cfg.max_steps {
        let mean_before = grid_mean(&h);

        let h_star = threshold(&h, cfg.theta);
        let lateral = convolve_same(&h_star, dims, &kernel);
        for i in 0..h.len() {
            let dh = drive[i] + lateral[i] + cfg.alpha * h[i];
            h[i] += cfg.dt * dh;
        }

        let mean_after = grid_mean(&h);
        let delta = (mean_after - mean_before).abs();
        last_rel_change = if mean_before == 0.0 {
            f32::INFINITY
        } else {
            delta / mean_before.abs()
        };
        tracing::trace!(step, mean_before, mean_after, "relaxation step");

        if delta < 0.005 * mean_before.abs() {
            return Ok(Converged {
                activity: h,
                steps: step,
                last_rel_change,
            });
        }
    }

    Err(NonConvergence {
        steps: cfg.max_steps,
        last_mean: grid_mean(&h),
        last_rel_change,
    })
}
