//! The epoch driver.
//!
//! One developmental run is: seed the synapse matrix, apply polarity markers,
//! then loop epochs of stimulate -> relax -> Hebbian update, renormalizing
//! rows on a fixed cadence. Repeated runs are independent (fresh matrix, own
//! random stream) and only exist for statistics; within a run the epoch
//! sequence is strictly ordered because each epoch reads the weights the
//! previous one wrote.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimError};
use crate::grid::SheetDims;
use crate::metrics::{center_of_mass, quality, MapCoordinates};
use crate::pattern::ActivityPattern;
use crate::plasticity::apply_hebbian;
use crate::relax::{relax, RelaxationConfig};
use crate::synapses::{Anchor, PolarityMarkers, SynapseMatrix};

/// Full configuration bundle for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimConfig {
    pub retina: SheetDims,
    pub tectum: SheetDims,

    /// Mean of the normal distribution seeding the weights; also the target
    /// row mean for renormalization.
    pub init_mean: f32,
    pub init_sd: f32,

    pub polarity: PolarityMarkers,
    pub pattern: ActivityPattern,
    pub relaxation: RelaxationConfig,

    /// Hebbian modification rate (h).
    pub learning_rate: f32,
    /// Modification threshold (epsilon): tectal neurons at or below this
    /// post-threshold activity skip the weight update.
    pub modification_threshold: f32,

    /// Developmental epochs per run.
    pub epochs: usize,
    /// Independent runs for statistics.
    pub repeats: usize,
    /// Renormalize rows every this many epochs; 0 disables renormalization.
    pub normalize_every: usize,

    /// Fixed seed for reproducible runs; each repeat derives its own stream.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            retina: SheetDims::new(8, 8),
            tectum: SheetDims::new(10, 10),
            init_mean: 2.5,
            init_sd: 0.14,
            polarity: PolarityMarkers::Square {
                anchor: Anchor::TopLeft,
                strength: 5.0,
            },
            pattern: ActivityPattern::Pairs,
            relaxation: RelaxationConfig::default(),
            learning_rate: 0.0008,
            modification_threshold: 2.0,
            epochs: 2000,
            repeats: 1,
            normalize_every: 100,
            seed: None,
        }
    }
}

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct MapOutcome {
    pub weights: SynapseMatrix,
    pub coords: MapCoordinates,
    pub quality: f32,
}

/// Batch result across repeats. Failed repeats are recorded, not discarded.
#[derive(Debug)]
pub struct RunReport {
    pub completed: Vec<MapOutcome>,
    pub failures: Vec<(usize, SimError)>,
}

impl RunReport {
    pub fn qualities(&self) -> Vec<f32> {
        self.completed.iter().map(|o| o.quality).collect()
    }

    pub fn mean_quality(&self) -> Option<f32> {
        if self.completed.is_empty() {
            return None;
        }
        Some(self.qualities().iter().sum::<f32>() / self.completed.len() as f32)
    }

    pub fn std_quality(&self) -> Option<f32> {
        let mean = self.mean_quality()?;
        let n = self.completed.len() as f32;
        let var = self
            .qualities()
            .iter()
            .map(|q| (q - mean) * (q - mean))
            .sum::<f32>()
            / n;
        Some(var.sqrt())
    }
}

impl SimConfig {
    /// Fail fast on configurations that cannot produce a well-defined run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (sheet, dims) in [("retinal", self.retina), ("tectal", self.tectum)] {
            if dims.width == 0 || dims.height == 0 {
                return Err(ConfigError::EmptySheet {
                    sheet,
                    width: dims.width,
                    height: dims.height,
                });
            }
        }

        match self.pattern {
            ActivityPattern::Pairs | ActivityPattern::Squares | ActivityPattern::TwoPairs => {
                if self.retina.width < 2 || self.retina.height < 2 {
                    return Err(ConfigError::PatternNeedsLargerRetina {
                        pattern: self.pattern,
                        min_width: 2,
                        min_height: 2,
                    });
                }
                // A disjoint second adjacent pair always exists from six
                // cells up; on a 2x2 sheet the rejection loop can never exit.
                if self.pattern == ActivityPattern::TwoPairs && self.retina.count() < 6 {
                    return Err(ConfigError::NotEnoughRetinalCells {
                        pattern: self.pattern,
                        needed: 6,
                        cells: self.retina.count(),
                    });
                }
            }
            ActivityPattern::TwoSingles => {
                if self.retina.count() < 2 {
                    return Err(ConfigError::NotEnoughRetinalCells {
                        pattern: self.pattern,
                        needed: 2,
                        cells: self.retina.count(),
                    });
                }
            }
            ActivityPattern::OccularDominance => {
                if self.retina.width < 2 {
                    return Err(ConfigError::PatternNeedsLargerRetina {
                        pattern: self.pattern,
                        min_width: 2,
                        min_height: 1,
                    });
                }
            }
            _ => {}
        }

        if let PolarityMarkers::Square { anchor, .. } = self.polarity {
            for (sheet, dims) in [("retinal", self.retina), ("tectal", self.tectum)] {
                if dims.width < 2 || dims.height < 2 {
                    return Err(ConfigError::PolarityAnchorTooSmall {
                        sheet,
                        width: dims.width,
                        height: dims.height,
                    });
                }
            }
            if let Anchor::Fixed { retinal, tectal } = anchor {
                for (sheet, dims, (row, col)) in [
                    ("retinal", self.retina, retinal),
                    ("tectal", self.tectum, tectal),
                ] {
                    if row + 2 > dims.height || col + 2 > dims.width {
                        return Err(ConfigError::AnchorOutOfRange { sheet, row, col });
                    }
                }
            }
        }

        if !self.init_sd.is_finite() || self.init_sd < 0.0 {
            return Err(ConfigError::InvalidInitSd { sd: self.init_sd });
        }
        if !self.relaxation.dt.is_finite() || self.relaxation.dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep {
                dt: self.relaxation.dt,
            });
        }
        if self.relaxation.max_steps == 0 {
            return Err(ConfigError::ZeroIterationGuard);
        }
        if self.repeats == 0 {
            return Err(ConfigError::ZeroRepeats);
        }

        Ok(())
    }

    fn rng_for_repeat(&self, repeat: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(repeat as u64)),
            None => StdRng::from_entropy(),
        }
    }
}

/// One full developmental run with the given random stream.
pub fn run_once(cfg: &SimConfig, rng: &mut StdRng) -> Result<MapOutcome, SimError> {
    let mut s = SynapseMatrix::init_normal(cfg.init_mean, cfg.init_sd, cfg.tectum, cfg.retina, rng)?;
    s.apply_polarity(cfg.polarity, rng);

    for epoch in 0..cfg.epochs {
        let active = cfg.pattern.generate(cfg.retina, epoch, rng);
        let drive = s.drive(&active);

        let converged = relax(&drive, cfg.tectum, &cfg.relaxation).map_err(|nc| {
            SimError::NonConvergence {
                epoch,
                steps: nc.steps,
                last_mean: nc.last_mean,
                last_rel_change: nc.last_rel_change,
            }
        })?;

        apply_hebbian(
            &mut s,
            &converged.activity,
            &active,
            cfg.relaxation.theta,
            cfg.modification_threshold,
            cfg.learning_rate,
        );

        if cfg.normalize_every > 0 && (epoch + 1) % cfg.normalize_every == 0 {
            s.normalize_rows(cfg.init_mean);
        }

        tracing::trace!(epoch, relax_steps = converged.steps, "epoch complete");
    }

    let (coords, q) = map_metrics(&s)?;
    Ok(MapOutcome {
        weights: s,
        coords,
        quality: q,
    })
}

/// Map coordinates and quality for an existing matrix, independent of a full
/// run (diagnostics, fixtures).
pub fn map_metrics(s: &SynapseMatrix) -> Result<(MapCoordinates, f32), SimError> {
    let coords = center_of_mass(s)?;
    let q = quality(&coords, s.tectum(), s.retina());
    Ok((coords, q))
}

/// Validate once, then execute all repeats.
///
/// Repeats are independent and may run on a thread pool (`parallel` feature);
/// a repeat that fails mid-run is recorded in the report and the remaining
/// repeats still execute.
pub fn run(cfg: &SimConfig) -> Result<RunReport, ConfigError> {
    cfg.validate()?;

    let mut report = RunReport {
        completed: Vec::with_capacity(cfg.repeats),
        failures: Vec::new(),
    };

    for (repeat, result) in run_repeats(cfg) {
        match result {
            Ok(outcome) => {
                tracing::debug!(repeat, quality = outcome.quality, "repeat complete");
                report.completed.push(outcome);
            }
            Err(err) => {
                tracing::warn!(repeat, error = %err, "repeat failed");
                report.failures.push((repeat, err));
            }
        }
    }

    Ok(report)
}

#[cfg(not(feature = "parallel"))]
fn run_repeats(cfg: &SimConfig) -> Vec<(usize, Result<MapOutcome, SimError>)> {
    (0..cfg.repeats)
        .map(|repeat| {
            let mut rng = cfg.rng_for_repeat(repeat);
            (repeat, run_once(cfg, &mut rng))
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn run_repeats(cfg: &SimConfig) -> Vec<(usize, Result<MapOutcome, SimError>)> {
    (0..cfg.repeats)
        .into_par_iter()
        .map(|repeat| {
            let mut rng = cfg.rng_for_repeat(repeat);
            (repeat, run_once(cfg, &mut rng))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        SimConfig {
            retina: SheetDims::new(4, 4),
            tectum: SheetDims::new(4, 4),
            epochs: 60,
            repeats: 1,
            normalize_every: 20,
            seed: Some(99),
            ..SimConfig::default()
        }
    }

    #[test]
    fn validate_rejects_empty_sheets() {
        let cfg = SimConfig {
            retina: SheetDims::new(0, 8),
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::EmptySheet { sheet: "retinal", .. })
        ));
    }

    #[test]
    fn validate_rejects_pairs_on_a_thin_retina() {
        let cfg = SimConfig {
            retina: SheetDims::new(1, 8),
            polarity: PolarityMarkers::Graded,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PatternNeedsLargerRetina { .. })
        ));
    }

    #[test]
    fn validate_rejects_two_pairs_on_a_two_by_two_retina() {
        let cfg = SimConfig {
            retina: SheetDims::new(2, 2),
            pattern: ActivityPattern::TwoPairs,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotEnoughRetinalCells { needed: 6, .. })
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_fixed_anchor() {
        let cfg = SimConfig {
            polarity: PolarityMarkers::Square {
                anchor: Anchor::Fixed {
                    retinal: (7, 0),
                    tectal: (0, 0),
                },
                strength: 5.0,
            },
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::AnchorOutOfRange { sheet: "retinal", row: 7, col: 0 })
        ));
    }

    #[test]
    fn validate_rejects_zero_iteration_guard() {
        let cfg = SimConfig {
            relaxation: RelaxationConfig {
                max_steps: 0,
                ..RelaxationConfig::default()
            },
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroIterationGuard)
        ));
    }

    #[test]
    fn validate_accepts_the_default_config() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn fixed_seed_reproduces_weights_and_quality_bit_for_bit() {
        let cfg = small_config();

        let a = run(&cfg).unwrap();
        let b = run(&cfg).unwrap();
        assert_eq!(a.failures.len(), 0);
        assert_eq!(b.failures.len(), 0);

        let (wa, wb) = (&a.completed[0].weights, &b.completed[0].weights);
        for t in 0..cfg.tectum.count() {
            for (x, y) in wa.row(t).iter().zip(wb.row(t)) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
        assert_eq!(
            a.completed[0].quality.to_bits(),
            b.completed[0].quality.to_bits()
        );
    }

    #[test]
    fn repeats_use_distinct_random_streams() {
        let cfg = SimConfig {
            repeats: 2,
            ..small_config()
        };
        let report = run(&cfg).unwrap();
        assert_eq!(report.completed.len(), 2);
        let (a, b) = (&report.completed[0].weights, &report.completed[1].weights);
        assert_ne!(a.row(0), b.row(0));
    }

    #[test]
    fn non_convergent_repeat_is_recorded_not_fatal() {
        let cfg = SimConfig {
            relaxation: RelaxationConfig {
                beta: 2.0,
                gamma: 1.0,
                delta: 0.0,
                theta: 0.5,
                alpha: 0.0,
                max_steps: 50,
                ..RelaxationConfig::default()
            },
            epochs: 5,
            repeats: 2,
            seed: Some(3),
            ..SimConfig::default()
        };

        let report = run(&cfg).unwrap();
        assert!(report.completed.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report.failures[0].1,
            SimError::NonConvergence { .. }
        ));
        assert!(report.mean_quality().is_none());
    }

    #[test]
    fn epochs_mutate_the_weights_and_keep_the_map_readable() {
        let baseline = SimConfig {
            epochs: 0,
            ..small_config()
        };
        let trained = SimConfig {
            epochs: 400,
            ..small_config()
        };

        let before = run(&baseline).unwrap();
        let after = run(&trained).unwrap();
        assert_eq!(before.failures.len(), 0);
        assert_eq!(after.failures.len(), 0);

        // An untrained map has every receptive-field center near the middle
        // of the retinal sheet: mediocre but well-defined quality.
        let untrained_q = before.completed[0].quality;
        assert!(untrained_q > 0.2 && untrained_q < 0.8, "quality {untrained_q}");

        // Training must actually move weight onto the stimulated synapses.
        let (wa, wb) = (&before.completed[0].weights, &after.completed[0].weights);
        assert_ne!(wa, wb);
        assert!(after.completed[0].quality.is_finite());
    }

    #[test]
    fn map_metrics_is_usable_without_a_run() {
        let report = run(&small_config()).unwrap();
        let outcome = &report.completed[0];
        let (coords, q) = map_metrics(&outcome.weights).unwrap();
        assert_eq!(coords, outcome.coords);
        assert_eq!(q, outcome.quality);
    }
}
