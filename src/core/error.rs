use thiserror::Error;

use crate::pattern::ActivityPattern;

/// Rejected before any simulation work starts (spec: fail fast).
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("{sheet} sheet dimensions must be positive, got {width}x{height}")]
    EmptySheet {
        sheet: &'static str,
        width: usize,
        height: usize,
    },

    #[error("{pattern:?} needs a retinal sheet of at least {min_width}x{min_height}")]
    PatternNeedsLargerRetina {
        pattern: ActivityPattern,
        min_width: usize,
        min_height: usize,
    },

    #[error("{pattern:?} needs at least {needed} retinal neurons, got {cells}")]
    NotEnoughRetinalCells {
        pattern: ActivityPattern,
        needed: usize,
        cells: usize,
    },

    #[error("square polarity markers need a 2x2 anchor, but the {sheet} sheet is {width}x{height}")]
    PolarityAnchorTooSmall {
        sheet: &'static str,
        width: usize,
        height: usize,
    },

    #[error("polarity anchor at ({row}, {col}) does not fit a 2x2 block on the {sheet} sheet")]
    AnchorOutOfRange {
        sheet: &'static str,
        row: usize,
        col: usize,
    },

    #[error("initializer standard deviation must be finite and non-negative, got {sd}")]
    InvalidInitSd { sd: f32 },

    #[error("relaxation time step must be positive and finite, got {dt}")]
    InvalidTimeStep { dt: f32 },

    #[error("relaxation iteration guard must be positive")]
    ZeroIterationGuard,

    #[error("repeat count must be positive")]
    ZeroRepeats,
}

/// Failures surfaced while a run is in flight. The epoch driver records these
/// per repeat instead of tearing the whole batch down.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "relaxation did not converge within {steps} steps at epoch {epoch} \
         (last mean {last_mean}, last relative change {last_rel_change})"
    )]
    NonConvergence {
        epoch: usize,
        steps: usize,
        last_mean: f32,
        last_rel_change: f32,
    },

    #[error("tectal neuron {tectal} has an all-zero receptive field")]
    DegenerateReceptiveField { tectal: usize },
}
