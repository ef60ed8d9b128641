//! # tectum
//!
//! Self-organized retinotopic map formation between a retinal and a tectal
//! neuron sheet, after Willshaw & von der Malsburg: Hebbian plasticity on a
//! dense synapse matrix, shaped by local excitatory/inhibitory lateral
//! dynamics on the tectal sheet.
//!
//! ## Quick Start
//!
//! ```
//! use tectum::prelude::*;
//!
//! let cfg = SimConfig {
//!     retina: SheetDims::new(4, 4),
//!     tectum: SheetDims::new(4, 4),
//!     epochs: 50,
//!     repeats: 1,
//!     seed: Some(7),
//!     ..SimConfig::default()
//! };
//!
//! let report = run(&cfg).unwrap();
//! assert_eq!(report.completed.len() + report.failures.len(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization support for configuration types
//! - `parallel`: run independent repeats on a rayon thread pool
//!
//! ## Modules
//!
//! - [`grid`]: sheet geometry
//! - [`pattern`]: retinal activation patterns
//! - [`synapses`]: weight matrix, initializer, polarity markers
//! - [`relax`]: tectal lateral-interaction relaxation
//! - [`plasticity`]: Hebbian weight update
//! - [`metrics`]: receptive-field centers and map quality
//! - [`sim`]: epoch driver and repeats

#[path = "core/error.rs"]
pub mod error;

#[path = "core/grid.rs"]
pub mod grid;

#[path = "core/pattern.rs"]
pub mod pattern;

#[path = "core/synapses.rs"]
pub mod synapses;

#[path = "core/relax.rs"]
pub mod relax;

#[path = "core/plasticity.rs"]
pub mod plasticity;

#[path = "core/metrics.rs"]
pub mod metrics;

#[path = "core/sim.rs"]
pub mod sim;

/// Prelude module for convenient imports.
///
/// ```
/// use tectum::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ConfigError, SimError};
    pub use crate::grid::SheetDims;
    pub use crate::metrics::{center_of_mass, quality, MapCoordinates};
    pub use crate::pattern::ActivityPattern;
    pub use crate::plasticity::apply_hebbian;
    pub use crate::relax::{relax, threshold, Converged, NonConvergence, RelaxationConfig};
    pub use crate::sim::{map_metrics, run, run_once, MapOutcome, RunReport, SimConfig};
    pub use crate::synapses::{Anchor, PolarityMarkers, SynapseMatrix};
}
