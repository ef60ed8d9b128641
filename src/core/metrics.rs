//! Map readout: receptive-field centers and map quality.
//!
//! A tectal neuron's receptive field is its row of the synapse matrix laid
//! out on the retinal sheet; its preferred retinal position is the
//! intensity-weighted centroid of that field. Comparing the centroids against
//! the ideal linear map gives a single quality scalar.

use crate::error::SimError;
use crate::grid::SheetDims;
use crate::synapses::SynapseMatrix;

/// Receptive-field centers per tectal neuron, in retinal-sheet coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MapCoordinates {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

/// Centroid of every tectal neuron's receptive field.
///
/// A row summing to exactly zero has no defined centroid and is surfaced as
/// `DegenerateReceptiveField` rather than coerced to a default position.
pub fn center_of_mass(s: &SynapseMatrix) -> Result<MapCoordinates, SimError> {
    let retina = s.retina();
    let tectal_count = s.tectum().count();

    let mut x = Vec::with_capacity(tectal_count);
    let mut y = Vec::with_capacity(tectal_count);

    for t in 0..tectal_count {
        let mut total = 0.0;
        let mut moment_x = 0.0;
        let mut moment_y = 0.0;
        for (r, &w) in s.row(t).iter().enumerate() {
            let (row, col) = retina.grid_coords(r);
            total += w;
            moment_x += col as f32 * w;
            moment_y += row as f32 * w;
        }
        if total == 0.0 {
            return Err(SimError::DegenerateReceptiveField { tectal: t });
        }
        x.push(moment_x / total);
        y.push(moment_y / total);
    }

    Ok(MapCoordinates { x, y })
}

/// Score the map against the ideal linear projection.
///
/// The ideal map places the tectal neuron at normalized position p on the
/// retinal position p * (dimension - 1). Per-neuron Euclidean displacement is
/// normalized by sqrt(width + height) and averaged; the score is one minus
/// that mean, so a perfect map scores exactly 1 and a disordered map can drop
/// below zero.
pub fn quality(coords: &MapCoordinates, tectum: SheetDims, retina: SheetDims) -> f32 {
    let max_disp = ((retina.width + retina.height) as f32).sqrt();
    let count = tectum.count();

    let mut total = 0.0;
    for t in 0..count {
        let (t_row, t_col) = tectum.grid_coords(t);
        let dx = coords.x[t] - ideal_coord(t_col, tectum.width, retina.width);
        let dy = coords.y[t] - ideal_coord(t_row, tectum.height, retina.height);
        total += (dx * dx + dy * dy).sqrt() / max_disp;
    }

    1.0 - total / count as f32
}

/// Position of tectal cell i (of n) under the ideal linear map onto a retinal
/// axis of the given dimension.
fn ideal_coord(i: usize, n: usize, dim: usize) -> f32 {
    if n <= 1 {
        return 0.0;
    }
    i as f32 * (dim - 1) as f32 / (n - 1) as f32
}
