//! Hebbian synaptic update.
//!
//! After the tectal sheet settles, every sufficiently depolarized tectal
//! neuron strengthens its synapses from the retinal neurons that were active
//! this epoch, in proportion to its own thresholded activity. Row
//! renormalization runs on the epoch driver's cadence, not here.

use crate::relax::threshold;
use crate::synapses::SynapseMatrix;

/// Apply one epoch's weight update in place.
///
/// `activity` is the converged tectal grid; tectal neurons whose thresholded
/// activity is at or below `epsilon` are left unmodified this epoch, and
/// synapses outside `active` are never touched.
pub fn apply_hebbian(
    s: &mut SynapseMatrix,
    activity: &[f32],
    active: &[usize],
    theta: f32,
    epsilon: f32,
    learning_rate: f32,
) {
    let thresholded = threshold(activity, theta);
    for (t, &a) in thresholded.iter().enumerate() {
        if a > epsilon {
            for &r in active {
                *s.weight_mut(t, r) += learning_rate * a;
            }
        }
    }
}
