pub mod duration_detail;
pub mod fractional;
pub mod measure_elements;
pub mod slurs;
pub mod time_modification;
pub mod tremolo;

use crate::types::score::Part;
use tracing::debug;

pub use fractional::transform as to_fractional;

/// Which details `prune` removes. Every flag left false leaves its detail untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrunePolicy {
    pub drop_duration_detail: bool,
    /// Clears type and dots that do not spell the exact duration.
    pub drop_misspelled_types: bool,
    pub drop_measure_attributes: bool,
    pub drop_print_layout: bool,
    pub drop_slur_numbering: bool,
    pub drop_directions: bool,
    pub drop_barlines: bool,
    pub drop_harmony: bool,
    pub reduce_time_modification: bool,
    pub drop_tremolo_count: bool,
}

impl PrunePolicy {
    /// The policy both trees go through before they are scored.
    pub fn evaluation() -> Self {
        Self {
            drop_duration_detail: false,
            drop_misspelled_types: true,
            drop_measure_attributes: false,
            drop_print_layout: true,
            drop_slur_numbering: true,
            drop_directions: true,
            drop_barlines: true,
            drop_harmony: true,
            reduce_time_modification: true,
            drop_tremolo_count: false,
        }
    }

    /// Removes everything the token encoding cannot carry.
    pub fn representable() -> Self {
        Self {
            drop_duration_detail: true,
            drop_tremolo_count: true,
            ..Self::evaluation()
        }
    }
}

pub fn prune(part: Part, policy: &PrunePolicy) -> Part {
    debug!("Pruning {} measures with {:?}", part.measures.len(), policy);

    let mut current = part;

    current = measure_elements::transform(current, policy);

    if policy.drop_duration_detail {
        current = duration_detail::transform(current);
    } else if policy.drop_misspelled_types {
        current = duration_detail::drop_misspelled(current);
    }

    if policy.drop_slur_numbering {
        current = slurs::transform(current);
    }

    if policy.reduce_time_modification {
        current = time_modification::transform(current);
    }

    if policy.drop_tremolo_count {
        current = tremolo::transform(current);
    }

    current
}
