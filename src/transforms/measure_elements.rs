use crate::transforms::PrunePolicy;
use crate::types::event::Event;
use crate::types::score::Part;

fn dropped(event: &Event, policy: &PrunePolicy) -> bool {
    match event {
        Event::Attributes(_) => policy.drop_measure_attributes,
        Event::Print(_) => policy.drop_print_layout,
        Event::Direction(_) => policy.drop_directions,
        Event::Barline(_) => policy.drop_barlines,
        Event::Harmony(_) => policy.drop_harmony,
        Event::Note(_) | Event::Rest(_) | Event::Backup(_) | Event::Forward(_) => false,
    }
}

/// Removes the header events the policy drops.
pub fn transform(mut part: Part, policy: &PrunePolicy) -> Part {
    for measure in &mut part.measures {
        measure.header.retain(|event| !dropped(event, policy));
    }
    part
}
