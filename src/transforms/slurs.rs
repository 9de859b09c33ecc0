use crate::types::event::Event;
use crate::types::score::Part;

/// Forgets slur numbers; only start and stop remain.
pub fn transform(mut part: Part) -> Part {
    for event in part.events_mut() {
        if let Event::Note(note) = event {
            for slur in &mut note.slurs {
                slur.number = None;
            }
        }
    }
    part
}
