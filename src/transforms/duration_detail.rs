use crate::types::duration::{Duration, NoteType, TimeModification, type_spells_duration};
use crate::types::event::Event;
use crate::types::score::Part;

/// Clears note type and dots, keeping the exact duration.
pub fn transform(mut part: Part) -> Part {
    for event in part.events_mut() {
        match event {
            Event::Note(note) => {
                note.note_type = None;
                note.dots = 0;
            }
            Event::Rest(rest) => {
                rest.note_type = None;
                rest.dots = 0;
            }
            _ => {}
        }
    }
    part
}

fn clear_if_misspelled(
    note_type: &mut Option<NoteType>,
    dots: &mut u8,
    duration: &Duration,
    time_modification: Option<&TimeModification>,
    grace: bool,
) {
    let Some(exact) = duration.exact() else {
        return;
    };
    if note_type.is_some_and(|t| !type_spells_duration(t, *dots, exact, time_modification, grace)) {
        *note_type = None;
        *dots = 0;
    }
}

/// Clears note type and dots where they disagree with the exact duration.
pub fn drop_misspelled(mut part: Part) -> Part {
    for event in part.events_mut() {
        match event {
            Event::Note(note) => clear_if_misspelled(
                &mut note.note_type,
                &mut note.dots,
                &note.duration,
                note.time_modification.as_ref(),
                note.grace.is_some(),
            ),
            Event::Rest(rest) => clear_if_misspelled(
                &mut rest.note_type,
                &mut rest.dots,
                &rest.duration,
                rest.time_modification.as_ref(),
                false,
            ),
            _ => {}
        }
    }
    part
}
