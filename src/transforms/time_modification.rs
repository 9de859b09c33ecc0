use crate::types::duration::TimeModification;
use crate::types::event::{Event, Tuplet};
use crate::types::score::Part;
use crate::util::reduce_ratio;

fn reduce(time_modification: &mut Option<TimeModification>) {
    if let Some(modification) = time_modification {
        let (actual, normal) = reduce_ratio(modification.actual_notes, modification.normal_notes);
        *modification = TimeModification::new(actual, normal);
    }
}

fn strip_tuplets(tuplets: &mut [Tuplet]) {
    for tuplet in tuplets {
        *tuplet = Tuplet::new(tuplet.state);
    }
}

/// Reduces ratios to lowest terms (6:4 becomes 3:2) and drops the normal
/// type, tuplet numbering and display detail.
pub fn transform(mut part: Part) -> Part {
    for event in part.events_mut() {
        match event {
            Event::Note(note) => {
                reduce(&mut note.time_modification);
                strip_tuplets(&mut note.tuplets);
            }
            Event::Rest(rest) => {
                reduce(&mut rest.time_modification);
                strip_tuplets(&mut rest.tuplets);
            }
            _ => {}
        }
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::duration::{Duration, NoteType};
    use crate::types::event::{Note, SpanState};
    use crate::types::fraction::Fraction;
    use crate::types::pitch::{Pitch, Step, Tone};
    use crate::types::score::Measure;

    #[test]
    fn test_reduces_sextuplet_ratio() {
        let mut note = Note::new(
            Tone::Pitched(Pitch::new(Step::D, 0, 4)),
            Duration::Exact(Fraction::new(1, 24)),
        );
        note.time_modification = Some(TimeModification {
            actual_notes: 6,
            normal_notes: 4,
            normal_type: Some(NoteType::N16th),
            normal_dots: 0,
        });
        note.tuplets = vec![Tuplet {
            number: Some(1),
            state: SpanState::Start,
            bracket: Some(true),
            show_number: Some("actual".to_string()),
        }];
        let mut measure = Measure::new(1);
        measure.staff_mut(1).voice_mut(1).events.push(Event::Note(note));

        let part = transform(Part {
            measures: vec![measure],
        });
        let Some(Event::Note(note)) = part.events().next() else {
            panic!("note expected");
        };
        assert_eq!(note.time_modification, Some(TimeModification::new(3, 2)));
        assert_eq!(note.tuplets, vec![Tuplet::new(SpanState::Start)]);

        let again = transform(part.clone());
        assert_eq!(again, part);
    }
}
