use crate::types::event::Event;
use crate::types::score::Part;

/// Keeps the tremolo kind, forgets how many marks are drawn.
pub fn transform(mut part: Part) -> Part {
    for event in part.events_mut() {
        if let Event::Note(note) = event {
            if let Some(tremolo) = &mut note.tremolo {
                tremolo.marks = None;
            }
        }
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::duration::Duration;
    use crate::types::event::{Note, Tremolo, TremoloKind};
    use crate::types::fraction::Fraction;
    use crate::types::pitch::{Pitch, Step, Tone};
    use crate::types::score::Measure;

    #[test]
    fn test_drops_marks() {
        let mut note = Note::new(
            Tone::Pitched(Pitch::new(Step::A, 0, 3)),
            Duration::Exact(Fraction::new(1, 2)),
        );
        note.tremolo = Some(Tremolo {
            kind: TremoloKind::Single,
            marks: Some(3),
        });
        let mut measure = Measure::new(1);
        measure.staff_mut(1).voice_mut(1).events.push(Event::Note(note));

        let part = transform(Part {
            measures: vec![measure],
        });
        let Some(Event::Note(note)) = part.events().next() else {
            panic!("note expected");
        };
        assert_eq!(
            note.tremolo,
            Some(Tremolo {
                kind: TremoloKind::Single,
                marks: None
            })
        );
    }
}
