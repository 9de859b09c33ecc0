use crate::types::duration::Duration;
use crate::types::event::Event;
use crate::types::score::{Measure, Part};
use tracing::warn;

fn measure_events_mut(measure: &mut Measure) -> impl Iterator<Item = &mut Event> {
    measure.header.iter_mut().chain(
        measure
            .staves
            .iter_mut()
            .flat_map(|staff| staff.voices.iter_mut())
            .flat_map(|voice| voice.events.iter_mut()),
    )
}

/// Rewrites every division count as an exact fraction of a whole note.
///
/// Divisions are tracked across measures and default to 1 when never declared.
/// Afterwards `divisions` is cleared and attributes left empty are removed.
pub fn transform(mut part: Part) -> Part {
    let mut divisions: Option<u32> = None;
    let mut warned = false;

    for measure in &mut part.measures {
        if let Some(declared) = measure.attributes().and_then(|a| a.divisions) {
            if declared > 0 {
                divisions = Some(declared);
            }
        }

        let index = measure.index;
        let in_effect = divisions.unwrap_or(1);
        for event in measure_events_mut(measure) {
            let Some(duration) = event.duration_mut() else {
                continue;
            };
            if let Duration::Divisions(_) = duration {
                if divisions.is_none() && !warned {
                    warn!(
                        "Measure {}: durations given before any divisions, assuming 1 per quarter",
                        index
                    );
                    warned = true;
                }
                *duration = Duration::Exact(duration.to_fraction(in_effect));
            }
        }

        for event in &mut measure.header {
            if let Event::Attributes(attributes) = event {
                attributes.divisions = None;
            }
        }
        measure
            .header
            .retain(|event| !matches!(event, Event::Attributes(a) if a.is_empty()));
    }

    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event::{Attributes, Note, TimeSignature};
    use crate::types::fraction::Fraction;
    use crate::types::pitch::{Pitch, Step, Tone};
    use pretty_assertions::assert_eq;

    fn note_in_divisions(count: u64) -> Event {
        Event::Note(Note::new(
            Tone::Pitched(Pitch::new(Step::C, 0, 4)),
            Duration::Divisions(count),
        ))
    }

    fn measure(index: usize, divisions: Option<u32>, counts: &[u64]) -> Measure {
        let mut measure = Measure::new(index);
        if divisions.is_some() {
            measure.header.push(Event::Attributes(Attributes {
                divisions,
                ..Default::default()
            }));
        }
        measure.staff_mut(1).voice_mut(1).events =
            counts.iter().map(|c| note_in_divisions(*c)).collect();
        measure
    }

    fn durations(part: &Part) -> Vec<Fraction> {
        part.events()
            .filter_map(|e| e.duration().and_then(|d| d.exact()).cloned())
            .collect()
    }

    #[test]
    fn test_divisions_carry_over() {
        let part = Part {
            measures: vec![
                measure(1, Some(2), &[1, 3]),
                measure(2, None, &[4]),
                measure(3, Some(3), &[1, 2, 3]),
            ],
        };
        let part = transform(part);

        assert_eq!(
            durations(&part),
            vec![
                Fraction::new(1, 8),
                Fraction::new(3, 8),
                Fraction::new(1, 2),
                Fraction::new(1, 12),
                Fraction::new(1, 6),
                Fraction::new(1, 4),
            ]
        );
        // divisions-only attributes disappear
        assert!(part.measures.iter().all(|m| m.header.is_empty()));
        assert_eq!(part.validate(), Ok(()));
    }

    #[test]
    fn test_default_divisions() {
        let part = transform(Part {
            measures: vec![measure(1, None, &[2])],
        });
        assert_eq!(durations(&part), vec![Fraction::new(1, 2)]);
    }

    #[test]
    fn test_keeps_other_attributes() {
        let mut first = measure(1, Some(1), &[4]);
        first.attributes_mut().time = Some(TimeSignature::new(4, 4));
        let part = transform(Part {
            measures: vec![first],
        });
        assert_eq!(
            part.measures[0].attributes(),
            Some(&Attributes {
                time: Some(TimeSignature::new(4, 4)),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_idempotent() {
        let part = Part {
            measures: vec![measure(1, Some(4), &[1, 2, 5]), measure(2, None, &[8])],
        };
        let once = transform(part);
        let twice = transform(once.clone());
        assert_eq!(once, twice);
    }
}
