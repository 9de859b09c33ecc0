use crate::types::duration::Duration;
use crate::types::event::{Attributes, Event, Rest, TimeSignature};
use crate::types::fraction::Fraction;
use thiserror::Error;

pub const MAX_STAVES: u8 = 2;

/// Broken structural invariant. Always a defect in the code that built the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("measure #{position} has index {index}")]
    MeasureIndex { position: usize, index: usize },
    #[error("measure {measure}: staff {staff} is outside 1..={max}", max = MAX_STAVES)]
    StaffNumber { measure: usize, staff: u8 },
    #[error("measure {measure}: staves are not strictly ascending")]
    StaffOrder { measure: usize },
    #[error("measure {measure}, staff {staff}: voices are not strictly ascending")]
    VoiceOrder { measure: usize, staff: u8 },
    #[error("measure {measure}, staff {staff}, voice {voice}: {kind} cannot live in a voice")]
    VoiceEvent {
        measure: usize,
        staff: u8,
        voice: u8,
        kind: &'static str,
    },
    #[error("measure {measure}: {kind} cannot live in the measure header")]
    HeaderEvent { measure: usize, kind: &'static str },
    #[error(
        "measure {measure}, staff {staff}, voice {voice}: event claims staff {claimed_staff} voice {claimed_voice}"
    )]
    Misplaced {
        measure: usize,
        staff: u8,
        voice: u8,
        claimed_staff: u8,
        claimed_voice: u8,
    },
    #[error("measure {measure}: durations are not fractional yet")]
    NotFractional { measure: usize },
    #[error(
        "measure {measure}, staff {staff}, voice {voice}: lasts {actual}, measure lasts {expected}"
    )]
    VoiceLength {
        measure: usize,
        staff: u8,
        voice: u8,
        actual: Fraction,
        expected: Fraction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Voice {
    pub number: u8,
    /// Notes and rests, in time order.
    pub events: Vec<Event>,
}

impl Voice {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            events: Vec::new(),
        }
    }

    /// Sum of the time occupied by the events, `None` while durations are in divisions.
    pub fn duration(&self) -> Option<Fraction> {
        let mut total = Fraction::zero();
        for event in &self.events {
            total += &event.occupied()?;
        }
        Some(total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Staff {
    pub number: u8,
    /// Ascending by voice number.
    pub voices: Vec<Voice>,
}

impl Staff {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            voices: Vec::new(),
        }
    }

    pub fn voice_mut(&mut self, number: u8) -> &mut Voice {
        let idx = match self.voices.binary_search_by_key(&number, |v| v.number) {
            Ok(idx) => idx,
            Err(idx) => {
                self.voices.insert(idx, Voice::new(number));
                idx
            }
        };
        &mut self.voices[idx]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Measure {
    /// 1-based position in the part.
    pub index: usize,
    /// Measure-scope events (attributes, print, directions, harmony, barlines) in source order.
    pub header: Vec<Event>,
    /// Ascending by staff number.
    pub staves: Vec<Staff>,
}

impl Measure {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            header: Vec::new(),
            staves: Vec::new(),
        }
    }

    pub fn staff_mut(&mut self, number: u8) -> &mut Staff {
        let idx = match self.staves.binary_search_by_key(&number, |s| s.number) {
            Ok(idx) => idx,
            Err(idx) => {
                self.staves.insert(idx, Staff::new(number));
                idx
            }
        };
        &mut self.staves[idx]
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        self.header.iter().find_map(|event| match event {
            Event::Attributes(attributes) => Some(attributes),
            _ => None,
        })
    }

    /// The measure's attributes, created at the front of the header when missing.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        let position = self
            .header
            .iter()
            .position(|event| matches!(event, Event::Attributes(_)));
        let idx = match position {
            Some(idx) => idx,
            None => {
                self.header.insert(0, Event::Attributes(Attributes::default()));
                0
            }
        };
        match &mut self.header[idx] {
            Event::Attributes(attributes) => attributes,
            _ => unreachable!("header slot was just checked to hold attributes"),
        }
    }

    pub fn voices(&self) -> impl Iterator<Item = (u8, &Voice)> {
        self.staves
            .iter()
            .flat_map(|staff| staff.voices.iter().map(move |voice| (staff.number, voice)))
    }

    /// Length of the longest voice, `None` while durations are in divisions.
    pub fn length(&self) -> Option<Fraction> {
        let mut longest = Fraction::zero();
        for (_, voice) in self.voices() {
            let duration = voice.duration()?;
            if duration > longest {
                longest = duration;
            }
        }
        Some(longest)
    }

    /// Fills every shorter voice up to the measure length with a hidden rest.
    pub fn pad_voices(&mut self) {
        let Some(length) = self.length() else {
            return;
        };
        for staff in &mut self.staves {
            for voice in &mut staff.voices {
                let Some(duration) = voice.duration() else {
                    continue;
                };
                if duration < length {
                    let gap = &length - &duration;
                    voice.events.push(Event::Rest(Rest::hidden(
                        Duration::Exact(gap),
                        staff.number,
                        voice.number,
                    )));
                }
            }
        }
    }
}

/// A single-part score: the tree every component of the crate works on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Part {
    pub measures: Vec<Measure>,
}

impl Part {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staff_count(&self) -> u8 {
        self.measures
            .iter()
            .flat_map(|m| m.staves.iter().map(|s| s.number))
            .max()
            .unwrap_or(0)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.measures.iter().flat_map(|measure| {
            measure.header.iter().chain(
                measure
                    .voices()
                    .flat_map(|(_, voice)| voice.events.iter()),
            )
        })
    }

    pub fn events_mut(&mut self) -> impl Iterator<Item = &mut Event> {
        self.measures.iter_mut().flat_map(|measure| {
            measure.header.iter_mut().chain(
                measure
                    .staves
                    .iter_mut()
                    .flat_map(|staff| staff.voices.iter_mut())
                    .flat_map(|voice| voice.events.iter_mut()),
            )
        })
    }

    /// Time signature in effect in each measure.
    pub fn time_signatures(&self) -> Vec<Option<TimeSignature>> {
        let mut current = None;
        self.measures
            .iter()
            .map(|measure| {
                if let Some(time) = measure.attributes().and_then(|a| a.time) {
                    current = Some(time);
                }
                current
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        for (position, measure) in self.measures.iter().enumerate() {
            if measure.index != position + 1 {
                return Err(ModelError::MeasureIndex {
                    position: position + 1,
                    index: measure.index,
                });
            }
            validate_measure(measure)?;
        }
        Ok(())
    }

    /// Indices of interior measures whose length differs from the declared time signature.
    pub fn declared_duration_mismatches(&self) -> Vec<usize> {
        let signatures = self.time_signatures();
        let last = self.measures.len().saturating_sub(1);
        self.measures
            .iter()
            .zip(signatures)
            .enumerate()
            .filter(|(position, _)| *position != 0 && *position != last)
            .filter_map(|(_, (measure, signature))| {
                let declared = signature?.duration()?;
                match measure.length() {
                    Some(length) if length == declared => None,
                    _ => Some(measure.index),
                }
            })
            .collect()
    }
}

fn validate_measure(measure: &Measure) -> Result<(), ModelError> {
    let index = measure.index;

    for event in &measure.header {
        if !event.is_header() {
            return Err(ModelError::HeaderEvent {
                measure: index,
                kind: event.kind_name(),
            });
        }
    }

    let mut previous_staff = 0;
    for staff in &measure.staves {
        if staff.number == 0 || staff.number > MAX_STAVES {
            return Err(ModelError::StaffNumber {
                measure: index,
                staff: staff.number,
            });
        }
        if staff.number <= previous_staff {
            return Err(ModelError::StaffOrder { measure: index });
        }
        previous_staff = staff.number;

        let mut previous_voice = None;
        for voice in &staff.voices {
            if previous_voice.is_some_and(|p| voice.number <= p) {
                return Err(ModelError::VoiceOrder {
                    measure: index,
                    staff: staff.number,
                });
            }
            previous_voice = Some(voice.number);

            for event in &voice.events {
                let Some((claimed_staff, claimed_voice)) = event.placement() else {
                    return Err(ModelError::VoiceEvent {
                        measure: index,
                        staff: staff.number,
                        voice: voice.number,
                        kind: event.kind_name(),
                    });
                };
                if claimed_staff != staff.number || claimed_voice != voice.number {
                    return Err(ModelError::Misplaced {
                        measure: index,
                        staff: staff.number,
                        voice: voice.number,
                        claimed_staff,
                        claimed_voice,
                    });
                }
            }
        }
    }

    let length = measure
        .length()
        .ok_or(ModelError::NotFractional { measure: index })?;
    for (staff, voice) in measure.voices() {
        let actual = voice
            .duration()
            .ok_or(ModelError::NotFractional { measure: index })?;
        if actual != length {
            return Err(ModelError::VoiceLength {
                measure: index,
                staff,
                voice: voice.number,
                actual,
                expected: length,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event::Note;
    use crate::types::pitch::{Pitch, Step, Tone};

    fn quarter(step: Step, staff: u8, voice: u8) -> Event {
        let mut note = Note::new(
            Tone::Pitched(Pitch::new(step, 0, 4)),
            Duration::Exact(Fraction::new(1, 4)),
        );
        note.staff = staff;
        note.voice = voice;
        Event::Note(note)
    }

    fn two_voice_measure(index: usize) -> Measure {
        let mut measure = Measure::new(index);
        measure.attributes_mut().time = Some(TimeSignature::new(2, 4));
        let staff = measure.staff_mut(1);
        staff.voice_mut(1).events = vec![quarter(Step::C, 1, 1), quarter(Step::D, 1, 1)];
        staff.voice_mut(2).events = vec![quarter(Step::E, 1, 2)];
        measure
    }

    #[test]
    fn test_pad_voices() {
        let mut measure = two_voice_measure(1);
        assert_eq!(measure.length(), Some(Fraction::new(1, 2)));
        measure.pad_voices();

        let voice = &measure.staves[0].voices[1];
        assert_eq!(voice.duration(), Some(Fraction::new(1, 2)));
        assert!(matches!(
            voice.events.last(),
            Some(Event::Rest(Rest { hidden: true, .. }))
        ));

        let part = Part {
            measures: vec![measure],
        };
        assert_eq!(part.validate(), Ok(()));
    }

    #[test]
    fn test_validate_voice_length() {
        let part = Part {
            measures: vec![two_voice_measure(1)],
        };
        assert!(matches!(
            part.validate(),
            Err(ModelError::VoiceLength { voice: 2, .. })
        ));
    }

    #[test]
    fn test_validate_structure() {
        let mut measure = Measure::new(2);
        measure.staff_mut(1);
        let part = Part {
            measures: vec![measure],
        };
        assert_eq!(
            part.validate(),
            Err(ModelError::MeasureIndex {
                position: 1,
                index: 2
            })
        );

        let mut measure = Measure::new(1);
        measure.staff_mut(3);
        let part = Part {
            measures: vec![measure],
        };
        assert!(matches!(part.validate(), Err(ModelError::StaffNumber { .. })));

        let mut measure = Measure::new(1);
        measure.staff_mut(1).voice_mut(1).events.push(quarter(Step::C, 2, 1));
        let part = Part {
            measures: vec![measure],
        };
        assert!(matches!(part.validate(), Err(ModelError::Misplaced { .. })));

        let mut measure = Measure::new(1);
        measure.header.push(quarter(Step::C, 1, 1));
        let part = Part {
            measures: vec![measure],
        };
        assert!(matches!(part.validate(), Err(ModelError::HeaderEvent { .. })));
    }

    #[test]
    fn test_declared_durations() {
        let mut first = Measure::new(1);
        first.attributes_mut().time = Some(TimeSignature::new(2, 4));
        first.staff_mut(1).voice_mut(1).events = vec![quarter(Step::G, 1, 1)];

        let mut middle = two_voice_measure(2);
        middle.pad_voices();

        let mut short = Measure::new(3);
        short.staff_mut(1).voice_mut(1).events = vec![quarter(Step::A, 1, 1)];

        let mut last = Measure::new(4);
        last.staff_mut(1).voice_mut(1).events = vec![quarter(Step::B, 1, 1)];

        let part = Part {
            measures: vec![first, middle, short, last],
        };
        assert_eq!(part.declared_duration_mismatches(), vec![3]);
        assert_eq!(part.staff_count(), 1);
    }
}
