use crate::types::duration::Duration;
use crate::types::event::{Attributes, Event, Rest};
use crate::types::fraction::Fraction;
use crate::types::score::{MAX_STAVES, Measure};
use crate::types::token::MAX_VOICE;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::collections::BTreeMap;
use tracing::debug;

/// Where each voice of the measure currently ends, and whether it is counted in divisions.
struct VoiceEnds {
    ends: BTreeMap<(u8, u8), Fraction>,
    divisions: Option<u32>,
    in_divisions: bool,
}

impl VoiceEnds {
    /// Expresses `gap` in the unit the measure's events use.
    fn duration(&self, gap: Fraction) -> Duration {
        if self.in_divisions {
            let divisions = self.divisions.unwrap_or(1).max(1);
            let count = gap.clone() * Fraction::from_integer(4 * divisions as i64);
            if count.denom() == &BigInt::from(1) {
                if let Some(count) = count.numer().to_u64() {
                    return Duration::Divisions(count);
                }
            }
        }
        Duration::Exact(gap)
    }
}

fn clamp_staff(staff: u8, staff_count: u8) -> u8 {
    staff.clamp(1, staff_count.clamp(1, MAX_STAVES))
}

fn clamp_voice(voice: u8) -> u8 {
    voice.clamp(1, MAX_VOICE)
}

/// Builds a measure from events in document order.
///
/// `backup` moves the time cursor back, `forward` moves it ahead, chord members
/// start with the preceding note and grace notes take no time. Notes and rests
/// are routed to their `(staff, voice)`; gaps become hidden rests and every
/// voice is padded to the measure length. Attributes are merged into one, later
/// values overriding earlier ones, and `divisions` carries the value in effect
/// from one measure to the next.
pub fn assemble_measure(
    index: usize,
    stream: Vec<Event>,
    staff_count: u8,
    divisions: &mut Option<u32>,
) -> Measure {
    let mut measure = Measure::new(index);
    let mut attributes: Option<Attributes> = None;
    let mut others = Vec::new();

    let mut cursor = Fraction::zero();
    let mut last_onset = Fraction::zero();
    let mut voices = VoiceEnds {
        ends: BTreeMap::new(),
        divisions: *divisions,
        in_divisions: false,
    };

    for event in stream {
        let in_effect = divisions.unwrap_or(1);
        match event {
            Event::Attributes(a) => {
                if let Some(declared) = a.divisions.filter(|d| *d > 0) {
                    *divisions = Some(declared);
                    voices.divisions = Some(declared);
                }
                attributes.get_or_insert_with(Attributes::default).merge(a);
            }
            Event::Backup(duration) => {
                cursor = cursor - duration.to_fraction(in_effect);
            }
            Event::Forward(forward) => {
                cursor += &forward.duration.to_fraction(in_effect);
            }
            Event::Note(mut note) => {
                if matches!(note.duration, Duration::Divisions(_)) {
                    voices.in_divisions = true;
                }
                note.staff = clamp_staff(note.staff, staff_count);
                note.voice = clamp_voice(note.voice);
                let length = note.duration.to_fraction(in_effect);
                let onset = if note.chord {
                    last_onset.clone()
                } else {
                    cursor.clone()
                };
                let length = note.advances().then_some(length);
                let key = (note.staff, note.voice);
                place(&mut measure, &mut voices, key, onset, length.clone(), Event::Note(note));
                if let Some(length) = length {
                    last_onset = cursor.clone();
                    cursor += &length;
                }
            }
            Event::Rest(mut rest) => {
                if matches!(rest.duration, Duration::Divisions(_)) {
                    voices.in_divisions = true;
                }
                rest.staff = clamp_staff(rest.staff, staff_count);
                rest.voice = clamp_voice(rest.voice);
                let length = rest.duration.to_fraction(in_effect);
                let key = (rest.staff, rest.voice);
                let onset = cursor.clone();
                place(&mut measure, &mut voices, key, onset, Some(length.clone()), Event::Rest(rest));
                last_onset = cursor.clone();
                cursor += &length;
            }
            other @ (Event::Direction(_)
            | Event::Barline(_)
            | Event::Harmony(_)
            | Event::Print(_)) => others.push(other),
        }
    }

    if let Some(attributes) = attributes {
        measure.header.push(Event::Attributes(attributes));
    }
    measure.header.extend(others);

    for staff in 1..=staff_count.clamp(1, MAX_STAVES) {
        measure.staff_mut(staff);
    }

    let length = voices
        .ends
        .values()
        .max()
        .cloned()
        .unwrap_or_default();
    for ((staff, voice), end) in &voices.ends {
        if *end < length {
            let gap = voices.duration(&length - end);
            measure
                .staff_mut(*staff)
                .voice_mut(*voice)
                .events
                .push(Event::Rest(Rest::hidden(gap, *staff, *voice)));
        }
    }

    debug!(
        "Assembled measure {} with {} voices",
        index,
        voices.ends.len()
    );
    measure
}

/// Appends `event` to its voice, first filling any gap before `onset`.
/// `length` is `None` for events that take no time in the voice.
fn place(
    measure: &mut Measure,
    voices: &mut VoiceEnds,
    key: (u8, u8),
    onset: Fraction,
    length: Option<Fraction>,
    event: Event,
) {
    let (staff, voice) = key;
    let mut end = voices.ends.get(&key).cloned().unwrap_or_default();
    if onset > end {
        let gap = voices.duration(&onset - &end);
        measure
            .staff_mut(staff)
            .voice_mut(voice)
            .events
            .push(Event::Rest(Rest::hidden(gap, staff, voice)));
        end = onset;
    } else if onset < end && length.is_some() {
        debug!(
            "Measure {}: event in staff {} voice {} overlaps the previous one",
            measure.index, staff, voice
        );
    }
    if let Some(length) = length {
        end += &length;
    }
    voices.ends.insert(key, end);
    measure.staff_mut(staff).voice_mut(voice).events.push(event);
}
