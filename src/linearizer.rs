use crate::transforms::to_fractional;
use crate::types::duration::{Duration, NoteType, TimeModification, type_spells_duration};
use crate::types::event::{Attributes, Event, Note, Rest};
use crate::types::fraction::Fraction;
use crate::types::score::{Measure, Part};
use crate::types::token::Token;
use crate::util::reduce_ratio;
use tracing::debug;

/// Encodes a part as its token sequence. Works on a fractional copy of `part`.
pub fn linearize(part: &Part) -> Vec<Token> {
    let part = to_fractional(part.clone());
    let mut tokens = Vec::new();
    for measure in &part.measures {
        linearize_measure(measure, &mut tokens);
    }
    debug!(
        "Linearized {} measures into {} tokens",
        part.measures.len(),
        tokens.len()
    );
    tokens
}

/// Appends the tokens of one measure whose durations are already exact.
pub fn linearize_measure(measure: &Measure, tokens: &mut Vec<Token>) {
    let mut attributes = Attributes::default();
    for event in &measure.header {
        if let Event::Attributes(a) = event {
            attributes.merge(a.clone());
        }
    }

    tokens.push(Token::Measure);
    if let Some(fifths) = attributes.key {
        tokens.push(Token::Key(fifths));
    }
    if let Some(time) = attributes.time {
        tokens.push(Token::Time(time));
    }

    let mut staff_numbers: Vec<u8> = measure
        .staves
        .iter()
        .map(|s| s.number)
        .chain(attributes.clefs.iter().map(|c| c.staff))
        .collect();
    staff_numbers.sort_unstable();
    staff_numbers.dedup();

    for number in staff_numbers {
        tokens.push(Token::Staff(number));
        if let Some(clef) = attributes.clef(number) {
            tokens.push(Token::Clef(*clef));
        }
        let Some(staff) = measure.staves.iter().find(|s| s.number == number) else {
            continue;
        };
        for voice in &staff.voices {
            tokens.push(Token::Voice(voice.number));
            for event in &voice.events {
                linearize_event(event, tokens);
            }
        }
    }
}

fn linearize_event(event: &Event, tokens: &mut Vec<Token>) {
    match event {
        Event::Note(note) => linearize_note(note, tokens),
        Event::Rest(rest) => linearize_rest(rest, tokens),
        other => debug!("Skipping {} inside a voice", other.kind_name()),
    }
}

fn push_duration(
    tokens: &mut Vec<Token>,
    duration: &Duration,
    note_type: Option<NoteType>,
    dots: u8,
    time_modification: Option<&TimeModification>,
    grace: bool,
) {
    let exact = duration.to_fraction(1);
    let typed = note_type
        .filter(|t| type_spells_duration(*t, dots, &exact, time_modification, grace));
    match typed {
        Some(note_type) => tokens.push(Token::Type { note_type, dots }),
        None if grace => tokens.push(Token::Duration(Fraction::zero())),
        None => tokens.push(Token::Duration(exact)),
    }

    if let Some(modification) = time_modification {
        let (actual, normal) = reduce_ratio(modification.actual_notes, modification.normal_notes);
        if actual > 0 && normal > 0 {
            tokens.push(Token::Ratio { actual, normal });
        }
    }
}

fn linearize_note(note: &Note, tokens: &mut Vec<Token>) {
    if let Some(grace) = note.grace {
        tokens.push(Token::Grace { slash: grace.slash });
    }
    if note.chord {
        tokens.push(Token::Chord);
    }
    push_duration(
        tokens,
        &note.duration,
        note.note_type,
        note.dots,
        note.time_modification.as_ref(),
        note.grace.is_some(),
    );
    tokens.push(Token::Tone(note.tone));

    if let Some(accidental) = note.accidental {
        tokens.push(Token::Accidental(accidental));
    }
    if let Some(stem) = note.stem {
        tokens.push(Token::Stem(stem));
    }
    if let Some(tremolo) = note.tremolo {
        tokens.push(Token::Tremolo(tremolo.kind));
    }
    let mut beams = note.beams.clone();
    beams.sort_by_key(|b| b.number);
    tokens.extend(beams.iter().map(|b| Token::Beam(b.state)));
    tokens.extend(note.ties.iter().map(|t| Token::Tie(*t)));
    tokens.extend(note.slurs.iter().map(|s| Token::Slur(s.state)));
    tokens.extend(note.tuplets.iter().map(|t| Token::Tuplet(t.state)));
    tokens.extend(note.articulations.iter().map(|a| Token::Articulation(*a)));
}

fn linearize_rest(rest: &Rest, tokens: &mut Vec<Token>) {
    push_duration(
        tokens,
        &rest.duration,
        rest.note_type,
        rest.dots,
        rest.time_modification.as_ref(),
        false,
    );
    tokens.push(if rest.hidden {
        Token::Forward
    } else if rest.measure {
        Token::MeasureRest
    } else {
        Token::Rest
    });
    tokens.extend(rest.tuplets.iter().map(|t| Token::Tuplet(t.state)));
}
