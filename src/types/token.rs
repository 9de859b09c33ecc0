use crate::types::duration::{MAX_DOTS, NoteType};
use crate::types::event::{
    AccidentalKind, Articulation, BeamState, Clef, ClefSign, SpanState, Stem, TimeSignature,
    TremoloKind,
};
use crate::types::fraction::Fraction;
use crate::types::pitch::{MAX_ALTER, MAX_OCTAVE, MIN_ALTER, Pitch, Step, Tone};
use crate::types::score::MAX_STAVES;
use num_integer::Integer;
use std::fmt;

pub const MAX_VOICE: u8 = 16;
pub const MAX_KEY_FIFTHS: i8 = 7;
pub const MAX_CLEF_LINE: u8 = 5;
pub const MAX_TIME_BEATS: u32 = 32;
pub const TIME_BEAT_TYPES: [u32; 7] = [1, 2, 4, 8, 16, 32, 64];
pub const MAX_RATIO_TERM: u32 = 32;
/// Largest numerator or denominator of a `dur:` fallback token.
pub const MAX_DURATION_TERM: u64 = 4096;

/// One atom of the linearized encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    // structure
    Measure,
    Staff(u8),
    Voice(u8),
    Clef(Clef),
    Key(i8),
    Time(TimeSignature),

    // duration
    Type { note_type: NoteType, dots: u8 },
    Duration(Fraction),
    Ratio { actual: u32, normal: u32 },

    // event prefixes
    Grace { slash: bool },
    Chord,

    // event heads
    Tone(Tone),
    Rest,
    MeasureRest,
    Forward,

    // markup of the preceding event
    Stem(Stem),
    Accidental(AccidentalKind),
    Beam(BeamState),
    Tie(SpanState),
    Slur(SpanState),
    Tuplet(SpanState),
    Tremolo(TremoloKind),
    Articulation(Articulation),
}

impl Token {
    pub fn pitch(pitch: Pitch) -> Self {
        Token::Tone(Tone::Pitched(pitch))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Measure => write!(f, "measure"),
            Token::Staff(staff) => write!(f, "staff:{}", staff),
            Token::Voice(voice) => write!(f, "voice:{}", voice),
            Token::Clef(clef) => write!(f, "clef:{}", clef),
            Token::Key(fifths) => write!(f, "key:{}", fifths),
            Token::Time(signature) => write!(f, "time:{}", signature),
            Token::Type { note_type, dots } => {
                write!(f, "{}", note_type)?;
                for _ in 0..*dots {
                    write!(f, ".")?;
                }
                Ok(())
            }
            Token::Duration(fraction) => write!(f, "dur:{}", fraction),
            Token::Ratio { actual, normal } => write!(f, "{}in{}", actual, normal),
            Token::Grace { slash: false } => write!(f, "grace"),
            Token::Grace { slash: true } => write!(f, "grace:slash"),
            Token::Chord => write!(f, "chord"),
            Token::Tone(tone) => write!(f, "{}", tone),
            Token::Rest => write!(f, "rest"),
            Token::MeasureRest => write!(f, "rest:measure"),
            Token::Forward => write!(f, "forward"),
            Token::Stem(stem) => write!(f, "stem:{}", stem),
            Token::Accidental(kind) => write!(f, "accidental:{}", kind),
            Token::Beam(state) => write!(f, "beam:{}", state),
            Token::Tie(state) => write!(f, "tie:{}", state),
            Token::Slur(state) => write!(f, "slur:{}", state),
            Token::Tuplet(state) => write!(f, "tuplet:{}", state),
            Token::Tremolo(kind) => write!(f, "tremolo:{}", kind),
            Token::Articulation(articulation) => write!(f, "{}", articulation),
        }
    }
}

/// Every atom of the alphabet except the open-ended `dur:N/D` fallback family.
pub fn vocabulary() -> Vec<Token> {
    let mut tokens = vec![Token::Measure];

    tokens.extend((1..=MAX_STAVES).map(Token::Staff));
    tokens.extend((1..=MAX_VOICE).map(Token::Voice));
    for sign in ClefSign::ALL {
        tokens.push(Token::Clef(Clef::new(*sign, None)));
        for line in 1..=MAX_CLEF_LINE {
            tokens.push(Token::Clef(Clef::new(*sign, Some(line))));
        }
    }
    tokens.extend((-MAX_KEY_FIFTHS..=MAX_KEY_FIFTHS).map(Token::Key));
    for beats in 1..=MAX_TIME_BEATS {
        for beat_type in TIME_BEAT_TYPES {
            tokens.push(Token::Time(TimeSignature::new(beats, beat_type)));
        }
    }

    for note_type in NoteType::ALL {
        for dots in 0..=MAX_DOTS {
            tokens.push(Token::Type { note_type, dots });
        }
    }
    for actual in 1..=MAX_RATIO_TERM {
        for normal in 1..=MAX_RATIO_TERM {
            if actual.gcd(&normal) == 1 {
                tokens.push(Token::Ratio { actual, normal });
            }
        }
    }

    tokens.push(Token::Grace { slash: false });
    tokens.push(Token::Grace { slash: true });
    tokens.push(Token::Chord);

    for octave in 0..=MAX_OCTAVE {
        for step in Step::ALL {
            for alter in MIN_ALTER..=MAX_ALTER {
                tokens.push(Token::pitch(Pitch::new(step, alter, octave)));
            }
            tokens.push(Token::Tone(Tone::Unpitched { step, octave }));
        }
    }
    tokens.extend([Token::Rest, Token::MeasureRest, Token::Forward]);

    tokens.extend(Stem::ALL.iter().copied().map(Token::Stem));
    tokens.extend(AccidentalKind::ALL.iter().copied().map(Token::Accidental));
    tokens.extend(BeamState::ALL.iter().copied().map(Token::Beam));
    tokens.extend(SpanState::ALL.iter().copied().map(Token::Tie));
    tokens.extend(SpanState::ALL.iter().copied().map(Token::Slur));
    tokens.extend(SpanState::ALL.iter().copied().map(Token::Tuplet));
    tokens.extend(TremoloKind::ALL.iter().copied().map(Token::Tremolo));
    tokens.extend(Articulation::ALL.iter().copied().map(Token::Articulation));

    tokens
}
