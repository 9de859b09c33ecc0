use crate::types::duration::parse_type_with_dots;
use crate::types::event::{
    AccidentalKind, Articulation, BeamState, Clef, ClefSign, SpanState, Stem, TimeSignature,
    TremoloKind,
};
use crate::types::fraction::Fraction;
use crate::types::pitch::Tone;
use crate::types::score::MAX_STAVES;
use crate::types::token::{
    MAX_CLEF_LINE, MAX_DURATION_TERM, MAX_KEY_FIFTHS, MAX_RATIO_TERM, MAX_TIME_BEATS, MAX_VOICE,
    TIME_BEAT_TYPES, Token,
};
use num_integer::Integer;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unknown token \"{0}\"")]
    Unknown(String),
    #[error("invalid token \"{atom}\": {reason}")]
    Invalid { atom: String, reason: String },
    #[error("token #{index}: {source}")]
    AtPosition {
        index: usize,
        #[source]
        source: Box<TokenError>,
    },
}

impl TokenError {
    fn invalid(atom: &str, reason: impl Into<String>) -> Self {
        TokenError::Invalid {
            atom: atom.to_string(),
            reason: reason.into(),
        }
    }

    pub fn at(self, index: usize) -> Self {
        TokenError::AtPosition {
            index,
            source: Box::new(self),
        }
    }
}

fn parse_bounded(atom: &str, value: &str, min: i64, max: i64) -> Result<i64, TokenError> {
    let number: i64 = value
        .parse()
        .map_err(|_| TokenError::invalid(atom, "not a number"))?;
    if !(min..=max).contains(&number) {
        return Err(TokenError::invalid(
            atom,
            format!("must be within {}..={}", min, max),
        ));
    }
    Ok(number)
}

fn parse_clef(atom: &str, value: &str) -> Result<Clef, TokenError> {
    let (sign, line) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_digit() => (&value[..idx], Some(&value[idx..])),
        _ => (value, None),
    };
    let sign = ClefSign::from_name(sign)
        .ok_or_else(|| TokenError::invalid(atom, "unknown clef sign"))?;
    let line = match line {
        Some(line) => Some(parse_bounded(atom, line, 1, MAX_CLEF_LINE as i64)? as u8),
        None => None,
    };
    Ok(Clef::new(sign, line))
}

fn parse_time(atom: &str, value: &str) -> Result<TimeSignature, TokenError> {
    let (beats, beat_type) = value
        .split_once('/')
        .ok_or_else(|| TokenError::invalid(atom, "expected N/D"))?;
    let beats = parse_bounded(atom, beats, 1, MAX_TIME_BEATS as i64)? as u32;
    let beat_type = parse_bounded(atom, beat_type, 1, 64)? as u32;
    if !TIME_BEAT_TYPES.contains(&beat_type) {
        return Err(TokenError::invalid(atom, "beat type must be a power of two"));
    }
    Ok(TimeSignature::new(beats, beat_type))
}

fn parse_duration(atom: &str, value: &str) -> Result<Fraction, TokenError> {
    let fraction: Fraction = value
        .parse()
        .map_err(|e: anyhow::Error| TokenError::invalid(atom, e.to_string()))?;
    if !fraction.terms_within(MAX_DURATION_TERM) {
        return Err(TokenError::invalid(
            atom,
            format!("terms must not exceed {}", MAX_DURATION_TERM),
        ));
    }
    Ok(fraction)
}

/// Parses `AinN`, returning `None` when the atom does not have that shape.
fn try_parse_ratio(atom: &str) -> Option<Result<Token, TokenError>> {
    let (actual, normal) = atom.split_once("in")?;
    let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !digits(actual) || !digits(normal) {
        return None;
    }
    Some(parse_ratio(atom, actual, normal))
}

fn parse_ratio(atom: &str, actual: &str, normal: &str) -> Result<Token, TokenError> {
    let actual = parse_bounded(atom, actual, 1, MAX_RATIO_TERM as i64)? as u32;
    let normal = parse_bounded(atom, normal, 1, MAX_RATIO_TERM as i64)? as u32;
    if actual.gcd(&normal) != 1 {
        return Err(TokenError::invalid(atom, "ratio is not reduced"));
    }
    Ok(Token::Ratio { actual, normal })
}

fn parse_named<T>(
    atom: &str,
    value: &str,
    from_name: fn(&str) -> Option<T>,
    wrap: fn(T) -> Token,
) -> Result<Token, TokenError> {
    from_name(value)
        .map(wrap)
        .ok_or_else(|| TokenError::invalid(atom, format!("unknown value \"{}\"", value)))
}

pub fn parse_token(atom: &str) -> Result<Token, TokenError> {
    let atom = atom.trim();

    match atom {
        "measure" => return Ok(Token::Measure),
        "grace" => return Ok(Token::Grace { slash: false }),
        "chord" => return Ok(Token::Chord),
        "rest" => return Ok(Token::Rest),
        "forward" => return Ok(Token::Forward),
        _ => {}
    }
    if let Some(articulation) = Articulation::from_name(atom) {
        return Ok(Token::Articulation(articulation));
    }

    if let Some((key, value)) = atom.split_once(':') {
        return match key {
            "staff" => Ok(Token::Staff(parse_bounded(atom, value, 1, MAX_STAVES as i64)? as u8)),
            "voice" => Ok(Token::Voice(parse_bounded(atom, value, 1, MAX_VOICE as i64)? as u8)),
            "clef" => Ok(Token::Clef(parse_clef(atom, value)?)),
            "key" => {
                let fifths = MAX_KEY_FIFTHS as i64;
                Ok(Token::Key(parse_bounded(atom, value, -fifths, fifths)? as i8))
            }
            "time" => Ok(Token::Time(parse_time(atom, value)?)),
            "dur" => Ok(Token::Duration(parse_duration(atom, value)?)),
            "grace" if value == "slash" => Ok(Token::Grace { slash: true }),
            "rest" if value == "measure" => Ok(Token::MeasureRest),
            "unpitched" => Tone::from_str(atom)
                .map(Token::Tone)
                .map_err(|e| TokenError::invalid(atom, e.to_string())),
            "stem" => parse_named(atom, value, Stem::from_name, Token::Stem),
            "accidental" => parse_named(atom, value, AccidentalKind::from_name, Token::Accidental),
            "beam" => parse_named(atom, value, BeamState::from_name, Token::Beam),
            "tie" => parse_named(atom, value, SpanState::from_name, Token::Tie),
            "slur" => parse_named(atom, value, SpanState::from_name, Token::Slur),
            "tuplet" => parse_named(atom, value, SpanState::from_name, Token::Tuplet),
            "tremolo" => parse_named(atom, value, TremoloKind::from_name, Token::Tremolo),
            _ => Err(TokenError::Unknown(atom.to_string())),
        };
    }

    if let Some(ratio) = try_parse_ratio(atom) {
        return ratio;
    }
    if let Ok((note_type, dots)) = parse_type_with_dots(atom) {
        return Ok(Token::Type { note_type, dots });
    }
    if let Ok(tone) = Tone::from_str(atom) {
        return Ok(Token::Tone(tone));
    }

    Err(TokenError::Unknown(atom.to_string()))
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_token(s)
    }
}
