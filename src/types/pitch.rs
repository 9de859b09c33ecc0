use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::C,
        Step::D,
        Step::E,
        Step::F,
        Step::G,
        Step::A,
        Step::B,
    ];

    pub fn as_char(&self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }

    pub fn from_char(c: char) -> Option<Step> {
        match c {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.trim().chars();
        match (chars.next().and_then(Step::from_char), chars.next()) {
            (Some(step), None) => Ok(step),
            _ => Err(anyhow!("Invalid step: {}", s)),
        }
    }
}

pub const MIN_ALTER: i8 = -2;
pub const MAX_ALTER: i8 = 2;
pub const MAX_OCTAVE: i8 = 9;

pub fn alter_suffix(alter: i8) -> &'static str {
    match alter {
        -2 => "bb",
        -1 => "b",
        1 => "#",
        2 => "##",
        _ => "",
    }
}

/// Parses `<step><alter>` from the start of `s`, returning the remainder.
fn split_step_alter(s: &str) -> Result<(Step, i8, &str)> {
    let mut chars = s.chars();
    let step = chars
        .next()
        .and_then(Step::from_char)
        .ok_or_else(|| anyhow!("Invalid pitch: {}", s))?;
    let rest = &s[1..];
    let (alter, rest) = if let Some(r) = rest.strip_prefix("##") {
        (2, r)
    } else if let Some(r) = rest.strip_prefix('#') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix("bb") {
        (-2, r)
    } else if let Some(r) = rest.strip_prefix('b') {
        (-1, r)
    } else {
        (0, rest)
    };
    Ok((step, alter, rest))
}

fn parse_octave(s: &str, whole: &str) -> Result<i8> {
    if s.len() != 1 || !s.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid octave in {}", whole);
    }
    s.parse()
        .map_err(|_| anyhow!("Invalid octave in {}", whole))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub step: Step,
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Self {
            step,
            alter,
            octave,
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.step, alter_suffix(self.alter), self.octave)
    }
}

impl FromStr for Pitch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (step, alter, rest) = split_step_alter(s)?;
        let octave = parse_octave(rest, s)?;
        Ok(Pitch::new(step, alter, octave))
    }
}

/// What a note head sounds or shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Pitched(Pitch),
    /// Percussion-style note, only a staff position.
    Unpitched { step: Step, octave: i8 },
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tone::Pitched(pitch) => write!(f, "{}", pitch),
            Tone::Unpitched { step, octave } => write!(f, "unpitched:{}{}", step, octave),
        }
    }
}

impl FromStr for Tone {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(position) = s.strip_prefix("unpitched:") {
            let (step, alter, rest) = split_step_alter(position)?;
            if alter != 0 {
                bail!("Unpitched notes have no alteration: {}", s);
            }
            let octave = parse_octave(rest, s)?;
            return Ok(Tone::Unpitched { step, octave });
        }
        Ok(Tone::Pitched(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pitch() {
        assert_eq!("C4".parse::<Pitch>().unwrap(), Pitch::new(Step::C, 0, 4));
        assert_eq!("F#3".parse::<Pitch>().unwrap(), Pitch::new(Step::F, 1, 3));
        assert_eq!("Bbb2".parse::<Pitch>().unwrap(), Pitch::new(Step::B, -2, 2));
        assert_eq!("G##5".parse::<Pitch>().unwrap(), Pitch::new(Step::G, 2, 5));
        assert_eq!("Bb0".parse::<Pitch>().unwrap(), Pitch::new(Step::B, -1, 0));

        for text in ["C4", "F#3", "Bbb2", "G##5", "Eb7"] {
            assert_eq!(text.parse::<Pitch>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_parse_pitch_error() {
        assert!("".parse::<Pitch>().is_err());
        assert!("H4".parse::<Pitch>().is_err());
        assert!("c4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
        assert!("C10".parse::<Pitch>().is_err());
        assert!("C###4".parse::<Pitch>().is_err());
        assert!("Cx4".parse::<Pitch>().is_err());
        assert!("C-1".parse::<Pitch>().is_err());
    }

    #[test]
    fn test_tone() {
        assert_eq!(
            "unpitched:E4".parse::<Tone>().unwrap(),
            Tone::Unpitched {
                step: Step::E,
                octave: 4
            }
        );
        assert_eq!(
            Tone::Unpitched {
                step: Step::E,
                octave: 4
            }
            .to_string(),
            "unpitched:E4"
        );
        assert!("unpitched:E#4".parse::<Tone>().is_err());
        assert_eq!(
            "D5".parse::<Tone>().unwrap(),
            Tone::Pitched(Pitch::new(Step::D, 0, 5))
        );
    }
}
