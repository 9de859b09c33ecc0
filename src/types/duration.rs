use crate::types::fraction::Fraction;
use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::str::FromStr;

pub const MAX_DOTS: u8 = 4;

/// Graphical note value, as written in `<type>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteType {
    Maxima,
    Long,
    Breve,
    Whole,
    Half,
    Quarter,
    Eighth,
    N16th,
    N32nd,
    N64th,
    N128th,
    N256th,
    N512th,
    N1024th,
}

impl NoteType {
    pub const ALL: [NoteType; 14] = [
        NoteType::Maxima,
        NoteType::Long,
        NoteType::Breve,
        NoteType::Whole,
        NoteType::Half,
        NoteType::Quarter,
        NoteType::Eighth,
        NoteType::N16th,
        NoteType::N32nd,
        NoteType::N64th,
        NoteType::N128th,
        NoteType::N256th,
        NoteType::N512th,
        NoteType::N1024th,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NoteType::Maxima => "maxima",
            NoteType::Long => "long",
            NoteType::Breve => "breve",
            NoteType::Whole => "whole",
            NoteType::Half => "half",
            NoteType::Quarter => "quarter",
            NoteType::Eighth => "eighth",
            NoteType::N16th => "16th",
            NoteType::N32nd => "32nd",
            NoteType::N64th => "64th",
            NoteType::N128th => "128th",
            NoteType::N256th => "256th",
            NoteType::N512th => "512th",
            NoteType::N1024th => "1024th",
        }
    }

    pub fn from_name(name: &str) -> Option<NoteType> {
        NoteType::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Undotted value as a fraction of a whole note.
    pub fn fraction(&self) -> Fraction {
        match self {
            NoteType::Maxima => Fraction::from_integer(8),
            NoteType::Long => Fraction::from_integer(4),
            NoteType::Breve => Fraction::from_integer(2),
            NoteType::Whole => Fraction::one(),
            NoteType::Half => Fraction::new(1, 2),
            NoteType::Quarter => Fraction::new(1, 4),
            NoteType::Eighth => Fraction::new(1, 8),
            NoteType::N16th => Fraction::new(1, 16),
            NoteType::N32nd => Fraction::new(1, 32),
            NoteType::N64th => Fraction::new(1, 64),
            NoteType::N128th => Fraction::new(1, 128),
            NoteType::N256th => Fraction::new(1, 256),
            NoteType::N512th => Fraction::new(1, 512),
            NoteType::N1024th => Fraction::new(1, 1024),
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for NoteType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        NoteType::from_name(s.trim()).ok_or_else(|| anyhow!("Unknown note type: {}", s))
    }
}

/// Multiplier applied by `dots` augmentation dots: (2^(d+1) - 1) / 2^d.
pub fn dot_factor(dots: u8) -> Fraction {
    let dots = dots.min(MAX_DOTS) as u32;
    let denom = 1i64 << dots;
    Fraction::new(2 * denom - 1, denom)
}

/// Tuplet ratio carried by a single note: `actual` notes in the time of `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeModification {
    pub actual_notes: u32,
    pub normal_notes: u32,
    pub normal_type: Option<NoteType>,
    pub normal_dots: u8,
}

impl TimeModification {
    pub fn new(actual_notes: u32, normal_notes: u32) -> Self {
        Self {
            actual_notes,
            normal_notes,
            normal_type: None,
            normal_dots: 0,
        }
    }

    /// Factor applied to the written value, normal / actual.
    pub fn factor(&self) -> Option<Fraction> {
        if self.actual_notes == 0 || self.normal_notes == 0 {
            return None;
        }
        Some(Fraction::new(
            self.normal_notes as i64,
            self.actual_notes as i64,
        ))
    }
}

/// Duration of a note, rest or cursor move.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Duration {
    /// Integer count relative to the divisions-per-quarter in effect.
    Divisions(u64),
    /// Exact fraction of a whole note.
    Exact(Fraction),
}

impl Duration {
    pub fn zero() -> Self {
        Duration::Exact(Fraction::zero())
    }

    pub fn exact(&self) -> Option<&Fraction> {
        match self {
            Duration::Exact(fraction) => Some(fraction),
            Duration::Divisions(_) => None,
        }
    }

    /// Resolves against `divisions` per quarter note.
    pub fn to_fraction(&self, divisions: u32) -> Fraction {
        match self {
            Duration::Exact(fraction) => fraction.clone(),
            Duration::Divisions(count) => {
                let divisions = divisions.max(1) as i64;
                Fraction::new(*count as i64, 4 * divisions)
            }
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duration::Divisions(count) => write!(f, "{}div", count),
            Duration::Exact(fraction) => write!(f, "{}", fraction),
        }
    }
}

/// Value written as type, dots and an optional tuplet ratio.
pub fn written_duration(
    note_type: NoteType,
    dots: u8,
    time_modification: Option<&TimeModification>,
) -> Fraction {
    let mut value = note_type.fraction() * dot_factor(dots);
    if let Some(factor) = time_modification.and_then(|m| m.factor()) {
        value = value * factor;
    }
    value
}

/// Whether the written type and dots spell `exact`. Grace notes take any type.
pub fn type_spells_duration(
    note_type: NoteType,
    dots: u8,
    exact: &Fraction,
    time_modification: Option<&TimeModification>,
    grace: bool,
) -> bool {
    dots <= MAX_DOTS && (grace || written_duration(note_type, dots, time_modification) == *exact)
}

/// Splits `quarter..` into the type and the dot count.
pub fn parse_type_with_dots(s: &str) -> Result<(NoteType, u8)> {
    let name = s.trim_end_matches('.');
    let dots = s.len() - name.len();
    if dots > MAX_DOTS as usize {
        bail!("Too many dots: {}", s);
    }
    Ok((name.parse()?, dots as u8))
}
