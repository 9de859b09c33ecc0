use crate::types::duration::{Duration, NoteType, TimeModification};
use crate::types::fraction::Fraction;
use crate::types::pitch::{Step, Tone};
use std::fmt;

/// Implements `name()`, `from_name()` and `ALL` for a fieldless markup enum.
macro_rules! named_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_name(name: &str) -> Option<$name> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }
    };
}

named_enum!(Stem {
    Up => "up",
    Down => "down",
    None => "none",
    Double => "double",
});

named_enum!(AccidentalKind {
    Sharp => "sharp",
    Flat => "flat",
    Natural => "natural",
    DoubleSharp => "double-sharp",
    FlatFlat => "flat-flat",
});

named_enum!(BeamState {
    Begin => "begin",
    Continue => "continue",
    End => "end",
    ForwardHook => "forward-hook",
    BackwardHook => "backward-hook",
});

named_enum!(SpanState {
    Start => "start",
    Stop => "stop",
});

named_enum!(TremoloKind {
    Single => "single",
    Start => "start",
    Stop => "stop",
});

named_enum!(Articulation {
    Staccato => "staccato",
    Accent => "accent",
    Tenuto => "tenuto",
    Staccatissimo => "staccatissimo",
    StrongAccent => "strong-accent",
    Fermata => "fermata",
});

named_enum!(BarlineLocation {
    Left => "left",
    Right => "right",
    Middle => "middle",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Beam {
    /// Beam level, 1 is the outermost (eighth) beam.
    pub number: u8,
    pub state: BeamState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slur {
    pub number: Option<u8>,
    pub state: SpanState,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuplet {
    pub number: Option<u8>,
    pub state: SpanState,
    pub bracket: Option<bool>,
    pub show_number: Option<String>,
}

impl Tuplet {
    pub fn new(state: SpanState) -> Self {
        Self {
            number: None,
            state,
            bracket: None,
            show_number: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tremolo {
    pub kind: TremoloKind,
    pub marks: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grace {
    pub slash: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Note {
    pub tone: Tone,
    /// Zero for grace notes.
    pub duration: Duration,
    pub note_type: Option<NoteType>,
    pub dots: u8,
    pub time_modification: Option<TimeModification>,
    pub voice: u8,
    pub staff: u8,
    /// Sounds together with the preceding note of the same voice.
    pub chord: bool,
    pub grace: Option<Grace>,
    pub stem: Option<Stem>,
    pub accidental: Option<AccidentalKind>,
    pub beams: Vec<Beam>,
    pub ties: Vec<SpanState>,
    pub slurs: Vec<Slur>,
    pub tuplets: Vec<Tuplet>,
    pub tremolo: Option<Tremolo>,
    pub articulations: Vec<Articulation>,
}

impl Note {
    pub fn new(tone: Tone, duration: Duration) -> Self {
        Self {
            tone,
            duration,
            note_type: None,
            dots: 0,
            time_modification: None,
            voice: 1,
            staff: 1,
            chord: false,
            grace: None,
            stem: None,
            accidental: None,
            beams: Vec::new(),
            ties: Vec::new(),
            slurs: Vec::new(),
            tuplets: Vec::new(),
            tremolo: None,
            articulations: Vec::new(),
        }
    }

    /// Whether the note moves its voice forward in time.
    pub fn advances(&self) -> bool {
        !self.chord && self.grace.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rest {
    pub duration: Duration,
    pub note_type: Option<NoteType>,
    pub dots: u8,
    pub time_modification: Option<TimeModification>,
    pub voice: u8,
    pub staff: u8,
    pub tuplets: Vec<Tuplet>,
    /// Whole-measure rest.
    pub measure: bool,
    /// Not printed; fills a gap in the voice.
    pub hidden: bool,
}

impl Rest {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            note_type: None,
            dots: 0,
            time_modification: None,
            voice: 1,
            staff: 1,
            tuplets: Vec::new(),
            measure: false,
            hidden: false,
        }
    }

    pub fn hidden(duration: Duration, staff: u8, voice: u8) -> Self {
        Self {
            staff,
            voice,
            hidden: true,
            ..Self::new(duration)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Forward {
    pub duration: Duration,
    pub voice: Option<u8>,
    pub staff: Option<u8>,
}

named_enum!(ClefSign {
    G => "G",
    F => "F",
    C => "C",
    Percussion => "percussion",
    Tab => "TAB",
    Jianpu => "jianpu",
    Blank => "none",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Clef {
    pub sign: ClefSign,
    pub line: Option<u8>,
}

impl Clef {
    pub fn new(sign: ClefSign, line: Option<u8>) -> Self {
        Self { sign, line }
    }

    pub fn treble() -> Self {
        Self::new(ClefSign::G, Some(2))
    }

    pub fn bass() -> Self {
        Self::new(ClefSign::F, Some(4))
    }
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}{}", self.sign, line),
            None => write!(f, "{}", self.sign),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaffClef {
    pub staff: u8,
    pub clef: Clef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl TimeSignature {
    pub fn new(beats: u32, beat_type: u32) -> Self {
        Self { beats, beat_type }
    }

    /// Measure length as a fraction of a whole note.
    pub fn duration(&self) -> Option<Fraction> {
        if self.beat_type == 0 {
            return None;
        }
        Some(Fraction::new(self.beats as i64, self.beat_type as i64))
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Attributes {
    pub divisions: Option<u32>,
    /// Key signature as a position on the circle of fifths.
    pub key: Option<i8>,
    pub time: Option<TimeSignature>,
    /// Sorted by staff, at most one per staff.
    pub clefs: Vec<StaffClef>,
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.divisions.is_none() && self.key.is_none() && self.time.is_none() && self.clefs.is_empty()
    }

    pub fn clef(&self, staff: u8) -> Option<&Clef> {
        self.clefs
            .iter()
            .find(|c| c.staff == staff)
            .map(|c| &c.clef)
    }

    /// Replaces the clef of `staff`, returning the previous one.
    pub fn set_clef(&mut self, staff: u8, clef: Clef) -> Option<Clef> {
        match self.clefs.binary_search_by_key(&staff, |c| c.staff) {
            Ok(idx) => Some(std::mem::replace(&mut self.clefs[idx].clef, clef)),
            Err(idx) => {
                self.clefs.insert(idx, StaffClef { staff, clef });
                None
            }
        }
    }

    /// Overlays every value present in `other`.
    pub fn merge(&mut self, other: Attributes) {
        if other.divisions.is_some() {
            self.divisions = other.divisions;
        }
        if other.key.is_some() {
            self.key = other.key;
        }
        if other.time.is_some() {
            self.time = other.time;
        }
        for staff_clef in other.clefs {
            self.set_clef(staff_clef.staff, staff_clef.clef);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Direction {
    pub staff: Option<u8>,
    pub placement: Option<String>,
    /// Name of the direction type, e.g. `words`, `dynamics`, `wedge`.
    pub kind: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barline {
    pub location: BarlineLocation,
    pub style: Option<String>,
    pub repeat: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Harmony {
    pub root: Step,
    pub root_alter: i8,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Print {
    pub new_system: bool,
    pub new_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    Note(Note),
    Rest(Rest),
    /// Moves the measure cursor back; only exists before voices are assembled.
    Backup(Duration),
    /// Moves the measure cursor ahead; only exists before voices are assembled.
    Forward(Forward),
    Attributes(Attributes),
    Direction(Direction),
    Barline(Barline),
    Harmony(Harmony),
    Print(Print),
}

impl Event {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::Note(_) => "note",
            Event::Rest(_) => "rest",
            Event::Backup(_) => "backup",
            Event::Forward(_) => "forward",
            Event::Attributes(_) => "attributes",
            Event::Direction(_) => "direction",
            Event::Barline(_) => "barline",
            Event::Harmony(_) => "harmony",
            Event::Print(_) => "print",
        }
    }

    /// Kinds that live in a measure header rather than in a voice.
    pub fn is_header(&self) -> bool {
        match self {
            Event::Attributes(_)
            | Event::Direction(_)
            | Event::Barline(_)
            | Event::Harmony(_)
            | Event::Print(_) => true,
            Event::Note(_) | Event::Rest(_) | Event::Backup(_) | Event::Forward(_) => false,
        }
    }

    pub fn duration(&self) -> Option<&Duration> {
        match self {
            Event::Note(note) => Some(&note.duration),
            Event::Rest(rest) => Some(&rest.duration),
            Event::Backup(duration) => Some(duration),
            Event::Forward(forward) => Some(&forward.duration),
            Event::Attributes(_)
            | Event::Direction(_)
            | Event::Barline(_)
            | Event::Harmony(_)
            | Event::Print(_) => None,
        }
    }

    pub fn duration_mut(&mut self) -> Option<&mut Duration> {
        match self {
            Event::Note(note) => Some(&mut note.duration),
            Event::Rest(rest) => Some(&mut rest.duration),
            Event::Backup(duration) => Some(duration),
            Event::Forward(forward) => Some(&mut forward.duration),
            Event::Attributes(_)
            | Event::Direction(_)
            | Event::Barline(_)
            | Event::Harmony(_)
            | Event::Print(_) => None,
        }
    }

    /// Time this event occupies in its voice, if it is exact.
    pub fn occupied(&self) -> Option<Fraction> {
        match self {
            Event::Note(note) if !note.advances() => Some(Fraction::zero()),
            Event::Note(note) => note.duration.exact().cloned(),
            Event::Rest(rest) => rest.duration.exact().cloned(),
            Event::Backup(_)
            | Event::Forward(_)
            | Event::Attributes(_)
            | Event::Direction(_)
            | Event::Barline(_)
            | Event::Harmony(_)
            | Event::Print(_) => Some(Fraction::zero()),
        }
    }

    /// Staff and voice a voice event claims to belong to.
    pub fn placement(&self) -> Option<(u8, u8)> {
        match self {
            Event::Note(note) => Some((note.staff, note.voice)),
            Event::Rest(rest) => Some((rest.staff, rest.voice)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pitch::Pitch;

    #[test]
    fn test_named_enums() {
        for state in BeamState::ALL {
            assert_eq!(BeamState::from_name(state.name()), Some(*state));
        }
        assert_eq!(Articulation::from_name("strong-accent"), Some(Articulation::StrongAccent));
        assert_eq!(Stem::from_name("sideways"), None);
    }

    #[test]
    fn test_attributes_merge() {
        let mut attributes = Attributes {
            divisions: Some(2),
            key: Some(0),
            ..Default::default()
        };
        assert_eq!(attributes.set_clef(2, Clef::bass()), None);
        assert_eq!(attributes.set_clef(1, Clef::treble()), None);
        assert_eq!(attributes.clefs[0].staff, 1);

        let mut change = Attributes::default();
        change.set_clef(2, Clef::treble());
        change.key = Some(-3);
        attributes.merge(change);

        assert_eq!(attributes.key, Some(-3));
        assert_eq!(attributes.divisions, Some(2));
        assert_eq!(attributes.clef(2), Some(&Clef::treble()));
        assert_eq!(attributes.clefs.len(), 2);
        assert!(!attributes.is_empty());
        assert!(Attributes::default().is_empty());
    }

    #[test]
    fn test_occupied() {
        let mut note = Note::new(
            Tone::Pitched(Pitch::new(Step::C, 0, 4)),
            Duration::Exact(Fraction::new(1, 4)),
        );
        assert_eq!(Event::Note(note.clone()).occupied(), Some(Fraction::new(1, 4)));
        note.chord = true;
        assert_eq!(Event::Note(note).occupied(), Some(Fraction::zero()));
        assert_eq!(Event::Rest(Rest::new(Duration::Divisions(2))).occupied(), None);
        assert_eq!(TimeSignature::new(6, 8).duration(), Some(Fraction::new(3, 4)));
    }
}
