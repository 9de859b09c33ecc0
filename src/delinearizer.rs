use crate::diagnostics::Diagnostics;
use crate::token_parser::parse_token;
use crate::types::duration::{Duration, NoteType, TimeModification, written_duration};
use crate::types::event::{
    Beam, BeamState, Event, Grace, Note, Rest, Slur, SpanState, TimeSignature, Tremolo, Tuplet,
};
use crate::types::fraction::Fraction;
use crate::types::pitch::Tone;
use crate::types::score::{MAX_STAVES, Measure, Part};
use crate::types::token::Token;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
enum PendingDuration {
    Typed { note_type: NoteType, dots: u8 },
    Exact(Fraction),
}

/// Prefix atoms collected for the next event head.
#[derive(Debug, Clone, Default)]
struct Pending {
    grace: Option<Grace>,
    chord: bool,
    duration: Option<PendingDuration>,
    ratio: Option<(u32, u32)>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.grace.is_none() && !self.chord && self.duration.is_none() && self.ratio.is_none()
    }
}

/// Open beams and tuplets of one voice. They may span barlines.
#[derive(Debug, Default)]
struct VoiceSpans {
    /// Beam level to the event that opened it.
    beams: BTreeMap<u8, Anchor>,
    /// Events that opened the tuplets still open, innermost last.
    tuplets: Vec<Anchor>,
}

#[derive(Debug, Clone, Copy)]
struct EventRef {
    staff: u8,
    voice: u8,
    index: usize,
}

/// An event anywhere in the part, `measure` being its position in `Part::measures`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    measure: usize,
    staff: u8,
    voice: u8,
    index: usize,
}

enum RestKind {
    Plain,
    Measure,
    Hidden,
}

/// Single-pass state machine turning any token sequence into a valid part.
pub struct Delinearizer<'a> {
    sink: &'a mut dyn Diagnostics,
    part: Part,
    measure: Option<Measure>,
    staff: u8,
    voice: u8,
    time: Option<TimeSignature>,
    pending: Pending,
    last: Option<EventRef>,
    /// Beam atoms already applied to `last`.
    beam_atoms: usize,
    spans: BTreeMap<(u8, u8), VoiceSpans>,
    open_ties: BTreeMap<(u8, u8), Vec<Tone>>,
    open_slurs: BTreeMap<(u8, u8), usize>,
    position: usize,
    current: String,
}

impl<'a> Delinearizer<'a> {
    pub fn new(sink: &'a mut dyn Diagnostics) -> Self {
        Self {
            sink,
            part: Part::new(),
            measure: None,
            staff: 1,
            voice: 1,
            time: None,
            pending: Pending::default(),
            last: None,
            beam_atoms: 0,
            spans: BTreeMap::new(),
            open_ties: BTreeMap::new(),
            open_slurs: BTreeMap::new(),
            position: 0,
            current: String::new(),
        }
    }

    fn report(&mut self, message: impl AsRef<str>) {
        let measure = self
            .measure
            .as_ref()
            .map(|m| m.index)
            .unwrap_or(self.part.measures.len());
        self.sink.report(format!(
            "measure {}, token #{} \"{}\": {}",
            measure,
            self.position,
            self.current,
            message.as_ref()
        ));
    }

    /// Reports an atom that could not be parsed.
    pub fn skip_atom(&mut self, position: usize, atom: &str, reason: impl AsRef<str>) {
        self.position = position;
        self.current = atom.to_string();
        self.report(format!("{}, skipped", reason.as_ref()));
    }

    pub fn feed(&mut self, position: usize, token: &Token) {
        self.position = position;
        self.current = token.to_string();

        match token {
            Token::Measure => {
                self.discard_pending();
                self.close_measure();
                self.open_measure();
            }
            Token::Staff(staff) => {
                self.discard_pending();
                if *staff == 0 || *staff > MAX_STAVES {
                    self.report("staff out of range, skipped");
                    return;
                }
                self.staff = *staff;
                self.voice = 1;
                self.last = None;
                self.measure_mut().staff_mut(*staff);
            }
            Token::Voice(voice) => {
                self.discard_pending();
                if *voice == 0 {
                    self.report("voice out of range, skipped");
                    return;
                }
                self.voice = *voice;
                self.last = None;
                let staff = self.staff;
                self.measure_mut().staff_mut(staff).voice_mut(*voice);
            }
            Token::Clef(clef) => {
                self.discard_pending();
                self.last = None;
                let staff = self.staff;
                self.measure_mut().attributes_mut().set_clef(staff, *clef);
            }
            Token::Key(fifths) => {
                self.discard_pending();
                self.last = None;
                self.measure_mut().attributes_mut().key = Some(*fifths);
            }
            Token::Time(time) => {
                self.discard_pending();
                self.last = None;
                self.time = Some(*time);
                self.measure_mut().attributes_mut().time = Some(*time);
            }
            Token::Type { note_type, dots } => self.set_duration(PendingDuration::Typed {
                note_type: *note_type,
                dots: *dots,
            }),
            Token::Duration(fraction) => {
                if *fraction < Fraction::zero() {
                    self.report("negative duration, skipped");
                    return;
                }
                self.set_duration(PendingDuration::Exact(fraction.clone()));
            }
            Token::Ratio { actual, normal } => {
                if self.pending.duration.is_none() {
                    self.report("ratio without a duration, skipped");
                    return;
                }
                self.pending.ratio = Some((*actual, *normal));
            }
            Token::Grace { slash } => self.pending.grace = Some(Grace { slash: *slash }),
            Token::Chord => self.pending.chord = true,
            Token::Tone(tone) => self.push_note(*tone),
            Token::Rest => self.push_rest(RestKind::Plain),
            Token::MeasureRest => self.push_rest(RestKind::Measure),
            Token::Forward => self.push_rest(RestKind::Hidden),
            Token::Stem(_)
            | Token::Accidental(_)
            | Token::Beam(_)
            | Token::Tie(_)
            | Token::Slur(_)
            | Token::Tuplet(_)
            | Token::Tremolo(_)
            | Token::Articulation(_) => self.apply_markup(token),
        }
    }

    pub fn finish(mut self) -> Part {
        self.discard_pending();
        self.close_measure();
        self.close_open_spans();

        let open_ties: Vec<String> = self
            .open_ties
            .iter()
            .flat_map(|((staff, voice), tones)| {
                tones
                    .iter()
                    .map(move |tone| format!("staff {} voice {} {}", staff, voice, tone))
            })
            .collect();
        for tie in open_ties {
            self.report(format!("tie on {} never stopped, kept", tie));
        }
        let open_slurs: Vec<((u8, u8), usize)> = self
            .open_slurs
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(key, count)| (*key, *count))
            .collect();
        for ((staff, voice), count) in open_slurs {
            self.report(format!(
                "{} slur(s) in staff {} voice {} never stopped, kept",
                count, staff, voice
            ));
        }

        debug!("Delinearized {} measures", self.part.measures.len());
        self.part
    }

    fn measure_mut(&mut self) -> &mut Measure {
        if self.measure.is_none() {
            self.report("content before the first measure, opening one");
            self.open_measure();
        }
        let index = self.part.measures.len() + 1;
        self.measure.get_or_insert_with(|| Measure::new(index))
    }

    fn open_measure(&mut self) {
        self.measure = Some(Measure::new(self.part.measures.len() + 1));
        self.staff = 1;
        self.voice = 1;
        self.last = None;
    }

    fn close_measure(&mut self) {
        let Some(mut measure) = self.measure.take() else {
            return;
        };
        measure.pad_voices();
        self.part.measures.push(measure);
        self.last = None;
    }

    /// Closes the beams and tuplets still open at the end of input, each at
    /// the last event of its voice.
    fn close_open_spans(&mut self) {
        let spans = std::mem::take(&mut self.spans);
        for spans in spans.into_values() {
            let mut messages = Vec::new();
            for (level, opener) in spans.beams {
                messages.push((opener, close_beam(&mut self.part, level, opener)));
            }
            for opener in spans.tuplets.into_iter().rev() {
                messages.push((opener, close_tuplet(&mut self.part, opener)));
            }
            for (opener, message) in messages {
                self.sink.report(format!(
                    "measure {}, staff {}, voice {}: {}",
                    opener.measure + 1,
                    opener.staff,
                    opener.voice,
                    message
                ));
            }
        }
    }

    fn discard_pending(&mut self) {
        if !self.pending.is_empty() {
            self.pending = Pending::default();
            self.report("event without a head discarded");
        }
    }

    fn set_duration(&mut self, duration: PendingDuration) {
        if self.pending.duration.is_some() {
            self.report("second duration for one event, replacing the first");
            self.pending.ratio = None;
        }
        self.pending.duration = Some(duration);
    }

    /// Takes the pending prefix, resolving its duration.
    fn take_prefix(&mut self) -> Option<(Pending, Option<NoteType>, u8, Fraction)> {
        let mut pending = std::mem::take(&mut self.pending);
        let Some(duration) = pending.duration.take() else {
            self.report("event head without a duration, skipped");
            return None;
        };
        let time_modification = pending
            .ratio
            .map(|(actual, normal)| TimeModification::new(actual, normal));
        let (note_type, dots, exact) = match duration {
            PendingDuration::Typed { note_type, dots } => (
                Some(note_type),
                dots,
                written_duration(note_type, dots, time_modification.as_ref()),
            ),
            PendingDuration::Exact(fraction) => (None, 0, fraction),
        };
        Some((pending, note_type, dots, exact))
    }

    /// Starts a new measure when the current voice already fills the time signature.
    fn break_if_full(&mut self) {
        let Some(limit) = self.time.and_then(|t| t.duration()) else {
            return;
        };
        if limit.is_zero() {
            return;
        }
        let (staff, voice) = (self.staff, self.voice);
        let filled = self
            .measure
            .as_ref()
            .and_then(|m| m.staves.iter().find(|s| s.number == staff))
            .and_then(|s| s.voices.iter().find(|v| v.number == voice))
            .and_then(|v| v.duration())
            .unwrap_or_default();
        if filled >= limit {
            self.report(format!(
                "voice already fills {}, starting a new measure",
                self.time.map(|t| t.to_string()).unwrap_or_default()
            ));
            self.close_measure();
            self.open_measure();
            self.staff = staff;
            self.voice = voice;
        }
    }

    fn place(&mut self, event: Event) {
        let advances = match &event {
            Event::Note(note) => note.advances(),
            _ => true,
        };
        if self.measure.is_none() {
            self.measure_mut();
        }
        if advances {
            self.break_if_full();
        }

        let (staff, voice) = (self.staff, self.voice);
        let events = &mut self.measure_mut().staff_mut(staff).voice_mut(voice).events;
        events.push(event);
        let index = events.len() - 1;
        self.last = Some(EventRef {
            staff,
            voice,
            index,
        });
        self.beam_atoms = 0;
    }

    fn last_in_voice_is_note(&self) -> bool {
        let (staff, voice) = (self.staff, self.voice);
        self.measure
            .as_ref()
            .and_then(|m| m.staves.iter().find(|s| s.number == staff))
            .and_then(|s| s.voices.iter().find(|v| v.number == voice))
            .and_then(|v| v.events.last())
            .is_some_and(|e| matches!(e, Event::Note(_)))
    }

    fn push_note(&mut self, tone: Tone) {
        let Some((pending, note_type, dots, exact)) = self.take_prefix() else {
            return;
        };

        let mut chord = pending.chord;
        if chord && !self.last_in_voice_is_note() {
            self.report("chord without a preceding note, played as a new note");
            chord = false;
        }

        let duration = if pending.grace.is_some() {
            Fraction::zero()
        } else {
            exact
        };
        let mut note = Note::new(tone, Duration::Exact(duration));
        note.note_type = note_type;
        note.dots = dots;
        note.time_modification = pending
            .ratio
            .map(|(actual, normal)| TimeModification::new(actual, normal));
        note.staff = self.staff;
        note.voice = self.voice;
        note.chord = chord;
        note.grace = pending.grace;

        self.place(Event::Note(note));
    }

    fn push_rest(&mut self, kind: RestKind) {
        let Some((pending, note_type, dots, exact)) = self.take_prefix() else {
            return;
        };
        if pending.grace.is_some() || pending.chord {
            self.report("grace or chord prefix on a rest, ignored");
        }

        let mut rest = Rest::new(Duration::Exact(exact));
        rest.note_type = note_type;
        rest.dots = dots;
        rest.time_modification = pending
            .ratio
            .map(|(actual, normal)| TimeModification::new(actual, normal));
        rest.staff = self.staff;
        rest.voice = self.voice;
        match kind {
            RestKind::Plain => {}
            RestKind::Measure => rest.measure = true,
            RestKind::Hidden => rest.hidden = true,
        }

        self.place(Event::Rest(rest));
    }

    fn apply_markup(&mut self, token: &Token) {
        let Some(target) = self.last else {
            self.report("no event to attach to, skipped");
            return;
        };
        let key = (target.staff, target.voice);
        let anchor = Anchor {
            measure: self.part.measures.len(),
            staff: target.staff,
            voice: target.voice,
            index: target.index,
        };

        let Some(event) = self
            .measure
            .as_mut()
            .and_then(|m| m.staves.iter_mut().find(|s| s.number == target.staff))
            .and_then(|s| s.voices.iter_mut().find(|v| v.number == target.voice))
            .and_then(|v| v.events.get_mut(target.index))
        else {
            self.report("no event to attach to, skipped");
            return;
        };

        if let Token::Tuplet(state) = token {
            let spans = self.spans.entry(key).or_default();
            let tuplets = match event {
                Event::Note(note) => &mut note.tuplets,
                Event::Rest(rest) => &mut rest.tuplets,
                _ => return,
            };
            match state {
                SpanState::Start => {
                    spans.tuplets.push(anchor);
                    tuplets.push(Tuplet {
                        number: Some(depth(spans.tuplets.len())),
                        ..Tuplet::new(SpanState::Start)
                    });
                }
                SpanState::Stop => {
                    if spans.tuplets.pop().is_none() {
                        self.report("no open tuplet to stop, dropped");
                        return;
                    }
                    tuplets.push(Tuplet {
                        number: Some(depth(spans.tuplets.len() + 1)),
                        ..Tuplet::new(SpanState::Stop)
                    });
                }
            }
            return;
        }

        let Event::Note(note) = event else {
            self.report("note markup on a rest, skipped");
            return;
        };

        match token {
            Token::Stem(stem) => note.stem = Some(*stem),
            Token::Accidental(kind) => note.accidental = Some(*kind),
            Token::Tremolo(kind) => {
                note.tremolo = Some(Tremolo {
                    kind: *kind,
                    marks: None,
                })
            }
            Token::Articulation(articulation) => note.articulations.push(*articulation),
            Token::Beam(state) => {
                self.beam_atoms += 1;
                let level = depth(self.beam_atoms);
                if note.chord {
                    // chord members follow the spans of the chord head
                    note.beams.push(Beam {
                        number: level,
                        state: *state,
                    });
                    return;
                }
                let spans = self.spans.entry(key).or_default();
                let problem = match state {
                    BeamState::Begin => {
                        let reopened = spans.beams.insert(level, anchor).is_some();
                        reopened.then_some("beam begins while the level is open")
                    }
                    BeamState::Continue => (!spans.beams.contains_key(&level))
                        .then_some("no open beam to continue, dropped"),
                    BeamState::End => spans
                        .beams
                        .remove(&level)
                        .is_none()
                        .then_some("no open beam to end, dropped"),
                    BeamState::ForwardHook | BeamState::BackwardHook => None,
                };
                let dropped = !matches!(state, BeamState::Begin) && problem.is_some();
                if !dropped {
                    note.beams.push(Beam {
                        number: level,
                        state: *state,
                    });
                }
                if let Some(problem) = problem {
                    self.report(problem);
                }
            }
            Token::Tie(state) => {
                note.ties.push(*state);
                let tone = note.tone;
                let open = self.open_ties.entry(key).or_default();
                match state {
                    SpanState::Start => open.push(tone),
                    SpanState::Stop => match open.iter().position(|t| *t == tone) {
                        Some(idx) => {
                            open.remove(idx);
                        }
                        None => self.report("tie stops without a start, kept"),
                    },
                }
            }
            Token::Slur(state) => {
                note.slurs.push(Slur {
                    number: None,
                    state: *state,
                });
                let open = self.open_slurs.entry(key).or_default();
                match state {
                    SpanState::Start => *open += 1,
                    SpanState::Stop if *open > 0 => *open -= 1,
                    SpanState::Stop => self.report("slur stops without a start, kept"),
                }
            }
            _ => {}
        }
    }
}

fn depth(count: usize) -> u8 {
    u8::try_from(count).unwrap_or(u8::MAX)
}

fn event_at(part: &Part, anchor: Anchor) -> Option<&Event> {
    part.measures
        .get(anchor.measure)?
        .staves
        .iter()
        .find(|s| s.number == anchor.staff)?
        .voices
        .iter()
        .find(|v| v.number == anchor.voice)?
        .events
        .get(anchor.index)
}

fn event_at_mut(part: &mut Part, anchor: Anchor) -> Option<&mut Event> {
    part.measures
        .get_mut(anchor.measure)?
        .staves
        .iter_mut()
        .find(|s| s.number == anchor.staff)?
        .voices
        .iter_mut()
        .find(|v| v.number == anchor.voice)?
        .events
        .get_mut(anchor.index)
}

/// Events of the anchor's voice after it, through the rest of the part.
fn positions_after(part: &Part, anchor: Anchor) -> Vec<Anchor> {
    let mut positions = Vec::new();
    for (measure, m) in part.measures.iter().enumerate().skip(anchor.measure) {
        let Some(events) = m
            .staves
            .iter()
            .find(|s| s.number == anchor.staff)
            .and_then(|s| s.voices.iter().find(|v| v.number == anchor.voice))
            .map(|v| &v.events)
        else {
            continue;
        };
        let first = if measure == anchor.measure {
            anchor.index + 1
        } else {
            0
        };
        positions.extend((first..events.len()).map(|index| Anchor {
            measure,
            index,
            ..anchor
        }));
    }
    positions
}

/// The chord members sounding with the note at `head`.
fn chord_members(part: &Part, head: Anchor) -> Vec<Anchor> {
    positions_after(part, head)
        .into_iter()
        .take_while(|a| matches!(event_at(part, *a), Some(Event::Note(n)) if n.chord))
        .collect()
}

/// Closes a beam level left open at the last regular note after its opener.
fn close_beam(part: &mut Part, level: u8, opener: Anchor) -> String {
    let closer = positions_after(part, opener)
        .into_iter()
        .rev()
        .find(|a| matches!(event_at(part, *a), Some(Event::Note(n)) if n.advances()));

    match closer {
        Some(closer) => {
            let members = chord_members(part, closer);
            if let Some(Event::Note(note)) = event_at_mut(part, closer) {
                match note.beams.iter_mut().find(|b| b.number == level) {
                    Some(beam) => beam.state = BeamState::End,
                    None => {
                        note.beams.push(Beam {
                            number: level,
                            state: BeamState::End,
                        });
                        note.beams.sort_by_key(|b| b.number);
                    }
                }
            }
            for member in members {
                if let Some(Event::Note(note)) = event_at_mut(part, member) {
                    if let Some(beam) = note.beams.iter_mut().find(|b| b.number == level) {
                        beam.state = BeamState::End;
                    }
                }
            }
            format!("beam level {} left open, ended at the last note", level)
        }
        None => {
            let members = chord_members(part, opener);
            for anchor in std::iter::once(opener).chain(members) {
                if let Some(Event::Note(note)) = event_at_mut(part, anchor) {
                    note.beams.retain(|b| b.number != level);
                }
            }
            format!("beam level {} opens at the last note, removed", level)
        }
    }
}

fn tuplets_mut(event: &mut Event) -> Option<&mut Vec<Tuplet>> {
    match event {
        Event::Note(note) => Some(&mut note.tuplets),
        Event::Rest(rest) => Some(&mut rest.tuplets),
        _ => None,
    }
}

/// Notes and rests written in the score. Padding and chord members never
/// close a tuplet.
fn can_close_tuplet(event: Option<&Event>) -> bool {
    match event {
        Some(Event::Note(note)) => note.advances(),
        Some(Event::Rest(rest)) => !rest.hidden,
        _ => false,
    }
}

/// Closes a tuplet left open at the last note or rest after its opener.
fn close_tuplet(part: &mut Part, opener: Anchor) -> String {
    let number = event_at(part, opener)
        .and_then(|e| match e {
            Event::Note(note) => note.tuplets.last(),
            Event::Rest(rest) => rest.tuplets.last(),
            _ => None,
        })
        .and_then(|t| t.number);

    let closer = positions_after(part, opener)
        .into_iter()
        .rev()
        .find(|a| can_close_tuplet(event_at(part, *a)));

    let closing = match closer {
        Some(anchor) => event_at_mut(part, anchor).and_then(tuplets_mut),
        None => None,
    };
    match closing {
        Some(tuplets) => {
            tuplets.push(Tuplet {
                number,
                ..Tuplet::new(SpanState::Stop)
            });
            "tuplet left open, stopped at the last event".to_string()
        }
        None => {
            if let Some(tuplets) = event_at_mut(part, opener).and_then(tuplets_mut) {
                if let Some(idx) = tuplets.iter().rposition(|t| t.state == SpanState::Start) {
                    tuplets.remove(idx);
                }
            }
            "tuplet opens at the last event, removed".to_string()
        }
    }
}

/// Decodes any token sequence into a valid part, reporting every repair.
pub fn delinearize(tokens: &[Token], sink: &mut dyn Diagnostics) -> Part {
    let mut delinearizer = Delinearizer::new(sink);
    for (position, token) in tokens.iter().enumerate() {
        delinearizer.feed(position, token);
    }
    delinearizer.finish()
}

/// Like [`delinearize`], skipping atoms that are not part of the alphabet.
pub fn delinearize_text(text: &str, sink: &mut dyn Diagnostics) -> Part {
    let mut delinearizer = Delinearizer::new(sink);
    for (position, atom) in text.split_whitespace().enumerate() {
        match parse_token(atom) {
            Ok(token) => delinearizer.feed(position, &token),
            Err(e) => delinearizer.skip_atom(position, atom, e.to_string()),
        }
    }
    delinearizer.finish()
}
