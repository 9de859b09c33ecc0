use crate::types::duration::{Duration, NoteType, TimeModification};
use crate::types::event::{Event, Note, Rest, Tuplet};
use crate::types::score::{Measure, Part};
use std::fmt;

/// Ordered tree with a text label on every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledTree {
    pub label: String,
    pub children: Vec<LabelledTree>,
}

impl LabelledTree {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn node(label: impl Into<String>, children: Vec<LabelledTree>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    /// Number of nodes, this one included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(LabelledTree::size).sum::<usize>()
    }
}

impl fmt::Display for LabelledTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

fn duration_labels(
    labels: &mut Vec<String>,
    duration: &Duration,
    note_type: Option<NoteType>,
    dots: u8,
    time_modification: Option<&TimeModification>,
) {
    labels.push(format!("duration:{}", duration));
    if let Some(note_type) = note_type {
        labels.push(format!("type:{}", note_type));
    }
    if dots > 0 {
        labels.push(format!("dots:{}", dots));
    }
    if let Some(m) = time_modification {
        let mut label = format!("ratio:{}/{}", m.actual_notes, m.normal_notes);
        if let Some(normal_type) = m.normal_type {
            label.push_str(&format!(":{}{}", normal_type, ".".repeat(m.normal_dots as usize)));
        }
        labels.push(label);
    }
}

fn tuplet_label(tuplet: &Tuplet) -> String {
    let mut label = format!("tuplet:{}", tuplet.state);
    if let Some(number) = tuplet.number {
        label.push_str(&format!(":{}", number));
    }
    if let Some(bracket) = tuplet.bracket {
        label.push_str(if bracket { ":bracket" } else { ":no-bracket" });
    }
    if let Some(show) = &tuplet.show_number {
        label.push_str(&format!(":show-{}", show));
    }
    label
}

fn note_labels(note: &Note) -> Vec<String> {
    let mut labels = vec![format!("pitch:{}", note.tone)];
    duration_labels(
        &mut labels,
        &note.duration,
        note.note_type,
        note.dots,
        note.time_modification.as_ref(),
    );
    if note.chord {
        labels.push("chord".to_string());
    }
    if let Some(grace) = note.grace {
        labels.push(if grace.slash { "grace:slash" } else { "grace" }.to_string());
    }
    if let Some(stem) = note.stem {
        labels.push(format!("stem:{}", stem));
    }
    if let Some(accidental) = note.accidental {
        labels.push(format!("accidental:{}", accidental));
    }
    for beam in &note.beams {
        labels.push(format!("beam:{}:{}", beam.number, beam.state));
    }
    for tie in &note.ties {
        labels.push(format!("tie:{}", tie));
    }
    for slur in &note.slurs {
        match slur.number {
            Some(number) => labels.push(format!("slur:{}:{}", slur.state, number)),
            None => labels.push(format!("slur:{}", slur.state)),
        }
    }
    labels.extend(note.tuplets.iter().map(tuplet_label));
    if let Some(tremolo) = note.tremolo {
        match tremolo.marks {
            Some(marks) => labels.push(format!("tremolo:{}:{}", tremolo.kind, marks)),
            None => labels.push(format!("tremolo:{}", tremolo.kind)),
        }
    }
    labels.extend(note.articulations.iter().map(|a| a.name().to_string()));
    labels
}

fn rest_labels(rest: &Rest) -> Vec<String> {
    let mut labels = Vec::new();
    duration_labels(
        &mut labels,
        &rest.duration,
        rest.note_type,
        rest.dots,
        rest.time_modification.as_ref(),
    );
    if rest.measure {
        labels.push("measure".to_string());
    }
    if rest.hidden {
        labels.push("hidden".to_string());
    }
    labels.extend(rest.tuplets.iter().map(tuplet_label));
    labels
}

fn event_labels(event: &Event) -> Vec<String> {
    match event {
        Event::Note(note) => note_labels(note),
        Event::Rest(rest) => rest_labels(rest),
        Event::Backup(duration) => vec![format!("duration:{}", duration)],
        Event::Forward(forward) => {
            let mut labels = vec![format!("duration:{}", forward.duration)];
            labels.extend(forward.voice.map(|v| format!("voice:{}", v)));
            labels.extend(forward.staff.map(|s| format!("staff:{}", s)));
            labels
        }
        Event::Attributes(attributes) => {
            let mut labels = Vec::new();
            labels.extend(attributes.divisions.map(|d| format!("divisions:{}", d)));
            labels.extend(attributes.key.map(|k| format!("key:{}", k)));
            labels.extend(attributes.time.map(|t| format!("time:{}", t)));
            labels.extend(
                attributes
                    .clefs
                    .iter()
                    .map(|c| format!("clef:{}:{}", c.staff, c.clef)),
            );
            labels
        }
        Event::Direction(direction) => {
            let mut labels = vec![format!("kind:{}", direction.kind)];
            labels.extend(direction.staff.map(|s| format!("staff:{}", s)));
            labels.extend(direction.placement.as_ref().map(|p| format!("placement:{}", p)));
            labels.extend(direction.text.as_ref().map(|t| format!("text:{}", t)));
            labels
        }
        Event::Barline(barline) => {
            let mut labels = vec![format!("location:{}", barline.location)];
            labels.extend(barline.style.as_ref().map(|s| format!("style:{}", s)));
            labels.extend(barline.repeat.as_ref().map(|r| format!("repeat:{}", r)));
            labels
        }
        Event::Harmony(harmony) => vec![
            format!("root:{}{}", harmony.root, crate::types::pitch::alter_suffix(harmony.root_alter)),
            format!("kind:{}", harmony.kind),
        ],
        Event::Print(print) => {
            let mut labels = Vec::new();
            if print.new_system {
                labels.push("new-system".to_string());
            }
            if print.new_page {
                labels.push("new-page".to_string());
            }
            labels
        }
    }
}

pub fn event_tree(event: &Event) -> LabelledTree {
    LabelledTree::node(
        event.kind_name(),
        event_labels(event).into_iter().map(LabelledTree::leaf).collect(),
    )
}

pub fn measure_tree(measure: &Measure) -> LabelledTree {
    let mut children: Vec<LabelledTree> = measure.header.iter().map(event_tree).collect();
    for staff in &measure.staves {
        let voices = staff
            .voices
            .iter()
            .map(|voice| {
                LabelledTree::node(
                    format!("voice:{}", voice.number),
                    voice.events.iter().map(event_tree).collect(),
                )
            })
            .collect();
        children.push(LabelledTree::node(format!("staff:{}", staff.number), voices));
    }
    LabelledTree::node("measure", children)
}

/// Labelled tree compared by the evaluator: `part` → `measure` → header
/// events and `staff:S` → `voice:V` → events, one leaf per event attribute.
pub fn part_tree(part: &Part) -> LabelledTree {
    LabelledTree::node("part", part.measures.iter().map(measure_tree).collect())
}
