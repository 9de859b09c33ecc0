use crate::assemble::assemble_measure;
use crate::types::duration::{Duration, NoteType, TimeModification};
use crate::types::event::{
    AccidentalKind, Articulation, Attributes, Barline, BarlineLocation, Beam, BeamState, Clef,
    ClefSign, Direction, Event, Forward, Grace, Harmony, Note, Print, Rest, Slur, SpanState, Stem,
    TimeSignature, Tremolo, TremoloKind, Tuplet,
};
use crate::types::pitch::{MAX_ALTER, MAX_OCTAVE, MIN_ALTER, Pitch, Step, Tone};
use crate::types::score::{MAX_STAVES, Part};
use anyhow::{Context, Result, anyhow, bail};
use roxmltree::{Document, Node};
use std::str::FromStr;
use tracing::{debug, warn};

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

fn parse_child<T: FromStr>(node: Node, name: &str) -> Result<Option<T>> {
    match child_text(node, name) {
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid <{}> value \"{}\"", name, text)),
        None => Ok(None),
    }
}

fn is_yes(node: Node, attribute: &str) -> bool {
    node.attribute(attribute) == Some("yes")
}

fn parse_step(text: &str) -> Result<Step> {
    text.parse()
        .with_context(|| format!("Invalid step \"{}\"", text))
}

fn parse_span(text: &str) -> Option<SpanState> {
    SpanState::from_name(text)
}

fn read_attributes(node: Node) -> Result<Attributes> {
    let mut attributes = Attributes {
        divisions: parse_child(node, "divisions")?,
        ..Default::default()
    };

    if let Some(key) = child(node, "key") {
        attributes.key = parse_child(key, "fifths")?;
    }

    if let Some(time) = child(node, "time") {
        let beats: Option<u32> = child_text(time, "beats").and_then(|t| t.parse().ok());
        let beat_type: Option<u32> = child_text(time, "beat-type").and_then(|t| t.parse().ok());
        match (beats, beat_type) {
            (Some(beats), Some(beat_type)) => {
                attributes.time = Some(TimeSignature::new(beats, beat_type))
            }
            _ => warn!("Unsupported time signature, ignored"),
        }
    }

    for clef in children(node, "clef") {
        let staff: u8 = match clef.attribute("number") {
            Some(number) => number
                .parse()
                .with_context(|| format!("Invalid clef number \"{}\"", number))?,
            None => 1,
        };
        let sign = child_text(clef, "sign").unwrap_or("G");
        let sign = ClefSign::from_name(sign)
            .ok_or_else(|| anyhow!("Unknown clef sign \"{}\"", sign))?;
        let line: Option<u8> = parse_child(clef, "line")?;
        attributes.set_clef(staff, Clef::new(sign, line));
    }

    Ok(attributes)
}

fn check_octave(octave: i8) -> Result<i8> {
    if !(0..=MAX_OCTAVE).contains(&octave) {
        bail!("Octave {} out of range 0..={}", octave, MAX_OCTAVE);
    }
    Ok(octave)
}

fn read_tone(node: Node) -> Result<Option<Tone>> {
    if let Some(pitch) = child(node, "pitch") {
        let step = parse_step(child_text(pitch, "step").unwrap_or_default())?;
        let alter: f64 = parse_child(pitch, "alter")?.unwrap_or(0.0);
        let octave = check_octave(parse_child(pitch, "octave")?.context("Pitch without <octave>")?)?;
        let rounded = alter.round().clamp(MIN_ALTER as f64, MAX_ALTER as f64) as i8;
        if rounded as f64 != alter.round() {
            warn!("Alter {} out of range, clamped to {}", alter, rounded);
        }
        return Ok(Some(Tone::Pitched(Pitch::new(step, rounded, octave))));
    }
    if let Some(unpitched) = child(node, "unpitched") {
        let step = parse_step(child_text(unpitched, "display-step").unwrap_or("E"))?;
        let octave = check_octave(parse_child(unpitched, "display-octave")?.unwrap_or(4))?;
        return Ok(Some(Tone::Unpitched { step, octave }));
    }
    Ok(None)
}

fn read_time_modification(node: Node) -> Result<Option<TimeModification>> {
    let Some(modification) = child(node, "time-modification") else {
        return Ok(None);
    };
    Ok(Some(TimeModification {
        actual_notes: parse_child(modification, "actual-notes")?.unwrap_or(1),
        normal_notes: parse_child(modification, "normal-notes")?.unwrap_or(1),
        normal_type: child_text(modification, "normal-type").and_then(NoteType::from_name),
        normal_dots: children(modification, "normal-dot").count() as u8,
    }))
}

fn read_tuplets(notations: Option<Node>) -> Vec<Tuplet> {
    let Some(notations) = notations else {
        return Vec::new();
    };
    children(notations, "tuplet")
        .filter_map(|tuplet| {
            let state = parse_span(tuplet.attribute("type")?)?;
            Some(Tuplet {
                number: tuplet.attribute("number").and_then(|n| n.parse().ok()),
                state,
                bracket: tuplet.attribute("bracket").map(|b| b == "yes"),
                show_number: tuplet.attribute("show-number").map(str::to_string),
            })
        })
        .collect()
}

fn read_rest(node: Node, rest_node: Node, duration: Duration) -> Result<Rest> {
    let mut rest = Rest::new(duration);
    rest.note_type = child_text(node, "type").and_then(NoteType::from_name);
    rest.dots = children(node, "dot").count() as u8;
    rest.time_modification = read_time_modification(node)?;
    rest.voice = parse_child(node, "voice")?.unwrap_or(1);
    rest.staff = parse_child(node, "staff")?.unwrap_or(1);
    rest.tuplets = read_tuplets(child(node, "notations"));
    rest.measure = is_yes(rest_node, "measure");
    rest.hidden = node.attribute("print-object") == Some("no");
    Ok(rest)
}

fn read_note_markup(node: Node, note: &mut Note) {
    note.stem = child_text(node, "stem").and_then(Stem::from_name);
    note.accidental = child_text(node, "accidental").and_then(AccidentalKind::from_name);

    for beam in children(node, "beam") {
        let number = beam
            .attribute("number")
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        if let Some(state) = beam.text().map(str::trim).and_then(BeamState::from_name) {
            note.beams.push(Beam { number, state });
        }
    }
    note.beams.sort_by_key(|b| b.number);

    note.ties = children(node, "tie")
        .filter_map(|tie| parse_span(tie.attribute("type")?))
        .collect();

    let Some(notations) = child(node, "notations") else {
        return;
    };

    if note.ties.is_empty() {
        note.ties = children(notations, "tied")
            .filter_map(|tied| parse_span(tied.attribute("type")?))
            .collect();
    }

    note.slurs = children(notations, "slur")
        .filter_map(|slur| {
            let state = parse_span(slur.attribute("type")?)?;
            Some(Slur {
                number: slur.attribute("number").and_then(|n| n.parse().ok()),
                state,
            })
        })
        .collect();

    note.tuplets = read_tuplets(Some(notations));

    if let Some(tremolo) = child(notations, "ornaments").and_then(|o| child(o, "tremolo")) {
        let kind = tremolo
            .attribute("type")
            .and_then(TremoloKind::from_name)
            .unwrap_or(TremoloKind::Single);
        note.tremolo = Some(Tremolo {
            kind,
            marks: tremolo.text().and_then(|t| t.trim().parse().ok()),
        });
    }

    if let Some(articulations) = child(notations, "articulations") {
        note.articulations.extend(
            articulations
                .children()
                .filter(|n| n.is_element())
                .filter_map(|n| Articulation::from_name(n.tag_name().name())),
        );
    }
    if child(notations, "fermata").is_some() {
        note.articulations.push(Articulation::Fermata);
    }
}

fn read_note(node: Node) -> Result<Event> {
    let duration = Duration::Divisions(parse_child(node, "duration")?.unwrap_or(0));

    if let Some(rest_node) = child(node, "rest") {
        return Ok(Event::Rest(read_rest(node, rest_node, duration)?));
    }

    let tone = read_tone(node)?.context("Note without pitch, unpitched or rest")?;
    let mut note = Note::new(tone, duration);
    note.note_type = child_text(node, "type").and_then(NoteType::from_name);
    note.dots = children(node, "dot").count() as u8;
    note.time_modification = read_time_modification(node)?;
    note.voice = parse_child(node, "voice")?.unwrap_or(1);
    note.staff = parse_child(node, "staff")?.unwrap_or(1);
    note.chord = child(node, "chord").is_some();
    note.grace = child(node, "grace").map(|grace| Grace {
        slash: is_yes(grace, "slash"),
    });
    if note.grace.is_some() {
        note.duration = Duration::Divisions(0);
    }
    read_note_markup(node, &mut note);

    Ok(Event::Note(note))
}

fn read_direction(node: Node) -> Result<Direction> {
    let kind_node = child(node, "direction-type")
        .and_then(|t| t.children().find(|n| n.is_element()));
    Ok(Direction {
        staff: parse_child(node, "staff")?,
        placement: node.attribute("placement").map(str::to_string),
        kind: kind_node
            .map(|n| n.tag_name().name().to_string())
            .unwrap_or_default(),
        text: kind_node
            .and_then(|n| {
                n.text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .or_else(|| n.children().find(|c| c.is_element()).map(|c| c.tag_name().name()))
            })
            .map(str::to_string),
    })
}

fn read_barline(node: Node) -> Barline {
    Barline {
        location: node
            .attribute("location")
            .and_then(BarlineLocation::from_name)
            .unwrap_or(BarlineLocation::Right),
        style: child_text(node, "bar-style").map(str::to_string),
        repeat: child(node, "repeat")
            .and_then(|r| r.attribute("direction"))
            .map(str::to_string),
    }
}

fn read_harmony(node: Node) -> Result<Harmony> {
    let root = child(node, "root");
    let step = root.and_then(|r| child_text(r, "root-step")).unwrap_or("C");
    let alter: f64 = match root {
        Some(root) => parse_child(root, "root-alter")?.unwrap_or(0.0),
        None => 0.0,
    };
    Ok(Harmony {
        root: parse_step(step)?,
        root_alter: alter.round() as i8,
        kind: child_text(node, "kind").unwrap_or_default().to_string(),
    })
}

fn read_measure_stream(measure: Node) -> Result<Vec<Event>> {
    let mut stream = Vec::new();
    for node in measure.children().filter(|n| n.is_element()) {
        let event = match node.tag_name().name() {
            "attributes" => Event::Attributes(read_attributes(node)?),
            "note" => read_note(node)?,
            "backup" => Event::Backup(Duration::Divisions(
                parse_child(node, "duration")?.unwrap_or(0),
            )),
            "forward" => Event::Forward(Forward {
                duration: Duration::Divisions(parse_child(node, "duration")?.unwrap_or(0)),
                voice: parse_child(node, "voice")?,
                staff: parse_child(node, "staff")?,
            }),
            "direction" => Event::Direction(read_direction(node)?),
            "barline" => Event::Barline(read_barline(node)),
            "harmony" => Event::Harmony(read_harmony(node)?),
            "print" => Event::Print(Print {
                new_system: is_yes(node, "new-system"),
                new_page: is_yes(node, "new-page"),
            }),
            other => {
                debug!("Skipping <{}>", other);
                continue;
            }
        };
        stream.push(event);
    }
    Ok(stream)
}

fn staff_count(part: Node) -> Result<u8> {
    let mut count = 1u8;
    for node in part.descendants() {
        if !(node.has_tag_name("staves") || node.has_tag_name("staff")) {
            continue;
        }
        if let Some(text) = node.text() {
            let value: u8 = text
                .trim()
                .parse()
                .with_context(|| format!("Invalid staff number \"{}\"", text))?;
            count = count.max(value);
        }
    }
    if count > MAX_STAVES {
        bail!("Part has {} staves, at most {} are supported", count, MAX_STAVES);
    }
    Ok(count)
}

/// Reads the only part of a `score-partwise` document. Durations stay in divisions.
pub fn read_part(xml: &str) -> Result<Part> {
    let document = Document::parse(xml).context("Invalid XML")?;
    let root = document.root_element();
    if !root.has_tag_name("score-partwise") {
        bail!(
            "Expected <score-partwise>, found <{}>",
            root.tag_name().name()
        );
    }

    let parts: Vec<Node> = children(root, "part").collect();
    let [part_node] = parts.as_slice() else {
        bail!("Expected exactly one <part>, found {}", parts.len());
    };

    let staff_count = staff_count(*part_node)?;
    let mut divisions = None;
    let mut part = Part::new();
    for (position, measure) in children(*part_node, "measure").enumerate() {
        let stream = read_measure_stream(measure).with_context(|| {
            format!(
                "Measure {}",
                measure.attribute("number").unwrap_or("?")
            )
        })?;
        part.measures
            .push(assemble_measure(position + 1, stream, staff_count, &mut divisions));
    }

    debug!(
        "Read {} measures on {} staves",
        part.measures.len(),
        staff_count
    );
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linearizer::linearize;
    use crate::sequence::TokenSequence;
    use crate::transforms::to_fractional;
    use pretty_assertions::assert_eq;

    const GRANDSTAFF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <print new-system="yes"/>
      <attributes>
        <divisions>2</divisions>
        <key><fifths>-1</fifths></key>
        <time><beats>2</beats><beat-type>4</beat-type></time>
        <staves>2</staves>
        <clef number="1"><sign>G</sign><line>2</line></clef>
        <clef number="2"><sign>F</sign><line>4</line></clef>
      </attributes>
      <direction placement="below">
        <direction-type><dynamics><p/></dynamics></direction-type>
        <staff>1</staff>
      </direction>
      <note>
        <pitch><step>B</step><alter>-1</alter><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>eighth</type>
        <stem>up</stem><staff>1</staff><beam number="1">begin</beam>
        <notations><slur type="start" number="1"/><articulations><staccato/></articulations></notations>
      </note>
      <note>
        <pitch><step>A</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>eighth</type>
        <stem>up</stem><staff>1</staff><beam number="1">end</beam>
        <notations><slur type="stop" number="1"/></notations>
      </note>
      <note>
        <pitch><step>F</step><octave>4</octave></pitch>
        <duration>2</duration><tie type="start"/><voice>1</voice><type>quarter</type>
        <staff>1</staff>
      </note>
      <note>
        <chord/>
        <pitch><step>C</step><octave>5</octave></pitch>
        <duration>2</duration><voice>1</voice><type>quarter</type><staff>1</staff>
      </note>
      <backup><duration>4</duration></backup>
      <note>
        <rest measure="yes"/>
        <duration>4</duration><voice>5</voice><staff>2</staff>
      </note>
      <barline location="right"><bar-style>light-heavy</bar-style></barline>
    </measure>
  </part>
</score-partwise>"#;

    #[test]
    fn test_read_grandstaff() {
        let part = read_part(GRANDSTAFF).unwrap();
        assert_eq!(part.measures.len(), 1);
        let measure = &part.measures[0];
        assert_eq!(
            measure.header.iter().map(|e| e.kind_name()).collect::<Vec<_>>(),
            vec!["attributes", "print", "direction", "barline"]
        );
        assert_eq!(measure.staves.len(), 2);

        let part = to_fractional(part);
        assert_eq!(part.validate(), Ok(()));
        assert_eq!(
            TokenSequence::from_tokens(linearize(&part)).to_string(),
            "measure key:-1 time:2/4 staff:1 clef:G2 voice:1 eighth Bb4 stem:up beam:begin \
             slur:start staccato eighth A4 stem:up beam:end slur:stop quarter F4 tie:start \
             chord quarter C5 staff:2 clef:F4 voice:5 dur:1/2 rest:measure"
        );
    }

    #[test]
    fn test_read_errors() {
        assert!(read_part("<score-partwise>").is_err());
        assert!(read_part("<score-timewise/>").is_err());
        assert!(read_part("<score-partwise><part/><part/></score-partwise>").is_err());

        let err = read_part(
            "<score-partwise><part id=\"P1\"><measure number=\"7\">\
             <note><pitch><step>H</step><octave>4</octave></pitch></note>\
             </measure></part></score-partwise>",
        )
        .unwrap_err();
        assert!(format!("{:#}", err).starts_with("Measure 7"));

        let three_staves = "<score-partwise><part id=\"P1\"><measure>\
             <attributes><staves>3</staves></attributes></measure></part></score-partwise>";
        assert!(read_part(three_staves).is_err());
    }

    fn single_pitch(alter: &str, octave: &str) -> String {
        format!(
            "<score-partwise><part id=\"P1\"><measure number=\"1\">\
             <note><pitch><step>C</step><alter>{}</alter><octave>{}</octave></pitch>\
             <duration>1</duration><voice>1</voice><type>quarter</type></note>\
             </measure></part></score-partwise>",
            alter, octave
        )
    }

    #[test]
    fn test_pitch_ranges() {
        let part = read_part(&single_pitch("3", "4")).unwrap();
        let Some(Event::Note(note)) = part.events().find(|e| matches!(e, Event::Note(_))) else {
            panic!("note expected");
        };
        assert_eq!(note.tone, Tone::Pitched(Pitch::new(Step::C, MAX_ALTER, 4)));
        assert_eq!(note.tone.to_string(), "C##4");

        let part = read_part(&single_pitch("-1.4", "9")).unwrap();
        let Some(Event::Note(note)) = part.events().find(|e| matches!(e, Event::Note(_))) else {
            panic!("note expected");
        };
        assert_eq!(note.tone.to_string(), "Cb9");

        assert!(read_part(&single_pitch("0", "10")).is_err());
        assert!(read_part(&single_pitch("0", "-1")).is_err());
    }

    #[test]
    fn test_empty_part() {
        let part = read_part("<score-partwise><part id=\"P1\"/></score-partwise>").unwrap();
        assert!(part.measures.is_empty());
    }
}
