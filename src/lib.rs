//! LMX - Linearized MusicXML
//!
//! This library encodes single-part piano scores as flat token sequences
//! (LMX), decodes any token sequence back into a valid score, and scores a
//! prediction against a gold score with a tree edit distance.

pub mod assemble;
pub mod compare;
pub mod delinearizer;
pub mod diagnostics;
pub mod evaluation;
pub mod linearizer;
pub mod sequence;
pub mod token_parser;
pub mod transforms;
pub mod types;
pub mod util;

#[cfg(feature = "musicxml")]
pub mod musicxml;

#[cfg(feature = "python")]
pub mod python;

// Re-export commonly used types
pub use compare::compare_parts;
pub use delinearizer::{Delinearizer, delinearize, delinearize_text};
pub use diagnostics::{Diagnostics, Silent, TracingDiagnostics, WriteDiagnostics};
pub use evaluation::{EvaluationOptions, TreeDistance, distance, evaluate, part_tree};
pub use linearizer::linearize;
pub use sequence::{TokenSequence, parse_lmx};
pub use token_parser::{TokenError, parse_token};
pub use transforms::{PrunePolicy, prune, to_fractional};
pub use types::fraction::Fraction;
pub use types::score::{Measure, ModelError, Part};
pub use types::token::Token;

#[cfg(feature = "musicxml")]
pub use evaluation::evaluate_musicxml;
#[cfg(feature = "musicxml")]
pub use musicxml::read_part;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::assert_eq_parts;
    use pretty_assertions::assert_eq;

    fn representable(part: Part) -> Part {
        prune(part, &PrunePolicy::representable())
    }

    const TRIPLETS: &str = "measure key:2 time:3/4 staff:1 clef:G2 voice:1 \
        eighth 3in2 F#5 stem:down beam:begin tuplet:start \
        eighth 3in2 E5 stem:down beam:continue \
        eighth 3in2 D5 stem:down beam:end tuplet:stop \
        half A4 tie:start staccato \
        staff:2 clef:F4 voice:5 half. rest:measure";

    #[test]
    fn test_pruned_encoding() {
        assert_eq_parts(
            TRIPLETS,
            representable,
            "measure key:2 time:3/4 staff:1 clef:G2 voice:1
             dur:1/12 3in2 F#5 stem:down beam:begin tuplet:start
             dur:1/12 3in2 E5 stem:down beam:continue
             dur:1/12 3in2 D5 stem:down beam:end tuplet:stop
             dur:1/2 A4 tie:start staccato
             staff:2 clef:F4 voice:5 dur:3/4 rest:measure",
        );
        assert_eq_parts(TRIPLETS, |part| part, TRIPLETS);
    }

    #[test]
    fn test_round_trip_representable() {
        let gold = representable(delinearize_text(TRIPLETS, &mut Silent));
        let mut diagnostics: Vec<String> = Vec::new();
        let decoded = representable(delinearize(&linearize(&gold), &mut diagnostics));
        assert_eq!(decoded, gold);
        // only the tie left open at the end
        assert_eq!(diagnostics.len(), 1);
    }

    #[cfg(feature = "musicxml")]
    fn assert_round_trip(xml: &str) {
        let gold = representable(to_fractional(read_part(xml).unwrap()));
        let mut diagnostics: Vec<String> = Vec::new();
        let decoded = representable(delinearize(&linearize(&gold), &mut diagnostics));

        assert_eq!(diagnostics, Vec::<String>::new());
        assert_eq!(decoded, gold);
        assert_eq!(distance(&part_tree(&decoded), &part_tree(&gold)).cost, 0);
    }

    #[cfg(feature = "musicxml")]
    #[test]
    fn test_round_trip_beam_across_barline() {
        assert_round_trip(
            r#"<score-partwise><part id="P1">
            <measure number="1">
              <attributes><divisions>2</divisions><time><beats>1</beats><beat-type>8</beat-type></time></attributes>
              <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration>
                <voice>1</voice><type>eighth</type><beam number="1">begin</beam></note>
            </measure>
            <measure number="2">
              <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration>
                <voice>1</voice><type>eighth</type><beam number="1">end</beam></note>
            </measure>
          </part></score-partwise>"#,
        );
    }

    #[cfg(feature = "musicxml")]
    #[test]
    fn test_round_trip_beamed_chords() {
        assert_round_trip(
            r#"<score-partwise><part id="P1">
            <measure number="1">
              <attributes><divisions>2</divisions><time><beats>1</beats><beat-type>4</beat-type></time></attributes>
              <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration>
                <voice>1</voice><type>eighth</type><beam number="1">begin</beam></note>
              <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration>
                <voice>1</voice><type>eighth</type><beam number="1">begin</beam></note>
              <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration>
                <voice>1</voice><type>eighth</type><beam number="1">end</beam></note>
              <note><chord/><pitch><step>F</step><octave>4</octave></pitch><duration>1</duration>
                <voice>1</voice><type>eighth</type><beam number="1">end</beam></note>
            </measure>
          </part></score-partwise>"#,
        );
    }

    #[cfg(feature = "musicxml")]
    #[test]
    fn test_round_trip_from_musicxml() {
        let xml = r#"<score-partwise><part id="P1">
            <measure number="1">
              <attributes><divisions>6</divisions><time><beats>2</beats><beat-type>4</beat-type></time>
                <clef><sign>G</sign><line>2</line></clef></attributes>
              <note><pitch><step>G</step><octave>4</octave></pitch><duration>2</duration>
                <voice>1</voice><type>eighth</type>
                <time-modification><actual-notes>3</actual-notes><normal-notes>2</normal-notes></time-modification>
                <beam number="1">begin</beam><notations><tuplet type="start" number="1" bracket="yes"/></notations></note>
              <note><grace slash="yes"/><pitch><step>B</step><octave>4</octave></pitch><voice>1</voice><type>sixteenth</type></note>
              <note><pitch><step>A</step><octave>4</octave></pitch><duration>2</duration>
                <voice>1</voice><type>eighth</type>
                <time-modification><actual-notes>3</actual-notes><normal-notes>2</normal-notes></time-modification>
                <beam number="1">continue</beam></note>
              <note><pitch><step>B</step><octave>4</octave></pitch><duration>2</duration>
                <voice>1</voice><type>eighth</type>
                <time-modification><actual-notes>3</actual-notes><normal-notes>2</normal-notes></time-modification>
                <beam number="1">end</beam><notations><tuplet type="stop" number="1"/>
                <ornaments><tremolo type="single">3</tremolo></ornaments></notations></note>
              <note><rest/><duration>6</duration><voice>1</voice><type>quarter</type></note>
              <direction><direction-type><words>dolce</words></direction-type></direction>
            </measure>
          </part></score-partwise>"#;

        let gold = representable(to_fractional(read_part(xml).unwrap()));
        let tokens = linearize(&gold);
        let mut diagnostics: Vec<String> = Vec::new();
        let decoded = representable(delinearize(&tokens, &mut diagnostics));

        assert_eq!(diagnostics, Vec::<String>::new());
        assert_eq!(decoded, gold);
        assert_eq!(distance(&part_tree(&decoded), &part_tree(&gold)).cost, 0);
    }
}
