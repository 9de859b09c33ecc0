pub mod ted;
pub mod tree;

use crate::compare::compare_parts;
use crate::delinearizer::delinearize_text;
use crate::diagnostics::Diagnostics;
use crate::transforms::{PrunePolicy, prune, to_fractional};
use crate::types::score::Part;
use tracing::debug;

pub use ted::{TreeDistance, distance};
pub use tree::{LabelledTree, part_tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Run both trees through `policy` before scoring.
    pub prune: bool,
    pub policy: PrunePolicy,
    /// Write a measure-by-measure comparison to the diagnostics sink.
    pub debug: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            prune: true,
            policy: PrunePolicy::evaluation(),
            debug: false,
        }
    }
}

/// Scores a predicted token sequence against a gold part.
///
/// The prediction is decoded (never failing, repairs go to `sink`), the gold
/// part is brought to exact durations, both are pruned under one policy and
/// compared with the tree edit distance.
pub fn evaluate(
    predicted_text: &str,
    gold: Part,
    options: &EvaluationOptions,
    sink: &mut dyn Diagnostics,
) -> TreeDistance {
    let mut predicted = delinearize_text(predicted_text, sink);
    let mut gold = to_fractional(gold);

    if options.prune {
        gold = prune(gold, &options.policy);
        predicted = prune(predicted, &options.policy);
    }

    if options.debug {
        compare_parts(&gold, &predicted, sink);
    }

    let result = distance(&part_tree(&predicted), &part_tree(&gold));
    debug!("Evaluated: {}", result);
    result
}

/// Like [`evaluate`], reading the gold part from MusicXML. Only an unreadable
/// gold document is an error.
#[cfg(feature = "musicxml")]
pub fn evaluate_musicxml(
    predicted_text: &str,
    gold_xml: &str,
    options: &EvaluationOptions,
    sink: &mut dyn Diagnostics,
) -> anyhow::Result<TreeDistance> {
    use anyhow::Context;

    let gold = crate::musicxml::read_part(gold_xml).context("Failed to read the gold part")?;
    Ok(evaluate(predicted_text, gold, options, sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Silent;
    use crate::linearizer::linearize;
    use crate::sequence::TokenSequence;
    use crate::types::duration::NoteType;
    use crate::types::event::{Barline, BarlineLocation, Event};

    fn gold(text: &str) -> Part {
        delinearize_text(text, &mut Silent)
    }

    #[test]
    fn test_exact_prediction() {
        let text = "measure time:2/4 staff:1 clef:G2 voice:1 quarter C4 quarter rest";
        let result = evaluate(text, gold(text), &EvaluationOptions::default(), &mut Silent);
        assert_eq!(result.cost, 0);
        assert_eq!(result.predicted_size, result.gold_size);
    }

    #[test]
    fn test_whole_measure_rest_typed_whole() {
        let mut gold_part = gold("measure time:3/4 staff:1 voice:1 dur:3/4 rest:measure");
        for event in gold_part.events_mut() {
            if let Event::Rest(rest) = event {
                rest.note_type = Some(NoteType::Whole);
            }
        }
        let predicted = TokenSequence::from_tokens(linearize(&gold_part)).to_string();
        assert_eq!(predicted, "measure time:3/4 staff:1 voice:1 dur:3/4 rest:measure");

        let result = evaluate(
            &predicted,
            gold_part,
            &EvaluationOptions::default(),
            &mut Silent,
        );
        assert_eq!(result.cost, 0);
        assert_eq!(result.predicted_size, result.gold_size);
    }

    #[test]
    fn test_pruning_hides_unencoded_detail() {
        let text = "measure staff:1 voice:1 whole C4";
        let mut with_barline = gold(text);
        with_barline.measures[0].header.push(Event::Barline(Barline {
            location: BarlineLocation::Right,
            style: Some("light-heavy".to_string()),
            repeat: None,
        }));

        let pruned = evaluate(
            text,
            with_barline.clone(),
            &EvaluationOptions::default(),
            &mut Silent,
        );
        assert_eq!(pruned.cost, 0);

        let options = EvaluationOptions {
            prune: false,
            ..Default::default()
        };
        let unpruned = evaluate(text, with_barline, &options, &mut Silent);
        // barline node with its location and style leaves
        assert_eq!(unpruned.cost, 3);
    }

    #[test]
    fn test_debug_comparison() {
        let options = EvaluationOptions {
            debug: true,
            ..Default::default()
        };
        let mut lines: Vec<String> = Vec::new();
        let result = evaluate(
            "measure staff:1 voice:1 half D4 bogus",
            gold("measure staff:1 voice:1 half C4"),
            &options,
            &mut lines,
        );
        assert_eq!(result.cost, 1);
        assert!(lines[0].contains("bogus"));
        assert!(lines.contains(&"measure 1 differs".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("1 of 1 measures differ"));
    }

    #[test]
    fn test_garbage_prediction() {
        let result = evaluate(
            "staff:9 tie:stop ) ( nonsense",
            gold("measure staff:1 voice:1 quarter C4"),
            &EvaluationOptions::default(),
            &mut Silent,
        );
        assert_eq!(result.predicted_size, 1);
        assert_eq!(result.cost, result.gold_size - 1);
    }

    #[cfg(feature = "musicxml")]
    #[test]
    fn test_evaluate_musicxml() {
        let xml = r#"<score-partwise><part id="P1"><measure number="1">
            <attributes><divisions>1</divisions></attributes>
            <note><pitch><step>E</step><octave>4</octave></pitch>
              <duration>2</duration><voice>1</voice><type>half</type></note>
            </measure></part></score-partwise>"#;
        let result = evaluate_musicxml(
            "measure staff:1 voice:1 half E4",
            xml,
            &EvaluationOptions::default(),
            &mut Silent,
        )
        .unwrap();
        assert_eq!(result.cost, 0);

        assert!(
            evaluate_musicxml("measure", "<not-a-score/>", &Default::default(), &mut Silent)
                .is_err()
        );
    }
}
