use crate::diagnostics::Diagnostics;
use crate::linearizer::linearize_measure;
use crate::sequence::TokenSequence;
use crate::transforms::to_fractional;
use crate::types::score::{Measure, Part};

fn measure_text(measure: Option<&Measure>) -> String {
    match measure {
        Some(measure) => {
            let mut tokens = Vec::new();
            linearize_measure(measure, &mut tokens);
            TokenSequence::from_tokens(tokens).to_string()
        }
        None => "(missing)".to_string(),
    }
}

/// Reports every measure whose encoding differs between the two parts and
/// returns how many did.
pub fn compare_parts(expected: &Part, given: &Part, sink: &mut dyn Diagnostics) -> usize {
    let expected = to_fractional(expected.clone());
    let given = to_fractional(given.clone());

    let count = expected.measures.len().max(given.measures.len());
    let mut differing = 0;
    for position in 0..count {
        let expected_text = measure_text(expected.measures.get(position));
        let given_text = measure_text(given.measures.get(position));
        if expected_text == given_text {
            continue;
        }
        differing += 1;
        sink.report(format!("measure {} differs", position + 1));
        sink.report(format!("  expected: {}", expected_text));
        sink.report(format!("  given:    {}", given_text));
    }

    sink.report(format!(
        "{} of {} measures differ",
        differing, count
    ));
    differing
}
