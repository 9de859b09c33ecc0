//! Python bindings for the lmx library using PyO3

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::evaluation::{EvaluationOptions, evaluate_musicxml};
use crate::musicxml::read_part;
use crate::{TokenSequence, delinearize_text, linearize as rust_linearize};

pyo3::create_exception!(lmx, ParseError, PyValueError);

/// Encode the single part of a MusicXML document as LMX
///
/// Raises ParseError if the document cannot be read.
#[pyfunction]
fn linearize_musicxml(xml: &str) -> PyResult<String> {
    let part = read_part(xml)
        .map_err(|e| ParseError::new_err(format!("Failed to read MusicXML: {:#}", e)))?;
    Ok(TokenSequence::from_tokens(rust_linearize(&part)).to_string())
}

/// Decode any LMX text and encode it again
///
/// Returns the canonical text and the list of repairs made.
///
/// Example:
///     text, problems = lmx.repair("measure staff:1 voice:1 quarter C4 tuplet:stop")
#[pyfunction]
fn repair(lmx: &str) -> (String, Vec<String>) {
    let mut diagnostics: Vec<String> = Vec::new();
    let part = delinearize_text(lmx, &mut diagnostics);
    (
        TokenSequence::from_tokens(rust_linearize(&part)).to_string(),
        diagnostics,
    )
}

/// Tree edit distance between predicted LMX and gold MusicXML
///
/// Returns (cost, predicted_size, gold_size). Raises ParseError if the gold
/// document cannot be read.
#[pyfunction]
#[pyo3(signature = (predicted_lmx, gold_musicxml, prune=true))]
fn evaluate(predicted_lmx: &str, gold_musicxml: &str, prune: bool) -> PyResult<(usize, usize, usize)> {
    let options = EvaluationOptions {
        prune,
        ..Default::default()
    };
    let mut diagnostics: Vec<String> = Vec::new();
    let result = evaluate_musicxml(predicted_lmx, gold_musicxml, &options, &mut diagnostics)
        .map_err(|e| ParseError::new_err(format!("{:#}", e)))?;
    Ok((result.cost, result.predicted_size, result.gold_size))
}

/// Linearized MusicXML
///
/// Encode piano scores as token sequences, repair predicted sequences and
/// score them against gold MusicXML.
#[pymodule]
fn lmx(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(linearize_musicxml, m)?)?;
    m.add_function(wrap_pyfunction!(repair, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate, m)?)?;

    m.add("ParseError", m.py().get_type::<ParseError>())?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
