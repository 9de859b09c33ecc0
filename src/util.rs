use num_integer::Integer;

/// Reduces `actual:normal` to lowest terms. Zero terms are returned unchanged.
pub fn reduce_ratio(actual: u32, normal: u32) -> (u32, u32) {
    if actual == 0 || normal == 0 {
        return (actual, normal);
    }
    let gcd = actual.gcd(&normal);
    (actual / gcd, normal / gcd)
}

pub fn format_rate(value: f64) -> String {
    let trimmed_zeros = format!("{:.5}", value).trim_end_matches('0').to_string();

    if trimmed_zeros.ends_with('.') {
        trimmed_zeros + "0"
    } else {
        trimmed_zeros
    }
}

/// Decodes `input`, applies `transform` and compares the re-encoded result
/// with `expected`. Whitespace in `expected` is not significant.
#[cfg(test)]
pub fn assert_eq_parts(input: &str, transform: fn(crate::Part) -> crate::Part, expected: &str) {
    use crate::diagnostics::Silent;
    use crate::{TokenSequence, delinearize_text, linearize};

    let part = transform(delinearize_text(input, &mut Silent));
    pretty_assertions::assert_eq!(
        TokenSequence::from_tokens(linearize(&part)).to_string(),
        expected.split_whitespace().collect::<Vec<_>>().join(" "),
    );
}
