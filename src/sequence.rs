use crate::token_parser::{TokenError, parse_token};
use crate::types::token::Token;
use std::fmt;
use std::str::FromStr;

/// Prints one measure per line, for reading and diffing.
pub struct TokenSequenceFormatter<'a> {
    sequence: &'a TokenSequence,
}

impl<'a> fmt::Display for TokenSequenceFormatter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for measure in self.sequence.measures() {
            let line: Vec<String> = measure.iter().map(|t| t.to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// A linearized part, stored as one whitespace-separated line of atoms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenSequence {
    pub tokens: Vec<Token>,
}

impl TokenSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn measure_count(&self) -> usize {
        self.tokens.iter().filter(|t| **t == Token::Measure).count()
    }

    /// Splits before every `measure` atom; atoms before the first one form their own group.
    pub fn measures(&self) -> impl Iterator<Item = &[Token]> {
        let mut starts: Vec<usize> = self
            .tokens
            .iter()
            .enumerate()
            .filter(|(idx, t)| **t == Token::Measure && *idx != 0)
            .map(|(idx, _)| idx)
            .collect();
        starts.insert(0, 0);
        let end = self.tokens.len();
        let bounds: Vec<(usize, usize)> = starts
            .iter()
            .enumerate()
            .map(|(i, start)| (*start, starts.get(i + 1).copied().unwrap_or(end)))
            .filter(|(start, stop)| start < stop)
            .collect();
        bounds
            .into_iter()
            .map(move |(start, stop)| &self.tokens[start..stop])
    }

    pub fn pretty(&self) -> TokenSequenceFormatter<'_> {
        TokenSequenceFormatter { sequence: self }
    }
}

impl fmt::Display for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, token) in self.tokens.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl From<Vec<Token>> for TokenSequence {
    fn from(tokens: Vec<Token>) -> Self {
        Self::from_tokens(tokens)
    }
}

/// Strict parse: the first bad atom fails the whole sequence.
pub fn parse_lmx(content: &str) -> Result<TokenSequence, TokenError> {
    let mut sequence = TokenSequence::new();
    for (idx, atom) in content.split_whitespace().enumerate() {
        let token = parse_token(atom).map_err(|e| e.at(idx))?;
        sequence.tokens.push(token);
    }
    Ok(sequence)
}

impl FromStr for TokenSequence {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_lmx(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_MEASURES: &str = "measure time:2/4 staff:1 clef:G2 voice:1 quarter C4 quarter rest \
                                measure staff:1 voice:1 half G4 tie:start";

    #[test]
    fn test_parse_and_display() {
        let sequence: TokenSequence = TWO_MEASURES.parse().unwrap();
        assert_eq!(sequence.len(), 15);
        assert_eq!(sequence.measure_count(), 2);
        assert_eq!(
            sequence.to_string(),
            TWO_MEASURES.split_whitespace().collect::<Vec<_>>().join(" ")
        );
    }

    #[test]
    fn test_pretty() {
        let sequence: TokenSequence = TWO_MEASURES.parse().unwrap();
        assert_eq!(
            sequence.pretty().to_string(),
            "measure time:2/4 staff:1 clef:G2 voice:1 quarter C4 quarter rest\n\
             measure staff:1 voice:1 half G4 tie:start\n"
        );

        let headless: TokenSequence = "voice:1 quarter C4 measure".parse().unwrap();
        assert_eq!(headless.measures().count(), 2);
        assert_eq!(TokenSequence::new().measures().count(), 0);
    }

    #[test]
    fn test_strict_errors() {
        let err = "measure staff:1 voice:1 quarter H4".parse::<TokenSequence>().unwrap_err();
        assert_eq!(err.to_string(), "token #4: unknown token \"H4\"");
        assert!("".parse::<TokenSequence>().unwrap().is_empty());
    }
}
