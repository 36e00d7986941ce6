//! Ordinal labels for ordered lists.
//!
//! A label is a pure function of a 1-based index and a [`NumberStyle`]. Five
//! encodings are supported:
//!
//! | style         | 1 | 4  | 27  |
//! |---------------|---|----|-----|
//! | `decimal`     | 1 | 4  | 27  |
//! | `lower-roman` | i | iv | xxvii |
//! | `upper-roman` | I | IV | XXVII |
//! | `lower-alpha` | a | d  | aa  |
//! | `upper-alpha` | A | D  | AA  |
//!
//! [`generate`] hands out a lazy [`Ordinals`] iterator that starts at 1 every
//! time it is constructed:
//!
//! ```rust
//! use predictables_report::numbering::generate;
//!
//! let labels: Vec<String> = generate(4, "upper-roman").unwrap().collect();
//! assert_eq!(labels, ["I", "II", "III", "IV"]);
//! ```

use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Largest index the roman table can encode without a symbol for 5000.
pub const MAX_ROMAN: usize = 3999;

const ROMAN_SYMBOLS: [(usize, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// The closed set of ordinal encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumberStyle {
    #[default]
    Decimal,
    LowerRoman,
    UpperRoman,
    LowerAlpha,
    UpperAlpha,
}

impl NumberStyle {
    pub const ALL: [NumberStyle; 5] = [
        NumberStyle::Decimal,
        NumberStyle::LowerRoman,
        NumberStyle::UpperRoman,
        NumberStyle::LowerAlpha,
        NumberStyle::UpperAlpha,
    ];

    /// The selector string accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberStyle::Decimal => "decimal",
            NumberStyle::LowerRoman => "lower-roman",
            NumberStyle::UpperRoman => "upper-roman",
            NumberStyle::LowerAlpha => "lower-alpha",
            NumberStyle::UpperAlpha => "upper-alpha",
        }
    }

    /// Highest index this style can label, if bounded.
    pub fn max_index(&self) -> Option<usize> {
        match self {
            NumberStyle::LowerRoman | NumberStyle::UpperRoman => Some(MAX_ROMAN),
            _ => None,
        }
    }

    /// Encodes a single 1-based index.
    pub fn label(&self, index: usize) -> Result<String, NumberingError> {
        if index == 0 || self.max_index().is_some_and(|max| index > max) {
            return Err(NumberingError::OutOfRange {
                index,
                style: *self,
            });
        }

        Ok(match self {
            NumberStyle::Decimal => index.to_string(),
            NumberStyle::UpperRoman => to_roman(index),
            NumberStyle::LowerRoman => to_roman(index).to_lowercase(),
            NumberStyle::UpperAlpha => to_alpha(index),
            NumberStyle::LowerAlpha => to_alpha(index).to_lowercase(),
        })
    }
}

impl fmt::Display for NumberStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumberStyle {
    type Err = NumberingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decimal" => Ok(NumberStyle::Decimal),
            "lower-roman" => Ok(NumberStyle::LowerRoman),
            "upper-roman" => Ok(NumberStyle::UpperRoman),
            "lower-alpha" => Ok(NumberStyle::LowerAlpha),
            "upper-alpha" => Ok(NumberStyle::UpperAlpha),
            other => Err(NumberingError::InvalidStyle(other.to_string())),
        }
    }
}

/// Errors raised while producing ordinal labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberingError {
    /// The style selector is not one of the five recognised values.
    InvalidStyle(String),
    /// The index cannot be encoded in the requested style.
    OutOfRange { index: usize, style: NumberStyle },
}

impl Error for NumberingError {}

impl fmt::Display for NumberingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberingError::InvalidStyle(style) => write!(
                f,
                "Style {} is not a valid number style (expected one of decimal, lower-roman, upper-roman, lower-alpha, upper-alpha)",
                style
            ),
            NumberingError::OutOfRange { index, style } => match style.max_index() {
                Some(max) => write!(
                    f,
                    "Index {} cannot be written in {} (supported range is 1..={})",
                    index, style, max
                ),
                None => write!(f, "Index {} cannot be written in {} (indices start at 1)", index, style),
            },
        }
    }
}

/// Lazy, restartable sequence of `count` labels for indices `1..=count`.
#[derive(Debug, Clone)]
pub struct Ordinals {
    style: NumberStyle,
    produced: usize,
    count: usize,
}

impl Ordinals {
    /// Builds a sequence, rejecting up-front any count the style cannot reach.
    pub fn new(count: usize, style: NumberStyle) -> Result<Self, NumberingError> {
        if let Some(max) = style.max_index() {
            if count > max {
                return Err(NumberingError::OutOfRange {
                    index: count,
                    style,
                });
            }
        }
        Ok(Self {
            style,
            produced: 0,
            count,
        })
    }

    pub fn style(&self) -> NumberStyle {
        self.style
    }
}

impl Iterator for Ordinals {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.produced >= self.count {
            return None;
        }
        // `produced < count <= usize::MAX`, so the index cannot overflow.
        self.produced += 1;
        // Range was validated in `new`, so encoding cannot fail here.
        self.style.label(self.produced).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.produced;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Ordinals {}
impl std::iter::FusedIterator for Ordinals {}

/// Produces `count` labels in the style named by `style`.
///
/// Fails with [`NumberingError::InvalidStyle`] for unknown selectors and with
/// [`NumberingError::OutOfRange`] when `count` exceeds what the style can encode.
pub fn generate(count: usize, style: &str) -> Result<Ordinals, NumberingError> {
    let style = style.parse::<NumberStyle>()?;
    Ordinals::new(count, style)
}

/// Encodes one index in the style named by `style`.
pub fn label(index: usize, style: &str) -> Result<String, NumberingError> {
    style.parse::<NumberStyle>()?.label(index)
}

/// Greedy subtraction over the 13-symbol table. Callers guarantee `1..=3999`.
fn to_roman(mut number: usize) -> String {
    let mut result = String::new();
    for &(value, symbol) in ROMAN_SYMBOLS.iter() {
        while number >= value {
            result.push_str(symbol);
            number -= value;
        }
    }
    result
}

/// Bijective base-26: 1 -> A, 26 -> Z, 27 -> AA.
fn to_alpha(mut number: usize) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        number -= 1;
        letters.push((b'A' + (number % 26) as u8) as char);
        number /= 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(count: usize, style: &str) -> Vec<String> {
        generate(count, style).unwrap().collect()
    }

    #[test]
    fn test_decimal_labels() {
        assert_eq!(labels(5, "decimal"), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_roman_landmarks() {
        assert_eq!(labels(1, "upper-roman"), ["I"]);
        assert_eq!(labels(4, "upper-roman")[3], "IV");
        assert_eq!(labels(9, "upper-roman")[8], "IX");
        assert_eq!(labels(40, "upper-roman")[39], "XL");
        assert_eq!(label(1994, "upper-roman").unwrap(), "MCMXCIV");
        assert_eq!(label(3999, "upper-roman").unwrap(), "MMMCMXCIX");
    }

    #[test]
    fn test_alpha_landmarks() {
        let expected = [(1, "A"), (26, "Z"), (27, "AA"), (52, "AZ"), (53, "BA"), (702, "ZZ"), (703, "AAA")];
        for (index, text) in expected {
            assert_eq!(label(index, "upper-alpha").unwrap(), text, "index {}", index);
        }
    }

    #[test]
    fn test_lower_case_variants_match_upper() {
        for index in 1..=200 {
            assert_eq!(
                NumberStyle::LowerRoman.label(index).unwrap(),
                NumberStyle::UpperRoman.label(index).unwrap().to_lowercase()
            );
            assert_eq!(
                NumberStyle::LowerAlpha.label(index).unwrap(),
                NumberStyle::UpperAlpha.label(index).unwrap().to_lowercase()
            );
        }
    }

    #[test]
    fn test_invalid_style_names_value() {
        for count in [0, 1, 10] {
            let err = generate(count, "bogus-style").unwrap_err();
            assert_eq!(err, NumberingError::InvalidStyle("bogus-style".to_string()));
            assert!(err.to_string().contains("bogus-style"));
        }
    }

    #[test]
    fn test_roman_out_of_range() {
        assert!(matches!(
            label(4000, "lower-roman"),
            Err(NumberingError::OutOfRange { index: 4000, .. })
        ));
        assert!(generate(4000, "upper-roman").is_err());
        assert!(generate(3999, "upper-roman").is_ok());
        assert!(generate(4000, "decimal").is_ok());
    }

    #[test]
    fn test_index_zero_is_rejected() {
        for style in NumberStyle::ALL {
            assert!(style.label(0).is_err());
        }
    }

    #[test]
    fn test_fresh_generator_restarts() {
        let first: Vec<_> = labels(3, "lower-alpha");
        let second: Vec<_> = labels(3, "lower-alpha");
        assert_eq!(first, second);
        assert_eq!(first, ["a", "b", "c"]);
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert_eq!(generate(0, "decimal").unwrap().count(), 0);
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let mut seq = generate(3, "decimal").unwrap();
        assert_eq!(seq.len(), 3);
        seq.next();
        assert_eq!(seq.len(), 2);
        seq.by_ref().for_each(drop);
        assert_eq!(seq.len(), 0);
        assert_eq!(seq.next(), None);
    }

    #[test]
    fn test_largest_count_stays_lazy() {
        let first: Vec<String> = generate(usize::MAX, "decimal").unwrap().take(3).collect();
        assert_eq!(first, ["1", "2", "3"]);

        let mut seq = generate(usize::MAX, "upper-alpha").unwrap();
        assert_eq!(seq.len(), usize::MAX);
        assert_eq!(seq.next().as_deref(), Some("A"));
        assert_eq!(seq.size_hint(), (usize::MAX - 1, Some(usize::MAX - 1)));
    }

    #[test]
    fn test_style_round_trips_through_str() {
        for style in NumberStyle::ALL {
            assert_eq!(style.as_str().parse::<NumberStyle>().unwrap(), style);
        }
    }
}
