//! XSD constraining facets
//!
//! Facets of `xs:restriction` steps, checked against whitespace-normalized
//! lexical values. Failures produce the `[facet '...']` messages reported in
//! validation diagnostics.

use super::builtins::Builtin;
use crate::error::{Error, Result};
use crate::names;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

/// `xs:whiteSpace` normalization applied before lexical checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Value is checked exactly as written
    Preserve,
    /// Tab, line feed and carriage return become spaces
    Replace,
    /// `Replace`, then runs of spaces shrink to one and the ends are trimmed
    Collapse,
}

impl FromStr for WhiteSpace {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Ok(match value {
            "preserve" => WhiteSpace::Preserve,
            "replace" => WhiteSpace::Replace,
            "collapse" => WhiteSpace::Collapse,
            other => {
                return Err(Error::Schema(format!(
                    "'{}' is not a valid value of the facet 'whiteSpace'",
                    other
                )))
            }
        })
    }
}

impl WhiteSpace {
    /// Apply this mode to a lexical value
    pub fn normalize(&self, value: &str) -> String {
        match self {
            WhiteSpace::Preserve => value.to_owned(),
            WhiteSpace::Replace => value.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => value.split_ascii_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// A compiled `xs:pattern`
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    source: String,
}

impl Pattern {
    /// Compile an XSD regular expression, anchored at both ends
    pub fn new(source: &str) -> Result<Self> {
        let translated = translate_pattern(source);
        let regex = Regex::new(&format!("^(?:{})$", translated)).map_err(|e| {
            Error::Schema(format!("Invalid pattern '{}': {}", source, e))
        })?;
        Ok(Self {
            regex,
            source: source.to_string(),
        })
    }

    /// Whether the whole value matches
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The pattern as written in the schema
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Rewrite the XSD-only escapes `\i` and `\c` into explicit classes
fn translate_pattern(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('i') => out.push_str(&names::initial_name_class()),
            Some('c') => out.push_str(&names::name_class()),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A single constraining facet
#[derive(Debug, Clone)]
pub enum Facet {
    /// `length`
    Length(usize),
    /// `minLength`
    MinLength(usize),
    /// `maxLength`
    MaxLength(usize),
    /// `pattern`; patterns of the same step are alternatives
    Pattern(Vec<Pattern>),
    /// `enumeration`
    Enumeration(Vec<String>),
    /// `minInclusive`
    MinInclusive(String),
    /// `maxInclusive`
    MaxInclusive(String),
    /// `minExclusive`
    MinExclusive(String),
    /// `maxExclusive`
    MaxExclusive(String),
    /// `totalDigits`
    TotalDigits(u32),
    /// `fractionDigits`
    FractionDigits(u32),
    /// `whiteSpace`
    WhiteSpace(WhiteSpace),
}

impl Facet {
    /// Facet element name
    pub fn name(&self) -> &'static str {
        match self {
            Facet::Length(_) => "length",
            Facet::MinLength(_) => "minLength",
            Facet::MaxLength(_) => "maxLength",
            Facet::Pattern(_) => "pattern",
            Facet::Enumeration(_) => "enumeration",
            Facet::MinInclusive(_) => "minInclusive",
            Facet::MaxInclusive(_) => "maxInclusive",
            Facet::MinExclusive(_) => "minExclusive",
            Facet::MaxExclusive(_) => "maxExclusive",
            Facet::TotalDigits(_) => "totalDigits",
            Facet::FractionDigits(_) => "fractionDigits",
            Facet::WhiteSpace(_) => "whiteSpace",
        }
    }

    /// Check a normalized value whose primitive type is `base`
    pub fn check(&self, value: &str, base: Builtin) -> std::result::Result<(), String> {
        let fail = |detail: String| Err(format!("[facet '{}'] {}", self.name(), detail));

        match self {
            Facet::Length(expected) => {
                let length = base.value_length(value);
                if length != *expected {
                    return fail(format!(
                        "The value has a length of '{}'; this differs from the allowed length of '{}'.",
                        length, expected
                    ));
                }
            }
            Facet::MinLength(min) => {
                let length = base.value_length(value);
                if length < *min {
                    return fail(format!(
                        "The value has a length of '{}'; this underruns the allowed minimum length of '{}'.",
                        length, min
                    ));
                }
            }
            Facet::MaxLength(max) => {
                let length = base.value_length(value);
                if length > *max {
                    return fail(format!(
                        "The value has a length of '{}'; this exceeds the allowed maximum length of '{}'.",
                        length, max
                    ));
                }
            }
            Facet::Pattern(patterns) => {
                if !patterns.iter().any(|p| p.is_match(value)) {
                    let sources: Vec<&str> = patterns.iter().map(Pattern::source).collect();
                    return fail(format!(
                        "The value '{}' is not accepted by the pattern '{}'.",
                        value,
                        sources.join("|")
                    ));
                }
            }
            Facet::Enumeration(allowed) => {
                let found = allowed
                    .iter()
                    .any(|a| compare_values(value, a, base) == Some(Ordering::Equal));
                if !found {
                    let set: Vec<String> = allowed.iter().map(|a| format!("'{}'", a)).collect();
                    return fail(format!(
                        "The value '{}' is not an element of the set {{{}}}.",
                        value,
                        set.join(", ")
                    ));
                }
            }
            Facet::MinInclusive(bound) => {
                if compare_values(value, bound, base) == Some(Ordering::Less) {
                    return fail(format!(
                        "The value '{}' is less than the minimum value allowed ('{}').",
                        value, bound
                    ));
                }
            }
            Facet::MaxInclusive(bound) => {
                if compare_values(value, bound, base) == Some(Ordering::Greater) {
                    return fail(format!(
                        "The value '{}' is greater than the maximum value allowed ('{}').",
                        value, bound
                    ));
                }
            }
            Facet::MinExclusive(bound) => {
                if compare_values(value, bound, base) != Some(Ordering::Greater) {
                    return fail(format!("The value '{}' must be greater than '{}'.", value, bound));
                }
            }
            Facet::MaxExclusive(bound) => {
                if compare_values(value, bound, base) != Some(Ordering::Less) {
                    return fail(format!("The value '{}' must be less than '{}'.", value, bound));
                }
            }
            Facet::TotalDigits(max) => {
                let (total, _) = count_digits(value);
                if total > *max as usize {
                    return fail(format!(
                        "The value '{}' has more digits than are allowed ('{}').",
                        value, max
                    ));
                }
            }
            Facet::FractionDigits(max) => {
                let (_, fraction) = count_digits(value);
                if fraction > *max as usize {
                    return fail(format!(
                        "The value '{}' has more fractional digits than are allowed ('{}').",
                        value, max
                    ));
                }
            }
            Facet::WhiteSpace(_) => {}
        }
        Ok(())
    }
}

/// Build the facets of one restriction step from `(element name, value)` pairs
pub fn collect_facets<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Vec<Facet>> {
    let mut facets = Vec::new();
    let mut patterns = Vec::new();
    let mut enumeration = Vec::new();

    for (name, value) in items {
        let facet = match name {
            "length" => Facet::Length(parse_count(name, value)?),
            "minLength" => Facet::MinLength(parse_count(name, value)?),
            "maxLength" => Facet::MaxLength(parse_count(name, value)?),
            "totalDigits" => Facet::TotalDigits(parse_count(name, value)? as u32),
            "fractionDigits" => Facet::FractionDigits(parse_count(name, value)? as u32),
            "minInclusive" => Facet::MinInclusive(value.trim().to_string()),
            "maxInclusive" => Facet::MaxInclusive(value.trim().to_string()),
            "minExclusive" => Facet::MinExclusive(value.trim().to_string()),
            "maxExclusive" => Facet::MaxExclusive(value.trim().to_string()),
            "whiteSpace" => Facet::WhiteSpace(value.trim().parse()?),
            "pattern" => {
                patterns.push(Pattern::new(value)?);
                continue;
            }
            "enumeration" => {
                enumeration.push(value.to_string());
                continue;
            }
            other => {
                return Err(Error::Schema(format!("Unsupported facet '{}'", other)));
            }
        };
        facets.push(facet);
    }

    if !patterns.is_empty() {
        facets.push(Facet::Pattern(patterns));
    }
    if !enumeration.is_empty() {
        facets.push(Facet::Enumeration(enumeration));
    }
    Ok(facets)
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        Error::Schema(format!(
            "The value '{}' of facet '{}' is not a valid non-negative integer",
            value, name
        ))
    })
}

/// Compare two lexical values in the value space of `base`
pub fn compare_values(value: &str, other: &str, base: Builtin) -> Option<Ordering> {
    if base.is_float() {
        return parse_float(value)?.partial_cmp(&parse_float(other)?);
    }
    if base.is_decimal() {
        return match (parse_decimal(value), parse_decimal(other)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => parse_float(value)?.partial_cmp(&parse_float(other)?),
        };
    }
    Some(value.cmp(other))
}

/// Parse an XSD decimal lexical form (`+1.`, `.5`, `-0.50`)
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let mut normalized = String::with_capacity(digits.len() + 2);
    if negative {
        normalized.push('-');
    }
    if digits.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(digits.trim_end_matches('.'));
    Decimal::from_str(&normalized).ok()
}

fn parse_float(value: &str) -> Option<f64> {
    match value {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => None,
        _ => value.parse().ok(),
    }
}

/// Significant digits and fraction digits of a decimal lexical value
fn count_digits(value: &str) -> (usize, usize) {
    let unsigned = value.trim_start_matches(['+', '-']);
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let integer = integer.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');
    let total = (integer.len() + fraction.len()).max(1);
    (total, fraction.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_space_facet() {
        let facets = collect_facets([("whiteSpace", " collapse ")]).unwrap();
        let Facet::WhiteSpace(mode) = &facets[0] else {
            panic!("expected a whiteSpace facet, got {:?}", facets[0]);
        };
        assert_eq!(mode.normalize(" 12\t\n 34 "), "12 34");
        assert_eq!(WhiteSpace::Replace.normalize("a\tb\n"), "a b ");
        assert_eq!(WhiteSpace::Preserve.normalize("a\tb"), "a\tb");
        assert!(collect_facets([("whiteSpace", "squash")]).is_err());
    }

    #[test]
    fn test_length_facets() {
        let facets = collect_facets([("minLength", "2"), ("maxLength", "4")]).unwrap();
        assert!(facets.iter().all(|f| f.check("abc", Builtin::String).is_ok()));

        let err = facets[0].check("a", Builtin::String).unwrap_err();
        assert_eq!(
            err,
            "[facet 'minLength'] The value has a length of '1'; this underruns the allowed minimum length of '2'."
        );
        assert!(facets[1].check("abcde", Builtin::String).is_err());
        assert!(Facet::Length(2).check("a b", Builtin::NmTokens).is_ok());
    }

    #[test]
    fn test_patterns_are_anchored_alternatives() {
        let facets = collect_facets([("pattern", r"\d{3}"), ("pattern", "[A-Z]+")]).unwrap();
        assert_eq!(facets.len(), 1);
        let facet = &facets[0];

        assert!(facet.check("123", Builtin::String).is_ok());
        assert!(facet.check("ABC", Builtin::String).is_ok());
        assert!(facet.check("1234", Builtin::String).is_err());
        assert!(facet.check("x123", Builtin::String).is_err());
    }

    #[test]
    fn test_name_class_escapes() {
        let pattern = Pattern::new(r"\i\c*").unwrap();
        assert!(pattern.is_match("_item-1"));
        assert!(!pattern.is_match("1item"));
    }

    #[test]
    fn test_invalid_pattern_is_schema_error() {
        assert!(matches!(Pattern::new("(unclosed"), Err(Error::Schema(_))));
    }

    #[test]
    fn test_enumeration() {
        let facets = collect_facets([("enumeration", "red"), ("enumeration", "green")]).unwrap();
        assert!(facets[0].check("red", Builtin::String).is_ok());
        assert_eq!(
            facets[0].check("blue", Builtin::String).unwrap_err(),
            "[facet 'enumeration'] The value 'blue' is not an element of the set {'red', 'green'}."
        );

        let numbers = Facet::Enumeration(vec!["1.0".to_string()]);
        assert!(numbers.check("1.00", Builtin::Decimal).is_ok());
    }

    #[test]
    fn test_range_facets() {
        let min = Facet::MinInclusive("0".to_string());
        let max = Facet::MaxExclusive("150".to_string());
        assert!(min.check("0", Builtin::Int).is_ok());
        assert!(min.check("-1", Builtin::Int).is_err());
        assert!(max.check("149", Builtin::Int).is_ok());
        assert!(max.check("150", Builtin::Int).is_err());
        assert!(Facet::MaxInclusive("1.5".to_string()).check("1.50", Builtin::Decimal).is_ok());
        assert!(Facet::MinExclusive("1e2".to_string()).check("100.5", Builtin::Double).is_ok());
        assert!(Facet::MaxInclusive("2024-12-31".to_string())
            .check("2025-01-01", Builtin::Date)
            .is_err());
    }

    #[test]
    fn test_digit_facets() {
        assert!(Facet::TotalDigits(3).check("123", Builtin::Decimal).is_ok());
        assert!(Facet::TotalDigits(3).check("12.34", Builtin::Decimal).is_err());
        assert!(Facet::TotalDigits(3).check("0012.300", Builtin::Decimal).is_ok());
        assert!(Facet::FractionDigits(2).check("1.25", Builtin::Decimal).is_ok());
        assert!(Facet::FractionDigits(2).check("1.255", Builtin::Decimal).is_err());
    }

    #[test]
    fn test_parse_decimal_forms() {
        assert_eq!(parse_decimal("+1."), Decimal::from_str("1").ok());
        assert_eq!(parse_decimal(".5"), Decimal::from_str("0.5").ok());
        assert_eq!(parse_decimal("-.5"), Decimal::from_str("-0.5").ok());
    }

    #[test]
    fn test_unsupported_facet() {
        assert!(collect_facets([("assertion", "$value > 0")]).is_err());
        assert!(collect_facets([("length", "many")]).is_err());
    }
}
