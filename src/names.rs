//! XML name checks
//!
//! Lexical tests for Name, NCName, QName and Nmtoken, shared by the DTD
//! attribute checks and the XSD builtin types.

use once_cell::sync::Lazy;
use regex::Regex;

const NAME_START: &str = r"A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}";
const NAME_REST: &str = r"\-\.0-9\u{B7}\u{300}-\u{36F}\u{203F}-\u{2040}";

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "^[:{start}][:{start}{rest}]*$",
        start = NAME_START,
        rest = NAME_REST
    ))
    .expect("static regex")
});

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "^[{start}][{start}{rest}]*$",
        start = NAME_START,
        rest = NAME_REST
    ))
    .expect("static regex")
});

static NMTOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "^[:{start}{rest}]+$",
        start = NAME_START,
        rest = NAME_REST
    ))
    .expect("static regex")
});

/// Character class source for `\i` (initial name character) in XSD patterns
pub fn initial_name_class() -> String {
    format!("[{}:]", NAME_START)
}

/// Character class source for `\c` (name character) in XSD patterns
pub fn name_class() -> String {
    format!("[{}{}:]", NAME_START, NAME_REST)
}

/// XML `Name` production (colons allowed anywhere)
pub fn is_valid_name(name: &str) -> bool {
    NAME.is_match(name)
}

/// `Name` without colons
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// `NCName` or `NCName:NCName`
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// One or more name characters, no start-character restriction
pub fn is_valid_nmtoken(token: &str) -> bool {
    NMTOKEN.is_match(token)
}

/// Check a whitespace-separated list of items with `check`
pub fn is_valid_list(value: &str, check: fn(&str) -> bool) -> bool {
    let mut items = value.split_ascii_whitespace().peekable();
    items.peek().is_some() && items.all(check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_allow_colons_and_unicode() {
        for ok in ["note", "_id", "line-item", "xs:schema", "données", "a.b·c"] {
            assert!(is_valid_name(ok), "{}", ok);
        }
        for bad in ["", "9lives", "-dash", ".dot", "two words"] {
            assert!(!is_valid_name(bad), "{:?}", bad);
        }
    }

    #[test]
    fn test_qname_splits_once() {
        assert!(is_valid_ncname("price"));
        assert!(!is_valid_ncname("p:price"));
        assert!(is_valid_qname("price"));
        assert!(is_valid_qname("p:price"));
        for bad in [":price", "p:", "a:b:c", "1p:price"] {
            assert!(!is_valid_qname(bad), "{}", bad);
        }
    }

    #[test]
    fn test_nmtokens_and_lists() {
        assert!(is_valid_nmtoken("2024-01-01"));
        assert!(is_valid_nmtoken("-a.b"));
        assert!(!is_valid_nmtoken("a b"));
        assert!(!is_valid_nmtoken(""));

        assert!(is_valid_list("low  high\tmedium", is_valid_ncname));
        assert!(!is_valid_list("low 1high", is_valid_ncname));
        assert!(!is_valid_list("   ", is_valid_ncname));
    }
}
