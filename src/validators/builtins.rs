//! XSD built-in types
//!
//! Lexical checks for the built-in primitive and derived types of XML
//! Schema 1.0. Values are expected to be whitespace-normalized already
//! (see [`Builtin::white_space`]).

use super::facets::WhiteSpace;
use crate::names;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// XSD 1.0 Namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// A built-in simple (or the ur-) type
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    AnyType,
    AnySimpleType,
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NCName,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Boolean,
    Decimal,
    Integer,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    PositiveInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    NonPositiveInteger,
    NegativeInteger,
    Float,
    Double,
    Duration,
    DateTime,
    Time,
    Date,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    HexBinary,
    Base64Binary,
    AnyUri,
    QName,
    Notation,
}

const BUILTINS: &[(Builtin, &str)] = &[
    (Builtin::AnyType, "anyType"),
    (Builtin::AnySimpleType, "anySimpleType"),
    (Builtin::String, "string"),
    (Builtin::NormalizedString, "normalizedString"),
    (Builtin::Token, "token"),
    (Builtin::Language, "language"),
    (Builtin::Name, "Name"),
    (Builtin::NCName, "NCName"),
    (Builtin::Id, "ID"),
    (Builtin::IdRef, "IDREF"),
    (Builtin::IdRefs, "IDREFS"),
    (Builtin::Entity, "ENTITY"),
    (Builtin::Entities, "ENTITIES"),
    (Builtin::NmToken, "NMTOKEN"),
    (Builtin::NmTokens, "NMTOKENS"),
    (Builtin::Boolean, "boolean"),
    (Builtin::Decimal, "decimal"),
    (Builtin::Integer, "integer"),
    (Builtin::Long, "long"),
    (Builtin::Int, "int"),
    (Builtin::Short, "short"),
    (Builtin::Byte, "byte"),
    (Builtin::NonNegativeInteger, "nonNegativeInteger"),
    (Builtin::PositiveInteger, "positiveInteger"),
    (Builtin::UnsignedLong, "unsignedLong"),
    (Builtin::UnsignedInt, "unsignedInt"),
    (Builtin::UnsignedShort, "unsignedShort"),
    (Builtin::UnsignedByte, "unsignedByte"),
    (Builtin::NonPositiveInteger, "nonPositiveInteger"),
    (Builtin::NegativeInteger, "negativeInteger"),
    (Builtin::Float, "float"),
    (Builtin::Double, "double"),
    (Builtin::Duration, "duration"),
    (Builtin::DateTime, "dateTime"),
    (Builtin::Time, "time"),
    (Builtin::Date, "date"),
    (Builtin::GYearMonth, "gYearMonth"),
    (Builtin::GYear, "gYear"),
    (Builtin::GMonthDay, "gMonthDay"),
    (Builtin::GDay, "gDay"),
    (Builtin::GMonth, "gMonth"),
    (Builtin::HexBinary, "hexBinary"),
    (Builtin::Base64Binary, "base64Binary"),
    (Builtin::AnyUri, "anyURI"),
    (Builtin::QName, "QName"),
    (Builtin::Notation, "NOTATION"),
];

const TZ: &str = r"(Z|[+-](\d{2}):(\d{2}))?";

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("static regex"));

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("static regex"));

static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|[+-]?INF|NaN)$").expect("static regex")
});

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(-?\d{{4,}})-(\d{{2}})-(\d{{2}}){}$", TZ)).expect("static regex")
});

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(\d{{2}}):(\d{{2}}):(\d{{2}})(\.\d+)?{}$", TZ)).expect("static regex")
});

static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(-?\d{{4,}})-(\d{{2}})-(\d{{2}})T(\d{{2}}):(\d{{2}}):(\d{{2}})(\.\d+)?{}$",
        TZ
    ))
    .expect("static regex")
});

static G_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^-?\d{{4,}}{}$", TZ)).expect("static regex"));

static G_YEAR_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^-?\d{{4,}}-(\d{{2}}){}$", TZ)).expect("static regex")
});

static G_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--(\d{{2}}){}$", TZ)).expect("static regex"));

static G_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^---(\d{{2}}){}$", TZ)).expect("static regex"));

static G_MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^--(\d{{2}})-(\d{{2}}){}$", TZ)).expect("static regex")
});

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$").expect("static regex")
});

static HEX_BINARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{2})*$").expect("static regex"));

static LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("static regex"));

impl Builtin {
    /// Look up a built-in type by its local name in the XSD namespace
    pub fn from_local_name(name: &str) -> Option<Self> {
        BUILTINS
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(builtin, _)| *builtin)
    }

    /// Local name of the type
    pub fn name(&self) -> &'static str {
        BUILTINS
            .iter()
            .find(|(builtin, _)| builtin == self)
            .map(|(_, name)| *name)
            .unwrap_or("anyType")
    }

    /// Whitespace handling applied before lexical checks
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            Builtin::AnyType | Builtin::AnySimpleType | Builtin::String => WhiteSpace::Preserve,
            Builtin::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// Whether values are whitespace-separated lists
    pub fn is_list(&self) -> bool {
        matches!(self, Builtin::IdRefs | Builtin::Entities | Builtin::NmTokens)
    }

    /// Whether the value space is the decimal / integer family
    pub fn is_decimal(&self) -> bool {
        matches!(self, Builtin::Decimal) || self.integer_bounds().is_some()
    }

    /// Whether the value space is float or double
    pub fn is_float(&self) -> bool {
        matches!(self, Builtin::Float | Builtin::Double)
    }

    /// Inclusive bounds of the integer types; `None` bounds are unlimited
    fn integer_bounds(&self) -> Option<(Option<i128>, Option<i128>)> {
        let bounds = match self {
            Builtin::Integer => (None, None),
            Builtin::Long => (Some(i64::MIN as i128), Some(i64::MAX as i128)),
            Builtin::Int => (Some(i32::MIN as i128), Some(i32::MAX as i128)),
            Builtin::Short => (Some(i16::MIN as i128), Some(i16::MAX as i128)),
            Builtin::Byte => (Some(i8::MIN as i128), Some(i8::MAX as i128)),
            Builtin::NonNegativeInteger => (Some(0), None),
            Builtin::PositiveInteger => (Some(1), None),
            Builtin::UnsignedLong => (Some(0), Some(u64::MAX as i128)),
            Builtin::UnsignedInt => (Some(0), Some(u32::MAX as i128)),
            Builtin::UnsignedShort => (Some(0), Some(u16::MAX as i128)),
            Builtin::UnsignedByte => (Some(0), Some(u8::MAX as i128)),
            Builtin::NonPositiveInteger => (None, Some(0)),
            Builtin::NegativeInteger => (None, Some(-1)),
            _ => return None,
        };
        Some(bounds)
    }

    /// Check a normalized lexical value
    pub fn is_valid(&self, value: &str) -> bool {
        match self {
            Builtin::AnyType
            | Builtin::AnySimpleType
            | Builtin::String
            | Builtin::NormalizedString
            | Builtin::Token
            | Builtin::AnyUri => true,
            Builtin::Language => LANGUAGE.is_match(value),
            Builtin::Name => names::is_valid_name(value),
            Builtin::NCName | Builtin::Id | Builtin::IdRef | Builtin::Entity => {
                names::is_valid_ncname(value)
            }
            Builtin::IdRefs | Builtin::Entities => {
                names::is_valid_list(value, names::is_valid_ncname)
            }
            Builtin::NmToken => names::is_valid_nmtoken(value),
            Builtin::NmTokens => names::is_valid_list(value, names::is_valid_nmtoken),
            Builtin::QName | Builtin::Notation => names::is_valid_qname(value),
            Builtin::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            Builtin::Decimal => DECIMAL.is_match(value),
            Builtin::Float | Builtin::Double => FLOAT.is_match(value),
            Builtin::Duration => is_valid_duration(value),
            Builtin::DateTime => is_valid_date_time(value),
            Builtin::Time => is_valid_time(value),
            Builtin::Date => is_valid_date(value),
            Builtin::GYear => valid_timezone(&G_YEAR, value, 2),
            Builtin::GYearMonth => match G_YEAR_MONTH.captures(value) {
                Some(caps) => in_range(&caps[1], 1, 12) && valid_timezone(&G_YEAR_MONTH, value, 3),
                None => false,
            },
            Builtin::GMonth => match G_MONTH.captures(value) {
                Some(caps) => in_range(&caps[1], 1, 12) && valid_timezone(&G_MONTH, value, 3),
                None => false,
            },
            Builtin::GDay => match G_DAY.captures(value) {
                Some(caps) => in_range(&caps[1], 1, 31) && valid_timezone(&G_DAY, value, 3),
                None => false,
            },
            Builtin::GMonthDay => match G_MONTH_DAY.captures(value) {
                // 2000 is a leap year, so --02-29 is accepted
                Some(caps) => {
                    let month = caps[1].parse().unwrap_or(0);
                    let day = caps[2].parse().unwrap_or(0);
                    NaiveDate::from_ymd_opt(2000, month, day).is_some()
                        && valid_timezone(&G_MONTH_DAY, value, 4)
                }
                None => false,
            },
            Builtin::HexBinary => HEX_BINARY.is_match(value),
            Builtin::Base64Binary => decode_base64(value).is_some(),
            Builtin::Integer
            | Builtin::Long
            | Builtin::Int
            | Builtin::Short
            | Builtin::Byte
            | Builtin::NonNegativeInteger
            | Builtin::PositiveInteger
            | Builtin::UnsignedLong
            | Builtin::UnsignedInt
            | Builtin::UnsignedShort
            | Builtin::UnsignedByte
            | Builtin::NonPositiveInteger
            | Builtin::NegativeInteger => self.is_valid_integer(value),
        }
    }

    fn is_valid_integer(&self, value: &str) -> bool {
        if !INTEGER.is_match(value) {
            return false;
        }
        let (min, max) = match self.integer_bounds() {
            Some(bounds) => bounds,
            None => return false,
        };

        match value.parse::<i128>() {
            Ok(n) => min.map_or(true, |min| n >= min) && max.map_or(true, |max| n <= max),
            // Beyond i128 only the sign matters, and only for unbounded sides.
            Err(_) => {
                let negative = value.starts_with('-');
                if negative {
                    min.is_none()
                } else {
                    max.is_none()
                }
            }
        }
    }

    /// Length as measured by the length facets
    pub fn value_length(&self, value: &str) -> usize {
        match self {
            _ if self.is_list() => value.split_ascii_whitespace().count(),
            Builtin::HexBinary => value.len() / 2,
            Builtin::Base64Binary => decode_base64(value).map_or(0, |bytes| bytes.len()),
            _ => value.chars().count(),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

fn decode_base64(value: &str) -> Option<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).ok()
}

fn in_range(digits: &str, min: u32, max: u32) -> bool {
    digits.parse::<u32>().map_or(false, |n| n >= min && n <= max)
}

/// Timezone offsets are limited to +-14:00
fn valid_timezone(regex: &Regex, value: &str, hours_group: usize) -> bool {
    let caps = match regex.captures(value) {
        Some(caps) => caps,
        None => return false,
    };
    match (caps.get(hours_group), caps.get(hours_group + 1)) {
        (Some(hours), Some(minutes)) => {
            let hours: u32 = hours.as_str().parse().unwrap_or(99);
            let minutes: u32 = minutes.as_str().parse().unwrap_or(99);
            minutes < 60 && (hours < 14 || (hours == 14 && minutes == 0))
        }
        _ => true,
    }
}

fn valid_ymd(year: &str, month: &str, day: &str) -> bool {
    let year: i32 = match year.parse() {
        Ok(year) => year,
        // Years beyond chrono's range: only check the month/day shape.
        Err(_) => return in_range(month, 1, 12) && in_range(day, 1, 31),
    };
    let (Ok(month), Ok(day)) = (month.parse(), day.parse()) else {
        return false;
    };
    // Year 0000 is not allowed in XSD 1.0
    year != 0 && NaiveDate::from_ymd_opt(year, month, day).is_some()
}

fn valid_hms(hours: &str, minutes: &str, seconds: &str, fraction: Option<&str>) -> bool {
    let (Ok(h), Ok(m), Ok(s)) = (
        hours.parse::<u32>(),
        minutes.parse::<u32>(),
        seconds.parse::<u32>(),
    ) else {
        return false;
    };

    // 24:00:00 is the end of the day
    if h == 24 {
        let zero_fraction = fraction.map_or(true, |f| f.trim_start_matches('.').bytes().all(|b| b == b'0'));
        return m == 0 && s == 0 && zero_fraction;
    }
    NaiveTime::from_hms_opt(h, m, s).is_some()
}

fn is_valid_date(value: &str) -> bool {
    match DATE.captures(value) {
        Some(caps) => valid_ymd(&caps[1], &caps[2], &caps[3]) && valid_timezone(&DATE, value, 5),
        None => false,
    }
}

fn is_valid_time(value: &str) -> bool {
    match TIME.captures(value) {
        Some(caps) => {
            valid_hms(&caps[1], &caps[2], &caps[3], caps.get(4).map(|m| m.as_str()))
                && valid_timezone(&TIME, value, 6)
        }
        None => false,
    }
}

fn is_valid_date_time(value: &str) -> bool {
    match DATE_TIME.captures(value) {
        Some(caps) => {
            valid_ymd(&caps[1], &caps[2], &caps[3])
                && valid_hms(&caps[4], &caps[5], &caps[6], caps.get(7).map(|m| m.as_str()))
                && valid_timezone(&DATE_TIME, value, 9)
        }
        None => false,
    }
}

fn is_valid_duration(value: &str) -> bool {
    DURATION.is_match(value)
        && !value.ends_with('P')
        && !value.ends_with('T')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Builtin::from_local_name("int"), Some(Builtin::Int));
        assert_eq!(Builtin::from_local_name("NCName"), Some(Builtin::NCName));
        assert_eq!(Builtin::from_local_name("nope"), None);
        assert_eq!(Builtin::UnsignedShort.name(), "unsignedShort");
        assert_eq!(Builtin::Int.to_string(), "xs:int");
    }

    #[test]
    fn test_integer_ranges() {
        assert!(Builtin::Int.is_valid("2147483647"));
        assert!(!Builtin::Int.is_valid("2147483648"));
        assert!(Builtin::Byte.is_valid("-128"));
        assert!(!Builtin::Byte.is_valid("128"));
        assert!(Builtin::UnsignedLong.is_valid("18446744073709551615"));
        assert!(!Builtin::UnsignedLong.is_valid("-1"));
        assert!(!Builtin::PositiveInteger.is_valid("0"));
        assert!(Builtin::NegativeInteger.is_valid("-1"));
        assert!(Builtin::Integer.is_valid("+123456789012345678901234567890123456789012"));
        assert!(!Builtin::Int.is_valid("thirty"));
        assert!(!Builtin::Int.is_valid("1.0"));
    }

    #[test]
    fn test_decimal_and_float() {
        assert!(Builtin::Decimal.is_valid("-1.50"));
        assert!(Builtin::Decimal.is_valid(".5"));
        assert!(!Builtin::Decimal.is_valid("1e3"));
        assert!(Builtin::Double.is_valid("1e3"));
        assert!(Builtin::Float.is_valid("INF"));
        assert!(Builtin::Float.is_valid("NaN"));
        assert!(!Builtin::Float.is_valid("nan"));
    }

    #[test]
    fn test_boolean() {
        for ok in ["true", "false", "1", "0"] {
            assert!(Builtin::Boolean.is_valid(ok));
        }
        assert!(!Builtin::Boolean.is_valid("TRUE"));
        assert!(!Builtin::Boolean.is_valid("yes"));
    }

    #[test]
    fn test_dates_and_times() {
        assert!(Builtin::Date.is_valid("2024-02-29"));
        assert!(!Builtin::Date.is_valid("2023-02-29"));
        assert!(Builtin::Date.is_valid("2024-01-01Z"));
        assert!(Builtin::Date.is_valid("2024-01-01+02:00"));
        assert!(!Builtin::Date.is_valid("2024-01-01+15:00"));
        assert!(!Builtin::Date.is_valid("0000-01-01"));
        assert!(Builtin::Time.is_valid("13:20:00.5"));
        assert!(Builtin::Time.is_valid("24:00:00"));
        assert!(!Builtin::Time.is_valid("25:00:00"));
        assert!(Builtin::DateTime.is_valid("2002-05-30T09:30:10Z"));
        assert!(!Builtin::DateTime.is_valid("2002-05-30 09:30:10"));
        assert!(Builtin::GYear.is_valid("2024"));
        assert!(Builtin::GYearMonth.is_valid("2024-12"));
        assert!(!Builtin::GYearMonth.is_valid("2024-13"));
        assert!(Builtin::GMonth.is_valid("--05"));
        assert!(Builtin::GDay.is_valid("---31"));
        assert!(Builtin::GMonthDay.is_valid("--02-29"));
        assert!(!Builtin::GMonthDay.is_valid("--02-30"));
    }

    #[test]
    fn test_durations() {
        assert!(Builtin::Duration.is_valid("P1Y2M3DT10H30M"));
        assert!(Builtin::Duration.is_valid("-PT0.5S"));
        assert!(!Builtin::Duration.is_valid("P"));
        assert!(!Builtin::Duration.is_valid("P1DT"));
        assert!(!Builtin::Duration.is_valid("1Y"));
    }

    #[test]
    fn test_binary() {
        assert!(Builtin::HexBinary.is_valid("0FB7"));
        assert!(!Builtin::HexBinary.is_valid("0FB"));
        assert_eq!(Builtin::HexBinary.value_length("0FB7"), 2);
        assert!(Builtin::Base64Binary.is_valid("aGVsbG8="));
        assert!(!Builtin::Base64Binary.is_valid("aGVsbG8"));
        assert_eq!(Builtin::Base64Binary.value_length("aGVsbG8="), 5);
    }

    #[test]
    fn test_names_and_lists() {
        assert!(Builtin::Language.is_valid("en-US"));
        assert!(!Builtin::Language.is_valid("toolonglanguage"));
        assert!(Builtin::NCName.is_valid("item"));
        assert!(!Builtin::NCName.is_valid("a:b"));
        assert!(Builtin::QName.is_valid("a:b"));
        assert!(Builtin::IdRefs.is_valid("a b c"));
        assert_eq!(Builtin::NmTokens.value_length("x y"), 2);
    }

    #[test]
    fn test_white_space() {
        assert_eq!(Builtin::String.white_space(), WhiteSpace::Preserve);
        assert_eq!(Builtin::NormalizedString.white_space(), WhiteSpace::Replace);
        assert_eq!(Builtin::Int.white_space(), WhiteSpace::Collapse);
    }
}
