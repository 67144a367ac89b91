//! XSD built-in types
//!
//! This module defines the primitive types understood by the schema parser and
//! the symmetric conversion between host values and their lexical form.

use crate::error::{Error, Result};
use crate::host::{decimal_of, Value};
use crate::settings::{Settings, EMPTY_STRING_MARKER};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Family of primitive types sharing conversion and facet rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    /// xs:boolean
    Boolean,
    /// Opaque strings (string, token, anyURI, hexBinary, ...)
    StringLike,
    /// xs:date, xs:time, xs:dateTime
    Temporal,
    /// xs:decimal
    Decimal,
    /// xs:double, xs:float
    Floating,
    /// Signed integer types
    SignedInteger,
    /// Unsigned integer types
    UnsignedInteger,
}

/// A primitive XSD type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XsdType {
    /// xs:boolean
    Boolean,
    /// xs:string
    String,
    /// xs:duration
    Duration,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:anyURI
    AnyUri,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:Name
    Name,
    /// xs:NCName
    NcName,
    /// xs:NMTOKEN
    NmToken,
    /// xs:ID
    Id,
    /// xs:IDREF
    IdRef,
    /// xs:ENTITY
    Entity,
    /// xs:date
    Date,
    /// xs:time
    Time,
    /// xs:dateTime
    DateTime,
    /// xs:decimal
    Decimal,
    /// xs:double
    Double,
    /// xs:float
    Float,
    /// xs:byte
    Byte,
    /// xs:short
    Short,
    /// xs:int
    Int,
    /// xs:long
    Long,
    /// xs:integer (held in 64 bits)
    Integer,
    /// xs:nonNegativeInteger
    NonNegativeInteger,
    /// xs:positiveInteger
    PositiveInteger,
    /// xs:nonPositiveInteger
    NonPositiveInteger,
    /// xs:negativeInteger
    NegativeInteger,
    /// xs:unsignedByte
    UnsignedByte,
    /// xs:unsignedShort
    UnsignedShort,
    /// xs:unsignedInt
    UnsignedInt,
    /// xs:unsignedLong
    UnsignedLong,
}

const ALL_TYPES: &[XsdType] = &[
    XsdType::Boolean,
    XsdType::String,
    XsdType::Duration,
    XsdType::HexBinary,
    XsdType::Base64Binary,
    XsdType::AnyUri,
    XsdType::NormalizedString,
    XsdType::Token,
    XsdType::Language,
    XsdType::Name,
    XsdType::NcName,
    XsdType::NmToken,
    XsdType::Id,
    XsdType::IdRef,
    XsdType::Entity,
    XsdType::Date,
    XsdType::Time,
    XsdType::DateTime,
    XsdType::Decimal,
    XsdType::Double,
    XsdType::Float,
    XsdType::Byte,
    XsdType::Short,
    XsdType::Int,
    XsdType::Long,
    XsdType::Integer,
    XsdType::NonNegativeInteger,
    XsdType::PositiveInteger,
    XsdType::NonPositiveInteger,
    XsdType::NegativeInteger,
    XsdType::UnsignedByte,
    XsdType::UnsignedShort,
    XsdType::UnsignedInt,
    XsdType::UnsignedLong,
];

lazy_static::lazy_static! {
    /// Primitive types by local name
    static ref TYPES_BY_NAME: HashMap<&'static str, XsdType> =
        ALL_TYPES.iter().map(|ty| (ty.name(), *ty)).collect();

    /// XSD boolean value mapping
    static ref XSD_BOOLEAN_MAP: HashMap<&'static str, bool> = {
        let mut m = HashMap::new();
        m.insert("false", false);
        m.insert("0", false);
        m.insert("true", true);
        m.insert("1", true);
        m
    };
}

impl XsdType {
    /// Look up a primitive by name; accepts `xs:int`, `xsd:int` or `int`
    pub fn from_name(name: &str) -> Option<XsdType> {
        let local = match name.split_once(':') {
            Some((_, local)) => local,
            None => name,
        };
        TYPES_BY_NAME.get(local).copied()
    }

    /// Local name of the type
    pub fn name(&self) -> &'static str {
        match self {
            XsdType::Boolean => "boolean",
            XsdType::String => "string",
            XsdType::Duration => "duration",
            XsdType::HexBinary => "hexBinary",
            XsdType::Base64Binary => "base64Binary",
            XsdType::AnyUri => "anyURI",
            XsdType::NormalizedString => "normalizedString",
            XsdType::Token => "token",
            XsdType::Language => "language",
            XsdType::Name => "Name",
            XsdType::NcName => "NCName",
            XsdType::NmToken => "NMTOKEN",
            XsdType::Id => "ID",
            XsdType::IdRef => "IDREF",
            XsdType::Entity => "ENTITY",
            XsdType::Date => "date",
            XsdType::Time => "time",
            XsdType::DateTime => "dateTime",
            XsdType::Decimal => "decimal",
            XsdType::Double => "double",
            XsdType::Float => "float",
            XsdType::Byte => "byte",
            XsdType::Short => "short",
            XsdType::Int => "int",
            XsdType::Long => "long",
            XsdType::Integer => "integer",
            XsdType::NonNegativeInteger => "nonNegativeInteger",
            XsdType::PositiveInteger => "positiveInteger",
            XsdType::NonPositiveInteger => "nonPositiveInteger",
            XsdType::NegativeInteger => "negativeInteger",
            XsdType::UnsignedByte => "unsignedByte",
            XsdType::UnsignedShort => "unsignedShort",
            XsdType::UnsignedInt => "unsignedInt",
            XsdType::UnsignedLong => "unsignedLong",
        }
    }

    /// Family of the type
    pub fn family(&self) -> TypeFamily {
        match self {
            XsdType::Boolean => TypeFamily::Boolean,
            XsdType::Date | XsdType::Time | XsdType::DateTime => TypeFamily::Temporal,
            XsdType::Decimal => TypeFamily::Decimal,
            XsdType::Double | XsdType::Float => TypeFamily::Floating,
            XsdType::Byte
            | XsdType::Short
            | XsdType::Int
            | XsdType::Long
            | XsdType::Integer
            | XsdType::NonNegativeInteger
            | XsdType::PositiveInteger
            | XsdType::NonPositiveInteger
            | XsdType::NegativeInteger => TypeFamily::SignedInteger,
            XsdType::UnsignedByte
            | XsdType::UnsignedShort
            | XsdType::UnsignedInt
            | XsdType::UnsignedLong => TypeFamily::UnsignedInteger,
            _ => TypeFamily::StringLike,
        }
    }

    /// Inclusive value range of an integer type
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        let range = match self {
            XsdType::Byte => (i8::MIN as i128, i8::MAX as i128),
            XsdType::Short => (i16::MIN as i128, i16::MAX as i128),
            XsdType::Int => (i32::MIN as i128, i32::MAX as i128),
            XsdType::Long | XsdType::Integer => (i64::MIN as i128, i64::MAX as i128),
            XsdType::NonNegativeInteger => (0, i64::MAX as i128),
            XsdType::PositiveInteger => (1, i64::MAX as i128),
            XsdType::NonPositiveInteger => (i64::MIN as i128, 0),
            XsdType::NegativeInteger => (i64::MIN as i128, -1),
            XsdType::UnsignedByte => (0, u8::MAX as i128),
            XsdType::UnsignedShort => (0, u16::MAX as i128),
            XsdType::UnsignedInt => (0, u32::MAX as i128),
            XsdType::UnsignedLong => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }
}

impl fmt::Display for XsdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

fn mismatch(ty: XsdType, value: &Value) -> Error {
    Error::TypeConversion(format!(
        "cannot write a {} value as {}",
        value.type_name(),
        ty
    ))
}

fn unparsable(ty: XsdType, text: &str) -> Error {
    Error::TypeConversion(format!("'{}' is not a valid {}", text, ty))
}

/// Convert a host value to its lexical form; `None` for null
pub fn to_lexical(ty: XsdType, value: &Value, settings: &Settings) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }

    let text = match ty.family() {
        TypeFamily::Boolean => match value {
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            other => return Err(mismatch(ty, other)),
        },
        TypeFamily::StringLike => match value {
            Value::String(s) if s.is_empty() && settings.empty_string_marker() => {
                EMPTY_STRING_MARKER.to_string()
            }
            Value::String(s) => s.clone(),
            other => return Err(mismatch(ty, other)),
        },
        TypeFamily::Temporal => temporal_to_lexical(ty, value, settings)?,
        TypeFamily::Decimal => {
            let d = decimal_of(value).ok_or_else(|| mismatch(ty, value))?;
            format_decimal(d)
        }
        TypeFamily::Floating => {
            let f = match value {
                Value::Double(f) => *f,
                Value::Int(i) => *i as f64,
                Value::UInt(u) => *u as f64,
                Value::Decimal(d) => d.to_f64().ok_or_else(|| mismatch(ty, value))?,
                other => return Err(mismatch(ty, other)),
            };
            format_floating(ty, f, settings)?
        }
        TypeFamily::SignedInteger | TypeFamily::UnsignedInteger => {
            let n: i128 = match value {
                Value::Int(i) => i128::from(*i),
                Value::UInt(u) => i128::from(*u),
                other => return Err(mismatch(ty, other)),
            };
            check_range(ty, n)?;
            n.to_string()
        }
    };

    Ok(Some(text))
}

/// Convert a lexical form to a host value
pub fn from_lexical(ty: XsdType, text: &str, settings: &Settings) -> Result<Value> {
    if ty.family() == TypeFamily::StringLike {
        if settings.empty_string_marker() && text == EMPTY_STRING_MARKER {
            return Ok(Value::String(String::new()));
        }
        return Ok(Value::String(text.to_string()));
    }

    let trimmed = text.trim();
    match ty.family() {
        TypeFamily::Boolean => XSD_BOOLEAN_MAP
            .get(trimmed)
            .map(|b| Value::Bool(*b))
            .ok_or_else(|| unparsable(ty, text)),
        TypeFamily::Temporal => temporal_from_lexical(ty, trimmed, settings),
        TypeFamily::Decimal => trimmed
            .parse::<Decimal>()
            .map(Value::Decimal)
            .map_err(|_| unparsable(ty, text)),
        TypeFamily::Floating => {
            let f = match trimmed {
                "NaN" => f64::NAN,
                "INF" | "+INF" => f64::INFINITY,
                "-INF" => f64::NEG_INFINITY,
                _ => trimmed.parse::<f64>().map_err(|_| unparsable(ty, text))?,
            };
            if ty == XsdType::Float && f.is_finite() && f.abs() > f64::from(f32::MAX) {
                return Err(unparsable(ty, text));
            }
            Ok(Value::Double(f))
        }
        TypeFamily::SignedInteger => {
            let n = trimmed
                .trim_start_matches('+')
                .parse::<i128>()
                .map_err(|_| unparsable(ty, text))?;
            check_range(ty, n)?;
            Ok(Value::Int(n as i64))
        }
        TypeFamily::UnsignedInteger => {
            let n = trimmed
                .trim_start_matches('+')
                .parse::<i128>()
                .map_err(|_| unparsable(ty, text))?;
            check_range(ty, n)?;
            Ok(Value::UInt(n as u64))
        }
        TypeFamily::StringLike => Ok(Value::String(text.to_string())),
    }
}

fn check_range(ty: XsdType, n: i128) -> Result<()> {
    if let Some((min, max)) = ty.integer_range() {
        if n < min || n > max {
            return Err(Error::TypeConversion(format!(
                "{} is out of range for {} ({}..={})",
                n, ty, min, max
            )));
        }
    }
    Ok(())
}

/// Decimal lexical form; integral values keep one fraction digit
fn format_decimal(d: Decimal) -> String {
    if d.is_zero() {
        return "0.0".to_string();
    }
    let text = d.normalize().to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

fn format_floating(ty: XsdType, f: f64, settings: &Settings) -> Result<String> {
    if f.is_nan() {
        return Ok("NaN".to_string());
    }
    if f.is_infinite() {
        return Ok(if f > 0.0 { "INF" } else { "-INF" }.to_string());
    }
    if ty == XsdType::Float && f.abs() > f64::from(f32::MAX) {
        return Err(Error::TypeConversion(format!("{} is out of range for {}", f, ty)));
    }
    Ok(match settings.float_precision() {
        Some(digits) => format!("{:.*}", digits, f),
        None if ty == XsdType::Float => format!("{:?}", f as f32),
        None => format!("{:?}", f),
    })
}

fn temporal_to_lexical(ty: XsdType, value: &Value, settings: &Settings) -> Result<String> {
    match (ty, value) {
        (XsdType::Date, Value::Date(d)) => {
            Ok(d.format(settings.date_format().unwrap_or("%Y-%m-%d")).to_string())
        }
        (XsdType::Date, Value::DateTime(dt)) => {
            let d = dt.date_naive();
            Ok(d.format(settings.date_format().unwrap_or("%Y-%m-%d")).to_string())
        }
        (XsdType::Time, Value::Time(t)) => {
            let default = if t.nanosecond() == 0 { "%H:%M:%S" } else { "%H:%M:%S%.f" };
            Ok(t.format(settings.time_format().unwrap_or(default)).to_string())
        }
        (XsdType::DateTime, Value::DateTime(dt)) => Ok(match settings.datetime_format() {
            Some(format) => dt.format(format).to_string(),
            None => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }),
        // JSON and serde hand temporal values over as text
        (ty, Value::String(text)) => {
            temporal_to_lexical(ty, &temporal_from_lexical(ty, text, settings)?, settings)
        }
        (ty, other) => Err(mismatch(ty, other)),
    }
}

fn temporal_from_lexical(ty: XsdType, text: &str, settings: &Settings) -> Result<Value> {
    let bad = || unparsable(ty, text);
    match ty {
        XsdType::Date => {
            let parsed = match settings.date_format() {
                Some(format) => NaiveDate::parse_from_str(text, format),
                None => NaiveDate::parse_from_str(text.trim_end_matches('Z'), "%Y-%m-%d"),
            };
            parsed.map(Value::Date).map_err(|_| bad())
        }
        XsdType::Time => {
            let parsed = match settings.time_format() {
                Some(format) => NaiveTime::parse_from_str(text, format),
                None => NaiveTime::parse_from_str(text.trim_end_matches('Z'), "%H:%M:%S%.f"),
            };
            parsed.map(Value::Time).map_err(|_| bad())
        }
        XsdType::DateTime => {
            let parsed = match settings.datetime_format() {
                Some(format) => DateTime::parse_from_str(text, format)
                    .map(|dt| dt.with_timezone(&Utc))
                    .or_else(|_| {
                        NaiveDateTime::parse_from_str(text, format)
                            .map(|naive| Utc.from_utc_datetime(&naive))
                    }),
                // Timestamps without an offset are taken as UTC.
                None => DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .or_else(|_| {
                        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                            .map(|naive| Utc.from_utc_datetime(&naive))
                    }),
            };
            parsed.map(Value::DateTime).map_err(|_| bad())
        }
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(ty: XsdType, value: Value) -> String {
        to_lexical(ty, &value, &Settings::default()).unwrap().unwrap()
    }

    fn parse(ty: XsdType, text: &str) -> Result<Value> {
        from_lexical(ty, text, &Settings::default())
    }

    #[test]
    fn test_type_lookup() {
        assert_eq!(XsdType::from_name("xs:int"), Some(XsdType::Int));
        assert_eq!(XsdType::from_name("xsd:NCName"), Some(XsdType::NcName));
        assert_eq!(XsdType::from_name("dateTime"), Some(XsdType::DateTime));
        assert_eq!(XsdType::from_name("xs:AddressType"), None);
        assert_eq!(XsdType::AnyUri.family(), TypeFamily::StringLike);
    }

    #[test]
    fn test_boolean() {
        assert_eq!(lex(XsdType::Boolean, Value::Bool(true)), "true");
        assert_eq!(parse(XsdType::Boolean, "1").unwrap(), Value::Bool(true));
        assert_eq!(parse(XsdType::Boolean, "false").unwrap(), Value::Bool(false));
        assert!(parse(XsdType::Boolean, "yes").is_err());
    }

    #[test]
    fn test_decimal_formatting() {
        assert_eq!(lex(XsdType::Decimal, Value::Decimal(Decimal::ZERO)), "0.0");
        assert_eq!(lex(XsdType::Decimal, Value::Decimal(Decimal::new(1250, 2))), "12.5");
        assert_eq!(lex(XsdType::Decimal, Value::Int(7)), "7.0");
        assert_eq!(
            parse(XsdType::Decimal, "12.50").unwrap(),
            Value::Decimal(Decimal::new(125, 1))
        );
    }

    #[test]
    fn test_floating() {
        assert_eq!(lex(XsdType::Double, Value::Double(1.0)), "1.0");
        assert_eq!(lex(XsdType::Double, Value::Double(f64::INFINITY)), "INF");
        assert_eq!(parse(XsdType::Double, "-INF").unwrap(), Value::Double(f64::NEG_INFINITY));
        let fixed = Settings::default().with_float_precision(3);
        assert_eq!(
            to_lexical(XsdType::Double, &Value::Double(2.5), &fixed).unwrap().unwrap(),
            "2.500"
        );
        assert!(to_lexical(XsdType::Float, &Value::Double(1e300), &Settings::default()).is_err());
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(lex(XsdType::Byte, Value::Int(-128)), "-128");
        assert!(to_lexical(XsdType::Byte, &Value::Int(128), &Settings::default()).is_err());
        assert!(parse(XsdType::UnsignedShort, "-1").is_err());
        assert_eq!(parse(XsdType::UnsignedLong, "18446744073709551615").unwrap(), Value::UInt(u64::MAX));
        assert_eq!(parse(XsdType::Int, " +42 ").unwrap(), Value::Int(42));
        assert!(parse(XsdType::PositiveInteger, "0").is_err());
    }

    #[test]
    fn test_string_like_and_marker() {
        assert_eq!(lex(XsdType::Token, Value::from("abc")), "abc");
        assert!(to_lexical(XsdType::String, &Value::Int(1), &Settings::default()).is_err());

        let marked = Settings::default().with_empty_string_marker(true);
        let text = to_lexical(XsdType::String, &Value::from(""), &marked).unwrap().unwrap();
        assert_eq!(text, EMPTY_STRING_MARKER);
        assert_eq!(from_lexical(XsdType::String, &text, &marked).unwrap(), Value::from(""));
    }

    #[test]
    fn test_temporal_defaults() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(lex(XsdType::Date, Value::Date(date)), "2024-02-29");
        assert_eq!(parse(XsdType::Date, "2024-02-29").unwrap(), Value::Date(date));

        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        assert_eq!(lex(XsdType::DateTime, Value::DateTime(dt)), "2024-05-01T10:30:00Z");
        assert_eq!(
            parse(XsdType::DateTime, "2024-05-01T12:30:00+02:00").unwrap(),
            Value::DateTime(dt)
        );

        let t = NaiveTime::from_hms_opt(8, 15, 0).unwrap();
        assert_eq!(lex(XsdType::Time, Value::Time(t)), "08:15:00");
        assert_eq!(parse(XsdType::Time, "08:15:00").unwrap(), Value::Time(t));
    }

    #[test]
    fn test_temporal_custom_formats() {
        let settings = Settings::default()
            .with_date_format("%d.%m.%Y")
            .with_datetime_format("%Y%m%d%H%M%S");
        let date = NaiveDate::from_ymd_opt(2023, 12, 24).unwrap();
        assert_eq!(
            to_lexical(XsdType::Date, &Value::Date(date), &settings).unwrap().unwrap(),
            "24.12.2023"
        );
        assert_eq!(
            from_lexical(XsdType::DateTime, "20231224180000", &settings).unwrap(),
            Value::DateTime(Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_temporal_type_mismatch() {
        let settings = Settings::default();
        assert!(to_lexical(XsdType::Time, &Value::from(8), &settings).is_err());
        assert!(to_lexical(XsdType::Time, &Value::from("08:00"), &settings).is_err());
    }

    #[test]
    fn test_temporal_from_text() {
        let settings = Settings::default();
        assert_eq!(
            to_lexical(XsdType::Date, &Value::from("2024-05-17"), &settings).unwrap(),
            Some("2024-05-17".to_string())
        );
        assert_eq!(
            to_lexical(XsdType::Time, &Value::from("08:30:00"), &settings).unwrap(),
            Some("08:30:00".to_string())
        );
    }
}
