//! XSD constraining facets
//!
//! This module implements the restriction facets attached to primitive-typed
//! elements and attributes. All checks run on the lexical form, so encode,
//! decode and validate apply identical rules.

use crate::error::{Error, Result, ValidationError};
use crate::host::Value;
use crate::settings::Settings;
use crate::types::builtins::{from_lexical, TypeFamily, XsdType};
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// Restriction facet name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    /// Value must be greater than the bound
    MinExclusive,
    /// Value must be less than the bound
    MaxExclusive,
    /// Value must be at least the bound
    MinInclusive,
    /// Value must be at most the bound
    MaxInclusive,
    /// Maximum number of significant digits
    TotalDigits,
    /// Maximum number of fraction digits
    FractionDigits,
    /// Exact length in characters
    Length,
    /// Minimum length in characters
    MinLength,
    /// Maximum length in characters
    MaxLength,
    /// One allowed value
    Enumeration,
    /// White space handling (not supported)
    WhiteSpace,
    /// Regular expression the whole value must match
    Pattern,
}

impl Facet {
    /// Look up a facet by its tag local name
    pub fn from_name(name: &str) -> Option<Facet> {
        let facet = match name {
            "minExclusive" => Facet::MinExclusive,
            "maxExclusive" => Facet::MaxExclusive,
            "minInclusive" => Facet::MinInclusive,
            "maxInclusive" => Facet::MaxInclusive,
            "totalDigits" => Facet::TotalDigits,
            "fractionDigits" => Facet::FractionDigits,
            "length" => Facet::Length,
            "minLength" => Facet::MinLength,
            "maxLength" => Facet::MaxLength,
            "enumeration" => Facet::Enumeration,
            "whiteSpace" => Facet::WhiteSpace,
            "pattern" => Facet::Pattern,
            _ => return None,
        };
        Some(facet)
    }

    /// Tag local name of the facet
    pub fn name(&self) -> &'static str {
        match self {
            Facet::MinExclusive => "minExclusive",
            Facet::MaxExclusive => "maxExclusive",
            Facet::MinInclusive => "minInclusive",
            Facet::MaxInclusive => "maxInclusive",
            Facet::TotalDigits => "totalDigits",
            Facet::FractionDigits => "fractionDigits",
            Facet::Length => "length",
            Facet::MinLength => "minLength",
            Facet::MaxLength => "maxLength",
            Facet::Enumeration => "enumeration",
            Facet::WhiteSpace => "whiteSpace",
            Facet::Pattern => "pattern",
        }
    }

    fn takes_integer(&self) -> bool {
        matches!(
            self,
            Facet::TotalDigits
                | Facet::FractionDigits
                | Facet::Length
                | Facet::MinLength
                | Facet::MaxLength
        )
    }

    /// Check if the facet applies to a type family
    pub fn admits(&self, family: TypeFamily) -> bool {
        use TypeFamily::*;
        match self {
            Facet::MinExclusive | Facet::MaxExclusive | Facet::MinInclusive | Facet::MaxInclusive => {
                matches!(family, Temporal | Decimal | Floating | SignedInteger | UnsignedInteger)
            }
            Facet::TotalDigits | Facet::FractionDigits => {
                matches!(family, Decimal | SignedInteger | UnsignedInteger)
            }
            Facet::Length | Facet::MinLength | Facet::MaxLength => family == StringLike,
            Facet::Enumeration | Facet::Pattern => true,
            Facet::WhiteSpace => false,
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Facet literal: a string or an integer, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Textual literal (bounds, enumeration, pattern, whiteSpace)
    Text(String),
    /// Integer literal (lengths and digit counts)
    Integer(i64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(s) => write!(f, "{}", s),
            Literal::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// One restriction facet on a primitive-typed node
#[derive(Debug, Clone)]
pub struct Restriction {
    /// Facet name
    pub facet: Facet,
    /// Facet literal
    pub literal: Literal,
    /// Compiled, anchored pattern
    regex: Option<Regex>,
}

impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        self.facet == other.facet && self.literal == other.literal
    }
}

impl Restriction {
    /// Create a restriction from a facet and its `value` attribute
    pub fn new(facet: Facet, value: &str) -> Result<Self> {
        let literal = if facet.takes_integer() {
            let n = value.trim().parse::<i64>().ok().filter(|n| *n >= 0).ok_or_else(|| {
                Error::syntax(format!("{} needs a non-negative integer, got '{}'", facet, value))
            })?;
            Literal::Integer(n)
        } else {
            Literal::Text(value.to_string())
        };

        let regex = if facet == Facet::Pattern {
            let anchored = format!("^(?:{})$", value);
            Some(Regex::new(&anchored).map_err(|e| {
                Error::syntax(format!("invalid pattern '{}': {}", value, e))
            })?)
        } else {
            None
        };

        Ok(Self {
            facet,
            literal,
            regex,
        })
    }

    /// Create a restriction from a facet tag name
    pub fn from_tag(local_name: &str, value: &str) -> Result<Self> {
        let facet = Facet::from_name(local_name)
            .ok_or_else(|| Error::syntax(format!("unknown facet '{}'", local_name)))?;
        Self::new(facet, value)
    }

    fn text(&self) -> &str {
        match &self.literal {
            Literal::Text(s) => s,
            Literal::Integer(_) => "",
        }
    }

    fn count(&self) -> usize {
        match self.literal {
            Literal::Integer(n) => n as usize,
            Literal::Text(_) => 0,
        }
    }

    /// Check one lexical value against this facet
    pub fn check(&self, ty: XsdType, lexical: &str, settings: &Settings) -> Result<()> {
        if self.facet == Facet::WhiteSpace {
            return Err(violation(
                "whiteSpace facet is not supported",
                lexical,
                format!("whiteSpace={}", self.literal),
            ));
        }
        if !self.facet.admits(ty.family()) {
            return Err(violation(
                format!("facet {} does not apply to {}", self.facet, ty),
                lexical,
                format!("{}={}", self.facet, self.literal),
            ));
        }

        let ok = match self.facet {
            Facet::MinExclusive => compare(ty, lexical, self.text(), settings)? == Ordering::Greater,
            Facet::MaxExclusive => compare(ty, lexical, self.text(), settings)? == Ordering::Less,
            Facet::MinInclusive => compare(ty, lexical, self.text(), settings)? != Ordering::Less,
            Facet::MaxInclusive => compare(ty, lexical, self.text(), settings)? != Ordering::Greater,
            Facet::TotalDigits => digit_counts(ty, lexical, settings)?.0 <= self.count(),
            Facet::FractionDigits => digit_counts(ty, lexical, settings)?.1 <= self.count(),
            Facet::Length => lexical.chars().count() == self.count(),
            Facet::MinLength => lexical.chars().count() >= self.count(),
            Facet::MaxLength => lexical.chars().count() <= self.count(),
            Facet::Enumeration => lexical == self.text(),
            Facet::Pattern => self.regex.as_ref().map_or(false, |re| re.is_match(lexical)),
            Facet::WhiteSpace => false,
        };

        if ok {
            Ok(())
        } else {
            Err(violation(
                format!("value violates {}", self.facet),
                lexical,
                format!("{}={}", self.facet, self.literal),
            ))
        }
    }
}

fn violation(message: impl Into<String>, lexical: &str, reason: String) -> Error {
    Error::RestrictionViolation(
        ValidationError::new(message)
            .with_reason(reason)
            .with_instance(lexical),
    )
}

/// Check a lexical value against every restriction of a node
///
/// Enumeration entries are disjunctive: the value must equal at least one of
/// them, if any exist. All other facets must hold together.
pub fn check_restrictions(
    restrictions: &[Restriction],
    ty: XsdType,
    lexical: &str,
    settings: &Settings,
) -> Result<()> {
    let mut enumerations = Vec::new();

    for restriction in restrictions {
        if restriction.facet == Facet::Enumeration {
            if !restriction.facet.admits(ty.family()) {
                restriction.check(ty, lexical, settings)?;
            }
            enumerations.push(restriction.text());
        } else {
            restriction.check(ty, lexical, settings)?;
        }
    }

    if !enumerations.is_empty() && !enumerations.contains(&lexical) {
        return Err(violation(
            "value is not in the enumeration",
            lexical,
            format!("allowed values: {:?}", enumerations),
        ));
    }

    Ok(())
}

/// Typed comparison of a value against a bound literal
fn compare(ty: XsdType, lexical: &str, bound: &str, settings: &Settings) -> Result<Ordering> {
    let value = from_lexical(ty, lexical, settings)?;
    let limit = from_lexical(ty, bound, settings).map_err(|_| {
        Error::syntax(format!("bound '{}' is not a valid {}", bound, ty))
    })?;

    let ordering = match (&value, &limit) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        _ => None,
    };

    ordering.ok_or_else(|| {
        violation(
            format!("value cannot be ordered as {}", ty),
            lexical,
            format!("bound {}", bound),
        )
    })
}

/// Total and fraction digit counts, sign and insignificant zeros excluded
fn digit_counts(ty: XsdType, lexical: &str, settings: &Settings) -> Result<(usize, usize)> {
    let decimal = match from_lexical(ty, lexical, settings)? {
        Value::Decimal(d) => d,
        Value::Int(i) => Decimal::from(i),
        Value::UInt(u) => Decimal::from(u),
        other => {
            return Err(Error::TypeConversion(format!(
                "cannot count digits of a {} value",
                other.type_name()
            )))
        }
    };

    let text = decimal.normalize().abs().to_string();
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let integer_digits = integer.trim_start_matches('0').len();
    let total = (integer_digits + fraction.len()).max(1);
    Ok((total, fraction.len()))
}
