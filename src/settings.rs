//! Codec settings
//!
//! Output formatting, lexical formats for temporal and floating point values,
//! and processing limits. Settings can be built in code or read from JSON.

use crate::error::{Error, Result};
use crate::limits::Limits;
use serde::{Deserialize, Serialize};

/// Default XML declaration written before every encoded document
pub const DEFAULT_XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Reserved marker for an empty string when `empty_string_marker` is enabled
pub const EMPTY_STRING_MARKER: &str = "\u{200B}";

/// Configuration shared by the encode, decode and validate engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Line terminator for produced XML
    line_terminator: String,
    /// Indentation unit, repeated once per nesting level
    indent: String,
    /// XML declaration prefix
    xml_declaration: String,
    /// Render empty strings as [`EMPTY_STRING_MARKER`] instead of an empty tag
    empty_string_marker: bool,
    /// chrono format for xs:date (ISO-8601 when unset)
    date_format: Option<String>,
    /// chrono format for xs:time (ISO-8601 when unset)
    time_format: Option<String>,
    /// chrono format for xs:dateTime (ISO-8601 UTC when unset)
    datetime_format: Option<String>,
    /// Fixed fraction digits for xs:double and xs:float
    float_precision: Option<usize>,
    /// Processing limits
    limits: Limits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            line_terminator: "\n".to_string(),
            indent: "\t".to_string(),
            xml_declaration: DEFAULT_XML_DECLARATION.to_string(),
            empty_string_marker: false,
            date_format: None,
            time_format: None,
            datetime_format: None,
            float_precision: None,
            limits: Limits::default(),
        }
    }
}

impl Settings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from a JSON document; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid settings: {}", e)))?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<()> {
        if !self.indent.chars().all(char::is_whitespace) {
            return Err(Error::Config(format!(
                "indent must be whitespace, got {:?}",
                self.indent
            )));
        }
        if !self.line_terminator.chars().all(|c| c == '\r' || c == '\n') {
            return Err(Error::Config(format!(
                "line terminator must be CR and/or LF, got {:?}",
                self.line_terminator
            )));
        }
        Ok(())
    }

    /// Get the line terminator
    pub fn line_terminator(&self) -> &str {
        &self.line_terminator
    }

    /// Get the indentation unit
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Get the XML declaration
    pub fn xml_declaration(&self) -> &str {
        &self.xml_declaration
    }

    /// Check if empty strings are rendered with the marker
    pub fn empty_string_marker(&self) -> bool {
        self.empty_string_marker
    }

    /// Get the xs:date format, if configured
    pub fn date_format(&self) -> Option<&str> {
        self.date_format.as_deref()
    }

    /// Get the xs:time format, if configured
    pub fn time_format(&self) -> Option<&str> {
        self.time_format.as_deref()
    }

    /// Get the xs:dateTime format, if configured
    pub fn datetime_format(&self) -> Option<&str> {
        self.datetime_format.as_deref()
    }

    /// Get the fixed float precision, if configured
    pub fn float_precision(&self) -> Option<usize> {
        self.float_precision
    }

    /// Get the limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Set the line terminator
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// Set the indentation unit
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Set the XML declaration
    pub fn with_xml_declaration(mut self, declaration: impl Into<String>) -> Self {
        self.xml_declaration = declaration.into();
        self
    }

    /// Enable or disable the empty string marker
    pub fn with_empty_string_marker(mut self, enabled: bool) -> Self {
        self.empty_string_marker = enabled;
        self
    }

    /// Set the xs:date format
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Set the xs:time format
    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }

    /// Set the xs:dateTime format
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = Some(format.into());
        self
    }

    /// Set fixed float precision
    pub fn with_float_precision(mut self, digits: usize) -> Self {
        self.float_precision = Some(digits);
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
