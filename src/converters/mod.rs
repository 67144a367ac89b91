//! Schema-driven converters
//!
//! The three engines walk a [`crate::schema::Schema`] tree in lock-step with
//! host data or document tags:
//! - Encoder: host value graph to XML text
//! - Decoder: XML tags to host value graph
//! - Validator: the decode traversal without building anything

pub mod decoder;
pub mod encoder;
pub mod validator;

pub use decoder::Decoder;
pub use encoder::Encoder;

use crate::error::{Error, ValidationError};
use crate::settings::{Settings, EMPTY_STRING_MARKER};

/// Path of a child element below `parent`
fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, name)
}

/// Text as restriction facets see it: the empty-string marker reads as ""
fn logical_text<'t>(text: &'t str, settings: &Settings) -> &'t str {
    if settings.empty_string_marker() && text == EMPTY_STRING_MARKER {
        ""
    } else {
        text
    }
}

fn cardinality(path: &str, message: impl Into<String>) -> Error {
    Error::Cardinality(ValidationError::new(message).with_path(path))
}

fn mismatch(path: &str, message: impl Into<String>) -> Error {
    Error::StructureMismatch(ValidationError::new(message).with_path(path))
}

fn missing_attribute(path: &str, name: &str) -> Error {
    Error::MissingRequiredAttribute(
        ValidationError::new(format!("required attribute '{}' is missing", name))
            .with_path(path)
            .with_reason(format!("@{}", name)),
    )
}
