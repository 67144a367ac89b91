//! Validate engine
//!
//! Validation is the decode traversal run through a [`DiscardAccessor`]:
//! every element name, attribute, cardinality, restriction and lexical value
//! is checked exactly as decoding would, but no host object is built. With an
//! accessor that accepts any member, a document validates exactly when it
//! decodes.

use super::Decoder;
use crate::error::{Error, Result};
use crate::host::DiscardAccessor;
use crate::schema::Schema;
use crate::tags::document_tags;
use tracing::debug;

/// Validate document text against a schema; the error describes the first
/// violation
pub fn validate(schema: &Schema, xml: &str) -> Result<()> {
    schema.settings().limits().check_source_size(xml.len())?;
    let tags = document_tags(xml)?;
    let result = Decoder::new(schema, &DiscardAccessor).decode(&tags).map(|_| ());
    if let Err(e) = &result {
        debug!(kind = ?e.kind(), error = %e, "document is invalid");
    }
    result
}

/// Validate several documents, returning the index and error of each failure
pub fn validate_all<'x, I>(schema: &Schema, documents: I) -> Vec<(usize, Error)>
where
    I: IntoIterator<Item = &'x str>,
{
    documents
        .into_iter()
        .enumerate()
        .filter_map(|(idx, xml)| validate(schema, xml).err().map(|e| (idx, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::{Occurs, SchemaElement};
    use crate::settings::Settings;
    use crate::types::{Facet, Restriction, XsdType};

    fn schema() -> Schema {
        let root = SchemaElement::composite("r")
            .with_child(
                SchemaElement::leaf("code", XsdType::String)
                    .with_restriction(Restriction::new(Facet::Enumeration, "A").unwrap())
                    .with_restriction(Restriction::new(Facet::Enumeration, "B").unwrap()),
            )
            .with_child(SchemaElement::leaf("n", XsdType::Int).with_occurs(Occurs::optional()));
        Schema::from_root(root, Settings::default()).unwrap()
    }

    #[test]
    fn test_validate_enumeration() {
        let schema = schema();
        assert!(validate(&schema, "<r><code>A</code></r>").is_ok());
        assert!(validate(&schema, "<r><code>B</code><n>2</n></r>").is_ok());
        assert_eq!(
            validate(&schema, "<r><code>C</code></r>").unwrap_err().kind(),
            ErrorKind::RestrictionViolation
        );
    }

    #[test]
    fn test_validate_reports_first_violation() {
        let err = validate(&schema(), "<r><code>C</code><n>x</n></r>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RestrictionViolation);
        assert!(err.to_string().contains("/r/code"));
    }

    #[test]
    fn test_validate_malformed_text() {
        assert_eq!(
            validate(&schema(), "<r><code>A</code>").unwrap_err().kind(),
            ErrorKind::Xml
        );
    }

    #[test]
    fn test_validate_all() {
        let failures = validate_all(
            &schema(),
            vec!["<r><code>A</code></r>", "<r/>", "<r><code>B</code></r>"],
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
    }
}
