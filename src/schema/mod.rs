//! Schema loading
//!
//! A [`Schema`] is loaded from an XSD subset in one of two dialects:
//!
//! - **tree**: one nested element declaration carries the whole structure;
//! - **divided**: leaves, attributes and named types are declared flat at the
//!   top level and stitched together with `ref=` and `type=`.
//!
//! Once loaded a schema is immutable and drives the encode, decode and
//! validate engines in [`crate::converters`].

pub mod model;

pub(crate) mod divided;
pub(crate) mod tree;

pub use model::{Mapping, NodeShape, Occurs, SchemaAttribute, SchemaElement, SKIP_LEVEL};

use crate::converters::{decoder::Decoder, encoder::Encoder, validator};
use crate::error::{Error, Result};
use crate::host::{to_value, Accessor, DynamicAccessor, Value};
use crate::lexer::{local_name, parse_attributes, split_name, tokenize};
use crate::loaders::SourceProvider;
use crate::settings::Settings;
use crate::tags::{document_tags, SchemaKind, SchemaTag, TagForm};
use crate::types::XsdType;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Schema dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Detect from the schema text
    #[default]
    Auto,
    /// Single nested declaration
    Tree,
    /// Flat declarations joined by references
    Divided,
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Dialect::Auto),
            "tree" => Ok(Dialect::Tree),
            "divided" => Ok(Dialect::Divided),
            other => Err(Error::Config(format!("unknown schema dialect '{}'", other))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Auto => write!(f, "auto"),
            Dialect::Tree => write!(f, "tree"),
            Dialect::Divided => write!(f, "divided"),
        }
    }
}

/// A loaded schema
#[derive(Debug, Clone)]
pub struct Schema {
    root: SchemaElement,
    definitions: IndexMap<String, SchemaElement>,
    target_namespace: Option<String>,
    dialect: Dialect,
    settings: Settings,
}

impl Schema {
    /// Load a schema, detecting its dialect, with default settings
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, Dialect::Auto, Settings::default())
    }

    /// Load a schema in the given dialect
    pub fn parse_with(text: &str, dialect: Dialect, settings: Settings) -> Result<Self> {
        settings.limits().check_source_size(text.len())?;

        let (tags, target_namespace) = schema_tags(text)?;
        if tags.is_empty() {
            return Err(Error::syntax("schema declares no elements"));
        }

        let dialect = match dialect {
            Dialect::Auto => detect_dialect(&tags),
            other => other,
        };
        debug!(%dialect, tags = tags.len(), "loading schema");

        let definitions = match dialect {
            Dialect::Tree => load_tree(&tags, &settings)?,
            _ => divided::DividedLoader::new(&tags, settings.limits()).load()?,
        };

        let root = definitions
            .values()
            .find(|e| !e.children.is_empty())
            .cloned()
            .ok_or_else(|| Error::syntax("schema declares no composite top-level element"))?;
        definitions.values().try_for_each(SchemaElement::check)?;

        info!(root = %root.name, definitions = definitions.len(), %dialect, "schema loaded");
        Ok(Self {
            root,
            definitions,
            target_namespace,
            dialect,
            settings,
        })
    }

    /// Load a schema from lines of text
    pub fn from_lines<I, S>(lines: I, dialect: Dialect, settings: Settings) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::parse_with(&text, dialect, settings)
    }

    /// Load a schema through a source provider
    pub fn from_source(
        source: &dyn SourceProvider,
        dialect: Dialect,
        settings: Settings,
    ) -> Result<Self> {
        Self::from_lines(source.read_lines()?, dialect, settings)
    }

    /// Wrap a pre-built schema tree
    pub fn from_root(root: SchemaElement, settings: Settings) -> Result<Self> {
        if root.children.is_empty() {
            return Err(Error::syntax(format!(
                "root element '{}' must have at least one child",
                root.name
            )));
        }
        root.check()?;

        let mut definitions = IndexMap::new();
        definitions.insert(root.name.clone(), root.clone());
        Ok(Self {
            root,
            definitions,
            target_namespace: None,
            dialect: Dialect::Tree,
            settings,
        })
    }

    /// Root element
    pub fn root(&self) -> &SchemaElement {
        &self.root
    }

    /// Composite top-level element by name
    pub fn definition(&self, name: &str) -> Option<&SchemaElement> {
        self.definitions.get(name)
    }

    /// Composite top-level elements, in document order
    pub fn definitions(&self) -> impl Iterator<Item = &SchemaElement> {
        self.definitions.values()
    }

    /// Target namespace, emitted as `xmlns` on encoded documents
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Dialect the schema was loaded as
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Engine settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the engine settings
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the target namespace
    pub fn with_target_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.target_namespace = Some(namespace.into());
        self
    }

    /// Encode a value graph into an XML document
    pub fn encode(&self, value: &Value) -> Result<String> {
        self.encode_with(value, &DynamicAccessor::new())
    }

    /// Encode through a custom accessor
    pub fn encode_with(&self, value: &Value, accessor: &dyn Accessor) -> Result<String> {
        Encoder::new(accessor, &self.settings, self.target_namespace()).encode(&self.root, value)
    }

    /// Encode any `Serialize` type
    pub fn encode_serialize<T: Serialize>(&self, data: &T) -> Result<String> {
        self.encode(&to_value(data)?)
    }

    /// Encode a value graph and hand the document to a source provider
    pub fn encode_to(&self, value: &Value, sink: &mut dyn SourceProvider) -> Result<()> {
        let xml = self.encode(value)?;
        sink.persist(&xml)
    }

    /// Decode an XML document into a value graph
    pub fn decode(&self, xml: &str) -> Result<Value> {
        self.decode_with(xml, &DynamicAccessor::new())
    }

    /// Decode through a custom accessor
    pub fn decode_with(&self, xml: &str, accessor: &dyn Accessor) -> Result<Value> {
        self.settings.limits().check_source_size(xml.len())?;
        let tags = document_tags(xml)?;
        Decoder::new(self, accessor).decode(&tags)
    }

    /// Decode a document read through a source provider
    pub fn decode_source(&self, source: &dyn SourceProvider) -> Result<Value> {
        self.decode(&source.read_lines()?.join("\n"))
    }

    /// Validate a document; the error describes the first violation
    pub fn validate(&self, xml: &str) -> Result<()> {
        validator::validate(self, xml)
    }

    /// Check if a document is valid
    pub fn is_valid(&self, xml: &str) -> bool {
        self.validate(xml).is_ok()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.target_namespace {
            writeln!(f, "namespace {}", namespace)?;
        }
        write!(f, "{}", self.root)?;
        for definition in self.definitions.values().filter(|d| d.name != self.root.name) {
            write!(f, "{}", definition)?;
        }
        Ok(())
    }
}

/// Classify schema tokens, dropping the `xs:schema` wrapper and annotations
fn schema_tags(text: &str) -> Result<(Vec<SchemaTag>, Option<String>)> {
    let mut tags: Vec<SchemaTag> = Vec::new();
    let mut namespace = None;
    let mut annotation_depth = 0usize;

    for raw in tokenize(text)? {
        let is_close = raw.starts_with("</");
        let is_one_liner = raw.ends_with("/>");
        let inner = raw
            .trim_start_matches("</")
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/');
        let (name, rest) = split_name(inner);
        let local = local_name(name);

        if annotation_depth > 0 {
            if local == "annotation" {
                if is_close {
                    annotation_depth -= 1;
                } else if !is_one_liner {
                    annotation_depth += 1;
                }
            }
            continue;
        }

        match local {
            "schema" => {
                if !is_close {
                    namespace = parse_attributes(rest)?
                        .into_iter()
                        .find(|(n, _)| n == "targetNamespace")
                        .map(|(_, v)| v);
                }
            }
            "annotation" => {
                if !is_close && !is_one_liner {
                    annotation_depth = 1;
                }
            }
            _ => {
                let index = tags.len();
                tags.push(SchemaTag::parse(&raw, index)?);
            }
        }
    }

    Ok((tags, namespace))
}

/// Divided when references, named types or flat leaf declarations appear
fn detect_dialect(tags: &[SchemaTag]) -> Dialect {
    let mut depth = 0usize;
    for tag in tags {
        let named_type = ["type", "base"]
            .iter()
            .filter_map(|attr| tag.attr(attr))
            .any(|name| XsdType::from_name(name).is_none());
        let flat = depth == 0 && (tag.kind != SchemaKind::Element || tag.is_one_liner());

        if tag.attr("ref").is_some() || named_type || flat {
            return Dialect::Divided;
        }
        match tag.form {
            TagForm::Open => depth += 1,
            TagForm::Close => depth = depth.saturating_sub(1),
            TagForm::OneLiner => {}
        }
    }
    Dialect::Tree
}

/// Load tree-dialect top-level elements
fn load_tree(tags: &[SchemaTag], settings: &Settings) -> Result<IndexMap<String, SchemaElement>> {
    let parser = tree::TreeParser::new(tags, &tree::NoDefinitions, settings.limits());
    let mut definitions: IndexMap<String, SchemaElement> = IndexMap::new();
    let mut i = 0;

    while i < tags.len() {
        let (element, next) = parser.parse_element(i, tags.len(), 0)?;
        i = next;
        if element.shape() != NodeShape::Composite {
            continue;
        }
        match definitions.get(&element.name) {
            Some(existing) if *existing == element => {
                debug!(name = %element.name, "identical duplicate definition ignored");
            }
            Some(_) => {
                return Err(Error::DuplicateDefinition(format!(
                    "element '{}' defined twice with different content",
                    element.name
                )));
            }
            None => {
                definitions.insert(element.name.clone(), element);
            }
        }
    }
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const PERSON: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:people">
    <xs:annotation><xs:documentation>People</xs:documentation></xs:annotation>
    <xs:element name="Person">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="name" type="xs:string"/>
                <xs:element name="age" type="xs:int" minOccurs="0"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

    #[test]
    fn test_parse_tree_schema() {
        let schema = Schema::parse(PERSON).unwrap();
        assert_eq!(schema.dialect(), Dialect::Tree);
        assert_eq!(schema.root().name, "Person");
        assert_eq!(schema.target_namespace(), Some("urn:people"));
        assert_eq!(schema.root().children.len(), 2);
    }

    #[test]
    fn test_detects_divided_dialect() {
        let schema = Schema::parse(
            r#"<xs:schema>
                <xs:element name="name" type="xs:string"/>
                <xs:element name="Person"><xs:complexType><xs:sequence>
                    <xs:element ref="name"/>
                </xs:sequence></xs:complexType></xs:element>
            </xs:schema>"#,
        )
        .unwrap();
        assert_eq!(schema.dialect(), Dialect::Divided);
        assert_eq!(schema.root().children[0].type_, Some(XsdType::String));
    }

    #[test]
    fn test_tree_dialect_rejects_references() {
        let text = r#"<xs:element name="r"><xs:complexType><xs:sequence>
            <xs:element ref="x"/>
        </xs:sequence></xs:complexType></xs:element>"#;
        let err = Schema::parse_with(text, Dialect::Tree, Settings::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn test_first_composite_is_root() {
        let schema = Schema::parse(
            r#"<xs:element name="A"><xs:complexType><xs:sequence>
                <xs:element name="x" type="xs:int"/>
            </xs:sequence></xs:complexType></xs:element>
            <xs:element name="B"><xs:complexType><xs:sequence>
                <xs:element name="y" type="xs:int"/>
            </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap();
        assert_eq!(schema.root().name, "A");
        assert!(schema.definition("B").is_some());
        assert_eq!(schema.definitions().count(), 2);
    }

    #[test]
    fn test_from_lines_and_root() {
        let lines: Vec<&str> = PERSON.lines().collect();
        let schema = Schema::from_lines(lines, Dialect::Auto, Settings::default()).unwrap();
        assert_eq!(schema.root().name, "Person");

        let rebuilt = Schema::from_root(schema.root().clone(), Settings::default()).unwrap();
        assert_eq!(rebuilt.root(), schema.root());

        let childless = SchemaElement::composite("E")
            .with_attribute(SchemaAttribute::new("a", XsdType::Int));
        assert!(Schema::from_root(childless, Settings::default()).is_err());
    }

    #[test]
    fn test_empty_schema() {
        assert_eq!(
            Schema::parse("<xs:schema></xs:schema>").unwrap_err().kind(),
            ErrorKind::SchemaSyntax
        );
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("Divided".parse::<Dialect>().unwrap(), Dialect::Divided);
        assert!("flat".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_schema_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
