//! Tag classifiers
//!
//! Schema tags are classified into the ten schema kinds the parsers understand.
//! Document tags are classified into seven structural shapes.

use crate::error::{Error, ParseError, Result};
use crate::lexer::{local_name, parse_attributes, split_name, unescape_text};
use std::fmt;

/// Kind of a schema tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// `xs:element`
    Element,
    /// `xs:complexType`
    ComplexType,
    /// `xs:sequence`
    Sequence,
    /// `xs:attribute`
    Attribute,
    /// `xs:choice`
    Choice,
    /// `xs:simpleType`
    SimpleType,
    /// `xs:simpleContent`
    SimpleContent,
    /// `xs:restriction`
    Restriction,
    /// `xs:extension`
    Extension,
    /// Any restriction facet; the facet itself is read from the tag name
    RestrictionItem,
}

/// Classification table, checked in order
const SCHEMA_KINDS: &[(&str, SchemaKind)] = &[
    ("complexType", SchemaKind::ComplexType),
    ("simpleContent", SchemaKind::SimpleContent),
    ("simpleType", SchemaKind::SimpleType),
    ("sequence", SchemaKind::Sequence),
    ("choice", SchemaKind::Choice),
    ("attribute", SchemaKind::Attribute),
    ("restriction", SchemaKind::Restriction),
    ("extension", SchemaKind::Extension),
    ("element", SchemaKind::Element),
    ("minExclusive", SchemaKind::RestrictionItem),
    ("maxExclusive", SchemaKind::RestrictionItem),
    ("minInclusive", SchemaKind::RestrictionItem),
    ("maxInclusive", SchemaKind::RestrictionItem),
    ("totalDigits", SchemaKind::RestrictionItem),
    ("fractionDigits", SchemaKind::RestrictionItem),
    ("length", SchemaKind::RestrictionItem),
    ("minLength", SchemaKind::RestrictionItem),
    ("maxLength", SchemaKind::RestrictionItem),
    ("enumeration", SchemaKind::RestrictionItem),
    ("whiteSpace", SchemaKind::RestrictionItem),
    ("pattern", SchemaKind::RestrictionItem),
];

impl SchemaKind {
    /// Classify a schema tag by its local name
    pub fn classify(local: &str) -> Option<SchemaKind> {
        SCHEMA_KINDS
            .iter()
            .find(|(name, _)| *name == local)
            .map(|(_, kind)| *kind)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaKind::Element => "element",
            SchemaKind::ComplexType => "complexType",
            SchemaKind::Sequence => "sequence",
            SchemaKind::Attribute => "attribute",
            SchemaKind::Choice => "choice",
            SchemaKind::SimpleType => "simpleType",
            SchemaKind::SimpleContent => "simpleContent",
            SchemaKind::Restriction => "restriction",
            SchemaKind::Extension => "extension",
            SchemaKind::RestrictionItem => "facet",
        };
        write!(f, "{}", name)
    }
}

/// Whether a tag opens, closes, or stands alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagForm {
    /// `<xs:x ...>`
    Open,
    /// `</xs:x>`
    Close,
    /// `<xs:x .../>`
    OneLiner,
}

/// One classified schema tag
#[derive(Debug, Clone)]
pub struct SchemaTag {
    /// Schema kind
    pub kind: SchemaKind,
    /// Open, close or one-liner
    pub form: TagForm,
    /// Unprefixed tag name (`element`, `enumeration`, ...)
    pub local_name: String,
    /// Raw token text
    pub raw: String,
    attributes: Vec<(String, String)>,
}

impl SchemaTag {
    /// Parse and classify a raw schema token
    pub fn parse(raw: &str, index: usize) -> Result<Self> {
        let syntax = |message: String| {
            Error::SchemaSyntax(ParseError::new(message).with_location(index).with_source(raw))
        };

        let (inner, form) = if let Some(inner) = raw.strip_prefix("</") {
            (inner.strip_suffix('>').unwrap_or(inner), TagForm::Close)
        } else if let Some(inner) = raw.strip_suffix("/>") {
            (inner.strip_prefix('<').unwrap_or(inner), TagForm::OneLiner)
        } else if raw.contains("</") {
            return Err(syntax("text content is not allowed in schema tags".to_string()));
        } else {
            let inner = raw.strip_prefix('<').unwrap_or(raw);
            (inner.strip_suffix('>').unwrap_or(inner), TagForm::Open)
        };

        let (name, rest) = split_name(inner);
        let local = local_name(name);
        let kind = SchemaKind::classify(local)
            .ok_or_else(|| syntax(format!("unsupported schema tag '{}'", name)))?;

        if form == TagForm::Close && !rest.is_empty() {
            return Err(syntax("close tag carries attributes".to_string()));
        }

        let attributes = parse_attributes(rest).map_err(|e| syntax(e.to_string()))?;

        Ok(Self {
            kind,
            form,
            local_name: local.to_string(),
            raw: raw.to_string(),
            attributes,
        })
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check if this is an open tag
    pub fn is_open(&self) -> bool {
        self.form == TagForm::Open
    }

    /// Check if this is a close tag
    pub fn is_close(&self) -> bool {
        self.form == TagForm::Close
    }

    /// Check if this is a self-closing tag
    pub fn is_one_liner(&self) -> bool {
        self.form == TagForm::OneLiner
    }
}

/// Structural shape of a document tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlTagKind {
    /// `<a>`
    Open,
    /// `<a x="1">`
    OpenWithAttributes,
    /// `</a>`
    Close,
    /// `<a/>`
    Empty,
    /// `<a x="1"/>`
    EmptyWithAttributes,
    /// `<a>text</a>`
    Inline,
    /// `<a x="1">text</a>`
    InlineWithAttributes,
}

/// One classified document tag
#[derive(Debug, Clone)]
pub struct XmlTag {
    /// Structural shape
    pub kind: XmlTagKind,
    /// Unprefixed element name
    pub name: String,
    /// Unescaped attributes, in document order
    pub attributes: Vec<(String, String)>,
    /// Unescaped inline text
    pub text: Option<String>,
    /// Raw token text
    pub raw: String,
}

impl XmlTag {
    /// Parse and classify a raw document token
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(inner) = raw.strip_prefix("</") {
            let inner = inner.strip_suffix('>').unwrap_or(inner);
            let (name, rest) = split_name(inner);
            if !rest.is_empty() {
                return Err(Error::Xml(format!("close tag carries attributes: {}", raw)));
            }
            return Ok(Self::new(XmlTagKind::Close, name, Vec::new(), None, raw));
        }

        let body = raw
            .strip_prefix('<')
            .ok_or_else(|| Error::Xml(format!("not a tag: {}", raw)))?;

        if let Some(inner) = body.strip_suffix("/>") {
            let (name, rest) = split_name(inner);
            let attributes = parse_attributes(rest)?;
            let kind = if attributes.is_empty() {
                XmlTagKind::Empty
            } else {
                XmlTagKind::EmptyWithAttributes
            };
            return Ok(Self::new(kind, name, attributes, None, raw));
        }

        let head_end = head_end(body)
            .ok_or_else(|| Error::Xml(format!("unterminated tag: {}", raw)))?;
        let (name, rest) = split_name(&body[..head_end]);
        let attributes = parse_attributes(rest)?;
        let tail = &body[head_end + 1..];

        if tail.is_empty() {
            let kind = if attributes.is_empty() {
                XmlTagKind::Open
            } else {
                XmlTagKind::OpenWithAttributes
            };
            return Ok(Self::new(kind, name, attributes, None, raw));
        }

        let close_at = tail
            .rfind("</")
            .ok_or_else(|| Error::Xml(format!("text without close tag: {}", raw)))?;
        let close_name = tail[close_at + 2..].trim_end_matches('>').trim();
        if close_name != name {
            return Err(Error::Xml(format!(
                "close tag '{}' does not match '{}'",
                close_name, name
            )));
        }
        let text = unescape_text(&tail[..close_at])?.into_owned();
        let kind = if attributes.is_empty() {
            XmlTagKind::Inline
        } else {
            XmlTagKind::InlineWithAttributes
        };
        Ok(Self::new(kind, name, attributes, Some(text), raw))
    }

    fn new(
        kind: XmlTagKind,
        name: &str,
        attributes: Vec<(String, String)>,
        text: Option<String>,
        raw: &str,
    ) -> Self {
        Self {
            kind,
            name: local_name(name).to_string(),
            attributes,
            text,
            raw: raw.to_string(),
        }
    }

    /// Check if this tag opens an element with content to follow
    pub fn is_open(&self) -> bool {
        matches!(self.kind, XmlTagKind::Open | XmlTagKind::OpenWithAttributes)
    }

    /// Check if this is a close tag
    pub fn is_close(&self) -> bool {
        self.kind == XmlTagKind::Close
    }

    /// Check if this tag is complete on its own
    pub fn is_self_contained(&self) -> bool {
        !self.is_open() && !self.is_close()
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Index of the `>` ending the start tag, skipping quoted values
fn head_end(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Tokenize and classify document text
pub fn document_tags(text: &str) -> Result<Vec<XmlTag>> {
    crate::lexer::tokenize(text)?
        .iter()
        .map(|raw| XmlTag::parse(raw))
        .collect()
}
