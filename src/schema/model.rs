//! Schema node model
//!
//! A loaded schema is a tree of [`SchemaElement`] nodes. Every node records
//! its XML name, how it maps onto host data ([`Mapping`]), its occurrence
//! bounds and, for primitive leaves, its type and restriction facets.

use crate::error::{Error, Result};
use crate::types::{Restriction, XsdType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static ELEMENT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Mapping value marking a transparent wrapper element
pub const SKIP_LEVEL: &str = "_skipLevel_";

/// Check an element name against the accepted character set
pub fn check_element_name(name: &str) -> Result<()> {
    if ELEMENT_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::syntax(format!(
            "invalid element name '{}': only letters, digits, '_' and '-' are allowed",
            name
        )))
    }
}

/// Occurrence bounds (minOccurs, maxOccurs); `None` for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences
    pub min: u32,
    /// Maximum number of occurrences
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Exactly once (1, 1)
    pub fn once() -> Self {
        Self::new(1, Some(1))
    }

    /// Optional (0, 1)
    pub fn optional() -> Self {
        Self::new(0, Some(1))
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self::new(0, None)
    }

    /// Parse `minOccurs` / `maxOccurs` attribute values, defaulting to 1
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self> {
        let min = match min {
            Some(text) => parse_count("minOccurs", text)?,
            None => 1,
        };
        let max = match max {
            Some("unbounded") => None,
            Some(text) => Some(parse_count("maxOccurs", text)?),
            None => Some(1),
        };
        if let Some(max) = max {
            if max < min {
                return Err(Error::syntax(format!(
                    "maxOccurs {} is less than minOccurs {}",
                    max, min
                )));
            }
        }
        Ok(Self { min, max })
    }

    /// Replace the bounds given on a reference, keeping the others
    pub fn overridden(self, min: Option<&str>, max: Option<&str>) -> Result<Self> {
        if min.is_none() && max.is_none() {
            return Ok(self);
        }
        let min_text = min.map(str::to_string).unwrap_or_else(|| self.min.to_string());
        let max_text = match (max, self.max) {
            (Some(text), _) => text.to_string(),
            (None, Some(n)) => n.to_string(),
            (None, None) => "unbounded".to_string(),
        };
        Self::parse(Some(&min_text), Some(&max_text))
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: usize) -> bool {
        count < self.min as usize
    }

    /// Check if occurrence count exceeds the maximum
    pub fn is_exceeded(&self, count: usize) -> bool {
        match self.max {
            Some(max) => count > max as usize,
            None => false,
        }
    }

    /// Check if a count lies within the bounds
    pub fn admits(&self, count: usize) -> bool {
        !self.is_missing(count) && !self.is_exceeded(count)
    }

    /// maxOccurs with -1 standing for unbounded
    pub fn max_or_unbounded(&self) -> i64 {
        self.max.map(i64::from).unwrap_or(-1)
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}..{}]", self.min, max),
            None => write!(f, "[{}..*]", self.min),
        }
    }
}

fn parse_count(attr: &str, text: &str) -> Result<u32> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| Error::syntax(format!("{} must be a non-negative integer, got '{}'", attr, text)))
}

/// How a schema node binds to host data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Plain member
    Field(String),
    /// Generic collection stored in a member (`kind:field`)
    Collection {
        /// Collection kind label
        kind: String,
        /// Member holding the collection
        field: String,
    },
    /// Native array of primitives stored in a member (`field[]`)
    Array {
        /// Member holding the array
        field: String,
        /// Item type
        item: XsdType,
    },
    /// Transparent wrapper: children map onto the enclosing object
    SkipLevel,
}

impl Mapping {
    /// Interpret a `mapping` attribute for the given node
    ///
    /// A missing attribute maps the node onto a member of its own name.
    /// Collection and array forms are checked against the node's children.
    pub fn parse(raw: Option<&str>, node: &SchemaElement) -> Result<Self> {
        let raw = match raw {
            Some(raw) => raw.trim(),
            None => return Ok(Mapping::Field(node.name.clone())),
        };

        if raw == SKIP_LEVEL {
            return Ok(Mapping::SkipLevel);
        }

        if let Some((kind, field)) = raw.split_once(':') {
            if kind.is_empty() || field.is_empty() {
                return Err(Error::syntax(format!("malformed collection mapping '{}'", raw)));
            }
            if node.children.len() != 1 || node.type_.is_some() {
                return Err(Error::syntax(format!(
                    "collection '{}' must have exactly one child element",
                    node.name
                )));
            }
            return Ok(Mapping::Collection {
                kind: kind.to_string(),
                field: field.to_string(),
            });
        }

        if let Some(field) = raw.strip_suffix("[]") {
            let item = match node.children.as_slice() {
                [child] if child.is_array_leaf() => child.type_,
                _ => None,
            };
            let item = item.ok_or_else(|| {
                Error::syntax(format!(
                    "array '{}' must have exactly one child named after its primitive type",
                    node.name
                ))
            })?;
            if field.is_empty() {
                return Err(Error::syntax(format!("malformed array mapping '{}'", raw)));
            }
            return Ok(Mapping::Array {
                field: field.to_string(),
                item,
            });
        }

        if raw.is_empty() {
            return Err(Error::syntax(format!("empty mapping on '{}'", node.name)));
        }
        Ok(Mapping::Field(raw.to_string()))
    }

    /// Host member name, if the mapping names one
    pub fn member(&self) -> Option<&str> {
        match self {
            Mapping::Field(field) => Some(field),
            Mapping::Collection { field, .. } | Mapping::Array { field, .. } => Some(field),
            Mapping::SkipLevel => None,
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapping::Field(field) => write!(f, "{}", field),
            Mapping::Collection { kind, field } => write!(f, "{}:{}", kind, field),
            Mapping::Array { field, .. } => write!(f, "{}[]", field),
            Mapping::SkipLevel => write!(f, "{}", SKIP_LEVEL),
        }
    }
}

/// Structural role of a node, derived from its type, mapping and children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// Element with child elements (or attributes only)
    Composite,
    /// Primitive-typed leaf
    Leaf,
    /// Primitive leaf named after its own type, used as an array item
    ArrayLeaf,
    /// Wrapper of a generic collection
    Collection,
    /// Wrapper of a native array
    Array,
}

/// One attribute declaration
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAttribute {
    /// XML attribute name
    pub name: String,
    /// Primitive type
    pub type_: XsdType,
    /// Host member receiving the value
    pub mapping: String,
    /// `use="required"`
    pub required: bool,
    /// Default value, applied when absent
    pub default: Option<String>,
    /// Fixed value, always written
    pub fixed: Option<String>,
    /// Restriction facets
    pub restrictions: Vec<Restriction>,
}

impl SchemaAttribute {
    /// Create an optional attribute mapped onto a member of the same name
    pub fn new(name: impl Into<String>, type_: XsdType) -> Self {
        let name = name.into();
        Self {
            mapping: name.clone(),
            name,
            type_,
            required: false,
            default: None,
            fixed: None,
            restrictions: Vec::new(),
        }
    }

    /// Set the host member
    pub fn with_mapping(mut self, mapping: impl Into<String>) -> Self {
        self.mapping = mapping.into();
        self
    }

    /// Mark the attribute as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the fixed value
    pub fn with_fixed(mut self, value: impl Into<String>) -> Self {
        self.fixed = Some(value.into());
        self
    }

    /// Add a restriction facet
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Check if any facet applies
    pub fn has_restriction(&self) -> bool {
        !self.restrictions.is_empty()
    }
}

/// One node of the schema tree
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaElement {
    /// XML element name
    pub name: String,
    /// Primitive type; `None` for composite and wrapper nodes
    pub type_: Option<XsdType>,
    /// Host binding
    pub mapping: Mapping,
    /// Bounds of this element
    pub occurs: Occurs,
    /// Bounds of the choice group, when the children are alternatives
    pub choice: Option<Occurs>,
    /// Bounds of the content sequence
    pub sequence: Occurs,
    /// Type came from an inline or named simple type
    pub simple_type_wrapper: bool,
    /// Type came from simple content with attributes
    pub simple_content_wrapper: bool,
    /// Attribute declarations
    pub attributes: Vec<SchemaAttribute>,
    /// Child elements, in document order
    pub children: Vec<SchemaElement>,
    /// Restriction facets on the primitive value
    pub restrictions: Vec<Restriction>,
}

impl SchemaElement {
    /// Create a composite node mapped onto a member of the same name
    pub fn composite(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            mapping: Mapping::Field(name.clone()),
            name,
            type_: None,
            occurs: Occurs::once(),
            choice: None,
            sequence: Occurs::once(),
            simple_type_wrapper: false,
            simple_content_wrapper: false,
            attributes: Vec::new(),
            children: Vec::new(),
            restrictions: Vec::new(),
        }
    }

    /// Create a primitive leaf mapped onto a member of the same name
    pub fn leaf(name: impl Into<String>, type_: XsdType) -> Self {
        let mut node = Self::composite(name);
        node.type_ = Some(type_);
        node
    }

    /// Set the mapping
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Set the occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Turn the children into alternatives of a choice group
    pub fn with_choice(mut self, occurs: Occurs) -> Self {
        self.choice = Some(occurs);
        self
    }

    /// Append a child element
    pub fn with_child(mut self, child: SchemaElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append an attribute declaration
    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a restriction facet
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Check if the children are alternatives of a choice group
    pub fn is_choice_group(&self) -> bool {
        self.choice.is_some()
    }

    /// Check if any facet applies
    pub fn has_restriction(&self) -> bool {
        !self.restrictions.is_empty()
    }

    /// Check if this is a primitive leaf named after its own type
    pub fn is_array_leaf(&self) -> bool {
        self.children.is_empty() && self.type_.map_or(false, |t| t.name() == self.name)
    }

    /// Check if a child may be left out of this node's content
    pub fn is_optional_child(&self, child: &SchemaElement) -> bool {
        child.occurs.min == 0 || self.is_choice_group() || self.sequence.min == 0
    }

    /// Structural role of this node
    pub fn shape(&self) -> NodeShape {
        match self.mapping {
            Mapping::Collection { .. } => NodeShape::Collection,
            Mapping::Array { .. } => NodeShape::Array,
            _ if self.type_.is_none() => NodeShape::Composite,
            _ if self.is_array_leaf() => NodeShape::ArrayLeaf,
            _ => NodeShape::Leaf,
        }
    }

    /// Look up a direct child by element name
    pub fn child(&self, name: &str) -> Option<&SchemaElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Check the structural invariants of this node and its descendants
    pub fn check(&self) -> Result<()> {
        self.check_node()?;
        self.children.iter().try_for_each(SchemaElement::check)
    }

    /// Check the structural invariants of this node alone
    pub fn check_node(&self) -> Result<()> {
        check_element_name(&self.name)?;

        if self.type_.is_some() && !self.children.is_empty() {
            return Err(Error::syntax(format!(
                "element '{}' has both a primitive type and child elements",
                self.name
            )));
        }
        if self.type_.is_none() && self.children.is_empty() && self.attributes.is_empty() {
            return Err(Error::syntax(format!(
                "element '{}' has neither a type nor content",
                self.name
            )));
        }
        if self.is_choice_group() && self.children.is_empty() {
            return Err(Error::syntax(format!("choice in '{}' has no alternatives", self.name)));
        }

        match &self.mapping {
            Mapping::Collection { .. } if self.children.len() != 1 => {
                return Err(Error::syntax(format!(
                    "collection '{}' must have exactly one child element",
                    self.name
                )))
            }
            Mapping::Array { .. } if !matches!(self.children.as_slice(), [c] if c.is_array_leaf()) => {
                return Err(Error::syntax(format!(
                    "array '{}' must have exactly one child named after its primitive type",
                    self.name
                )))
            }
            _ => {}
        }

        if let [child] = self.children.as_slice() {
            if matches!(self.shape(), NodeShape::Collection | NodeShape::Array)
                && matches!(child.shape(), NodeShape::Collection | NodeShape::Array)
            {
                return Err(Error::syntax(format!(
                    "wrapper '{}' cannot directly contain another wrapper",
                    self.name
                )));
            }
            if matches!(self.shape(), NodeShape::Collection | NodeShape::Array)
                && child.type_.is_some()
                && !child.attributes.is_empty()
            {
                return Err(Error::syntax(format!(
                    "primitive item '{}' of '{}' cannot carry attributes",
                    child.name, self.name
                )));
            }
        }
        if self.mapping == Mapping::SkipLevel && self.type_.is_some() {
            return Err(Error::syntax(format!(
                "only composite elements can skip a level, '{}' is a leaf",
                self.name
            )));
        }

        for (idx, attribute) in self.attributes.iter().enumerate() {
            if self.attributes[..idx].iter().any(|a| a.name == attribute.name) {
                return Err(Error::syntax(format!(
                    "attribute '{}' declared twice on '{}'",
                    attribute.name, self.name
                )));
            }
        }

        Ok(())
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        write!(f, "{}{} {}", pad, self.name, self.occurs)?;
        if let Some(ty) = self.type_ {
            write!(f, " : {}", ty)?;
        }
        if self.mapping != Mapping::Field(self.name.clone()) {
            write!(f, " -> {}", self.mapping)?;
        }
        if let Some(choice) = self.choice {
            write!(f, " choice{}", choice)?;
        }
        for restriction in &self.restrictions {
            write!(f, " {}={}", restriction.facet, restriction.literal)?;
        }
        writeln!(f)?;
        for attribute in &self.attributes {
            write!(f, "{}  @{} : {}", pad, attribute.name, attribute.type_)?;
            if attribute.required {
                write!(f, " required")?;
            }
            if let Some(fixed) = &attribute.fixed {
                write!(f, " fixed={}", fixed)?;
            } else if let Some(default) = &attribute.default {
                write!(f, " default={}", default)?;
            }
            writeln!(f)?;
        }
        for child in &self.children {
            child.describe(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SchemaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Facet;

    #[test]
    fn test_occurs_parse() {
        assert_eq!(Occurs::parse(None, None).unwrap(), Occurs::once());
        assert_eq!(
            Occurs::parse(Some("0"), Some("unbounded")).unwrap(),
            Occurs::zero_or_more()
        );
        assert!(Occurs::parse(Some("2"), Some("1")).is_err());
        assert!(Occurs::parse(Some("-1"), None).is_err());
        assert_eq!(Occurs::zero_or_more().max_or_unbounded(), -1);
    }

    #[test]
    fn test_occurs_override() {
        let base = Occurs::once();
        assert_eq!(base.overridden(None, None).unwrap(), base);
        assert_eq!(base.overridden(Some("0"), None).unwrap(), Occurs::optional());
        assert_eq!(
            base.overridden(None, Some("unbounded")).unwrap(),
            Occurs::new(1, None)
        );
    }

    #[test]
    fn test_occurs_bounds() {
        let occurs = Occurs::new(1, Some(3));
        assert!(occurs.is_missing(0));
        assert!(occurs.admits(2));
        assert!(occurs.is_exceeded(4));
        assert!(!Occurs::zero_or_more().is_exceeded(1_000));
        assert!(Occurs::zero_or_more().admits(usize::MAX));
        assert!(!Occurs::new(1, Some(3)).admits(usize::MAX));
    }

    #[test]
    fn test_mapping_forms() {
        let leaf = SchemaElement::leaf("name", XsdType::String);
        assert_eq!(Mapping::parse(None, &leaf).unwrap(), Mapping::Field("name".into()));
        assert_eq!(
            Mapping::parse(Some("fullName"), &leaf).unwrap(),
            Mapping::Field("fullName".into())
        );

        let coll = SchemaElement::composite("items").with_child(SchemaElement::composite("item"));
        assert_eq!(
            Mapping::parse(Some("List:items"), &coll).unwrap(),
            Mapping::Collection {
                kind: "List".into(),
                field: "items".into()
            }
        );

        let array = SchemaElement::composite("scores").with_child(SchemaElement::leaf("int", XsdType::Int));
        assert_eq!(
            Mapping::parse(Some("scores[]"), &array).unwrap(),
            Mapping::Array {
                field: "scores".into(),
                item: XsdType::Int
            }
        );

        assert_eq!(Mapping::parse(Some(SKIP_LEVEL), &coll).unwrap(), Mapping::SkipLevel);
    }

    #[test]
    fn test_mapping_rejects_bad_wrappers() {
        let two = SchemaElement::composite("items")
            .with_child(SchemaElement::composite("a"))
            .with_child(SchemaElement::composite("b"));
        assert!(Mapping::parse(Some("List:items"), &two).is_err());

        let not_array = SchemaElement::composite("scores").with_child(SchemaElement::leaf("score", XsdType::Int));
        assert!(Mapping::parse(Some("scores[]"), &not_array).is_err());
    }

    #[test]
    fn test_shapes() {
        assert_eq!(SchemaElement::leaf("a", XsdType::Int).shape(), NodeShape::Leaf);
        assert_eq!(SchemaElement::leaf("int", XsdType::Int).shape(), NodeShape::ArrayLeaf);
        let person = SchemaElement::composite("Person").with_child(SchemaElement::leaf("a", XsdType::Int));
        assert_eq!(person.shape(), NodeShape::Composite);
    }

    #[test]
    fn test_check_invariants() {
        assert!(SchemaElement::composite("empty").check().is_err());
        assert!(SchemaElement::leaf("bad name", XsdType::Int).check().is_err());

        let mut mixed = SchemaElement::leaf("a", XsdType::Int);
        mixed.children.push(SchemaElement::leaf("b", XsdType::Int));
        assert!(mixed.check().is_err());

        let attrs_only = SchemaElement::composite("flag")
            .with_attribute(SchemaAttribute::new("on", XsdType::Boolean));
        assert!(attrs_only.check().is_ok());

        let dup = attrs_only.with_attribute(SchemaAttribute::new("on", XsdType::Boolean));
        assert!(dup.check().is_err());

        let priced = SchemaElement::composite("prices")
            .with_mapping(Mapping::Collection {
                kind: "List".into(),
                field: "prices".into(),
            })
            .with_child(
                SchemaElement::leaf("price", XsdType::Decimal)
                    .with_occurs(Occurs::zero_or_more())
                    .with_attribute(SchemaAttribute::new("qty", XsdType::Int)),
            );
        let err = priced.check().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaSyntax);
        assert!(err.to_string().contains("cannot carry attributes"));
    }

    #[test]
    fn test_optional_child() {
        let required = SchemaElement::leaf("a", XsdType::Int);
        let optional = SchemaElement::leaf("b", XsdType::Int).with_occurs(Occurs::optional());
        let seq = SchemaElement::composite("p")
            .with_child(required.clone())
            .with_child(optional.clone());
        assert!(!seq.is_optional_child(&required));
        assert!(seq.is_optional_child(&optional));

        let choice = seq.clone().with_choice(Occurs::once());
        assert!(choice.is_optional_child(&required));
    }

    #[test]
    fn test_structural_equality_ignores_regex_cache() {
        let a = SchemaElement::leaf("code", XsdType::String)
            .with_restriction(Restriction::new(Facet::Pattern, "[A-Z]{3}").unwrap());
        let b = SchemaElement::leaf("code", XsdType::String)
            .with_restriction(Restriction::new(Facet::Pattern, "[A-Z]{3}").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_tree() {
        let person = SchemaElement::composite("Person")
            .with_child(SchemaElement::leaf("name", XsdType::String))
            .with_attribute(SchemaAttribute::new("id", XsdType::Int).required());
        let text = person.to_string();
        assert!(text.contains("Person [1..1]"));
        assert!(text.contains("@id : xs:int required"));
        assert!(text.contains("  name [1..1] : xs:string"));
    }
}
