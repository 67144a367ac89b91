//! Tree-dialect schema parser
//!
//! Recursive descent over classified schema tags. Every routine is handed the
//! window it may consume (`at..end`, end exclusive) and returns the index just
//! past what it consumed. Close tags are matched by kind, so an element's
//! close tag is found by counting nested element tags only.
//!
//! References and named types are looked up through a [`Resolver`]. The tree
//! dialect has none, so any reference is an [`Error::UnresolvedReference`];
//! the divided dialect supplies its definition pools instead.

use crate::error::{Error, ParseError, Result};
use crate::lexer::{local_name, match_close};
use crate::limits::Limits;
use crate::schema::model::{check_element_name, Mapping, Occurs, SchemaAttribute, SchemaElement};
use crate::tags::{SchemaKind, SchemaTag, TagForm};
use crate::types::{Restriction, XsdType};

/// A named simple type: a primitive base plus facets
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTypeDef {
    /// Primitive base type
    pub type_: XsdType,
    /// Facets accumulated along the derivation
    pub restrictions: Vec<Restriction>,
}

impl SimpleTypeDef {
    fn primitive(type_: XsdType) -> Self {
        Self {
            type_,
            restrictions: Vec::new(),
        }
    }
}

/// Lookup of named definitions by local name
pub(crate) trait Resolver {
    fn element(&self, name: &str) -> Option<&SchemaElement>;
    fn attribute(&self, name: &str) -> Option<&SchemaAttribute>;
    fn complex_type(&self, name: &str) -> Option<&SchemaElement>;
    fn simple_type(&self, name: &str) -> Option<&SimpleTypeDef>;
}

/// Resolver without definitions
pub(crate) struct NoDefinitions;

impl Resolver for NoDefinitions {
    fn element(&self, _name: &str) -> Option<&SchemaElement> {
        None
    }

    fn attribute(&self, _name: &str) -> Option<&SchemaAttribute> {
        None
    }

    fn complex_type(&self, _name: &str) -> Option<&SchemaElement> {
        None
    }

    fn simple_type(&self, _name: &str) -> Option<&SimpleTypeDef> {
        None
    }
}

pub(crate) struct TreeParser<'a> {
    tags: &'a [SchemaTag],
    resolver: &'a dyn Resolver,
    limits: &'a Limits,
}

impl<'a> TreeParser<'a> {
    pub(crate) fn new(tags: &'a [SchemaTag], resolver: &'a dyn Resolver, limits: &'a Limits) -> Self {
        Self {
            tags,
            resolver,
            limits,
        }
    }

    fn syntax(&self, at: usize, message: impl Into<String>) -> Error {
        let error = ParseError::new(message).with_location(at);
        match self.tags.get(at) {
            Some(tag) => Error::SchemaSyntax(error.with_source(tag.raw.clone())),
            None => Error::SchemaSyntax(error),
        }
    }

    /// Attach the tag position to a syntax error raised without one
    fn locate(&self, at: usize, err: Error) -> Error {
        match err {
            Error::SchemaSyntax(e) if e.location.is_none() => self.syntax(at, e.message),
            other => other,
        }
    }

    fn unexpected(&self, at: usize, context: &str) -> Error {
        match self.tags.get(at) {
            Some(tag) if tag.is_close() => {
                self.syntax(at, format!("unexpected </{}> inside {}", tag.local_name, context))
            }
            Some(tag) => self.syntax(at, format!("unexpected <{}> inside {}", tag.local_name, context)),
            None => self.syntax(at, format!("unexpected end of {}", context)),
        }
    }

    fn close_of(&self, at: usize, end: usize) -> Result<usize> {
        let kind = self.tags[at].kind;
        let max = end.saturating_sub(1);
        match_close(
            self.tags,
            at,
            max,
            |t: &SchemaTag| t.kind == kind,
            SchemaTag::is_open,
            SchemaTag::is_close,
        )
        .filter(|close| *close < end)
        .ok_or_else(|| self.syntax(at, format!("<{}> is never closed", self.tags[at].local_name)))
    }

    /// Parse an element declaration (or reference) at `at`
    pub(crate) fn parse_element(
        &self,
        at: usize,
        end: usize,
        depth: usize,
    ) -> Result<(SchemaElement, usize)> {
        let tag = &self.tags[at];
        if tag.kind != SchemaKind::Element || tag.is_close() {
            return Err(self.unexpected(at, "content model"));
        }
        self.limits.check_depth(depth)?;

        if let Some(reference) = tag.attr("ref") {
            return Ok((self.element_reference(at, reference)?, at + 1));
        }

        let name = tag
            .attr("name")
            .ok_or_else(|| self.syntax(at, "element declaration without name or ref"))?;
        check_element_name(name).map_err(|e| self.locate(at, e))?;

        let mut element = SchemaElement::composite(name);
        element.occurs = Occurs::parse(tag.attr("minOccurs"), tag.attr("maxOccurs"))
            .map_err(|e| self.locate(at, e))?;

        let next = if tag.is_open() {
            if tag.attr("type").is_some() {
                return Err(self.syntax(
                    at,
                    format!("element '{}' has both a type attribute and inline content", name),
                ));
            }
            let close = self.close_of(at, end)?;
            self.parse_element_body(&mut element, at + 1, close, depth)?;
            close + 1
        } else {
            let type_name = tag.attr("type").ok_or_else(|| {
                self.syntax(at, format!("element '{}' has neither a type nor content", name))
            })?;
            self.apply_type(&mut element, type_name)?;
            at + 1
        };

        element.mapping = Mapping::parse(tag.attr("mapping"), &element).map_err(|e| self.locate(at, e))?;
        element.check_node().map_err(|e| self.locate(at, e))?;
        Ok((element, next))
    }

    fn element_reference(&self, at: usize, reference: &str) -> Result<SchemaElement> {
        let tag = &self.tags[at];
        if tag.is_open() {
            return Err(self.syntax(at, format!("reference to '{}' cannot have content", reference)));
        }

        let mut element = self
            .resolver
            .element(local_name(reference))
            .cloned()
            .ok_or_else(|| Error::UnresolvedReference(format!("element '{}'", reference)))?;

        element.occurs = element
            .occurs
            .overridden(tag.attr("minOccurs"), tag.attr("maxOccurs"))
            .map_err(|e| self.locate(at, e))?;
        if let Some(mapping) = tag.attr("mapping") {
            element.mapping = Mapping::parse(Some(mapping), &element).map_err(|e| self.locate(at, e))?;
        }
        Ok(element)
    }

    /// Give an element the content of a primitive or named type
    fn apply_type(&self, element: &mut SchemaElement, type_name: &str) -> Result<()> {
        if let Some(primitive) = XsdType::from_name(type_name) {
            element.type_ = Some(primitive);
            return Ok(());
        }

        let local = local_name(type_name);
        if let Some(def) = self.resolver.complex_type(local) {
            element.type_ = def.type_;
            element.choice = def.choice;
            element.sequence = def.sequence;
            element.simple_content_wrapper = def.simple_content_wrapper;
            element.attributes = def.attributes.clone();
            element.children = def.children.clone();
            element.restrictions = def.restrictions.clone();
            return Ok(());
        }
        if let Some(def) = self.resolver.simple_type(local) {
            element.type_ = Some(def.type_);
            element.restrictions = def.restrictions.clone();
            element.simple_type_wrapper = true;
            return Ok(());
        }

        Err(Error::UnresolvedReference(format!("type '{}'", type_name)))
    }

    fn parse_element_body(
        &self,
        element: &mut SchemaElement,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<()> {
        let mut j = start;
        while j < end {
            let tag = &self.tags[j];
            match (tag.kind, tag.form) {
                (SchemaKind::ComplexType, TagForm::OneLiner) => j += 1,
                (SchemaKind::ComplexType, TagForm::Open) => {
                    let close = self.close_of(j, end)?;
                    self.parse_complex_body(element, j + 1, close, depth)?;
                    j = close + 1;
                }
                (SchemaKind::SimpleType, TagForm::Open) => {
                    let (def, next) = self.parse_simple_type(j, end)?;
                    element.type_ = Some(def.type_);
                    element.restrictions = def.restrictions;
                    element.simple_type_wrapper = true;
                    j = next;
                }
                _ => return Err(self.unexpected(j, "element")),
            }
        }
        Ok(())
    }

    /// Parse a top-level named complex type into a content template
    pub(crate) fn parse_complex_type(
        &self,
        at: usize,
        end: usize,
        depth: usize,
    ) -> Result<(SchemaElement, usize)> {
        let tag = &self.tags[at];
        let name = tag
            .attr("name")
            .ok_or_else(|| self.syntax(at, "top-level complexType without name"))?;
        let mut template = SchemaElement::composite(name);

        match tag.form {
            TagForm::OneLiner => Ok((template, at + 1)),
            TagForm::Open => {
                let close = self.close_of(at, end)?;
                self.parse_complex_body(&mut template, at + 1, close, depth)?;
                Ok((template, close + 1))
            }
            TagForm::Close => Err(self.unexpected(at, "schema")),
        }
    }

    fn parse_complex_body(
        &self,
        element: &mut SchemaElement,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<()> {
        let mut j = start;
        while j < end {
            let tag = &self.tags[j];
            match (tag.kind, tag.form) {
                (SchemaKind::Sequence, TagForm::OneLiner) => j += 1,
                (SchemaKind::Sequence, TagForm::Open) => {
                    element.sequence = Occurs::parse(tag.attr("minOccurs"), tag.attr("maxOccurs"))
                        .map_err(|e| self.locate(j, e))?;
                    let close = self.close_of(j, end)?;
                    self.parse_particles(element, j + 1, close, depth, false)?;
                    j = close + 1;
                }
                (SchemaKind::Choice, TagForm::Open) => {
                    j = self.parse_choice(element, j, end, depth)?;
                }
                (SchemaKind::Attribute, TagForm::Open | TagForm::OneLiner) => {
                    let (attribute, next) = self.parse_attribute(j, end)?;
                    element.attributes.push(attribute);
                    j = next;
                }
                (SchemaKind::SimpleContent, TagForm::Open) => {
                    let close = self.close_of(j, end)?;
                    self.parse_simple_content(element, j + 1, close)?;
                    j = close + 1;
                }
                _ => return Err(self.unexpected(j, "complex type")),
            }
        }
        Ok(())
    }

    fn parse_choice(
        &self,
        element: &mut SchemaElement,
        at: usize,
        end: usize,
        depth: usize,
    ) -> Result<usize> {
        if element.is_choice_group() || !element.children.is_empty() {
            return Err(self.syntax(
                at,
                format!("choice in '{}' must be the only particle of its content", element.name),
            ));
        }
        let tag = &self.tags[at];
        element.choice = Some(
            Occurs::parse(tag.attr("minOccurs"), tag.attr("maxOccurs")).map_err(|e| self.locate(at, e))?,
        );
        let close = self.close_of(at, end)?;
        self.parse_particles(element, at + 1, close, depth, true)?;
        Ok(close + 1)
    }

    fn parse_particles(
        &self,
        element: &mut SchemaElement,
        start: usize,
        end: usize,
        depth: usize,
        in_choice: bool,
    ) -> Result<()> {
        let mut j = start;
        while j < end {
            let tag = &self.tags[j];
            match (tag.kind, tag.form) {
                (SchemaKind::Element, TagForm::Open | TagForm::OneLiner) => {
                    if !in_choice && element.is_choice_group() {
                        return Err(self.syntax(
                            j,
                            format!("choice in '{}' must be the only particle of its content", element.name),
                        ));
                    }
                    let (child, next) = self.parse_element(j, end, depth + 1)?;
                    if element.child(&child.name).is_some() {
                        return Err(self.syntax(
                            j,
                            format!("element '{}' declared twice in '{}'", child.name, element.name),
                        ));
                    }
                    element.children.push(child);
                    j = next;
                }
                (SchemaKind::Choice, TagForm::Open) if !in_choice => {
                    j = self.parse_choice(element, j, end, depth)?;
                }
                (SchemaKind::Sequence, TagForm::OneLiner) if !in_choice => j += 1,
                (SchemaKind::Sequence, TagForm::Open) if !in_choice => {
                    let close = self.close_of(j, end)?;
                    self.parse_particles(element, j + 1, close, depth, false)?;
                    j = close + 1;
                }
                (SchemaKind::Attribute, TagForm::Open | TagForm::OneLiner) => {
                    let (attribute, next) = self.parse_attribute(j, end)?;
                    element.attributes.push(attribute);
                    j = next;
                }
                _ if in_choice => return Err(self.unexpected(j, "choice")),
                _ => return Err(self.unexpected(j, "sequence")),
            }
        }
        Ok(())
    }

    /// Parse an attribute declaration (or reference) at `at`
    pub(crate) fn parse_attribute(&self, at: usize, end: usize) -> Result<(SchemaAttribute, usize)> {
        let tag = &self.tags[at];
        if tag.kind != SchemaKind::Attribute || tag.is_close() {
            return Err(self.unexpected(at, "attribute list"));
        }

        if let Some(reference) = tag.attr("ref") {
            if tag.is_open() {
                return Err(self.syntax(at, format!("reference to '{}' cannot have content", reference)));
            }
            let mut attribute = self
                .resolver
                .attribute(local_name(reference))
                .cloned()
                .ok_or_else(|| Error::UnresolvedReference(format!("attribute '{}'", reference)))?;
            self.apply_attribute_options(&mut attribute, at)?;
            return Ok((attribute, at + 1));
        }

        let name = tag
            .attr("name")
            .ok_or_else(|| self.syntax(at, "attribute declaration without name or ref"))?;

        let (def, next) = if tag.is_open() {
            if tag.attr("type").is_some() {
                return Err(self.syntax(
                    at,
                    format!("attribute '{}' has both a type attribute and inline content", name),
                ));
            }
            let close = self.close_of(at, end)?;
            if close == at + 1 || self.tags[at + 1].kind != SchemaKind::SimpleType {
                return Err(self.syntax(at, format!("attribute '{}' has no type", name)));
            }
            let (def, after) = self.parse_simple_type(at + 1, close)?;
            if after != close {
                return Err(self.unexpected(after, "attribute"));
            }
            (def, close + 1)
        } else {
            let type_name = tag
                .attr("type")
                .ok_or_else(|| self.syntax(at, format!("attribute '{}' has no type", name)))?;
            (self.resolve_simple(type_name)?, at + 1)
        };

        let mut attribute = SchemaAttribute::new(name, def.type_);
        attribute.restrictions = def.restrictions;
        self.apply_attribute_options(&mut attribute, at)?;
        Ok((attribute, next))
    }

    fn apply_attribute_options(&self, attribute: &mut SchemaAttribute, at: usize) -> Result<()> {
        let tag = &self.tags[at];
        match tag.attr("use") {
            None => {}
            Some("required") => attribute.required = true,
            Some("optional") => attribute.required = false,
            Some(other) => {
                return Err(self.syntax(at, format!("unsupported attribute use '{}'", other)));
            }
        }
        if let Some(mapping) = tag.attr("mapping") {
            attribute.mapping = mapping.to_string();
        }
        if let Some(default) = tag.attr("default") {
            attribute.default = Some(default.to_string());
        }
        if let Some(fixed) = tag.attr("fixed") {
            attribute.fixed = Some(fixed.to_string());
        }
        if attribute.default.is_some() && attribute.fixed.is_some() {
            return Err(self.syntax(
                at,
                format!("attribute '{}' has both default and fixed values", attribute.name),
            ));
        }
        Ok(())
    }

    /// Parse a simple type (`<xs:simpleType>` with one restriction) at `at`
    pub(crate) fn parse_simple_type(&self, at: usize, end: usize) -> Result<(SimpleTypeDef, usize)> {
        let tag = &self.tags[at];
        if tag.kind != SchemaKind::SimpleType || !tag.is_open() {
            return Err(self.syntax(at, "simpleType must contain a restriction"));
        }
        let close = self.close_of(at, end)?;
        if close == at + 1 {
            return Err(self.syntax(at, "simpleType must contain a restriction"));
        }
        let (def, next) = self.parse_restriction(at + 1, close)?;
        if next != close {
            return Err(self.unexpected(next, "simple type"));
        }
        Ok((def, close + 1))
    }

    fn parse_restriction(&self, at: usize, end: usize) -> Result<(SimpleTypeDef, usize)> {
        let tag = &self.tags[at];
        if tag.kind != SchemaKind::Restriction || tag.is_close() {
            return Err(self.unexpected(at, "simple type"));
        }
        let base = tag
            .attr("base")
            .ok_or_else(|| self.syntax(at, "restriction without base"))?;
        let mut def = self.resolve_simple(base)?;

        if tag.is_one_liner() {
            return Ok((def, at + 1));
        }

        let close = self.close_of(at, end)?;
        for j in at + 1..close {
            def.restrictions.push(self.parse_facet(j)?);
        }
        Ok((def, close + 1))
    }

    fn parse_facet(&self, at: usize) -> Result<Restriction> {
        let tag = &self.tags[at];
        if tag.kind != SchemaKind::RestrictionItem || !tag.is_one_liner() {
            return Err(self.unexpected(at, "restriction"));
        }
        let value = tag
            .attr("value")
            .ok_or_else(|| self.syntax(at, format!("{} facet without value", tag.local_name)))?;
        Restriction::from_tag(&tag.local_name, value).map_err(|e| self.locate(at, e))
    }

    fn resolve_simple(&self, type_name: &str) -> Result<SimpleTypeDef> {
        if let Some(primitive) = XsdType::from_name(type_name) {
            return Ok(SimpleTypeDef::primitive(primitive));
        }
        self.resolver
            .simple_type(local_name(type_name))
            .cloned()
            .ok_or_else(|| Error::UnresolvedReference(format!("type '{}'", type_name)))
    }

    fn parse_simple_content(&self, element: &mut SchemaElement, start: usize, end: usize) -> Result<()> {
        let tag = match self.tags.get(start) {
            Some(tag) if start < end => tag,
            _ => return Err(self.syntax(start.saturating_sub(1), "empty simpleContent")),
        };
        let derivation = tag.kind;
        if !matches!(derivation, SchemaKind::Extension | SchemaKind::Restriction) || tag.is_close() {
            return Err(self.unexpected(start, "simple content"));
        }
        let base = tag
            .attr("base")
            .ok_or_else(|| self.syntax(start, format!("{} without base", tag.local_name)))?;
        let def = self.resolve_simple(base)?;
        element.type_ = Some(def.type_);
        element.restrictions = def.restrictions;
        element.simple_content_wrapper = true;

        let close = if tag.is_one_liner() {
            start
        } else {
            self.close_of(start, end)?
        };

        let mut j = start + 1;
        while j < close {
            let item = &self.tags[j];
            match item.kind {
                SchemaKind::Attribute => {
                    let (attribute, next) = self.parse_attribute(j, close)?;
                    element.attributes.push(attribute);
                    j = next;
                }
                SchemaKind::RestrictionItem if derivation == SchemaKind::Restriction => {
                    element.restrictions.push(self.parse_facet(j)?);
                    j += 1;
                }
                _ => return Err(self.unexpected(j, "simple content")),
            }
        }

        if close + 1 != end {
            return Err(self.unexpected(close + 1, "simple content"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lexer::tokenize;
    use crate::schema::model::NodeShape;
    use crate::types::Facet;

    fn tags(text: &str) -> Vec<SchemaTag> {
        tokenize(text)
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, raw)| SchemaTag::parse(raw, i).unwrap())
            .collect()
    }

    fn parse(text: &str) -> Result<SchemaElement> {
        let tags = tags(text);
        let limits = Limits::default();
        let parser = TreeParser::new(&tags, &NoDefinitions, &limits);
        let (element, next) = parser.parse_element(0, tags.len(), 0)?;
        assert_eq!(next, tags.len());
        Ok(element)
    }

    #[test]
    fn test_parse_sequence() {
        let person = parse(
            r#"<xs:element name="Person">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="name" type="xs:string"/>
                        <xs:element name="age" type="xs:int" minOccurs="0"/>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:long" use="required"/>
                </xs:complexType>
            </xs:element>"#,
        )
        .unwrap();

        assert_eq!(person.name, "Person");
        assert_eq!(person.shape(), NodeShape::Composite);
        assert_eq!(person.children.len(), 2);
        assert_eq!(person.children[1].type_, Some(XsdType::Int));
        assert_eq!(person.children[1].occurs, Occurs::optional());
        assert!(person.attributes[0].required);
    }

    #[test]
    fn test_nested_elements_close_by_kind() {
        let root = parse(
            r#"<xs:element name="a"><xs:complexType><xs:sequence>
                <xs:element name="b"><xs:complexType><xs:sequence>
                    <xs:element name="c" type="xs:int"/>
                </xs:sequence></xs:complexType></xs:element>
                <xs:element name="d" type="xs:int"/>
            </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].children[0].name, "c");
        assert_eq!(root.children[1].name, "d");
    }

    #[test]
    fn test_choice_group() {
        let root = parse(
            r#"<xs:element name="payment"><xs:complexType>
                <xs:choice minOccurs="1" maxOccurs="1">
                    <xs:element name="card" type="xs:string"/>
                    <xs:element name="iban" type="xs:string"/>
                </xs:choice>
            </xs:complexType></xs:element>"#,
        )
        .unwrap();
        assert!(root.is_choice_group());
        assert_eq!(root.choice, Some(Occurs::once()));
        assert_eq!(root.children[0].occurs, Occurs::once());
    }

    #[test]
    fn test_inline_simple_type() {
        let root = parse(
            r#"<xs:element name="r"><xs:complexType><xs:sequence>
                <xs:element name="code">
                    <xs:simpleType>
                        <xs:restriction base="xs:string">
                            <xs:enumeration value="A"/>
                            <xs:enumeration value="B"/>
                        </xs:restriction>
                    </xs:simpleType>
                </xs:element>
            </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap();
        let code = &root.children[0];
        assert!(code.simple_type_wrapper);
        assert_eq!(code.type_, Some(XsdType::String));
        assert_eq!(code.restrictions.len(), 2);
        assert_eq!(code.restrictions[0].facet, Facet::Enumeration);
    }

    #[test]
    fn test_simple_content() {
        let root = parse(
            r#"<xs:element name="r"><xs:complexType><xs:sequence>
                <xs:element name="price">
                    <xs:complexType><xs:simpleContent>
                        <xs:extension base="xs:decimal">
                            <xs:attribute name="currency" type="xs:string" mapping="currencyCode"/>
                        </xs:extension>
                    </xs:simpleContent></xs:complexType>
                </xs:element>
            </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap();
        let price = &root.children[0];
        assert!(price.simple_content_wrapper);
        assert_eq!(price.type_, Some(XsdType::Decimal));
        assert_eq!(price.attributes[0].mapping, "currencyCode");
        assert_eq!(price.shape(), NodeShape::Leaf);
    }

    #[test]
    fn test_collection_and_array() {
        let root = parse(
            r#"<xs:element name="r"><xs:complexType><xs:sequence>
                <xs:element name="items" mapping="List:items"><xs:complexType><xs:sequence>
                    <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
                </xs:sequence></xs:complexType></xs:element>
                <xs:element name="scores" mapping="scores[]"><xs:complexType><xs:sequence>
                    <xs:element name="int" type="xs:int" minOccurs="0" maxOccurs="unbounded"/>
                </xs:sequence></xs:complexType></xs:element>
            </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap();
        assert_eq!(root.children[0].shape(), NodeShape::Collection);
        assert_eq!(
            root.children[1].mapping,
            Mapping::Array {
                field: "scores".into(),
                item: XsdType::Int
            }
        );
    }

    #[test]
    fn test_reference_unresolved_in_tree_mode() {
        let err = parse(
            r#"<xs:element name="r"><xs:complexType><xs:sequence>
                <xs:element ref="other"/>
            </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);

        let err = parse(r#"<xs:element name="r" type="Named"/>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn test_syntax_errors() {
        let unclosed = tags(r#"<xs:element name="a"><xs:complexType><xs:sequence></xs:sequence></xs:complexType>"#);
        let limits = Limits::default();
        let parser = TreeParser::new(&unclosed, &NoDefinitions, &limits);
        let err = parser.parse_element(0, unclosed.len(), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaSyntax);
        assert!(err.to_string().contains("never closed"));

        assert!(parse(r#"<xs:element name="a b" type="xs:int"/>"#).is_err());
        assert!(parse(r#"<xs:element name="a"/>"#).is_err());
        assert!(parse(
            r#"<xs:element name="a"><xs:complexType><xs:sequence>
                <xs:element name="b" type="xs:int"/>
                <xs:element name="b" type="xs:int"/>
            </xs:sequence></xs:complexType></xs:element>"#
        )
        .is_err());
    }

    #[test]
    fn test_depth_limit() {
        let text = r#"<xs:element name="a"><xs:complexType><xs:sequence>
            <xs:element name="b"><xs:complexType><xs:sequence>
                <xs:element name="c" type="xs:int"/>
            </xs:sequence></xs:complexType></xs:element>
        </xs:sequence></xs:complexType></xs:element>"#;
        let tags = tags(text);
        let limits = Limits::default().with_max_depth(1);
        let parser = TreeParser::new(&tags, &NoDefinitions, &limits);
        let err = parser.parse_element(0, tags.len(), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    }
}
