//! Divided-dialect schema loader
//!
//! Flat schemas declare their leaves and types at the top level and stitch
//! composite elements together with `ref=` and `type=`. Definitions may
//! appear in any order, so loading runs in three phases:
//!
//! 1. leading one-liner element and attribute declarations are pooled as-is;
//! 2. every remaining top-level definition is attempted once, and the ones
//!    referring to something not yet defined are queued;
//! 3. the queue is retried for a bounded number of rounds
//!    ([`Limits::max_resolution_rounds`]), after which anything still pending
//!    is an [`Error::UnresolvedReference`].

use crate::error::{Error, ParseError, Result};
use crate::lexer::match_close;
use crate::limits::Limits;
use crate::schema::model::{NodeShape, SchemaAttribute, SchemaElement};
use crate::schema::tree::{Resolver, SimpleTypeDef, TreeParser};
use crate::tags::{SchemaKind, SchemaTag, TagForm};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Named definitions collected while loading
#[derive(Debug, Default)]
struct Pools {
    /// Leaf and wrapper elements
    elements: IndexMap<String, SchemaElement>,
    /// Composite elements
    resolved: IndexMap<String, SchemaElement>,
    attributes: IndexMap<String, SchemaAttribute>,
    complex_types: IndexMap<String, SchemaElement>,
    simple_types: IndexMap<String, SimpleTypeDef>,
}

impl Resolver for Pools {
    fn element(&self, name: &str) -> Option<&SchemaElement> {
        self.resolved.get(name).or_else(|| self.elements.get(name))
    }

    fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.get(name)
    }

    fn complex_type(&self, name: &str) -> Option<&SchemaElement> {
        self.complex_types.get(name)
    }

    fn simple_type(&self, name: &str) -> Option<&SimpleTypeDef> {
        self.simple_types.get(name)
    }
}

enum Definition {
    Element(SchemaElement),
    Attribute(SchemaAttribute),
    ComplexType(SchemaElement),
    SimpleType(String, SimpleTypeDef),
}

/// A top-level definition waiting for its references
#[derive(Debug)]
struct Pending {
    start: usize,
    end: usize,
    missing: String,
}

pub(crate) struct DividedLoader<'a> {
    tags: &'a [SchemaTag],
    limits: &'a Limits,
    pools: Pools,
    /// Top-level element names in document order
    order: Vec<String>,
}

impl<'a> DividedLoader<'a> {
    pub(crate) fn new(tags: &'a [SchemaTag], limits: &'a Limits) -> Self {
        Self {
            tags,
            limits,
            pools: Pools::default(),
            order: Vec::new(),
        }
    }

    fn syntax(&self, at: usize, message: impl Into<String>) -> Error {
        Error::SchemaSyntax(
            ParseError::new(message)
                .with_location(at)
                .with_source(self.tags[at].raw.clone()),
        )
    }

    /// Load every definition; returns the composite top-level elements in
    /// document order
    pub(crate) fn load(mut self) -> Result<IndexMap<String, SchemaElement>> {
        let total = self.tags.len();
        let mut pending = Vec::new();
        let mut i = 0;

        while i < total
            && self.tags[i].is_one_liner()
            && matches!(self.tags[i].kind, SchemaKind::Element | SchemaKind::Attribute)
        {
            self.note_order(i);
            self.attempt(i, i + 1, &mut pending)?;
            i += 1;
        }
        debug!(
            elements = self.pools.elements.len(),
            attributes = self.pools.attributes.len(),
            "pooled leading leaf definitions"
        );

        while i < total {
            let tag = &self.tags[i];
            if !matches!(
                tag.kind,
                SchemaKind::Element | SchemaKind::Attribute | SchemaKind::ComplexType | SchemaKind::SimpleType
            ) {
                return Err(self.syntax(i, format!("<{}> cannot appear at the top level", tag.local_name)));
            }
            let end = match tag.form {
                TagForm::OneLiner => i + 1,
                TagForm::Open => self.close_of(i)? + 1,
                TagForm::Close => {
                    return Err(self.syntax(i, format!("unexpected </{}>", tag.local_name)));
                }
            };
            self.note_order(i);
            self.attempt(i, end, &mut pending)?;
            i = end;
        }
        debug!(pending = pending.len(), "first pass over top-level definitions done");

        let rounds = self.limits.max_resolution_rounds;
        for round in 1..=rounds {
            if pending.is_empty() {
                break;
            }
            let queue = std::mem::take(&mut pending);
            let queued = queue.len();
            for item in queue {
                self.attempt(item.start, item.end, &mut pending)?;
            }
            debug!(
                round,
                resolved = queued - pending.len(),
                pending = pending.len(),
                "resolution round"
            );
        }

        if !pending.is_empty() {
            let details: Vec<String> = pending
                .iter()
                .map(|p| format!("{} needs {}", self.describe(p.start), p.missing))
                .collect();
            return Err(Error::UnresolvedReference(format!(
                "{} definition(s) still unresolved after {} rounds: {}",
                pending.len(),
                rounds,
                details.join("; ")
            )));
        }

        Ok(self.into_definitions())
    }

    fn close_of(&self, at: usize) -> Result<usize> {
        let kind = self.tags[at].kind;
        match_close(
            self.tags,
            at,
            self.tags.len().saturating_sub(1),
            |t: &SchemaTag| t.kind == kind,
            SchemaTag::is_open,
            SchemaTag::is_close,
        )
        .ok_or_else(|| self.syntax(at, format!("<{}> is never closed", self.tags[at].local_name)))
    }

    fn note_order(&mut self, at: usize) {
        let tag = &self.tags[at];
        if tag.kind == SchemaKind::Element {
            if let Some(name) = tag.attr("name") {
                self.order.push(name.to_string());
            }
        }
    }

    fn describe(&self, at: usize) -> String {
        let tag = &self.tags[at];
        match tag.attr("name") {
            Some(name) => format!("{} '{}'", tag.local_name, name),
            None => format!("{} at tag #{}", tag.local_name, at),
        }
    }

    /// Try one definition; a missing reference queues it, anything else fails
    fn attempt(&mut self, start: usize, end: usize, pending: &mut Vec<Pending>) -> Result<()> {
        match self.parse_definition(start, end) {
            Ok(definition) => self.store(definition),
            Err(Error::UnresolvedReference(missing)) => {
                trace!(definition = %self.describe(start), %missing, "deferred");
                pending.push(Pending {
                    start,
                    end,
                    missing,
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn parse_definition(&self, start: usize, end: usize) -> Result<Definition> {
        let parser = TreeParser::new(self.tags, &self.pools, self.limits);
        let tag = &self.tags[start];

        match tag.kind {
            SchemaKind::Element => {
                if tag.attr("ref").is_some() {
                    return Err(self.syntax(start, "a top-level element cannot be a reference"));
                }
                let (element, _) = parser.parse_element(start, end, 0)?;
                Ok(Definition::Element(element))
            }
            SchemaKind::Attribute => {
                if tag.attr("ref").is_some() {
                    return Err(self.syntax(start, "a top-level attribute cannot be a reference"));
                }
                let (attribute, _) = parser.parse_attribute(start, end)?;
                Ok(Definition::Attribute(attribute))
            }
            SchemaKind::ComplexType => {
                let (template, _) = parser.parse_complex_type(start, end, 0)?;
                Ok(Definition::ComplexType(template))
            }
            SchemaKind::SimpleType => {
                let name = tag
                    .attr("name")
                    .ok_or_else(|| self.syntax(start, "top-level simpleType without name"))?;
                let (def, _) = parser.parse_simple_type(start, end)?;
                Ok(Definition::SimpleType(name.to_string(), def))
            }
            _ => Err(self.syntax(start, format!("<{}> cannot appear at the top level", tag.local_name))),
        }
    }

    fn store(&mut self, definition: Definition) -> Result<()> {
        let pools = &mut self.pools;
        match definition {
            Definition::Element(element) => {
                let name = element.name.clone();
                if element.shape() == NodeShape::Composite {
                    if pools.elements.contains_key(&name) {
                        return Err(conflict("element", &name));
                    }
                    insert_unique(&mut pools.resolved, name, element, "element")
                } else {
                    if pools.resolved.contains_key(&name) {
                        return Err(conflict("element", &name));
                    }
                    insert_unique(&mut pools.elements, name, element, "element")
                }
            }
            Definition::Attribute(attribute) => {
                let name = attribute.name.clone();
                insert_unique(&mut pools.attributes, name, attribute, "attribute")
            }
            Definition::ComplexType(template) => {
                let name = template.name.clone();
                insert_unique(&mut pools.complex_types, name, template, "complexType")
            }
            Definition::SimpleType(name, def) => {
                insert_unique(&mut pools.simple_types, name, def, "simpleType")
            }
        }
    }

    fn into_definitions(self) -> IndexMap<String, SchemaElement> {
        let mut resolved = self.pools.resolved;
        let mut definitions = IndexMap::new();
        for name in self.order {
            if let Some(element) = resolved.shift_remove(&name) {
                definitions.insert(name, element);
            }
        }
        definitions
    }
}

fn conflict(what: &str, name: &str) -> Error {
    Error::DuplicateDefinition(format!("{} '{}' defined twice with different content", what, name))
}

/// Insert a definition; an identical redefinition is tolerated
fn insert_unique<T: PartialEq>(
    pool: &mut IndexMap<String, T>,
    name: String,
    value: T,
    what: &str,
) -> Result<()> {
    match pool.get(&name) {
        Some(existing) if *existing == value => {
            debug!(kind = what, %name, "identical duplicate definition ignored");
            Ok(())
        }
        Some(_) => Err(conflict(what, &name)),
        None => {
            pool.insert(name, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lexer::tokenize;
    use crate::schema::model::Occurs;
    use crate::types::XsdType;

    fn load_with(text: &str, limits: &Limits) -> Result<IndexMap<String, SchemaElement>> {
        let tags: Vec<SchemaTag> = tokenize(text)?
            .iter()
            .enumerate()
            .map(|(i, raw)| SchemaTag::parse(raw, i))
            .collect::<Result<_>>()?;
        DividedLoader::new(&tags, limits).load()
    }

    fn load(text: &str) -> Result<IndexMap<String, SchemaElement>> {
        load_with(text, &Limits::default())
    }

    const ORDER: &str = r#"
        <xs:element name="id" type="xs:long"/>
        <xs:element name="street" type="xs:string"/>
        <xs:element name="Order">
            <xs:complexType><xs:sequence>
                <xs:element ref="id"/>
                <xs:element ref="Customer" minOccurs="0"/>
            </xs:sequence></xs:complexType>
        </xs:element>
        <xs:element name="Customer">
            <xs:complexType><xs:sequence>
                <xs:element ref="id"/>
                <xs:element name="address" type="Address"/>
            </xs:sequence></xs:complexType>
        </xs:element>
        <xs:complexType name="Address">
            <xs:sequence><xs:element ref="street"/></xs:sequence>
        </xs:complexType>
    "#;

    #[test]
    fn test_forward_references_resolve() {
        let definitions = load(ORDER).unwrap();
        let names: Vec<&str> = definitions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Order", "Customer"]);

        let order = &definitions["Order"];
        assert_eq!(order.children[0].type_, Some(XsdType::Long));
        let customer = &order.children[1];
        assert_eq!(customer.occurs, Occurs::optional());
        assert_eq!(customer.children[1].children[0].name, "street");
    }

    #[test]
    fn test_named_simple_type() {
        let definitions = load(
            r#"
            <xs:simpleType name="Code">
                <xs:restriction base="xs:string"><xs:length value="3"/></xs:restriction>
            </xs:simpleType>
            <xs:element name="r"><xs:complexType><xs:sequence>
                <xs:element name="code" type="Code"/>
            </xs:sequence></xs:complexType></xs:element>
            "#,
        )
        .unwrap();
        let code = &definitions["r"].children[0];
        assert!(code.simple_type_wrapper);
        assert_eq!(code.restrictions.len(), 1);
    }

    #[test]
    fn test_unresolvable_reference_fails_after_budget() {
        let err = load(
            r#"<xs:element name="r"><xs:complexType><xs:sequence>
                <xs:element ref="ghost"/>
            </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
        assert!(err.to_string().contains("after 10 rounds"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_round_budget_limits_chain_length() {
        let chain = r#"
            <xs:element name="leaf" type="xs:int"/>
            <xs:element name="A"><xs:complexType><xs:sequence><xs:element ref="B"/></xs:sequence></xs:complexType></xs:element>
            <xs:element name="B"><xs:complexType><xs:sequence><xs:element ref="C"/></xs:sequence></xs:complexType></xs:element>
            <xs:element name="C"><xs:complexType><xs:sequence><xs:element ref="D"/></xs:sequence></xs:complexType></xs:element>
            <xs:element name="D"><xs:complexType><xs:sequence><xs:element ref="leaf"/></xs:sequence></xs:complexType></xs:element>
        "#;
        let err = load_with(chain, &Limits::default().with_resolution_rounds(2)).unwrap_err();
        assert!(err.to_string().contains("after 2 rounds"));
        assert!(load_with(chain, &Limits::default().with_resolution_rounds(3)).is_ok());
    }

    #[test]
    fn test_duplicates() {
        let same = r#"
            <xs:element name="n" type="xs:int"/>
            <xs:element name="n" type="xs:int"/>
            <xs:element name="r"><xs:complexType><xs:sequence><xs:element ref="n"/></xs:sequence></xs:complexType></xs:element>
        "#;
        assert!(load(same).is_ok());

        let different = r#"
            <xs:element name="n" type="xs:int"/>
            <xs:element name="n" type="xs:string"/>
            <xs:element name="r"><xs:complexType><xs:sequence><xs:element ref="n"/></xs:sequence></xs:complexType></xs:element>
        "#;
        assert_eq!(load(different).unwrap_err().kind(), ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn test_reference_overrides() {
        let definitions = load(
            r#"
            <xs:element name="tag" type="xs:string"/>
            <xs:attribute name="lang" type="xs:language"/>
            <xs:element name="r"><xs:complexType>
                <xs:sequence>
                    <xs:element ref="tag" minOccurs="0" mapping="label"/>
                </xs:sequence>
                <xs:attribute ref="lang" use="required"/>
            </xs:complexType></xs:element>
            "#,
        )
        .unwrap();
        let r = &definitions["r"];
        assert_eq!(r.children[0].occurs.min, 0);
        assert_eq!(r.children[0].mapping.member(), Some("label"));
        assert!(r.attributes[0].required);
    }

    #[test]
    fn test_top_level_reference_rejected() {
        let err = load(r#"<xs:element ref="x"/>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaSyntax);
    }
}
