//! Decode engine
//!
//! Walks classified document tags against the schema tree, instantiating host
//! objects through an [`Accessor`]. Element names match by local name; the
//! span of a wrapper element is found by counting nested tags of the same
//! name.

use super::{cardinality, child_path, logical_text, mismatch, missing_attribute};
use crate::error::{Error, Result, ValidationError};
use crate::host::{Accessor, Value};
use crate::lexer::match_close;
use crate::schema::{Mapping, NodeShape, Schema, SchemaElement};
use crate::settings::Settings;
use crate::tags::XmlTag;
use crate::types::{check_restrictions, from_lexical};
use tracing::{debug, trace};

/// Builds host values from document tags
pub struct Decoder<'a> {
    schema: &'a Schema,
    accessor: &'a dyn Accessor,
    settings: &'a Settings,
}

/// Attributes every element may carry without a declaration
fn is_ambient_attribute(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:") || name.starts_with("xsi:")
}

fn describe(tag: Option<&XmlTag>) -> String {
    match tag {
        Some(tag) if tag.is_close() => format!("</{}>", tag.name),
        Some(tag) => format!("<{}>", tag.name),
        None => "end of content".to_string(),
    }
}

impl<'a> Decoder<'a> {
    /// Create a decoder over a schema
    pub fn new(schema: &'a Schema, accessor: &'a dyn Accessor) -> Self {
        Self {
            schema,
            accessor,
            settings: schema.settings(),
        }
    }

    /// Decode a complete document
    ///
    /// When the document element is not the schema root, a composite
    /// top-level definition of the same name is used instead.
    pub fn decode(&self, tags: &[XmlTag]) -> Result<Value> {
        let first = tags
            .first()
            .ok_or_else(|| mismatch("/", "document has no elements"))?;

        let root = if first.name == self.schema.root().name {
            self.schema.root()
        } else if let Some(definition) = self.schema.definition(&first.name) {
            debug!(element = %first.name, "decoding against a non-root definition");
            definition
        } else {
            return Err(mismatch(
                "/",
                format!(
                    "document element '{}' does not match schema root '{}'",
                    first.name,
                    self.schema.root().name
                ),
            ));
        };

        let path = child_path("", &root.name);
        let class = root.mapping.member().unwrap_or(root.name.as_str());
        let mut object = self.accessor.instantiate(class)?;
        let next = self.fill_composite(root, tags, 0, tags.len(), &mut object, 0, &path)?;

        if next != tags.len() {
            return Err(mismatch(
                "/",
                format!("unexpected {} after the document element", describe(tags.get(next))),
            ));
        }
        Ok(object)
    }

    fn close_of(&self, tags: &[XmlTag], at: usize, end: usize, path: &str) -> Result<usize> {
        let name = &tags[at].name;
        match_close(
            tags,
            at,
            end.saturating_sub(1),
            |t: &XmlTag| &t.name == name,
            XmlTag::is_open,
            XmlTag::is_close,
        )
        .filter(|close| *close < end)
        .ok_or_else(|| Error::Xml(format!("element <{}> is never closed at {}", name, path)))
    }

    /// Decode a composite element at `at` into `target`; returns the index
    /// past its close tag
    #[allow(clippy::too_many_arguments)]
    fn fill_composite(
        &self,
        node: &SchemaElement,
        tags: &[XmlTag],
        at: usize,
        end: usize,
        target: &mut Value,
        depth: usize,
        path: &str,
    ) -> Result<usize> {
        self.settings.limits().check_depth(depth)?;
        trace!(%path, "decode composite");

        let tag = &tags[at];
        if tag.is_close() {
            return Err(mismatch(path, format!("unexpected {}", describe(Some(tag)))));
        }
        if tag.text.is_some() {
            return Err(mismatch(
                path,
                format!("element '{}' has child elements and cannot contain text", node.name),
            ));
        }
        self.read_attributes(node, tag, Some(&mut *target), path)?;

        if tag.is_self_contained() {
            self.decode_children(node, tags, at + 1, at + 1, target, depth, path)?;
            return Ok(at + 1);
        }

        let close = self.close_of(tags, at, end, path)?;
        let next = self.decode_children(node, tags, at + 1, close, target, depth, path)?;
        if next != close {
            return Err(mismatch(
                path,
                format!("unexpected {} in '{}'", describe(tags.get(next)), node.name),
            ));
        }
        Ok(close + 1)
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_children(
        &self,
        node: &SchemaElement,
        tags: &[XmlTag],
        start: usize,
        end: usize,
        target: &mut Value,
        depth: usize,
        path: &str,
    ) -> Result<usize> {
        let mut j = start;

        if let Some(choice) = node.choice {
            let mut count = 0usize;
            while j < end && !tags[j].is_close() {
                let alternative = match node.child(&tags[j].name) {
                    Some(alternative) => alternative,
                    None => break,
                };
                count += 1;
                if choice.is_exceeded(count) {
                    return Err(cardinality(
                        path,
                        format!(
                            "choice in '{}' allows {} alternative(s), found more",
                            node.name, choice
                        ),
                    ));
                }
                j = self.decode_child(alternative, tags, j, end, target, depth + 1, path)?;
            }
            if choice.is_missing(count) {
                return Err(cardinality(
                    path,
                    format!(
                        "choice in '{}' has {} alternative(s) present, expected {}",
                        node.name, count, choice
                    ),
                ));
            }
            return Ok(j);
        }

        for child in &node.children {
            let matches = j < end && !tags[j].is_close() && tags[j].name == child.name;
            if matches {
                j = self.decode_child(child, tags, j, end, target, depth + 1, path)?;
            } else if !node.is_optional_child(child) {
                return Err(mismatch(
                    &child_path(path, &child.name),
                    format!(
                        "expected element '{}', found {}",
                        child.name,
                        describe(tags.get(j).filter(|_| j < end))
                    ),
                ));
            }
        }
        Ok(j)
    }

    /// Decode one child element and store it on `target`
    #[allow(clippy::too_many_arguments)]
    fn decode_child(
        &self,
        child: &SchemaElement,
        tags: &[XmlTag],
        at: usize,
        end: usize,
        target: &mut Value,
        depth: usize,
        parent_path: &str,
    ) -> Result<usize> {
        let path = child_path(parent_path, &child.name);

        match child.shape() {
            NodeShape::Leaf | NodeShape::ArrayLeaf => {
                let (value, next) = self.read_leaf(child, tags, at, end, Some(&mut *target), &path)?;
                if let Some(member) = child.mapping.member() {
                    self.accessor.set(target, member, value)?;
                }
                Ok(next)
            }
            NodeShape::Composite => match child.mapping.member() {
                None => self.fill_composite(child, tags, at, end, target, depth, &path),
                Some(member) => {
                    let mut object = self.accessor.instantiate(member)?;
                    let next = self.fill_composite(child, tags, at, end, &mut object, depth, &path)?;
                    self.accessor.set(target, member, object)?;
                    Ok(next)
                }
            },
            NodeShape::Collection | NodeShape::Array => {
                self.decode_wrapper(child, tags, at, end, target, depth, &path)
            }
        }
    }

    /// Read a primitive leaf at `at`; attributes go to `attribute_target`
    fn read_leaf(
        &self,
        node: &SchemaElement,
        tags: &[XmlTag],
        at: usize,
        end: usize,
        attribute_target: Option<&mut Value>,
        path: &str,
    ) -> Result<(Value, usize)> {
        let ty = node
            .type_
            .ok_or_else(|| Error::syntax(format!("leaf '{}' has no type", node.name)))?;
        let tag = &tags[at];

        let (text, next) = if tag.is_open() {
            match tags.get(at + 1) {
                Some(close) if at + 1 < end && close.is_close() && close.name == tag.name => (None, at + 2),
                _ => {
                    return Err(mismatch(
                        path,
                        format!("element '{}' must contain only text", node.name),
                    ))
                }
            }
        } else if tag.is_close() {
            return Err(mismatch(path, format!("unexpected {}", describe(Some(tag)))));
        } else {
            (tag.text.as_deref(), at + 1)
        };

        self.read_attributes(node, tag, attribute_target, path)?;

        let value = match text {
            None => Value::Null,
            Some(text) => {
                if node.has_restriction() {
                    check_restrictions(&node.restrictions, ty, logical_text(text, self.settings), self.settings)
                        .map_err(|e| e.at_path(path))?;
                }
                from_lexical(ty, text, self.settings).map_err(|e| e.at_path(path))?
            }
        };
        Ok((value, next))
    }

    /// Decode a collection or array wrapper into its member on `target`
    #[allow(clippy::too_many_arguments)]
    fn decode_wrapper(
        &self,
        node: &SchemaElement,
        tags: &[XmlTag],
        at: usize,
        end: usize,
        target: &mut Value,
        depth: usize,
        path: &str,
    ) -> Result<usize> {
        self.settings.limits().check_depth(depth)?;
        let item_node = node
            .children
            .first()
            .ok_or_else(|| Error::syntax(format!("wrapper '{}' has no item element", node.name)))?;

        let tag = &tags[at];
        if tag.text.is_some() {
            return Err(mismatch(
                path,
                format!("'{}' holds items and cannot contain text", node.name),
            ));
        }
        self.read_attributes(node, tag, Some(&mut *target), path)?;

        let (start, close, next) = if tag.is_self_contained() {
            (at + 1, at + 1, at + 1)
        } else {
            let close = self.close_of(tags, at, end, path)?;
            (at + 1, close, close + 1)
        };

        let mut items = Vec::new();
        let mut j = start;
        while j < close {
            let item_tag = &tags[j];
            if item_tag.name != item_node.name || item_tag.is_close() {
                return Err(mismatch(
                    path,
                    format!(
                        "expected '{}' items in '{}', found {}",
                        item_node.name,
                        node.name,
                        describe(Some(item_tag))
                    ),
                ));
            }
            let item_path = format!("{}[{}]", child_path(path, &item_node.name), items.len());
            let (item, after) = match item_node.shape() {
                NodeShape::Leaf | NodeShape::ArrayLeaf => {
                    self.read_leaf(item_node, tags, j, close, None, &item_path)?
                }
                _ => {
                    let class = item_node.mapping.member().unwrap_or(item_node.name.as_str());
                    let mut object = self.accessor.instantiate(class)?;
                    let after =
                        self.fill_composite(item_node, tags, j, close, &mut object, depth + 1, &item_path)?;
                    (object, after)
                }
            };
            items.push(item);
            j = after;
        }

        if !item_node.occurs.admits(items.len()) {
            return Err(cardinality(
                path,
                format!(
                    "'{}' holds {} item(s), expected {}",
                    node.name,
                    items.len(),
                    item_node.occurs
                ),
            ));
        }

        match &node.mapping {
            Mapping::Array { field, item } => {
                let array = self.accessor.new_array(*item, items)?;
                self.accessor.set(target, field, array)?;
            }
            Mapping::Collection { kind, field } => {
                let mut collection = match self.accessor.take(target, field)? {
                    Some(existing) => existing,
                    None => self.accessor.new_collection(kind)?,
                };
                for item in items {
                    self.accessor.push_item(&mut collection, item)?;
                }
                self.accessor.set(target, field, collection)?;
            }
            _ => {}
        }
        Ok(next)
    }

    /// Check a tag's attributes against the declarations of `node` and store
    /// their values on `target`
    fn read_attributes(
        &self,
        node: &SchemaElement,
        tag: &XmlTag,
        mut target: Option<&mut Value>,
        path: &str,
    ) -> Result<()> {
        for (name, _) in &tag.attributes {
            if !is_ambient_attribute(name) && !node.attributes.iter().any(|a| &a.name == name) {
                return Err(mismatch(
                    path,
                    format!("undeclared attribute '{}' on '{}'", name, node.name),
                ));
            }
        }

        for attribute in &node.attributes {
            let attribute_path = format!("{}/@{}", path, attribute.name);
            let text = match tag.attr(&attribute.name) {
                Some(text) => {
                    if attribute.required && text.is_empty() {
                        return Err(missing_attribute(path, &attribute.name));
                    }
                    if let Some(fixed) = &attribute.fixed {
                        if text != fixed {
                            return Err(Error::RestrictionViolation(
                                ValidationError::new(format!(
                                    "attribute '{}' must be '{}'",
                                    attribute.name, fixed
                                ))
                                .with_path(attribute_path)
                                .with_instance(text)
                                .with_reason("fixed"),
                            ));
                        }
                    }
                    if attribute.has_restriction() {
                        check_restrictions(
                            &attribute.restrictions,
                            attribute.type_,
                            logical_text(text, self.settings),
                            self.settings,
                        )
                        .map_err(|e| e.at_path(&attribute_path))?;
                    }
                    text
                }
                None if attribute.required => return Err(missing_attribute(path, &attribute.name)),
                None => match attribute.fixed.as_deref().or(attribute.default.as_deref()) {
                    Some(text) => text,
                    None => continue,
                },
            };

            let value = from_lexical(attribute.type_, text, self.settings)
                .map_err(|e| e.at_path(&attribute_path))?;
            if let Some(target) = target.as_deref_mut() {
                self.accessor.set(target, &attribute.mapping, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::host::{DiscardAccessor, DynamicAccessor, Object};
    use crate::schema::{Occurs, SchemaAttribute};
    use crate::tags::document_tags;
    use crate::types::XsdType;

    fn person_schema() -> Schema {
        let root = SchemaElement::composite("Person")
            .with_attribute(SchemaAttribute::new("id", XsdType::Int).required())
            .with_child(SchemaElement::leaf("name", XsdType::String))
            .with_child(SchemaElement::leaf("age", XsdType::Int).with_occurs(Occurs::optional()));
        Schema::from_root(root, Settings::default()).unwrap()
    }

    fn decode(schema: &Schema, xml: &str) -> Result<Value> {
        let tags = document_tags(xml)?;
        Decoder::new(schema, &DynamicAccessor::new()).decode(&tags)
    }

    #[test]
    fn test_decode_object() {
        let value = decode(
            &person_schema(),
            r#"<Person id="4" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
                <name>Ann</name><age>31</age>
            </Person>"#,
        )
        .unwrap();
        let expected = Object::new("Person").with("id", 4).with("name", "Ann").with("age", 31);
        assert_eq!(value, Value::Object(expected));
    }

    #[test]
    fn test_decode_empty_leaf_is_null() {
        let value = decode(&person_schema(), r#"<Person id="1"><name>Bo</name><age/></Person>"#).unwrap();
        assert_eq!(value.field("age"), Some(&Value::Null));

        let value = decode(&person_schema(), r#"<Person id="1"><name>Bo</name><age></age></Person>"#).unwrap();
        assert_eq!(value.field("age"), Some(&Value::Null));
    }

    #[test]
    fn test_decode_structure_errors() {
        let schema = person_schema();
        let missing = decode(&schema, r#"<Person id="1"><age>3</age></Person>"#).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::StructureMismatch);
        assert!(missing.to_string().contains("/Person/name"));

        let extra = decode(&schema, r#"<Person id="1"><name>A</name><shoe>9</shoe></Person>"#).unwrap_err();
        assert_eq!(extra.kind(), ErrorKind::StructureMismatch);

        let wrong_root = decode(&schema, r#"<Animal/>"#).unwrap_err();
        assert_eq!(wrong_root.kind(), ErrorKind::StructureMismatch);

        let attr = decode(&schema, r#"<Person><name>A</name></Person>"#).unwrap_err();
        assert_eq!(attr.kind(), ErrorKind::MissingRequiredAttribute);

        let undeclared = decode(&schema, r#"<Person id="1" x="2"><name>A</name></Person>"#).unwrap_err();
        assert_eq!(undeclared.kind(), ErrorKind::StructureMismatch);
    }

    #[test]
    fn test_decode_type_error_carries_path() {
        let err = decode(&person_schema(), r#"<Person id="1"><name>A</name><age>old</age></Person>"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConversion);
        assert!(err.to_string().contains("/Person/age"));
    }

    #[test]
    fn test_attributes_checked_without_target() {
        let schema = person_schema();
        let decoder = Decoder::new(&schema, &DiscardAccessor);
        let node = SchemaElement::leaf("price", XsdType::Decimal)
            .with_attribute(SchemaAttribute::new("qty", XsdType::Int));

        let good = document_tags(r#"<price qty="7">1.5</price>"#).unwrap();
        assert!(decoder.read_attributes(&node, &good[0], None, "/price").is_ok());

        let bad = document_tags(r#"<price qty="many">1.5</price>"#).unwrap();
        let err = decoder.read_attributes(&node, &bad[0], None, "/price").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConversion);
        assert!(err.to_string().contains("/price/@qty"));
    }

    #[test]
    fn test_decode_collection_reuses_existing() {
        let root = SchemaElement::composite("r").with_child(
            SchemaElement::composite("tags")
                .with_mapping(Mapping::Collection {
                    kind: "List".into(),
                    field: "tags".into(),
                })
                .with_child(SchemaElement::leaf("tag", XsdType::String).with_occurs(Occurs::zero_or_more())),
        );
        let schema = Schema::from_root(root, Settings::default()).unwrap();
        let value = decode(&schema, "<r><tags><tag>a</tag><tag>b</tag></tags></r>").unwrap();
        assert_eq!(value.field("tags"), Some(&Value::List(vec!["a".into(), "b".into()])));

        let empty = decode(&schema, "<r><tags/></r>").unwrap();
        assert_eq!(empty.field("tags"), Some(&Value::List(vec![])));
    }

    #[test]
    fn test_decode_nested_same_name() {
        let root = SchemaElement::composite("node")
            .with_child(SchemaElement::leaf("label", XsdType::String))
            .with_child(
                SchemaElement::composite("children")
                    .with_mapping(Mapping::Collection {
                        kind: "List".into(),
                        field: "children".into(),
                    })
                    .with_child(
                        SchemaElement::composite("node")
                            .with_child(SchemaElement::leaf("label", XsdType::String)),
                    )
                    .with_occurs(Occurs::optional()),
            );
        let schema = Schema::from_root(root, Settings::default()).unwrap();
        let value = decode(
            &schema,
            "<node><label>a</label><children><node><label>b</label></node><node><label>c</label></node></children></node>",
        )
        .unwrap();
        match value.field("children") {
            Some(Value::List(items)) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_fixed_attribute_mismatch() {
        let root = SchemaElement::composite("r")
            .with_attribute(SchemaAttribute::new("v", XsdType::String).with_fixed("1"))
            .with_child(SchemaElement::leaf("x", XsdType::Int));
        let schema = Schema::from_root(root, Settings::default()).unwrap();
        assert_eq!(
            decode(&schema, r#"<r v="2"><x>1</x></r>"#).unwrap_err().kind(),
            ErrorKind::RestrictionViolation
        );
        let value = decode(&schema, r#"<r><x>1</x></r>"#).unwrap();
        assert_eq!(value.field("v"), Some(&Value::from("1")));
    }

    #[test]
    fn test_discard_accessor_builds_nothing() {
        let schema = person_schema();
        let tags = document_tags(r#"<Person id="1"><name>A</name></Person>"#).unwrap();
        let value = Decoder::new(&schema, &DiscardAccessor).decode(&tags).unwrap();
        assert!(value.is_null());
    }
}
