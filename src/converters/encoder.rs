//! Encode engine
//!
//! Walks the schema tree and the host value graph together and writes one
//! element per line, indented by nesting depth. All traversal state (depth,
//! element path) is passed down explicitly.

use super::{cardinality, child_path, logical_text, missing_attribute};
use crate::error::{Error, Result};
use crate::host::{Accessor, Value};
use crate::lexer::escape_text;
use crate::schema::{Mapping, NodeShape, SchemaElement};
use crate::settings::Settings;
use crate::types::{check_restrictions, to_lexical};
use tracing::trace;

static NULL: Value = Value::Null;

/// Writes host values as XML documents
pub struct Encoder<'a> {
    accessor: &'a dyn Accessor,
    settings: &'a Settings,
    namespace: Option<&'a str>,
}

impl<'a> Encoder<'a> {
    /// Create an encoder; `namespace` is written as `xmlns` on the root
    pub fn new(accessor: &'a dyn Accessor, settings: &'a Settings, namespace: Option<&'a str>) -> Self {
        Self {
            accessor,
            settings,
            namespace,
        }
    }

    /// Encode `value` as a document rooted at `root`
    pub fn encode(&self, root: &SchemaElement, value: &Value) -> Result<String> {
        if value.is_null() {
            return Err(Error::Accessor(format!(
                "cannot encode a null value as root element '{}'",
                root.name
            )));
        }

        let mut out = String::new();
        let declaration = self.settings.xml_declaration();
        if !declaration.is_empty() {
            out.push_str(declaration);
            out.push_str(self.settings.line_terminator());
        }

        let path = child_path("", &root.name);
        self.write_composite(root, value, 0, &path, true, &mut out)?;
        Ok(out)
    }

    fn indent(&self, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str(self.settings.indent());
        }
    }

    /// Write an element around already rendered content
    fn write_element(&self, name: &str, attributes: &str, body: &str, depth: usize, out: &mut String) {
        let terminator = self.settings.line_terminator();
        self.indent(depth, out);
        if body.is_empty() {
            out.push_str(&format!("<{}{}/>{}", name, attributes, terminator));
        } else {
            out.push_str(&format!("<{}{}>{}", name, attributes, terminator));
            out.push_str(body);
            self.indent(depth, out);
            out.push_str(&format!("</{}>{}", name, terminator));
        }
    }

    fn member<'v>(&self, node: &SchemaElement, object: &'v Value) -> Result<Option<&'v Value>> {
        match node.mapping.member() {
            Some(member) => self.accessor.get(object, member),
            None => Ok(None),
        }
    }

    fn write_composite(
        &self,
        node: &SchemaElement,
        object: &Value,
        depth: usize,
        path: &str,
        is_root: bool,
        out: &mut String,
    ) -> Result<()> {
        self.settings.limits().check_depth(depth)?;
        trace!(%path, "encode composite");

        let mut attributes = String::new();
        if is_root {
            if let Some(namespace) = self.namespace {
                attributes.push_str(&format!(" xmlns=\"{}\"", escape_text(namespace)));
            }
        }
        self.write_attributes(node, Some(object), path, &mut attributes)?;

        let mut body = String::new();
        self.write_children(node, object, depth + 1, path, &mut body)?;

        self.write_element(&node.name, &attributes, &body, depth, out);
        Ok(())
    }

    fn write_children(
        &self,
        node: &SchemaElement,
        object: &Value,
        depth: usize,
        path: &str,
        out: &mut String,
    ) -> Result<()> {
        if let Some(choice) = node.choice {
            let mut present = 0usize;
            for child in &node.children {
                if self.is_present(child, object)? {
                    present += 1;
                    self.write_child(node, child, object, depth, path, out)?;
                }
            }
            if !choice.admits(present) {
                return Err(cardinality(
                    path,
                    format!(
                        "choice in '{}' has {} alternative(s) present, expected {}",
                        node.name, present, choice
                    ),
                ));
            }
            return Ok(());
        }

        for child in &node.children {
            self.write_child(node, child, object, depth, path, out)?;
        }
        Ok(())
    }

    /// Check if a choice alternative carries data
    fn is_present(&self, node: &SchemaElement, object: &Value) -> Result<bool> {
        if node.mapping == Mapping::SkipLevel {
            for child in &node.children {
                if self.is_present(child, object)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        Ok(match self.member(node, object)? {
            None => false,
            Some(value) => match node.shape() {
                NodeShape::Collection => !self.accessor.collection_items(value)?.is_empty(),
                NodeShape::Array => !self.accessor.array_items(value)?.is_empty(),
                _ => true,
            },
        })
    }

    fn write_child(
        &self,
        parent: &SchemaElement,
        child: &SchemaElement,
        object: &Value,
        depth: usize,
        parent_path: &str,
        out: &mut String,
    ) -> Result<()> {
        let path = child_path(parent_path, &child.name);

        match child.shape() {
            NodeShape::Leaf | NodeShape::ArrayLeaf => {
                let value = self.member(child, object)?.unwrap_or(&NULL);
                self.write_leaf(child, value, Some(object), depth, &path, out)
            }
            NodeShape::Composite if child.mapping == Mapping::SkipLevel => {
                self.write_composite(child, object, depth, &path, false, out)
            }
            NodeShape::Composite => match self.member(child, object)? {
                Some(value) => self.write_composite(child, value, depth, &path, false, out),
                None if parent.is_optional_child(child) => Ok(()),
                None => Err(cardinality(
                    &path,
                    format!("required element '{}' has no value", child.name),
                )),
            },
            NodeShape::Collection | NodeShape::Array => {
                let wrapped = self.member(child, object)?;
                if wrapped.is_none() && parent.is_optional_child(child) {
                    return Ok(());
                }
                self.write_wrapper(child, object, wrapped, depth, &path, out)
            }
        }
    }

    /// Write a primitive leaf; attributes are read from `attribute_source`
    fn write_leaf(
        &self,
        node: &SchemaElement,
        value: &Value,
        attribute_source: Option<&Value>,
        depth: usize,
        path: &str,
        out: &mut String,
    ) -> Result<()> {
        let ty = node
            .type_
            .ok_or_else(|| Error::syntax(format!("leaf '{}' has no type", node.name)))?;

        let lexical = to_lexical(ty, value, self.settings).map_err(|e| e.at_path(path))?;
        if let Some(text) = &lexical {
            if node.has_restriction() {
                check_restrictions(&node.restrictions, ty, logical_text(text, self.settings), self.settings)
                    .map_err(|e| e.at_path(path))?;
            }
        }

        let mut attributes = String::new();
        self.write_attributes(node, attribute_source, path, &mut attributes)?;

        self.indent(depth, out);
        match lexical.filter(|text| !text.is_empty()) {
            Some(text) => out.push_str(&format!(
                "<{}{}>{}</{}>",
                node.name,
                attributes,
                escape_text(&text),
                node.name
            )),
            None => out.push_str(&format!("<{}{}/>", node.name, attributes)),
        }
        out.push_str(self.settings.line_terminator());
        Ok(())
    }

    /// Write a collection or array wrapper holding `wrapped`
    fn write_wrapper(
        &self,
        node: &SchemaElement,
        object: &Value,
        wrapped: Option<&Value>,
        depth: usize,
        path: &str,
        out: &mut String,
    ) -> Result<()> {
        let item_node = node
            .children
            .first()
            .ok_or_else(|| Error::syntax(format!("wrapper '{}' has no item element", node.name)))?;

        let items: &[Value] = match (wrapped, node.shape()) {
            (None, _) => &[],
            (Some(value), NodeShape::Array) => self.accessor.array_items(value)?,
            (Some(value), _) => self.accessor.collection_items(value)?,
        };

        let count = items.len();
        if !item_node.occurs.admits(count) {
            return Err(cardinality(
                path,
                format!(
                    "'{}' holds {} item(s), expected {}",
                    node.name, count, item_node.occurs
                ),
            ));
        }

        let mut attributes = String::new();
        self.write_attributes(node, Some(object), path, &mut attributes)?;

        let mut body = String::new();
        for (idx, item) in items.iter().enumerate() {
            let item_path = format!("{}[{}]", child_path(path, &item_node.name), idx);
            match item_node.shape() {
                NodeShape::Leaf | NodeShape::ArrayLeaf => {
                    self.write_leaf(item_node, item, None, depth + 1, &item_path, &mut body)?;
                }
                _ if item.is_null() => {
                    return Err(cardinality(&item_path, "collection item is null"));
                }
                _ => self.write_composite(item_node, item, depth + 1, &item_path, false, &mut body)?,
            }
        }

        self.write_element(&node.name, &attributes, &body, depth, out);
        Ok(())
    }

    /// Render attribute declarations as ` name="value"` pairs
    ///
    /// A fixed value always wins; otherwise the mapped member, then the
    /// default. Optional attributes without a value are left out.
    fn write_attributes(
        &self,
        node: &SchemaElement,
        source: Option<&Value>,
        path: &str,
        out: &mut String,
    ) -> Result<()> {
        for attribute in &node.attributes {
            let text = match &attribute.fixed {
                Some(fixed) => Some(fixed.clone()),
                None => {
                    let value = match source {
                        Some(object) => self.accessor.get(object, &attribute.mapping)?,
                        None => None,
                    };
                    match value {
                        Some(value) => to_lexical(attribute.type_, value, self.settings)
                            .map_err(|e| e.at_path(&format!("{}/@{}", path, attribute.name)))?,
                        None => attribute.default.clone(),
                    }
                }
            };

            let text = match text {
                Some(text) if !text.is_empty() => text,
                _ if attribute.required => return Err(missing_attribute(path, &attribute.name)),
                Some(text) => text,
                None => continue,
            };

            if attribute.has_restriction() {
                check_restrictions(
                    &attribute.restrictions,
                    attribute.type_,
                    logical_text(&text, self.settings),
                    self.settings,
                )
                .map_err(|e| e.at_path(&format!("{}/@{}", path, attribute.name)))?;
            }

            out.push_str(&format!(" {}=\"{}\"", attribute.name, escape_text(&text)));
        }
        Ok(())
    }
}
