//! # xsdbind
//!
//! Schema-driven XML binding: encode host object graphs to XML, decode XML
//! back into them, and validate documents, all driven by a hand-parsed subset
//! of XML Schema.
//!
//! ## Features
//!
//! - Tree and divided (reference-based) schema dialects
//! - Bounded fixpoint resolution of forward references
//! - Sequences, choice groups, attributes, simple types and simple content
//! - Generic collections, native arrays and skip-level wrappers
//! - Restriction facets (bounds, lengths, digits, enumeration, pattern)
//! - Validation that walks exactly the decode traversal
//!
//! ## Example
//!
//! ```rust
//! use xsdbind::{Object, Schema, Value};
//!
//! let schema = Schema::parse(r#"
//! <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!   <xs:element name="Person">
//!     <xs:complexType>
//!       <xs:sequence>
//!         <xs:element name="name" type="xs:string"/>
//!         <xs:element name="age" type="xs:int" minOccurs="0"/>
//!       </xs:sequence>
//!     </xs:complexType>
//!   </xs:element>
//! </xs:schema>"#)?;
//!
//! let person = Value::from(Object::new("Person").with("name", "Ann").with("age", 31));
//! let xml = schema.encode(&person)?;
//! assert!(schema.is_valid(&xml));
//! assert_eq!(schema.decode(&xml)?, person);
//! # Ok::<(), xsdbind::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod settings;

// Markup
pub mod lexer;
pub mod tags;

// Schema model and type system
pub mod schema;
pub mod types;

// Host data and I/O
pub mod host;
pub mod loaders;

// Engines
pub mod converters;

// Re-exports for convenience
pub use error::{Error, ErrorKind, ParseError, Result, ValidationError};
pub use host::{to_value, Accessor, DiscardAccessor, DynamicAccessor, Object, Value};
pub use limits::Limits;
pub use loaders::{FileSource, MemorySource, SourceProvider};
pub use schema::{Dialect, Mapping, NodeShape, Occurs, Schema, SchemaAttribute, SchemaElement};
pub use settings::Settings;
pub use types::{Facet, Restriction, XsdType};

/// Version of the xsdbind library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
