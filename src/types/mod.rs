//! Primitive types and restriction facets
//!
//! `builtins` converts primitive values to and from their lexical form;
//! `facets` checks restriction facets against lexical values.

pub mod builtins;
pub mod facets;

pub use builtins::{from_lexical, to_lexical, TypeFamily, XsdType};
pub use facets::{check_restrictions, Facet, Literal, Restriction};
