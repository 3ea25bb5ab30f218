//! # Quire DOM
//!
//! Arena-backed XML document tree edited by the Quire editor core, plus the
//! reader and serializer used to move documents in and out of memory.
//!
//! ```rust,ignore
//! use quire_dom::{parse, serialize};
//!
//! let doc = parse(r#"<Parent><Element a="1"/></Parent>"#)?;
//! let element = doc.elements_by_name("Element").next().unwrap();
//! assert_eq!(doc.attribute(element, "a"), Some("1"));
//! assert_eq!(serialize(&doc), r#"<Parent><Element a="1"/></Parent>"#);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod tree;

pub use error::{DomError, ParseError, ParseResult};
pub use parser::parse;
pub use serializer::{serialize, Serializer};
pub use tree::{
    split_qualified_name, Attribute, Document, Node, NodeData, NodeId, TextReplacement,
    XMLNS_NAMESPACE, XML_NAMESPACE,
};
