use crate::tree::{Attribute, Document, NodeData, NodeId};
use std::fmt::Write;

/// Serializer converts a document tree back to XML
///
/// Output is compact: no indentation is added and text nodes are written
/// exactly as stored. With `sort_attributes` enabled attributes are emitted
/// ordered by qualified name, which gives a canonical form for comparing trees
/// whose attributes were removed and re-added.
pub struct Serializer {
    sort_attributes: bool,
    declaration: bool,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            sort_attributes: false,
            declaration: false,
        }
    }

    pub fn sort_attributes(mut self, sort: bool) -> Self {
        self.sort_attributes = sort;
        self
    }

    /// Prefix output with `<?xml version="1.0" encoding="UTF-8"?>`
    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    pub fn serialize(&self, doc: &Document) -> String {
        let mut output = String::new();
        if self.declaration {
            output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        self.write_node(doc, doc.root(), &mut output);
        output
    }

    /// Serialize a single node and its subtree
    pub fn serialize_node(&self, doc: &Document, id: NodeId) -> String {
        let mut output = String::new();
        self.write_node(doc, id, &mut output);
        output
    }

    fn write_node(&self, doc: &Document, id: NodeId, output: &mut String) {
        let Some(node) = doc.node(id) else {
            return;
        };

        match node.data() {
            NodeData::Document => {
                for child in node.children() {
                    self.write_node(doc, *child, output);
                }
            }
            NodeData::Text(text) => output.push_str(&escape(text, false)),
            NodeData::Element { name, attributes, .. } => {
                output.push('<');
                output.push_str(name);
                self.write_attributes(attributes, output);

                if node.children().is_empty() {
                    output.push_str("/>");
                    return;
                }

                output.push('>');
                for child in node.children() {
                    self.write_node(doc, *child, output);
                }
                let _ = write!(output, "</{}>", name);
            }
        }
    }

    fn write_attributes(&self, attributes: &[Attribute], output: &mut String) {
        let mut attributes: Vec<(String, &str)> = attributes
            .iter()
            .map(|a| (a.qualified_name(), a.value.as_str()))
            .collect();
        if self.sort_attributes {
            attributes.sort();
        }
        for (name, value) in attributes {
            let _ = write!(output, " {}=\"{}\"", name, escape(value, true));
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a document with default settings
pub fn serialize(doc: &Document) -> String {
    Serializer::new().serialize(doc)
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
