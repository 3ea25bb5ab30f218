use crate::error::{ParseError, ParseResult};
use crate::lexer::{unescape, ContentToken, TagToken};
use crate::tree::{split_qualified_name, Document, NodeId, XMLNS_NAMESPACE, XML_NAMESPACE};
use logos::{Lexer, Logos};
use std::collections::HashMap;

/// Parse XML source into a [`Document`]
pub fn parse(source: &str) -> ParseResult<Document> {
    Reader::new().read(source)
}

struct OpenElement {
    id: NodeId,
    name: String,
}

/// Recursive-descent XML reader
struct Reader {
    doc: Document,
    open: Vec<OpenElement>,
    scopes: Vec<HashMap<Option<String>, String>>,
}

impl Reader {
    fn new() -> Self {
        let mut builtin = HashMap::new();
        builtin.insert(Some("xml".to_string()), XML_NAMESPACE.to_string());
        builtin.insert(Some("xmlns".to_string()), XMLNS_NAMESPACE.to_string());
        Self {
            doc: Document::new(),
            open: Vec::new(),
            scopes: vec![builtin],
        }
    }

    fn read(mut self, source: &str) -> ParseResult<Document> {
        let mut content = ContentToken::lexer(source);

        while let Some(token) = content.next() {
            let pos = content.span().start;
            let token = token.map_err(|_| ParseError::lexer_error(pos))?;

            match token {
                ContentToken::ProcessingInstruction
                | ContentToken::Comment
                | ContentToken::Doctype => {}
                ContentToken::CData => {
                    let slice = content.slice();
                    let text = &slice["<![CDATA[".len()..slice.len() - "]]>".len()];
                    self.text(pos, text.to_string())?;
                }
                ContentToken::Text => {
                    let text = unescape(content.slice())
                        .ok_or_else(|| ParseError::invalid_syntax(pos, "Invalid entity reference"))?;
                    self.text(pos, text)?;
                }
                ContentToken::TagStart => {
                    let mut tag = content.morph::<TagToken>();
                    self.open_tag(&mut tag, pos)?;
                    content = tag.morph();
                }
                ContentToken::CloseTagStart => {
                    let mut tag = content.morph::<TagToken>();
                    self.close_tag(&mut tag, pos)?;
                    content = tag.morph();
                }
            }
        }

        if let Some(unclosed) = self.open.last() {
            return Err(ParseError::unexpected_token(
                source.len(),
                format!("</{}>", unclosed.name),
                "end of input",
            ));
        }
        if self.doc.document_element().is_none() {
            return Err(ParseError::unexpected_eof(source.len()));
        }

        Ok(self.doc)
    }

    fn current_parent(&self) -> NodeId {
        self.open.last().map(|e| e.id).unwrap_or(self.doc.root())
    }

    fn text(&mut self, pos: usize, text: String) -> ParseResult<()> {
        if self.open.is_empty() {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(ParseError::invalid_syntax(pos, "Text outside of the document element"));
        }
        let node = self.doc.create_text(text);
        let parent = self.current_parent();
        self.doc
            .insert_before(parent, node, None)
            .map_err(|e| ParseError::invalid_syntax(pos, e.to_string()))
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<String> {
        let key = prefix.map(str::to_string);
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&key))
            .filter(|uri| !uri.is_empty())
            .cloned()
    }

    fn open_tag(&mut self, tag: &mut Lexer<'_, TagToken>, start: usize) -> ParseResult<()> {
        let name = expect_name(tag)?;

        if self.open.is_empty() && self.doc.document_element().is_some() {
            return Err(ParseError::invalid_syntax(start, "Multiple document elements"));
        }

        let mut raw_attributes: Vec<(String, String)> = Vec::new();
        let self_closing = loop {
            match next_token(tag)? {
                (TagToken::End, _) => break false,
                (TagToken::SelfClose, _) => break true,
                (TagToken::Name, _) => {
                    let attr_name = tag.slice().to_string();
                    expect(tag, TagToken::Eq, "=")?;
                    let (_, pos) = expect(tag, TagToken::Value, "quoted value")?;
                    let quoted = tag.slice();
                    let value = unescape(&quoted[1..quoted.len() - 1])
                        .ok_or_else(|| ParseError::invalid_syntax(pos, "Invalid entity reference"))?;
                    raw_attributes.push((attr_name, value));
                }
                (other, pos) => {
                    return Err(ParseError::unexpected_token(pos, "attribute or >", format!("{:?}", other)));
                }
            }
        };

        // Namespace declarations apply to the element that carries them
        let mut scope = HashMap::new();
        for (attr_name, value) in &raw_attributes {
            if attr_name == "xmlns" {
                scope.insert(None, value.clone());
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                scope.insert(Some(prefix.to_string()), value.clone());
            }
        }
        self.scopes.push(scope);

        let (prefix, _) = split_qualified_name(&name);
        let namespace = self.resolve(prefix);
        let element = self.doc.create_element_ns(namespace, name.clone());

        for (attr_name, value) in &raw_attributes {
            let namespace = if attr_name == "xmlns" {
                Some(XMLNS_NAMESPACE.to_string())
            } else {
                match split_qualified_name(attr_name) {
                    (Some(prefix), _) => self.resolve(Some(prefix)),
                    (None, _) => None,
                }
            };
            self.doc
                .set_attribute_ns(element, namespace.as_deref(), attr_name, Some(value))
                .map_err(|e| ParseError::invalid_syntax(start, e.to_string()))?;
        }

        let parent = self.current_parent();
        self.doc
            .insert_before(parent, element, None)
            .map_err(|e| ParseError::invalid_syntax(start, e.to_string()))?;

        if self_closing {
            self.scopes.pop();
        } else {
            self.open.push(OpenElement { id: element, name });
        }
        Ok(())
    }

    fn close_tag(&mut self, tag: &mut Lexer<'_, TagToken>, start: usize) -> ParseResult<()> {
        let name = expect_name(tag)?;
        expect(tag, TagToken::End, ">")?;

        let open = self
            .open
            .pop()
            .ok_or_else(|| ParseError::invalid_syntax(start, format!("Unexpected closing tag </{}>", name)))?;
        if open.name != name {
            return Err(ParseError::MismatchedTag {
                pos: start,
                expected: open.name,
                found: name,
            });
        }
        self.scopes.pop();
        Ok(())
    }
}

fn next_token(tag: &mut Lexer<'_, TagToken>) -> ParseResult<(TagToken, usize)> {
    match tag.next() {
        Some(Ok(token)) => Ok((token, tag.span().start)),
        Some(Err(_)) => Err(ParseError::lexer_error(tag.span().start)),
        None => Err(ParseError::unexpected_eof(tag.span().end)),
    }
}

fn expect(tag: &mut Lexer<'_, TagToken>, expected: TagToken, description: &str) -> ParseResult<(TagToken, usize)> {
    let (token, pos) = next_token(tag)?;
    if token != expected {
        return Err(ParseError::unexpected_token(pos, description, format!("{:?}", token)));
    }
    Ok((token, pos))
}

fn expect_name(tag: &mut Lexer<'_, TagToken>) -> ParseResult<String> {
    expect(tag, TagToken::Name, "name")?;
    Ok(tag.slice().to_string())
}
