//! Lexer for XML documents using logos
//!
//! Markup is lexed in two modes: [`ContentToken`] between tags and
//! [`TagToken`] inside a tag. The reader morphs between them at `<` and `>`.

use logos::Logos;

/// Tokens between tags
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentToken {
    #[regex(r"<\?([^?]|\?+[^?>])*\?+>")]
    ProcessingInstruction,

    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    #[regex(r"<!\[CDATA\[([^\]]|\][^\]]|\]\]+[^\]>])*\]\]+>")]
    CData,

    #[regex(r"<![A-Za-z][^>]*>")]
    Doctype,

    #[token("</")]
    CloseTagStart,

    #[token("<")]
    TagStart,

    #[regex(r"[^<]+")]
    Text,
}

/// Tokens inside `<...>`
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TagToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_.:\-]*")]
    Name,

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#)]
    #[regex(r"'[^']*'")]
    Value,

    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,
}

/// Decode the predefined entities and character references
pub fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('&') {
        return Some(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let end = rest[start..].find(';')? + start;
        let entity = &rest[start + 1..end];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()?
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse().ok()?
                } else {
                    return None;
                };
                char::from_u32(code)?
            }
        };
        out.push(decoded);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_tokens() {
        let tokens: Vec<_> = ContentToken::lexer("<?xml version=\"1.0\"?><!-- c -->text</")
            .filter_map(|t| t.ok())
            .collect();
        assert_eq!(
            tokens,
            vec![
                ContentToken::ProcessingInstruction,
                ContentToken::Comment,
                ContentToken::Text,
                ContentToken::CloseTagStart,
            ]
        );
    }

    #[test]
    fn test_tag_tokens() {
        let tokens: Vec<_> = TagToken::lexer("SCL xmlns:x='urn:x' a=\"1\" />")
            .filter_map(|t| t.ok())
            .collect();
        assert_eq!(
            tokens,
            vec![
                TagToken::Name,
                TagToken::Name,
                TagToken::Eq,
                TagToken::Value,
                TagToken::Name,
                TagToken::Eq,
                TagToken::Value,
                TagToken::SelfClose,
            ]
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a &lt; b &amp;&amp; c").as_deref(), Some("a < b && c"));
        assert_eq!(unescape("&#65;&#x42;").as_deref(), Some("AB"));
        assert_eq!(unescape("&bogus;"), None);
        assert_eq!(unescape("dangling &amp"), None);
    }
}
