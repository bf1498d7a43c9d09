//! HTML Fragments
//!
//! A small, forgiving parser for the markup that pages and components inject
//! into the document, plus the matching serializer.
//!
//! # Supported Markup
//!
//! - Elements with quoted, unquoted or bare attributes
//! - Self-closing tags and the HTML void elements (`br`, `img`, `input`, ...)
//! - Comments and doctype declarations (dropped)
//! - Named and numeric character references, decoded with `html-escape`
//!
//! Stray closing tags are ignored, and unclosed elements are closed at the
//! end of the fragment. Whitespace-only text is kept as text nodes, the same
//! way a browser keeps it.

use indexmap::IndexMap;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// A parsed node, before it is inserted into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        children: Vec<Fragment>,
    },
    Text(String),
}

/// An element that is still open while parsing.
struct OpenElement {
    tag: String,
    attributes: IndexMap<String, String>,
    children: Vec<Fragment>,
}

impl OpenElement {
    fn close(self) -> Fragment {
        Fragment::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// Parse an HTML fragment into a list of top-level nodes.
pub fn parse_fragment(input: &str) -> Vec<Fragment> {
    let mut top: Vec<Fragment> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];

        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            text.push_str(&rest[..end]);
            pos += end;
            continue;
        }

        if rest.starts_with("<!--") {
            flush_text(&mut text, &mut stack, &mut top);
            pos += rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
            continue;
        }

        if rest.starts_with("<!") {
            flush_text(&mut text, &mut stack, &mut top);
            pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            continue;
        }

        if let Some(after) = rest.strip_prefix("</") {
            if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                flush_text(&mut text, &mut stack, &mut top);
                let end = after.find('>').unwrap_or(after.len());
                let name = after[..end].trim().to_ascii_lowercase();
                close_element(&name, &mut stack, &mut top);
                pos += 2 + (end + 1).min(after.len());
                continue;
            }
        }

        match parse_open_tag(rest) {
            Some((tag, consumed)) => {
                flush_text(&mut text, &mut stack, &mut top);
                pos += consumed;
                let open = OpenElement {
                    tag: tag.name,
                    attributes: tag.attributes,
                    children: Vec::new(),
                };
                if tag.self_closing || VOID_ELEMENTS.contains(&open.tag.as_str()) {
                    attach(open.close(), &mut stack, &mut top);
                } else {
                    stack.push(open);
                }
            }
            None => {
                // A lone '<' that does not open a tag is ordinary text.
                text.push('<');
                pos += 1;
            }
        }
    }

    flush_text(&mut text, &mut stack, &mut top);
    while let Some(open) = stack.pop() {
        attach(open.close(), &mut stack, &mut top);
    }

    top
}

struct OpenTag {
    name: String,
    attributes: IndexMap<String, String>,
    self_closing: bool,
}

/// Parse `<name attr=...>` at the start of `input`.
///
/// Returns the tag and the number of bytes consumed, or `None` if `input`
/// does not start with a well-formed opening tag.
fn parse_open_tag(input: &str) -> Option<(OpenTag, usize)> {
    let bytes = input.as_bytes();
    let mut i = 1;
    if !bytes.get(i)?.is_ascii_alphabetic() {
        return None;
    }

    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attributes = IndexMap::new();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => {
                return Some((
                    OpenTag {
                        name,
                        attributes,
                        self_closing: false,
                    },
                    i + 1,
                ));
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some((
                    OpenTag {
                        name,
                        attributes,
                        self_closing: true,
                    },
                    i + 2,
                ));
            }
            b'/' => {
                i += 1;
            }
            _ => {
                let attr_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                let attr_name = input[attr_start..i].to_ascii_lowercase();

                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let mut value = String::new();
                if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    match *bytes.get(i)? {
                        quote @ (b'"' | b'\'') => {
                            let value_start = i + 1;
                            let len = bytes[value_start..].iter().position(|&b| b == quote)?;
                            value = decode_entities(&input[value_start..value_start + len]);
                            i = value_start + len + 1;
                        }
                        _ => {
                            let value_start = i;
                            while i < bytes.len()
                                && !bytes[i].is_ascii_whitespace()
                                && bytes[i] != b'>'
                            {
                                i += 1;
                            }
                            value = decode_entities(&input[value_start..i]);
                        }
                    }
                }
                if !attr_name.is_empty() {
                    attributes.entry(attr_name).or_insert(value);
                }
            }
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn flush_text(text: &mut String, stack: &mut Vec<OpenElement>, top: &mut Vec<Fragment>) {
    if text.is_empty() {
        return;
    }
    let node = Fragment::Text(decode_entities(text));
    text.clear();
    attach(node, stack, top);
}

fn attach(node: Fragment, stack: &mut [OpenElement], top: &mut Vec<Fragment>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn close_element(name: &str, stack: &mut Vec<OpenElement>, top: &mut Vec<Fragment>) {
    let Some(index) = stack.iter().rposition(|open| open.tag == name) else {
        return;
    };
    while stack.len() > index {
        if let Some(open) = stack.pop() {
            attach(open.close(), stack, top);
        }
    }
}

/// Decode named and numeric character references.
pub fn decode_entities(input: &str) -> String {
    html_escape::decode_html_entities(input).into_owned()
}

/// Escape text content for serialization.
pub fn escape_text(input: &str) -> String {
    html_escape::encode_text(input).into_owned()
}

/// Escape an attribute value for serialization inside double quotes.
pub fn escape_attribute(input: &str) -> String {
    html_escape::encode_double_quoted_attribute(input).into_owned()
}

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, children: Vec<Fragment>) -> Fragment {
        Fragment::Element {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            children,
        }
    }

    fn text(s: &str) -> Fragment {
        Fragment::Text(s.to_string())
    }

    #[test]
    fn parses_nested_elements_and_text() {
        let nodes = parse_fragment("<p>Count is <strong>{{counter.value}}</strong></p>");
        assert_eq!(
            nodes,
            vec![element(
                "p",
                vec![
                    text("Count is "),
                    element("strong", vec![text("{{counter.value}}")]),
                ]
            )]
        );
    }

    #[test]
    fn parses_attributes_in_all_forms() {
        let nodes = parse_fragment(r#"<div data-component="Counter" id='c' hidden class=big></div>"#);
        let Fragment::Element { attributes, .. } = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(attributes.get("data-component").map(String::as_str), Some("Counter"));
        assert_eq!(attributes.get("id").map(String::as_str), Some("c"));
        assert_eq!(attributes.get("hidden").map(String::as_str), Some(""));
        assert_eq!(attributes.get("class").map(String::as_str), Some("big"));
    }

    #[test]
    fn void_and_self_closing_elements_have_no_children() {
        let nodes = parse_fragment("<br><img src=a.png/><span/>after");
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[3], text("after"));
    }

    #[test]
    fn unclosed_and_stray_tags_are_tolerated() {
        let nodes = parse_fragment("<div><p>open</em></div>tail");
        assert_eq!(
            nodes,
            vec![element("div", vec![element("p", vec![text("open")])]), text("tail")]
        );
    }

    #[test]
    fn comments_are_dropped_and_entities_decoded() {
        let nodes = parse_fragment("<!-- note --><p>a &amp; b &lt; c</p>");
        assert_eq!(nodes, vec![element("p", vec![text("a & b < c")])]);
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse_fragment("1 < 2");
        assert_eq!(nodes, vec![text("1 < 2")]);
    }

    #[test]
    fn named_and_numeric_references_decode() {
        assert_eq!(decode_entities("&copy; &#169; &#x41; &mdash;"), "\u{a9} \u{a9} A \u{2014}");
        assert_eq!(decode_entities("AT&T"), "AT&T");
    }

    #[test]
    fn escaping_round_trips_through_the_parser() {
        let markup = format!(
            "<p title=\"{}\">{}</p>",
            escape_attribute("a\"b"),
            escape_text("1 < 2 & 3")
        );
        let nodes = parse_fragment(&markup);
        let Fragment::Element { attributes, children, .. } = &nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(attributes.get("title").map(String::as_str), Some("a\"b"));
        assert_eq!(children, &vec![text("1 < 2 & 3")]);
    }
}
