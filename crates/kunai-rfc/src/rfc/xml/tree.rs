//! Minimal element tree for response payloads.
//!
//! Exchange and WebDAV responses are small and deeply nested, so they are
//! read into a tree keyed by local names and then walked by the
//! format-specific decoders. Namespace prefixes are dropped.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::error::{ParseError, ParseResult};

/// One XML element with its attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name without prefix.
    pub name: String,
    /// Attributes as (local name, value) pairs.
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data directly inside this element.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// First direct child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct child with the given local name, or a missing-element error.
    ///
    /// ## Errors
    /// Returns `ParseError` when no such child exists.
    pub fn require(&self, name: &str) -> ParseResult<&XmlElement> {
        self.child(name)
            .ok_or_else(|| ParseError::missing_element(name))
    }

    /// All direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follows a path of local names from this element.
    #[must_use]
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names
            .iter()
            .try_fold(self, |element, name| element.child(name))
    }

    /// Depth-first search for the first descendant with the given local name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given local name in document order.
    #[must_use]
    pub fn find_all(&self, name: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }

    /// Attribute value by local name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Trimmed text content.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Parses a complete document and returns its root element.
///
/// ## Errors
/// Returns `ParseError` for malformed or unbalanced XML and for documents
/// without a root element.
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_document(xml: &[u8]) -> ParseResult<XmlElement> {
    // Text is kept untrimmed so entity references keep their surrounding spaces.
    let mut reader = Reader::from_reader(xml);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(open_element(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = open_element(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(ref e)) => {
                let local_name_bytes = e.local_name();
                let local_name = std::str::from_utf8(local_name_bytes.as_ref())?;
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::xml(format!("unbalanced end tag: {local_name}")))?;
                if element.name != local_name {
                    return Err(ParseError::xml(format!(
                        "expected end of {}, found {local_name}",
                        element.name
                    )));
                }
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    let decoded = reader.decoder().decode(e.as_ref())?;
                    top.text.push_str(&decoded);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(std::str::from_utf8(e.as_ref())?);
                }
            }
            Ok(Event::GeneralRef(ref e)) => {
                if let Some(top) = stack.last_mut() {
                    let name = reader.decoder().decode(e.as_ref())?;
                    top.text.push(resolve_entity(&name)?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::xml("unexpected end of document"));
    }
    root.ok_or_else(|| ParseError::missing_element("document root"))
}

fn open_element(e: &BytesStart<'_>) -> ParseResult<XmlElement> {
    let local_name_bytes = e.local_name();
    let name = std::str::from_utf8(local_name_bytes.as_ref())?.to_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes().flatten() {
        let key = std::str::from_utf8(attr.key.as_ref())?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let local = key.rsplit(':').next().unwrap_or(key);
        let value = std::str::from_utf8(&attr.value)?;
        attributes.push((local.to_owned(), value.to_owned()));
    }
    Ok(XmlElement {
        name,
        attributes,
        ..XmlElement::default()
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> ParseResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError::unexpected_element(&element.name));
    }
    *root = Some(element);
    Ok(())
}

fn resolve_entity(name: &str) -> ParseResult<char> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(|code| {
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse().ok(),
            };
            value.and_then(char::from_u32)
        }),
    };
    resolved.ok_or_else(|| ParseError::invalid_value(format!("unknown entity: &{name};")))
}
