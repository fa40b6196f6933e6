//! A small owned XML element tree with resolved namespaces.
//!
//! The decoder needs to look elements up by (namespace, local name) and to
//! hand opaque `<extensions>` subtrees over intact, so the source is first
//! read into this tree and then walked.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use crate::error::GpxError;
use crate::extensions::{split_qualified_name, Namespace};

type Result<T> = std::result::Result<T, GpxError>;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    /// Element name as written, e.g. `gpxtpx:hr`.
    pub name: String,
    /// URI the element name resolves to, `None` for an unbound prefix.
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated character data directly inside this element.
    pub text: String,
}

impl XmlElement {
    pub fn prefix(&self) -> &str {
        split_qualified_name(&self.name).0
    }

    pub fn local_name(&self) -> &str {
        split_qualified_name(&self.name).1
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether this element is `{namespace}local`.
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, local))
    }

    pub fn child(&self, namespace: &str, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(namespace, local))
    }

    /// `xmlns` / `xmlns:prefix` attributes declared on this element.
    pub fn namespace_declarations(&self) -> Vec<Namespace> {
        self.attributes
            .iter()
            .filter_map(|(key, value)| declared_prefix(key).map(|p| Namespace::new(p, value.clone())))
            .collect()
    }
}

/// Prefix declared by an attribute name, `Some("")` for a bare `xmlns`.
fn declared_prefix(attribute: &str) -> Option<&str> {
    if attribute == "xmlns" {
        Some("")
    } else {
        attribute.strip_prefix("xmlns:")
    }
}

/// In-scope namespace bindings while reading one document.
struct NamespaceScope<'a> {
    fallback_default: &'a str,
    frames: Vec<Vec<Namespace>>,
}

impl<'a> NamespaceScope<'a> {
    fn new(fallback_default: &'a str) -> Self {
        Self {
            fallback_default,
            frames: Vec::new(),
        }
    }

    fn resolve(&self, prefix: &str) -> Option<String> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE.to_string());
        }
        let declared = self
            .frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|ns| ns.prefix == prefix)
            .map(|ns| ns.uri.clone());
        match declared {
            Some(uri) => Some(uri),
            None if prefix.is_empty() => Some(self.fallback_default.to_string()),
            None => None,
        }
    }
}

/// Read `xml` into a tree and return its root element, if any.
///
/// Unprefixed elements outside any default namespace declaration resolve to
/// `fallback_default`.
pub fn parse_tree(xml: &str, fallback_default: &str) -> Result<Option<XmlElement>> {
    let mut reader = Reader::from_str(xml);
    let mut scope = NamespaceScope::new(fallback_default);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = open_element(&e, &mut scope)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = open_element(&e, &mut scope)?;
                scope.frames.pop();
                attach(element, &mut stack, &mut root);
            }
            Ok(Event::End(_)) => {
                scope.frames.pop();
                if let Some(element) = stack.pop() {
                    attach(element, &mut stack, &mut root);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(std::str::from_utf8(&e).unwrap_or_default());
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(std::str::from_utf8(&e).unwrap_or_default());
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let (Some(current), Some(ch)) = (stack.last_mut(), resolve_reference(&e)) {
                    current.text.push(ch);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::Xml(e)),
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(GpxError::UnexpectedEof { element: open.name });
    }

    Ok(root)
}

/// Build an element from its start tag and push its namespace frame.
fn open_element(start: &BytesStart<'_>, scope: &mut NamespaceScope<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .unwrap_or_default()
        .to_string();

    let mut attributes = Vec::new();
    for attr_result in start.attributes() {
        let attr = attr_result?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .unwrap_or_default()
            .to_string();
        let raw = std::str::from_utf8(&attr.value).unwrap_or_default();
        let value = quick_xml::escape::unescape(raw)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        attributes.push((key, value));
    }

    let mut element = XmlElement {
        name,
        attributes,
        ..Default::default()
    };
    scope.frames.push(element.namespace_declarations());
    element.namespace = scope.resolve(element.prefix());
    Ok(element)
}

fn attach(element: XmlElement, stack: &mut [XmlElement], root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Resolve a character reference (`&#60;`, `&#x3C;`) or predefined entity.
fn resolve_reference(reference: &BytesRef<'_>) -> Option<char> {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        return Some(ch);
    }
    let name = std::str::from_utf8(reference).ok()?;
    resolve_predefined_entity(name).and_then(|s| s.chars().next())
}
