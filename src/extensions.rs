use serde::{Deserialize, Serialize};

/// Canonical default namespace of GPX 1.1 documents.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// An `xmlns:prefix="uri"` declaration.
///
/// An empty prefix stands for a default namespace declaration (`xmlns="uri"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// Attribute name carrying this declaration.
    pub fn attribute_name(&self) -> String {
        if self.prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", self.prefix)
        }
    }
}

/// One element of an opaque `<extensions>` payload.
///
/// The tree is carried through decode and encode without being interpreted,
/// so vendor data such as Garmin's `TrackPointExtension` survives a
/// round-trip. Leaf nodes hold their text in `value`; inner nodes hold
/// their child elements in `children`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub prefix: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub namespace: Option<Namespace>,
    #[serde(default)]
    pub children: Vec<Extension>,
}

impl Extension {
    /// Build a node from a possibly prefixed element name such as `gpxtpx:hr`.
    pub fn new(qualified_name: &str) -> Self {
        let (prefix, name) = split_qualified_name(qualified_name);
        Self {
            prefix: prefix.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn leaf(qualified_name: &str, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::new(qualified_name)
        }
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_child(mut self, child: Extension) -> Self {
        self.children.push(child);
        self
    }

    /// `prefix:name`, or just `name` for unprefixed elements.
    pub fn qualified_name(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.prefix, self.name)
        }
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Extension> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Depth-first search for the first node with the given local name.
    pub fn find(&self, name: &str) -> Option<&Extension> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

/// Split `prefix:local` into its parts; unprefixed names get an empty prefix.
pub fn split_qualified_name(qualified: &str) -> (&str, &str) {
    match qualified.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", qualified),
    }
}
