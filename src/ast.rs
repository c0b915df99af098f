//! Names, attributes, and the XML event vocabulary shared by the reader,
//! the filter, and the writer.

/// A qualified name (possibly with namespace prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace prefix (e.g., "inkscape", "xlink")
    pub prefix: Option<String>,
    /// Local name (e.g., "version", "href")
    pub local: String,
}

impl QName {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    /// Parse a qualified name from a string like "prefix:local" or just "local".
    ///
    /// No namespace resolution happens here: the prefix is kept as a literal string.
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => Self::with_prefix(prefix, local),
            _ => Self::new(s),
        }
    }

    /// The prefix, or `""` when there is none.
    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// Check if this is a namespace declaration (xmlns or xmlns:prefix).
    pub fn is_xmlns(&self) -> bool {
        self.prefix.as_deref() == Some("xmlns") || (self.prefix.is_none() && self.local == "xmlns")
    }

    /// Get the full name as a string.
    pub fn full_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.clone(),
        }
    }

    /// Compare against a qualified name string without allocating.
    pub fn matches(&self, qualified: &str) -> bool {
        match &self.prefix {
            Some(p) => qualified
                .strip_prefix(p.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .is_some_and(|local| local == self.local),
            None => self.local == qualified,
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    /// Create an attribute, splitting `name` into prefix and local part.
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: QName::parse(name),
            value: value.into(),
        }
    }
}

/// The ordered attributes of one element.
///
/// Order is only kept so output is deterministic. Lookup is by qualified name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    attrs: Vec<Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Check whether an attribute with the given qualified name exists.
    pub fn contains(&self, qualified: &str) -> bool {
        self.attrs.iter().any(|a| a.name.matches(qualified))
    }

    /// Get an attribute value by qualified name.
    pub fn get(&self, qualified: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.matches(qualified))
            .map(|a| a.value.as_str())
    }

    /// Append an attribute. Callers are responsible for uniqueness.
    pub fn push(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    /// Remove every attribute with the given qualified name, returning the first value.
    pub fn remove(&mut self, qualified: &str) -> Option<String> {
        let index = self.attrs.iter().position(|a| a.name.matches(qualified))?;
        let removed = self.attrs.remove(index);
        self.attrs.retain(|a| !a.name.matches(qualified));
        Some(removed.value)
    }

    /// Keep only the attributes matching the predicate.
    pub fn retain(&mut self, f: impl FnMut(&Attribute) -> bool) {
        self.attrs.retain(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    /// Get all `xmlns:prefix` declarations as `(prefix, uri)` pairs.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs
            .iter()
            .filter(|a| a.name.prefix.as_deref() == Some("xmlns"))
            .map(|a| (a.name.local.as_str(), a.value.as_str()))
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self {
            attrs: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AttributeSet {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

/// One event of a streamed XML document.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    /// The XML declaration (`<?xml version="1.0"?>`)
    StartDocument {
        version: String,
        encoding: Option<String>,
        standalone: Option<bool>,
    },
    /// End of input
    EndDocument,
    /// An element start tag. Self-closing tags are reported as a start followed by an end.
    StartElement {
        name: QName,
        attributes: AttributeSet,
    },
    /// An element end tag
    EndElement { name: QName },
    /// Character data, either plain text or a CDATA section
    Characters { text: String, cdata: bool },
    /// A processing instruction (e.g., `<?xml-stylesheet ... ?>`)
    ProcessingInstruction { target: String, data: Option<String> },
    /// Comments, DOCTYPE, and anything else the filter does not forward
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_parse() {
        let name = QName::parse("inkscape:version");
        assert_eq!(name.prefix.as_deref(), Some("inkscape"));
        assert_eq!(name.local, "version");
        assert_eq!(name.full_name(), "inkscape:version");

        let name = QName::parse("fill");
        assert_eq!(name.prefix, None);
        assert_eq!(name.prefix_str(), "");
    }

    #[test]
    fn test_qname_matches() {
        assert!(QName::parse("xlink:href").matches("xlink:href"));
        assert!(!QName::parse("xlink:href").matches("href"));
        assert!(!QName::parse("href").matches("xlink:href"));
        assert!(QName::parse("id").matches("id"));
    }

    #[test]
    fn test_attribute_set_lookup() {
        let mut attrs: AttributeSet = [
            Attribute::new("id", "path1"),
            Attribute::new("xmlns:inkscape", "http://www.inkscape.org/namespaces/inkscape"),
            Attribute::new("style", "fill:red"),
        ]
        .into_iter()
        .collect();

        assert!(attrs.contains("style"));
        assert_eq!(attrs.get("id"), Some("path1"));
        assert_eq!(attrs.namespace_declarations().count(), 1);

        assert_eq!(attrs.remove("style").as_deref(), Some("fill:red"));
        assert!(!attrs.contains("style"));
        assert_eq!(attrs.len(), 2);
    }
}
