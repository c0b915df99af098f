//! Rules deciding which elements and attributes are dropped.

use std::collections::HashSet;

use crate::Options;
use crate::ast::QName;

/// Namespace URIs written by vector editors for their own bookkeeping.
pub const EDITOR_NAMESPACES: &[&str] = &[
    "http://www.inkscape.org/namespaces/inkscape",
    "http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd",
    "http://ns.adobe.com/AdobeIllustrator/10.0/",
    "http://ns.adobe.com/Graphs/1.0/",
    "http://ns.adobe.com/AdobeSVGViewerExtensions/3.0/",
    "http://ns.adobe.com/Variables/1.0/",
    "http://ns.adobe.com/SaveForWeb/1.0/",
    "http://ns.adobe.com/Extensibility/1.0/",
    "http://ns.adobe.com/Flows/1.0/",
    "http://ns.adobe.com/ImageReplacement/1.0/",
    "http://ns.adobe.com/GenericCustomNamespace/1.0/",
    "http://ns.adobe.com/XPath/1.0/",
];

/// Elements whose `id` attribute is eligible for removal.
pub const DRAWING_ELEMENTS: &[&str] = &["g", "circle", "path", "polygon", "polyline", "rect", "text"];

/// Direction of the prefix test between an `id` value and the excluded id list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdMatch {
    /// Drop the id when it starts with an excluded prefix (`path1234` matches `path`).
    #[default]
    ValueStartsWithPrefix,
    /// Drop the id when an excluded entry starts with it (`pa` matches `path`).
    PrefixStartsWithValue,
}

/// Whether `name` is a drawing element.
pub fn is_drawing_element(name: &str) -> bool {
    DRAWING_ELEMENTS.contains(&name)
}

/// Whether `uri` names a known editor namespace.
pub fn is_editor_namespace(uri: &str) -> bool {
    EDITOR_NAMESPACES.contains(&uri)
}

/// The configured exclusion rules. Built once before a pass and never mutated.
///
/// Namespace prefixes detected while reading a document live in the pass,
/// not here, so one policy can serve any number of passes.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    excluded_tags: HashSet<String>,
    excluded_prefixes: HashSet<String>,
    excluded_ids: Vec<String>,
    id_match: IdMatch,
    remove_metadata: bool,
    detect_editor_namespaces: bool,
}

impl ExclusionPolicy {
    pub fn new(options: &Options) -> Self {
        Self {
            excluded_tags: options.excluded_tags.iter().cloned().collect(),
            excluded_prefixes: options.excluded_namespaces.iter().cloned().collect(),
            excluded_ids: options.excluded_ids.clone(),
            id_match: options.id_match,
            remove_metadata: !options.keep_metadata,
            detect_editor_namespaces: !options.keep_editor_data,
        }
    }

    /// Whether an element is dropped because of its local name.
    pub fn is_tag_excluded(&self, local: &str) -> bool {
        self.excluded_tags.contains(local) || (self.remove_metadata && local == "metadata")
    }

    /// Whether a configured namespace prefix excludes `prefix`.
    ///
    /// The empty prefix is never excluded.
    pub fn is_prefix_excluded(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.excluded_prefixes.contains(prefix)
    }

    /// Whether the root element should be scanned for editor namespace declarations.
    pub fn detects_editor_namespaces(&self) -> bool {
        self.detect_editor_namespaces
    }

    /// Whether the `id` attribute with `value` on element `tag` is dropped.
    pub fn is_id_excluded(&self, tag: &QName, value: &str) -> bool {
        if value.is_empty() || !is_drawing_element(&tag.full_name()) {
            return false;
        }
        self.excluded_ids.iter().any(|prefix| match self.id_match {
            IdMatch::ValueStartsWithPrefix => value.starts_with(prefix.as_str()),
            IdMatch::PrefixStartsWithValue => prefix.starts_with(value),
        })
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new(&Options::default())
    }
}
