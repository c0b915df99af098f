//! The streaming filter.
//!
//! Every event read from the input is either dropped or re-emitted, possibly
//! with rewritten attributes. No tree is built: a stack with one entry per
//! open element records whether that element is being suppressed, and
//! suppression of an element extends to everything nested inside it.

use std::collections::HashSet;
use std::io::{BufRead, Write};

use tracing::{debug, trace};

use crate::ast::*;
use crate::error::SvgMinError;
use crate::parse::EventReader;
use crate::policy::{ExclusionPolicy, is_editor_namespace};
use crate::serialize::EventWriter;
use crate::style::merge_style;

/// Counters collected over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Elements read from the input
    pub elements: usize,
    /// Elements suppressed, including descendants of suppressed elements
    pub dropped_elements: usize,
    /// Attributes removed from emitted elements
    pub dropped_attributes: usize,
}

/// One filtering pass over one document.
pub struct Minifier<'p> {
    policy: &'p ExclusionPolicy,
    convert_style: bool,
    /// Suppression state per open element, on top of a `false` sentinel.
    skip_stack: Vec<bool>,
    /// Prefixes bound to editor namespaces on the root element.
    editor_prefixes: HashSet<String>,
    seen_root: bool,
    stats: FilterStats,
}

impl<'p> Minifier<'p> {
    pub fn new(policy: &'p ExclusionPolicy, convert_style: bool) -> Self {
        Self {
            policy,
            convert_style,
            skip_stack: vec![false],
            editor_prefixes: HashSet::new(),
            seen_root: false,
            stats: FilterStats::default(),
        }
    }

    /// Pump every event from `reader` through the filter into `writer`.
    pub fn run<R: BufRead, W: Write>(
        mut self,
        reader: &mut EventReader<R>,
        writer: &mut EventWriter<W>,
    ) -> Result<FilterStats, SvgMinError> {
        while let Some(event) = reader.next_event()? {
            if let Some(event) = self.process(event)? {
                writer.write(event)?;
            }
        }

        debug!(
            elements = self.stats.elements,
            dropped_elements = self.stats.dropped_elements,
            dropped_attributes = self.stats.dropped_attributes,
            "minification pass finished"
        );
        Ok(self.stats)
    }

    /// Filter a single event, returning the event to emit, if any.
    pub fn process(&mut self, event: XmlEvent) -> Result<Option<XmlEvent>, SvgMinError> {
        match event {
            XmlEvent::StartDocument { .. } | XmlEvent::ProcessingInstruction { .. } => {
                Ok(Some(event))
            }
            XmlEvent::EndDocument => {
                let open = self.skip_stack.len() - 1;
                if open > 0 {
                    return Err(SvgMinError::Unbalanced(format!(
                        "{} element(s) still open at end of input",
                        open
                    )));
                }
                Ok(Some(event))
            }
            XmlEvent::StartElement { name, attributes } => {
                Ok(self.start_element(name, attributes))
            }
            XmlEvent::EndElement { name } => {
                let Some(skipped) = self.pop_open_element() else {
                    return Err(SvgMinError::Unbalanced(format!(
                        "unexpected end tag </{}>",
                        name.full_name()
                    )));
                };
                Ok((!skipped).then_some(XmlEvent::EndElement { name }))
            }
            XmlEvent::Characters { .. } => Ok((!self.is_skipping()).then_some(event)),
            XmlEvent::Other => Ok(None),
        }
    }

    /// Counters collected so far.
    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    fn start_element(&mut self, name: QName, mut attributes: AttributeSet) -> Option<XmlEvent> {
        self.stats.elements += 1;

        if self.is_skipping() {
            self.skip_stack.push(true);
            self.stats.dropped_elements += 1;
            return None;
        }

        if !self.seen_root {
            self.seen_root = true;
            if name.local == "svg" && self.policy.detects_editor_namespaces() {
                self.detect_editor_namespaces(&attributes);
            }
        }

        let before = attributes.len();
        attributes.retain(|attr| !self.is_attribute_excluded(&attr.name));
        self.stats.dropped_attributes += before - attributes.len();

        let skip =
            self.is_prefix_excluded(name.prefix_str()) || self.policy.is_tag_excluded(&name.local);
        self.skip_stack.push(skip);
        if skip {
            trace!(element = %name.full_name(), "dropping element");
            self.stats.dropped_elements += 1;
            return None;
        }

        if self.convert_style {
            attributes = merge_style(attributes);
        }

        let before = attributes.len();
        attributes.retain(|attr| {
            if self.is_prefix_excluded(attr.name.prefix_str()) {
                return false;
            }
            if attr.name.matches("id") && self.policy.is_id_excluded(&name, &attr.value) {
                trace!(element = %name.full_name(), id = %attr.value, "dropping id");
                return false;
            }
            true
        });
        self.stats.dropped_attributes += before - attributes.len();

        Some(XmlEvent::StartElement { name, attributes })
    }

    fn detect_editor_namespaces(&mut self, attributes: &AttributeSet) {
        for (prefix, uri) in attributes.namespace_declarations() {
            if is_editor_namespace(uri) && self.editor_prefixes.insert(prefix.to_string()) {
                debug!(prefix, uri, "detected editor namespace");
            }
        }
    }

    /// Pop the innermost open element. The sentinel is never popped.
    fn pop_open_element(&mut self) -> Option<bool> {
        if self.skip_stack.len() > 1 {
            self.skip_stack.pop()
        } else {
            None
        }
    }

    fn is_skipping(&self) -> bool {
        self.skip_stack.last().copied().unwrap_or(false)
    }

    fn is_prefix_excluded(&self, prefix: &str) -> bool {
        self.policy.is_prefix_excluded(prefix)
            || (!prefix.is_empty() && self.editor_prefixes.contains(prefix))
    }

    /// An attribute in an excluded namespace, or the declaration binding one.
    fn is_attribute_excluded(&self, name: &QName) -> bool {
        self.is_prefix_excluded(name.prefix_str())
            || (name.prefix.as_deref() == Some("xmlns") && self.is_prefix_excluded(&name.local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;

    fn start(name: &str, attrs: &[(&str, &str)]) -> XmlEvent {
        XmlEvent::StartElement {
            name: QName::parse(name),
            attributes: attrs.iter().map(|(k, v)| Attribute::new(k, *v)).collect(),
        }
    }

    fn end(name: &str) -> XmlEvent {
        XmlEvent::EndElement {
            name: QName::parse(name),
        }
    }

    fn text(s: &str) -> XmlEvent {
        XmlEvent::Characters {
            text: s.into(),
            cdata: false,
        }
    }

    fn emitted_attrs(event: Option<XmlEvent>) -> AttributeSet {
        match event {
            Some(XmlEvent::StartElement { attributes, .. }) => attributes,
            other => panic!("Expected start element, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_suppression() {
        let policy = ExclusionPolicy::new(&Options {
            keep_metadata: false,
            ..Options::default()
        });
        let mut minifier = Minifier::new(&policy, true);

        assert!(minifier.process(start("svg", &[])).unwrap().is_some());
        assert!(minifier.process(start("metadata", &[])).unwrap().is_none());
        assert!(minifier.process(start("rdf:RDF", &[])).unwrap().is_none());
        assert!(minifier.process(start("title", &[])).unwrap().is_none());
        assert!(minifier.process(text("hidden")).unwrap().is_none());
        assert!(minifier.process(end("title")).unwrap().is_none());
        assert!(minifier.process(end("rdf:RDF")).unwrap().is_none());
        assert!(minifier.process(end("metadata")).unwrap().is_none());
        assert!(minifier.process(text("visible")).unwrap().is_some());
        assert!(minifier.process(end("svg")).unwrap().is_some());
        assert!(minifier.process(XmlEvent::EndDocument).unwrap().is_some());

        let stats = minifier.stats();
        assert_eq!(stats.elements, 4);
        assert_eq!(stats.dropped_elements, 3);
    }

    #[test]
    fn test_processing_instructions_always_pass() {
        let policy = ExclusionPolicy::new(&Options::default().remove_tag("defs"));
        let mut minifier = Minifier::new(&policy, true);
        minifier.process(start("svg", &[])).unwrap();
        minifier.process(start("defs", &[])).unwrap();
        let pi = XmlEvent::ProcessingInstruction {
            target: "foo".into(),
            data: None,
        };
        assert_eq!(minifier.process(pi.clone()).unwrap(), Some(pi));
    }

    #[test]
    fn test_editor_namespace_detection() {
        let policy = ExclusionPolicy::default();
        let mut minifier = Minifier::new(&policy, true);

        let attrs = emitted_attrs(
            minifier
                .process(start(
                    "svg",
                    &[
                        ("xmlns", "http://www.w3.org/2000/svg"),
                        ("xmlns:inkscape", "http://www.inkscape.org/namespaces/inkscape"),
                        ("inkscape:version", "1.0"),
                        ("width", "10"),
                    ],
                ))
                .unwrap(),
        );
        assert!(!attrs.contains("xmlns:inkscape"));
        assert!(!attrs.contains("inkscape:version"));
        assert!(attrs.contains("xmlns"));
        assert!(attrs.contains("width"));

        let attrs = emitted_attrs(
            minifier
                .process(start("g", &[("inkscape:label", "Layer 1"), ("id", "layer1")]))
                .unwrap(),
        );
        assert!(!attrs.contains("inkscape:label"));
        assert!(attrs.contains("id"));

        assert!(minifier.process(start("inkscape:grid", &[])).unwrap().is_none());
    }

    #[test]
    fn test_editor_data_kept_when_requested() {
        let policy = ExclusionPolicy::new(&Options {
            keep_editor_data: true,
            ..Options::default()
        });
        let mut minifier = Minifier::new(&policy, true);
        let attrs = emitted_attrs(
            minifier
                .process(start(
                    "svg",
                    &[
                        ("xmlns:inkscape", "http://www.inkscape.org/namespaces/inkscape"),
                        ("inkscape:version", "1.0"),
                    ],
                ))
                .unwrap(),
        );
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_detection_only_on_root() {
        let policy = ExclusionPolicy::default();
        let mut minifier = Minifier::new(&policy, true);
        minifier.process(start("svg", &[])).unwrap();
        let attrs = emitted_attrs(
            minifier
                .process(start(
                    "svg",
                    &[
                        ("xmlns:inkscape", "http://www.inkscape.org/namespaces/inkscape"),
                        ("inkscape:label", "x"),
                    ],
                ))
                .unwrap(),
        );
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_configured_namespace_exclusion() {
        let policy = ExclusionPolicy::new(&Options::default().remove_namespace("dc"));
        let mut minifier = Minifier::new(&policy, true);
        let attrs = emitted_attrs(
            minifier
                .process(start(
                    "svg",
                    &[("xmlns:dc", "http://purl.org/dc/elements/1.1/"), ("dc:x", "1")],
                ))
                .unwrap(),
        );
        assert!(attrs.is_empty());
        assert!(minifier.process(start("dc:title", &[])).unwrap().is_none());
    }

    #[test]
    fn test_style_conversion_toggle() {
        let policy = ExclusionPolicy::default();

        let mut minifier = Minifier::new(&policy, true);
        let attrs = emitted_attrs(minifier.process(start("rect", &[("style", "fill:red")])).unwrap());
        assert_eq!(attrs.get("fill"), Some("red"));
        assert!(!attrs.contains("style"));

        let mut minifier = Minifier::new(&policy, false);
        let attrs = emitted_attrs(minifier.process(start("rect", &[("style", "fill:red")])).unwrap());
        assert_eq!(attrs.get("style"), Some("fill:red"));
        assert!(!attrs.contains("fill"));
    }

    #[test]
    fn test_id_filtering() {
        let policy = ExclusionPolicy::default();
        let mut minifier = Minifier::new(&policy, true);
        minifier.process(start("svg", &[("id", "svg2")])).unwrap();

        let attrs = emitted_attrs(minifier.process(start("path", &[("id", "path1234"), ("d", "M0 0")])).unwrap());
        assert!(!attrs.contains("id"));
        assert!(attrs.contains("d"));

        let attrs = emitted_attrs(minifier.process(start("rect", &[("id", "myRect")])).unwrap());
        assert_eq!(attrs.get("id"), Some("myRect"));

        let attrs = emitted_attrs(minifier.process(start("linearGradient", &[("id", "path5")])).unwrap());
        assert_eq!(attrs.get("id"), Some("path5"));
    }

    #[test]
    fn test_unbalanced_end_tag() {
        let policy = ExclusionPolicy::default();
        let mut minifier = Minifier::new(&policy, true);
        assert!(matches!(
            minifier.process(end("svg")),
            Err(SvgMinError::Unbalanced(_))
        ));
    }

    #[test]
    fn test_extra_end_tag_keeps_sentinel() {
        let policy = ExclusionPolicy::default();
        let mut minifier = Minifier::new(&policy, true);
        minifier.process(start("svg", &[])).unwrap();
        assert!(minifier.process(end("svg")).unwrap().is_some());
        assert!(matches!(
            minifier.process(end("svg")),
            Err(SvgMinError::Unbalanced(_))
        ));
        assert_eq!(minifier.skip_stack, vec![false]);
        assert!(minifier.process(XmlEvent::EndDocument).is_ok());
    }

    #[test]
    fn test_unclosed_element_at_end() {
        let policy = ExclusionPolicy::default();
        let mut minifier = Minifier::new(&policy, true);
        minifier.process(start("svg", &[])).unwrap();
        assert!(matches!(
            minifier.process(XmlEvent::EndDocument),
            Err(SvgMinError::Unbalanced(_))
        ));
    }

    #[test]
    fn test_other_events_dropped() {
        let policy = ExclusionPolicy::default();
        let mut minifier = Minifier::new(&policy, true);
        assert_eq!(minifier.process(XmlEvent::Other).unwrap(), None);
    }
}
