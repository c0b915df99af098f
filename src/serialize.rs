//! Streaming XML output.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::ast::*;
use crate::error::SvgMinError;

/// Writes [`XmlEvent`]s as XML.
///
/// A start tag immediately followed by its end tag is written as a
/// self-closing tag. With `auto_format`, output is indented by two spaces and
/// whitespace-only character data is dropped, except inside an element with
/// `xml:space="preserve"`, whose content is written verbatim.
pub struct EventWriter<W: Write> {
    writer: Writer<W>,
    /// A start tag held back until the next event, and whether it sits in
    /// preserved content.
    pending: Option<(BytesStart<'static>, bool)>,
    /// `xml:space="preserve"` state per open element.
    preserve: Vec<bool>,
    auto_format: bool,
}

impl<W: Write> EventWriter<W> {
    pub fn new(inner: W, auto_format: bool) -> Self {
        let writer = if auto_format {
            Writer::new_with_indent(inner, b' ', 2)
        } else {
            Writer::new(inner)
        };
        Self {
            writer,
            pending: None,
            preserve: Vec::new(),
            auto_format,
        }
    }

    pub fn write(&mut self, event: XmlEvent) -> Result<(), SvgMinError> {
        match event {
            XmlEvent::StartDocument {
                version,
                encoding,
                standalone,
            } => {
                self.flush_pending()?;
                let standalone = standalone.map(|s| if s { "yes" } else { "no" });
                self.writer.write_event(Event::Decl(BytesDecl::new(
                    &version,
                    encoding.as_deref(),
                    standalone,
                )))?;
            }
            XmlEvent::EndDocument => {
                self.flush_pending()?;
                if self.auto_format {
                    self.writer.get_mut().write_all(b"\n")?;
                }
                self.writer.get_mut().flush()?;
            }
            XmlEvent::StartElement { name, attributes } => {
                self.flush_pending()?;
                let inherited = self.is_preserving();
                let preserve = match attributes.get("xml:space") {
                    Some("preserve") => true,
                    Some("default") => false,
                    _ => inherited,
                };
                let mut start = BytesStart::new(name.full_name());
                for attr in &attributes {
                    start.push_attribute((attr.name.full_name().as_str(), attr.value.as_str()));
                }
                self.pending = Some((start, inherited));
                self.preserve.push(preserve);
            }
            XmlEvent::EndElement { name } => {
                let preserve = self.preserve.pop().unwrap_or(false);
                match self.pending.take() {
                    Some((start, inherited)) => {
                        self.hold_indent(inherited)?;
                        self.writer.write_event(Event::Empty(start))?;
                    }
                    None => {
                        self.hold_indent(preserve)?;
                        self.writer
                            .write_event(Event::End(BytesEnd::new(name.full_name())))?;
                    }
                }
            }
            XmlEvent::Characters { text, cdata } => {
                if self.auto_format && !cdata && !self.is_preserving() && text.trim().is_empty() {
                    return Ok(());
                }
                self.flush_pending()?;
                if cdata {
                    self.writer.write_event(Event::CData(BytesCData::new(text)))?;
                } else {
                    self.writer.write_event(Event::Text(BytesText::new(&text)))?;
                }
            }
            XmlEvent::ProcessingInstruction { target, data } => {
                self.flush_pending()?;
                let content = match data {
                    Some(d) => format!("{} {}", target, d),
                    None => target,
                };
                self.hold_indent(self.is_preserving())?;
                self.writer.write_event(Event::PI(BytesPI::new(content)))?;
            }
            XmlEvent::Other => {}
        }
        Ok(())
    }

    /// Write out a start tag held back to see whether the element is empty.
    fn flush_pending(&mut self) -> Result<(), SvgMinError> {
        if let Some((start, inherited)) = self.pending.take() {
            self.hold_indent(inherited)?;
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }

    fn is_preserving(&self) -> bool {
        self.preserve.last().copied().unwrap_or(false)
    }

    /// Keep the indenter from breaking the line before the next tag when
    /// that tag sits in preserved content. An empty text event writes
    /// nothing but clears the pending line break.
    fn hold_indent(&mut self, preserving: bool) -> Result<(), SvgMinError> {
        if self.auto_format && preserving {
            self.writer.write_event(Event::Text(BytesText::new("")))?;
        }
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W, SvgMinError> {
        self.flush_pending()?;
        Ok(self.writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_all(events: Vec<XmlEvent>, auto_format: bool) -> String {
        let mut writer = EventWriter::new(Vec::new(), auto_format);
        for event in events {
            writer.write(event).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

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

    #[test]
    fn test_write_collapses_empty_elements() {
        let out = write_all(
            vec![start("svg", &[]), start("rect", &[("fill", "red")]), end("rect"), end("svg")],
            false,
        );
        assert_eq!(out, r#"<svg><rect fill="red"/></svg>"#);
    }

    #[test]
    fn test_write_escapes() {
        let out = write_all(
            vec![
                start("text", &[("title", "a\"b")]),
                XmlEvent::Characters {
                    text: "x < y & z".into(),
                    cdata: false,
                },
                end("text"),
            ],
            false,
        );
        assert_eq!(out, r#"<text title="a&quot;b">x &lt; y &amp; z</text>"#);
    }

    #[test]
    fn test_write_declaration_and_pi() {
        let out = write_all(
            vec![
                XmlEvent::StartDocument {
                    version: "1.0".into(),
                    encoding: None,
                    standalone: Some(true),
                },
                XmlEvent::ProcessingInstruction {
                    target: "xml-stylesheet".into(),
                    data: Some("href='a.css'".into()),
                },
                start("svg", &[]),
                end("svg"),
            ],
            false,
        );
        assert_eq!(
            out,
            r#"<?xml version="1.0" standalone="yes"?><?xml-stylesheet href='a.css'?><svg/>"#
        );
    }

    #[test]
    fn test_write_cdata() {
        let out = write_all(
            vec![
                start("style", &[]),
                XmlEvent::Characters {
                    text: "rect{fill:red}".into(),
                    cdata: true,
                },
                end("style"),
            ],
            false,
        );
        assert_eq!(out, "<style><![CDATA[rect{fill:red}]]></style>");
    }

    #[test]
    fn test_auto_format_drops_whitespace() {
        let out = write_all(
            vec![
                start("svg", &[]),
                XmlEvent::Characters {
                    text: "\n    ".into(),
                    cdata: false,
                },
                start("g", &[]),
                start("rect", &[]),
                end("rect"),
                end("g"),
                end("svg"),
                XmlEvent::EndDocument,
            ],
            true,
        );
        assert!(!out.contains("\n    \n"));
        assert!(out.contains("\n  <g>"));
        assert!(out.contains("\n    <rect/>"));
        assert!(out.ends_with("</svg>\n"));
    }

    #[test]
    fn test_auto_format_keeps_preserved_space() {
        let chars = |text: &str| XmlEvent::Characters {
            text: text.into(),
            cdata: false,
        };
        let out = write_all(
            vec![
                start("svg", &[]),
                start("text", &[("xml:space", "preserve")]),
                start("tspan", &[]),
                chars("a"),
                end("tspan"),
                chars("   "),
                start("tspan", &[]),
                chars("b"),
                end("tspan"),
                end("text"),
                chars("\n"),
                start("g", &[]),
                end("g"),
                end("svg"),
                XmlEvent::EndDocument,
            ],
            true,
        );
        assert_eq!(
            out,
            "<svg>\n  <text xml:space=\"preserve\"><tspan>a</tspan>   <tspan>b</tspan></text>\n  <g/>\n</svg>\n"
        );
    }

    #[test]
    fn test_xml_space_default_resets_preserve() {
        let out = write_all(
            vec![
                start("svg", &[("xml:space", "preserve")]),
                start("g", &[("xml:space", "default")]),
                XmlEvent::Characters {
                    text: "  ".into(),
                    cdata: false,
                },
                start("rect", &[]),
                end("rect"),
                end("g"),
                end("svg"),
            ],
            true,
        );
        assert_eq!(
            out,
            "<svg xml:space=\"preserve\"><g xml:space=\"default\">\n    <rect/>\n  </g></svg>"
        );
    }

    #[test]
    fn test_other_events_are_dropped() {
        let out = write_all(vec![start("svg", &[]), XmlEvent::Other, end("svg")], false);
        assert_eq!(out, "<svg/>");
    }
}
