//! Pull-based XML reading.
//!
//! Wraps `quick_xml`'s reader and turns its events into [`XmlEvent`]s. Names
//! are never resolved against namespaces: a prefix is just part of the name.
//! General entities declared in the DOCTYPE internal subset are expanded in
//! text and attribute values.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use tracing::trace;

use crate::ast::*;
use crate::error::SvgMinError;

/// A streaming reader producing one [`XmlEvent`] at a time.
pub struct EventReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    entities: HashMap<String, String>,
    finished: bool,
}

impl<'a> EventReader<&'a [u8]> {
    /// Creates a reader over an in-memory document.
    pub fn from_str(s: &'a str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.check_end_names = true;
        Self {
            reader,
            buf: Vec::new(),
            entities: HashMap::new(),
            finished: false,
        }
    }

    /// Reads the next event.
    ///
    /// The last event of a document is [`XmlEvent::EndDocument`]; after it
    /// this returns `None`. Malformed input is reported as an error.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>, SvgMinError> {
        if self.finished {
            return Ok(None);
        }

        self.buf.clear();
        let event = match self.reader.read_event_into(&mut self.buf)? {
            Event::Decl(decl) => XmlEvent::StartDocument {
                version: String::from_utf8_lossy(decl.version()?.as_ref()).into_owned(),
                encoding: decl
                    .encoding()
                    .transpose()?
                    .map(|e| String::from_utf8_lossy(e.as_ref()).into_owned()),
                standalone: decl
                    .standalone()
                    .transpose()?
                    .map(|s| String::from_utf8_lossy(&s) == "yes"),
            },
            Event::Start(start) | Event::Empty(start) => {
                parse_element_start(&start, &self.entities)?
            }
            Event::End(end) => {
                let name_bytes = end.name();
                XmlEvent::EndElement {
                    name: QName::parse(std::str::from_utf8(name_bytes.as_ref())?),
                }
            }
            Event::Text(text) => XmlEvent::Characters {
                text: text
                    .unescape_with(|name| resolve_entity(&self.entities, name))?
                    .into_owned(),
                cdata: false,
            },
            Event::CData(cdata) => XmlEvent::Characters {
                text: std::str::from_utf8(&cdata)?.to_string(),
                cdata: true,
            },
            Event::PI(pi) => {
                let content = std::str::from_utf8(&pi)?;
                let (target, data) = match content.split_once(char::is_whitespace) {
                    Some((target, rest)) => {
                        let rest = rest.trim_start();
                        (target, (!rest.is_empty()).then(|| rest.to_string()))
                    }
                    None => (content, None),
                };
                XmlEvent::ProcessingInstruction {
                    target: target.to_string(),
                    data,
                }
            }
            Event::Eof => {
                self.finished = true;
                XmlEvent::EndDocument
            }
            Event::DocType(doctype) => {
                declare_entities(std::str::from_utf8(&doctype)?, &mut self.entities)?;
                XmlEvent::Other
            }
            Event::Comment(_) => XmlEvent::Other,
        };

        Ok(Some(event))
    }
}

fn parse_element_start(
    start: &BytesStart,
    entities: &HashMap<String, String>,
) -> Result<XmlEvent, SvgMinError> {
    let name_bytes = start.name();
    let name = std::str::from_utf8(name_bytes.as_ref())?;

    let mut attributes = AttributeSet::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = attr.unescape_value_with(|name| resolve_entity(entities, name))?;
        attributes.push(Attribute::new(key, value.into_owned()));
    }

    Ok(XmlEvent::StartElement {
        name: QName::parse(name),
        attributes,
    })
}

fn resolve_entity<'e>(entities: &'e HashMap<String, String>, name: &str) -> Option<&'e str> {
    entities
        .get(name)
        .map(String::as_str)
        .or_else(|| resolve_predefined_entity(name))
}

/// Record the internal `<!ENTITY name "value">` declarations of a DOCTYPE.
///
/// Parameter entities and external entities are ignored. References inside a
/// value are expanded at declaration time, and the first declaration of a
/// name is binding.
fn declare_entities(
    doctype: &str,
    entities: &mut HashMap<String, String>,
) -> Result<(), SvgMinError> {
    const KEYWORD: &str = "<!ENTITY";

    let mut rest = doctype;
    while let Some(pos) = rest.find(KEYWORD) {
        rest = rest[pos + KEYWORD.len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }

        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let Some(len) = rest[1..].find(quote) else {
            break;
        };
        let raw = &rest[1..1 + len];
        rest = &rest[len + 2..];

        let value = unescape_with(raw, |name| resolve_entity(&*entities, name))
            .map_err(quick_xml::Error::from)?
            .into_owned();
        trace!(name, value = %value, "declared entity");
        entities.entry(name.to_string()).or_insert(value);
    }
    Ok(())
}
