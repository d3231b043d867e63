//! XML utilities for the Office Open XML and OpenDocument formats.
//! Wraps quick-xml for event reading, attribute access, text collection and element writing.

use crate::error::RustyDishError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper configured for worksheet parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RustyDishError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(RustyDishError::XmlError(error)),
        }
    }
}

pub(crate) trait XmlAttributeHelper<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, RustyDishError>;

    fn parse_value<T: FromStr>(&self) -> Result<T, RustyDishError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, RustyDishError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, RustyDishError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => RustyDishError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => RustyDishError::StringEncodingError(error),
            })
    }
}

/// Attribute lookup by qualified name on start tags
pub(crate) trait XmlNodeHelper<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyDishError>;

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyDishError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyDishError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyDishError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Accumulates text content from text and entity reference events
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), RustyDishError>;

    /// Appends an entity or character reference (`&amp;`, `&#x4E2D;`)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustyDishError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), RustyDishError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustyDishError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Thin element writer over quick-xml used by the workbook exporter
pub(crate) struct XmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    /// Creates a writer and emits the standalone UTF-8 declaration
    pub(crate) fn new(inner: W) -> Result<XmlWriter<W>, RustyDishError> {
        let mut writer = Writer::new(inner);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(XmlWriter { writer })
    }

    pub(crate) fn start(&mut self, tag: &str, attributes: &[(&str, &str)]) -> Result<(), RustyDishError> {
        let element = BytesStart::new(tag).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    pub(crate) fn end(&mut self, tag: &str) -> Result<(), RustyDishError> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    pub(crate) fn empty(&mut self, tag: &str, attributes: &[(&str, &str)]) -> Result<(), RustyDishError> {
        let element = BytesStart::new(tag).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    /// Writes `<tag ...>text</tag>` with the text escaped
    pub(crate) fn text_element(&mut self, tag: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), RustyDishError> {
        self.start(tag, attributes)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    pub(crate) fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_xml_events;
    use quick_xml::name::QName;

    fn collect_text(xml: &str) -> String {
        let mut reader = XmlReader::new(xml.as_bytes());
        let mut text = String::new();
        let result: Result<(), RustyDishError> = (|| {
            match_xml_events!(reader => {
                Event::Text(event) => text.push_bytes_text(&event)?,
                Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
            });
            Ok(())
        })();
        result.unwrap();
        text
    }

    #[test]
    fn resolves_entities_and_character_references() {
        assert_eq!(collect_text("<t>Fish &amp; Chips</t>"), "Fish & Chips");
        assert_eq!(collect_text("<t>&#x7EA2;&#31958;</t>"), "红糖");
    }

    #[test]
    fn reads_attributes() {
        let mut reader = XmlReader::new(r#"<c r="B3" s="2"/>"#.as_bytes());
        let event = reader.next().unwrap().unwrap();
        match event {
            Event::Start(event) => {
                assert_eq!(event.name(), QName(b"c"));
                assert_eq!(event.get_attribute_value("r").unwrap().unwrap(), "B3");
                assert_eq!(event.parse_attribute_value::<usize>("s").unwrap(), Some(2));
                assert_eq!(event.get_attribute_value("t").unwrap(), None);
            }
            _ => panic!("expected start event"),
        }
    }

    #[test]
    fn writes_escaped_elements() {
        let mut writer = XmlWriter::new(Vec::new()).unwrap();
        writer.start("row", &[("r", "1")]).unwrap();
        writer.text_element("t", &[], "a < b").unwrap();
        writer.empty("c", &[("r", "B1")]).unwrap();
        writer.end("row").unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.ends_with(r#"<row r="1"><t>a &lt; b</t><c r="B1"/></row>"#));
    }
}
