//! Path-tracking walker over `quick-xml` events
//!
//! Connector parsers implement [`XmlVisitor`] and react to element starts,
//! text and element ends, each reported with the stack of local element
//! names from the document root.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use rindex_common::text::decode_entities;
use std::io::BufRead;

use crate::error::Result;

pub trait XmlVisitor {
    /// `path` ends with the element being opened
    fn start(&mut self, _path: &[String], _element: &BytesStart<'_>) -> Result<()> {
        Ok(())
    }

    /// Text or CDATA directly inside the last element of `path`
    fn text(&mut self, _path: &[String], _text: &str) -> Result<()> {
        Ok(())
    }

    /// `path` still ends with the element being closed
    fn end(&mut self, _path: &[String]) -> Result<()> {
        Ok(())
    }

    /// Return true to stop reading early
    fn done(&self) -> bool {
        false
    }
}

/// Element name without its namespace prefix
pub fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Unescaped value of the attribute whose local name is `name`
pub fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn text_of(text: &BytesText<'_>) -> String {
    match text.unescape() {
        Ok(cow) => cow.into_owned(),
        // HTML entities such as &nbsp; are not XML-predefined
        Err(_) => decode_entities(&String::from_utf8_lossy(text)),
    }
}

/// Read the whole document, forwarding events to `visitor`
pub fn walk<R: BufRead, V: XmlVisitor>(source: R, visitor: &mut V) -> Result<()> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();

    loop {
        if visitor.done() {
            break;
        }
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                path.push(local_name(&e));
                visitor.start(&path, &e)?;
            },
            Event::Empty(e) => {
                path.push(local_name(&e));
                visitor.start(&path, &e)?;
                visitor.end(&path)?;
                path.pop();
            },
            Event::Text(e) => {
                let text = text_of(&e);
                if !text.is_empty() {
                    visitor.text(&path, &text)?;
                }
            },
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                visitor.text(&path, &text)?;
            },
            Event::End(_) => {
                visitor.end(&path)?;
                path.pop();
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }
    Ok(())
}

/// Convenience for in-memory documents
pub fn walk_str<V: XmlVisitor>(xml: &str, visitor: &mut V) -> Result<()> {
    walk(xml.as_bytes(), visitor)
}

/// True if `path` ends with the given element names
pub fn path_ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}
