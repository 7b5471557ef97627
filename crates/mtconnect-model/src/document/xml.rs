//! XML text <-> [`Element`] tree.
//!
//! The reader builds the tree with an explicit stack, so nesting depth is
//! bounded by [`ReadOptions::max_depth`] rather than the call stack.
//! Whitespace around text is trimmed. Comments, processing instructions and
//! the declaration are dropped.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::document::Element;
use crate::error::DocumentError;
use crate::options::{ReadOptions, WriteOptions};

/// Parses XML text into an element tree.
pub fn parse_xml(text: &str, options: &ReadOptions) -> Result<Element, DocumentError> {
    if text.len() > options.max_document_size {
        return Err(DocumentError::DocumentTooLarge {
            len: text.len(),
            max: options.max_document_size,
        });
    }

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Start(start) => {
                let element = start_element(&start)?;
                if stack.len() >= options.max_depth {
                    return Err(DocumentError::DepthExceeded {
                        max: options.max_depth,
                    });
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = start_element(&start)?;
                if stack.len() >= options.max_depth {
                    return Err(DocumentError::DepthExceeded {
                        max: options.max_depth,
                    });
                }
                attach(&mut stack, &mut root, element, options)?;
            }
            Event::End(_) => {
                // End names are checked against start names by the reader.
                let element = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element, options)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                append_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let data = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|e| DocumentError::Xml(e.to_string()))?;
                append_text(&mut stack, &data);
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(DocumentError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or(DocumentError::EmptyDocument)
}

fn start_element(start: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| DocumentError::Xml(e.to_string()))?
        .to_string();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| DocumentError::Xml(e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| DocumentError::Xml(e.to_string()))?
            .to_string();
        let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    options: &ReadOptions,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => {
            if parent.children.len() >= options.max_children {
                return Err(DocumentError::TooManyChildren {
                    element: parent.name.clone(),
                    max: options.max_children,
                });
            }
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(DocumentError::Xml("multiple root elements".to_string())),
    }
}

fn append_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        match &mut current.text {
            Some(existing) => existing.push_str(text),
            None => current.text = Some(text.to_string()),
        }
    }
}

fn xml_error(err: quick_xml::Error) -> DocumentError {
    DocumentError::Xml(err.to_string())
}

/// Writes an element tree as XML text.
pub fn to_xml(root: &Element, options: &WriteOptions) -> Result<String, DocumentError> {
    let mut writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    if options.emit_declaration {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
    }
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner()).map_err(write_error)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    if let Some(text) = &element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}

fn write_error(err: impl std::fmt::Display) -> DocumentError {
    DocumentError::Write(err.to_string())
}
