//! SPDX XML format handler
//!
//! The document tree is written under a `<Document>` root. Objects become
//! nested elements, and list fields are repeated elements named after the
//! field, one per item.

use super::tree::is_list_field;
use crate::errors::ConverterError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::io::{BufReader, Read, Write};

const ROOT_ELEMENT: &str = "Document";

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
    has_children: bool,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
            has_children: false,
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.has_children {
            Value::Object(self.children)
        } else {
            Value::String(self.text)
        };
        (self.name, value)
    }

    fn add_child(&mut self, name: String, value: Value) {
        self.has_children = true;
        if is_list_field(&name) {
            match self.children.entry(name).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(items) => items.push(value),
                other => *other = Value::Array(vec![other.take(), value]),
            }
        } else {
            self.children.insert(name, value);
        }
    }
}

fn decode_err(e: impl std::fmt::Display) -> ConverterError {
    ConverterError::Decode(format!("Failed to parse SPDX XML: {}", e))
}

/// Parse an SPDX XML document into the shared document tree
pub fn read(reader: &mut dyn Read) -> Result<Value, ConverterError> {
    let mut reader = Reader::from_reader(BufReader::new(reader));
    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event_into(&mut buf).map_err(decode_err)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(Frame::new(name));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, Value::String(String::new())),
                    None => root = Some(Value::Object(Map::new())),
                }
            }
            Event::Text(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&e.unescape().map_err(decode_err)?);
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| decode_err("unbalanced closing element"))?;
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => root = Some(value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(decode_err("unexpected end of document"));
    }
    match root {
        Some(tree @ Value::Object(_)) => Ok(tree),
        Some(_) | None => Err(decode_err("no document element found")),
    }
}

fn encode_err(e: impl std::fmt::Display) -> ConverterError {
    ConverterError::Encode(format!("Failed to write SPDX XML: {}", e))
}

/// Write an SPDX document tree as XML
pub fn write(writer: &mut dyn Write, tree: &Value) -> Result<(), ConverterError> {
    let fields = tree
        .as_object()
        .ok_or_else(|| encode_err("document tree is not an object"))?;
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_err)?;
    write_object(&mut xml, ROOT_ELEMENT, fields)?;
    xml.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_object<W: Write>(
    xml: &mut Writer<W>,
    name: &str,
    fields: &Map<String, Value>,
) -> Result<(), ConverterError> {
    xml.write_event(Event::Start(BytesStart::new(name)))
        .map_err(encode_err)?;
    for (key, value) in fields {
        write_value(xml, key, value)?;
    }
    xml.write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_err)?;
    Ok(())
}

fn write_value<W: Write>(xml: &mut Writer<W>, name: &str, value: &Value) -> Result<(), ConverterError> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                write_value(xml, name, item)?;
            }
            Ok(())
        }
        Value::Object(fields) => write_object(xml, name, fields),
        Value::String(s) => write_text(xml, name, s),
        Value::Bool(b) => write_text(xml, name, &b.to_string()),
        Value::Number(n) => write_text(xml, name, &n.to_string()),
    }
}

fn write_text<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<(), ConverterError> {
    xml.write_event(Event::Start(BytesStart::new(name)))
        .map_err(encode_err)?;
    xml.write_event(Event::Text(BytesText::new(text)))
        .map_err(encode_err)?;
    xml.write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_err)?;
    Ok(())
}
