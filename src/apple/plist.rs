// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Minimal XML property list reader.
//!
//! Only the shapes needed to inspect configuration profile payloads are
//! supported. `<data>` elements are kept as their raw text so that Fleet
//! variables placed there survive parsing.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{FleetVarError, Result};

/// A property list value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<dict>`, keys in document order.
    Dict(Dict),
    /// `<array>`
    Array(Vec<Value>),
    /// `<string>`
    String(String),
    /// `<data>` with whitespace removed, not base64-decoded.
    Data(String),
    /// `<integer>`
    Integer(String),
    /// `<real>`
    Real(String),
    /// `<date>`
    Date(String),
    /// `<true/>` or `<false/>`
    Bool(bool),
}

impl Value {
    /// The value as a dictionary.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// The value as an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Text of a string-like value (`string`, `data`, `integer`, `real`, `date`).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Data(s) | Self::Integer(s) | Self::Real(s) | Self::Date(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// The value as a `<string>`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Dictionary entries in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(Vec<(String, Value)>);

impl Dict {
    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value stored under `key`, empty if absent or not a string.
    pub fn string(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn malformed(msg: impl std::fmt::Display) -> FleetVarError {
    FleetVarError::bad_request(format!("invalid property list: {msg}"))
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<Event<'a>> {
        loop {
            match self.reader.read_event()? {
                Event::Comment(_) | Event::Decl(_) | Event::DocType(_) | Event::PI(_) => continue,
                event => return Ok(event),
            }
        }
    }

    fn text_until_end(&mut self, tag: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::End(_) => return Ok(text),
                Event::Eof => return Err(malformed(format!("unterminated <{tag}>"))),
                other => return Err(malformed(format!("unexpected {other:?} in <{tag}>"))),
            }
        }
    }

    fn dict(&mut self) -> Result<Dict> {
        let mut entries = Vec::new();
        loop {
            match self.next()? {
                Event::End(_) => return Ok(Dict(entries)),
                Event::Start(e) if e.name().as_ref() == b"key" => {
                    let key = self.text_until_end("key")?;
                    let event = self.next()?;
                    let value = self.value(event)?;
                    entries.push((key, value));
                }
                Event::Empty(e) if e.name().as_ref() == b"key" => {
                    let event = self.next()?;
                    let value = self.value(event)?;
                    entries.push((String::new(), value));
                }
                Event::Eof => return Err(malformed("unterminated <dict>")),
                other => return Err(malformed(format!("expected <key>, found {other:?}"))),
            }
        }
    }

    fn array(&mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                Event::End(_) => return Ok(items),
                Event::Eof => return Err(malformed("unterminated <array>")),
                event => items.push(self.value(event)?),
            }
        }
    }

    fn value(&mut self, event: Event<'a>) -> Result<Value> {
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"dict" => Ok(Value::Dict(self.dict()?)),
                b"array" => Ok(Value::Array(self.array()?)),
                b"string" => Ok(Value::String(self.text_until_end("string")?)),
                b"data" => {
                    let raw = self.text_until_end("data")?;
                    Ok(Value::Data(raw.split_whitespace().collect()))
                }
                b"integer" => Ok(Value::Integer(self.text_until_end("integer")?)),
                b"real" => Ok(Value::Real(self.text_until_end("real")?)),
                b"date" => Ok(Value::Date(self.text_until_end("date")?)),
                other => Err(malformed(format!(
                    "unsupported element <{}>",
                    String::from_utf8_lossy(other)
                ))),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"true" => Ok(Value::Bool(true)),
                b"false" => Ok(Value::Bool(false)),
                b"dict" => Ok(Value::Dict(Dict::default())),
                b"array" => Ok(Value::Array(Vec::new())),
                b"string" => Ok(Value::String(String::new())),
                b"data" => Ok(Value::Data(String::new())),
                other => Err(malformed(format!(
                    "unsupported element <{}/>",
                    String::from_utf8_lossy(other)
                ))),
            },
            Event::Eof => Err(malformed("unexpected end of document")),
            other => Err(malformed(format!("unexpected {other:?}"))),
        }
    }
}

/// Parse an XML property list document and return its root value.
///
/// # Errors
///
/// Returns an error if the document is not well-formed XML or uses
/// elements outside the property list vocabulary.
pub fn parse(contents: &str) -> Result<Value> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);
    let mut parser = Parser { reader };

    loop {
        match parser.next()? {
            Event::Start(e) if e.name().as_ref() == b"plist" => continue,
            Event::Eof => return Err(malformed("empty document")),
            event => return parser.value(event),
        }
    }
}
