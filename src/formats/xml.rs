//! XML documents.
//!
//! Each child element of the root is one entry, keyed by its `key` attribute
//! or, failing that, by its element name:
//!
//! ```xml
//! <configurations>
//!   <configuration key="primary" algorithm="sha256">
//!     <secret>abc</secret>
//!     <header>X-Signature</header>
//!     <header>X-Timestamp</header>
//!   </configuration>
//!   <backup>
//!     <secret>def</secret>
//!   </backup>
//! </configurations>
//! ```
//!
//! Attributes and child elements become fields, text-only elements become
//! strings and repeated siblings become lists. String leaves are coerced by
//! the config crate when the target field is numeric or boolean.
//!
//! A single child element is a plain field, not a one-item list; declare
//! list fields with [`one_or_many`](super::one_or_many) to accept both.

use super::FormatParser;
use crate::error::{ConfigError, Result};
use config::{Map, Value, ValueKind};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const KEY_ATTRIBUTE: &str = "key";
const TEXT_FIELD: &str = "$text";

/// XML documents (`.xml`, `.config`).
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlFormat;

impl XmlFormat {
    /// Create the XML parser.
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for XmlFormat {
    fn name(&self) -> &str {
        "xml"
    }

    fn extensions(&self) -> &[&str] {
        &["xml", "config"]
    }

    fn parse(&self, text: &str) -> Result<Value> {
        Ok(XmlElement::parse_document(text)?.entries())
    }
}

/// Minimal element tree built from quick-xml events.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlElement {
    pub(crate) name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Parse a document and return its root element.
    pub(crate) fn parse_document(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                ConfigError::ParseError(format!(
                    "invalid xml at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(start) => stack.push(Self::open(&start)?),
                Event::Empty(start) => {
                    let element = Self::open(&start)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        ConfigError::ParseError("invalid xml: unexpected closing tag".to_string())
                    })?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| ConfigError::ParseError(format!("invalid xml text: {}", e)))?;
                    Self::append_text(&mut stack, &text)?;
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    Self::append_text(&mut stack, &String::from_utf8_lossy(&data))?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes.
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ConfigError::ParseError(format!(
                "invalid xml: element <{}> is never closed",
                open.name
            )));
        }

        root.ok_or_else(|| ConfigError::ParseError("invalid xml: no root element".to_string()))
    }

    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute
                .map_err(|e| ConfigError::ParseError(format!("invalid xml attribute: {}", e)))?;
            if attribute.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let value = attribute
                .unescape_value()
                .map_err(|e| ConfigError::ParseError(format!("invalid xml attribute: {}", e)))?;
            attributes.push((
                String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned(),
                value.into_owned(),
            ));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> Result<()> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(element);
            return Ok(());
        }
        if root.is_some() {
            return Err(ConfigError::ParseError(format!(
                "invalid xml: second root element <{}>",
                element.name
            )));
        }
        *root = Some(element);
        Ok(())
    }

    fn append_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
        match stack.last_mut() {
            Some(current) => {
                current.text.push_str(text);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(ConfigError::ParseError(
                "invalid xml: text outside the root element".to_string(),
            )),
        }
    }

    /// First child element named `name`.
    pub(crate) fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Children of this element as an entry table. A later duplicate key
    /// replaces an earlier one.
    pub(crate) fn entries(&self) -> Value {
        let mut table = Map::new();
        for child in &self.children {
            let key = child.attribute(KEY_ATTRIBUTE).unwrap_or(&child.name).to_string();
            table.insert(key, child.entry_value());
        }
        Value::new(None, ValueKind::Table(table))
    }

    fn entry_value(&self) -> Value {
        let has_fields = !self.children.is_empty()
            || self.attributes.iter().any(|(key, _)| key != KEY_ATTRIBUTE);
        if !has_fields && !self.text.is_empty() {
            return Value::new(None, ValueKind::String(self.text.clone()));
        }
        Value::new(None, ValueKind::Table(self.fields(Some(KEY_ATTRIBUTE))))
    }

    fn to_value(&self) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return Value::new(None, ValueKind::String(self.text.clone()));
        }
        Value::new(None, ValueKind::Table(self.fields(None)))
    }

    fn fields(&self, skip_attribute: Option<&str>) -> Map<String, Value> {
        let mut fields = Map::new();
        for (key, value) in &self.attributes {
            if Some(key.as_str()) == skip_attribute {
                continue;
            }
            fields.insert(key.clone(), Value::new(None, ValueKind::String(value.clone())));
        }

        for child in &self.children {
            let value = child.to_value();
            match fields.remove(&child.name) {
                None => {
                    fields.insert(child.name.clone(), value);
                }
                Some(existing) => {
                    // Children never convert to arrays, so an array here is a list we built.
                    let list = match existing.kind {
                        ValueKind::Array(mut items) => {
                            items.push(value);
                            items
                        }
                        kind => vec![Value::new(None, kind), value],
                    };
                    fields.insert(child.name.clone(), Value::new(None, ValueKind::Array(list)));
                }
            }
        }

        if !self.text.is_empty() && (!self.children.is_empty() || !self.attributes.is_empty()) {
            fields.insert(
                TEXT_FIELD.to_string(),
                Value::new(None, ValueKind::String(self.text.clone())),
            );
        }
        fields
    }
}
