//! Owned XML element tree built with quick-xml

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};

/// A node inside an element
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// Child element
    Element(XmlElement),
    /// Unescaped character data
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment body
    Comment(String),
}

/// An element with its attributes and children in document order
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified tag name
    pub name: String,
    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Tag name without namespace prefix
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Attribute value by qualified or local name
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key || local_name(k) == key)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text and CDATA children (not descendants)
    pub fn direct_text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) | XmlNode::CData(t) => text.push_str(t),
                _ => {}
            }
        }
        text
    }

    /// Child elements in order
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    fn matches_any(&self, tags: &[String]) -> bool {
        tags.iter()
            .any(|t| t == &self.name || t == self.local_name())
    }

    /// Remove matching descendants, returning how many subtrees were dropped
    fn remove_descendants(&mut self, tags: &[String]) -> usize {
        let before = self.children.len();
        self.children.retain(|child| match child {
            XmlNode::Element(e) => !e.matches_any(tags),
            _ => true,
        });
        let mut removed = before - self.children.len();
        for child in &mut self.children {
            if let XmlNode::Element(e) = child {
                removed += e.remove_descendants(tags);
            }
        }
        removed
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// A parsed, well-formed XML document
#[derive(Debug, Clone, PartialEq)]
pub struct XmlTree {
    /// Document element
    pub root: XmlElement,
}

impl XmlTree {
    /// Parse a document; `filename` is only used in error messages
    pub fn parse(xml: &str, filename: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|e| {
                Error::xml_parse(filename, format!("at byte {}: {}", position, e))
            })?;

            match event {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(Error::xml_parse(filename, "multiple root elements"));
                    }
                    stack.push(element_from_start(&start, filename)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, filename)?;
                    attach(&mut stack, &mut root, element, filename)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::xml_parse(filename, "unexpected closing tag"))?;
                    attach(&mut stack, &mut root, element, filename)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::xml_parse(filename, e.to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Text(text.into_owned())),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(Error::xml_parse(
                                filename,
                                "text content outside the root element",
                            ))
                        }
                    }
                }
                Event::CData(data) => {
                    let content = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::CData(content)),
                        None => {
                            return Err(Error::xml_parse(filename, "CDATA outside the root element"))
                        }
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        let body = String::from_utf8_lossy(&comment).into_owned();
                        parent.children.push(XmlNode::Comment(body));
                    }
                }
                Event::Eof => break,
                // Declarations, processing instructions and doctypes are not kept
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::xml_parse(
                filename,
                format!("unclosed element <{}>", open.name),
            ));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| Error::xml_parse(filename, "document has no root element"))
    }

    /// Delete every element whose qualified or local name is in `tags`
    ///
    /// The document element itself is kept; when it matches, its content is cleared.
    pub fn remove_tags(&mut self, tags: &[String]) -> usize {
        if tags.is_empty() {
            return 0;
        }
        if self.root.matches_any(tags) {
            let removed = self.root.child_elements().count();
            self.root.children.clear();
            return removed + 1;
        }
        self.root.remove_descendants(tags)
    }

    /// Serialize with an XML declaration and indentation, dropping whitespace-only text
    pub fn to_pretty_string(&self, indent_char: u8, indent_size: usize) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), indent_char, indent_size);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| Error::internal(format!("Failed to write XML: {}", e)))?;
        write_element(&mut writer, &self.root)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(|e| Error::internal(format!("Non UTF-8 XML output: {}", e)))
    }
}

fn element_from_start(start: &BytesStart<'_>, filename: &str) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::xml_parse(filename, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::xml_parse(filename, e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
    filename: &str,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::xml_parse(filename, "multiple root elements")),
    }
    Ok(())
}

pub(crate) fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let has_content = element.children.iter().any(|c| match c {
        XmlNode::Text(t) => !t.trim().is_empty(),
        _ => true,
    });

    if !has_content {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| Error::internal(format!("Failed to write XML: {}", e)));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::internal(format!("Failed to write XML: {}", e)))?;

    for child in &element.children {
        let event = match child {
            XmlNode::Element(e) => {
                write_element(writer, e)?;
                continue;
            }
            XmlNode::Text(t) if t.trim().is_empty() => continue,
            XmlNode::Text(t) => Event::Text(BytesText::new(t)),
            XmlNode::CData(c) => Event::CData(BytesCData::new(c.as_str())),
            XmlNode::Comment(c) => Event::Comment(BytesText::from_escaped(c.as_str())),
        };
        writer
            .write_event(event)
            .map_err(|e| Error::internal(format!("Failed to write XML: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| Error::internal(format!("Failed to write XML: {}", e)))
}
