//! Owned XML document tree for model templates
//!
//! Templates are parsed once into a [`Document`] and deep-copied (via
//! `Clone`) for each marker. Lookups use slash-separated element paths
//! relative to the root element, e.g. `"model/link/pose"`.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Errors that can occur when parsing, querying or writing documents
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Malformed XML
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// Document has no root element
    #[error("document has no root element")]
    MissingRoot,

    /// More than one top-level element
    #[error("document has more than one root element (found '{name}')")]
    MultipleRoots { name: String },

    /// Element opened but never closed
    #[error("element '{name}' is never closed")]
    Unclosed { name: String },

    /// Path lookup found nothing
    #[error("node '{path}' not found under <{root}>")]
    MissingNode { root: String, path: String },

    /// Serialization failure
    #[error("failed to serialize document: {0}")]
    Write(String),

    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),
}

/// A child node of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_text`]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Builder form of [`Element::append`]
    pub fn with_child(mut self, child: Element) -> Self {
        self.append(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// First text child, if any
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            Node::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// Replace all text content with a single text node placed first
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|node| !matches!(node, Node::Text(_)));
        self.children.insert(0, Node::Text(text.into()));
    }

    pub fn append(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn nodes(&self) -> &[Node] {
        &self.children
    }

    /// Child elements in document order
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Descend through first-matching children along a slash-separated path
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |elem, step| elem.child(step))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Element> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |elem, step| elem.child_mut(step))
    }
}

/// The `<?xml ...?>` declaration of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// A parsed XML document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    declaration: Option<Declaration>,
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            root,
        }
    }

    /// Parse an XML string
    ///
    /// Whitespace-only text is dropped so that serialization can re-indent
    /// the tree consistently.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut declaration = None;
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| DocumentError::Xml {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;

            match event {
                Event::Decl(ref d) => {
                    declaration = Some(read_declaration(d));
                }
                Event::Start(ref e) => {
                    stack.push(element_from_start(e, reader.buffer_position() as u64)?);
                }
                Event::Empty(ref e) => {
                    let elem = element_from_start(e, reader.buffer_position() as u64)?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Event::End(_) => {
                    // quick-xml verifies that end names match their start tags
                    let elem = stack.pop().ok_or_else(|| DocumentError::Xml {
                        position: reader.buffer_position() as u64,
                        message: "unexpected closing tag".to_string(),
                    })?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Event::Text(ref t) => {
                    let text = t.unescape().map_err(|e| DocumentError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(ref c) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::Text(String::from_utf8_lossy(c).into_owned()));
                    }
                }
                Event::Comment(ref c) => {
                    // Comments outside the root element are not kept
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::Comment(String::from_utf8_lossy(c).into_owned()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(DocumentError::Unclosed { name: open.name });
        }

        let root = root.ok_or(DocumentError::MissingRoot)?;
        Ok(Self { declaration, root })
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Find an element by path relative to the root
    pub fn find(&self, path: &str) -> Option<&Element> {
        self.root.find(path)
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Element> {
        self.root.find_mut(path)
    }

    /// Like [`Document::find_mut`], but a missing node is an error
    pub fn require_mut(&mut self, path: &str) -> Result<&mut Element, DocumentError> {
        let root = self.root.name.clone();
        self.root
            .find_mut(path)
            .ok_or_else(|| DocumentError::MissingNode {
                root,
                path: path.to_string(),
            })
    }

    /// Check that every path resolves, reporting the first that does not
    pub fn require_all(&self, paths: &[&str]) -> Result<(), DocumentError> {
        match paths.iter().find(|p| self.root.find(p).is_none()) {
            Some(path) => Err(DocumentError::MissingNode {
                root: self.root.name.clone(),
                path: path.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Serialize with two-space indentation and a trailing newline
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        if let Some(decl) = &self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))
                .map_err(|e| DocumentError::Write(e.to_string()))?;
        }
        write_element(&mut writer, &self.root)?;

        let mut out = String::from_utf8(writer.into_inner())
            .map_err(|e| DocumentError::Write(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }

    /// Serialize and write to a file
    pub fn write_to(&self, path: &Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }
}

fn read_declaration(decl: &BytesDecl) -> Declaration {
    let version = decl
        .version()
        .map(|v| String::from_utf8_lossy(&v).into_owned())
        .unwrap_or_else(|_| "1.0".to_string());
    let encoding = decl
        .encoding()
        .and_then(Result::ok)
        .map(|v| String::from_utf8_lossy(&v).into_owned());
    let standalone = decl
        .standalone()
        .and_then(Result::ok)
        .map(|v| String::from_utf8_lossy(&v).into_owned());

    Declaration {
        version,
        encoding,
        standalone,
    }
}

fn element_from_start(start: &BytesStart, position: u64) -> Result<Element, DocumentError> {
    let mut elem = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocumentError::Xml {
            position,
            message: e.to_string(),
        })?;
        let value = attr.unescape_value().map_err(|e| DocumentError::Xml {
            position,
            message: e.to_string(),
        })?;
        elem.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(elem)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    elem: Element,
) -> Result<(), DocumentError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(elem));
        return Ok(());
    }
    if root.is_some() {
        return Err(DocumentError::MultipleRoots { name: elem.name });
    }
    *root = Some(elem);
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, elem: &Element) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(elem.name.as_str());
    for (key, value) in &elem.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if elem.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| DocumentError::Write(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| DocumentError::Write(e.to_string()))?;
    for child in &elem.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(|e| DocumentError::Write(e.to_string()))?,
            Node::Comment(c) => writer
                .write_event(Event::Comment(BytesText::from_escaped(c.as_str())))
                .map_err(|e| DocumentError::Write(e.to_string()))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(elem.name.as_str())))
        .map_err(|e| DocumentError::Write(e.to_string()))
}
