//! XML document codec for the book store
//!
//! The store file is a single `<bookstore>` root holding one `<book>` node
//! per record:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <bookstore>
//!   <book category="web" cover="paperback">
//!     <isbn>9043127323207</isbn>
//!     <title lang="en">Learning XML</title>
//!     <author>Erik T. Ray</author>
//!     <year>2003</year>
//!     <price>39.95</price>
//!   </book>
//! </bookstore>
//! ```
//!
//! The file is parsed into a small element tree rather than straight into
//! books, so nodes the codec does not understand (foreign elements,
//! malformed books) are carried through a rewrite untouched.

use std::str::FromStr;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::Book;

pub const ROOT: &str = "bookstore";
pub const BOOK: &str = "book";

const ISBN: &str = "isbn";
const TITLE: &str = "title";
const AUTHOR: &str = "author";
const YEAR: &str = "year";
const PRICE: &str = "price";

const ATTR_CATEGORY: &str = "category";
const ATTR_COVER: &str = "cover";
const ATTR_LANG: &str = "lang";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Invalid character data: {0}")]
    Text(String),

    #[error("Failed to write XML: {0}")]
    Write(#[from] std::io::Error),

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Unbalanced element <{0}>")]
    Unbalanced(String),

    #[error("Invalid <{field}> value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

/// A node in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its attributes in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a leaf element holding `text` verbatim
    pub fn with_text(name: impl Into<String>, text: &str) -> Self {
        let mut element = Self::new(name);
        element.push_text(text);
        element
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, CodecError> {
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()));

        for attr in start.attributes() {
            let attr = attr?;
            let value = attr
                .unescape_value()
                .map_err(|e| CodecError::Text(e.to_string()))?;
            element.attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value.into_owned(),
            ));
        }

        Ok(element)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn push_element(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    /// Appends text, merging with a trailing text node
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(text),
            _ => self.children.push(Node::Text(text.to_string())),
        }
    }

    /// Iterates over direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Iterates over direct child elements with the given name
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |element| element.name == name)
    }

    /// Returns the first child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Drops whitespace-only text between child elements.
    ///
    /// Leaf elements keep their text as-is, whitespace included.
    fn strip_indentation(&mut self, force: bool) {
        let has_elements = self.children.iter().any(|n| matches!(n, Node::Element(_)));
        if has_elements || force {
            self.children.retain(|node| match node {
                Node::Text(text) => !text.trim().is_empty(),
                Node::Element(_) => true,
            });
        }
    }
}

/// A parsed store document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// Creates a document with an empty `<bookstore>` root
    pub fn empty() -> Self {
        Self {
            root: Element::new(ROOT),
        }
    }

    /// Parses XML text into a document tree
    pub fn parse(xml: &str) -> Result<Self, CodecError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(end) => {
                    let mut element = stack.pop().ok_or_else(|| {
                        CodecError::Unbalanced(String::from_utf8_lossy(end.name().as_ref()).into_owned())
                    })?;
                    element.strip_indentation(false);
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = text.unescape().map_err(|e| CodecError::Text(e.to_string()))?;
                        parent.push_text(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(CodecError::Unbalanced(open.name));
        }

        let mut root = root.ok_or(CodecError::MissingRoot)?;
        root.strip_indentation(true);
        Ok(Self { root })
    }

    /// Serializes the document with an XML declaration and two-space indent
    pub fn to_xml(&self) -> Result<Vec<u8>, CodecError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_element(&mut writer, &self.root)?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Iterates over `<book>` nodes with their position among the root's children
    pub fn book_nodes(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.root
            .children
            .iter()
            .enumerate()
            .filter_map(|(pos, node)| match node {
                Node::Element(element) if element.name == BOOK => Some((pos, element)),
                _ => None,
            })
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.push_element(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), CodecError> {
    let start = BytesStart::new(element.name.as_str()).with_attributes(
        element
            .attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Returns the key of a `<book>` node; a missing `<isbn>` reads as empty
pub fn book_key(element: &Element) -> String {
    element.child(ISBN).map(Element::text).unwrap_or_default()
}

/// Encodes a book as a `<book>` element
pub fn encode_book(book: &Book) -> Element {
    let mut element = Element::new(BOOK);
    if !book.category.is_empty() {
        element.set_attribute(ATTR_CATEGORY, &book.category);
    }
    if let Some(cover) = &book.cover {
        element.set_attribute(ATTR_COVER, cover);
    }

    let mut title = Element::with_text(TITLE, &book.title);
    if let Some(lang) = &book.title_lang {
        title.set_attribute(ATTR_LANG, lang);
    }

    element.push_element(Element::with_text(ISBN, &book.isbn));
    element.push_element(title);
    for author in &book.authors {
        element.push_element(Element::with_text(AUTHOR, author));
    }
    element.push_element(Element::with_text(YEAR, &book.year.to_string()));
    element.push_element(Element::with_text(PRICE, &book.price.to_string()));
    element
}

/// Decodes a `<book>` element.
///
/// Missing year and price read as zero and missing optional attributes as
/// `None`. Year or price text that does not parse is an error.
pub fn decode_book(element: &Element) -> Result<Book, CodecError> {
    let title = element.child(TITLE);

    Ok(Book {
        isbn: book_key(element),
        title: title.map(Element::text).unwrap_or_default(),
        authors: element.elements_named(AUTHOR).map(Element::text).collect(),
        category: element
            .attribute(ATTR_CATEGORY)
            .unwrap_or_default()
            .to_string(),
        year: parse_number(element, YEAR)?.unwrap_or(0),
        price: parse_number(element, PRICE)?.unwrap_or(Decimal::ZERO),
        cover: element.attribute(ATTR_COVER).map(str::to_string),
        title_lang: title
            .and_then(|t| t.attribute(ATTR_LANG))
            .map(str::to_string),
    })
}

fn parse_number<T: FromStr>(element: &Element, field: &'static str) -> Result<Option<T>, CodecError> {
    let Some(child) = element.child(field) else {
        return Ok(None);
    };
    let value = child.text();
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| CodecError::InvalidNumber { field, value })
}

/// Encodes books into a fresh document, in order
pub fn encode(books: &[Book]) -> Document {
    let mut document = Document::empty();
    for book in books {
        document.root.push_element(encode_book(book));
    }
    document
}

/// Decodes every `<book>` node, skipping malformed ones
pub fn decode(document: &Document) -> Vec<Book> {
    document
        .book_nodes()
        .filter_map(|(pos, element)| match decode_book(element) {
            Ok(book) => Some(book),
            Err(e) => {
                tracing::warn!(position = pos, key = %book_key(element), error = %e, "Skipping malformed book node");
                None
            }
        })
        .collect()
}
