use std::{
    collections::HashMap,
    io::{Read, Seek},
    path::{Component, Path},
};

use chrono::Local;
use html_escape::decode_html_entities;
use quick_xml::{NsReader, events::Event};
use zip::{CompressionMethod, ZipArchive};

use crate::error::EpubError;

/// The exact content of the `mimetype` entry of every EPUB container
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

pub static ELEMENT_IN_DC_NAMESPACE: std::sync::LazyLock<Vec<&str>> =
    std::sync::LazyLock::new(|| {
        vec![
            "contributor",
            "coverage",
            "creator",
            "date",
            "description",
            "format",
            "identifier",
            "language",
            "publisher",
            "relation",
            "rights",
            "source",
            "subject",
            "title",
            "type",
        ]
    });

/// Generates a publication identifier from the current local time
///
/// The value has the form `id-<YYYYmmddHHMMSS><nanoseconds>`, which is
/// unique enough within one generation call.
pub fn generate_identifier() -> String {
    format!("id-{}", Local::now().format("%Y%m%d%H%M%S%f"))
}

/// Builds the download file name for a book title
///
/// Surrounding whitespace is trimmed, spaces and path separators are
/// replaced with `_` and the extension is appended. An empty title yields
/// `book.<extension>`.
pub fn make_filename(title: &str, extension: &str) -> String {
    let stem = title
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect::<String>();

    if stem.is_empty() {
        format!("book.{}", extension)
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Checks that a relative path can never leave the directory it is joined to
///
/// Absolute paths and `..` segments anywhere in the path are refused, with
/// both `/` and `\` treated as separators.
pub(crate) fn is_contained_path(path: &str) -> bool {
    if path.starts_with(['/', '\\']) || path.split(['/', '\\']).any(|segment| segment == "..") {
        return false;
    }

    Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Extracts the contents of a specified file from a ZIP archive
///
/// ## Parameters
/// - `zip_file`: A mutable reference to a ZIP archive object
/// - `file_name`: The path to the file to extract (relative to the ZIP archive root directory)
///
/// ## Return
/// - `Ok(Vec<u8>)`: The raw bytes of the file
/// - `Err(EpubError)`: The file does not exist or an error occurred during the read operation
///
/// ## Notes
/// - For text files, further decoding using the `DecodeBytes` trait is usually required.
pub fn get_file_in_zip_archive<R: Read + Seek>(
    zip_file: &mut ZipArchive<R>,
    file_name: &str,
) -> Result<Vec<u8>, EpubError> {
    let mut buffer = Vec::<u8>::new();
    match zip_file.by_name(file_name) {
        Ok(mut file) => {
            let _ = file.read_to_end(&mut buffer).map_err(EpubError::from)?;
            Ok(buffer)
        }
        Err(err) => Err(EpubError::from(err)),
    }
}

/// Checks if the compression method of all entries in the EPUB file
/// conforms to the OCF container rules.
///
/// According to the OCF (Open Container Format) specification, EPUB files
/// can only use either Stored (uncompressed) or Deflated (deflate compression).
/// If any other compression method is found, an error will be returned.
pub fn compression_method_check<R: Read + Seek>(
    zip_archive: &mut ZipArchive<R>,
) -> Result<(), EpubError> {
    for index in 0..zip_archive.len() {
        let file = zip_archive.by_index(index)?;

        match file.compression() {
            CompressionMethod::Stored | CompressionMethod::Deflated => continue,
            _ => {
                return Err(EpubError::UnusableCompressionMethod {
                    file: file.name().to_string(),
                    method: file.compression().to_string(),
                });
            }
        };
    }

    Ok(())
}

/// Checks the `mimetype` signature entry of an EPUB container
///
/// The first entry must be named `mimetype`, must be stored without
/// compression, and must contain exactly `application/epub+zip`.
pub fn mimetype_entry_check<R: Read + Seek>(
    zip_archive: &mut ZipArchive<R>,
) -> Result<(), EpubError> {
    if zip_archive.len() == 0 {
        return Err(EpubError::InvalidMimetype {
            reason: "the container has no entries".to_string(),
        });
    }

    let mut file = zip_archive.by_index(0)?;
    if file.name() != "mimetype" {
        return Err(EpubError::InvalidMimetype {
            reason: format!("the first entry is '{}'", file.name()),
        });
    }
    if file.compression() != CompressionMethod::Stored {
        return Err(EpubError::InvalidMimetype {
            reason: format!("the entry is compressed with {}", file.compression()),
        });
    }

    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    if content != EPUB_MIMETYPE.as_bytes() {
        return Err(EpubError::InvalidMimetype {
            reason: format!(
                "unexpected content '{}'",
                String::from_utf8_lossy(&content)
            ),
        });
    }

    Ok(())
}

/// Serializes optional binary data as a standard base64 string
#[cfg(feature = "serde")]
pub(crate) fn serialize_base64<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match data {
        Some(data) => serializer.serialize_some(&STANDARD.encode(data)),
        None => serializer.serialize_none(),
    }
}

/// Serializes diagnostics as their display messages
#[cfg(feature = "serde")]
pub(crate) fn serialize_diagnostics<S>(
    diagnostics: &[crate::error::Diagnostic],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(diagnostics.iter().map(|diagnostic| diagnostic.to_string()))
}

/// Provides functionality to decode byte data into strings
///
/// This trait is primarily used to decode raw byte data (such as
/// text files read from EPUB files) into a suitable string representation.
/// It supports automatic detection of multiple encoding formats,
/// including UTF-8 (with or without BOM), UTF-16 BE, and UTF-16 LE.
///
/// ## Notes
/// - When attempting to parse a byte stream lacking a BOM (Byte Order Mark), the parsing
///   results may be unreadable; caution should be exercised when using such streams.
pub trait DecodeBytes {
    fn decode(&self) -> Result<String, EpubError>;
}

impl DecodeBytes for Vec<u8> {
    fn decode(&self) -> Result<String, EpubError> {
        if self.is_empty() || self.len() < 4 {
            return Err(EpubError::EmptyDataError);
        }

        match self[0..3] {
            // Check UTF-8 BOM (0xEF, 0xBB, 0xBF)
            [0xEF, 0xBB, 0xBF, ..] => {
                String::from_utf8(self[3..].to_vec()).map_err(EpubError::from)
            }

            // Check UTF-16 BE BOM (0xFE, 0xFF)
            [0xFE, 0xFF, ..] => {
                let utf16_units: Vec<u16> = self[2..]
                    .chunks_exact(2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]))
                    .collect();

                String::from_utf16(&utf16_units).map_err(EpubError::from)
            }

            // Check UTF-16 LE BOM (0xFF, 0xFE)
            [0xFF, 0xFE, ..] => {
                let utf16_units: Vec<u16> = self[2..]
                    .chunks_exact(2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                    .collect();

                String::from_utf16(&utf16_units).map_err(EpubError::from)
            }

            // Everything this crate writes is UTF-8 without a BOM
            _ => match String::from_utf8(self.to_vec()) {
                Ok(utf8_str) => Ok(utf8_str),
                Err(_) => Ok(String::from_utf8_lossy(self).to_string()),
            },
        }
    }
}

/// Provides functionality for normalizing whitespace characters
///
/// Collapses every run of whitespace into a single space and trims both ends.
pub trait NormalizeWhitespace {
    fn normalize_whitespace(&self) -> String;
}

impl NormalizeWhitespace for &str {
    fn normalize_whitespace(&self) -> String {
        self.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl NormalizeWhitespace for String {
    fn normalize_whitespace(&self) -> String {
        self.as_str().normalize_whitespace()
    }
}

/// Represents an element node in an XML document
#[derive(Debug)]
pub struct XmlElement {
    /// The local name of the element(excluding namespace prefix)
    pub name: String,

    /// The namespace prefix of the element
    pub prefix: Option<String>,

    /// The namespace of the element
    pub namespace: Option<String>,

    /// The attributes of the element
    ///
    /// The key is the attribute name, the value is the attribute value
    pub attributes: HashMap<String, String>,

    /// The text content of the element, with entity references resolved
    pub text: Option<String>,

    /// The children of the element
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: String) -> Self {
        Self {
            name,
            prefix: None,
            namespace: None,
            attributes: HashMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Get the full tag name of the element
    ///
    /// If the element has a namespace prefix, return "prefix:name" format;
    /// otherwise, return only the element name.
    pub fn tag_name(&self) -> String {
        if let Some(prefix) = &self.prefix {
            format!("{}:{}", prefix, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Gets the text content of the element and all its child elements
    ///
    /// Leading and trailing whitespace is removed from the result.
    pub fn text(&self) -> String {
        let mut result = String::new();

        if let Some(text_value) = &self.text {
            result.push_str(text_value);
        }

        for child in &self.children {
            result.push_str(&child.text());
        }

        result.trim().to_string()
    }

    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    /// Find all elements with the specified name, the element itself included
    pub fn find_elements_by_name(&self, name: &str) -> impl Iterator<Item = &XmlElement> {
        SearchElementsByNameIter::new(self, name)
    }

    /// Find all elements with the specified name among the child elements of the current element
    pub fn find_children_by_name(&self, name: &str) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }

    fn push_text(&mut self, text: &str) {
        // whitespace between child elements carries nothing
        if self.text.is_none() && text.trim().is_empty() {
            return;
        }
        self.text.get_or_insert_with(String::new).push_str(text);
    }
}

struct SearchElementsByNameIter<'a> {
    elements: Vec<&'a XmlElement>,
    current_index: usize,
    target_name: String,
}

impl<'a> SearchElementsByNameIter<'a> {
    fn new(root: &'a XmlElement, name: &str) -> Self {
        let mut elements = Vec::new();
        Self::collect_elements(root, &mut elements);
        Self {
            elements,
            current_index: 0,
            target_name: name.to_string(),
        }
    }

    fn collect_elements(element: &'a XmlElement, collection: &mut Vec<&'a XmlElement>) {
        collection.push(element);
        for child in &element.children {
            Self::collect_elements(child, collection);
        }
    }
}

impl<'a> Iterator for SearchElementsByNameIter<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        while self.current_index < self.elements.len() {
            let element = self.elements[self.current_index];
            self.current_index += 1;
            if element.name == self.target_name {
                return Some(element);
            }
        }
        None
    }
}

/// XML parser used to parse XML content and build an XML element tree
pub struct XmlReader {}

impl XmlReader {
    /// Parses an XML from string and builds the root element
    ///
    /// ## Parameters
    /// - `content`: The XML string to be parsed
    ///
    /// ## Return
    /// - `Ok(XmlElement)`: The root element of the XML element tree
    /// - `Err(EpubError)`: An error occurred during parsing
    pub fn parse(content: &str) -> Result<XmlElement, EpubError> {
        if content.is_empty() {
            return Err(EpubError::EmptyDataError);
        }

        let mut reader = NsReader::from_str(content);

        let mut buf = Vec::new();
        let mut stack = Vec::<XmlElement>::new();
        let mut root = None;
        let mut namespace_map = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => break,

                Ok(Event::Start(e)) => {
                    let element = Self::make_element(&e, &mut namespace_map);
                    stack.push(element);
                }

                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        // the last element popped off the stack is the root
                        if stack.is_empty() {
                            root = Some(element);
                        } else if let Some(parent) = stack.last_mut() {
                            parent.children.push(element);
                        }
                    }
                }

                Ok(Event::Empty(e)) => {
                    let element = Self::make_element(&e, &mut namespace_map);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }

                Ok(Event::Text(e)) => {
                    if let Some(element) = stack.last_mut() {
                        element.push_text(&String::from_utf8_lossy(e.as_ref()));
                    }
                }

                Ok(Event::CData(e)) => {
                    if let Some(element) = stack.last_mut() {
                        element.push_text(&String::from_utf8_lossy(e.as_ref()));
                    }
                }

                // `&amp;`, `&#160;` and friends arrive as separate events
                Ok(Event::GeneralRef(e)) => {
                    if let Some(element) = stack.last_mut() {
                        let reference = format!("&{};", String::from_utf8_lossy(e.as_ref()));
                        element.push_text(&decode_html_entities(&reference));
                    }
                }

                Err(err) => return Err(err.into()),

                // Comment, PI, Declaration, Doctype
                _ => {}
            }
            buf.clear();
        }

        if let Some(element) = root.as_mut() {
            Self::assign_namespace(element, &namespace_map);
        }

        root.ok_or(EpubError::EmptyDataError)
    }

    /// Parse XML from bytes and builds the root element
    pub fn parse_bytes(bytes: Vec<u8>) -> Result<XmlElement, EpubError> {
        let content = bytes.decode()?;
        Self::parse(&content)
    }

    fn make_element(
        start: &quick_xml::events::BytesStart,
        namespace_map: &mut HashMap<String, String>,
    ) -> XmlElement {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        let mut element = XmlElement::new(name);

        if let Some(prefix) = start.name().prefix() {
            element.prefix = Some(String::from_utf8_lossy(prefix.as_ref()).to_string());
        }

        for attr in start.attributes().flatten() {
            let attr_key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let attr_value =
                decode_html_entities(&String::from_utf8_lossy(&attr.value)).to_string();

            if attr_key == "xmlns" || attr_key.starts_with("xmlns:") {
                match attr_key.split_once(':') {
                    Some((_, prefix)) => namespace_map.insert(prefix.to_string(), attr_value),
                    None => namespace_map.insert(attr_key, attr_value),
                };
                continue;
            }

            element.attributes.insert(attr_key, attr_value);
        }

        element
    }

    fn assign_namespace(element: &mut XmlElement, namespace_map: &HashMap<String, String>) {
        if let Some(prefix) = &element.prefix {
            if let Some(namespace) = namespace_map.get(prefix) {
                element.namespace = Some(namespace.clone());
            }
        } else if let Some(namespace) = namespace_map.get("xmlns") {
            element.namespace = Some(namespace.clone());
        }

        for child in element.children.iter_mut() {
            Self::assign_namespace(child, namespace_map);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use quick_xml::{Reader, events::Event};

    use crate::{
        error::EpubError,
        utils::{
            DecodeBytes, NormalizeWhitespace, XmlReader, generate_identifier, is_contained_path,
            make_filename,
        },
    };

    /// Tokenizes a document with end-name checking and asserts it is balanced
    pub(crate) fn assert_well_formed(document: &[u8]) {
        let text = String::from_utf8(document.to_vec()).expect("document is not UTF-8");
        let mut reader = Reader::from_str(&text);
        let mut depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::End(_)) => depth -= 1,
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => panic!("malformed document: {err}\n{text}"),
            }
        }

        assert_eq!(depth, 0, "unclosed elements in:\n{text}");
    }

    #[test]
    fn test_decode_empty_data() {
        let data = vec![];
        let result = data.decode();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), EpubError::EmptyDataError);
    }

    /// Test data with a length of less than 4 bytes
    #[test]
    fn test_decode_short_data() {
        let data = vec![0xEF, 0xBB];
        let result = data.decode();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), EpubError::EmptyDataError);
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let data: Vec<u8> = vec![0xEF, 0xBB, 0xBF, b'H', b'e', b'l', b'l', b'o'];
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello");
    }

    #[test]
    fn test_decode_utf16_be_with_bom() {
        let data = vec![
            0xFE, 0xFF, // BOM
            0x00, b'H', // H
            0x00, b'e', // e
            0x00, b'l', // l
            0x00, b'l', // l
            0x00, b'o', // o
        ];
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello");
    }

    #[test]
    fn test_decode_utf16_le_with_bom() {
        let data = vec![
            0xFF, 0xFE, // BOM
            b'H', 0x00, // H
            b'e', 0x00, // e
            b'l', 0x00, // l
            b'l', 0x00, // l
            b'o', 0x00, // o
        ];
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello");
    }

    #[test]
    fn test_decode_plain_utf8() {
        let data = b"Hello, World!".to_vec();
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello, World!");
    }

    #[test]
    fn test_normalize_whitespace_trait() {
        let text = "  Hello,\tWorld!\n\nRust  ";
        let normalized = text.normalize_whitespace();
        assert_eq!(normalized, "Hello, World! Rust");

        let text_string = String::from("  Hello,\tWorld!\n\nRust  ");
        let normalized = text_string.normalize_whitespace();
        assert_eq!(normalized, "Hello, World! Rust");
    }

    #[test]
    fn test_is_contained_path() {
        assert!(is_contained_path("chapter_1.xhtml"));
        assert!(is_contained_path("images/./cover.png"));

        assert!(!is_contained_path("cover.a/../../../evil"));
        assert!(!is_contained_path("text/../chapter.xhtml"));
        assert!(!is_contained_path("..\\evil.xhtml"));
        assert!(!is_contained_path("/etc/passwd"));
        assert!(!is_contained_path("\\evil.xhtml"));
    }

    #[test]
    fn test_make_filename() {
        assert_eq!(make_filename("My Great Book", "epub"), "My_Great_Book.epub");
        assert_eq!(make_filename("AC/DC \\ Live", "epub"), "AC_DC___Live.epub");
        assert_eq!(make_filename("   ", "epub"), "book.epub");
        assert_eq!(make_filename("  Padded Title \n", "epub"), "Padded_Title.epub");
    }

    #[test]
    fn test_generate_identifier() {
        let identifier = generate_identifier();
        assert!(identifier.starts_with("id-"));
        assert!(identifier.len() > 3);
    }

    /// Text split by entity references must be joined back, spaces kept
    #[test]
    fn test_xml_reader_text_with_references() {
        let root = XmlReader::parse(
            r#"<root xmlns="urn:test"><title>Fish &amp; Chips &#233;t&#xE9;</title></root>"#,
        )
        .unwrap();

        let title = root.find_elements_by_name("title").next().unwrap();
        assert_eq!(title.text(), "Fish & Chips été");
        assert_eq!(title.namespace.as_deref(), Some("urn:test"));
    }

    #[test]
    fn test_xml_reader_prefixed_elements() {
        let root = XmlReader::parse(
            r#"<package xmlns:dc="http://purl.org/dc/elements/1.1/"><metadata><dc:title>T</dc:title><meta name="cover" content="c"/></metadata></package>"#,
        )
        .unwrap();

        let title = root.find_elements_by_name("title").next().unwrap();
        assert_eq!(title.tag_name(), "dc:title");
        assert_eq!(
            title.namespace.as_deref(),
            Some("http://purl.org/dc/elements/1.1/")
        );

        let meta = root.find_elements_by_name("meta").next().unwrap();
        assert_eq!(meta.get_attr("content").as_deref(), Some("c"));
    }
}
