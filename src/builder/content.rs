//! Content Builder
//!
//! This module renders one fragment of a book into a standalone XHTML content
//! document: the fragment title becomes the `<h1>` heading and the fragment
//! markup is placed inside `<div class="chapter-content">`.
//!
//! Fragment markup comes from users and is frequently not well-formed XML. It
//! is passed through [sanitize_markup] before being embedded, and if even that
//! fails the markup is kept as escaped text so a page is always produced.
//!
//! ## Usage
//! ```rust
//! # fn main() -> Result<(), epub_packager::error::EpubError> {
//! use epub_packager::builder::content::ContentBuilder;
//!
//! let mut builder = ContentBuilder::new("chapter_1", "en");
//! builder
//!     .set_title("My Chapter")
//!     .set_stylesheet("style.css")
//!     .set_body("<p>It was a dark and stormy night<br>");
//! let page = builder.make()?;
//! assert!(String::from_utf8_lossy(&page).contains("<br/>"));
//! # Ok(())
//! # }
//! ```

use std::{collections::HashSet, io::Cursor};

use html_escape::decode_html_entities;
use log::warn;
use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::EpubError;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// HTML elements that never have content
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Entities predefined by XML itself, which need no resolving
const XML_ENTITIES: [&str; 5] = ["amp", "apos", "gt", "lt", "quot"];

/// Content Builder
///
/// Builds the XHTML page of one fragment.
#[derive(Debug)]
pub struct ContentBuilder {
    /// The manifest id of the content document
    pub id: String,

    language: String,
    title: String,
    stylesheet: Option<String>,
    body: String,
}

impl ContentBuilder {
    /// Creates a new ContentBuilder instance
    ///
    /// ## Parameters
    /// - `id`: The manifest id of the document
    /// - `language`: The language code for the document
    pub fn new(id: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            language: language.to_string(),
            title: String::new(),
            stylesheet: None,
            body: String::new(),
        }
    }

    /// Sets the title of the document
    ///
    /// The title is used both for `<title>` and for the `<h1>` heading.
    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Links a stylesheet, by its href relative to this document
    pub fn set_stylesheet(&mut self, href: &str) -> &mut Self {
        self.stylesheet = Some(href.to_string());
        self
    }

    /// Sets the raw markup of the document body
    pub fn set_body(&mut self, markup: &str) -> &mut Self {
        self.body = markup.to_string();
        self
    }

    /// Renders the content document
    ///
    /// ## Return
    /// - `Ok(Vec<u8>)`: The UTF-8 encoded XHTML page
    /// - `Err(EpubError)`: Writing the page failed
    pub fn make(&self) -> Result<Vec<u8>, EpubError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
        writer.write_event(Event::Start(BytesStart::new("html").with_attributes([
            ("xmlns", "http://www.w3.org/1999/xhtml"),
            ("xmlns:epub", "http://www.idpf.org/2007/ops"),
            ("xml:lang", self.language.as_str()),
            ("lang", self.language.as_str()),
        ])))?;

        self.make_head(&mut writer)?;
        self.make_body(&mut writer)?;

        writer.write_event(Event::End(BytesEnd::new("html")))?;

        Ok(writer.into_inner().into_inner())
    }

    fn make_head(&self, writer: &mut XmlWriter) -> Result<(), EpubError> {
        writer.write_event(Event::Start(BytesStart::new("head")))?;
        writer.write_event(Event::Start(BytesStart::new("title")))?;
        writer.write_event(Event::Text(BytesText::new(&xml_safe(&self.title))))?;
        writer.write_event(Event::End(BytesEnd::new("title")))?;

        if let Some(stylesheet) = &self.stylesheet {
            writer.write_event(Event::Empty(BytesStart::new("link").with_attributes([
                ("rel", "stylesheet"),
                ("type", "text/css"),
                ("href", stylesheet.as_str()),
            ])))?;
        }

        writer.write_event(Event::End(BytesEnd::new("head")))?;
        Ok(())
    }

    fn make_body(&self, writer: &mut XmlWriter) -> Result<(), EpubError> {
        writer.write_event(Event::Start(BytesStart::new("body")))?;

        writer.write_event(Event::Start(BytesStart::new("h1")))?;
        writer.write_event(Event::Text(BytesText::new(&xml_safe(&self.title))))?;
        writer.write_event(Event::End(BytesEnd::new("h1")))?;

        writer.write_event(Event::Start(
            BytesStart::new("div").with_attributes([("class", "chapter-content")]),
        ))?;

        if self.body.trim().is_empty() {
            Self::make_placeholder(writer)?;
        } else {
            match sanitize_markup(&self.body) {
                Ok(markup) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(markup)))?;
                }
                Err(err) => {
                    warn!(
                        "The content of '{}' could not be parsed ({}), embedding it as plain text.",
                        self.id, err
                    );

                    writer.write_event(Event::Start(BytesStart::new("p")))?;
                    writer.write_event(Event::Text(BytesText::new(&xml_safe(&self.body))))?;
                    writer.write_event(Event::End(BytesEnd::new("p")))?;
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new("div")))?;
        writer.write_event(Event::End(BytesEnd::new("body")))?;
        Ok(())
    }

    /// Keeps an empty chapter from rendering as an empty page element
    fn make_placeholder(writer: &mut XmlWriter) -> Result<(), EpubError> {
        writer.write_event(Event::Start(
            BytesStart::new("p").with_attributes([("class", "placeholder")]),
        ))?;
        writer.write_event(Event::Text(BytesText::new("\u{a0}")))?;
        writer.write_event(Event::End(BytesEnd::new("p")))?;
        Ok(())
    }
}

/// Re-serializes HTML-ish markup as well-formed XHTML
///
/// The pass is lenient: bare `&` are escaped, HTML named entities become
/// characters, element and attribute names are lowercased, void elements are
/// self-closed, end tags without a matching start tag are dropped and elements
/// left open are closed at the end. Prefixed elements lose their tags but keep
/// their content. Comments, processing instructions and doctypes are removed.
///
/// ## Return
/// - `Ok(String)`: The well-formed markup
/// - `Err(EpubError)`: The markup could not be tokenized at all, for example
///   because it ends inside a tag
pub fn sanitize_markup(markup: &str) -> Result<String, EpubError> {
    let escaped = escape_bare_ampersands(markup);

    let mut reader = Reader::from_str(&escaped);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut open_elements = Vec::<String>::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,

            Event::Start(element) => {
                let name = element_name(&element);
                if is_foreign_name(&name) {
                    continue;
                }
                if !is_valid_name(&name) {
                    let raw = format!("<{}>", String::from_utf8_lossy(&element));
                    writer.write_event(Event::Text(BytesText::new(&xml_safe(&raw))))?;
                    continue;
                }

                let start = rebuild_start(&element, &name);
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    open_elements.push(name);
                }
            }

            Event::Empty(element) => {
                let name = element_name(&element);
                if is_foreign_name(&name) {
                    continue;
                }
                if !is_valid_name(&name) {
                    let raw = format!("<{}/>", String::from_utf8_lossy(&element));
                    writer.write_event(Event::Text(BytesText::new(&xml_safe(&raw))))?;
                    continue;
                }

                writer.write_event(Event::Empty(rebuild_start(&element, &name)))?;
            }

            Event::End(element) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).to_lowercase();

                // close everything opened after the matching start tag
                if let Some(position) = open_elements.iter().rposition(|open| *open == name) {
                    for open in open_elements.drain(position..).rev() {
                        writer.write_event(Event::End(BytesEnd::new(open)))?;
                    }
                }
            }

            Event::Text(text) => {
                let text = String::from_utf8_lossy(&text);
                writer.write_event(Event::Text(BytesText::new(&xml_safe(&text))))?;
            }

            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata);
                writer.write_event(Event::Text(BytesText::new(&xml_safe(&text))))?;
            }

            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference).to_string();
                write_reference(&mut writer, &name)?;
            }

            // Comment, PI, Decl, DocType
            _ => {}
        }
    }

    for open in open_elements.into_iter().rev() {
        writer.write_event(Event::End(BytesEnd::new(open)))?;
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn write_reference(writer: &mut XmlWriter, name: &str) -> Result<(), EpubError> {
    if XML_ENTITIES.contains(&name) {
        writer.write_event(Event::Text(BytesText::from_escaped(format!("&{};", name))))?;
        return Ok(());
    }

    let reference = format!("&{};", name);
    let decoded = decode_html_entities(&reference);

    // unknown entities are kept as literal text
    writer.write_event(Event::Text(BytesText::new(&xml_safe(&decoded))))?;
    Ok(())
}

fn element_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).to_lowercase()
}

/// Copies the attributes of an element, normalized for XHTML
///
/// HTML-style attributes (unquoted or without value) are accepted. Names are
/// lowercased, values have their entities resolved and are re-escaped on
/// write. Invalid and repeated attributes are dropped.
fn rebuild_start(element: &BytesStart, name: &str) -> BytesStart<'static> {
    let mut start = BytesStart::new(name.to_string());
    let mut seen = HashSet::new();

    for attribute in element.html_attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_lowercase();
        if !is_valid_attribute_name(&key) || !seen.insert(key.clone()) {
            continue;
        }

        let raw_value = String::from_utf8_lossy(&attribute.value);
        let value = xml_safe(&decode_html_entities(&raw_value));
        start.push_attribute((key.as_str(), value.as_str()));
    }

    start
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }
        _ => false,
    }
}

/// Prefixed element names, like the `o:p` of office exports
///
/// The prefix is never declared by the page, so the tag itself is dropped
/// while its content is kept.
fn is_foreign_name(name: &str) -> bool {
    name.split_once(':')
        .is_some_and(|(prefix, local)| is_valid_name(prefix) && is_valid_name(local))
}

/// Attribute names may carry the `xml` or `epub` prefix, both declared by the page
fn is_valid_attribute_name(name: &str) -> bool {
    if name.starts_with("xmlns") {
        return false;
    }

    match name.split_once(':') {
        Some((prefix, local)) => matches!(prefix, "xml" | "epub") && is_valid_name(local),
        None => is_valid_name(name),
    }
}

/// Escapes every `&` that does not start a character or entity reference
pub(crate) fn escape_bare_ampersands(markup: &str) -> String {
    let mut result = String::with_capacity(markup.len());

    for (index, c) in markup.char_indices() {
        if c == '&' && !starts_with_reference(&markup[index + 1..]) {
            result.push_str("&amp;");
        } else {
            result.push(c);
        }
    }

    result
}

fn starts_with_reference(rest: &str) -> bool {
    let Some(end) = rest.find(';') else {
        return false;
    };

    let name = &rest[..end];
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(decimal) = name.strip_prefix('#') {
        !decimal.is_empty() && decimal.chars().all(|c| c.is_ascii_digit())
    } else {
        is_valid_name(name)
    }
}

/// Removes characters that are not allowed in XML 1.0 documents
pub(crate) fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(c, '\t' | '\n' | '\r')
                || ('\u{20}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || c >= '\u{10000}'
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::content::{ContentBuilder, escape_bare_ampersands, sanitize_markup, xml_safe},
        utils::tests::assert_well_formed,
    };

    fn render(body: &str) -> String {
        let mut builder = ContentBuilder::new("chapter_1", "en");
        builder
            .set_title("Chapter One")
            .set_stylesheet("style.css")
            .set_body(body);

        let page = builder.make().unwrap();
        assert_well_formed(&page);
        String::from_utf8(page).unwrap()
    }

    #[test]
    fn test_page_structure() {
        let page = render("<p>Hello</p>");

        assert!(page.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(page.contains("<!DOCTYPE html>"));
        assert!(page.contains(r#"xmlns="http://www.w3.org/1999/xhtml""#));
        assert!(page.contains(r#"xmlns:epub="http://www.idpf.org/2007/ops""#));
        assert!(page.contains(r#"xml:lang="en" lang="en""#));
        assert!(page.contains("<title>Chapter One</title>"));
        assert!(page.contains(r#"<link rel="stylesheet" type="text/css" href="style.css"/>"#));
        assert!(page.contains("<h1>Chapter One</h1>"));
        assert!(page.contains(r#"<div class="chapter-content"><p>Hello</p></div>"#));
    }

    #[test]
    fn test_title_is_escaped() {
        let mut builder = ContentBuilder::new("chapter_1", "en");
        builder.set_title("Cats & <Dogs>").set_body("text");

        let page = String::from_utf8(builder.make().unwrap()).unwrap();
        assert!(page.contains("<h1>Cats &amp; &lt;Dogs&gt;</h1>"));
    }

    #[test]
    fn test_empty_body_placeholder() {
        let page = render("   \n\t ");
        assert!(page.contains("<p class=\"placeholder\">\u{a0}</p>"));
    }

    #[test]
    fn test_unclosed_paragraph() {
        let page = render("<p>text");
        assert!(page.contains("<p>text</p>"));
    }

    #[test]
    fn test_unterminated_tag_falls_back_to_text() {
        let page = render("<p>broken <b");
        assert!(page.contains("&lt;p&gt;broken &lt;b"));
    }

    #[test]
    fn test_sanitize_void_and_case() {
        assert_eq!(
            sanitize_markup("<P>line<BR>next<img src=a.png alt=''></P>").unwrap(),
            r#"<p>line<br/>next<img src="a.png" alt=""/></p>"#
        );
    }

    #[test]
    fn test_sanitize_stray_and_misnested_tags() {
        assert_eq!(
            sanitize_markup("</div><p><b>bold</p> tail</b>").unwrap(),
            "<p><b>bold</b></p> tail"
        );
    }

    #[test]
    fn test_sanitize_entities() {
        assert_eq!(
            sanitize_markup("Fish & Chips&nbsp;&copy; &amp; &#169; &bogus;").unwrap(),
            "Fish &amp; Chips\u{a0}\u{a9} &amp; \u{a9} &amp;bogus;"
        );
    }

    #[test]
    fn test_sanitize_drops_comments_and_bad_attributes() {
        assert_eq!(
            sanitize_markup(
                r#"<!-- note --><p class="a" CLASS="b" xmlns:o="x" o:x="1" epub:type="bodymatter">t</p>"#
            )
            .unwrap(),
            r#"<p class="a" epub:type="bodymatter">t</p>"#
        );
    }

    #[test]
    fn test_sanitize_unwraps_prefixed_elements() {
        assert_eq!(
            sanitize_markup("<p class=MsoNormal>Hello<o:p></o:p></p>").unwrap(),
            r#"<p class="MsoNormal">Hello</p>"#
        );
        assert_eq!(
            sanitize_markup("<p>in <st1:place>Paris</st1:place><v:shape/></p>").unwrap(),
            "<p>in Paris</p>"
        );
    }

    #[test]
    fn test_sanitize_cdata_is_escaped() {
        assert_eq!(
            sanitize_markup("<p><![CDATA[a < b]]></p>").unwrap(),
            "<p>a &lt; b</p>"
        );
    }

    #[test]
    fn test_escape_bare_ampersands() {
        assert_eq!(
            escape_bare_ampersands("a & b &amp; &#38; &#x26; &; &x y;"),
            "a &amp; b &amp; &#38; &#x26; &amp;; &amp;x y;"
        );
    }

    #[test]
    fn test_xml_safe() {
        assert_eq!(xml_safe("a\u{0}b\u{c}c\td"), "abc\td");
    }
}
