use std::path::PathBuf;

use crate::{
    error::{Diagnostic, EpubBuilderError, EpubError},
    utils::is_contained_path,
};

pub(crate) const DEFAULT_AUTHOR: &str = "Unknown Author";
pub(crate) const DEFAULT_LANGUAGE: &str = "en";
pub(crate) const NATIVE_FORMAT: &str = "epub";

#[derive(Debug, PartialEq, Eq)]
pub enum EpubVersion {
    Version2_0,
    Version3_0,
}

/// Descriptive information about the book being generated
///
/// Only the title is mandatory. The author and language fall back to
/// `"Unknown Author"` and `"en"`; a missing identifier is replaced by a
/// generated value when the book is packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BookMetadata {
    pub title: String,

    #[cfg_attr(feature = "serde", serde(default = "default_author"))]
    pub author: String,

    /// BCP-47 style language code, such as "en" or "zh-CN"
    #[cfg_attr(feature = "serde", serde(default = "default_language"))]
    pub language: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub publisher: Option<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,

    /// Cover image reference
    ///
    /// Either a `data:<mime>;base64,<payload>` URI or a bare base64 string.
    /// Remote URLs are accepted but never fetched.
    #[cfg_attr(feature = "serde", serde(default, alias = "cover_image"))]
    pub cover_image: Option<String>,

    #[cfg_attr(feature = "serde", serde(default, alias = "isbn"))]
    pub identifier: Option<String>,
}

impl BookMetadata {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            author: default_author(),
            language: default_language(),
            publisher: None,
            description: None,
            cover_image: None,
            identifier: None,
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_publisher(mut self, publisher: &str) -> Self {
        self.publisher = Some(publisher.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_cover_image(mut self, cover_image: &str) -> Self {
        self.cover_image = Some(cover_image.to_string());
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// One unit of book content, usually a chapter
///
/// `content` is raw HTML markup and may be malformed or empty. Fragments are
/// arranged by a stable sort on `order`, so fragments sharing the same order
/// keep the sequence in which they were supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fragment {
    pub title: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub content: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub order: i64,
}

impl Fragment {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            order: 0,
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }
}

/// Output format requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// EPUB, produced natively
    Epub,

    /// A Kindle format (MOBI, AZW3, ...)
    ///
    /// Kindle formats are not produced directly; an EPUB is generated instead
    /// and the caller is told to convert it with an external tool.
    Kindle(String),

    /// Any other format, which cannot be produced
    Unsupported(String),
}

impl OutputFormat {
    /// Parses a format name, ignoring case and surrounding whitespace
    pub fn parse(format: &str) -> Self {
        let normalized = format.trim().to_lowercase();
        match normalized.as_str() {
            "epub" | "epub3" => OutputFormat::Epub,
            "mobi" | "azw3" | "azw" | "kf8" => OutputFormat::Kindle(normalized),
            _ => OutputFormat::Unsupported(format.to_string()),
        }
    }
}

/// A request to generate one book
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GenerationRequest {
    pub metadata: BookMetadata,

    #[cfg_attr(feature = "serde", serde(alias = "chapters"))]
    pub fragments: Vec<Fragment>,

    #[cfg_attr(feature = "serde", serde(default = "default_format"))]
    pub format: String,

    /// Emit an XHTML navigation document (and an EPUB 3 package)
    ///
    /// When both this and `enable_nav` are false the book is still EPUB 3
    /// with a navigation document, because EPUB 2 requires the NCX.
    #[cfg_attr(feature = "serde", serde(default = "default_true", alias = "enable_toc"))]
    pub enable_toc: bool,

    /// Emit the legacy NCX navigation file
    #[cfg_attr(
        feature = "serde",
        serde(default = "default_true", alias = "enable_nav", alias = "enable_ncx")
    )]
    pub enable_nav: bool,
}

impl GenerationRequest {
    pub fn new(metadata: BookMetadata, fragments: Vec<Fragment>) -> Self {
        Self {
            metadata,
            fragments,
            format: default_format(),
            enable_toc: true,
            enable_nav: true,
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn with_toc(mut self, enable_toc: bool) -> Self {
        self.enable_toc = enable_toc;
        self
    }

    pub fn with_nav(mut self, enable_nav: bool) -> Self {
        self.enable_nav = enable_nav;
        self
    }
}

fn default_format() -> String {
    NATIVE_FORMAT.to_string()
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

/// The outcome of one generation
///
/// Failures are reported through `success` and `message`; `file_data` and
/// `size_bytes` are only present on success.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GenerationResponse {
    pub success: bool,
    pub message: String,

    /// The EPUB container; serialized as standard base64
    #[cfg_attr(
        feature = "serde",
        serde(
            serialize_with = "crate::utils::serialize_base64",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub file_data: Option<Vec<u8>>,

    pub filename: String,

    /// The format actually produced, or the requested one on failure
    pub format: String,

    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub size_bytes: Option<usize>,

    #[cfg_attr(
        feature = "serde",
        serde(serialize_with = "crate::utils::serialize_diagnostics")
    )]
    pub warnings: Vec<Diagnostic>,
}

impl GenerationResponse {
    pub(crate) fn failure(message: String, format: &str, warnings: Vec<Diagnostic>) -> Self {
        Self {
            success: false,
            message,
            file_data: None,
            filename: String::new(),
            format: format.to_string(),
            size_bytes: None,
            warnings,
        }
    }
}

/// Represents a metadata item in the EPUB publication
///
/// Items whose property belongs to the Dublin Core vocabulary are written as
/// `dc:*` elements; everything else becomes a `meta` element.
#[derive(Debug, Clone)]
pub struct MetadataItem {
    /// Optional unique identifier for this metadata item
    ///
    /// Refinements point at their parent through this id.
    pub id: Option<String>,

    /// The metadata property name
    ///
    /// Common properties include "title", "creator", "identifier", "language",
    /// "publisher" or EPUB 3 properties such as "dcterms:modified".
    pub property: String,

    pub value: String,

    pub lang: Option<String>,

    /// Refinements of this metadata item (EPUB 3 only)
    pub refined: Vec<MetadataRefinement>,
}

impl MetadataItem {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            id: None,
            property: property.to_string(),
            value: value.to_string(),
            lang: None,
            refined: vec![],
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = Some(lang.to_string());
        self
    }

    /// Attaches a refinement; the item must have an id for it to be written
    pub fn append_refinement(mut self, refinement: MetadataRefinement) -> Self {
        self.refined.push(refinement);
        self
    }

    /// Attributes of the element, `property` included only for `meta` elements
    pub(crate) fn attributes(&self, is_meta: bool) -> Vec<(&str, String)> {
        let mut attributes = Vec::new();

        if let Some(id) = &self.id {
            attributes.push(("id", id.clone()));
        }
        if is_meta {
            attributes.push(("property", self.property.clone()));
        }
        if let Some(lang) = &self.lang {
            attributes.push(("xml:lang", lang.clone()));
        }

        attributes
    }
}

/// Represents a refinement of a metadata item in an EPUB 3.0 publication
///
/// For example, a creator can be refined with the MARC relator role `aut`.
#[derive(Debug, Clone)]
pub struct MetadataRefinement {
    /// The refined item id, without the leading `#`
    pub refines: String,

    pub property: String,

    pub value: String,

    /// Optional scheme, such as "marc:relators"
    pub scheme: Option<String>,
}

impl MetadataRefinement {
    pub fn new(refines: &str, property: &str, value: &str) -> Self {
        Self {
            refines: refines.to_string(),
            property: property.to_string(),
            value: value.to_string(),
            scheme: None,
        }
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = Some(scheme.to_string());
        self
    }

    pub(crate) fn attributes(&self) -> Vec<(&str, String)> {
        let mut attributes = vec![
            ("refines", format!("#{}", self.refines)),
            ("property", self.property.clone()),
        ];

        if let Some(scheme) = &self.scheme {
            attributes.push(("scheme", scheme.clone()));
        }

        attributes
    }
}

/// Represents a resource item declared in the EPUB manifest
///
/// Every file of the container except `mimetype`, `container.xml` and the
/// package document itself is declared here. `path` is relative to the
/// directory of the package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// Unique id of the resource within the manifest
    pub id: String,

    pub path: PathBuf,

    /// The media type of the resource
    pub mime: String,

    /// Optional space-separated properties, such as "nav" or "cover-image"
    pub properties: Option<String>,
}

impl ManifestItem {
    /// Creates a manifest item
    ///
    /// The path must stay inside the package directory: absolute paths and
    /// paths with a `..` segment are rejected.
    pub fn new(id: &str, path: &str) -> Result<Self, EpubError> {
        if path.is_empty() || !is_contained_path(path) {
            return Err(EpubBuilderError::IllegalManifestPath {
                manifest_id: id.to_string(),
            }
            .into());
        }

        Ok(Self {
            id: id.to_string(),
            path: PathBuf::from(path),
            mime: String::new(),
            properties: None,
        })
    }

    pub fn with_mime(mut self, mime: &str) -> Self {
        self.mime = mime.to_string();
        self
    }

    pub fn append_property(mut self, property: &str) -> Self {
        self.properties = match self.properties {
            Some(properties) => Some(format!("{} {}", properties, property)),
            None => Some(property.to_string()),
        };
        self
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|properties| properties.split_whitespace().any(|p| p == property))
    }

    /// The path as written in `href` attributes, always with `/` separators
    pub fn href(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    pub(crate) fn attributes(&self) -> Vec<(&str, String)> {
        let mut attributes = vec![
            ("id", self.id.clone()),
            ("href", self.href()),
            ("media-type", self.mime.clone()),
        ];

        if let Some(properties) = &self.properties {
            attributes.push(("properties", properties.clone()));
        }

        attributes
    }
}

/// Represents an item in the EPUB spine, defining the reading order of the publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    /// The ID reference to a manifest item
    pub idref: String,

    /// Optional identifier for this spine item
    pub id: Option<String>,

    pub properties: Option<String>,

    /// Whether this item is part of the linear reading order
    pub linear: bool,
}

impl SpineItem {
    pub fn new(idref: &str) -> Self {
        Self {
            idref: idref.to_string(),
            id: None,
            properties: None,
            linear: true,
        }
    }

    pub(crate) fn attributes(&self) -> Vec<(&str, String)> {
        let mut attributes = vec![("idref", self.idref.clone())];

        if let Some(id) = &self.id {
            attributes.push(("id", id.clone()));
        }
        if let Some(properties) = &self.properties {
            attributes.push(("properties", properties.clone()));
        }
        if !self.linear {
            attributes.push(("linear", "no".to_string()));
        }

        attributes
    }
}

/// Represents a navigation point in an EPUB document's table of contents
///
/// Navigation points compare and sort by their play order only.
#[derive(Debug, Eq, Clone)]
pub struct NavPoint {
    /// The display label/title of this navigation point
    pub label: String,

    /// The content document path this navigation point references
    pub content: Option<PathBuf>,

    /// Child navigation points (sub-sections)
    pub children: Vec<NavPoint>,

    /// The reading order position of this navigation point, starting at 1
    pub play_order: Option<usize>,
}

impl NavPoint {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            content: None,
            children: vec![],
            play_order: None,
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(PathBuf::from(content));
        self
    }

    pub fn with_play_order(mut self, play_order: usize) -> Self {
        self.play_order = Some(play_order);
        self
    }

    pub fn append_child(mut self, child: NavPoint) -> Self {
        self.children.push(child);
        self
    }
}

impl Ord for NavPoint {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.play_order.cmp(&other.play_order)
    }
}

impl PartialOrd for NavPoint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NavPoint {
    fn eq(&self, other: &Self) -> bool {
        self.play_order == other.play_order
    }
}

#[cfg(test)]
mod tests {
    mod navpoint_tests {
        use std::path::PathBuf;

        use crate::types::NavPoint;

        /// Testing the equality comparison of NavPoint
        #[test]
        fn test_navpoint_partial_eq() {
            let nav1 = NavPoint::new("Chapter 1")
                .with_content("chapter_1.xhtml")
                .with_play_order(1);
            let nav2 = NavPoint::new("Chapter 1")
                .with_content("chapter_2.xhtml")
                .with_play_order(1);
            let nav3 = NavPoint::new("Chapter 2")
                .with_content("chapter_1.xhtml")
                .with_play_order(2);

            assert_eq!(nav1, nav2);
            assert_ne!(nav1, nav3);
        }

        #[test]
        fn test_navpoint_ord() {
            let nav1 = NavPoint::new("Chapter 1").with_play_order(1);
            let nav2 = NavPoint::new("Chapter 2").with_play_order(2);
            let nav3 = NavPoint::new("Chapter 3").with_play_order(3);

            assert!(nav1 < nav2);
            assert!(nav2 > nav1);

            let mut nav_points = vec![nav2.clone(), nav3.clone(), nav1.clone()];
            nav_points.sort();
            assert_eq!(nav_points, vec![nav1, nav2, nav3]);
        }

        /// A missing play order sorts before any present one
        #[test]
        fn test_navpoint_ord_with_none_play_order() {
            let nav_with_order = NavPoint::new("Chapter 1").with_play_order(1);
            let nav_without_order = NavPoint::new("Preface");

            assert!(nav_without_order < nav_with_order);
            assert!(nav_without_order == NavPoint::new("Introduction"));
        }

        #[test]
        fn test_navpoint_with_children() {
            let parent = NavPoint::new("Part 1")
                .with_content("part_1.xhtml")
                .append_child(NavPoint::new("Chapter 1").with_content("chapter_1.xhtml"));

            assert_eq!(parent.children.len(), 1);
            assert_eq!(
                parent.children[0].content,
                Some(PathBuf::from("chapter_1.xhtml"))
            );
        }
    }

    mod manifest_tests {
        use crate::{
            error::{EpubBuilderError, EpubError},
            types::ManifestItem,
        };

        #[test]
        fn test_manifest_item_rejects_escaping_paths() {
            let result = ManifestItem::new("bad", "../outside.xhtml");
            assert_eq!(
                result.unwrap_err(),
                EpubError::EpubBuilderError {
                    source: EpubBuilderError::IllegalManifestPath {
                        manifest_id: "bad".to_string()
                    }
                }
            );

            assert!(ManifestItem::new("abs", "/root.xhtml").is_err());
            assert!(ManifestItem::new("inner", "cover.a/../../../evil").is_err());
            assert!(ManifestItem::new("windows", "text\\..\\..\\evil.xhtml").is_err());
            assert!(ManifestItem::new("empty", "").is_err());
            assert!(ManifestItem::new("ok", "text/chapter_1.xhtml").is_ok());
        }

        #[test]
        fn test_manifest_item_properties() {
            let item = ManifestItem::new("cover-image", "cover.png")
                .unwrap()
                .with_mime("image/png")
                .append_property("cover-image")
                .append_property("svg");

            assert_eq!(item.properties.as_deref(), Some("cover-image svg"));
            assert!(item.has_property("cover-image"));
            assert!(!item.has_property("nav"));
            assert_eq!(item.href(), "cover.png");
        }
    }

    mod format_tests {
        use crate::types::OutputFormat;

        #[test]
        fn test_output_format_parse() {
            assert_eq!(OutputFormat::parse("EPUB"), OutputFormat::Epub);
            assert_eq!(
                OutputFormat::parse(" mobi "),
                OutputFormat::Kindle("mobi".to_string())
            );
            assert_eq!(
                OutputFormat::parse("AZW3"),
                OutputFormat::Kindle("azw3".to_string())
            );
            assert_eq!(
                OutputFormat::parse("pdf"),
                OutputFormat::Unsupported("pdf".to_string())
            );
        }
    }

    #[cfg(feature = "serde")]
    mod serde_tests {
        use crate::types::GenerationRequest;

        #[test]
        fn test_request_defaults_from_json() {
            let request: GenerationRequest = serde_json::from_str(
                r#"{
                    "metadata": { "title": "Minimal" },
                    "chapters": [ { "title": "One", "content": "<p>1</p>" } ]
                }"#,
            )
            .unwrap();

            assert_eq!(request.metadata.author, "Unknown Author");
            assert_eq!(request.metadata.language, "en");
            assert_eq!(request.format, "epub");
            assert!(request.enable_toc);
            assert!(request.enable_nav);
            assert_eq!(request.fragments[0].order, 0);
        }

        #[test]
        fn test_request_snake_case_aliases() {
            let request: GenerationRequest = serde_json::from_str(
                r#"{
                    "metadata": { "title": "T", "cover_image": "abc", "isbn": "978-0" },
                    "fragments": [ { "title": "One", "content": "", "order": 3 } ],
                    "format": "mobi",
                    "enable_toc": false,
                    "enable_ncx": false
                }"#,
            )
            .unwrap();

            assert_eq!(request.metadata.cover_image.as_deref(), Some("abc"));
            assert_eq!(request.metadata.identifier.as_deref(), Some("978-0"));
            assert!(!request.enable_toc);
            assert!(!request.enable_nav);
            assert_eq!(request.fragments[0].order, 3);
        }
    }
}
