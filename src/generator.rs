//! Book generation
//!
//! [EpubGenerator] turns a [GenerationRequest] into a [GenerationResponse].
//! A generation moves through the stages of [GenerationStage]: the request is
//! validated, the cover and every fragment are rendered, and the results are
//! packaged into an EPUB container by the [EpubBuilder].
//!
//! Failures never escape as errors or panics. Validation problems, builder
//! errors and even a panic inside the pipeline are reported through
//! `success: false` and a message, while recoverable problems (such as an
//! unusable cover image) are collected as warnings next to a successful result.
//!
//! ## Usage
//!
//! ```rust
//! use epub_packager::{
//!     generator::generate,
//!     types::{BookMetadata, Fragment, GenerationRequest},
//! };
//!
//! let request = GenerationRequest::new(
//!     BookMetadata::new("My Book").with_author("Jane Doe"),
//!     vec![Fragment::new("Chapter 1", "<p>Hello</p>")],
//! );
//!
//! let response = generate(&request);
//! assert!(response.success);
//! assert_eq!(response.filename, "My_Book.epub");
//! ```

use std::{
    cell::Cell,
    panic::{AssertUnwindSafe, catch_unwind},
};

use log::{debug, error, info, warn};

use crate::{
    builder::{
        EpubBuilder, EpubVersion2, EpubVersion3, PackageVersion,
        content::ContentBuilder,
        cover::CoverImage,
        style::{STYLESHEET_HREF, STYLESHEET_MIME, stylesheet},
    },
    error::{Diagnostic, EpubError, ValidationError},
    types::{
        Fragment, GenerationRequest, GenerationResponse, ManifestItem, MetadataItem,
        MetadataRefinement, NATIVE_FORMAT, OutputFormat,
    },
    utils::{generate_identifier, make_filename},
};

const DEFAULT_PACKAGE_DIR: &str = "OEBPS";
const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
const CATALOG_TITLE: &str = "Table of Contents";
const STYLESHEET_ID: &str = "style";

/// The stages a generation passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Validating,
    Rendering,
    Packaging,
    Done,
    Failed,
}

/// Settings shared by every generation of one [EpubGenerator]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Directory of the package document inside the container
    pub package_dir: String,

    /// Deflate level (0-9) of compressed entries; `None` uses the backend default
    pub compression_level: Option<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            package_dir: DEFAULT_PACKAGE_DIR.to_string(),
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
        }
    }
}

/// A fragment rendered into its XHTML page
struct RenderedPage<'a> {
    fragment: &'a Fragment,
    id: String,
    href: String,
    data: Vec<u8>,
}

/// Generates EPUB books
///
/// The generator holds no state besides its configuration, so one instance
/// can serve any number of generations, on any number of threads.
#[derive(Debug, Clone, Default)]
pub struct EpubGenerator {
    config: GeneratorConfig,
}

impl EpubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates a book
    ///
    /// Kindle formats are answered with an EPUB and a message explaining how
    /// to convert it; any other format besides EPUB is rejected.
    pub fn generate(&self, request: &GenerationRequest) -> GenerationResponse {
        info!(
            "Generating {} eBook: {}",
            request.format, request.metadata.title
        );

        debug!("Generation stage: {:?}", GenerationStage::Validating);
        let format = match Self::validate(request) {
            Ok(format) => format,
            Err(err) => {
                error!("Generation failed: {}", err);
                return GenerationResponse::failure(err.to_string(), &request.format, vec![]);
            }
        };

        let stage = Cell::new(GenerationStage::Rendering);
        let mut warnings = Vec::new();

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.render_and_package(request, &stage, &mut warnings)
        }));

        let data = match result {
            Ok(Ok(data)) => data,
            Ok(Err(err)) => return Self::fail(stage.get(), err.to_string(), request, warnings),
            Err(payload) => {
                let reason = match payload.downcast_ref::<&str>() {
                    Some(message) => message.to_string(),
                    None => match payload.downcast_ref::<String>() {
                        Some(message) => message.clone(),
                        None => "unknown panic".to_string(),
                    },
                };
                return Self::fail(
                    stage.get(),
                    format!("internal panic: {}", reason),
                    request,
                    warnings,
                );
            }
        };

        debug!("Generation stage: {:?}", GenerationStage::Done);

        let filename = make_filename(&request.metadata.title, NATIVE_FORMAT);
        let message = match &format {
            OutputFormat::Kindle(kindle) => format!(
                "Generated EPUB. To convert to {}, use Calibre or Kindle Previewer.",
                kindle.to_uppercase()
            ),
            _ => format!(
                "Successfully generated {} eBook",
                NATIVE_FORMAT.to_uppercase()
            ),
        };

        info!(
            "Generated eBook {} ({} bytes, {} warnings)",
            filename,
            data.len(),
            warnings.len()
        );

        GenerationResponse {
            success: true,
            message,
            size_bytes: Some(data.len()),
            file_data: Some(data),
            filename,
            format: NATIVE_FORMAT.to_string(),
            warnings,
        }
    }

    /// Checks the request before anything is rendered
    fn validate(request: &GenerationRequest) -> Result<OutputFormat, ValidationError> {
        if request.fragments.is_empty() {
            return Err(ValidationError::EmptyFragments);
        }

        if request.metadata.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        match OutputFormat::parse(&request.format) {
            OutputFormat::Unsupported(format) => Err(ValidationError::UnsupportedFormat { format }),
            format => Ok(format),
        }
    }

    fn render_and_package(
        &self,
        request: &GenerationRequest,
        stage: &Cell<GenerationStage>,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<Vec<u8>, EpubError> {
        debug!("Generation stage: {:?}", GenerationStage::Rendering);

        let cover = Self::decode_cover(request, warnings);
        let pages = Self::render_pages(request)?;

        stage.set(GenerationStage::Packaging);
        debug!("Generation stage: {:?}", GenerationStage::Packaging);

        // EPUB 2 relies on the NCX, so a book without any navigation is EPUB 3
        match request.enable_toc || !request.enable_nav {
            true => self.package::<EpubVersion3>(request, cover.as_ref(), &pages),
            false => self.package::<EpubVersion2>(request, cover.as_ref(), &pages),
        }
    }

    /// Decodes the cover image, turning every problem into a warning
    fn decode_cover(
        request: &GenerationRequest,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<CoverImage> {
        let source = request.metadata.cover_image.as_deref()?;
        if source.trim().is_empty() {
            return None;
        }

        match CoverImage::decode(source) {
            Ok(cover) => Some(cover),
            Err(diagnostic) => {
                warn!("{}", diagnostic);
                warnings.push(diagnostic);
                None
            }
        }
    }

    /// Renders the fragments in reading order
    ///
    /// The sort is stable: fragments with the same order keep the sequence
    /// in which they were supplied.
    fn render_pages(request: &GenerationRequest) -> Result<Vec<RenderedPage<'_>>, EpubError> {
        let mut fragments = request.fragments.iter().collect::<Vec<_>>();
        fragments.sort_by_key(|fragment| fragment.order);

        let mut pages = Vec::with_capacity(fragments.len());
        for (index, fragment) in fragments.into_iter().enumerate() {
            let id = format!("chapter_{}", index + 1);

            let mut builder = ContentBuilder::new(&id, &request.metadata.language);
            builder
                .set_title(&fragment.title)
                .set_stylesheet(STYLESHEET_HREF)
                .set_body(&fragment.content);

            pages.push(RenderedPage {
                fragment,
                href: format!("{}.xhtml", id),
                data: builder.make()?,
                id,
            });
        }

        Ok(pages)
    }

    fn package<V: PackageVersion>(
        &self,
        request: &GenerationRequest,
        cover: Option<&CoverImage>,
        pages: &[RenderedPage<'_>],
    ) -> Result<Vec<u8>, EpubError> {
        let metadata = &request.metadata;
        let identifier = match metadata.identifier.as_deref().map(str::trim) {
            Some(identifier) if !identifier.is_empty() => identifier.to_string(),
            _ => generate_identifier(),
        };

        let mut builder = EpubBuilder::<V>::new();
        builder
            .set_rootfile(&self.rootfile())?
            .set_compression_level(self.config.compression_level)
            .enable_ncx(request.enable_nav)
            .set_catalog_title(CATALOG_TITLE)
            .add_metadata(MetadataItem::new("identifier", &identifier).with_id("pub-id"))
            .add_metadata(MetadataItem::new("title", metadata.title.trim()))
            .add_metadata(MetadataItem::new("language", &metadata.language))
            .add_metadata(
                MetadataItem::new("creator", &metadata.author)
                    .with_id("creator")
                    .append_refinement(
                        MetadataRefinement::new("creator", "role", "aut")
                            .with_scheme("marc:relators"),
                    ),
            );

        if let Some(publisher) = metadata.publisher.as_deref().filter(|p| !p.trim().is_empty()) {
            builder.add_metadata(MetadataItem::new("publisher", publisher));
        }
        if let Some(description) = metadata
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
        {
            builder.add_metadata(MetadataItem::new("description", description));
        }

        builder.add_resource(
            ManifestItem::new(STYLESHEET_ID, STYLESHEET_HREF)?.with_mime(STYLESHEET_MIME),
            stylesheet().as_bytes().to_vec(),
        )?;

        if let Some(cover) = cover {
            builder.set_cover(cover)?;
        }

        for page in pages {
            builder.add_content_document(
                ManifestItem::new(&page.id, &page.href)?,
                page.data.clone(),
                &page.fragment.title,
            )?;
        }

        builder.make()
    }

    fn rootfile(&self) -> String {
        match self.config.package_dir.trim_matches('/') {
            "" => "content.opf".to_string(),
            dir => format!("{}/content.opf", dir),
        }
    }

    fn fail(
        stage: GenerationStage,
        reason: String,
        request: &GenerationRequest,
        warnings: Vec<Diagnostic>,
    ) -> GenerationResponse {
        error!(
            "Generation failed while {:?}, now {:?}: {}",
            stage,
            GenerationStage::Failed,
            reason
        );

        GenerationResponse::failure(
            format!("Error generating eBook: {}", reason),
            &request.format,
            warnings,
        )
    }
}

/// Generates a book with the default configuration
pub fn generate(request: &GenerationRequest) -> GenerationResponse {
    EpubGenerator::new().generate(request)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use zip::{CompressionMethod, ZipArchive};

    use crate::{
        epub::EpubDoc,
        error::Diagnostic,
        generator::{EpubGenerator, GeneratorConfig, generate},
        types::{BookMetadata, EpubVersion, Fragment, GenerationRequest},
        utils::tests::assert_well_formed,
    };

    const PNG_BYTES: [u8; 67] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    fn request(fragments: Vec<Fragment>) -> GenerationRequest {
        GenerationRequest::new(
            BookMetadata::new("My Test Book").with_author("Jane Doe"),
            fragments,
        )
    }

    fn three_chapters() -> Vec<Fragment> {
        vec![
            Fragment::new("A", "<p>first</p>").with_order(1),
            Fragment::new("B", "<p>second</p>").with_order(1),
            Fragment::new("C", "<p>third</p>").with_order(0),
        ]
    }

    fn read_entry(data: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn test_generate_signature_entry() {
        let response = generate(&request(three_chapters()));
        assert!(response.success);

        let data = response.file_data.unwrap();
        assert_eq!(response.size_bytes, Some(data.len()));

        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        let mut mimetype = archive.by_index(0).unwrap();
        assert_eq!(mimetype.name(), "mimetype");
        assert_eq!(mimetype.compression(), CompressionMethod::Stored);

        let mut content = Vec::new();
        mimetype.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"application/epub+zip");
    }

    #[test]
    fn test_generate_stable_sort() {
        let response = generate(&request(three_chapters()));
        let mut doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();

        let labels = doc
            .catalog
            .iter()
            .map(|nav| nav.label.clone())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["C", "A", "B"]);

        let (page, _) = doc.navigate_by_spine_index(0).unwrap();
        assert!(String::from_utf8(page).unwrap().contains("<h1>C</h1>"));
    }

    #[test]
    fn test_generate_cardinality() {
        let fragments = (1..=5)
            .map(|index| Fragment::new(&format!("Chapter {}", index), "<p>text</p>"))
            .collect::<Vec<_>>();

        let response = generate(&request(fragments));
        let doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();

        assert_eq!(doc.spine.len(), 5);
        assert_eq!(doc.catalog.len(), 5);
        for (index, item) in doc.spine.iter().enumerate() {
            assert_eq!(item.idref, format!("chapter_{}", index + 1));
        }
    }

    #[test]
    fn test_generate_metadata() {
        let mut request = request(three_chapters());
        request.metadata = request
            .metadata
            .with_language("fr")
            .with_publisher("Maison")
            .with_identifier("urn:isbn:9780000000001");

        let response = generate(&request);
        let doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();

        assert_eq!(doc.version, EpubVersion::Version3_0);
        assert_eq!(doc.unique_identifier, "urn:isbn:9780000000001");
        assert_eq!(doc.get_language().unwrap(), vec!["fr".to_string()]);
        assert_eq!(
            doc.get_metadata_value("publisher"),
            Some(vec!["Maison".to_string()])
        );
        assert_eq!(
            doc.get_metadata_value("creator"),
            Some(vec!["Jane Doe".to_string()])
        );
        assert_eq!(doc.catalog_title, "Table of Contents");
        assert!(doc.manifest.contains_key("style"));
    }

    #[test]
    fn test_generate_cover_round_trip() {
        let mut request = request(three_chapters());
        request.metadata = request.metadata.with_cover_image(&format!(
            "data:image/png;base64,{}",
            STANDARD.encode(PNG_BYTES)
        ));

        let response = generate(&request);
        assert!(response.warnings.is_empty());

        let mut doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();
        assert_eq!(
            doc.get_metadata_value("cover"),
            Some(vec!["cover-image".to_string()])
        );

        let (data, mime) = doc.get_manifest_item("cover-image").unwrap();
        assert_eq!(data, PNG_BYTES.to_vec());
        assert_eq!(mime, "image/png");
        assert!(doc.manifest["cover-image"].has_property("cover-image"));
    }

    #[test]
    fn test_generate_remote_cover() {
        let mut request = request(three_chapters());
        request.metadata = request
            .metadata
            .with_cover_image("https://example.com/cover.jpg");

        let response = generate(&request);
        assert!(response.success);
        assert_eq!(
            response.warnings,
            vec![Diagnostic::RemoteCoverNotFetched {
                url: "https://example.com/cover.jpg".to_string()
            }]
        );

        let doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();
        assert!(!doc.manifest.contains_key("cover-image"));
        assert!(doc.get_metadata_value("cover").is_none());
    }

    #[test]
    fn test_generate_invalid_cover_data() {
        let mut request = request(three_chapters());
        request.metadata = request
            .metadata
            .with_cover_image("data:image/png;base64,@@not-base64@@");

        let response = generate(&request);
        assert!(response.success);
        assert_eq!(response.warnings.len(), 1);
        assert!(matches!(
            response.warnings[0],
            Diagnostic::InvalidCoverData { .. }
        ));
    }

    #[test]
    fn test_generate_degrades_kindle_formats() {
        let response = generate(&request(three_chapters()).with_format("mobi"));

        assert!(response.success);
        assert_eq!(response.format, "epub");
        assert_eq!(response.filename, "My_Test_Book.epub");
        assert_eq!(
            response.message,
            "Generated EPUB. To convert to MOBI, use Calibre or Kindle Previewer."
        );
        assert!(response.file_data.is_some());

        let response = generate(&request(three_chapters()).with_format("AZW3"));
        assert!(response.success);
        assert!(response.message.contains("AZW3"));
    }

    #[test]
    fn test_generate_epub_message() {
        let response = generate(&request(three_chapters()));

        assert_eq!(response.message, "Successfully generated EPUB eBook");
        assert_eq!(response.format, "epub");
        assert_eq!(response.filename, "My_Test_Book.epub");
    }

    #[test]
    fn test_generate_unsupported_format() {
        let response = generate(&request(three_chapters()).with_format("pdf"));

        assert!(!response.success);
        assert_eq!(response.message, "Unsupported format: pdf. Supported: epub");
        assert_eq!(response.filename, "");
        assert_eq!(response.format, "pdf");
        assert!(response.file_data.is_none());
        assert!(response.size_bytes.is_none());
    }

    #[test]
    fn test_generate_empty_fragments() {
        let response = generate(&request(vec![]));

        assert!(!response.success);
        assert_eq!(response.message, "At least one chapter is required");
        assert!(response.file_data.is_none());
    }

    #[test]
    fn test_generate_empty_title() {
        let mut request = request(three_chapters());
        request.metadata.title = "   ".to_string();

        let response = generate(&request);
        assert!(!response.success);
        assert_eq!(response.message, "The book title must not be empty");
    }

    #[test]
    fn test_generate_malformed_content() {
        let response = generate(&request(vec![
            Fragment::new("Broken", "<p>text"),
            Fragment::new("Empty", ""),
            Fragment::new("Entities", "Tom &amp; Jerry &nbsp; <b>bold<i>both</b> & more"),
        ]));
        assert!(response.success);

        let data = response.file_data.unwrap();
        for index in 1..=3 {
            let page = read_entry(&data, &format!("OEBPS/chapter_{}.xhtml", index));
            assert_well_formed(page.as_bytes());
        }

        let page = read_entry(&data, "OEBPS/chapter_1.xhtml");
        assert!(page.contains("<p>text</p>"));
    }

    #[test]
    fn test_generate_without_ncx() {
        let response = generate(&request(three_chapters()).with_nav(false));
        assert!(response.success);

        let data = response.file_data.unwrap();
        let opf = read_entry(&data, "OEBPS/content.opf");
        assert!(!opf.contains("toc=\""));
        assert!(!opf.contains("toc.ncx"));

        let archive = ZipArchive::new(Cursor::new(data)).unwrap();
        assert!(archive.index_for_name("OEBPS/toc.ncx").is_none());
    }

    #[test]
    fn test_generate_epub2_without_toc() {
        let response = generate(&request(three_chapters()).with_toc(false));
        let doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();

        assert_eq!(doc.version, EpubVersion::Version2_0);
        assert!(!doc.manifest.contains_key("nav"));
        assert_eq!(doc.spine_toc.as_deref(), Some("ncx"));

        let play_orders = doc
            .catalog
            .iter()
            .filter_map(|nav| nav.play_order)
            .collect::<Vec<_>>();
        assert_eq!(play_orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_generate_without_any_navigation() {
        let response = generate(&request(three_chapters()).with_toc(false).with_nav(false));
        let doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();

        assert_eq!(doc.version, EpubVersion::Version3_0);
        assert!(doc.manifest["nav"].has_property("nav"));
        assert!(!doc.manifest.contains_key("ncx"));
        assert_eq!(doc.spine_toc, None);
        assert_eq!(doc.catalog.len(), 3);
    }

    #[test]
    fn test_generate_path_like_cover_type() {
        let mut request = request(three_chapters());
        request.metadata = request
            .metadata
            .with_cover_image("data:image/a/../../../evil;base64,AAAA");

        let response = generate(&request);
        assert!(response.success);
        assert_eq!(
            response.warnings,
            vec![Diagnostic::UnsupportedCoverMediaType {
                mime: "image/a/../../../evil".to_string()
            }]
        );

        let archive = ZipArchive::new(Cursor::new(response.file_data.unwrap())).unwrap();
        for name in archive.file_names() {
            assert!(!name.contains(".."), "entry {} leaves its directory", name);
        }
        assert!(archive.file_names().all(|name| !name.contains("cover")));
    }

    #[test]
    fn test_generate_with_config() {
        let generator = EpubGenerator::with_config(GeneratorConfig {
            package_dir: "book".to_string(),
            compression_level: Some(9),
        });

        let response = generator.generate(&request(three_chapters()));
        let doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();

        assert_eq!(doc.package_path.to_string_lossy(), "book/content.opf");
        assert_eq!(
            doc.manifest["chapter_1"].path.to_string_lossy(),
            "book/chapter_1.xhtml"
        );
    }

    #[test]
    fn test_generate_filename() {
        let mut request = request(three_chapters());
        request.metadata.title = "War and Peace / Vol 1".to_string();

        let response = generate(&request);
        assert_eq!(response.filename, "War_and_Peace___Vol_1.epub");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_response_json() {
        let mut request = request(three_chapters());
        request.metadata = request
            .metadata
            .with_cover_image("http://example.com/cover.png");

        let response = generate(&request);
        let json = serde_json::to_value(&response).unwrap();

        let file_data = json["fileData"].as_str().unwrap();
        assert_eq!(
            STANDARD.decode(file_data).unwrap(),
            response.file_data.unwrap()
        );
        assert_eq!(json["sizeBytes"], response.size_bytes.unwrap());
        assert_eq!(json["filename"], "My_Test_Book.epub");
        assert!(
            json["warnings"][0]
                .as_str()
                .unwrap()
                .contains("http://example.com/cover.png")
        );

        let failure = serde_json::to_value(generate(&self::request(vec![]))).unwrap();
        assert_eq!(failure["success"], false);
        assert!(failure.get("fileData").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_request_json_round_trip() {
        let json = r#"{
            "metadata": {"title": "Json Book", "cover_image": "https://example.com/c.png"},
            "chapters": [{"title": "One", "content": "<p>1</p>"}],
            "format": "azw3",
            "enable_ncx": false
        }"#;

        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        let response = generate(&request);

        assert!(response.success);
        assert_eq!(response.filename, "Json_Book.epub");
        assert_eq!(response.warnings.len(), 1);

        let doc = EpubDoc::from_bytes(response.file_data.unwrap()).unwrap();
        assert_eq!(doc.spine_toc, None);
        assert_eq!(
            doc.get_metadata_value("creator"),
            Some(vec!["Unknown Author".to_string()])
        );
    }
}
