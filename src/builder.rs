//! Epub Builder
//!
//! This module assembles EPUB containers in memory. The `EpubBuilder`
//! collects metadata, resources and content documents, then writes the
//! package document (OPF), the navigation files and the ZIP container.
//!
//! The package version is chosen through a marker type: [EpubVersion3]
//! produces an EPUB 3.0 package with an XHTML navigation document, while
//! [EpubVersion2] produces an EPUB 2.0 package that relies on the NCX alone.
//!
//! ## Usage
//!
//! ```rust
//! # fn main() -> Result<(), epub_packager::error::EpubError> {
//! use epub_packager::{
//!     builder::{EpubBuilder, EpubVersion3},
//!     types::{ManifestItem, MetadataItem},
//! };
//!
//! let mut builder = EpubBuilder::<EpubVersion3>::new();
//! builder
//!     .add_metadata(MetadataItem::new("identifier", "urn:isbn:9780000000000").with_id("pub-id"))
//!     .add_metadata(MetadataItem::new("title", "Test Book"))
//!     .add_metadata(MetadataItem::new("language", "en"))
//!     .enable_ncx(true)
//!     .add_content_document(
//!         ManifestItem::new("chapter_1", "chapter_1.xhtml")?,
//!         b"<html xmlns=\"http://www.w3.org/1999/xhtml\"/>".to_vec(),
//!         "Chapter 1",
//!     )?;
//!
//! let container = builder.make()?;
//! assert_eq!(&container[30..38], b"mimetype");
//! # Ok(())
//! # }
//! ```
//!
//! ## Notes
//!
//! - Nothing touches the file system; the container is returned as bytes.
//! - Spine entries can only be added together with their manifest item, so
//!   every spine entry always refers to an existing resource.

pub mod content;
pub mod cover;
pub mod style;

use std::{
    collections::HashMap,
    io::{Cursor, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use infer::Infer;
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    builder::{content::xml_safe, cover::CoverImage},
    epub::EpubDoc,
    error::{EpubBuilderError, EpubError},
    types::{ManifestItem, MetadataItem, NavPoint, SpineItem},
    utils::{ELEMENT_IN_DC_NAMESPACE, EPUB_MIMETYPE, is_contained_path},
};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

pub(crate) const DEFAULT_ROOTFILE: &str = "OEBPS/content.opf";
pub(crate) const COVER_IMAGE_ID: &str = "cover-image";

const NCX_ID: &str = "ncx";
const NCX_PATH: &str = "toc.ncx";
const NCX_MIME: &str = "application/x-dtbncx+xml";
const NAV_ID: &str = "nav";
const NAV_PATH: &str = "nav.xhtml";
const XHTML_MIME: &str = "application/xhtml+xml";

/// Marker for EPUB 2.0 packages
#[derive(Debug)]
pub struct EpubVersion2;

/// Marker for EPUB 3.0 packages
#[derive(Debug)]
pub struct EpubVersion3;

mod private {
    pub trait Sealed {}

    impl Sealed for super::EpubVersion2 {}
    impl Sealed for super::EpubVersion3 {}
}

/// Version-dependent parts of the package
pub trait PackageVersion: private::Sealed {
    /// The `version` attribute of the package element
    const PACKAGE_VERSION: &'static str;

    /// Whether the package carries an XHTML navigation document,
    /// `dcterms:modified` and metadata refinements
    const NAV_DOCUMENT: bool;
}

impl PackageVersion for EpubVersion2 {
    const PACKAGE_VERSION: &'static str = "2.0";
    const NAV_DOCUMENT: bool = false;
}

impl PackageVersion for EpubVersion3 {
    const PACKAGE_VERSION: &'static str = "3.0";
    const NAV_DOCUMENT: bool = true;
}

/// EPUB Builder
///
/// The main structure used to assemble EPUB containers.
#[derive(Debug)]
pub struct EpubBuilder<Version> {
    /// EPUB version placeholder
    epub_version: PhantomData<Version>,

    /// Path of the package document inside the container
    rootfile: String,

    metadata: Vec<MetadataItem>,

    /// Manifest items keyed by id, in insertion order
    manifest: IndexMap<String, ManifestItem>,

    /// Resource data keyed by manifest id
    resources: HashMap<String, Vec<u8>>,

    /// List of spine items, defining the reading order
    spine: Vec<SpineItem>,

    catalog_title: String,

    /// List of catalog navigation points
    catalog: Vec<NavPoint>,

    cover: Option<String>,

    ncx: bool,

    compression_level: Option<u32>,
}

impl<Version: PackageVersion> Default for EpubBuilder<Version> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Version: PackageVersion> EpubBuilder<Version> {
    /// Create a new `EpubBuilder` instance
    ///
    /// The package document defaults to `OEBPS/content.opf` and the NCX is
    /// disabled until [enable_ncx](Self::enable_ncx) is called.
    pub fn new() -> Self {
        EpubBuilder {
            epub_version: PhantomData,

            rootfile: DEFAULT_ROOTFILE.to_string(),
            metadata: vec![],
            manifest: IndexMap::new(),
            resources: HashMap::new(),
            spine: vec![],

            catalog_title: String::new(),
            catalog: vec![],

            cover: None,
            ncx: false,
            compression_level: None,
        }
    }

    /// Set the rootfile path
    ///
    /// The path points to the package document that will be created when
    /// the container is made. It must be relative and must not start
    /// with `../`.
    ///
    /// # Parameters
    /// - `rootfile`: Rootfile path, such as `OEBPS/content.opf`
    pub fn set_rootfile(&mut self, rootfile: &str) -> Result<&mut Self, EpubError> {
        if !is_contained_path(rootfile) || Path::new(rootfile).file_name().is_none() {
            return Err(EpubBuilderError::IllegalRootfilePath.into());
        }

        self.rootfile = rootfile.replace('\\', "/");
        Ok(self)
    }

    /// Add metadata item
    ///
    /// Required metadata includes title, language, and an identifier with 'pub-id'.
    /// Missing this data will result in an error when making the container.
    ///
    /// # Parameters
    /// - `item`: Metadata items to add
    pub fn add_metadata(&mut self, item: MetadataItem) -> &mut Self {
        self.metadata.push(item);
        self
    }

    /// Add manifest item and its data
    ///
    /// When the item has no media type, it is inferred from the data and the
    /// file extension.
    ///
    /// # Parameters
    /// - `item` - Manifest item information
    /// - `data` - The resource content
    ///
    /// # Return
    /// - `Ok(&mut Self)` - Successful addition, returns a reference to itself
    /// - `Err(EpubError)` - The id or the path is already in use
    pub fn add_resource(
        &mut self,
        item: ManifestItem,
        data: Vec<u8>,
    ) -> Result<&mut Self, EpubError> {
        let path_taken = self.manifest.values().any(|existing| existing.path == item.path)
            || item.path == Path::new(NCX_PATH)
            || item.path == Path::new(NAV_PATH);

        if self.manifest.contains_key(&item.id)
            || matches!(item.id.as_str(), NCX_ID | NAV_ID)
            || path_taken
        {
            return Err(EpubBuilderError::DuplicateManifestItem {
                manifest_id: item.id,
            }
            .into());
        }

        let item = if item.mime.is_empty() {
            let mime = infer_mime_type(&item.path, &data);
            item.with_mime(&mime)
        } else {
            item
        };

        self.resources.insert(item.id.clone(), data);
        self.manifest.insert(item.id.clone(), item);
        Ok(self)
    }

    /// Add a content document to the end of the reading order
    ///
    /// The manifest item, its spine entry and its catalog entry are added
    /// together.
    ///
    /// # Parameters
    /// - `item` - Manifest item of the document
    /// - `data` - The XHTML document
    /// - `label` - Title of the document in the table of contents
    pub fn add_content_document(
        &mut self,
        item: ManifestItem,
        data: Vec<u8>,
        label: &str,
    ) -> Result<&mut Self, EpubError> {
        let item = if item.mime.is_empty() {
            item.with_mime(XHTML_MIME)
        } else {
            item
        };

        let idref = item.id.clone();
        let href = item.href();
        self.add_resource(item, data)?;

        self.spine.push(SpineItem::new(&idref));
        self.catalog.push(NavPoint::new(label).with_content(&href));
        Ok(self)
    }

    /// Add the cover image
    ///
    /// The image is stored as `cover.<ext>` with the manifest id
    /// `cover-image`, and the package metadata points at it.
    pub fn set_cover(&mut self, cover: &CoverImage) -> Result<&mut Self, EpubError> {
        let mut item =
            ManifestItem::new(COVER_IMAGE_ID, &cover.file_name())?.with_mime(&cover.mime);
        if Version::NAV_DOCUMENT {
            item = item.append_property("cover-image");
        }

        self.add_resource(item, cover.data.clone())?;
        self.cover = Some(COVER_IMAGE_ID.to_string());
        Ok(self)
    }

    /// Set catalog title
    ///
    /// # Parameters
    /// - `title`: Catalog title
    pub fn set_catalog_title(&mut self, title: &str) -> &mut Self {
        self.catalog_title = title.to_string();
        self
    }

    /// Re-/ Set catalog
    ///
    /// The passed list will overwrite the entries collected from the
    /// content documents.
    ///
    /// # Parameters
    /// - `catalog`: Catalog to set
    pub fn set_catalog(&mut self, catalog: Vec<NavPoint>) -> &mut Self {
        self.catalog = catalog;
        self
    }

    /// Include the legacy NCX navigation file
    pub fn enable_ncx(&mut self, enable: bool) -> &mut Self {
        self.ncx = enable;
        self
    }

    /// Set the deflate level (0-9) of compressed entries
    ///
    /// `None` uses the default level of the compression backend.
    pub fn set_compression_level(&mut self, level: Option<u32>) -> &mut Self {
        self.compression_level = level.map(|level| level.min(9));
        self
    }

    /// Makes the EPUB container
    ///
    /// Entries are written in this order: `mimetype` (stored), the container
    /// file, the package document, the NCX, the navigation document, then
    /// every resource in the order it was added.
    ///
    /// # Return
    /// - `Ok(Vec<u8>)`: The container bytes
    /// - `Err(EpubError)`: Error occurred during the build process
    pub fn make(&self) -> Result<Vec<u8>, EpubError> {
        if !self.validate_metadata() {
            return Err(EpubBuilderError::MissingNecessaryMetadata.into());
        }
        if self.catalog.is_empty() && (self.ncx || Version::NAV_DOCUMENT) {
            return Err(EpubBuilderError::NavigationInfoUninitalized.into());
        }

        let container_xml = self.make_container_xml()?;
        let opf = self.make_opf_file()?;
        let ncx = match self.ncx {
            true => Some(self.make_ncx()?),
            false => None,
        };
        let nav = match Version::NAV_DOCUMENT {
            true => Some(self.make_navigation_document()?),
            false => None,
        };

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.compression_level.map(i64::from));

        zip.start_file("mimetype", stored)?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(&container_xml)?;

        zip.start_file(self.rootfile.as_str(), deflated)?;
        zip.write_all(&opf)?;

        if let Some(ncx) = ncx {
            zip.start_file(self.package_path(NCX_PATH), deflated)?;
            zip.write_all(&ncx)?;
        }

        if let Some(nav) = nav {
            zip.start_file(self.package_path(NAV_PATH), deflated)?;
            zip.write_all(&nav)?;
        }

        for (id, item) in &self.manifest {
            let data = self
                .resources
                .get(id)
                .ok_or_else(|| EpubError::ResourceIdNotExist { id: id.clone() })?;

            zip.start_file(self.package_path(&item.href()), deflated)?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Makes the EPUB container and returns it as an `EpubDoc`
    ///
    /// # Return
    /// - `Ok(EpubDoc)`: Build successful
    /// - `Err(EpubError)`: Error occurred during the build process
    pub fn build(&self) -> Result<EpubDoc<Cursor<Vec<u8>>>, EpubError> {
        EpubDoc::from_bytes(self.make()?)
    }

    /// Path of a package-relative href inside the container
    fn package_path(&self, href: &str) -> String {
        match self.rootfile.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, href),
            None => href.to_string(),
        }
    }

    /// Creates the `container.xml` file
    fn make_container_xml(&self) -> Result<Vec<u8>, EpubError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        writer.write_event(Event::Start(BytesStart::new("container").with_attributes(
            [
                ("version", "1.0"),
                ("xmlns", "urn:oasis:names:tc:opendocument:xmlns:container"),
            ],
        )))?;
        writer.write_event(Event::Start(BytesStart::new("rootfiles")))?;
        writer.write_event(Event::Empty(BytesStart::new("rootfile").with_attributes([
            ("full-path", self.rootfile.as_str()),
            ("media-type", "application/oebps-package+xml"),
        ])))?;
        writer.write_event(Event::End(BytesEnd::new("rootfiles")))?;
        writer.write_event(Event::End(BytesEnd::new("container")))?;

        Ok(writer.into_inner().into_inner())
    }

    /// Creates the legacy NCX navigation file
    ///
    /// Play orders start at 1 and increase by one for every navigation point
    /// in document order.
    fn make_ncx(&self) -> Result<Vec<u8>, EpubError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("ncx").with_attributes([
            ("xmlns", "http://www.daisy.org/z3986/2005/ncx/"),
            ("version", "2005-1"),
        ])))?;

        let uid = xml_safe(self.identifier());
        let depth = catalog_depth(&self.catalog).to_string();
        writer.write_event(Event::Start(BytesStart::new("head")))?;
        for (name, content) in [
            ("dtb:uid", uid.as_str()),
            ("dtb:depth", depth.as_str()),
            ("dtb:totalPageCount", "0"),
            ("dtb:maxPageNumber", "0"),
        ] {
            writer.write_event(Event::Empty(
                BytesStart::new("meta").with_attributes([("name", name), ("content", content)]),
            ))?;
        }
        writer.write_event(Event::End(BytesEnd::new("head")))?;

        writer.write_event(Event::Start(BytesStart::new("docTitle")))?;
        writer.write_event(Event::Start(BytesStart::new("text")))?;
        writer.write_event(Event::Text(text(self.title())))?;
        writer.write_event(Event::End(BytesEnd::new("text")))?;
        writer.write_event(Event::End(BytesEnd::new("docTitle")))?;

        writer.write_event(Event::Start(BytesStart::new("navMap")))?;
        let mut play_order = 0;
        Self::make_nav_points(&mut writer, &self.catalog, &mut play_order)?;
        writer.write_event(Event::End(BytesEnd::new("navMap")))?;

        writer.write_event(Event::End(BytesEnd::new("ncx")))?;

        Ok(writer.into_inner().into_inner())
    }

    fn make_nav_points(
        writer: &mut XmlWriter,
        navigations: &[NavPoint],
        play_order: &mut usize,
    ) -> Result<(), EpubError> {
        for nav in navigations {
            // the NCX requires a target for every point
            let Some(content) = first_content(nav) else {
                continue;
            };

            *play_order += 1;
            let order = play_order.to_string();
            let id = format!("navPoint-{}", play_order);

            writer.write_event(Event::Start(BytesStart::new("navPoint").with_attributes([
                ("id", id.as_str()),
                ("playOrder", order.as_str()),
            ])))?;

            writer.write_event(Event::Start(BytesStart::new("navLabel")))?;
            writer.write_event(Event::Start(BytesStart::new("text")))?;
            writer.write_event(Event::Text(text(&nav.label)))?;
            writer.write_event(Event::End(BytesEnd::new("text")))?;
            writer.write_event(Event::End(BytesEnd::new("navLabel")))?;

            let src = xml_safe(&content.to_string_lossy().replace('\\', "/"));
            writer.write_event(Event::Empty(
                BytesStart::new("content").with_attributes([("src", src.as_str())]),
            ))?;

            Self::make_nav_points(writer, &nav.children, play_order)?;

            writer.write_event(Event::End(BytesEnd::new("navPoint")))?;
        }

        Ok(())
    }

    /// Creates the XHTML `navigation document`
    fn make_navigation_document(&self) -> Result<Vec<u8>, EpubError> {
        let language = xml_safe(self.language());
        let language = language.as_str();
        let title = match self.catalog_title.is_empty() {
            true => self.title(),
            false => self.catalog_title.as_str(),
        };

        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
        writer.write_event(Event::Start(BytesStart::new("html").with_attributes([
            ("xmlns", "http://www.w3.org/1999/xhtml"),
            ("xmlns:epub", "http://www.idpf.org/2007/ops"),
            ("xml:lang", language),
            ("lang", language),
        ])))?;

        // make head
        writer.write_event(Event::Start(BytesStart::new("head")))?;
        writer.write_event(Event::Start(BytesStart::new("title")))?;
        writer.write_event(Event::Text(text(title)))?;
        writer.write_event(Event::End(BytesEnd::new("title")))?;
        writer.write_event(Event::End(BytesEnd::new("head")))?;

        // make body
        writer.write_event(Event::Start(BytesStart::new("body")))?;
        writer.write_event(Event::Start(
            BytesStart::new("nav").with_attributes([("epub:type", "toc"), ("id", "toc")]),
        ))?;

        writer.write_event(Event::Start(BytesStart::new("h1")))?;
        writer.write_event(Event::Text(text(title)))?;
        writer.write_event(Event::End(BytesEnd::new("h1")))?;

        Self::make_nav(&mut writer, &self.catalog)?;

        writer.write_event(Event::End(BytesEnd::new("nav")))?;
        writer.write_event(Event::End(BytesEnd::new("body")))?;
        writer.write_event(Event::End(BytesEnd::new("html")))?;

        Ok(writer.into_inner().into_inner())
    }

    fn make_nav(writer: &mut XmlWriter, navigations: &[NavPoint]) -> Result<(), EpubError> {
        writer.write_event(Event::Start(BytesStart::new("ol")))?;

        for nav in navigations {
            writer.write_event(Event::Start(BytesStart::new("li")))?;

            if let Some(path) = &nav.content {
                let href = xml_safe(&path.to_string_lossy().replace('\\', "/"));
                writer.write_event(Event::Start(
                    BytesStart::new("a").with_attributes([("href", href.as_str())]),
                ))?;
                writer.write_event(Event::Text(text(&nav.label)))?;
                writer.write_event(Event::End(BytesEnd::new("a")))?;
            } else {
                writer.write_event(Event::Start(BytesStart::new("span")))?;
                writer.write_event(Event::Text(text(&nav.label)))?;
                writer.write_event(Event::End(BytesEnd::new("span")))?;
            }

            if !nav.children.is_empty() {
                Self::make_nav(writer, &nav.children)?;
            }

            writer.write_event(Event::End(BytesEnd::new("li")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("ol")))?;

        Ok(())
    }

    /// Creates the `OPF` file
    fn make_opf_file(&self) -> Result<Vec<u8>, EpubError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        writer.write_event(Event::Start(BytesStart::new("package").with_attributes([
            ("xmlns", "http://www.idpf.org/2007/opf"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:opf", "http://www.idpf.org/2007/opf"),
            ("unique-identifier", "pub-id"),
            ("version", Version::PACKAGE_VERSION),
        ])))?;

        self.make_opf_metadata(&mut writer)?;
        self.make_opf_manifest(&mut writer)?;
        self.make_opf_spine(&mut writer)?;

        writer.write_event(Event::End(BytesEnd::new("package")))?;

        Ok(writer.into_inner().into_inner())
    }

    fn make_opf_metadata(&self, writer: &mut XmlWriter) -> Result<(), EpubError> {
        writer.write_event(Event::Start(BytesStart::new("metadata")))?;

        for metadata in &self.metadata {
            let is_meta = !ELEMENT_IN_DC_NAMESPACE.contains(&metadata.property.as_str());
            let tag_name = match is_meta {
                true => "meta".to_string(),
                false => format!("dc:{}", metadata.property),
            };

            writer.write_event(Event::Start(element(
                &tag_name,
                &metadata.attributes(is_meta),
            )))?;
            writer.write_event(Event::Text(text(&metadata.value)))?;
            writer.write_event(Event::End(BytesEnd::new(tag_name.as_str())))?;

            // refinements are an EPUB 3 feature and need a target id
            if !Version::NAV_DOCUMENT || metadata.id.is_none() {
                continue;
            }

            for refinement in &metadata.refined {
                writer.write_event(Event::Start(element("meta", &refinement.attributes())))?;
                writer.write_event(Event::Text(text(&refinement.value)))?;
                writer.write_event(Event::End(BytesEnd::new("meta")))?;
            }
        }

        if Version::NAV_DOCUMENT {
            let modified = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

            writer.write_event(Event::Start(
                BytesStart::new("meta").with_attributes([("property", "dcterms:modified")]),
            ))?;
            writer.write_event(Event::Text(BytesText::new(&modified)))?;
            writer.write_event(Event::End(BytesEnd::new("meta")))?;
        }

        if let Some(cover) = &self.cover {
            writer.write_event(Event::Empty(BytesStart::new("meta").with_attributes([
                ("name", "cover"),
                ("content", cover.as_str()),
            ])))?;
        }

        writer.write_event(Event::End(BytesEnd::new("metadata")))?;

        Ok(())
    }

    fn make_opf_manifest(&self, writer: &mut XmlWriter) -> Result<(), EpubError> {
        writer.write_event(Event::Start(BytesStart::new("manifest")))?;

        for manifest in self.manifest.values() {
            writer.write_event(Event::Empty(element("item", &manifest.attributes())))?;
        }

        if self.ncx {
            writer.write_event(Event::Empty(BytesStart::new("item").with_attributes([
                ("id", NCX_ID),
                ("href", NCX_PATH),
                ("media-type", NCX_MIME),
            ])))?;
        }

        if Version::NAV_DOCUMENT {
            writer.write_event(Event::Empty(BytesStart::new("item").with_attributes([
                ("id", NAV_ID),
                ("href", NAV_PATH),
                ("media-type", XHTML_MIME),
                ("properties", "nav"),
            ])))?;
        }

        writer.write_event(Event::End(BytesEnd::new("manifest")))?;

        Ok(())
    }

    fn make_opf_spine(&self, writer: &mut XmlWriter) -> Result<(), EpubError> {
        let spine = match self.ncx {
            true => BytesStart::new("spine").with_attributes([("toc", NCX_ID)]),
            false => BytesStart::new("spine"),
        };
        writer.write_event(Event::Start(spine))?;

        for spine in &self.spine {
            writer.write_event(Event::Empty(element("itemref", &spine.attributes())))?;
        }

        writer.write_event(Event::End(BytesEnd::new("spine")))?;

        Ok(())
    }

    /// Verify metadata integrity
    ///
    /// Check if the required metadata items are included: title, language, and identifier with pub-id.
    fn validate_metadata(&self) -> bool {
        let has_title = self.metadata.iter().any(|item| item.property == "title");
        let has_language = self.metadata.iter().any(|item| item.property == "language");
        let has_identifier = self.metadata.iter().any(|item| {
            item.property == "identifier" && item.id.as_ref().is_some_and(|id| id == "pub-id")
        });

        has_title && has_identifier && has_language
    }

    fn metadata_value(&self, predicate: impl Fn(&MetadataItem) -> bool) -> &str {
        self.metadata
            .iter()
            .find(|item| predicate(item))
            .map_or("", |item| item.value.as_str())
    }

    fn identifier(&self) -> &str {
        self.metadata_value(|item| {
            item.property == "identifier" && item.id.as_deref() == Some("pub-id")
        })
    }

    fn title(&self) -> &str {
        self.metadata_value(|item| item.property == "title")
    }

    fn language(&self) -> &str {
        self.metadata_value(|item| item.property == "language")
    }
}

/// Builds a start tag from owned attribute values
fn element<'a>(name: &'a str, attributes: &[(&str, String)]) -> BytesStart<'a> {
    let attributes = attributes
        .iter()
        .map(|(key, value)| (*key, xml_safe(value)))
        .collect::<Vec<_>>();

    BytesStart::new(name).with_attributes(
        attributes
            .iter()
            .map(|(key, value)| (*key, value.as_str())),
    )
}

/// Escaped text node with the characters XML forbids removed
fn text(value: &str) -> BytesText<'static> {
    BytesText::new(&xml_safe(value)).into_owned()
}

/// Depth of the navigation tree, at least 1
fn catalog_depth(catalog: &[NavPoint]) -> usize {
    1 + catalog
        .iter()
        .filter(|nav| !nav.children.is_empty())
        .map(|nav| catalog_depth(&nav.children))
        .max()
        .unwrap_or(0)
}

/// The target of a navigation point, or of its first descendant with one
fn first_content(nav: &NavPoint) -> Option<PathBuf> {
    nav.content
        .clone()
        .or_else(|| nav.children.iter().find_map(first_content))
}

fn infer_mime_type(path: &Path, data: &[u8]) -> String {
    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => String::new(),
    };

    match Infer::new().get(data) {
        Some(infer_mime) => refine_mime_type(infer_mime.mime_type(), &extension),
        None => refine_mime_type("application/octet-stream", &extension),
    }
}

/// Refine the mime type
///
/// Optimize mime types inferred from file content based on file extensions
fn refine_mime_type(infer_mime: &str, extension: &str) -> String {
    match (infer_mime, extension) {
        ("text/xml", "xhtml")
        | ("application/xml", "xhtml")
        | ("application/octet-stream", "xhtml")
        | ("application/octet-stream", "xht") => XHTML_MIME.to_string(),

        ("text/xml", "ncx") | ("application/xml", "ncx") | ("application/octet-stream", "ncx") => {
            NCX_MIME.to_string()
        }

        ("text/plain", "css") | ("application/octet-stream", "css") => "text/css".to_string(),
        ("text/plain", "svg") | ("application/octet-stream", "svg") => {
            "image/svg+xml".to_string()
        }

        _ => infer_mime.to_string(),
    }
}
