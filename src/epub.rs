//! Container inspection
//!
//! [EpubDoc] opens an EPUB container again and checks it the way a reading
//! system would: the `mimetype` signature, the compression methods, the
//! rootfile named by `META-INF/container.xml`, and the package document that
//! rootfile points at. Containers made by [EpubBuilder](crate::builder::EpubBuilder)
//! can be inspected directly through its `build` method.

use std::{
    collections::HashMap,
    io::{Cursor, Read, Seek},
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::warn;
use zip::{ZipArchive, result::ZipError};

use crate::{
    error::EpubError,
    types::{EpubVersion, ManifestItem, MetadataItem, MetadataRefinement, NavPoint, SpineItem},
    utils::{
        DecodeBytes, NormalizeWhitespace, XmlElement, XmlReader, compression_method_check,
        get_file_in_zip_archive, mimetype_entry_check,
    },
};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// An opened EPUB container
///
/// Manifest paths are resolved against the container root. Catalog targets
/// keep the href written in the navigation file.
pub struct EpubDoc<R: Read + Seek> {
    archive: ZipArchive<R>,

    /// Location of the package document inside the container
    pub package_path: PathBuf,

    /// Directory holding the package document
    pub base_path: PathBuf,

    pub version: EpubVersion,

    /// Value of the identifier named by the package's `unique-identifier`
    pub unique_identifier: String,

    pub metadata: Vec<MetadataItem>,

    /// Manifest items keyed by id, in document order
    pub manifest: IndexMap<String, ManifestItem>,

    pub spine: Vec<SpineItem>,

    /// Manifest id of the NCX, as named by the spine
    pub spine_toc: Option<String>,

    pub catalog: Vec<NavPoint>,

    pub catalog_title: String,

    pub current_spine_index: usize,
}

impl<R: Read + Seek> EpubDoc<R> {
    /// Opens a container from any seekable reader
    ///
    /// # Return
    /// - `Ok(EpubDoc<R>)`: The container passed every structural check
    /// - `Err(EpubError)`: The first violation that was found
    pub fn from_reader(reader: R) -> Result<Self, EpubError> {
        let mut archive = ZipArchive::new(reader)?;
        mimetype_entry_check(&mut archive)?;
        compression_method_check(&mut archive)?;

        let package_path = locate_rootfile(&mut archive)?;
        let base_path = package_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let package = XmlReader::parse_bytes(get_file_in_zip_archive(
            &mut archive,
            &to_zip_path(&package_path),
        )?)?;
        let version = match package.get_attr("version").as_deref() {
            Some("2.0") => EpubVersion::Version2_0,
            Some("3.0") => EpubVersion::Version3_0,
            _ => return Err(EpubError::UnrecognizedEpubVersion),
        };

        let metadata = read_metadata(section(&package, "metadata")?);
        let manifest = read_manifest(section(&package, "manifest")?, &base_path)?;
        let spine_element = section(&package, "spine")?;
        let spine = read_spine(spine_element, &manifest)?;

        let uid = package.get_attr("unique-identifier");
        let unique_identifier = metadata
            .iter()
            .filter(|item| item.property == "identifier")
            .find(|item| uid.is_none() || item.id == uid)
            .map(|item| item.value.clone())
            .ok_or_else(|| EpubError::NonCanonicalFile {
                tag: "dc:identifier".to_string(),
            })?;

        let mut doc = Self {
            archive,
            package_path,
            base_path,
            version,
            unique_identifier,
            metadata,
            manifest,
            spine,
            spine_toc: spine_element.get_attr("toc"),
            catalog: vec![],
            catalog_title: String::new(),
            current_spine_index: 0,
        };
        doc.read_catalog()?;

        Ok(doc)
    }

    /// Reads the table of contents
    ///
    /// An NCX named by the spine wins over the EPUB 3 navigation document.
    fn read_catalog(&mut self) -> Result<(), EpubError> {
        if let Some(toc_id) = &self.spine_toc {
            let path = self
                .manifest
                .get(toc_id)
                .map(|item| to_zip_path(&item.path))
                .ok_or_else(|| EpubError::ResourceIdNotExist { id: toc_id.clone() })?;
            let ncx = XmlReader::parse_bytes(get_file_in_zip_archive(&mut self.archive, &path)?)?;

            match ncx.find_elements_by_name("docTitle").next() {
                Some(title) => self.catalog_title = title.text().normalize_whitespace(),
                None => warn!("The NCX '{}' has no docTitle.", path),
            }
            self.catalog = ncx_points(section(&ncx, "navMap")?);
            return Ok(());
        }

        let nav_path = self
            .manifest
            .values()
            .find(|item| item.has_property("nav"))
            .map(|item| to_zip_path(&item.path));
        let Some(nav_path) = nav_path else {
            if self.version == EpubVersion::Version3_0 {
                return Err(EpubError::NonCanonicalEpub {
                    expected_file: "Navigation Document".to_string(),
                });
            }
            warn!("The publication has neither an NCX nor a navigation document.");
            return Ok(());
        };

        let document =
            XmlReader::parse_bytes(get_file_in_zip_archive(&mut self.archive, &nav_path)?)?;
        let toc = document
            .find_elements_by_name("nav")
            .find(|nav| nav.get_attr("epub:type").as_deref() == Some("toc"))
            .ok_or_else(|| EpubError::NonCanonicalFile {
                tag: "nav".to_string(),
            })?;

        if let Some(heading) = toc
            .children()
            .find(|child| matches!(child.name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
        {
            self.catalog_title = heading.text().normalize_whitespace();
        }
        self.catalog = nav_items(toc.find_children_by_name("ol").next().ok_or_else(|| {
            EpubError::NonCanonicalFile {
                tag: "ol".to_string(),
            }
        })?)?;

        Ok(())
    }

    /// Values of every metadata item with the given property
    pub fn get_metadata_value(&self, property: &str) -> Option<Vec<String>> {
        let values = self
            .metadata
            .iter()
            .filter(|item| item.property == property)
            .map(|item| item.value.clone())
            .collect::<Vec<_>>();

        (!values.is_empty()).then_some(values)
    }

    pub fn get_title(&self) -> Result<Vec<String>, EpubError> {
        self.required_metadata("title")
    }

    pub fn get_language(&self) -> Result<Vec<String>, EpubError> {
        self.required_metadata("language")
    }

    pub fn get_identifier(&self) -> Result<Vec<String>, EpubError> {
        self.required_metadata("identifier")
    }

    fn required_metadata(&self, property: &str) -> Result<Vec<String>, EpubError> {
        self.get_metadata_value(property)
            .ok_or_else(|| EpubError::NonCanonicalFile {
                tag: format!("dc:{}", property),
            })
    }

    /// Reads a manifest item, returning its bytes and media type
    pub fn get_manifest_item(&mut self, id: &str) -> Result<(Vec<u8>, String), EpubError> {
        let item = self
            .manifest
            .get(id)
            .ok_or_else(|| EpubError::ResourceIdNotExist { id: id.to_string() })?;
        let (path, mime) = (to_zip_path(&item.path), item.mime.clone());

        match get_file_in_zip_archive(&mut self.archive, &path) {
            Ok(data) => Ok((data, mime)),
            Err(EpubError::ArchiveError {
                source: ZipError::FileNotFound,
            }) => Err(EpubError::ResourceNotFound { resource: path }),
            Err(err) => Err(err),
        }
    }

    /// Reads a manifest item by a path relative to the container root or
    /// to the package document
    pub fn get_manifest_item_by_path(
        &mut self,
        path: &str,
    ) -> Result<(Vec<u8>, String), EpubError> {
        let from_package = resolve_href(&self.base_path, path);
        let id = self
            .manifest
            .values()
            .find(|item| item.path == Path::new(path) || from_package.as_ref() == Some(&item.path))
            .map(|item| item.id.clone())
            .ok_or_else(|| EpubError::ResourceNotFound {
                resource: path.to_string(),
            })?;

        self.get_manifest_item(&id)
    }

    /// Moves the reading position and returns the document found there
    pub fn navigate_by_spine_index(&mut self, index: usize) -> Option<(Vec<u8>, String)> {
        let idref = self.spine.get(index)?.idref.clone();
        self.current_spine_index = index;
        self.get_manifest_item(&idref).ok()
    }
}

impl EpubDoc<Cursor<Vec<u8>>> {
    /// Opens a container held in memory
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, EpubError> {
        Self::from_reader(Cursor::new(data))
    }
}

/// Finds the package document through `META-INF/container.xml`
///
/// Only the first rootfile is considered.
fn locate_rootfile<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<PathBuf, EpubError> {
    let container = match get_file_in_zip_archive(archive, CONTAINER_PATH) {
        Ok(data) => data.decode()?,
        Err(EpubError::ArchiveError {
            source: ZipError::FileNotFound,
        }) => {
            return Err(EpubError::NonCanonicalEpub {
                expected_file: CONTAINER_PATH.to_string(),
            });
        }
        Err(err) => return Err(err),
    };

    let root = XmlReader::parse(&container)?;
    let rootfile = section(&root, "rootfile")?;
    Ok(PathBuf::from(required_attr(rootfile, "full-path")?))
}

fn section<'a>(root: &'a XmlElement, name: &str) -> Result<&'a XmlElement, EpubError> {
    root.find_elements_by_name(name)
        .next()
        .ok_or_else(|| EpubError::NonCanonicalFile {
            tag: name.to_string(),
        })
}

fn required_attr(element: &XmlElement, attribute: &str) -> Result<String, EpubError> {
    element
        .get_attr(attribute)
        .ok_or_else(|| EpubError::MissingRequiredAttribute {
            tag: element.tag_name(),
            attribute: attribute.to_string(),
        })
}

/// Collects Dublin Core elements and `meta` elements
///
/// A `meta` with `refines` is attached to the item it points at. EPUB 2
/// style `name`/`content` pairs become items named after `name`.
fn read_metadata(element: &XmlElement) -> Vec<MetadataItem> {
    let mut items = Vec::new();
    let mut refinements = HashMap::<String, Vec<MetadataRefinement>>::new();

    for child in element.children() {
        let is_dc = child.namespace.as_deref() == Some(DC_NAMESPACE);
        if !is_dc && child.name != "meta" {
            continue;
        }

        let value = child.text().normalize_whitespace();
        let property = match is_dc {
            true => Some(child.name.clone()),
            false => child.get_attr("property"),
        };

        match (property, child.get_attr("refines")) {
            (Some(property), Some(refines)) if !is_dc => {
                let target = refines.trim_start_matches('#').to_string();
                refinements
                    .entry(target.clone())
                    .or_default()
                    .push(MetadataRefinement {
                        refines: target,
                        property,
                        value,
                        scheme: child.get_attr("scheme"),
                    });
            }
            (Some(property), _) => items.push(MetadataItem {
                id: child.get_attr("id"),
                property,
                value,
                lang: child.get_attr("xml:lang"),
                refined: vec![],
            }),
            (None, _) => match (child.get_attr("name"), child.get_attr("content")) {
                (Some(name), Some(content)) => items.push(MetadataItem::new(&name, &content)),
                _ => warn!("Skipping a meta element without a property."),
            },
        }
    }

    for item in &mut items {
        if let Some(refined) = item.id.as_ref().and_then(|id| refinements.remove(id)) {
            item.refined = refined;
        }
    }

    items
}

fn read_manifest(
    element: &XmlElement,
    base_path: &Path,
) -> Result<IndexMap<String, ManifestItem>, EpubError> {
    let mut manifest = IndexMap::new();

    for item in element.find_children_by_name("item") {
        let id = required_attr(item, "id")?;
        let href = required_attr(item, "href")?;
        let path = resolve_href(base_path, &href)
            .ok_or(EpubError::ResourceNotFound { resource: href })?;

        manifest.insert(
            id.clone(),
            ManifestItem {
                id,
                path,
                mime: required_attr(item, "media-type")?,
                properties: item.get_attr("properties"),
            },
        );
    }

    Ok(manifest)
}

/// Reads the spine; every itemref must name a manifest item
fn read_spine(
    element: &XmlElement,
    manifest: &IndexMap<String, ManifestItem>,
) -> Result<Vec<SpineItem>, EpubError> {
    element
        .find_children_by_name("itemref")
        .map(|itemref| {
            let idref = required_attr(itemref, "idref")?;
            if !manifest.contains_key(&idref) {
                return Err(EpubError::ResourceIdNotExist { id: idref });
            }

            Ok(SpineItem {
                idref,
                id: itemref.get_attr("id"),
                properties: itemref.get_attr("properties"),
                linear: itemref.get_attr("linear").as_deref() != Some("no"),
            })
        })
        .collect()
}

/// NCX navigation points, ordered by play order
fn ncx_points(parent: &XmlElement) -> Vec<NavPoint> {
    let mut points = parent
        .find_children_by_name("navPoint")
        .map(|point| NavPoint {
            label: point
                .find_children_by_name("navLabel")
                .next()
                .map(|label| label.text().normalize_whitespace())
                .unwrap_or_default(),
            content: point
                .find_children_by_name("content")
                .next()
                .and_then(|content| content.get_attr("src"))
                .map(PathBuf::from),
            play_order: point
                .get_attr("playOrder")
                .and_then(|order| order.parse().ok()),
            children: ncx_points(point),
        })
        .collect::<Vec<_>>();

    points.sort();
    points
}

/// Entries of a navigation document list, `<li>` with an `<a>` or `<span>`
fn nav_items(list: &XmlElement) -> Result<Vec<NavPoint>, EpubError> {
    list.children()
        .map(|entry| {
            if entry.name != "li" {
                return Err(EpubError::NonCanonicalFile {
                    tag: "li".to_string(),
                });
            }

            let label = entry
                .children()
                .find(|child| child.name == "a" || child.name == "span")
                .ok_or_else(|| EpubError::NonCanonicalFile {
                    tag: "a".to_string(),
                })?;
            let children = match entry.find_children_by_name("ol").next() {
                Some(nested) => nav_items(nested)?,
                None => vec![],
            };

            Ok(NavPoint {
                label: label.text().normalize_whitespace(),
                content: label.get_attr("href").map(PathBuf::from),
                children,
                play_order: None,
            })
        })
        .collect()
}

/// Resolves an href against the package directory
///
/// Fragments are removed and `.` / `..` segments are applied; `None` is
/// returned when the path would leave the container.
fn resolve_href(base_path: &Path, href: &str) -> Option<PathBuf> {
    let href = href.split('#').next().unwrap_or_default();

    let mut segments = match href.starts_with('/') {
        true => vec![],
        false => base_path
            .components()
            .map(|component| component.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>(),
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment.to_string()),
        }
    }

    Some(PathBuf::from(segments.join("/")))
}

fn to_zip_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
