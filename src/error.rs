//! Error Type Definition Module
//!
//! This module defines the error types that may be encountered while
//! generating and inspecting EPUB containers. Fatal errors are uniformly
//! wrapped in the `EpubError` enumeration; recoverable problems are reported
//! as [Diagnostic] values and never abort a generation.
//!
//! ## Main Error Types
//!
//! - [EpubError] - Enumeration of main errors during EPUB processing
//! - [ValidationError] - Request problems detected before any rendering starts
//! - [EpubBuilderError] - Specific errors during the EPUB build process
//! - [Diagnostic] - Recoverable warnings collected during one generation

use thiserror::Error;

/// Types of errors that can occur during EPUB processing
///
/// This enumeration defines the error cases that can be encountered
/// when building EPUB containers or reading them back, including archive
/// errors, XML errors and structural violations.
#[derive(Debug, Error)]
pub enum EpubError {
    /// ZIP archive related errors
    ///
    /// Errors occur when writing or reading the ZIP structure of EPUB files.
    #[error("Archive error: {source}")]
    ArchiveError { source: zip::result::ZipError },

    /// Data Decoding Error - Null data
    ///
    /// This error occurs when trying to decode an empty stream.
    #[error("Decode error: The data is empty.")]
    EmptyDataError,

    #[error("Epub builder error: {source}")]
    EpubBuilderError { source: EpubBuilderError },

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Invalid mimetype entry error
    ///
    /// The first entry of an EPUB container must be an uncompressed file named
    /// `mimetype` whose content is exactly `application/epub+zip`.
    #[error("Invalid mimetype entry: {reason}")]
    InvalidMimetype { reason: String },

    /// Missing required attribute error
    ///
    /// Triggered when an XML element lacks an attribute required by the EPUB specification.
    #[error(
        "Missing required attribute: The \"{attribute}\" attribute is a must attribute for the \"{tag}\" element."
    )]
    MissingRequiredAttribute { tag: String, attribute: String },

    /// Non-canonical EPUB structure error
    ///
    /// This error occurs when an EPUB file lacks some files that are
    /// required in EPUB specification.
    #[error("Non-canonical epub: The \"{expected_file}\" file was not found.")]
    NonCanonicalEpub { expected_file: String },

    /// Non-canonical file structure error
    ///
    /// This error is triggered when the required XML elements are missing.
    #[error("Non-canonical file: The \"{tag}\" elements was not found.")]
    NonCanonicalFile { tag: String },

    /// Unable to find the resource id error
    #[error("Resource Id Not Exist: There is no resource item with id \"{id}\".")]
    ResourceIdNotExist { id: String },

    /// Unable to find the resource error
    #[error("Resource not found: Unable to find resource from \"{resource}\".")]
    ResourceNotFound { resource: String },

    /// Unrecognized EPUB version error
    #[error(
        "Unrecognized EPUB version: Unable to identify version number and version characteristics from epub file"
    )]
    UnrecognizedEpubVersion,

    /// Unusable compression method error
    ///
    /// OCF containers may only use Stored or Deflated entries.
    #[error(
        "Unusable compression method: The \"{file}\" file uses the unsupported \"{method}\" compression method."
    )]
    UnusableCompressionMethod { file: String, method: String },

    /// UTF-8 decoding error
    #[error("Decode error: {source}")]
    Utf8DecodeError { source: std::string::FromUtf8Error },

    /// UTF-16 decoding error
    #[error("Decode error: {source}")]
    Utf16DecodeError { source: std::string::FromUtf16Error },

    /// Request validation error
    ///
    /// Raised before any rendering work begins; no partial output exists.
    #[error("Validation error: {source}")]
    ValidationError { source: ValidationError },

    /// QuickXml error
    #[error("QuickXml error: {source}")]
    QuickXmlError { source: quick_xml::Error },
}

impl From<zip::result::ZipError> for EpubError {
    fn from(value: zip::result::ZipError) -> Self {
        EpubError::ArchiveError { source: value }
    }
}

impl From<quick_xml::Error> for EpubError {
    fn from(value: quick_xml::Error) -> Self {
        EpubError::QuickXmlError { source: value }
    }
}

impl From<std::io::Error> for EpubError {
    fn from(value: std::io::Error) -> Self {
        EpubError::IOError { source: value }
    }
}

impl From<std::string::FromUtf8Error> for EpubError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        EpubError::Utf8DecodeError { source: value }
    }
}

impl From<std::string::FromUtf16Error> for EpubError {
    fn from(value: std::string::FromUtf16Error) -> Self {
        EpubError::Utf16DecodeError { source: value }
    }
}

impl From<EpubBuilderError> for EpubError {
    fn from(value: EpubBuilderError) -> Self {
        EpubError::EpubBuilderError { source: value }
    }
}

impl From<ValidationError> for EpubError {
    fn from(value: ValidationError) -> Self {
        EpubError::ValidationError { source: value }
    }
}

#[cfg(test)]
impl PartialEq for EpubError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::MissingRequiredAttribute {
                    tag: l_tag,
                    attribute: l_attribute,
                },
                Self::MissingRequiredAttribute {
                    tag: r_tag,
                    attribute: r_attribute,
                },
            ) => l_tag == r_tag && l_attribute == r_attribute,
            (
                Self::NonCanonicalEpub {
                    expected_file: l_expected_file,
                },
                Self::NonCanonicalEpub {
                    expected_file: r_expected_file,
                },
            ) => l_expected_file == r_expected_file,
            (Self::NonCanonicalFile { tag: l_tag }, Self::NonCanonicalFile { tag: r_tag }) => {
                l_tag == r_tag
            }
            (Self::InvalidMimetype { reason: l_reason }, Self::InvalidMimetype { reason: r_reason }) => {
                l_reason == r_reason
            }
            (Self::ResourceIdNotExist { id: l_id }, Self::ResourceIdNotExist { id: r_id }) => {
                l_id == r_id
            }
            (
                Self::ResourceNotFound {
                    resource: l_resource,
                },
                Self::ResourceNotFound {
                    resource: r_resource,
                },
            ) => l_resource == r_resource,
            (
                Self::EpubBuilderError { source: l_source },
                Self::EpubBuilderError { source: r_source },
            ) => l_source == r_source,
            (
                Self::ValidationError { source: l_source },
                Self::ValidationError { source: r_source },
            ) => l_source == r_source,

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

/// Problems with a generation request
///
/// These are detected while validating the request and short-circuit the
/// generation before any page is rendered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The request contains no chapters.
    #[error("At least one chapter is required")]
    EmptyFragments,

    /// The book title is empty or whitespace only.
    #[error("The book title must not be empty")]
    EmptyTitle,

    /// The requested output format is neither EPUB nor a Kindle format
    /// that can be degraded to EPUB.
    #[error("Unsupported format: {format}. Supported: epub")]
    UnsupportedFormat { format: String },
}

/// Types of errors that can occur during EPUB build
///
/// These errors are related to EPUB specification requirements that
/// the builder checks while assembling the package.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EpubBuilderError {
    /// Duplicate manifest item error
    ///
    /// Two resources were registered with the same id or the same path.
    #[error("A manifest item with id '{manifest_id}' or the same path already exists.")]
    DuplicateManifestItem { manifest_id: String },

    /// Illegal manifest path error
    ///
    /// This error is triggered when the path of a manifest item begins with "../"
    /// or is absolute; such resources would escape the package directory.
    #[error(
        "A manifest with id '{manifest_id}' should not use an absolute path or a relative path starting with '../'."
    )]
    IllegalManifestPath { manifest_id: String },

    /// Invalid rootfile path error
    ///
    /// Rootfile paths must be relative paths that do not start with "../".
    #[error("A rootfile path should be a relative path and not start with '../'.")]
    IllegalRootfilePath,

    /// Missing necessary metadata error
    ///
    /// The following must be included: title, language, and an identifier with a 'pub-id' ID.
    #[error("Requires at least one 'title', 'language', and 'identifier' with id 'pub-id'.")]
    MissingNecessaryMetadata,

    /// Navigation information uninitialized error
    ///
    /// This error is triggered when navigation is requested but no content document was added.
    #[error("Navigation information is not set.")]
    NavigationInfoUninitalized,
}

/// Recoverable problems found during one generation
///
/// A diagnostic never changes the outcome of a generation. The orchestrator
/// logs every diagnostic and returns them alongside the result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The cover reference is a remote URL; remote covers are never fetched.
    #[error("Cover image '{url}' is a remote URL and was not fetched; the book has no cover.")]
    RemoteCoverNotFetched { url: String },

    /// The data-URI header of the cover could not be understood.
    #[error("Cover image has a malformed data URI header: '{header}'.")]
    MalformedCoverHeader { header: String },

    /// The data-URI declares a media type that is not an image.
    #[error("Cover image media type '{mime}' is not an image type.")]
    UnsupportedCoverMediaType { mime: String },

    /// The cover payload is not valid base64, or decodes to nothing.
    #[error("Cover image data could not be decoded: {reason}")]
    InvalidCoverData { reason: String },
}
