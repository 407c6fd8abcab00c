//! Epub packager
//!
//! A Rust library for turning chapters of HTML markup into EPUB eBooks.
//!
//! The library takes book metadata, an optional cover image and a list of
//! content fragments, renders every fragment into a well-formed XHTML page and
//! packages the result into an EPUB container that passes the structural
//! checks of e-readers. The container is produced entirely in memory.
//! Generated containers can be opened again with [epub::EpubDoc] to inspect
//! their metadata, manifest, reading order and table of contents.
//!
//! ## Features
//!
//! - EPUB 3 packages with an XHTML navigation document, or EPUB 2 packages.
//! - Optional legacy NCX navigation for older readers.
//! - Tolerant rendering of malformed or empty chapter markup.
//! - Cover images from data URIs or bare base64 payloads.
//! - Kindle format requests answered with an EPUB ready for conversion.
//!
//! ## Quick Start
//!
//! ### Generate a book
//!
//! ```rust
//! # use epub_packager::{generate, BookMetadata, Fragment, GenerationRequest};
//! let request = GenerationRequest::new(
//!     BookMetadata::new("The Voyage").with_author("A. Writer"),
//!     vec![
//!         Fragment::new("Departure", "<p>We left at dawn.</p>").with_order(0),
//!         Fragment::new("Arrival", "<p>We arrived at dusk.").with_order(1),
//!     ],
//! );
//!
//! let response = generate(&request);
//! assert!(response.success);
//! assert_eq!(response.filename, "The_Voyage.epub");
//! ```
//!
//! ### Inspect the result
//!
//! ```rust
//! # use epub_packager::{epub::EpubDoc, generate, BookMetadata, Fragment, GenerationRequest};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let request = GenerationRequest::new(
//! #     BookMetadata::new("The Voyage"),
//! #     vec![Fragment::new("Departure", "<p>We left at dawn.</p>")],
//! # );
//! # let data = generate(&request).file_data.unwrap_or_default();
//! let mut doc = EpubDoc::from_bytes(data)?;
//!
//! println!("Title: {:?}", doc.get_title()?);
//! println!("Chapters: {}", doc.spine.len());
//!
//! let (_content, _mime) = doc.get_manifest_item("chapter_1")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `serde` (enabled by default): derives `serde` traits for the request and
//!   response types, using camelCase field names and base64 for the file data.

pub(crate) mod utils;

pub mod builder;
pub mod epub;
pub mod error;
pub mod generator;
pub mod types;

pub use generator::{EpubGenerator, GeneratorConfig, generate};
pub use types::{BookMetadata, Fragment, GenerationRequest, GenerationResponse};
pub use utils::DecodeBytes;
