//! Cover Image Codec
//!
//! Turns the cover reference of a [BookMetadata](crate::types::BookMetadata)
//! into image bytes and a media type. Three forms are understood:
//!
//! - `data:<media type>;base64,<payload>` URIs
//! - bare base64 payloads, sniffed for a known image signature and treated as
//!   JPEG otherwise
//! - `http(s)://` URLs, which are never fetched
//!
//! Every failure is reported as a [Diagnostic]; a bad cover never stops a book
//! from being generated.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use infer::{Infer, MatcherType};

use crate::error::Diagnostic;

const DEFAULT_COVER_MIME: &str = "image/jpeg";

/// A decoded cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,

    /// The media type, always of the form `image/*`
    pub mime: String,
}

impl CoverImage {
    /// Decodes a cover reference
    ///
    /// ## Parameters
    /// - `source`: A data-URI, a bare base64 string or a remote URL
    ///
    /// ## Return
    /// - `Ok(CoverImage)`: The decoded image
    /// - `Err(Diagnostic)`: The reason the cover has to be dropped
    pub fn decode(source: &str) -> Result<Self, Diagnostic> {
        let source = source.trim();
        let lowercase = source.to_ascii_lowercase();

        if lowercase.starts_with("http://") || lowercase.starts_with("https://") {
            return Err(Diagnostic::RemoteCoverNotFetched {
                url: source.to_string(),
            });
        }

        if lowercase.starts_with("data:") {
            Self::decode_data_uri(source)
        } else {
            Self::decode_bare(source)
        }
    }

    /// File extension derived from the media type
    pub fn extension(&self) -> &str {
        match self.mime.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/svg+xml" => "svg",
            mime => {
                let subtype = mime.split_once('/').map_or(mime, |(_, subtype)| subtype);
                subtype.split('+').next().unwrap_or(subtype)
            }
        }
    }

    /// The archive file name of the cover, `cover.<ext>`
    pub fn file_name(&self) -> String {
        format!("cover.{}", self.extension())
    }

    fn decode_data_uri(source: &str) -> Result<Self, Diagnostic> {
        let Some((header, payload)) = source.split_once(',') else {
            return Err(Diagnostic::MalformedCoverHeader {
                header: truncate(source).to_string(),
            });
        };

        // "data:" is ASCII, so the slice is on a char boundary
        let mut params = header[5..].split(';').map(str::trim);
        let mime = params.next().unwrap_or_default().to_ascii_lowercase();
        let is_base64 = params.any(|param| param.eq_ignore_ascii_case("base64"));

        if mime.is_empty() || !is_base64 {
            return Err(Diagnostic::MalformedCoverHeader {
                header: header.to_string(),
            });
        }
        if !is_image_media_type(&mime) {
            return Err(Diagnostic::UnsupportedCoverMediaType { mime });
        }

        let data = decode_base64(payload)?;
        Ok(Self { data, mime })
    }

    fn decode_bare(source: &str) -> Result<Self, Diagnostic> {
        let data = decode_base64(source)?;

        let mime = match Infer::new().get(&data) {
            Some(file_type) if file_type.matcher_type() == MatcherType::Image => {
                file_type.mime_type().to_string()
            }
            _ => DEFAULT_COVER_MIME.to_string(),
        };

        Ok(Self { data, mime })
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, Diagnostic> {
    let cleaned = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();

    if cleaned.is_empty() {
        return Err(Diagnostic::InvalidCoverData {
            reason: "the payload is empty".to_string(),
        });
    }

    let data = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|err| Diagnostic::InvalidCoverData {
            reason: err.to_string(),
        })?;

    if data.is_empty() {
        return Err(Diagnostic::InvalidCoverData {
            reason: "the payload decodes to no data".to_string(),
        });
    }

    Ok(data)
}

/// `image/<subtype>`, where the subtype only uses `[a-z0-9.+-]`
///
/// The subtype names the archive entry of the cover, so it must not carry
/// path separators.
fn is_image_media_type(mime: &str) -> bool {
    match mime.strip_prefix("image/") {
        Some(subtype) => {
            !subtype.is_empty()
                && subtype.bytes().all(|b| {
                    b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-')
                })
        }
        None => false,
    }
}

fn truncate(source: &str) -> &str {
    match source.char_indices().nth(48) {
        Some((index, _)) => &source[..index],
        None => source,
    }
}
