//! Turns uploaded document bytes into clean plain text.

use bytes::Bytes;

use crate::extraction::ExtractionError;

/// Media types the upload boundary accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    PlainText,
}

impl MediaType {
    /// Maps a declared MIME type onto a supported media type. Generic types
    /// like `application/octet-stream` map to nothing so callers can fall
    /// back on the file name.
    pub fn from_mime(mime: &str) -> Option<MediaType> {
        match mime.split(';').next().unwrap_or("").trim() {
            "application/pdf" => Some(MediaType::Pdf),
            "text/plain" | "text/markdown" => Some(MediaType::PlainText),
            _ => None,
        }
    }
}

/// An uploaded document: a byte buffer plus its declared media type.
/// Consumed exactly once by [`normalize`]; nothing downstream keeps it.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Bytes,
    pub media_type: MediaType,
}

/// Plain text derived from a document. Non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub fn for_tests(text: &str) -> Self {
        NormalizedText(text.to_string())
    }
}

/// Extracts text from the document and normalizes whitespace and page
/// artifacts. An empty or undecodable document is fatal: retrying cannot
/// make malformed input readable.
pub fn normalize(doc: &RawDocument) -> Result<NormalizedText, ExtractionError> {
    let text = match doc.media_type {
        MediaType::Pdf => pdf_extract::extract_text_from_mem(&doc.bytes)
            .map_err(|e| ExtractionError::UnreadableDocument(format!("pdf extraction: {e}")))?,
        MediaType::PlainText => String::from_utf8(doc.bytes.to_vec())
            .map_err(|_| ExtractionError::UnreadableDocument("invalid utf-8".to_string()))?,
    };

    let cleaned = clean_text(&text);
    if cleaned.is_empty() {
        return Err(ExtractionError::UnreadableDocument(
            "no text content".to_string(),
        ));
    }
    Ok(NormalizedText(cleaned))
}

fn clean_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace(['\r', '\u{c}'], "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0;
    for line in unified.lines() {
        if is_page_marker(line) {
            continue;
        }
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            // keep at most one blank line between blocks
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(&collapsed);
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

fn is_page_marker(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("--- Page") && line.ends_with("---")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> RawDocument {
        RawDocument {
            bytes: Bytes::copy_from_slice(text.as_bytes()),
            media_type: MediaType::PlainText,
        }
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        let doc = plain("Jane   Doe\t\tEngineer\n\n\n\nSkills:  Rust");
        let text = normalize(&doc).unwrap();
        assert_eq!(text.as_str(), "Jane Doe Engineer\n\nSkills: Rust");
    }

    #[test]
    fn test_normalize_strips_page_markers_and_form_feeds() {
        let doc = plain("Intro\n--- Page 1 ---\nBody\u{c}Tail");
        let text = normalize(&doc).unwrap();
        assert!(!text.as_str().contains("Page 1"));
        assert!(text.as_str().contains("Body"));
        assert!(text.as_str().contains("Tail"));
    }

    #[test]
    fn test_empty_document_is_unreadable() {
        let doc = plain("   \n\n \t ");
        let err = normalize(&doc).unwrap_err();
        assert!(matches!(err, ExtractionError::UnreadableDocument(_)));
    }

    #[test]
    fn test_invalid_utf8_is_unreadable() {
        let doc = RawDocument {
            bytes: Bytes::from_static(&[0xff, 0xfe, 0xfd]),
            media_type: MediaType::PlainText,
        };
        assert!(matches!(
            normalize(&doc),
            Err(ExtractionError::UnreadableDocument(_))
        ));
    }

    #[test]
    fn test_garbage_pdf_bytes_are_unreadable() {
        let doc = RawDocument {
            bytes: Bytes::from_static(b"definitely not a pdf"),
            media_type: MediaType::Pdf,
        };
        assert!(matches!(
            normalize(&doc),
            Err(ExtractionError::UnreadableDocument(_))
        ));
    }

    #[test]
    fn test_from_mime_recognises_supported_types() {
        assert_eq!(MediaType::from_mime("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(
            MediaType::from_mime("text/plain; charset=utf-8"),
            Some(MediaType::PlainText)
        );
        assert_eq!(MediaType::from_mime("image/png"), None);
    }
}
