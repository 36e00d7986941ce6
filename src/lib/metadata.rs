//! Document metadata and the PDF `Info` dictionary.
//!
//! The layout engine only records a title, so the remaining entries are
//! written afterwards by patching the rendered bytes with `lopdf`.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use lopdf::{Dictionary, Document, Object, StringFormat};
use log::{debug, warn};

use crate::util::sorted_unique;
use crate::ReportError;

/// Metadata keys accepted by [`DocumentMetadata::set`].
pub const METADATA_KEYS: [&str; 6] = ["title", "author", "subject", "keywords", "date", "creator"];

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    /// Sorted, without duplicates.
    pub keywords: Vec<String>,
    pub date: NaiveDate,
    pub creator: String,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            subject: None,
            keywords: Vec::new(),
            date: Local::now().date_naive(),
            creator: format!("predictables-report {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DocumentMetadata {
    /// The date as `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Sets a field by name. Returns `false` for unknown keys and for dates
    /// that do not parse as `YYYY-MM-DD`; both are logged and ignored.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match key.to_lowercase().as_str() {
            "title" => self.title = Some(value.to_string()),
            "author" => self.author = Some(value.to_string()),
            "subject" => self.subject = Some(value.to_string()),
            "keywords" => {
                self.keywords = sorted_unique(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string),
                )
            }
            "creator" => self.creator = value.to_string(),
            "date" => match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                Ok(date) => self.date = date,
                Err(e) => {
                    warn!("Ignoring metadata date '{}': {}", value, e);
                    return false;
                }
            },
            _ => {
                warn!(
                    "Unknown metadata key '{}' (expected one of {}); ignored",
                    key,
                    METADATA_KEYS.join(", ")
                );
                return false;
            }
        }
        true
    }

    /// `Info` dictionary entries, keyed by PDF name.
    pub fn info_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(title) = &self.title {
            entries.push(("Title", title.clone()));
        }
        if let Some(author) = &self.author {
            entries.push(("Author", author.clone()));
        }
        if let Some(subject) = &self.subject {
            entries.push(("Subject", subject.clone()));
        }
        if !self.keywords.is_empty() {
            entries.push(("Keywords", self.keywords.join(", ")));
        }
        entries.push(("Creator", self.creator.clone()));
        let stamp = format!("D:{}000000", self.date.format("%Y%m%d"));
        entries.push(("CreationDate", stamp.clone()));
        entries.push(("ModDate", stamp));
        entries
    }
}

/// Encodes text as a PDF string: literal for ASCII, UTF-16BE with a byte
/// order mark otherwise.
fn pdf_text(value: &str) -> Object {
    if value.is_ascii() {
        Object::string_literal(value)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(value.encode_utf16().flat_map(|u| u.to_be_bytes()));
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn decode_pdf_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

fn pdf_error(context: &str, e: lopdf::Error) -> ReportError {
    ReportError::PdfError {
        message: format!("{}: {}", context, e),
        path: None,
        suggestion: Some("The rendered document could not be post-processed".to_string()),
    }
}

/// Returns the trailer's `Info` dictionary, creating one if absent.
fn info_dictionary(doc: &mut Document) -> Result<&mut Dictionary, ReportError> {
    let existing = doc.trailer.get(b"Info").ok().cloned();
    let id = match existing {
        Some(Object::Reference(id)) => id,
        Some(Object::Dictionary(dict)) => {
            let id = doc.add_object(dict);
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
        _ => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| pdf_error("Invalid Info dictionary", e))
}

/// Writes `metadata` into the `Info` dictionary of a rendered PDF.
pub fn stamp(pdf: &[u8], metadata: &DocumentMetadata) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::load_mem(pdf).map_err(|e| pdf_error("Could not parse rendered PDF", e))?;

    let info = info_dictionary(&mut doc)?;
    for (key, value) in metadata.info_entries() {
        info.set(key, pdf_text(&value));
    }
    debug!("Stamped {} metadata entries", metadata.info_entries().len());

    let mut out = Vec::with_capacity(pdf.len());
    doc.save_to(&mut out)
        .map_err(|e| ReportError::IoError {
            message: format!("Could not serialise PDF: {}", e),
            path: None,
            suggestion: None,
        })?;
    Ok(out)
}

/// Reads the string entries of a PDF's `Info` dictionary.
pub fn read_info(pdf: &[u8]) -> Result<BTreeMap<String, String>, ReportError> {
    let doc = Document::load_mem(pdf).map_err(|e| pdf_error("Could not parse PDF", e))?;
    let mut entries = BTreeMap::new();

    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    if let Some(info) = info {
        for (key, value) in info.iter() {
            if let Object::String(bytes, _) = value {
                entries.insert(String::from_utf8_lossy(key).into_owned(), decode_pdf_text(bytes));
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_known_keys() {
        let mut meta = DocumentMetadata::default();
        assert!(meta.set("Title", "Quarterly"));
        assert!(meta.set("keywords", "ratio, loss , ,model,loss"));
        assert!(meta.set("date", "2024-03-09"));
        assert_eq!(meta.title.as_deref(), Some("Quarterly"));
        assert_eq!(meta.keywords, ["loss", "model", "ratio"]);
        assert_eq!(meta.date_string(), "2024-03-09");
    }

    #[test]
    fn test_set_unknown_key_is_ignored() {
        let mut meta = DocumentMetadata::default();
        let before = meta.clone();
        assert!(!meta.set("colour", "blue"));
        assert!(!meta.set("date", "9 March"));
        assert_eq!(meta, before);
    }

    #[test]
    fn test_default_date_is_today() {
        let meta = DocumentMetadata::default();
        assert_eq!(meta.date, Local::now().date_naive());
        assert_eq!(meta.date_string().len(), 10);
    }

    #[test]
    fn test_info_entries_format_date() {
        let mut meta = DocumentMetadata::default();
        meta.set("date", "2023-12-01");
        let entries = meta.info_entries();
        assert!(entries.contains(&("CreationDate", "D:20231201000000".to_string())));
        assert!(!entries.iter().any(|(k, _)| *k == "Title"));
    }

    #[test]
    fn test_pdf_text_encoding() {
        assert!(matches!(pdf_text("plain"), Object::String(ref b, StringFormat::Literal) if b == b"plain"));
        if let Object::String(bytes, _) = pdf_text("Zürich") {
            assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
            assert_eq!(decode_pdf_text(&bytes), "Zürich");
        } else {
            panic!("expected a string object");
        }
    }

    #[test]
    fn test_stamp_rejects_garbage() {
        assert!(matches!(
            stamp(b"not a pdf", &DocumentMetadata::default()),
            Err(ReportError::PdfError { .. })
        ));
    }
}
