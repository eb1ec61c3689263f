//! PubMed XML scanning
//!
//! The fetch path never deserializes a whole EFetch document. It scans the
//! document once with a `quick_xml::Reader`, cuts out the raw XML of every
//! `<PubmedArticle>` and `<PubmedBookArticle>` element, and hands those nodes to a
//! [`RecordDecoder`](crate::pubmed::decoder::RecordDecoder) one at a time.
//!
//! - `preprocessing` - inline formatting tag removal used by the decoder

mod preprocessing;

pub(crate) use preprocessing::strip_inline_html_tags;

use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::name::QName;
use tracing::{debug, instrument};

use crate::error::{PubMedError, Result};
use crate::pubmed::models::{RawRecord, RecordKind};

/// Split an EFetch document into raw record nodes
///
/// Every `<PubmedArticle>` is returned first, in document order, followed by every
/// `<PubmedBookArticle>`, in document order. Articles and books are not
/// interleaved even when the document interleaves them.
///
/// # Errors
///
/// * `PubMedError::XmlError` - the document is not well-formed
/// * `PubMedError::Protocol` - the document is an `<ERROR>` payload
///
/// An `<ERROR>` reporting an empty result ("Empty result - nothing to do"), which is
/// what EFetch answers for a window starting past the last stored record, is not an
/// error: it contributes no records.
///
/// # Example
///
/// ```
/// use pubmed_history_client::pubmed::parser::scan_records;
/// use pubmed_history_client::pubmed::RecordKind;
///
/// let xml = r#"<PubmedArticleSet>
///   <PubmedBookArticle><BookDocument><PMID>2</PMID></BookDocument></PubmedBookArticle>
///   <PubmedArticle><MedlineCitation><PMID>1</PMID></MedlineCitation></PubmedArticle>
/// </PubmedArticleSet>"#;
///
/// let records = scan_records(xml).unwrap();
/// assert_eq!(records[0].kind, RecordKind::Article);
/// assert_eq!(records[1].kind, RecordKind::Book);
/// ```
#[instrument(skip(xml), fields(xml_size = xml.len()))]
pub fn scan_records(xml: &str) -> Result<Vec<RawRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut articles = Vec::new();
    let mut books = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if let Some(kind) = RecordKind::from_element_name(e.name().as_ref()) {
                    let tag_end = reader.buffer_position() as usize;
                    reader.read_to_end(e.name())?;
                    let after = reader.buffer_position() as usize;
                    let record = RawRecord {
                        kind,
                        xml: element_text(xml, tag_end, after).to_string(),
                    };
                    match kind {
                        RecordKind::Article => articles.push(record),
                        RecordKind::Book => books.push(record),
                    }
                } else if e.name().as_ref() == b"ERROR" {
                    let text = reader.read_text(e.name())?;
                    let message = text.trim();
                    if is_empty_result(message) {
                        debug!(message = message, "EFetch returned an empty result");
                        continue;
                    }
                    return Err(PubMedError::Protocol(format!(
                        "service returned an error document: {}",
                        message
                    )));
                }
            }
            Event::Empty(e) => {
                if let Some(kind) = RecordKind::from_element_name(e.name().as_ref()) {
                    let after = reader.buffer_position() as usize;
                    let record = RawRecord {
                        kind,
                        xml: element_text(xml, after, after).to_string(),
                    };
                    match kind {
                        RecordKind::Article => articles.push(record),
                        RecordKind::Book => books.push(record),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(
        articles = articles.len(),
        books = books.len(),
        "Scanned EFetch document"
    );

    articles.extend(books);
    Ok(articles)
}

/// Text of the first `<tag>` element in `xml`, unescaped and trimmed
///
/// Returns `Ok(None)` when the document holds no such element.
pub fn first_element_text(xml: &str, tag: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name() == QName(tag.as_bytes()) => {
                let raw = reader.read_text(e.name())?;
                let text = quick_xml::escape::unescape(&raw)
                    .map_err(|err| PubMedError::XmlError(err.to_string()))?;
                return Ok(Some(text.trim().to_string()));
            }
            Event::Empty(e) if e.name() == QName(tag.as_bytes()) => {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// EFetch's answer when `retstart` lies beyond the stored result set
fn is_empty_result(message: &str) -> bool {
    message.to_ascii_lowercase().starts_with("empty result")
}

/// Slice out one element, given the end of its start tag and the end of the element
///
/// Attribute values cannot contain `<`, so the last `<` before `tag_end` opens the
/// element.
fn element_text(xml: &str, tag_end: usize, element_end: usize) -> &str {
    let start = xml[..tag_end].rfind('<').unwrap_or(0);
    &xml[start..element_end]
}
