use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of record node found in an EFetch document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// `<PubmedArticle>`
    Article,
    /// `<PubmedBookArticle>`
    Book,
}

impl RecordKind {
    /// XML element name of this record kind
    pub fn element_name(&self) -> &'static str {
        match self {
            RecordKind::Article => "PubmedArticle",
            RecordKind::Book => "PubmedBookArticle",
        }
    }

    pub(crate) fn from_element_name(name: &[u8]) -> Option<Self> {
        match name {
            b"PubmedArticle" => Some(RecordKind::Article),
            b"PubmedBookArticle" => Some(RecordKind::Book),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Article => f.write_str("article"),
            RecordKind::Book => f.write_str("book"),
        }
    }
}

/// One undecoded record node, holding the element's full XML text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub kind: RecordKind,
    pub xml: String,
}

/// Record produced by the built-in decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubMedRecord {
    pub kind: RecordKind,
    /// PubMed ID
    pub pmid: String,
    /// Article title, or book/chapter title for books
    pub title: String,
    pub abstract_text: Option<String>,
    /// Authors as "ForeName LastName" (or collective name)
    pub authors: Vec<String>,
    /// Journal title for articles, publisher name for books
    pub source: Option<String>,
    pub doi: Option<String>,
}
