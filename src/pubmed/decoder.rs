//! Record decoding
//!
//! [`RecordDecoder`] is the seam between the paginated fetch engine and whatever
//! structured record a caller wants. The engine hands every raw
//! `<PubmedArticle>`/`<PubmedBookArticle>` node to the decoder and yields whatever
//! the decoder returns. [`PubMedRecordDecoder`] is the decoder used by default and
//! extracts a small set of bibliographic fields.

use std::fmt;

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::{PubMedError, Result};
use crate::pubmed::models::{PubMedRecord, RawRecord, RecordKind};
use crate::pubmed::parser::strip_inline_html_tags;

/// Converts one raw record node into a structured record
pub trait RecordDecoder {
    type Record;

    fn decode(&self, raw: RawRecord) -> Result<Self::Record>;
}

impl<F, R> RecordDecoder for F
where
    F: Fn(RawRecord) -> Result<R>,
{
    type Record = R;

    fn decode(&self, raw: RawRecord) -> Result<R> {
        self(raw)
    }
}

/// Decoder producing [`PubMedRecord`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct PubMedRecordDecoder;

impl RecordDecoder for PubMedRecordDecoder {
    type Record = PubMedRecord;

    fn decode(&self, raw: RawRecord) -> Result<PubMedRecord> {
        let kind = raw.kind;
        let cleaned = strip_inline_html_tags(&raw.xml);
        let decode_error = |e: quick_xml::de::DeError| PubMedError::Decode {
            kind,
            message: e.to_string(),
        };

        match kind {
            RecordKind::Article => {
                let article: PubmedArticleXml = from_str(&cleaned).map_err(decode_error)?;
                article.into_record()
            }
            RecordKind::Book => {
                let book: PubmedBookArticleXml = from_str(&cleaned).map_err(decode_error)?;
                book.into_record()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PubmedArticleXml {
    #[serde(rename = "MedlineCitation")]
    medline_citation: MedlineCitation,
    #[serde(rename = "PubmedData")]
    pubmed_data: Option<PubmedData>,
}

impl PubmedArticleXml {
    fn into_record(self) -> Result<PubMedRecord> {
        let pmid = self
            .medline_citation
            .pmid
            .map(|p| p.value.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PubMedError::Decode {
                kind: RecordKind::Article,
                message: "missing PMID".to_string(),
            })?;

        let article = self.medline_citation.article;
        let doi = article
            .as_ref()
            .and_then(|a| a.elocation_ids.as_deref())
            .and_then(|ids| find_doi(ids.iter().map(|e| (e.eid_type.as_deref(), &e.value))))
            .or_else(|| {
                self.pubmed_data
                    .and_then(|d| d.article_id_list)
                    .and_then(|list| list.doi())
            });

        let (title, abstract_text, authors, source) = match article {
            Some(article) => (
                article.article_title.unwrap_or_default(),
                article.abstract_section.and_then(|a| a.to_string_opt()),
                article.author_list.map(|l| l.names()).unwrap_or_default(),
                article.journal.and_then(|j| j.title),
            ),
            None => (String::new(), None, Vec::new(), None),
        };

        Ok(PubMedRecord {
            kind: RecordKind::Article,
            pmid,
            title: title.trim().to_string(),
            abstract_text,
            authors,
            source,
            doi,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<PmidXml>,
    #[serde(rename = "Article")]
    article: Option<Article>,
}

#[derive(Debug, Deserialize)]
struct PmidXml {
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(rename = "Journal")]
    journal: Option<Journal>,
    #[serde(rename = "ArticleTitle")]
    article_title: Option<String>,
    #[serde(rename = "Abstract")]
    abstract_section: Option<AbstractSection>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
    #[serde(rename = "ELocationID")]
    elocation_ids: Option<Vec<ELocationID>>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(rename = "Title")]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ELocationID {
    #[serde(rename = "$text")]
    value: String,
    #[serde(rename = "@EIdType")]
    eid_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PubmedData {
    #[serde(rename = "ArticleIdList")]
    article_id_list: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct PubmedBookArticleXml {
    #[serde(rename = "BookDocument")]
    book_document: BookDocument,
    #[serde(rename = "PubmedBookData")]
    pubmed_book_data: Option<PubmedData>,
}

impl PubmedBookArticleXml {
    fn into_record(self) -> Result<PubMedRecord> {
        let document = self.book_document;
        let pmid = document
            .pmid
            .map(|p| p.value.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PubMedError::Decode {
                kind: RecordKind::Book,
                message: "missing PMID".to_string(),
            })?;

        let doi = document
            .article_id_list
            .and_then(|list| list.doi())
            .or_else(|| {
                self.pubmed_book_data
                    .and_then(|d| d.article_id_list)
                    .and_then(|list| list.doi())
            });

        // A chapter has its own ArticleTitle; a whole book only has the BookTitle
        let book = document.book;
        let title = document
            .article_title
            .map(|t| t.value)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                book.as_ref()
                    .and_then(|b| b.book_title.as_ref())
                    .map(|t| t.value.clone())
            })
            .unwrap_or_default();

        // Chapter authors take precedence over the book's editors/authors
        let authors = document
            .author_list
            .map(|l| l.names())
            .filter(|names| !names.is_empty())
            .or_else(|| {
                book.as_ref()
                    .and_then(|b| b.author_list.as_ref())
                    .map(|l| l.names())
            })
            .unwrap_or_default();

        let source = book
            .and_then(|b| b.publisher)
            .and_then(|p| p.publisher_name);

        Ok(PubMedRecord {
            kind: RecordKind::Book,
            pmid,
            title: title.trim().to_string(),
            abstract_text: document.abstract_section.and_then(|a| a.to_string_opt()),
            authors,
            source,
            doi,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BookDocument {
    #[serde(rename = "PMID")]
    pmid: Option<PmidXml>,
    #[serde(rename = "ArticleIdList")]
    article_id_list: Option<ArticleIdList>,
    #[serde(rename = "Book")]
    book: Option<Book>,
    #[serde(rename = "ArticleTitle")]
    article_title: Option<TextWithAttributes>,
    #[serde(rename = "Abstract")]
    abstract_section: Option<AbstractSection>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
struct Book {
    #[serde(rename = "Publisher")]
    publisher: Option<Publisher>,
    #[serde(rename = "BookTitle")]
    book_title: Option<TextWithAttributes>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    #[serde(rename = "PublisherName")]
    publisher_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextWithAttributes {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleId>,
}

impl ArticleIdList {
    fn doi(self) -> Option<String> {
        find_doi(self.ids.iter().map(|id| (id.id_type.as_deref(), &id.value)))
    }
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(rename = "$text", default)]
    value: String,
    #[serde(rename = "@IdType")]
    id_type: Option<String>,
}

fn find_doi<'a>(mut ids: impl Iterator<Item = (Option<&'a str>, &'a String)>) -> Option<String> {
    ids.find(|(id_type, value)| *id_type == Some("doi") && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct AbstractSection {
    #[serde(rename = "AbstractText", default)]
    abstract_texts: Vec<AbstractTextElement>,
}

impl AbstractSection {
    fn to_string_opt(&self) -> Option<String> {
        if self.abstract_texts.is_empty() {
            None
        } else {
            Some(
                self.abstract_texts
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AbstractTextElement {
    Simple(String),
    Structured {
        #[serde(rename = "$text")]
        text: String,
    },
}

impl fmt::Display for AbstractTextElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractTextElement::Simple(text) => write!(f, "{}", text.trim()),
            AbstractTextElement::Structured { text } => write!(f, "{}", text.trim()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<AuthorXml>,
}

impl AuthorList {
    fn names(&self) -> Vec<String> {
        self.authors.iter().filter_map(AuthorXml::display_name).collect()
    }
}

#[derive(Debug, Deserialize)]
struct AuthorXml {
    #[serde(rename = "LastName")]
    last_name: Option<String>,
    #[serde(rename = "ForeName")]
    fore_name: Option<String>,
    #[serde(rename = "CollectiveName")]
    collective_name: Option<String>,
}

impl AuthorXml {
    fn display_name(&self) -> Option<String> {
        match (&self.fore_name, &self.last_name) {
            (Some(fore), Some(last)) => Some(format!("{} {}", fore.trim(), last.trim())),
            (None, Some(last)) => Some(last.trim().to_string()),
            _ => self.collective_name.as_ref().map(|c| c.trim().to_string()),
        }
    }
}
