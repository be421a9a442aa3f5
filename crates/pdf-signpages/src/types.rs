use crate::rules::SignatureRule;
use lopdf::Document;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Cannot read source page {page}: {message}")]
    SourceRead { page: usize, message: String },
    #[error("Signature image error: {0}")]
    ImageDecode(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Cannot reassemble page {page}: {message}")]
    Aggregation { page: usize, message: String },
    #[error("Page {page}: {source}")]
    Page {
        page: usize,
        #[source]
        source: Box<SignError>,
    },
    #[error("Signing session: {0}")]
    Session(String),
}

impl SignError {
    /// Attach the failing page index to a renderer error
    pub fn at_page(page: usize, error: SignError) -> Self {
        match error {
            // already carries its index
            SignError::SourceRead { .. } | SignError::Page { .. } => error,
            other => SignError::Page {
                page,
                source: Box::new(other),
            },
        }
    }

    /// Page index the error is attributed to, if any
    pub fn page(&self) -> Option<usize> {
        match self {
            SignError::SourceRead { page, .. }
            | SignError::Aggregation { page, .. }
            | SignError::Page { page, .. } => Some(*page),
            _ => None,
        }
    }
}

impl From<image::ImageError> for SignError {
    fn from(err: image::ImageError) -> Self {
        SignError::ImageDecode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SignError>;

/// A serialized single-page PDF.
///
/// Cloning is cheap; the bytes are shared and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact(Arc<[u8]>);

impl PageArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the artifact back into a document
    pub fn load(&self) -> Result<Document> {
        Ok(Document::load_mem(&self.0)?)
    }

    /// `data:application/pdf;base64,...` form for previews
    pub fn to_data_uri(&self) -> String {
        crate::encode::to_data_uri(crate::encode::PDF_MIME_TYPE, &self.0)
    }
}

/// Rendering state of one page during a signing pass
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    /// 0-based position in the source document
    pub page_index: usize,
    /// Rules whose applicability selected this page
    pub required_rules: Vec<SignatureRule>,
    /// Page with placeholder boxes where signatures go
    pub unsigned: PageArtifact,
    /// Page with the signature image composited in
    pub signed: PageArtifact,
    /// Review flag; does not affect what `signed` contains
    pub has_been_signed: bool,
}

impl GeneratedPage {
    pub fn requires_signature(&self) -> bool {
        !self.required_rules.is_empty()
    }

    pub fn mark_signed(&mut self) {
        self.has_been_signed = true;
    }

    /// A page is settled once acknowledged or when nothing is required on it
    pub fn is_settled(&self) -> bool {
        self.has_been_signed || !self.requires_signature()
    }

    /// The variant to show a reviewer: signed once acknowledged
    pub fn display_artifact(&self) -> &PageArtifact {
        if self.has_been_signed {
            &self.signed
        } else {
            &self.unsigned
        }
    }
}

/// Ordered pages of one document for one signing pass
#[derive(Debug, Clone)]
pub struct PageSet {
    document_key: String,
    pages: Vec<GeneratedPage>,
}

impl PageSet {
    pub(crate) fn new(document_key: String, pages: Vec<GeneratedPage>) -> Self {
        Self {
            document_key,
            pages,
        }
    }

    pub fn document_key(&self) -> &str {
        &self.document_key
    }

    pub fn pages(&self) -> &[GeneratedPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, page_index: usize) -> Option<&GeneratedPage> {
        self.pages.get(page_index)
    }

    /// Acknowledge a page. Artifacts are left as generated.
    pub fn mark_signed(&mut self, page_index: usize) -> Result<()> {
        let total = self.pages.len();
        let page = self.pages.get_mut(page_index).ok_or_else(|| {
            SignError::Session(format!(
                "page {} out of range for document '{}' ({} pages)",
                page_index, self.document_key, total
            ))
        })?;
        page.mark_signed();
        Ok(())
    }

    /// First page that still needs acknowledgment
    pub fn next_unsigned(&self) -> Option<usize> {
        self.pages
            .iter()
            .find(|page| !page.is_settled())
            .map(|page| page.page_index)
    }

    pub fn required_count(&self) -> usize {
        self.pages.iter().filter(|p| p.requires_signature()).count()
    }

    pub fn signed_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.requires_signature() && p.has_been_signed)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        !self.pages.is_empty() && self.pages.iter().all(GeneratedPage::is_settled)
    }

    pub fn into_pages(self) -> Vec<GeneratedPage> {
        self.pages
    }
}

/// Reassembled multi-page output for one document
#[derive(Debug, Clone)]
pub struct FinalDocument {
    document: Document,
    page_count: usize,
}

impl FinalDocument {
    pub(crate) fn new(document: Document, page_count: usize) -> Self {
        Self {
            document,
            page_count,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Serialize without touching the held document
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut doc = self.document.clone();
        let mut writer = Vec::new();
        doc.save_to(&mut writer)
            .map_err(|e| SignError::Serialization(e.to_string()))?;
        Ok(writer)
    }
}
