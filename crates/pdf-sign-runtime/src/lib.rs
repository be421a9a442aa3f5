mod worker;

// Re-export types from library crates
pub use pdf_signpages::{SignatureCaptureContext, SignedDocument, SigningSession};
pub use worker::worker_task;

/// Commands sent from the capture UI to the worker
#[derive(Debug)]
pub enum SignCommand {
    /// A signature was captured for the current user
    AcceptSignature { signature: Vec<u8> },
    /// The user acknowledged a page
    MarkPageSigned {
        document_index: usize,
        page_index: usize,
    },
    /// The current user is done with all their documents
    CompleteUser,
    Shutdown,
}

/// Updates sent from the worker back to the UI
#[derive(Debug, Clone)]
pub enum SignUpdate {
    /// Long-running work began; a result or `Error` follows
    Started { operation: String },
    /// Fresh page sets for the current user are ready
    PageSetsGenerated {
        user_index: usize,
        pages: Vec<PageSetSummary>,
    },
    PageMarked {
        document_index: usize,
        page_index: usize,
        user_complete: bool,
    },
    /// Moved on to the next user
    UserCompleted { next_user_index: usize },
    /// Every user is done
    Finished { documents: Vec<SignedDocument> },
    Error { message: String },
}

/// What the UI needs to know about a rendered page set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSetSummary {
    pub document_key: String,
    pub page_count: usize,
    pub pages_requiring_signature: Vec<usize>,
}

impl From<&pdf_signpages::PageSet> for PageSetSummary {
    fn from(set: &pdf_signpages::PageSet) -> Self {
        Self {
            document_key: set.document_key().to_string(),
            page_count: set.len(),
            pages_requiring_signature: set
                .pages()
                .iter()
                .filter(|page| page.requires_signature())
                .map(|page| page.page_index)
                .collect(),
        }
    }
}
