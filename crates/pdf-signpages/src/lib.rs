pub mod aggregate;
mod constants;
pub mod encode;
pub mod generate;
mod io;
pub mod render;
pub mod rules;
pub mod session;
mod types;

pub use aggregate::{aggregate, aggregate_all};
pub use encode::{EncodedResult, PDF_MIME_TYPE, encode_result, to_data_uri};
pub use generate::generate_page_set;
pub use io::{load_pdf, load_pdf_bytes, save_pdf};
pub use render::{SignatureImage, decode_data_uri, render_page_variants, segment_page};
pub use rules::{Applicability, DocumentProfile, PagePredicate, SignatureRule};
pub use session::{
    CaptureDocument, SessionStep, SignatureCaptureContext, SignedDocument, SigningSession,
    UserProfile,
};
pub use types::*;
