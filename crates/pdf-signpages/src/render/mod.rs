//! PDF rendering modules for signature pages
//!
//! This module handles all PDF-specific operations:
//! - Copying single pages between documents (segmenting and reassembly)
//! - Decoding and embedding the signature image
//! - Drawing placeholder and signature overlays
//! - Producing the unsigned and signed variants of a page

mod copy;
mod overlay;
mod page;
mod signature_image;

pub use copy::{
    copy_object_deep, finish_page_tree, import_page, segment_page, serialize_document,
};
pub use page::render_page_variants;
pub use signature_image::{SignatureImage, decode_data_uri};
