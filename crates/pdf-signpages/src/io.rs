//! Document I/O operations

use crate::types::*;
use lopdf::Document;
use std::path::Path;
use std::sync::Arc;

/// Load a PDF document to sign
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Arc<Document>> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    load_pdf_bytes(bytes).await
}

/// Parse an in-memory PDF (e.g. fetched over the network by the caller)
pub async fn load_pdf_bytes(bytes: Vec<u8>) -> Result<Arc<Document>> {
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(Arc::new(doc))
}

/// Save a signed document
pub async fn save_pdf(document: &FinalDocument, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let document = document.clone();
    let bytes = tokio::task::spawn_blocking(move || document.to_bytes()).await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}
