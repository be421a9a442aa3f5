//! Portable encoding of final documents as base64 data URIs

use crate::types::*;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub const PDF_MIME_TYPE: &str = "application/pdf";

const DATA_URI_PREFIX: &str = "data:";

/// A final document in data URI form
#[derive(Debug, Clone)]
pub struct EncodedResult {
    /// `scheme + "," + data`
    pub data_uri: String,
    /// `data:<mime type>;base64`
    pub scheme: String,
    /// Media type, e.g. `application/pdf`
    pub mime_type: String,
    /// Base64 payload without the scheme
    pub data: String,
    /// The document this was encoded from
    pub document: FinalDocument,
}

impl EncodedResult {
    /// Decode the payload back to PDF bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| SignError::Serialization(format!("invalid base64 payload: {}", e)))
    }
}

/// Serialize `document` and split its data URI into its parts.
///
/// Serialization works on a copy, so encoding the same document twice
/// yields the same payload.
pub fn encode_result(document: &FinalDocument) -> Result<EncodedResult> {
    let bytes = document.to_bytes()?;
    let data_uri = to_data_uri(PDF_MIME_TYPE, &bytes);

    let (scheme, data) = data_uri
        .split_once(',')
        .ok_or_else(|| SignError::Serialization("data URI has no ',' separator".to_string()))?;
    let mime_type = mime_type_of(scheme).to_string();
    let (scheme, data) = (scheme.to_string(), data.to_string());

    Ok(EncodedResult {
        data_uri,
        scheme,
        mime_type,
        data,
        document: document.clone(),
    })
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("{}{};base64,{}", DATA_URI_PREFIX, mime_type, STANDARD.encode(bytes))
}

/// Media type part of a data URI scheme: between the `data:` marker and the
/// first parameter
fn mime_type_of(scheme: &str) -> &str {
    let body = scheme.strip_prefix(DATA_URI_PREFIX).unwrap_or(scheme);
    match body.find(';') {
        Some(end) => &body[..end],
        None => body,
    }
}
