//! Signature image decoding and embedding

use crate::types::{Result, SignError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::io::Write;
use std::sync::Arc;

/// A decoded signature image, ready to be embedded into any number of
/// documents.
///
/// Color and alpha planes are kept Flate-compressed so each embed is a copy.
#[derive(Debug, Clone)]
pub struct SignatureImage {
    width: u32,
    height: u32,
    rgb: Arc<[u8]>,
    alpha: Arc<[u8]>,
}

impl SignatureImage {
    /// Decode PNG (or any format the `image` crate recognizes) bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(SignError::ImageDecode("signature image is empty".to_string()));
        }

        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(SignError::ImageDecode(format!(
                "signature image has no area ({}x{})",
                width, height
            )));
        }

        let mut rgb_buf = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha_buf = Vec::with_capacity((width * height) as usize);
        for pixel in img.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb_buf.extend_from_slice(&[r, g, b]);
            alpha_buf.push(a);
        }

        Ok(Self {
            width,
            height,
            rgb: deflate(&rgb_buf)?.into(),
            alpha: deflate(&alpha_buf)?.into(),
        })
    }

    /// Decode a `data:image/png;base64,...` URI (or bare base64)
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        Self::decode(&decode_data_uri(uri)?)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Largest size that fits in `max_width` x `max_height` keeping the
    /// image's aspect ratio
    pub fn scale_to_fit(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        let scale = (max_width / w).min(max_height / h);
        (w * scale, h * scale)
    }

    /// Add the image (with its soft mask) to `doc`, returning the image
    /// XObject's ID
    pub(crate) fn embed(&self, doc: &mut Document) -> ObjectId {
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width as i64,
                "Height" => self.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            self.alpha.to_vec(),
        ));

        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width as i64,
                "Height" => self.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
                "SMask" => Object::Reference(smask_id),
            },
            self.rgb.to_vec(),
        ))
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Payload bytes of a base64 data URI. Input without a `data:` scheme is
/// treated as bare base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let uri = uri.trim();
    let payload = match uri.strip_prefix("data:") {
        Some(rest) => {
            let (scheme, data) = rest.split_once(',').ok_or_else(|| {
                SignError::ImageDecode("data URI has no ',' separator".to_string())
            })?;
            if !scheme.split(';').any(|param| param == "base64") {
                return Err(SignError::ImageDecode(
                    "only base64 data URIs are supported".to_string(),
                ));
            }
            data
        }
        None => uri,
    };

    STANDARD
        .decode(payload)
        .map_err(|e| SignError::ImageDecode(format!("invalid base64 payload: {}", e)))
}
