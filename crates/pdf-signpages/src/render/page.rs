//! Unsigned and signed variants of a single page

use super::copy::{segment_page, serialize_document};
use super::overlay::{
    append_overlay, image_ops, placeholder_gstate, placeholder_ops, register_resource,
};
use super::signature_image::SignatureImage;
use crate::constants::{PLACEHOLDER_GSTATE_PREFIX, SIGNATURE_XOBJECT_PREFIX};
use crate::rules::SignatureRule;
use crate::types::{GeneratedPage, PageArtifact, Result, SignError};
use lopdf::{Document, Object, ObjectId};

/// Render both variants of page `page_index` of `source`.
///
/// The page is segmented once; the unsigned and signed documents are
/// separate copies of that segment, so neither shares objects with the
/// other or with `source`. `signature` may be `None` only when no rule
/// applies to the page.
pub fn render_page_variants(
    source: &Document,
    page_id: ObjectId,
    page_index: usize,
    total_pages: usize,
    rules: &[SignatureRule],
    signature: Option<&SignatureImage>,
) -> Result<GeneratedPage> {
    let required_rules: Vec<SignatureRule> = rules
        .iter()
        .filter(|rule| rule.applies_to(page_index, total_pages))
        .cloned()
        .collect();

    let segmented = segment_page(source, page_id, page_index)?;
    let single_page_id = only_page(&segmented, page_index)?;

    let mut unsigned = segmented.clone();
    let mut signed = segmented;

    if !required_rules.is_empty() {
        let image = signature.ok_or_else(|| {
            SignError::ImageDecode("no signature image supplied".to_string())
        })?;
        draw_placeholders(&mut unsigned, single_page_id, &required_rules)?;
        draw_signatures(&mut signed, single_page_id, &required_rules, image)?;
    }

    let unsigned = PageArtifact::new(serialize_document(&mut unsigned)?);
    let signed = PageArtifact::new(serialize_document(&mut signed)?);

    log::debug!(
        "Rendered page {} of {} ({} signature(s))",
        page_index + 1,
        total_pages,
        required_rules.len()
    );

    Ok(GeneratedPage {
        page_index,
        required_rules,
        unsigned,
        signed,
        has_been_signed: false,
    })
}

fn only_page(doc: &Document, page_index: usize) -> Result<ObjectId> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| SignError::SourceRead {
            page: page_index,
            message: "segmented document has no page".to_string(),
        })
}

/// Translucent boxes marking where each signature will go
fn draw_placeholders(doc: &mut Document, page_id: ObjectId, rules: &[SignatureRule]) -> Result<()> {
    let gstate_id = doc.add_object(placeholder_gstate());
    let gstate_name = register_resource(
        doc,
        page_id,
        "ExtGState",
        PLACEHOLDER_GSTATE_PREFIX,
        Object::Reference(gstate_id),
    )?;

    let ops: String = rules
        .iter()
        .map(|rule| placeholder_ops(&gstate_name, rule))
        .collect();
    append_overlay(doc, page_id, &ops)
}

/// The signature image, scaled into each rule's box, anchored at the box's
/// lower-left corner
fn draw_signatures(
    doc: &mut Document,
    page_id: ObjectId,
    rules: &[SignatureRule],
    image: &SignatureImage,
) -> Result<()> {
    let image_id = image.embed(doc);
    let image_name = register_resource(
        doc,
        page_id,
        "XObject",
        SIGNATURE_XOBJECT_PREFIX,
        Object::Reference(image_id),
    )?;

    let ops: String = rules
        .iter()
        .map(|rule| {
            let (width, height) = image.scale_to_fit(rule.width, rule.height);
            image_ops(&image_name, rule.position_x, rule.position_y, width, height)
        })
        .collect();
    append_overlay(doc, page_id, &ops)
}
