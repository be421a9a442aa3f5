//! Overlays drawn on top of existing page content

use crate::constants::{
    PLACEHOLDER_BORDER_OPACITY, PLACEHOLDER_BORDER_WIDTH, PLACEHOLDER_COLOR,
    PLACEHOLDER_FILL_OPACITY,
};
use crate::rules::SignatureRule;
use crate::types::Result;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Append `ops` to the page's content, isolated from the existing content's
/// graphics state.
///
/// The original streams are bracketed by `q`/`Q`. Existing content that pops
/// more states than it pushes, or leaves states open, gets extra `q` before
/// it and extra `Q` after it, so the overlay always draws in the page's
/// initial coordinate system.
pub(crate) fn append_overlay(doc: &mut Document, page_id: ObjectId, ops: &str) -> Result<()> {
    let existing = content_streams(doc, page_id)?;
    let (open, close) = isolation_depth(doc, &existing);

    let open_id = doc.add_object(Stream::new(Dictionary::new(), "q\n".repeat(open).into_bytes()));
    let overlay_id = doc.add_object(Stream::new(
        Dictionary::new(),
        format!("\n{}{}", "Q\n".repeat(close), ops).into_bytes(),
    ));

    let mut contents = vec![Object::Reference(open_id)];
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(overlay_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));

    Ok(())
}

/// Content stream IDs of a page in drawing order. `/Contents` may be a
/// stream, an array, or a reference to an array.
fn content_streams(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>> {
    let page = doc.get_dictionary(page_id)?;
    let entries = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    Ok(entries
        .iter()
        .filter_map(|entry| entry.as_reference().ok())
        .collect())
}

/// Number of `q` to open before the existing content and `Q` to close after
/// it so the graphics state stack is back at page level for the overlay
fn isolation_depth(doc: &Document, streams: &[ObjectId]) -> (usize, usize) {
    let mut content = Vec::new();
    for &id in streams {
        if let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) {
            match stream.decompressed_content() {
                Ok(bytes) => content.extend(bytes),
                Err(_) => content.extend_from_slice(&stream.content),
            }
            content.push(b'\n');
        }
    }

    let Ok(decoded) = Content::decode(&content) else {
        return (1, 1);
    };

    let mut depth: i64 = 0;
    let mut lowest: i64 = 0;
    for operation in &decoded.operations {
        match operation.operator.as_str() {
            "q" => depth += 1,
            "Q" => {
                depth -= 1;
                lowest = lowest.min(depth);
            }
            _ => {}
        }
    }

    let open = 1 + lowest.unsigned_abs() as usize;
    let close = (open as i64 + depth) as usize;
    (open, close)
}

/// Register `value` in the page's resource `category` (e.g. `XObject`)
/// under a fresh name starting with `prefix`. Returns the name.
///
/// Indirect resource dictionaries are inlined on the page first; the page
/// is the only one in its document so nothing else shares them.
pub(crate) fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    value: Object,
) -> Result<String> {
    let page = doc.get_dictionary(page_id)?;
    let mut resources = resolve_dict(doc, page.get(b"Resources").ok())?;
    let mut entries = resolve_dict(doc, resources.get(category.as_bytes()).ok())?;

    let mut n = 1;
    let name = loop {
        let candidate = format!("{}{}", prefix, n);
        if !entries.has(candidate.as_bytes()) {
            break candidate;
        }
        n += 1;
    };

    entries.set(name.as_bytes().to_vec(), value);
    resources.set(category.as_bytes().to_vec(), Object::Dictionary(entries));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

fn resolve_dict(doc: &Document, obj: Option<&Object>) -> Result<Dictionary> {
    match obj {
        Some(Object::Dictionary(dict)) => Ok(dict.clone()),
        Some(Object::Reference(id)) => Ok(doc.get_dictionary(*id)?.clone()),
        _ => Ok(Dictionary::new()),
    }
}

/// Graphics state giving the placeholder its transparency
pub(crate) fn placeholder_gstate() -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(PLACEHOLDER_FILL_OPACITY)),
        ("CA", Object::Real(PLACEHOLDER_BORDER_OPACITY)),
    ])
}

/// Content stream ops for a translucent box covering the rule's rectangle
pub(crate) fn placeholder_ops(gstate_name: &str, rule: &SignatureRule) -> String {
    let (r, g, b) = PLACEHOLDER_COLOR;
    format!(
        "q /{} gs {} {} {} rg {} {} {} RG {} w {} {} {} {} re B Q\n",
        gstate_name,
        r,
        g,
        b,
        r,
        g,
        b,
        PLACEHOLDER_BORDER_WIDTH,
        rule.position_x,
        rule.position_y,
        rule.width,
        rule.height
    )
}

/// Content stream ops drawing an image XObject at (x, y) with the given size
pub(crate) fn image_ops(xobject_name: &str, x: f32, y: f32, width: f32, height: f32) -> String {
    format!(
        "q {} 0 0 {} {} {} cm /{} Do Q\n",
        width, height, x, y, xobject_name
    )
}
