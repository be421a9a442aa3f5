//! Page copying between documents
//!
//! A page is copied by deep-copying its dictionary and everything it
//! references into the target document, re-parenting it under the target's
//! page tree. Segmenting (one page out of a source) and reassembly (many
//! single-page documents into one) are both built on `import_page`.

use crate::constants::{INHERITABLE_PAGE_KEYS, MAX_PAGE_TREE_DEPTH, OUTPUT_PDF_VERSION};
use crate::types::{Result, SignError};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

// =============================================================================
// Segmenting
// =============================================================================

/// Extract one page of `source` into a new, standalone single-page document.
///
/// The source is only read. Failures are reported against `page_index`.
pub fn segment_page(source: &Document, page_id: ObjectId, page_index: usize) -> Result<Document> {
    let mut output = Document::with_version(OUTPUT_PDF_VERSION);
    let pages_tree_id = output.new_object_id();

    let page = import_page(&mut output, source, page_id, pages_tree_id).map_err(|e| {
        SignError::SourceRead {
            page: page_index,
            message: e.to_string(),
        }
    })?;

    finish_page_tree(&mut output, pages_tree_id, &[page]);
    Ok(output)
}

/// Copy a page from `source` into `output` under the page tree node
/// `parent_id`. Returns the new page's object ID.
///
/// Attributes the page inherits from its ancestors are materialized on the
/// copy, since the source's page tree is not carried over.
pub fn import_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    parent_id: ObjectId,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;

    // Reserve the page's own ID first so self references (annotations'
    // /P entries) resolve to the copy
    let new_page_id = output.new_object_id();
    let mut cache: HashMap<ObjectId, ObjectId> = HashMap::new();
    cache.insert(page_id, new_page_id);

    let mut new_dict = Dictionary::new();
    for (key, value) in page_dict.iter() {
        if key.as_slice() == b"Parent" {
            continue;
        }
        new_dict.set(
            key.clone(),
            copy_object_deep(output, source, value, &mut cache)?,
        );
    }

    for key in INHERITABLE_PAGE_KEYS {
        if new_dict.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_dict, key) {
            new_dict.set(key.to_vec(), copy_object_deep(output, source, &value, &mut cache)?);
        }
    }

    new_dict.set("Parent", Object::Reference(parent_id));
    output
        .objects
        .insert(new_page_id, Object::Dictionary(new_dict));

    Ok(new_page_id)
}

/// Write the page tree root and catalog for `kids`, in order
pub fn finish_page_tree(output: &mut Document, pages_tree_id: ObjectId, kids: &[ObjectId]) {
    let page_refs: Vec<Object> = kids.iter().map(|&id| Object::Reference(id)).collect();
    let count = page_refs.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(count)),
    ]);
    output
        .objects
        .insert(pages_tree_id, Object::Dictionary(pages_dict));

    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_tree_id)),
    ]));

    output.trailer.set("Root", catalog_id);
}

/// Serialize a document to bytes
pub fn serialize_document(doc: &mut Document) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    doc.save_to(&mut writer)
        .map_err(|e| SignError::Serialization(e.to_string()))?;
    Ok(writer)
}

/// Look up an inheritable attribute on the page's ancestors
fn inherited_attribute(source: &Document, page_dict: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page_dict
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok();

    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = source.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Uses a cache so shared objects are copied once and reference cycles
/// terminate. Other pages of the source (reached through link destinations
/// and the like) are not pulled in; references to them become null.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let referenced = source.get_object(*id)?;
            if is_page_tree_node(referenced) {
                return Ok(Object::Null);
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        // Primitive types: just clone
        _ => Ok(obj.clone()),
    }
}

fn is_page_tree_node(obj: &Object) -> bool {
    match obj.as_dict().and_then(|dict| dict.get(b"Type")).and_then(Object::as_name) {
        Ok(name) => name == b"Page" || name == b"Pages",
        Err(_) => false,
    }
}
