//! Page set generation
//!
//! Every page of the source is rendered as an independent task on the
//! blocking pool. Results land in a slot per page index, so the output order
//! is the source order whatever order the tasks finish in. The first failing
//! page fails the whole set; pages still rendering are left to finish and
//! their results dropped.

use crate::render::{SignatureImage, render_page_variants};
use crate::rules::{DocumentProfile, SignatureRule};
use crate::types::*;
use lopdf::{Document, ObjectId};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Render the unsigned and signed variants of every page of `source`.
///
/// `signature` is the raw image (PNG) as accepted from the capture pipeline.
/// It is decoded only if at least one page needs it.
pub async fn generate_page_set(
    profile: &DocumentProfile,
    source: Arc<Document>,
    signature: &[u8],
) -> Result<PageSet> {
    profile.validate()?;

    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    let total_pages = page_ids.len();

    let image = if profile.needs_signature(total_pages) {
        Some(Arc::new(SignatureImage::decode(signature)?))
    } else {
        None
    };

    let rules: Arc<[SignatureRule]> = profile.rules.clone().into();
    let mut tasks = JoinSet::new();

    for (page_index, page_id) in page_ids.into_iter().enumerate() {
        let source = Arc::clone(&source);
        let rules = Arc::clone(&rules);
        let image = image.clone();

        tasks.spawn_blocking(move || {
            let result = render_page_variants(
                &source,
                page_id,
                page_index,
                total_pages,
                &rules,
                image.as_deref(),
            );
            (page_index, result)
        });
    }

    let mut slots: Vec<Option<GeneratedPage>> = (0..total_pages).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (page_index, result) = joined?;
        match result {
            Ok(page) => slots[page_index] = Some(page),
            Err(e) => {
                log::warn!(
                    "Page {} of '{}' failed, abandoning page set: {}",
                    page_index,
                    profile.document_key,
                    e
                );
                return Err(SignError::at_page(page_index, e));
            }
        }
    }

    let pages = slots
        .into_iter()
        .enumerate()
        .map(|(page_index, slot)| {
            slot.ok_or_else(|| SignError::SourceRead {
                page: page_index,
                message: "page was never rendered".to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    log::info!(
        "Generated {} page(s) for '{}' ({} requiring a signature)",
        pages.len(),
        profile.document_key,
        pages.iter().filter(|p| p.requires_signature()).count()
    );

    Ok(PageSet::new(profile.document_key.clone(), pages))
}
