//! Reassembly of signed pages into final documents

use crate::constants::OUTPUT_PDF_VERSION;
use crate::render::{finish_page_tree, import_page};
use crate::types::*;
use lopdf::Document;
use tokio::task::JoinSet;

/// Concatenate the signed artifact of every page, in page-index order, into
/// one document.
///
/// Acknowledgment is not consulted: pages that required a signature carry it
/// whether or not they were marked signed, and pages that required nothing
/// are unmodified copies of the source page.
pub fn aggregate(pages: &[GeneratedPage]) -> Result<FinalDocument> {
    let mut ordered: Vec<&GeneratedPage> = pages.iter().collect();
    ordered.sort_by_key(|page| page.page_index);

    let mut output = Document::with_version(OUTPUT_PDF_VERSION);
    let pages_tree_id = output.new_object_id();
    let mut kids = Vec::with_capacity(ordered.len());

    for page in ordered {
        let single = page.signed.load().map_err(|e| SignError::Aggregation {
            page: page.page_index,
            message: e.to_string(),
        })?;

        let page_id = single
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or_else(|| SignError::Aggregation {
                page: page.page_index,
                message: "signed artifact has no page".to_string(),
            })?;

        let new_page_id = import_page(&mut output, &single, page_id, pages_tree_id).map_err(
            |e| SignError::Aggregation {
                page: page.page_index,
                message: e.to_string(),
            },
        )?;
        kids.push(new_page_id);
    }

    finish_page_tree(&mut output, pages_tree_id, &kids);
    Ok(FinalDocument::new(output, kids.len()))
}

/// Aggregate several documents' page sets concurrently.
///
/// Results are in the order of `page_sets`; the first failure fails the
/// whole call.
pub async fn aggregate_all(page_sets: &[PageSet]) -> Result<Vec<FinalDocument>> {
    let mut tasks = JoinSet::new();
    for (idx, set) in page_sets.iter().enumerate() {
        let pages = set.pages().to_vec();
        tasks.spawn_blocking(move || (idx, aggregate(&pages)));
    }

    let mut slots: Vec<Option<FinalDocument>> = (0..page_sets.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (idx, result) = joined?;
        slots[idx] = Some(result?);
    }

    let documents: Vec<FinalDocument> = slots.into_iter().flatten().collect();
    log::info!("Aggregated {} document(s)", documents.len());
    Ok(documents)
}
