mod common;

use common::*;
use pdf_signpages::*;

fn rules(applicability: Applicability) -> DocumentProfile {
    DocumentProfile::new(
        "main",
        vec![SignatureRule::new(10.0, 10.0, 50.0, 20.0, applicability).unwrap()],
    )
}

#[tokio::test]
async fn test_aggregate_preserves_page_count_and_order() {
    let set = generate_page_set(
        &rules(Applicability::OnlyEvenPages),
        shared_test_pdf(5),
        &signature_png(30, 10),
    )
    .await
    .unwrap();

    let final_doc = aggregate(set.pages()).unwrap();
    assert_eq!(final_doc.page_count(), 5);
    assert_eq!(
        page_widths(final_doc.document()),
        (0..5).map(|i| BASE_WIDTH + i).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_aggregate_sorts_by_page_index() {
    let set = generate_page_set(&rules(Applicability::AllPages), shared_test_pdf(3), &signature_png(4, 4))
        .await
        .unwrap();

    let mut shuffled = set.into_pages();
    shuffled.reverse();

    let final_doc = aggregate(&shuffled).unwrap();
    assert_eq!(
        page_widths(final_doc.document()),
        vec![BASE_WIDTH, BASE_WIDTH + 1, BASE_WIDTH + 2]
    );
}

#[tokio::test]
async fn test_aggregate_uses_signed_artifact_without_acknowledgment() {
    let set = generate_page_set(
        &rules(Applicability::LastPageOnly),
        shared_test_pdf(2),
        &signature_png(4, 4),
    )
    .await
    .unwrap();
    assert!(!set.pages()[1].has_been_signed);

    let final_doc = aggregate(set.pages()).unwrap();
    let doc = final_doc.document();
    let last_page = *doc.get_pages().get(&2).unwrap();
    let content = String::from_utf8_lossy(&doc.get_page_content(last_page).unwrap()).into_owned();
    assert!(content.contains("/SigImg1 Do"));
    assert!(content.contains("(Page 2) Tj"));

    let first_page = *doc.get_pages().get(&1).unwrap();
    let content = String::from_utf8_lossy(&doc.get_page_content(first_page).unwrap()).into_owned();
    assert!(!content.contains(" Do "));
}

#[tokio::test]
async fn test_aggregate_corrupt_artifact_fails() {
    let set = generate_page_set(&rules(Applicability::AllPages), shared_test_pdf(3), &signature_png(4, 4))
        .await
        .unwrap();

    let mut pages = set.into_pages();
    pages[1].signed = PageArtifact::new(b"%PDF-1.7 garbage".to_vec());

    match aggregate(&pages) {
        Err(SignError::Aggregation { page, .. }) => assert_eq!(page, 1),
        other => panic!("Expected Aggregation error, got {:?}", other.map(|d| d.page_count())),
    }
}

#[test]
fn test_aggregate_empty_page_set() {
    let final_doc = aggregate(&[]).unwrap();
    assert_eq!(final_doc.page_count(), 0);
    assert!(final_doc.document().get_pages().is_empty());
}

#[tokio::test]
async fn test_aggregate_all_keeps_document_order() {
    let a = generate_page_set(&rules(Applicability::AllPages), shared_test_pdf(2), &signature_png(4, 4))
        .await
        .unwrap();
    let b = generate_page_set(&rules(Applicability::FirstPageOnly), shared_test_pdf(4), &signature_png(4, 4))
        .await
        .unwrap();

    let finals = aggregate_all(&[a, b]).await.unwrap();
    assert_eq!(finals.len(), 2);
    assert_eq!(finals[0].page_count(), 2);
    assert_eq!(finals[1].page_count(), 4);
}

#[tokio::test]
async fn test_save_final_document() {
    use tempfile::NamedTempFile;

    let set = generate_page_set(&rules(Applicability::AllPages), shared_test_pdf(2), &signature_png(4, 4))
        .await
        .unwrap();
    let final_doc = aggregate(set.pages()).unwrap();

    let temp = NamedTempFile::new().unwrap();
    save_pdf(&final_doc, temp.path()).await.unwrap();

    let loaded = load_pdf(temp.path()).await.unwrap();
    assert_eq!(loaded.get_pages().len(), 2);
}
