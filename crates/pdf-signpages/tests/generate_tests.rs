mod common;

use common::*;
use lopdf::Document;
use pdf_signpages::*;
use std::sync::Arc;

fn last_page_profile() -> DocumentProfile {
    DocumentProfile::new(
        "main",
        vec![SignatureRule::new(10.0, 10.0, 50.0, 20.0, Applicability::LastPageOnly).unwrap()],
    )
}

#[tokio::test]
async fn test_page_set_has_one_entry_per_page_in_order() {
    let source = shared_test_pdf(7);
    let profile = DocumentProfile::new(
        "main",
        vec![SignatureRule::new(10.0, 10.0, 50.0, 20.0, Applicability::OnlyOddPages).unwrap()],
    );

    let set = generate_page_set(&profile, source, &signature_png(100, 20))
        .await
        .unwrap();

    assert_eq!(set.document_key(), "main");
    assert_eq!(set.len(), 7);
    for (i, page) in set.pages().iter().enumerate() {
        assert_eq!(page.page_index, i);
        assert_eq!(page.requires_signature(), i % 2 == 1);
        assert!(!page.has_been_signed);

        // Each artifact is the right source page
        let widths = page_widths(&page.signed.load().unwrap());
        assert_eq!(widths, vec![BASE_WIDTH + i as i64]);
    }
}

#[tokio::test]
async fn test_last_page_only_scenario() {
    let source = shared_test_pdf(3);
    let set = generate_page_set(&last_page_profile(), source, &signature_png(100, 20))
        .await
        .unwrap();

    for page in &set.pages()[..2] {
        assert!(page.required_rules.is_empty());
        assert_eq!(page.unsigned, page.signed);
    }

    let last = &set.pages()[2];
    assert_eq!(last.required_rules.len(), 1);
    assert_ne!(last.unsigned, last.signed);

    // 100x20 scaled into 50x20 keeps its 5:1 ratio: 50x10 at (10, 10)
    let signed = single_page_content(&last.signed.load().unwrap());
    assert!(signed.contains("q 50 0 0 10 10 10 cm /SigImg1 Do Q"), "{}", signed);
    assert!(!signed.contains(" re B"));

    let unsigned = single_page_content(&last.unsigned.load().unwrap());
    assert!(unsigned.contains("10 10 50 20 re B"), "{}", unsigned);
    assert!(!unsigned.contains(" Do "));

    // Original content survives under both overlays
    assert!(signed.contains("(Page 3) Tj"));
    assert!(unsigned.contains("(Page 3) Tj"));
}

#[tokio::test]
async fn test_signed_page_embeds_image_resource() {
    let source = shared_test_pdf(1);
    let set = generate_page_set(&last_page_profile(), source, &signature_png(40, 40))
        .await
        .unwrap();

    let doc = set.pages()[0].signed.load().unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let xobjects = page
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"XObject")
        .unwrap()
        .as_dict()
        .unwrap();
    let image_id = xobjects.get(b"SigImg1").unwrap().as_reference().unwrap();
    let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
    assert_eq!(image.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
    assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 40);
}

#[tokio::test]
async fn test_all_pages_on_single_page_document() {
    let source = shared_test_pdf(1);
    let profile = DocumentProfile::new(
        "main",
        vec![SignatureRule::new(10.0, 10.0, 50.0, 20.0, Applicability::AllPages).unwrap()],
    );
    let set = generate_page_set(&profile, source, &signature_png(10, 10))
        .await
        .unwrap();

    assert_eq!(set.len(), 1);
    assert_eq!(set.pages()[0].required_rules.len(), 1);
    assert!(Applicability::FirstPageOnly.applies(0, 1));
    assert!(Applicability::LastPageOnly.applies(0, 1));
}

#[tokio::test]
async fn test_empty_rule_set_leaves_pages_untouched() {
    let source = shared_test_pdf(4);
    let profile = DocumentProfile::new("main", vec![]);

    // The image is never needed, so it is never decoded
    let set = generate_page_set(&profile, source, b"not a png").await.unwrap();

    assert_eq!(set.len(), 4);
    for page in set.pages() {
        assert!(page.required_rules.is_empty());
        assert_eq!(page.unsigned.bytes(), page.signed.bytes());
    }
    assert_eq!(set.required_count(), 0);
}

#[tokio::test]
async fn test_multiple_rules_on_one_page() {
    let source = shared_test_pdf(2);
    let profile = DocumentProfile::new(
        "main",
        vec![
            SignatureRule::new(500.0, 20.0, 40.0, 20.0, Applicability::AllPages).unwrap(),
            SignatureRule::new(80.0, 60.0, 100.0, 50.0, Applicability::LastPageOnly).unwrap(),
        ],
    );
    let set = generate_page_set(&profile, source, &signature_png(20, 10))
        .await
        .unwrap();

    assert_eq!(set.pages()[0].required_rules.len(), 1);
    assert_eq!(set.pages()[1].required_rules.len(), 2);

    let signed = single_page_content(&set.pages()[1].signed.load().unwrap());
    assert!(signed.contains("q 40 0 0 20 500 20 cm /SigImg1 Do Q"), "{}", signed);
    assert!(signed.contains("q 100 0 0 50 80 60 cm /SigImg1 Do Q"), "{}", signed);

    let unsigned = single_page_content(&set.pages()[1].unsigned.load().unwrap());
    assert_eq!(unsigned.matches(" re B").count(), 2);
}

#[tokio::test]
async fn test_invalid_image_fails_whole_set() {
    let source = shared_test_pdf(3);
    let result = generate_page_set(&last_page_profile(), source, b"definitely not a png").await;
    assert!(matches!(result, Err(SignError::ImageDecode(_))));
}

#[tokio::test]
async fn test_invalid_profile_is_rejected() {
    let source = shared_test_pdf(3);
    let profile = DocumentProfile::new("", vec![]);
    let result = generate_page_set(&profile, source, &signature_png(1, 1)).await;
    assert!(matches!(result, Err(SignError::Config(_))));
}

#[tokio::test]
async fn test_broken_page_fails_with_its_index() {
    let mut doc = create_test_pdf(3);
    // Point page 2's content at an object that does not exist
    let page_id = *doc.get_pages().get(&2).unwrap();
    doc.get_object_mut(page_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("Contents", lopdf::Object::Reference((9999, 0)));

    let result = generate_page_set(&last_page_profile(), Arc::new(doc), &signature_png(4, 4)).await;
    match result {
        Err(err) => assert_eq!(err.page(), Some(1)),
        Ok(_) => panic!("Expected page 1 to fail"),
    }
}

#[tokio::test]
async fn test_source_is_not_modified() {
    let doc = create_test_pdf(3);
    let before = save_to_bytes(&doc);
    let source = Arc::new(doc);

    generate_page_set(&last_page_profile(), Arc::clone(&source), &signature_png(8, 8))
        .await
        .unwrap();

    assert_eq!(save_to_bytes(&source), before);
}

#[tokio::test]
async fn test_empty_document_yields_empty_set() {
    let source = shared_test_pdf(0);
    let set = generate_page_set(&last_page_profile(), source, &signature_png(8, 8))
        .await
        .unwrap();
    assert!(set.is_empty());
    assert!(!set.is_complete());
}

#[tokio::test]
async fn test_acknowledgment_does_not_regenerate() {
    let source = shared_test_pdf(3);
    let mut set = generate_page_set(&last_page_profile(), source, &signature_png(8, 8))
        .await
        .unwrap();
    let signed_before = set.pages()[2].signed.clone();

    assert_eq!(set.next_unsigned(), Some(2));
    assert!(!set.is_complete());
    assert_eq!(set.pages()[2].display_artifact(), &set.pages()[2].unsigned);

    set.mark_signed(2).unwrap();

    assert_eq!(set.pages()[2].signed, signed_before);
    assert_eq!(set.pages()[2].display_artifact(), &signed_before);
    assert_eq!(set.signed_count(), 1);
    assert_eq!(set.next_unsigned(), None);
    assert!(set.is_complete());
    assert!(set.mark_signed(3).is_err());
}

#[tokio::test]
async fn test_artifact_data_uri() {
    let source = shared_test_pdf(1);
    let set = generate_page_set(&DocumentProfile::new("main", vec![]), source, &[])
        .await
        .unwrap();
    let uri = set.pages()[0].unsigned.to_data_uri();
    assert!(uri.starts_with("data:application/pdf;base64,"));
}

#[test]
fn test_render_page_variants_directly() {
    let source: Document = create_test_pdf(2);
    let page_id = *source.get_pages().get(&1).unwrap();
    let rules =
        vec![SignatureRule::new(0.0, 0.0, 10.0, 10.0, Applicability::FirstPageOnly).unwrap()];
    let image = SignatureImage::decode(&signature_png(5, 5)).unwrap();

    let page = render_page_variants(&source, page_id, 0, 2, &rules, Some(&image)).unwrap();
    assert_eq!(page.page_index, 0);
    assert_eq!(page.required_rules.len(), 1);

    // Without an image a page that needs one cannot be rendered
    assert!(render_page_variants(&source, page_id, 0, 2, &rules, None).is_err());
    // ...but a page that needs none can
    assert!(render_page_variants(&source, page_id, 1, 2, &rules, None).is_ok());
}

#[tokio::test]
async fn test_indirect_contents_array_keeps_page_content() {
    let source = Arc::new(create_indirect_contents_pdf());
    let profile = DocumentProfile::new(
        "main",
        vec![SignatureRule::new(10.0, 10.0, 20.0, 20.0, Applicability::AllPages).unwrap()],
    );

    let set = generate_page_set(&profile, source, &signature_png(20, 20))
        .await
        .unwrap();
    let page = &set.pages()[0];

    let unsigned = single_page_content(&page.unsigned.load().unwrap());
    assert!(unsigned.contains("BT (Hello) Tj ET"));
    assert!(unsigned.contains("re B"));

    let signed = single_page_content(&page.signed.load().unwrap());
    assert!(signed.contains("BT (Hello) Tj ET"));
    assert!(signed.contains("/SigImg1 Do Q"));

    let final_doc = aggregate(set.pages()).unwrap();
    let content = single_page_content(final_doc.document());
    assert!(content.contains("BT (Hello) Tj ET"));
    assert!(content.find("(Hello)").unwrap() < content.find("/SigImg1 Do").unwrap());
}
