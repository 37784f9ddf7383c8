use std::sync::Arc;

use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};
use recap_core::{
    SourceMetadata,
    document::{DocumentExtractor, PdfParser},
};

fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn pdf_pages_are_extracted_in_order() {
    let bytes = build_pdf(&[
        "Ownership decides when values are dropped.",
        "Borrowing lends access without moving anything.",
    ]);
    let extractor = DocumentExtractor::new(Arc::new(PdfParser));

    let record = extractor.extract(&bytes, "rust.pdf").unwrap();

    let text = record.text();
    let ownership = text.find("Ownership").unwrap();
    let borrowing = text.find("Borrowing").unwrap();
    assert!(ownership < borrowing);
    assert_eq!(
        record.metadata(),
        &SourceMetadata::Document {
            filename: "rust.pdf".to_string(),
            pages: 2
        }
    );
}

#[test]
fn pdf_without_enough_text_is_rejected() {
    let bytes = build_pdf(&["Tiny."]);
    let extractor = DocumentExtractor::new(Arc::new(PdfParser));
    assert!(extractor.extract(&bytes, "tiny.pdf").is_none());
}
