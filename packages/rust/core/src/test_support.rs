//! Helpers shared by the unit tests of this crate.

use std::path::PathBuf;
use std::time::Duration;

use courtdocs_shared::ScrapeConfig;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use uuid::Uuid;

/// Scrape config without politeness delays, allowing the local mock servers.
pub(crate) fn fast_config() -> ScrapeConfig {
    ScrapeConfig {
        page_delay: Duration::ZERO,
        document_delay: Duration::ZERO,
        allowed_hosts: vec!["127.0.0.1".to_string()],
        ..ScrapeConfig::default()
    }
}

/// A fresh, not yet existing directory under the system temp dir.
pub(crate) fn temp_root(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("courtdocs-{tag}-{}", Uuid::now_v7()))
}

/// Build an in-memory PDF with one text line per page.
pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for line in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 11.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        kids.push(
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into(),
        );
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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
