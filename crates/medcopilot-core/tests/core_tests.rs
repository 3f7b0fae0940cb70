use std::fs;
use tempfile::TempDir;

use medcopilot_core::config::ChunkingSettings;
use medcopilot_core::documents::{extract_pages, load_documents_from_dir, DocumentOutcome, DocumentProcessor};
use medcopilot_core::types::RawDocument;

fn long_paragraph(topic: &str) -> String {
    format!("{topic} guidance for the ward team. ").repeat(12)
}

#[test]
fn pages_are_split_on_form_feed_and_labelled() {
    let body = format!("{}\u{000C}{}", long_paragraph("Sepsis"), long_paragraph("Stroke"));
    let doc = RawDocument::new("protocols.txt", body.into_bytes());
    let processor = DocumentProcessor::new(ChunkingSettings { size: 2000, overlap: 100, min_chars: 150 });

    match processor.process(&doc) {
        DocumentOutcome::Parsed { pages, chunks, .. } => {
            assert_eq!(pages, 2);
            assert_eq!(chunks.len(), 2);
            assert_eq!(chunks[0].source_label, "protocols.txt — Page 1");
            assert_eq!(chunks[1].source_label, "protocols.txt — Page 2");
            assert!(chunks[1].text.starts_with("Stroke"));
        }
        DocumentOutcome::Skipped { reason, .. } => panic!("unexpected skip: {reason}"),
    }
}

#[test]
fn short_pages_are_dropped_as_noise() {
    let body = format!("Page header\u{000C}{}", long_paragraph("Insulin"));
    let doc = RawDocument::new("a.md", body.into_bytes());
    let processor = DocumentProcessor::new(ChunkingSettings::default());
    let DocumentOutcome::Parsed { chunks, .. } = processor.process(&doc) else { panic!("parsed") };
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].source_label.ends_with("Page 2"));
}

#[test]
fn malformed_documents_are_reported_not_fatal() {
    let processor = DocumentProcessor::new(ChunkingSettings::default());
    let docs = vec![
        RawDocument::new("scan.pdf", b"%PDF-1.7 binary".to_vec()),
        RawDocument::new("broken.txt", vec![0xff, 0xfe, 0xfd]),
        RawDocument::new("image.png", b"not text".to_vec()),
        RawDocument::new("ok.txt", long_paragraph("Heparin").into_bytes()),
    ];
    let outcomes = processor.process_all(&docs);
    let skipped: Vec<&str> = outcomes
        .iter()
        .filter(|o| matches!(o, DocumentOutcome::Skipped { .. }))
        .map(DocumentOutcome::filename)
        .collect();
    assert_eq!(skipped, vec!["scan.pdf", "broken.txt", "image.png"]);
    assert!(matches!(&outcomes[3], DocumentOutcome::Parsed { chunks, .. } if !chunks.is_empty()));
}

#[test]
fn crlf_is_normalized() {
    let doc = RawDocument::new("a.txt", b"line one\r\nline two".to_vec());
    let pages = extract_pages(&doc).expect("pages");
    assert_eq!(pages, vec!["line one\nline two".to_string()]);
}

#[test]
fn load_documents_from_dir_sorted_and_skips_hidden() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("cardiology")).unwrap();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("cardiology/a.txt"), "alpha").unwrap();
    fs::write(dir.join(".DS_Store"), "junk").unwrap();

    let docs = load_documents_from_dir(dir).expect("load");
    let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(names, vec!["b.txt", "cardiology/a.txt"]);
    assert_eq!(docs[1].bytes, b"alpha");
}

#[test]
fn load_documents_from_missing_dir_fails() {
    let tmp = TempDir::new().unwrap();
    assert!(load_documents_from_dir(&tmp.path().join("nope")).is_err());
}
