use std::fs;

use medcopilot_core::traits::AnalyticsSink;
use medcopilot_core::types::QueryMode;
use medcopilot_rag::analytics::read_records;
use medcopilot_rag::{summarize, AnalyticsSummary, JsonlAnalyticsSink};
use tempfile::tempdir;

#[test]
fn records_are_appended_and_summarized_by_mode() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("analytics.jsonl");
    let sink = JsonlAnalyticsSink::new(&path);
    sink.record("sepsis protocol", QueryMode::Hospital).expect("record");
    sink.record("fever", QueryMode::Global).expect("record");
    sink.record("stroke window", QueryMode::Hybrid).expect("record");
    sink.record("sepsis bundle", QueryMode::Hospital).expect("record");

    let records = read_records(&path).expect("read");
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].query, "sepsis protocol");
    assert_eq!(records[2].mode, QueryMode::Hybrid);

    let summary = summarize(&path).expect("summary");
    assert_eq!(summary, AnalyticsSummary { total: 4, hospital: 2, global: 1, hybrid: 1, skipped: 0 });
}

#[test]
fn missing_log_summarizes_to_zero_and_garbage_is_skipped() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("analytics.jsonl");
    assert_eq!(summarize(&path).expect("summary"), AnalyticsSummary::default());

    JsonlAnalyticsSink::new(&path).record("fever", QueryMode::Global).expect("record");
    let mut text = fs::read_to_string(&path).expect("read");
    text.push_str("not json\n\n");
    fs::write(&path, text).expect("write");

    let summary = summarize(&path).expect("summary");
    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped, 1);
}
