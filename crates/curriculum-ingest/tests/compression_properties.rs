//! Property tests for compression and the output ceiling

use curriculum_ingest::ingestion::{normalize, split_paragraphs, TextCompressor};
use curriculum_ingest::processing::truncate_middle;
use proptest::prelude::*;

fn document() -> impl Strategy<Value = String> {
    let paragraph = prop_oneof![
        "[A-Za-z ]{0,12}",
        "(Students|Objective|Assessment) [a-z ,.]{5,60}",
        "[a-z\t ]{10,140}",
        Just("Page 1".to_string()),
        Just("Copyright District Office".to_string()),
    ];
    let separator = prop_oneof![
        Just("\n\n"),
        Just("\n"),
        Just("\r\n\r\n"),
        Just("\n\n\n\n"),
        Just(" \n \n"),
    ];
    prop::collection::vec((paragraph, separator), 0..24).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(p, sep)| format!("{}{}", p, sep))
            .collect()
    })
}

proptest! {
    #[test]
    fn compression_never_grows_text(text in document()) {
        let compressed = TextCompressor::default().compress(&text);
        prop_assert!(compressed.len() <= text.len());
    }

    #[test]
    fn compression_is_idempotent(text in document()) {
        let compressor = TextCompressor::default();
        let once = compressor.compress(&text);
        prop_assert_eq!(compressor.compress(&once), once);
    }

    #[test]
    fn compression_keeps_paragraphs_in_order(text in document()) {
        let normalized = normalize(&text);
        let source: Vec<&str> = split_paragraphs(&normalized).collect();
        let compressed = TextCompressor::default().compress(&text);

        let mut remaining = source.iter();
        for paragraph in split_paragraphs(&compressed) {
            prop_assert!(
                remaining.any(|p| *p == paragraph),
                "{:?} is not an in-order paragraph of the source",
                paragraph
            );
        }
    }

    #[test]
    fn truncation_respects_ceiling(text in "\\PC{0,4000}", ceiling in 1024usize..3000) {
        let bounded = truncate_middle(&text, ceiling);
        prop_assert!(bounded.len() <= ceiling);
        if text.len() <= ceiling {
            prop_assert_eq!(bounded, text);
        } else {
            prop_assert!(bounded.contains("bytes omitted"));
        }
    }
}
