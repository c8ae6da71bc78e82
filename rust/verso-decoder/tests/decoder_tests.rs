use std::sync::Arc;

use verso_common::{
    Result,
    error::{Error, ErrorKind},
};
use verso_decoder::{
    Decoder, DecoderConfig, PhraseCandidate, PhraseSource, PhraseTable, SearchAlgorithm,
    SearchConfig, Sentence, Word,
};
use verso_testkit::fixtures::{sentence, tm_distortion_features, tm_features, word_for_word_table};

/// Fails every lookup that touches the word "boom".
struct FailingSource {
    inner: PhraseTable,
}

impl PhraseSource for FailingSource {
    fn num_scores(&self) -> usize {
        self.inner.num_scores()
    }

    fn lookup(&self, source: &[Word]) -> Result<Vec<PhraseCandidate>> {
        if source.iter().any(|word| &**word == "boom") {
            return Err(Error::invalid_operation("lookup of 'boom'"));
        }
        self.inner.lookup(source)
    }
}

fn config(threads: Option<usize>) -> DecoderConfig {
    DecoderConfig {
        threads,
        ..Default::default()
    }
}

#[test]
fn test_batch_isolates_failing_sentence() {
    let source = FailingSource {
        inner: word_for_word_table("a b", -1.0),
    };
    let decoder = Decoder::new(
        Arc::new(source),
        Arc::new(tm_distortion_features(1)),
        config(Some(2)),
    )
    .unwrap();

    let sentences = [sentence("a b"), sentence("a boom b"), sentence("b a")];
    let results = decoder.decode_batch(&sentences);
    assert_eq!(results.len(), 3);

    assert_eq!(results[0].as_ref().unwrap().best.as_ref().unwrap().text(), "A B");
    assert_eq!(results[2].as_ref().unwrap().best.as_ref().unwrap().text(), "B A");

    let err = results[1].as_ref().unwrap_err();
    match err.kind() {
        ErrorKind::Sentence { index, source } => {
            assert_eq!(*index, 1);
            assert!(matches!(source.kind(), ErrorKind::InvalidOperation { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!err.is_contract_violation());
    assert!(err.to_string().contains("sentence 1"));
}

#[test]
fn test_batch_matches_single_decodes() {
    let text = "a b c d e f";
    let mut table = word_for_word_table(text, -1.0);
    table.insert("b c", "BC", vec![-1.5]).unwrap();
    table.insert("d", "DD", vec![-1.2]).unwrap();

    let sentences = ["a b c", "f e d c b a", "c", "b c d b c", "e a f"].map(sentence);
    for algorithm in [SearchAlgorithm::Normal, SearchAlgorithm::CubePruning] {
        let decoder_config = DecoderConfig {
            search: SearchConfig {
                algorithm,
                nbest_size: 3,
                ..Default::default()
            },
            threads: Some(3),
            ..Default::default()
        };
        let decoder = Decoder::new(
            Arc::new(table.clone()),
            Arc::new(tm_distortion_features(1)),
            decoder_config,
        )
        .unwrap();

        let batch = decoder.decode_batch(&sentences);
        for (sentence, result) in sentences.iter().zip(&batch) {
            let batched = result.as_ref().unwrap();
            let single = decoder.decode(sentence).unwrap();
            assert_eq!(batched.best, single.best);
            assert_eq!(batched.nbest, single.nbest);
            assert!(batched.best.is_some());
        }
    }
}

#[test]
fn test_score_count_mismatch_rejected() {
    let table = PhraseTable::new(2);
    let err = Decoder::new(
        Arc::new(table),
        Arc::new(tm_features(1)),
        DecoderConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
}

#[test]
fn test_invalid_config_rejected() {
    let build = |config: DecoderConfig| {
        Decoder::new(
            Arc::new(word_for_word_table("a", -1.0)),
            Arc::new(tm_features(1)),
            config,
        )
    };

    let zero_stack = DecoderConfig {
        search: SearchConfig {
            stack_limit: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(build(zero_stack).is_err());
    assert!(build(config(Some(0))).is_err());
    assert!(build(config(None)).is_ok());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "search": {
            "algorithm": "cube_pruning",
            "nbest_size": 2,
            "max_distortion": null,
            "cube_pop_limit": 50
        },
        "threads": 1
    }"#;
    let config: DecoderConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.search.algorithm, SearchAlgorithm::CubePruning);
    assert_eq!(config.search.max_distortion, None);
    assert_eq!(config.search.stack_limit, 100);

    let decoder = Decoder::new(
        Arc::new(word_for_word_table("x y", -0.5)),
        Arc::new(tm_distortion_features(1)),
        config,
    )
    .unwrap();
    let result = decoder.decode(&Sentence::from_text("y x")).unwrap();
    assert_eq!(result.best.unwrap().text(), "Y X");
    assert_eq!(result.nbest.len(), 2);
    assert!(result.nbest[0].score > result.nbest[1].score);
}
