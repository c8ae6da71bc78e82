use ahash::AHashSet;
use verso_decoder::{
    DecodeResult, FeatureSet, HypothesisArena, Manager, PhraseTable, ReorderingPolicy,
    SearchAlgorithm, SearchConfig, Sentence, TranslationOptionCollection,
    trellis::{TrellisPath, TrellisPathCollection},
};
use verso_testkit::{
    data_gen::{PROBLEM_PHRASE_SCORES, ProblemShape, RandomProblem, random_problem},
    fixtures::{sentence, standard_features, tm_features},
    oracle::best_derivation,
};

const ALGORITHMS: [SearchAlgorithm; 2] = [SearchAlgorithm::Normal, SearchAlgorithm::CubePruning];

fn decode(
    sentence: &Sentence,
    table: &PhraseTable,
    features: &FeatureSet,
    config: &SearchConfig,
) -> DecodeResult {
    Manager::new(sentence, table, features, config)
        .decode()
        .unwrap()
}

fn problems(seed: u64, count: usize, shape: ProblemShape) -> Vec<RandomProblem> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count).map(|_| random_problem(&mut rng, shape)).collect()
}

/// "a b" translates either word by word or as one phrase; without a stateful
/// feature both complete hypotheses recombine.
fn recombining_table() -> PhraseTable {
    let mut table = PhraseTable::new(1);
    table.insert("a", "x", vec![-1.0]).unwrap();
    table.insert("b", "y", vec![-1.0]).unwrap();
    table.insert("a b", "x y", vec![-2.5]).unwrap();
    table
}

#[test]
fn test_nbest_follows_recombination_arc() {
    let sentence = sentence("a b");
    let table = recombining_table();
    let features = tm_features(1);
    for algorithm in ALGORITHMS {
        let config = SearchConfig {
            algorithm,
            nbest_size: 3,
            max_distortion: Some(0),
            ..Default::default()
        };
        let result = decode(&sentence, &table, &features, &config);
        assert_eq!(result.stats.recombined, 1);

        let nbest = &result.nbest;
        assert_eq!(nbest.len(), 2);
        assert_eq!(nbest[0], result.best.unwrap());
        assert_eq!(nbest[0].alignment(), [(0, 0), (1, 1)]);
        assert_eq!(nbest[0].score, -2.0);
        assert_eq!(nbest[1].alignment(), [(0, 1)]);
        assert_eq!(nbest[1].score, -2.5);
        assert_eq!(nbest[0].text(), nbest[1].text());
    }
}

#[test]
fn test_distinct_nbest_drops_same_surface() {
    let sentence = sentence("a b");
    let table = recombining_table();
    let features = tm_features(1);
    for algorithm in ALGORITHMS {
        let config = SearchConfig {
            algorithm,
            nbest_size: 3,
            nbest_distinct: true,
            max_distortion: Some(0),
            ..Default::default()
        };
        let result = decode(&sentence, &table, &features, &config);
        assert_eq!(result.nbest.len(), 1);
        assert_eq!(result.nbest[0].text(), "x y");
        assert_eq!(result.nbest[0].score, -2.0);
    }
}

#[test]
fn test_nbest_disabled_by_default() {
    let result = decode(
        &sentence("a b"),
        &recombining_table(),
        &tm_features(1),
        &SearchConfig::default(),
    );
    assert!(result.best.is_some());
    assert!(result.nbest.is_empty());
}

/// Expands the deviants of `path` down to `depth` levels, checking that each
/// substituted arc lost its recombination to the edge it replaces. Returns the
/// number of deviants checked.
fn check_deviants(arena: &HypothesisArena, path: &TrellisPath, depth: usize) -> usize {
    if depth == 0 {
        return 0;
    }
    let mut deviants = TrellisPathCollection::new();
    path.create_deviant_paths(arena, &mut deviants);
    let mut checked = 0;
    while let Some(deviant) = deviants.pop_best() {
        let edge = deviant.prev_edge_changed().unwrap();
        let arc = deviant.edges()[edge];
        assert_eq!(arena[arc].winner(), Some(path.edges()[edge]));
        assert_eq!(deviant.edges()[..edge], path.edges()[..edge]);
        assert!(deviant.score() <= path.score() + 1e-4);

        let initial = *deviant.edges().last().unwrap();
        assert!(arena[initial].parent().is_none());
        checked += 1 + check_deviants(arena, &deviant, depth - 1);
    }
    checked
}

#[test]
fn test_deviant_arcs_replace_their_winner() {
    let mut checked = 0;
    for algorithm in ALGORITHMS {
        let config = SearchConfig {
            algorithm,
            nbest_size: 3,
            max_distortion: Some(0),
            ..Default::default()
        };
        let graph = Manager::new(&sentence("a b"), &recombining_table(), &tm_features(1), &config)
            .search()
            .unwrap();
        for last in graph.final_hypotheses() {
            let pure = TrellisPath::pure(graph.arena(), last);
            assert_eq!(pure.prev_edge_changed(), None);
            checked += check_deviants(graph.arena(), &pure, 3);
        }
    }
    for problem in problems(29, 4, ProblemShape::default()) {
        let features = standard_features(PROBLEM_PHRASE_SCORES, problem.lm.clone());
        for algorithm in ALGORITHMS {
            let config = SearchConfig {
                algorithm,
                nbest_size: 10,
                ..Default::default()
            };
            let graph = Manager::new(&problem.sentence, &problem.table, &features, &config)
                .search()
                .unwrap();
            for last in graph.final_hypotheses().into_iter().take(3) {
                checked += check_deviants(graph.arena(), &TrellisPath::pure(graph.arena(), last), 2);
            }
        }
    }
    assert!(checked >= ALGORITHMS.len());
}

#[test]
fn test_nbest_descending_without_duplicates() {
    for problem in problems(3, 8, ProblemShape::default()) {
        let features = standard_features(PROBLEM_PHRASE_SCORES, problem.lm.clone());
        for algorithm in ALGORITHMS {
            let config = SearchConfig {
                algorithm,
                nbest_size: 10,
                ..Default::default()
            };
            let result = decode(&problem.sentence, &problem.table, &features, &config);
            let nbest = &result.nbest;
            assert!(!nbest.is_empty());
            assert!(nbest.len() <= 10);
            assert_eq!(nbest[0].score, result.best.as_ref().unwrap().score);
            for pair in nbest.windows(2) {
                assert!(pair[0].score >= pair[1].score - 1e-4, "{} < {}", pair[0].score, pair[1].score);
            }

            let mut derivations = AHashSet::new();
            for translation in nbest {
                let key = (translation.alignment(), translation.text());
                assert!(derivations.insert(key), "repeated derivation {translation}");
                let covered = translation
                    .alignment()
                    .iter()
                    .map(|(start, end)| end - start + 1)
                    .sum::<usize>();
                assert_eq!(covered, problem.sentence.len());
            }
        }
    }
}

#[test]
fn test_exhaustive_nbest_matches_brute_force() {
    let shape = ProblemShape {
        len: 4,
        ..Default::default()
    };
    for (i, problem) in problems(13, 6, shape).iter().enumerate() {
        let features = standard_features(PROBLEM_PHRASE_SCORES, problem.lm.clone());
        let options = TranslationOptionCollection::build(
            &problem.sentence,
            &problem.table,
            &features,
            &SearchConfig::exhaustive(SearchAlgorithm::Normal),
        )
        .unwrap();
        let oracle = best_derivation(
            &problem.sentence,
            &options,
            &features,
            &ReorderingPolicy::new(None, None),
        )
        .unwrap();

        for algorithm in ALGORITHMS {
            let config = SearchConfig {
                nbest_size: 5,
                ..SearchConfig::exhaustive(algorithm)
            };
            let result = decode(&problem.sentence, &problem.table, &features, &config);
            let expected = &oracle.scores[..oracle.scores.len().min(5)];
            assert_eq!(result.nbest.len(), expected.len());
            for (translation, &score) in result.nbest.iter().zip(expected) {
                assert!(
                    (translation.score - score).abs() < 1e-3,
                    "problem {i}, {algorithm:?}: {} vs {score}",
                    translation.score
                );
            }
        }
    }
}

#[test]
fn test_distinct_nbest_never_repeats_surface() {
    let shape = ProblemShape {
        len: 5,
        target_vocab: 2,
        max_word_options: 2,
        ..Default::default()
    };
    for problem in problems(29, 8, shape) {
        let features = standard_features(PROBLEM_PHRASE_SCORES, problem.lm.clone());
        for algorithm in ALGORITHMS {
            let config = SearchConfig {
                algorithm,
                nbest_size: 6,
                nbest_distinct: true,
                ..Default::default()
            };
            let result = decode(&problem.sentence, &problem.table, &features, &config);
            assert!(!result.nbest.is_empty());
            let mut seen = AHashSet::new();
            for translation in &result.nbest {
                assert!(seen.insert(translation.text()), "repeated {translation}");
            }
            assert_eq!(result.nbest[0].score, result.best.as_ref().unwrap().score);
        }
    }
}
