//! # Verso: phrase-based translation decoding
//!
//! Verso searches for the best translation of a source sentence given a table
//! of scored phrase translations and a weighted set of feature functions. A
//! translation covers every source word exactly once with non-overlapping
//! phrases, emitted left to right in target order while the source may be
//! covered in any order the reordering limits admit.
//!
//! ## Key Features
//!
//! * **Stack decoding**: hypotheses grouped by the number of covered source
//!   words, with recombination of equivalent hypotheses and histogram and beam
//!   pruning
//! * **Cube pruning**: lazy successor generation from a shared priority queue
//!   bounded by a pop limit
//! * **Admissible future cost**: the best achievable score of every source span
//!   is precomputed, so partial hypotheses covering different words compete fairly
//! * **N-best lists**: derivations merged during recombination are kept as arcs
//!   and enumerated lazily, optionally distinct by surface string
//! * **Parallel batches**: sentences are decoded independently on a thread pool
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use verso::decoder::{
//!     Decoder, DecoderConfig, FeatureSet, PhraseTable, Sentence, WeightsConfig,
//!     feature::{DistortionPenalty, TRANSLATION_MODEL},
//! };
//!
//! let mut table = PhraseTable::new(1);
//! table.insert("das", "the", vec![-0.1])?;
//! table.insert("haus", "house", vec![-0.2])?;
//!
//! let weights = WeightsConfig::new()
//!     .with(TRANSLATION_MODEL, vec![1.0])
//!     .with("Distortion", vec![0.5]);
//! let features = FeatureSet::builder(1)
//!     .stateful(DistortionPenalty::new())
//!     .build(&weights)?;
//!
//! let decoder = Decoder::new(Arc::new(table), Arc::new(features), DecoderConfig::default())?;
//! let result = decoder.decode(&Sentence::from_text("das haus"))?;
//! assert_eq!(result.best.unwrap().text(), "the house");
//! # Ok::<(), verso::common::error::Error>(())
//! ```

pub use verso_common as common;
pub use verso_decoder as decoder;

pub mod support {
    pub use verso_coverage as coverage;
}
