//! Phrase lookup.
//!
//! [`PhraseSource`] is the boundary to whatever stores translation phrases.
//! [`PhraseTable`] is a simple in-memory implementation that can be filled
//! programmatically or loaded from lines of the form
//!
//! ```text
//! das haus ||| the house ||| 0.8 0.6
//! ```
//!
//! Scores in text form are probabilities and are stored as natural logs.
//! Fields after the third are ignored.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use ahash::AHashMap;
use verso_common::{Result, error::Error};

use crate::{options::TargetPhrase, sentence::Word};

pub const FIELD_SEPARATOR: &str = "|||";

/// One translation of a source phrase with its log-domain scores.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseCandidate {
    pub target: TargetPhrase,
    pub scores: Vec<f32>,
}

/// Provides candidate translations for source phrases.
pub trait PhraseSource: Send + Sync {
    /// Number of scores every candidate carries.
    fn num_scores(&self) -> usize;

    /// Candidates for the exact word sequence `source`, in any order.
    fn lookup(&self, source: &[Word]) -> Result<Vec<PhraseCandidate>>;
}

#[derive(Debug, Clone, Default)]
pub struct PhraseTable {
    num_scores: usize,
    entries: AHashMap<Vec<Word>, Vec<PhraseCandidate>>,
    max_source_len: usize,
}

impl PhraseTable {
    pub fn new(num_scores: usize) -> PhraseTable {
        PhraseTable {
            num_scores,
            entries: AHashMap::new(),
            max_source_len: 0,
        }
    }

    /// Adds a candidate with log-domain `scores`.
    pub fn insert(&mut self, source: &str, target: &str, scores: Vec<f32>) -> Result<()> {
        let key = source.split_whitespace().map(Word::from).collect::<Vec<_>>();
        if key.is_empty() {
            return Err(Error::invalid_arg("source", "empty source phrase"));
        }
        if scores.len() != self.num_scores {
            return Err(Error::invalid_arg(
                "scores",
                format!(
                    "expected {} scores for '{source}', got {}",
                    self.num_scores,
                    scores.len()
                ),
            ));
        }
        self.max_source_len = self.max_source_len.max(key.len());
        self.entries.entry(key).or_default().push(PhraseCandidate {
            target: TargetPhrase::from_text(target),
            scores,
        });
        Ok(())
    }

    /// Number of distinct source phrases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_source_len(&self) -> usize {
        self.max_source_len
    }

    pub fn load(reader: impl BufRead) -> Result<PhraseTable> {
        let mut table: Option<PhraseTable> = None;
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::io("phrase table", e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let element = || format!("phrase table line {}", index + 1);

            let fields = line.split(FIELD_SEPARATOR).map(str::trim).collect::<Vec<_>>();
            if fields.len() < 3 {
                return Err(Error::invalid_format(
                    element(),
                    format!("expected 'source {FIELD_SEPARATOR} target {FIELD_SEPARATOR} scores'"),
                ));
            }
            if fields[0].is_empty() {
                return Err(Error::invalid_format(element(), "empty source phrase"));
            }

            let scores = fields[2]
                .split_whitespace()
                .map(|s| match s.parse::<f32>() {
                    Ok(p) if p > 0.0 && p.is_finite() => Ok(p.ln()),
                    Ok(p) => Err(Error::invalid_format(
                        element(),
                        format!("score {p} is not a positive probability"),
                    )),
                    Err(e) => Err(Error::invalid_format(element(), format!("'{s}': {e}"))),
                })
                .collect::<Result<Vec<_>>>()?;

            let table = table.get_or_insert_with(|| PhraseTable::new(scores.len()));
            if scores.len() != table.num_scores {
                return Err(Error::invalid_format(
                    element(),
                    format!(
                        "expected {} scores, found {}",
                        table.num_scores,
                        scores.len()
                    ),
                ));
            }
            table.insert(fields[0], fields[1], scores)?;
        }
        let table = table.unwrap_or_default();
        log::debug!(
            "loaded phrase table: {} source phrases, {} scores each",
            table.len(),
            table.num_scores
        );
        Ok(table)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<PhraseTable> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        PhraseTable::load(BufReader::new(file))
    }
}

impl PhraseSource for PhraseTable {
    fn num_scores(&self) -> usize {
        self.num_scores
    }

    fn lookup(&self, source: &[Word]) -> Result<Vec<PhraseCandidate>> {
        if source.len() > self.max_source_len {
            return Ok(Vec::new());
        }
        Ok(self.entries.get(source).cloned().unwrap_or_default())
    }
}
