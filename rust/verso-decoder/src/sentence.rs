//! Source sentences.

use std::sync::Arc;

use crate::reordering::{ReorderingConstraint, Walls};

/// A token. Cheap to clone, shared between the sentence, target phrases and
/// language-model states.
pub type Word = Arc<str>;

/// A tokenized source sentence with an optional reordering constraint.
#[derive(Debug, Clone, Default)]
pub struct Sentence {
    words: Vec<Word>,
    constraint: Option<Arc<dyn ReorderingConstraint>>,
}

impl Sentence {
    pub fn new(words: Vec<Word>) -> Sentence {
        Sentence {
            words,
            constraint: None,
        }
    }

    /// Splits `text` on whitespace. Any further tokenization is the caller's job.
    pub fn from_text(text: &str) -> Sentence {
        Sentence::new(text.split_whitespace().map(Word::from).collect())
    }

    pub fn with_constraint(mut self, constraint: Arc<dyn ReorderingConstraint>) -> Sentence {
        self.constraint = Some(constraint);
        self
    }

    /// Forbids reordering across punctuation tokens.
    pub fn with_punctuation_walls(self) -> Sentence {
        let walls = Walls::at_punctuation(&self.words);
        self.with_constraint(Arc::new(walls))
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word(&self, pos: usize) -> &Word {
        &self.words[pos]
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn constraint(&self) -> Option<&dyn ReorderingConstraint> {
        self.constraint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text() {
        let sentence = Sentence::from_text("  das  ist ein\thaus ");
        assert_eq!(sentence.len(), 4);
        assert_eq!(&*sentence.words()[3], "haus");
        assert!(sentence.constraint().is_none());
        assert!(Sentence::from_text("   ").is_empty());
    }
}
