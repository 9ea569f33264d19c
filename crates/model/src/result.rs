use crate::error::Result;
use crate::variant::{Variant, VariantSentence};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Tolerance applied when comparing reading scores. The service renormalises
/// scores on every call, so repeated responses for the same text can differ in
/// the last few decimal places.
pub const SCORE_TOLERANCE: f64 = 0.001;

/// Meaning identifiers that denote a named-entity category rather than a
/// dictionary sense. Closed set; entity terms render as their surface word.
pub const ENTITY_CATEGORIES: [&str; 3] = ["person_n_01", "organization_n_01", "location_n_01"];

/// One decoded response from the disambiguation service: an ordered list of
/// sentences, in wire order.
#[derive(Debug)]
pub struct DisambiguationResult {
    sentences: Vec<Sentence>,
    variants: OnceCell<Vec<Variant>>,
}

impl DisambiguationResult {
    /// Decode boundary for the service's JSON wire shape (a top-level array of
    /// sentences). Malformed documents (negative offsets, null meaning lists)
    /// are rejected here.
    pub fn from_json(json: &str) -> Result<Self> {
        let sentences: Vec<Sentence> = serde_json::from_str(json)?;
        Ok(Self::from_sentences(sentences))
    }

    pub fn from_sentences(sentences: Vec<Sentence>) -> Self {
        Self {
            sentences,
            variants: OnceCell::new(),
        }
    }

    /// Re-encode the wire shape. Derived variants are never serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.sentences)?)
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Whole-document readings, computed on first access and memoized for the
    /// lifetime of this result.
    ///
    /// The number of document variants is the maximum sentence cardinality; a
    /// sentence with fewer readings than that repeats its first reading for
    /// the extra global indices.
    pub fn variants(&self) -> &[Variant] {
        self.variants.get_or_init(|| self.calculate_variants())
    }

    fn calculate_variants(&self) -> Vec<Variant> {
        let cardinality = self
            .sentences
            .iter()
            .map(|s| s.variants().len())
            .max()
            .unwrap_or(0);

        (0..cardinality)
            .map(|index| {
                let sentences = self
                    .sentences
                    .iter()
                    .map(|sentence| {
                        let variants = sentence.variants();
                        variants
                            .get(index)
                            .unwrap_or_else(|| &variants[0])
                            .clone()
                    })
                    .collect();
                Variant::new(sentences)
            })
            .collect()
    }
}

impl PartialEq for DisambiguationResult {
    fn eq(&self, other: &Self) -> bool {
        self.sentences == other.sentences
    }
}

/// One sentence of a result: ordered terms plus one normalized score per
/// reading. Scores are relative weights; an empty list means a single
/// implicit reading of weight 1.0.
#[derive(Debug, Serialize, Deserialize)]
pub struct Sentence {
    terms: Vec<Term>,
    #[serde(default)]
    scores: Vec<f64>,
    #[serde(skip)]
    variants: OnceCell<Vec<Arc<VariantSentence>>>,
}

impl Sentence {
    pub fn new(terms: Vec<Term>, scores: Vec<f64>) -> Self {
        Self {
            terms,
            scores,
            variants: OnceCell::new(),
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Number of readings this sentence produces: `max(len(scores), 1)`.
    pub fn cardinality(&self) -> usize {
        self.scores.len().max(1)
    }

    /// Weight of reading `index`; indices past the score list weigh 1.0.
    pub(crate) fn score_at(&self, index: usize) -> f64 {
        self.scores.get(index).copied().unwrap_or(1.0)
    }

    /// The parallel readings of this sentence, computed once on first access.
    pub fn variants(&self) -> &[Arc<VariantSentence>] {
        self.variants
            .get_or_init(|| VariantSentence::resolve_sentence(self))
    }
}

/// Tolerant of floating-point score noise: term lists must match exactly,
/// corresponding scores may differ by up to [`SCORE_TOLERANCE`].
impl PartialEq for Sentence {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
            && self.scores.len() == other.scores.len()
            && self
                .scores
                .iter()
                .zip(&other.scores)
                .all(|(a, b)| (a - b).abs() <= SCORE_TOLERANCE)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(&term.word)?;
            first = false;
        }
        Ok(())
    }
}

/// One token of a sentence, immutable once decoded. A term with no meanings
/// could not be disambiguated (function words, punctuation); that is the
/// common case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Term {
    pub word: String,
    pub lemma: String,
    #[serde(rename = "POS")]
    pub pos: String,
    /// Raw substring of the source text this term was produced from.
    #[serde(default)]
    pub text: String,
    /// Byte offset of `text` within the source text.
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub meanings: Vec<Arc<Meaning>>,
}

/// A candidate sense: underscore-joined identifier (e.g. `dish_n_01`) plus a
/// human-readable definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meaning {
    pub meaning: String,
    pub definition: String,
}

impl Meaning {
    /// True when the identifier is one of the named-entity category
    /// sentinels rather than a dictionary sense.
    pub fn is_entity_category(&self) -> bool {
        ENTITY_CATEGORIES.contains(&self.meaning.as_str())
    }
}
