use crate::result::{Meaning, Sentence, Term};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One specific reading of a sentence: a weight and one resolved term per
/// term of the originating sentence.
#[derive(Debug)]
pub struct VariantSentence {
    score: f64,
    terms: Vec<Arc<ResolvedTerm>>,
}

impl VariantSentence {
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn terms(&self) -> &[Arc<ResolvedTerm>] {
        &self.terms
    }

    /// Expand a sentence's independent per-position meaning distributions
    /// into `cardinality` aligned readings.
    pub(crate) fn resolve_sentence(sentence: &Sentence) -> Vec<Arc<VariantSentence>> {
        let cardinality = sentence.cardinality();
        let mut columns: Vec<Vec<Arc<ResolvedTerm>>> = (0..cardinality)
            .map(|_| Vec::with_capacity(sentence.terms().len()))
            .collect();

        for term in sentence.terms() {
            let resolved = resolve_term(sentence, term, cardinality);
            for (index, resolved_term) in resolved.into_iter().enumerate() {
                columns[index].push(resolved_term);
            }
        }

        columns
            .into_iter()
            .enumerate()
            .map(|(index, terms)| {
                Arc::new(VariantSentence {
                    score: sentence.score_at(index),
                    terms,
                })
            })
            .collect()
    }
}

impl fmt::Display for VariantSentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{term}")?;
            first = false;
        }
        Ok(())
    }
}

/// A term bound to one specific meaning choice (or to none, for terms the
/// service could not disambiguate), with the accumulated weight of every
/// reading index that resolves to that choice.
///
/// Instances are shared by `Arc` across variant indices whenever they
/// represent literally the same meaning choice, so consumers can compare
/// identity (`Arc::ptr_eq`) to detect "this reading changed nothing here".
#[derive(Debug, PartialEq)]
pub struct ResolvedTerm {
    term: Term,
    meaning: Option<Arc<Meaning>>,
    score: f64,
}

impl ResolvedTerm {
    pub fn word(&self) -> &str {
        &self.term.word
    }

    pub fn original_term(&self) -> &Term {
        &self.term
    }

    pub fn meaning(&self) -> Option<&Arc<Meaning>> {
        self.meaning.as_ref()
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

/// A resolved term renders as its meaning identifier; named-entity categories
/// render as the surface word with underscores unjoined; an unresolved term
/// renders as the surface word.
impl fmt::Display for ResolvedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.meaning {
            Some(meaning) if meaning.is_entity_category() => {
                f.write_str(&self.term.word.replace('_', " "))
            }
            Some(meaning) => f.write_str(&meaning.meaning),
            None => f.write_str(&self.term.word),
        }
    }
}

/// Per-variant resolved terms for one term, length `cardinality`.
///
/// Meanings cycle when there are fewer of them than readings (`i % m`); all
/// indices that cycle back to the same meaning identifier share one
/// `ResolvedTerm` whose score is the sum of their reading weights.
fn resolve_term(sentence: &Sentence, term: &Term, cardinality: usize) -> Vec<Arc<ResolvedTerm>> {
    if term.meanings.is_empty() {
        // An undisambiguated term reads identically in every parallel
        // reading: one shared instance, weight 1.0.
        let shared = Arc::new(ResolvedTerm {
            term: term.clone(),
            meaning: None,
            score: 1.0,
        });
        return vec![shared; cardinality];
    }

    // First pass: accumulate the weight of each distinct meaning identifier,
    // in first-seen order, and remember which identifier each index picked.
    let mut accumulated: HashMap<&str, f64> = HashMap::new();
    let mut seen_order: Vec<&Arc<Meaning>> = Vec::new();
    let mut picks: Vec<&str> = Vec::with_capacity(cardinality);

    for index in 0..cardinality {
        let meaning = &term.meanings[index % term.meanings.len()];
        let weight = sentence.score_at(index);
        let id = meaning.meaning.as_str();
        match accumulated.get_mut(id) {
            Some(total) => *total += weight,
            None => {
                accumulated.insert(id, weight);
                seen_order.push(meaning);
            }
        }
        picks.push(id);
    }

    // Second pass: one shared ResolvedTerm per distinct meaning identifier.
    let mut shared: HashMap<&str, Arc<ResolvedTerm>> = HashMap::with_capacity(seen_order.len());
    for meaning in seen_order {
        let id = meaning.meaning.as_str();
        shared.insert(
            id,
            Arc::new(ResolvedTerm {
                term: term.clone(),
                meaning: Some(meaning.clone()),
                score: accumulated[id],
            }),
        );
    }

    picks.into_iter().map(|id| shared[id].clone()).collect()
}

/// One whole-document reading: one variant sentence per sentence of the
/// originating result, in sentence order.
#[derive(Debug)]
pub struct Variant {
    sentences: Vec<Arc<VariantSentence>>,
}

impl Variant {
    pub(crate) fn new(sentences: Vec<Arc<VariantSentence>>) -> Self {
        Self { sentences }
    }

    pub fn sentences(&self) -> &[Arc<VariantSentence>] {
        &self.sentences
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered = String::new();
        for sentence in &self.sentences {
            rendered.push_str(&sentence.to_string());
            rendered.push(' ');
        }
        f.write_str(rendered.trim())
    }
}
