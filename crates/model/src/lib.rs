//! # Sense Model
//!
//! Data model for disambiguation service responses.
//!
//! A response decodes into a [`DisambiguationResult`]: ordered sentences of
//! ordered terms, each term carrying zero or more candidate meanings, each
//! sentence carrying one normalized score per reading. The decoded model is
//! immutable; the derived "parallel reading" views ([`VariantSentence`],
//! [`Variant`]) are computed lazily on first access and memoized for the
//! lifetime of the owning result.
//!
//! ## Example
//!
//! ```no_run
//! use sense_model::DisambiguationResult;
//!
//! # fn main() -> sense_model::Result<()> {
//! let result = DisambiguationResult::from_json(r#"[{"terms": [], "scores": []}]"#)?;
//! for variant in result.variants() {
//!     println!("{variant}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod neighbours;
mod result;
mod variant;

pub use error::{ModelError, Result};
pub use neighbours::{MeaningNeighbours, Neighbour};
pub use result::{
    DisambiguationResult, Meaning, Sentence, Term, ENTITY_CATEGORIES, SCORE_TOLERANCE,
};
pub use variant::{ResolvedTerm, Variant, VariantSentence};
