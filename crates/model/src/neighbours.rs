use crate::error::{ModelError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Meaning-to-neighbour expansion table, for widening a disambiguated query
/// to senses close to the chosen one.
///
/// Loaded from headerless CSV: one row per meaning, the meaning identifier
/// first, then (neighbour identifier, distance) pairs. Identifiers arrive in
/// the dotted form (`dish.n.01`) and are normalized to the underscore
/// convention the rest of the model uses. A dangling trailing field with no
/// distance is ignored.
#[derive(Debug)]
pub struct MeaningNeighbours {
    neighbours: HashMap<String, Vec<Neighbour>>,
}

/// One neighbouring sense and its distance from the meaning it expands.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbour {
    pub meaning_id: String,
    pub distance: f64,
}

impl MeaningNeighbours {
    pub fn load_from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(csv_reader().from_path(path.as_ref())?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::load(csv_reader().from_reader(reader))
    }

    fn load<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut neighbours = HashMap::new();

        for record in reader.records() {
            let record = record?;
            let Some(meaning_id) = record.get(0) else {
                continue;
            };
            let meaning_id = normalize_meaning_id(meaning_id);

            let mut row = Vec::with_capacity(record.len() / 2);
            let mut fields = record.iter().skip(1);
            while let (Some(id), Some(distance)) = (fields.next(), fields.next()) {
                let distance =
                    distance
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| ModelError::BadDistance {
                            meaning: meaning_id.clone(),
                            value: distance.to_string(),
                        })?;
                row.push(Neighbour {
                    meaning_id: normalize_meaning_id(id),
                    distance,
                });
            }
            neighbours.insert(meaning_id, row);
        }

        Ok(Self { neighbours })
    }

    /// Neighbours of `meaning_id` (underscore form), closest ordering as
    /// loaded; `None` for a meaning the table does not know.
    pub fn neighbours_for_meaning(&self, meaning_id: &str) -> Option<&[Neighbour]> {
        self.neighbours.get(meaning_id).map(Vec::as_slice)
    }

    /// Number of meanings in the table.
    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }
}

fn csv_reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    // Rows have one field plus two per neighbour; lengths vary per row.
    builder.has_headers(false).flexible(true);
    builder
}

fn normalize_meaning_id(meaning_id: &str) -> String {
    meaning_id.replace('.', "_")
}
