use serde::{Deserialize, Serialize};

use crate::classification::domain::labels::{AgeRange, RawPrediction};

/// Ages above this are treated as malformed model output.
pub const MAX_PLAUSIBLE_AGE: f64 = 130.0;

/// One age bracket: `min_years..=max_years`, open-ended when `max_years`
/// is `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub label: String,
    pub min_years: u32,
    pub max_years: Option<u32>,
}

impl AgeBucket {
    fn new(label: &str, min_years: u32, max_years: Option<u32>) -> Self {
        Self {
            label: label.to_string(),
            min_years,
            max_years,
        }
    }

    fn contains(&self, years: u32) -> bool {
        years >= self.min_years && self.max_years.map_or(true, |max| years <= max)
    }
}

/// Versioned bracket table.
///
/// The age model is trained on indices into this table, so the `version`
/// is stored in every age artifact and must be bumped whenever the
/// brackets change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBucketTable {
    pub version: u32,
    pub buckets: Vec<AgeBucket>,
}

impl AgeBucketTable {
    pub fn standard() -> Self {
        Self {
            version: 1,
            buckets: vec![
                AgeBucket::new("0-2", 0, Some(2)),
                AgeBucket::new("3-9", 3, Some(9)),
                AgeBucket::new("10-19", 10, Some(19)),
                AgeBucket::new("20-29", 20, Some(29)),
                AgeBucket::new("30-39", 30, Some(39)),
                AgeBucket::new("40-49", 40, Some(49)),
                AgeBucket::new("50-59", 50, Some(59)),
                AgeBucket::new("60+", 60, None),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Index of the bracket containing `years`, truncated to whole years.
    pub fn index_for_years(&self, years: f64) -> Option<usize> {
        if !years.is_finite() || !(0.0..=MAX_PLAUSIBLE_AGE).contains(&years) {
            return None;
        }
        let whole = years.trunc() as u32;
        self.buckets.iter().position(|b| b.contains(whole))
    }
}

impl Default for AgeBucketTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Maps raw age-model output onto the bracket table. Total: anything that
/// does not land in a bracket becomes [`AgeRange::Unknown`].
#[derive(Clone, Debug)]
pub struct AgeBucketer {
    table: AgeBucketTable,
}

impl AgeBucketer {
    pub fn new(table: AgeBucketTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &AgeBucketTable {
        &self.table
    }

    pub fn bucket(&self, raw: RawPrediction) -> AgeRange {
        let index = match raw {
            RawPrediction::Class(id) => usize::try_from(id).ok(),
            RawPrediction::Scalar(years) => self.table.index_for_years(years),
        };
        index
            .and_then(|i| self.table.buckets.get(i))
            .map_or(AgeRange::Unknown, |b| AgeRange::Bucket(b.label.clone()))
    }
}

impl Default for AgeBucketer {
    fn default() -> Self {
        Self::new(AgeBucketTable::standard())
    }
}
