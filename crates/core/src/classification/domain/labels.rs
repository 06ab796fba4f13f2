use std::fmt;

use serde::{Serialize, Serializer};

/// Unmapped classifier output, before translation to a human-readable label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawPrediction {
    /// Discrete class index.
    Class(i64),
    /// Continuous estimate (e.g. age in years).
    Scalar(f64),
}

impl RawPrediction {
    /// The class index, if this prediction is one or is an exact integer.
    pub fn as_class(&self) -> Option<i64> {
        match *self {
            RawPrediction::Class(id) => Some(id),
            RawPrediction::Scalar(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
            RawPrediction::Scalar(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Class 0 is male, class 1 is female; any other id is inconclusive.
    pub fn from_class_id(id: i64) -> Self {
        match id {
            0 => Gender::Male,
            1 => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    pub fn from_prediction(raw: RawPrediction) -> Self {
        raw.as_class().map_or(Gender::Unknown, Gender::from_class_id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Human-readable age bracket, or an explicit unknown.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AgeRange {
    Bucket(String),
    Unknown,
}

impl AgeRange {
    pub fn as_str(&self) -> &str {
        match self {
            AgeRange::Bucket(label) => label,
            AgeRange::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AgeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
