use serde::{Deserialize, Serialize};

/// A single extracted value paired with the confidence of the pattern that
/// produced it. Absence is a default value with confidence 0.0, never a null
/// without confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractedField<T> {
    pub value: T,
    pub confidence: f64,
}

impl<T> ExtractedField<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl<T: Default> ExtractedField<T> {
    /// Sentinel for a field no pattern matched.
    pub fn absent() -> Self {
        Self {
            value: T::default(),
            confidence: 0.0,
        }
    }
}
