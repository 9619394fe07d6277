//! A single stored measurement that daily statistics are summed from.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::health::Category;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuantitySample {
    pub id: Uuid,
    pub category: Category,
    /// Local wall-clock time the measurement started.
    pub start_at: NaiveDateTime,
    /// In the category's unit (see [`Category::unit`]).
    pub value: f64,
}

impl QuantitySample {
    pub fn new(category: Category, start_at: NaiveDateTime, value: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            start_at,
            value,
        }
    }
}
