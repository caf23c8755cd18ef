//! Filter engine module.
//!
//! This module provides:
//! - FilterEngine: applies grid filters and free-text search to a query
//! - FieldFilter: posted values normalized into typed filters
//! - Types: FilterSpec, FilterKind, TextOperator, Column, RelationSearchMap

mod engine;
mod normalize;
mod search;
pub mod types;

pub use engine::FilterEngine;
pub use normalize::{
    FieldFilter, NumberBound, NumberRange, Scalar, normalize_number, parse_datetime,
};
pub use types::{
    Column, FilterGroup, FilterKind, FilterSpec, INPUT_TEXT_OPTIONS_KEY, RelationEntry,
    RelationSearchMap, RelationTarget, TextOperator,
};
