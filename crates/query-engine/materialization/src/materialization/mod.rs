//! Mapping plans: building, caching and applying them.

pub mod builder;
pub mod cache;
pub mod error;
mod macros;
pub mod materializer;
pub mod plan;
pub mod row;
pub mod shape;
