//! Column and value metadata shared by the query engine crates.

pub mod metadata;
