//! A sample school database: its schema and data, its models, and the
//! queries the benchmark runs.

pub mod models;
pub mod queries;
pub mod seed;
