//! The query plan handle produced by query descriptors, and its text form.

pub mod sql;
