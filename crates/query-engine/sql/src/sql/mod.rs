//! SQL text with bound parameters, and helpers to render it for humans.

pub mod diagnostics;
pub mod plan;
pub mod string;
