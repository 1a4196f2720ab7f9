//! Metadata information regarding result columns and the values they carry.

pub mod column;
pub mod value;

// re-export without modules
pub use column::*;
pub use value::*;
