//! Ready-made parameter containers.
//!
//! Any `Clone + Send + Sync + 'static` value can parameterize a descriptor;
//! these cover the common cases of no parameters and a single key.

/// For queries that take no input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NoParameters;

/// For queries keyed by one identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SingleId<T>(pub T);

impl<T: Copy> SingleId<T> {
    pub fn id(&self) -> T {
        self.0
    }
}

impl<T> From<T> for SingleId<T> {
    fn from(id: T) -> Self {
        SingleId(id)
    }
}
