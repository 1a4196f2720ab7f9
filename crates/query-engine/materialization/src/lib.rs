//! Turn flat result rows into nested, strongly shaped values.
//!
//! A destination type declares how it is built through [`FromRow`]. From that
//! declaration and the columns a query actually returned, [`build_plan`] derives
//! a [`MappingPlan`]: a tree fixing which column ordinal feeds which leaf. Plans
//! are cached per `(type, column signature)` in a [`PlanCache`] and applied to
//! each row by [`materialize`].

pub mod materialization;

pub use materialization::builder::{build_plan, BuilderSettings};
pub use materialization::cache::{CacheStats, Lookup, PlanCache};
pub use materialization::error::{MaterializationError, ShapeMismatchError};
pub use materialization::materializer::materialize;
pub use materialization::plan::{Composite, Leaf, MappingPlan, PlanMember, PlanNode};
pub use materialization::row::RowValues;
pub use materialization::shape::{Arguments, Fields, FromRow, Input, Member, Shape, ShapeKind};
