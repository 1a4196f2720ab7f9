//! Apply a mapping plan to one row.

use std::any::TypeId;

use super::error::MaterializationError;
use super::plan::{MappingPlan, PlanNode};
use super::row::RowValues;
use super::shape::{Arguments, Fields, FromRow, Input};

/// Materialize one instance of `T` from the row under the cursor.
///
/// The plan must have been built for `T`. Only the ordinals the plan reaches
/// are read: a composite whose null test reads null is absent and none of its
/// member columns are touched.
pub fn materialize<T: FromRow>(
    plan: &MappingPlan,
    row: &dyn RowValues,
) -> Result<T, MaterializationError> {
    if plan.destination != TypeId::of::<T>() {
        return Err(MaterializationError::PlanTypeMismatch {
            expected: std::any::type_name::<T>(),
            plan: plan.type_name,
        });
    }
    materialize_node::<T>(&plan.root, row)
}

pub(crate) fn materialize_node<T: FromRow>(
    node: &PlanNode,
    row: &dyn RowValues,
) -> Result<T, MaterializationError> {
    match node {
        PlanNode::Leaf(leaf) => {
            let value = row.value(leaf.ordinal)?;
            T::construct(Input::Value(value)).map_err(|err| err.at_ordinal(leaf.ordinal))
        }
        PlanNode::Positional(composite) | PlanNode::Named(composite) => {
            if let Some(null_test) = composite.null_test {
                if row.is_null(null_test)? {
                    return T::absent();
                }
            }
            let input = match node {
                PlanNode::Positional(_) => Input::Arguments(Arguments::new(composite, row)),
                _ => Input::Fields(Fields::new(composite, row)),
            };
            T::construct(input)
        }
    }
}
