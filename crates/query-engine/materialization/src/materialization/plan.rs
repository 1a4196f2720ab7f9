//! The mapping plan: which ordinal feeds which part of a destination type.

use std::any::TypeId;
use std::fmt;

use query_engine_metadata::metadata::ColumnSignature;

/// An immutable plan for materializing one destination type from one column
/// signature. Shared freely across concurrent executions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingPlan {
    pub destination: TypeId,
    pub type_name: &'static str,
    pub signature: ColumnSignature,
    pub root: PlanNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    Leaf(Leaf),
    /// Children are bound to constructor arguments.
    Positional(Composite),
    /// Children are bound to settable fields by name.
    Named(Composite),
}

/// A column value read from a fixed ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite {
    pub type_name: &'static str,
    /// When set, a null at this ordinal makes the whole composite absent.
    pub null_test: Option<usize>,
    pub members: Vec<PlanMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanMember {
    pub name: Option<&'static str>,
    pub node: PlanNode,
}

impl MappingPlan {
    /// The ordinals in the order the plan assigned them.
    ///
    /// A null test comes before the ordinals of its composite's members.
    pub fn ordinals(&self) -> Vec<usize> {
        let mut ordinals = vec![];
        let mut pending = vec![&self.root];
        while let Some(node) = pending.pop() {
            match node {
                PlanNode::Leaf(leaf) => ordinals.push(leaf.ordinal),
                PlanNode::Positional(composite) | PlanNode::Named(composite) => {
                    ordinals.extend(composite.null_test);
                    pending.extend(composite.members.iter().rev().map(|member| &member.node));
                }
            }
        }
        ordinals
    }

    pub fn column_count(&self) -> usize {
        self.signature.len()
    }
}

/// An indented outline of the plan, one node per line.
impl fmt::Display for MappingPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_node(f, None, &self.root, 0)
    }
}

fn write_node(
    f: &mut fmt::Formatter,
    name: Option<&str>,
    node: &PlanNode,
    depth: usize,
) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let label = name.map_or_else(String::new, |name| format!("{name}: "));
    match node {
        PlanNode::Leaf(leaf) => writeln!(f, "{indent}{label}<- {}", leaf.ordinal),
        PlanNode::Positional(composite) | PlanNode::Named(composite) => {
            let binding = match node {
                PlanNode::Positional(_) => "positional",
                _ => "named",
            };
            match composite.null_test {
                Some(ordinal) => writeln!(
                    f,
                    "{indent}{label}{} [{binding}, null test {ordinal}]",
                    composite.type_name
                )?,
                None => writeln!(f, "{indent}{label}{} [{binding}]", composite.type_name)?,
            }
            for member in &composite.members {
                write_node(f, member.name, &member.node, depth + 1)?;
            }
            Ok(())
        }
    }
}
