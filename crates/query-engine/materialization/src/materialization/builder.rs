//! Build a mapping plan from a destination type's declared shape and the
//! columns a query returned.
//!
//! The traversal is depth-first over an explicit stack of open composites.
//! Members are visited in declared order and ordinals are handed out in that
//! same visiting order, so the plan's ordinal assignment reads top to bottom
//! exactly like the declaration. Nothing is reversed on the way in and nothing
//! needs to be reversed on the way out.

use std::any::{type_name, TypeId};

use query_engine_metadata::metadata::{Column, ColumnSignature};

use super::error::ShapeMismatchError;
use super::plan::{Composite, Leaf, MappingPlan, PlanMember, PlanNode};
use super::shape::{FromRow, Member, Shape, ShapeKind};

/// The default name prefix of null test columns.
pub const DEFAULT_SENTINEL_PREFIX: &str = "test";
/// The default limit on composite nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings for the plan builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSettings {
    /// Columns named like this, and of an integer type, are null tests.
    pub sentinel_prefix: String,
    /// Deepest composite nesting accepted before giving up.
    pub max_depth: usize,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        BuilderSettings {
            sentinel_prefix: DEFAULT_SENTINEL_PREFIX.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BuilderSettings {
    /// Whether a column is a null test column.
    ///
    /// The name must be the prefix itself, or the prefix followed by a digit or
    /// an underscore: `test`, `test2` and `test_course` are null tests, `testScore`
    /// is an ordinary column.
    pub fn is_sentinel(&self, column: &Column) -> bool {
        if !column.column_type.is_integer() {
            return false;
        }
        let prefix = self.sentinel_prefix.as_str();
        let Some(head) = column.name.get(..prefix.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(prefix) {
            return false;
        }
        match column.name[prefix.len()..].chars().next() {
            None => true,
            Some(next) => next.is_ascii_digit() || next == '_',
        }
    }
}

/// Build the plan for materializing `T` from rows with the given columns.
pub fn build_plan<T: FromRow>(
    columns: &[Column],
    settings: &BuilderSettings,
) -> Result<MappingPlan, ShapeMismatchError> {
    let root = build_tree(T::shape(), columns, settings)?;
    Ok(MappingPlan {
        destination: TypeId::of::<T>(),
        type_name: type_name::<T>(),
        signature: ColumnSignature::of(columns),
        root,
    })
}

/// Hands out ordinals front to back.
struct Ordinals<'a> {
    columns: &'a [Column],
    next: usize,
}

impl Ordinals<'_> {
    /// Consume the next column as a null test, if it is one.
    fn take_sentinel(&mut self, settings: &BuilderSettings) -> Option<usize> {
        let column = self.columns.get(self.next)?;
        if settings.is_sentinel(column) {
            self.next += 1;
            Some(self.next - 1)
        } else {
            None
        }
    }

    /// Consume the next column as a leaf, checking its name against the member's.
    fn take_leaf(
        &mut self,
        type_name: &'static str,
        member: Option<&'static str>,
    ) -> Result<Leaf, ShapeMismatchError> {
        let ordinal = self.next;
        let column = self
            .columns
            .get(ordinal)
            .ok_or(ShapeMismatchError::TooFewColumns {
                type_name,
                ordinal,
                column_count: self.columns.len(),
            })?;

        if let Some(member) = member {
            let matches = column
                .name
                .get(..member.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(member));
            if !matches {
                return Err(ShapeMismatchError::ColumnNameMismatch {
                    ordinal,
                    member,
                    column: column.name.clone(),
                });
            }
        }

        self.next += 1;
        Ok(Leaf { ordinal })
    }

    fn finish(self, type_name: &'static str, root: PlanNode) -> Result<PlanNode, ShapeMismatchError> {
        if self.next == self.columns.len() {
            Ok(root)
        } else {
            Err(ShapeMismatchError::TooManyColumns {
                type_name,
                consumed: self.next,
                column_count: self.columns.len(),
            })
        }
    }
}

#[derive(Clone, Copy)]
enum Binding {
    Positional,
    Named,
}

/// A composite whose members are still being visited.
struct Frame {
    name: Option<&'static str>,
    type_name: &'static str,
    binding: Binding,
    null_test: Option<usize>,
    declared: Vec<Member>,
    built: Vec<PlanMember>,
}

impl Frame {
    fn open(
        name: Option<&'static str>,
        shape: Shape,
        ordinals: &mut Ordinals,
        settings: &BuilderSettings,
    ) -> Result<Frame, ShapeMismatchError> {
        let (binding, declared) = match shape.kind {
            ShapeKind::Positional(members) => (Binding::Positional, members),
            ShapeKind::Named(members) => {
                if let Some(index) = members.iter().position(|member| member.name.is_none()) {
                    return Err(ShapeMismatchError::UnnamedField {
                        type_name: shape.type_name,
                        index,
                    });
                }
                (Binding::Named, members)
            }
            ShapeKind::Leaf => (Binding::Positional, vec![]),
        };
        // the null test precedes every member ordinal
        let null_test = ordinals.take_sentinel(settings);
        Ok(Frame {
            name,
            type_name: shape.type_name,
            binding,
            null_test,
            built: Vec::with_capacity(declared.len()),
            declared,
        })
    }

    fn next_member(&self) -> Option<Member> {
        self.declared.get(self.built.len()).copied()
    }

    fn finish(self) -> PlanMember {
        let composite = Composite {
            type_name: self.type_name,
            null_test: self.null_test,
            members: self.built,
        };
        PlanMember {
            name: self.name,
            node: match self.binding {
                Binding::Positional => PlanNode::Positional(composite),
                Binding::Named => PlanNode::Named(composite),
            },
        }
    }
}

fn build_tree(
    shape: Shape,
    columns: &[Column],
    settings: &BuilderSettings,
) -> Result<PlanNode, ShapeMismatchError> {
    let root_type = shape.type_name;
    let mut ordinals = Ordinals { columns, next: 0 };

    if shape.is_leaf() {
        let leaf = ordinals.take_leaf(root_type, None)?;
        return ordinals.finish(root_type, PlanNode::Leaf(leaf));
    }

    let mut stack = vec![Frame::open(None, shape, &mut ordinals, settings)?];

    loop {
        let Some(frame) = stack.last_mut() else {
            unreachable!("the root frame returns before the stack empties");
        };

        if let Some(member) = frame.next_member() {
            let member_shape = (member.shape)();
            if member_shape.is_leaf() {
                let leaf = ordinals.take_leaf(frame.type_name, member.name)?;
                frame.built.push(PlanMember {
                    name: member.name,
                    node: PlanNode::Leaf(leaf),
                });
            } else {
                if stack.len() >= settings.max_depth {
                    return Err(ShapeMismatchError::TooDeep {
                        type_name: root_type,
                        max_depth: settings.max_depth,
                    });
                }
                let child = Frame::open(member.name, member_shape, &mut ordinals, settings)?;
                stack.push(child);
            }
            continue;
        }

        // every member of the top frame is built
        let Some(done) = stack.pop() else {
            unreachable!("the loop only runs with a frame on the stack");
        };
        let member = done.finish();
        match stack.last_mut() {
            Some(parent) => parent.built.push(member),
            None => return ordinals.finish(root_type, member.node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine_metadata::metadata::ColumnType;

    fn columns(definitions: &[(&str, ColumnType)]) -> Vec<Column> {
        definitions
            .iter()
            .map(|(name, column_type)| Column::new(*name, *column_type))
            .collect()
    }

    #[derive(Debug, Default, PartialEq)]
    struct Course {
        id: i32,
        name: String,
    }

    crate::named_row!(Course {
        id as "Id": i32,
        name as "Name": String,
    });

    #[derive(Debug, PartialEq)]
    struct Pair {
        a: i32,
        b: Option<Inner>,
    }

    #[derive(Debug, PartialEq)]
    struct Inner {
        b: i32,
    }

    crate::positional_row!(Pair { a: i32, b: Option<Inner> });
    crate::positional_row!(Inner { b: i32 });

    #[test]
    fn named_shape_maps_columns_in_declared_order() {
        let plan = build_plan::<Course>(
            &columns(&[("Id", ColumnType::Integer), ("Name", ColumnType::Text)]),
            &BuilderSettings::default(),
        )
        .unwrap();

        insta::assert_snapshot!(plan.to_string(), @r###"
        Course [named]
          Id: <- 0
          Name: <- 1
        "###);
        assert_eq!(plan.ordinals(), vec![0, 1]);
    }

    #[test]
    fn sentinel_column_becomes_the_null_test_of_the_following_composite() {
        let plan = build_plan::<Pair>(
            &columns(&[
                ("a", ColumnType::Integer),
                ("test_b", ColumnType::Integer),
                ("b", ColumnType::Integer),
            ]),
            &BuilderSettings::default(),
        )
        .unwrap();

        insta::assert_snapshot!(plan.to_string(), @r###"
        Pair [positional]
          a: <- 0
          b: Inner [positional, null test 1]
            b: <- 2
        "###);
        assert_eq!(plan.ordinals(), vec![0, 1, 2]);
    }

    #[test]
    fn leaf_names_are_prefix_matched_ignoring_case() {
        let plan = build_plan::<Course>(
            &columns(&[("ID2", ColumnType::Integer), ("name_1", ColumnType::Text)]),
            &BuilderSettings::default(),
        );
        assert!(plan.is_ok());

        let mismatch = build_plan::<Course>(
            &columns(&[("Id", ColumnType::Integer), ("Code", ColumnType::Text)]),
            &BuilderSettings::default(),
        );
        assert_eq!(
            mismatch,
            Err(ShapeMismatchError::ColumnNameMismatch {
                ordinal: 1,
                member: "Name",
                column: "Code".into(),
            })
        );
    }

    #[test]
    fn column_count_must_match_the_shape() {
        let too_few = build_plan::<Course>(
            &columns(&[("Id", ColumnType::Integer)]),
            &BuilderSettings::default(),
        );
        assert_eq!(
            too_few,
            Err(ShapeMismatchError::TooFewColumns {
                type_name: "Course",
                ordinal: 1,
                column_count: 1,
            })
        );

        let too_many = build_plan::<Course>(
            &columns(&[
                ("Id", ColumnType::Integer),
                ("Name", ColumnType::Text),
                ("Extra", ColumnType::Text),
            ]),
            &BuilderSettings::default(),
        );
        assert!(matches!(
            too_many,
            Err(ShapeMismatchError::TooManyColumns {
                consumed: 2,
                column_count: 3,
                ..
            })
        ));
    }

    #[test]
    fn sentinels_need_an_integer_type_and_a_separator() {
        let settings = BuilderSettings::default();
        assert!(settings.is_sentinel(&Column::new("test", ColumnType::Integer)));
        assert!(settings.is_sentinel(&Column::new("TEST2", ColumnType::Bigint)));
        assert!(settings.is_sentinel(&Column::new("test_course", ColumnType::Smallint)));
        assert!(!settings.is_sentinel(&Column::new("testScore", ColumnType::Integer)));
        assert!(!settings.is_sentinel(&Column::new("test", ColumnType::Text)));
        assert!(!settings.is_sentinel(&Column::new("tes", ColumnType::Integer)));
    }

    #[test]
    fn a_leaf_root_consumes_one_column() {
        let plan = build_plan::<i64>(
            &columns(&[("count", ColumnType::Bigint)]),
            &BuilderSettings::default(),
        )
        .unwrap();
        assert_eq!(plan.root, PlanNode::Leaf(Leaf { ordinal: 0 }));
    }

    struct Endless;

    impl FromRow for Endless {
        fn shape() -> Shape {
            Shape::positional(
                "Endless",
                vec![Member::unnamed::<i32>(), Member::unnamed::<Endless>()],
            )
        }

        fn construct(input: crate::Input<'_>) -> Result<Self, crate::MaterializationError> {
            Err(input.unexpected("Endless", "nothing"))
        }
    }

    #[test]
    fn recursive_shapes_stop_at_the_depth_limit() {
        let many: Vec<Column> = (0..10)
            .map(|i| Column::new(format!("c{i}"), ColumnType::Integer))
            .collect();
        let settings = BuilderSettings {
            max_depth: 4,
            ..BuilderSettings::default()
        };
        assert_eq!(
            build_plan::<Endless>(&many, &settings),
            Err(ShapeMismatchError::TooDeep {
                type_name: "Endless",
                max_depth: 4,
            })
        );
        // without enough columns the recursion runs out of columns first
        assert!(matches!(
            build_plan::<Endless>(&many[..2], &BuilderSettings::default()),
            Err(ShapeMismatchError::TooFewColumns { .. })
        ));
    }
}
