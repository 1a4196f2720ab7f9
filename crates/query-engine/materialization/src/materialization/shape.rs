//! The statically declared construction contract of a destination type.
//!
//! A type that rows can be materialized into implements [`FromRow`]. Its
//! [`Shape`] tells the plan builder how many columns the type consumes and in
//! which order; its `construct` function is handed an [`Input`] matching that
//! shape when a row is materialized.
//!
//! Three shapes exist:
//!
//! * a leaf reads exactly one column value,
//! * a positional composite is built from constructor arguments in declared order,
//! * a named composite is default-constructed and then has each field assigned.
//!
//! Most types do not implement the trait by hand but use the
//! [`positional_row!`](crate::positional_row), [`named_row!`](crate::named_row)
//! and [`scalar_newtype!`](crate::scalar_newtype) macros.

use query_engine_metadata::metadata::Value;

use super::error::MaterializationError;
use super::materializer::materialize_node;
use super::plan::{Composite, PlanMember};
use super::row::RowValues;

/// A type rows can be materialized into.
pub trait FromRow: Sized + 'static {
    /// The declared shape, consulted once per plan build.
    fn shape() -> Shape;

    /// Build an instance from the input the plan supplies for this type.
    fn construct(input: Input<'_>) -> Result<Self, MaterializationError>;

    /// The value to use when a null test marks this composite as absent.
    ///
    /// Only optional types can be absent.
    fn absent() -> Result<Self, MaterializationError> {
        Err(MaterializationError::UnexpectedAbsent {
            type_name: std::any::type_name::<Self>(),
        })
    }
}

/// The declared shape of a destination type.
#[derive(Debug, Clone)]
pub struct Shape {
    pub type_name: &'static str,
    pub kind: ShapeKind,
}

#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// A single column value.
    Leaf,
    /// Constructor arguments, in declared order.
    Positional(Vec<Member>),
    /// Settable fields, in declared order. Every member must be named.
    Named(Vec<Member>),
}

/// A constructor argument or field of a composite shape.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    /// Leaf members with a name must face a column whose name starts with it.
    pub name: Option<&'static str>,
    pub shape: fn() -> Shape,
}

impl Shape {
    pub fn leaf(type_name: &'static str) -> Self {
        Shape {
            type_name,
            kind: ShapeKind::Leaf,
        }
    }

    pub fn positional(type_name: &'static str, arguments: Vec<Member>) -> Self {
        Shape {
            type_name,
            kind: ShapeKind::Positional(arguments),
        }
    }

    pub fn named(type_name: &'static str, fields: Vec<Member>) -> Self {
        Shape {
            type_name,
            kind: ShapeKind::Named(fields),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ShapeKind::Leaf)
    }
}

impl Member {
    pub fn new<T: FromRow>(name: &'static str) -> Self {
        Member {
            name: Some(name),
            shape: T::shape,
        }
    }

    /// A positional argument whose column name is not checked.
    pub fn unnamed<T: FromRow>() -> Self {
        Member {
            name: None,
            shape: T::shape,
        }
    }
}

/// What the plan supplies to [`FromRow::construct`].
pub enum Input<'a> {
    Value(Value),
    Arguments(Arguments<'a>),
    Fields(Fields<'a>),
}

impl Input<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Input::Value(_) => "a column value",
            Input::Arguments(_) => "constructor arguments",
            Input::Fields(_) => "named fields",
        }
    }

    /// The error to return when a type receives an input it was not declared for.
    pub fn unexpected(&self, type_name: &'static str, expected: &'static str) -> MaterializationError {
        MaterializationError::UnexpectedInput {
            type_name,
            expected,
            found: self.describe(),
        }
    }

    /// Unwrap a column value, or fail on any other input.
    pub fn into_value(self, type_name: &'static str) -> Result<Value, MaterializationError> {
        match self {
            Input::Value(value) => Ok(value),
            other => Err(other.unexpected(type_name, "a column value")),
        }
    }
}

/// The constructor arguments of a positional composite, in declared order.
pub struct Arguments<'a> {
    composite: &'a Composite,
    row: &'a dyn RowValues,
    next: usize,
}

impl<'a> Arguments<'a> {
    pub(crate) fn new(composite: &'a Composite, row: &'a dyn RowValues) -> Self {
        Arguments {
            composite,
            row,
            next: 0,
        }
    }

    /// Materialize the next argument.
    pub fn next<T: FromRow>(&mut self) -> Result<T, MaterializationError> {
        let index = self.next;
        let member = self.composite.members.get(index).ok_or(
            MaterializationError::MissingArgument {
                type_name: self.composite.type_name,
                index,
            },
        )?;
        self.next += 1;
        materialize_node::<T>(&member.node, self.row)
    }

    pub fn remaining(&self) -> usize {
        self.composite.members.len() - self.next
    }
}

/// The fields of a named composite, walked in declared order.
///
/// Call [`Fields::next_field`] to move to a field, then [`Fields::value`] to
/// materialize it. A field whose value is never requested is not read.
pub struct Fields<'a> {
    composite: &'a Composite,
    row: &'a dyn RowValues,
    next: usize,
    current: Option<&'a PlanMember>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(composite: &'a Composite, row: &'a dyn RowValues) -> Self {
        Fields {
            composite,
            row,
            next: 0,
            current: None,
        }
    }

    /// Advance to the next field and return its name.
    pub fn next_field(&mut self) -> Option<&'static str> {
        let member = self.composite.members.get(self.next)?;
        self.next += 1;
        self.current = Some(member);
        // named composites are only built from named members
        Some(member.name.unwrap_or_default())
    }

    /// Materialize the field last returned by [`Fields::next_field`].
    pub fn value<T: FromRow>(&mut self) -> Result<T, MaterializationError> {
        let member = self
            .current
            .take()
            .ok_or(MaterializationError::MissingArgument {
                type_name: self.composite.type_name,
                index: self.next,
            })?;
        materialize_node::<T>(&member.node, self.row)
    }

    pub fn type_name(&self) -> &'static str {
        self.composite.type_name
    }
}

// Leaves //

impl FromRow for bool {
    fn shape() -> Shape {
        Shape::leaf("bool")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        match input.into_value("bool")? {
            Value::Boolean(value) => Ok(value),
            // SQLite has no boolean storage class
            value @ (Value::Smallint(_) | Value::Integer(_) | Value::Bigint(_)) => {
                match value.as_i64() {
                    Some(0) => Ok(false),
                    Some(1) => Ok(true),
                    _ => Err(out_of_range("bool", &value)),
                }
            }
            other => Err(incompatible("bool", &other)),
        }
    }
}

impl FromRow for i16 {
    fn shape() -> Shape {
        Shape::leaf("i16")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        let value = input.into_value("i16")?;
        let wide = value.as_i64().ok_or_else(|| incompatible("i16", &value))?;
        i16::try_from(wide).map_err(|_| out_of_range("i16", &value))
    }
}

impl FromRow for i32 {
    fn shape() -> Shape {
        Shape::leaf("i32")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        let value = input.into_value("i32")?;
        let wide = value.as_i64().ok_or_else(|| incompatible("i32", &value))?;
        i32::try_from(wide).map_err(|_| out_of_range("i32", &value))
    }
}

impl FromRow for i64 {
    fn shape() -> Shape {
        Shape::leaf("i64")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        let value = input.into_value("i64")?;
        value.as_i64().ok_or_else(|| incompatible("i64", &value))
    }
}

impl FromRow for f32 {
    fn shape() -> Shape {
        Shape::leaf("f32")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        match input.into_value("f32")? {
            Value::Real(value) => Ok(value),
            Value::Smallint(value) => Ok(f32::from(value)),
            // large integers round to the nearest float
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(value) => Ok(value as f32),
            #[allow(clippy::cast_precision_loss)]
            Value::Bigint(value) => Ok(value as f32),
            other => Err(incompatible("f32", &other)),
        }
    }
}

impl FromRow for f64 {
    fn shape() -> Shape {
        Shape::leaf("f64")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        match input.into_value("f64")? {
            Value::DoublePrecision(value) => Ok(value),
            Value::Real(value) => Ok(f64::from(value)),
            Value::Smallint(value) => Ok(f64::from(value)),
            Value::Integer(value) => Ok(f64::from(value)),
            #[allow(clippy::cast_precision_loss)]
            Value::Bigint(value) => Ok(value as f64),
            other => Err(incompatible("f64", &other)),
        }
    }
}

impl FromRow for String {
    fn shape() -> Shape {
        Shape::leaf("String")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        match input.into_value("String")? {
            Value::Text(value) => Ok(value),
            other => Err(incompatible("String", &other)),
        }
    }
}

impl FromRow for Vec<u8> {
    fn shape() -> Shape {
        Shape::leaf("Vec<u8>")
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        match input.into_value("Vec<u8>")? {
            Value::Bytes(value) => Ok(value),
            other => Err(incompatible("Vec<u8>", &other)),
        }
    }
}

impl<T: FromRow> FromRow for Option<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
        match input {
            Input::Value(Value::Null) => Ok(None),
            other => T::construct(other).map(Some),
        }
    }

    fn absent() -> Result<Self, MaterializationError> {
        Ok(None)
    }
}

fn incompatible(expected: &'static str, found: &Value) -> MaterializationError {
    MaterializationError::IncompatibleValue {
        expected,
        found: found.kind(),
        ordinal: None,
    }
}

fn out_of_range(expected: &'static str, value: &Value) -> MaterializationError {
    MaterializationError::OutOfRange {
        expected,
        value: value.to_string(),
        ordinal: None,
    }
}

// Tuples //

macro_rules! tuple_row {
    ($($name:ident),+) => {
        impl<$($name: FromRow),+> FromRow for ($($name,)+) {
            fn shape() -> Shape {
                Shape::positional(
                    std::any::type_name::<Self>(),
                    vec![$(Member::unnamed::<$name>()),+],
                )
            }

            fn construct(input: Input<'_>) -> Result<Self, MaterializationError> {
                match input {
                    Input::Arguments(mut arguments) => Ok(($(arguments.next::<$name>()?,)+)),
                    other => Err(other.unexpected(std::any::type_name::<Self>(), "constructor arguments")),
                }
            }
        }
    };
}

tuple_row!(A);
tuple_row!(A, B);
tuple_row!(A, B, C);
tuple_row!(A, B, C, D);
tuple_row!(A, B, C, D, E);
tuple_row!(A, B, C, D, E, F);
tuple_row!(A, B, C, D, E, F, G);
tuple_row!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf<T: FromRow>(value: Value) -> Result<T, MaterializationError> {
        T::construct(Input::Value(value))
    }

    #[test]
    fn integers_widen_and_narrow_checked() {
        assert_eq!(leaf::<i64>(Value::Smallint(7)), Ok(7));
        assert_eq!(leaf::<i32>(Value::Bigint(42)), Ok(42));
        assert!(matches!(
            leaf::<i16>(Value::Integer(70_000)),
            Err(MaterializationError::OutOfRange {
                expected: "i16",
                ..
            })
        ));
    }

    #[test]
    fn integers_read_as_floats() {
        // SQLite reports every integer as a bigint
        assert_eq!(leaf::<f64>(Value::Bigint(12)), Ok(12.0));
        assert_eq!(leaf::<f32>(Value::Bigint(3)), Ok(3.0));
        assert_eq!(leaf::<f32>(Value::Integer(-2)), Ok(-2.0));
        assert!(matches!(
            leaf::<f32>(Value::DoublePrecision(1.5)),
            Err(MaterializationError::IncompatibleValue { .. })
        ));
    }

    #[test]
    fn sqlite_integers_read_as_booleans() {
        assert_eq!(leaf::<bool>(Value::Bigint(1)), Ok(true));
        assert_eq!(leaf::<bool>(Value::Integer(0)), Ok(false));
        assert!(leaf::<bool>(Value::Integer(2)).is_err());
    }

    #[test]
    fn null_only_fits_optional_leaves() {
        assert_eq!(leaf::<Option<String>>(Value::Null), Ok(None));
        assert_eq!(
            leaf::<Option<String>>(Value::Text("x".into())),
            Ok(Some("x".to_string()))
        );
        assert_eq!(
            leaf::<String>(Value::Null),
            Err(MaterializationError::IncompatibleValue {
                expected: "String",
                found: "null",
                ordinal: None,
            })
        );
    }

    #[test]
    fn only_optional_types_can_be_absent() {
        assert_eq!(<Option<i32>>::absent(), Ok(None));
        assert!(matches!(
            <(i32, i32)>::absent(),
            Err(MaterializationError::UnexpectedAbsent { .. })
        ));
    }

    #[test]
    fn option_shares_the_inner_shape() {
        let shape = <Option<(i32, String)>>::shape();
        match shape.kind {
            ShapeKind::Positional(members) => assert_eq!(members.len(), 2),
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
